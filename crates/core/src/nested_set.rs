//! Pure nested-set computations.
//!
//! The store keeps `parent_id` as the source of truth and derives
//! `lft`/`rgt`/`level` from it. This module holds the derivation
//! ([`compute_layout`]), the structural checks run after a rebuild
//! ([`find_violations`]) and path recomputation ([`compute_paths`]). None of
//! it touches the database.
//!
//! Numbering starts at the root with `lft = 0`; every node spans
//! `rgt - lft = 2 * descendants + 1`.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::path::{child_path, truncate_path};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A parent edge as stored, with the current `lft` used to keep sibling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentEdge {
    pub id: DbId,
    pub parent_id: DbId,
    pub lft: i64,
}

/// A parent edge carrying the node alias and stored path, used for path
/// recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEdge {
    pub id: DbId,
    pub parent_id: DbId,
    pub lft: i64,
    pub alias: String,
    pub path: String,
}

/// Computed coordinates for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub id: DbId,
    pub parent_id: DbId,
    pub lft: i64,
    pub rgt: i64,
    pub level: i32,
}

/// Output of [`compute_layout`].
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Placements in pre-order, root first.
    pub placements: Vec<Placement>,
    /// Nodes not reachable from the root (missing parent or a cycle).
    pub detached: Vec<DbId>,
}

/// Stored coordinates of one node, as read back for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedSetRow {
    pub id: DbId,
    pub parent_id: DbId,
    pub lft: i64,
    pub rgt: i64,
    pub level: i32,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// `lft > rgt`.
    InvertedRange,
    /// `lft == rgt`.
    ZeroWidth,
    /// The range is not strictly inside the parent's range.
    OutsideParent,
}

/// A structural problem found by [`find_violations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub id: DbId,
    pub kind: ViolationKind,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

fn children_by_parent<I>(edges: I) -> HashMap<DbId, Vec<(i64, DbId)>>
where
    I: IntoIterator<Item = (DbId, DbId, i64)>,
{
    let mut children: HashMap<DbId, Vec<(i64, DbId)>> = HashMap::new();
    for (id, parent_id, lft) in edges {
        children.entry(parent_id).or_default().push((lft, id));
    }
    for siblings in children.values_mut() {
        siblings.sort_unstable();
    }
    children
}

struct Frame {
    id: DbId,
    slot: usize,
    next_child: usize,
}

/// Derive `lft`/`rgt`/`level` for every node reachable from `root_id`.
///
/// Siblings keep their current relative order (by stored `lft`, then id).
/// Traversal is iterative, so deep trees do not grow the call stack. The
/// root edge itself, if present in `edges`, is ignored.
pub fn compute_layout(root_id: DbId, edges: &[ParentEdge]) -> Layout {
    let children = children_by_parent(
        edges
            .iter()
            .filter(|e| e.id != root_id)
            .map(|e| (e.id, e.parent_id, e.lft)),
    );
    let parent_of: HashMap<DbId, DbId> = edges.iter().map(|e| (e.id, e.parent_id)).collect();

    let mut placements = Vec::with_capacity(edges.len() + 1);
    let mut visited: HashSet<DbId> = HashSet::new();
    let mut counter: i64 = 0;

    placements.push(Placement {
        id: root_id,
        parent_id: 0,
        lft: counter,
        rgt: 0,
        level: 0,
    });
    visited.insert(root_id);
    counter += 1;
    let mut stack = vec![Frame {
        id: root_id,
        slot: 0,
        next_child: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let next = children
            .get(&frame.id)
            .and_then(|siblings| siblings.get(frame.next_child))
            .map(|&(_, id)| id);

        match next {
            Some(child) => {
                frame.next_child += 1;
                if !visited.insert(child) {
                    continue;
                }
                let parent_slot = frame.slot;
                let level = placements[parent_slot].level + 1;
                placements.push(Placement {
                    id: child,
                    parent_id: parent_of.get(&child).copied().unwrap_or(root_id),
                    lft: counter,
                    rgt: 0,
                    level,
                });
                counter += 1;
                let slot = placements.len() - 1;
                stack.push(Frame {
                    id: child,
                    slot,
                    next_child: 0,
                });
            }
            None => {
                placements[frame.slot].rgt = counter;
                counter += 1;
                stack.pop();
            }
        }
    }

    let mut detached: Vec<DbId> = edges
        .iter()
        .map(|e| e.id)
        .filter(|id| !visited.contains(id))
        .collect();
    detached.sort_unstable();
    detached.dedup();

    Layout {
        placements,
        detached,
    }
}

/// Nodes that cannot reach `root_id` by following parent edges.
///
/// Returns the nodes whose parent does not exist and, for each cycle, the
/// first node found on it. Re-parenting every returned node to the root makes
/// the whole graph reachable.
pub fn unreachable_heads(root_id: DbId, edges: &[ParentEdge]) -> Vec<DbId> {
    let parent_of: HashMap<DbId, DbId> = edges
        .iter()
        .filter(|e| e.id != root_id)
        .map(|e| (e.id, e.parent_id))
        .collect();

    let mut reachable: HashSet<DbId> = HashSet::from([root_id]);
    let mut heads = Vec::new();
    let mut ids: Vec<DbId> = parent_of.keys().copied().collect();
    ids.sort_unstable();

    for start in ids {
        if reachable.contains(&start) {
            continue;
        }
        let mut trail = Vec::new();
        let mut on_trail: HashSet<DbId> = HashSet::new();
        let mut current = start;

        loop {
            if reachable.contains(&current) {
                break;
            }
            if !on_trail.insert(current) {
                // Closed a loop: `current` is the first node seen twice.
                heads.push(current);
                break;
            }
            match parent_of.get(&current) {
                Some(&parent) => {
                    trail.push(current);
                    current = parent;
                }
                None => {
                    // `current` is a parent id with no node behind it.
                    if let Some(&last) = trail.last() {
                        heads.push(last);
                    }
                    break;
                }
            }
        }

        // Once every head is re-parented to the root the whole trail connects.
        reachable.extend(trail);
    }

    heads.sort_unstable();
    heads.dedup();
    heads
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Check every non-root row for range problems.
///
/// `rows` may be in any order; violations are reported in `lft` order.
pub fn find_violations(root_id: DbId, rows: &[NestedSetRow]) -> Vec<Violation> {
    let by_id: HashMap<DbId, &NestedSetRow> = rows.iter().map(|r| (r.id, r)).collect();
    let mut ordered: Vec<&NestedSetRow> = rows.iter().filter(|r| r.id != root_id).collect();
    ordered.sort_by_key(|r| (r.lft, r.id));

    let mut violations = Vec::new();
    for row in ordered {
        if row.lft > row.rgt {
            violations.push(Violation {
                id: row.id,
                kind: ViolationKind::InvertedRange,
                message: format!(
                    "Node {} ('{}') has lft {} greater than rgt {}",
                    row.id, row.title, row.lft, row.rgt
                ),
            });
            continue;
        }
        if row.lft == row.rgt {
            violations.push(Violation {
                id: row.id,
                kind: ViolationKind::ZeroWidth,
                message: format!(
                    "Node {} ('{}') has an empty range at {}",
                    row.id, row.title, row.lft
                ),
            });
            continue;
        }
        if let Some(parent) = by_id.get(&row.parent_id) {
            if !(parent.lft < row.lft && row.rgt < parent.rgt) {
                violations.push(Violation {
                    id: row.id,
                    kind: ViolationKind::OutsideParent,
                    message: format!(
                        "Node {} ('{}') range [{}, {}] is outside parent {} range [{}, {}]",
                        row.id, row.title, row.lft, row.rgt, parent.id, parent.lft, parent.rgt
                    ),
                });
            }
        }
    }
    violations
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Recompute the path of every node reachable from `root_id`.
///
/// Returns `(id, path)` pairs in pre-order, root excluded. Paths longer than
/// the column width are truncated.
pub fn compute_paths(root_id: DbId, edges: &[AliasEdge]) -> Vec<(DbId, String)> {
    let children = children_by_parent(
        edges
            .iter()
            .filter(|e| e.id != root_id)
            .map(|e| (e.id, e.parent_id, e.lft)),
    );
    let alias_of: HashMap<DbId, &str> = edges.iter().map(|e| (e.id, e.alias.as_str())).collect();

    let mut out = Vec::with_capacity(edges.len());
    let mut visited: HashSet<DbId> = HashSet::from([root_id]);
    // Full (untruncated) parent path travels with each pending node.
    let mut stack: Vec<(DbId, String)> = vec![(root_id, String::new())];

    while let Some((id, full_path)) = stack.pop() {
        if let Some(siblings) = children.get(&id) {
            for &(_, child) in siblings.iter().rev() {
                if !visited.insert(child) {
                    continue;
                }
                let alias = alias_of.get(&child).copied().unwrap_or_default();
                stack.push((child, child_path(&full_path, alias)));
            }
        }
        if id != root_id {
            out.push((id, truncate_path(&full_path)));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
