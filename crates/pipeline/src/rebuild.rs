//! Rebuild and repair of the nested set after a batch.
//!
//! The sequence:
//!
//! 1. Make sure the root sentinel exists and is well formed.
//! 2. Snapshot every non-root `(id, parent_id)` pair.
//! 3. Re-parent nodes whose parent is missing, and one node per parent
//!    cycle, to the root (store and snapshot).
//! 4. Ask the store to rebuild from the root.
//! 5. Put back any `parent_id` that changed during the rebuild, then rebuild
//!    again.
//! 6. Verify the ranges. On violations rebuild once more and verify again;
//!    whatever remains is reported.
//!
//! Nothing here returns an error. Every failure ends up in
//! [`RebuildReport::warnings`] so an import that committed rows still
//! reports them.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use taxonomy_core::nested_set::{find_violations, unreachable_heads, ParentEdge, Violation};
use taxonomy_core::store::NodeStore;
use taxonomy_core::types::{DbId, ROOT_ID};

/// Why a node was moved under the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReparentReason {
    MissingParent,
    Cycle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reparented {
    pub id: DbId,
    pub previous_parent_id: DbId,
    pub reason: ReparentReason,
}

/// What a rebuild run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildReport {
    /// The store accepted at least one rebuild.
    pub rebuilt: bool,
    /// Store rebuild calls made.
    pub passes: usize,
    pub root_repaired: bool,
    pub reparented: Vec<Reparented>,
    /// Nodes whose `parent_id` was put back after a rebuild moved it.
    pub restored: Vec<DbId>,
    /// Violations still present after the final verification.
    pub violations: usize,
    pub warnings: Vec<String>,
}

impl RebuildReport {
    pub fn is_clean(&self) -> bool {
        self.rebuilt && self.violations == 0 && self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

/// Rebuilds the tree hanging from one root.
#[derive(Debug, Clone, Copy)]
pub struct RebuildEngine {
    root_id: DbId,
}

impl Default for RebuildEngine {
    fn default() -> Self {
        Self::new(ROOT_ID)
    }
}

impl RebuildEngine {
    pub fn new(root_id: DbId) -> Self {
        Self { root_id }
    }

    pub async fn run<S: NodeStore + ?Sized>(&self, store: &S) -> RebuildReport {
        let mut report = RebuildReport::default();

        match store.ensure_root().await {
            Ok(changed) => report.root_repaired = changed,
            Err(e) => report.warn(format!("Root check failed: {e}")),
        }

        // -- snapshot and repair ---------------------------------------------

        let edges = match store.parent_edges().await {
            Ok(edges) => edges,
            Err(e) => {
                report.warn(format!("Could not read parent relationships: {e}"));
                return report;
            }
        };
        let mut snapshot: HashMap<DbId, DbId> = edges
            .iter()
            .filter(|e| e.id != self.root_id)
            .map(|e| (e.id, e.parent_id))
            .collect();

        self.repair_unreachable(store, &edges, &mut snapshot, &mut report)
            .await;

        // -- rebuild and restore ---------------------------------------------

        if !self.rebuild_once(store, &mut report).await {
            return report;
        }

        let drifted = self.restore_parents(store, &snapshot, &mut report).await;
        if drifted > 0 && !self.rebuild_once(store, &mut report).await {
            return report;
        }

        // -- verify ----------------------------------------------------------

        let violations = match self.verify(store).await {
            Ok(v) => v,
            Err(message) => {
                report.warn(message);
                return report;
            }
        };
        if violations.is_empty() {
            tracing::info!(passes = report.passes, "Nested set verified");
            return report;
        }

        tracing::warn!(
            count = violations.len(),
            "Nested set violations found, rebuilding again",
        );
        if !self.rebuild_once(store, &mut report).await {
            report.violations = violations.len();
            return report;
        }

        match self.verify(store).await {
            Ok(remaining) => {
                report.violations = remaining.len();
                for violation in remaining {
                    report.warn(format!("Persistent violation: {violation}"));
                }
            }
            Err(message) => report.warn(message),
        }
        report
    }

    async fn repair_unreachable<S: NodeStore + ?Sized>(
        &self,
        store: &S,
        edges: &[ParentEdge],
        snapshot: &mut HashMap<DbId, DbId>,
        report: &mut RebuildReport,
    ) {
        let known: HashSet<DbId> = edges.iter().map(|e| e.id).collect();

        for id in unreachable_heads(self.root_id, edges) {
            let previous = snapshot.get(&id).copied().unwrap_or_default();
            let reason = if known.contains(&previous) {
                ReparentReason::Cycle
            } else {
                ReparentReason::MissingParent
            };

            match store.update_parent(id, self.root_id).await {
                Ok(()) => {
                    tracing::warn!(id, previous_parent_id = previous, ?reason, "Node re-parented to root");
                    snapshot.insert(id, self.root_id);
                    report.reparented.push(Reparented {
                        id,
                        previous_parent_id: previous,
                        reason,
                    });
                }
                Err(e) => report.warn(format!("Could not re-parent node {id} to root: {e}")),
            }
        }
    }

    /// One store rebuild. Returns `false` (with a warning) if it failed.
    async fn rebuild_once<S: NodeStore + ?Sized>(
        &self,
        store: &S,
        report: &mut RebuildReport,
    ) -> bool {
        report.passes += 1;
        match store.rebuild(self.root_id).await {
            Ok(true) => {
                report.rebuilt = true;
                true
            }
            Ok(false) => {
                report.warn(format!(
                    "Store rebuild from node {} returned false",
                    self.root_id
                ));
                false
            }
            Err(e) => {
                report.warn(format!("Store rebuild failed: {e}"));
                false
            }
        }
    }

    /// Put back parents changed by the rebuild. Returns how many drifted.
    async fn restore_parents<S: NodeStore + ?Sized>(
        &self,
        store: &S,
        snapshot: &HashMap<DbId, DbId>,
        report: &mut RebuildReport,
    ) -> usize {
        let current = match store.parent_edges().await {
            Ok(edges) => edges,
            Err(e) => {
                report.warn(format!("Could not re-read parent relationships: {e}"));
                return 0;
            }
        };

        let mut drifted = 0;
        for edge in current {
            let Some(&expected) = snapshot.get(&edge.id) else {
                continue;
            };
            if edge.parent_id == expected {
                continue;
            }
            drifted += 1;
            match store.update_parent(edge.id, expected).await {
                Ok(()) => {
                    tracing::warn!(
                        id = edge.id,
                        drifted_to = edge.parent_id,
                        restored_to = expected,
                        "Parent changed during rebuild, restored",
                    );
                    report.restored.push(edge.id);
                }
                Err(e) => report.warn(format!(
                    "Could not restore parent {expected} for node {}: {e}",
                    edge.id
                )),
            }
        }
        drifted
    }

    async fn verify<S: NodeStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<Violation>, String> {
        let rows = store
            .nested_set_rows()
            .await
            .map_err(|e| format!("Could not read nested set for verification: {e}"))?;
        Ok(find_violations(self.root_id, &rows))
    }
}
