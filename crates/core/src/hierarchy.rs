//! Insertion ordering for a batch of entries.
//!
//! Entries that name a parent by alias must be inserted after that parent so
//! the alias can be looked up in the store. [`order_by_hierarchy`] produces
//! that order with a bounded number of passes. It is not a full topological
//! sort: anything still unresolved after [`MAX_SORT_PASSES`] (because of a
//! cycle, a parent outside the batch, or a very deep reversed chain) is
//! appended in source order and later attaches to the default parent.

use std::collections::HashSet;

use crate::entry::EntryRecord;

/// Upper bound on child resolution passes.
pub const MAX_SORT_PASSES: usize = 10;

/// Result of ordering a batch.
#[derive(Debug, Clone)]
pub struct HierarchyOrder {
    /// Entries in insertion order.
    pub entries: Vec<EntryRecord>,
    /// Aliases of entries whose parent alias was never seen in the batch.
    pub unresolved: Vec<String>,
    /// Number of child passes performed.
    pub passes: usize,
}

/// Order `entries` so batch roots come first and each child follows the entry
/// whose alias it references.
pub fn order_by_hierarchy(entries: Vec<EntryRecord>) -> HierarchyOrder {
    let total = entries.len();
    let (roots, mut pending): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|e| e.parent_alias.is_none());

    let mut resolved: HashSet<String> = roots.iter().map(|e| e.alias.clone()).collect();
    let mut ordered = Vec::with_capacity(total);
    ordered.extend(roots);

    let mut passes = 0;
    while !pending.is_empty() && passes < MAX_SORT_PASSES {
        passes += 1;
        let before = pending.len();
        let mut waiting = Vec::with_capacity(before);

        for entry in pending {
            let ready = entry
                .parent_alias
                .as_deref()
                .is_some_and(|parent| resolved.contains(parent));
            if ready {
                resolved.insert(entry.alias.clone());
                ordered.push(entry);
            } else {
                waiting.push(entry);
            }
        }

        pending = waiting;
        if pending.len() == before {
            break;
        }
    }

    if !pending.is_empty() {
        tracing::debug!(
            count = pending.len(),
            passes,
            "Entries with unresolved parent aliases appended in source order",
        );
    }

    let unresolved = pending.iter().map(|e| e.alias.clone()).collect();
    ordered.extend(pending);

    HierarchyOrder {
        entries: ordered,
        unresolved,
        passes,
    }
}
