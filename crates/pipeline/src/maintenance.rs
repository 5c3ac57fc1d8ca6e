//! Operations on the tree outside of an import: standalone rebuild, path
//! refresh, status and the default-parent picker.

use serde::Serialize;
use taxonomy_core::nested_set::compute_paths;
use taxonomy_core::node::ParentCandidate;
use taxonomy_core::outcome::ImportStatus;
use taxonomy_core::store::{NodeStore, StoreError, TaxonomyStore};
use taxonomy_core::types::ROOT_ID;

use crate::rebuild::{RebuildEngine, RebuildReport};

/// Run the rebuild engine on the whole tree.
pub async fn rebuild_tree<S: NodeStore + ?Sized>(store: &S) -> RebuildReport {
    RebuildEngine::new(ROOT_ID).run(store).await
}

#[derive(Debug, Clone, Serialize)]
pub struct PathRefresh {
    pub rebuild: RebuildReport,
    /// Nodes whose stored path was rewritten.
    pub changed: usize,
    pub unchanged: usize,
    /// Nodes whose new path could not be written.
    pub failed: Vec<String>,
}

/// Rebuild, then recompute every path from the alias chain and write the
/// ones that differ.
pub async fn refresh_paths<S: NodeStore + ?Sized>(store: &S) -> Result<PathRefresh, StoreError> {
    let rebuild = rebuild_tree(store).await;

    let edges = store.alias_edges().await?;
    let stored: std::collections::HashMap<_, _> =
        edges.iter().map(|e| (e.id, e.path.as_str())).collect();

    let mut refresh = PathRefresh {
        rebuild,
        changed: 0,
        unchanged: 0,
        failed: Vec::new(),
    };

    for (id, path) in compute_paths(ROOT_ID, &edges) {
        if stored.get(&id).copied() == Some(path.as_str()) {
            refresh.unchanged += 1;
            continue;
        }
        match store.update_path(id, &path).await {
            Ok(()) => {
                tracing::debug!(id, %path, "Path refreshed");
                refresh.changed += 1;
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "Path refresh failed");
                refresh.failed.push(format!("Node {id}: {e}"));
            }
        }
    }

    tracing::info!(
        changed = refresh.changed,
        unchanged = refresh.unchanged,
        failed = refresh.failed.len(),
        "Paths refreshed",
    );
    Ok(refresh)
}

/// Sizes of the tree and the ledger.
pub async fn import_status<S: TaxonomyStore + ?Sized>(store: &S) -> Result<ImportStatus, StoreError> {
    let total_nodes = store.count_nodes().await?;
    let tracking_table_exists = store.tracking_table_exists().await?;
    let tracked_nodes = if tracking_table_exists {
        store.count_tracking().await?
    } else {
        0
    };
    Ok(ImportStatus {
        total_nodes,
        tracked_nodes,
        tracking_table_exists,
    })
}

/// The root option followed by every published node in tree order.
pub async fn parent_candidates<S: NodeStore + ?Sized>(
    store: &S,
) -> Result<Vec<ParentCandidate>, StoreError> {
    let nodes = store.published_nodes().await?;
    let mut candidates = Vec::with_capacity(nodes.len() + 1);
    candidates.push(ParentCandidate::root());
    candidates.extend(nodes.iter().map(ParentCandidate::from));
    Ok(candidates)
}
