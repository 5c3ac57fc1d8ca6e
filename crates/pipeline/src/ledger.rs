//! Tracking ledger: which nodes an import created, so a reset can remove
//! exactly those.

use serde_json::Value;
use taxonomy_core::store::{StoreError, TaxonomyStore};
use taxonomy_core::tracking::NewTrackingRecord;
use taxonomy_core::types::{DbId, Timestamp};

/// Counts from a ledger reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerReset {
    /// Node ids listed in the ledger.
    pub tracked: usize,
    /// Nodes actually deleted. Lower than `tracked` when some were already gone.
    pub deleted: u64,
    /// Ledger rows cleared.
    pub cleared: u64,
}

pub struct TrackingLedger<'a, S: TaxonomyStore + ?Sized> {
    store: &'a S,
    table_ready: bool,
}

impl<'a, S: TaxonomyStore + ?Sized> TrackingLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            table_ready: false,
        }
    }

    /// Append one record, creating the ledger table on first use.
    pub async fn record(
        &mut self,
        node_id: DbId,
        original_alias: &str,
        actor_id: DbId,
        at: Timestamp,
        source: &Value,
    ) -> Result<DbId, StoreError> {
        if !self.table_ready {
            self.store.ensure_tracking_table().await?;
            self.table_ready = true;
        }
        let record = NewTrackingRecord::new(node_id, original_alias, actor_id, at, source);
        self.store.insert_tracking(&record).await
    }

    /// Created node ids in the order they were recorded.
    pub async fn list_tracked_ids(&self) -> Result<Vec<DbId>, StoreError> {
        self.store.tracked_node_ids().await
    }

    /// Delete every tracked node and clear the ledger.
    ///
    /// Fails with [`StoreError::TrackingUnavailable`] when the ledger table
    /// has never been created.
    pub async fn reset(&self) -> Result<LedgerReset, StoreError> {
        let ids = self.list_tracked_ids().await?;
        let deleted = if ids.is_empty() {
            0
        } else {
            self.store.delete_nodes(&ids).await?
        };
        let cleared = self.store.clear_tracking().await?;

        tracing::info!(tracked = ids.len(), deleted, cleared, "Tracked imports reset");
        Ok(LedgerReset {
            tracked: ids.len(),
            deleted,
            cleared,
        })
    }
}
