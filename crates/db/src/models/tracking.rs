//! Row model for the import ledger.

use sqlx::FromRow;
use taxonomy_core::tracking::TrackingRecord;
use taxonomy_core::types::{DbId, Timestamp};

/// A row from `taxonomy_import_tracking`.
#[derive(Debug, Clone, FromRow)]
pub struct TrackingRow {
    pub id: DbId,
    pub node_id: DbId,
    pub original_alias: String,
    pub imported_date: Timestamp,
    pub imported_by: DbId,
    pub source_payload: String,
}

impl From<TrackingRow> for TrackingRecord {
    fn from(row: TrackingRow) -> Self {
        Self {
            id: row.id,
            node_id: row.node_id,
            original_alias: row.original_alias,
            imported_date: row.imported_date,
            imported_by: row.imported_by,
            source_payload: row.source_payload,
        }
    }
}
