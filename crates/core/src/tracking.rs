//! Ledger records for imported nodes.
//!
//! One record per node created by an import. Records are only ever appended
//! and cleared wholesale by a reset.

use serde::Serialize;
use serde_json::Value;

use crate::types::{DbId, Timestamp};

/// Name of the ledger table.
pub const TRACKING_TABLE: &str = "taxonomy_import_tracking";

/// A stored ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingRecord {
    pub id: DbId,
    pub node_id: DbId,
    pub original_alias: String,
    pub imported_date: Timestamp,
    pub imported_by: DbId,
    /// The JSON element the node was created from, serialized.
    pub source_payload: String,
}

/// A ledger row about to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTrackingRecord {
    pub node_id: DbId,
    pub original_alias: String,
    pub imported_date: Timestamp,
    pub imported_by: DbId,
    pub source_payload: String,
}

impl NewTrackingRecord {
    pub fn new(
        node_id: DbId,
        original_alias: &str,
        imported_by: DbId,
        imported_date: Timestamp,
        source: &Value,
    ) -> Self {
        Self {
            node_id,
            original_alias: original_alias.to_string(),
            imported_date,
            imported_by,
            source_payload: source.to_string(),
        }
    }
}

impl TrackingRecord {
    /// Parse the stored payload back into JSON. Returns `Value::Null` for
    /// payloads that are not valid JSON.
    pub fn payload(&self) -> Value {
        serde_json::from_str(&self.source_payload).unwrap_or(Value::Null)
    }
}
