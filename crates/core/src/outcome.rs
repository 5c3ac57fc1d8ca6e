//! Result types returned by import, reset and status operations.

use serde::Serialize;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Issue taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong during an import or reset.
///
/// Entry-level variants skip one entry and the batch continues. Warning
/// variants never skip anything. Only [`ImportIssue::InvalidStructure`]
/// aborts a batch, and it does so before the first write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportIssue {
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Entry at index {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("Entry at index {index}: alias '{alias}' already exists, skipped")]
    DuplicateAlias { index: usize, alias: String },

    #[error("Entry at index {index} ('{alias}'): {detail}, using parent {fallback}")]
    ParentUnresolvable {
        index: usize,
        alias: String,
        detail: String,
        fallback: DbId,
    },

    #[error("Entry at index {index} ('{title}'): {detail}")]
    StoreWriteFailed {
        index: usize,
        title: String,
        detail: String,
    },

    #[error("Node {node_id} was created but could not be tracked: {detail}")]
    TrackingWriteFailed { node_id: DbId, detail: String },

    #[error("Rebuild: {0}")]
    RebuildFailed(String),

    #[error("Tracking table does not exist, nothing can be reset")]
    TrackingUnavailable,

    #[error("Reset failed: {0}")]
    ResetFailed(String),
}

impl ImportIssue {
    /// Whether this issue is reported as a warning rather than an error.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::ParentUnresolvable { .. }
                | Self::TrackingWriteFailed { .. }
                | Self::RebuildFailed(_)
        )
    }

    /// Whether this issue means one entry was not imported.
    pub fn skips_entry(&self) -> bool {
        matches!(
            self,
            Self::InvalidEntry { .. } | Self::DuplicateAlias { .. } | Self::StoreWriteFailed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Import result
// ---------------------------------------------------------------------------

/// Outcome of one import batch.
///
/// `success` is `false` only when the batch was rejected before any write.
/// Per-entry failures show up in `skipped` and `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Ids created by this batch, in insertion order.
    #[serde(skip)]
    pub created_ids: Vec<DbId>,
}

impl ImportResult {
    pub fn started() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// A batch rejected before any write.
    pub fn aborted(issue: ImportIssue) -> Self {
        Self {
            success: false,
            errors: vec![issue.to_string()],
            ..Self::default()
        }
    }

    pub fn record_created(&mut self, id: DbId) {
        self.imported += 1;
        self.created_ids.push(id);
    }

    pub fn record_issue(&mut self, issue: ImportIssue) {
        if issue.skips_entry() {
            self.skipped += 1;
        }
        if issue.is_warning() {
            self.warnings.push(issue.to_string());
        } else {
            self.errors.push(issue.to_string());
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

// ---------------------------------------------------------------------------
// Reset outcome
// ---------------------------------------------------------------------------

/// Outcome of undoing every tracked import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetOutcome {
    pub success: bool,
    pub deleted: u64,
    /// Ledger rows cleared.
    pub cleared: u64,
    /// Set when the ledger table was missing, as opposed to present but empty.
    pub tracking_unavailable: bool,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl ResetOutcome {
    pub fn completed(deleted: u64, cleared: u64) -> Self {
        Self {
            success: true,
            deleted,
            cleared,
            ..Self::default()
        }
    }

    pub fn failed(issue: ImportIssue) -> Self {
        Self {
            success: false,
            tracking_unavailable: matches!(issue, ImportIssue::TrackingUnavailable),
            error: Some(issue.to_string()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Snapshot of the tree and ledger sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatus {
    /// Non-root nodes in the tree.
    pub total_nodes: i64,
    /// Nodes recorded in the ledger.
    pub tracked_nodes: i64,
    pub tracking_table_exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_errors_count_as_skipped() {
        let mut result = ImportResult::started();
        result.record_issue(ImportIssue::InvalidEntry {
            index: 2,
            reason: "title is missing or empty".into(),
        });
        result.record_issue(ImportIssue::DuplicateAlias {
            index: 3,
            alias: "phones".into(),
        });
        assert_eq!(result.skipped, 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("index 2"));
        assert!(result.success);
    }

    #[test]
    fn warnings_do_not_skip() {
        let mut result = ImportResult::started();
        result.record_issue(ImportIssue::ParentUnresolvable {
            index: 0,
            alias: "phones".into(),
            detail: "parent alias 'gadgets' not found".into(),
            fallback: 1,
        });
        result.record_issue(ImportIssue::RebuildFailed("store rebuild returned false".into()));
        assert_eq!(result.skipped, 0);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn aborted_batch_reports_failure() {
        let result = ImportResult::aborted(ImportIssue::InvalidStructure("empty".into()));
        assert!(!result.success);
        assert_eq!(result.imported, 0);
        assert_eq!(result.errors, vec!["Invalid structure: empty".to_string()]);
    }

    #[test]
    fn serializes_to_public_shape() {
        let mut result = ImportResult::started();
        result.record_created(7);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "imported": 1,
                "skipped": 0,
                "errors": [],
                "warnings": [],
            })
        );
    }

    #[test]
    fn reset_distinguishes_missing_ledger() {
        let missing = ResetOutcome::failed(ImportIssue::TrackingUnavailable);
        assert!(missing.tracking_unavailable);
        let empty = ResetOutcome::completed(0, 0);
        assert!(empty.success);
        assert!(!empty.tracking_unavailable);
    }
}
