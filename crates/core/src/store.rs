//! Store seam for the import pipeline.
//!
//! The pipeline never talks to a database directly. It works against
//! [`NodeStore`] (the taxonomy tree) and [`TrackingStore`] (the import
//! ledger). The SQLite implementation lives in the db crate; tests use an
//! in-memory double.

use async_trait::async_trait;

use crate::nested_set::{AliasEdge, NestedSetRow, ParentEdge};
use crate::node::{NewNode, Node};
use crate::tracking::{NewTrackingRecord, TrackingRecord};
use crate::types::DbId;

/// Failures reported by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Alias '{0}' already exists")]
    DuplicateAlias(String),

    #[error("Rejected by store: {0}")]
    Validation(String),

    #[error("Node {0} not found")]
    NotFound(DbId),

    #[error("Tracking table does not exist")]
    TrackingUnavailable,

    #[error("Store error: {0}")]
    Backend(String),
}

/// The taxonomy tree.
///
/// Every method runs in its own transaction; nothing spans calls.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn find_node(&self, id: DbId) -> Result<Option<Node>, StoreError>;

    async fn find_by_alias(&self, alias: &str) -> Result<Option<Node>, StoreError>;

    /// Insert `node` as the last child of `node.parent_id`, shifting the
    /// nested-set coordinates to make room. Returns the new id.
    async fn insert_node(&self, node: &NewNode) -> Result<DbId, StoreError>;

    async fn update_parent(&self, id: DbId, parent_id: DbId) -> Result<(), StoreError>;

    async fn update_path(&self, id: DbId, path: &str) -> Result<(), StoreError>;

    /// Delete the given nodes. The root is never deleted. Returns the number
    /// of rows removed.
    async fn delete_nodes(&self, ids: &[DbId]) -> Result<u64, StoreError>;

    /// `(id, parent_id, lft)` of every node, root included.
    async fn parent_edges(&self) -> Result<Vec<ParentEdge>, StoreError>;

    /// Like [`parent_edges`](Self::parent_edges) with aliases.
    async fn alias_edges(&self) -> Result<Vec<AliasEdge>, StoreError>;

    /// Stored coordinates of every node, ordered by `lft`.
    async fn nested_set_rows(&self) -> Result<Vec<NestedSetRow>, StoreError>;

    /// Recompute `lft`/`rgt`/`level` from parent edges, rooted at `root_id`.
    /// Returns `false` if the store could not rebuild.
    async fn rebuild(&self, root_id: DbId) -> Result<bool, StoreError>;

    /// Create the root sentinel if missing and repair its fixed columns.
    /// Returns `true` if anything was changed.
    async fn ensure_root(&self) -> Result<bool, StoreError>;

    /// Number of non-root nodes.
    async fn count_nodes(&self) -> Result<i64, StoreError>;

    /// Published non-root nodes ordered by `lft`.
    async fn published_nodes(&self) -> Result<Vec<Node>, StoreError>;
}

/// The import ledger.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn tracking_table_exists(&self) -> Result<bool, StoreError>;

    /// Create the ledger table and its indexes if they do not exist.
    async fn ensure_tracking_table(&self) -> Result<(), StoreError>;

    async fn insert_tracking(&self, record: &NewTrackingRecord) -> Result<DbId, StoreError>;

    /// Tracked node ids in insertion order. Fails with
    /// [`StoreError::TrackingUnavailable`] if the table does not exist.
    async fn tracked_node_ids(&self) -> Result<Vec<DbId>, StoreError>;

    async fn list_tracking(&self) -> Result<Vec<TrackingRecord>, StoreError>;

    /// Returns 0 when the table does not exist.
    async fn count_tracking(&self) -> Result<i64, StoreError>;

    /// Delete every ledger row. Returns the number removed.
    async fn clear_tracking(&self) -> Result<u64, StoreError>;
}

/// A store that provides both the tree and the ledger.
pub trait TaxonomyStore: NodeStore + TrackingStore {}

impl<T: NodeStore + TrackingStore> TaxonomyStore for T {}
