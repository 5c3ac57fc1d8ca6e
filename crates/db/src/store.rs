//! SQLite implementation of the taxonomy store traits.

use async_trait::async_trait;
use sqlx::error::ErrorKind;
use taxonomy_core::nested_set::{AliasEdge, NestedSetRow, ParentEdge};
use taxonomy_core::node::{NewNode, Node};
use taxonomy_core::store::{NodeStore, StoreError, TrackingStore};
use taxonomy_core::tracking::{NewTrackingRecord, TrackingRecord};
use taxonomy_core::types::DbId;

use crate::repositories::{NodeRepo, TrackingRepo};
use crate::DbPool;

/// [`NodeStore`] and [`TrackingStore`] over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteTaxonomyStore {
    pool: DbPool,
}

impl SqliteTaxonomyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Map an insert failure, recognising constraint violations.
fn insert_error(err: sqlx::Error, node: &NewNode) -> StoreError {
    if let sqlx::Error::RowNotFound = err {
        return StoreError::NotFound(node.parent_id);
    }
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.kind() {
            ErrorKind::UniqueViolation => return StoreError::DuplicateAlias(node.alias.clone()),
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                return StoreError::Validation(db_err.message().to_string())
            }
            _ => {}
        }
    }
    backend(err)
}

#[async_trait]
impl NodeStore for SqliteTaxonomyStore {
    async fn find_node(&self, id: DbId) -> Result<Option<Node>, StoreError> {
        let row = NodeRepo::find_by_id(&self.pool, id).await.map_err(backend)?;
        Ok(row.map(Node::from))
    }

    async fn find_by_alias(&self, alias: &str) -> Result<Option<Node>, StoreError> {
        let row = NodeRepo::find_by_alias(&self.pool, alias)
            .await
            .map_err(backend)?;
        Ok(row.map(Node::from))
    }

    async fn insert_node(&self, node: &NewNode) -> Result<DbId, StoreError> {
        NodeRepo::insert_last_child(&self.pool, node)
            .await
            .map_err(|e| insert_error(e, node))
    }

    async fn update_parent(&self, id: DbId, parent_id: DbId) -> Result<(), StoreError> {
        if NodeRepo::update_parent(&self.pool, id, parent_id)
            .await
            .map_err(backend)?
        {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    async fn update_path(&self, id: DbId, path: &str) -> Result<(), StoreError> {
        match NodeRepo::update_path(&self.pool, id, path).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::NotFound(id)),
            Err(sqlx::Error::Database(db_err))
                if matches!(db_err.kind(), ErrorKind::CheckViolation) =>
            {
                Err(StoreError::Validation(db_err.message().to_string()))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete_nodes(&self, ids: &[DbId]) -> Result<u64, StoreError> {
        NodeRepo::delete_many(&self.pool, ids).await.map_err(backend)
    }

    async fn parent_edges(&self) -> Result<Vec<ParentEdge>, StoreError> {
        let rows = NodeRepo::list_edges(&self.pool).await.map_err(backend)?;
        Ok(rows.iter().map(ParentEdge::from).collect())
    }

    async fn alias_edges(&self) -> Result<Vec<AliasEdge>, StoreError> {
        let rows = NodeRepo::list_edges(&self.pool).await.map_err(backend)?;
        Ok(rows.into_iter().map(AliasEdge::from).collect())
    }

    async fn nested_set_rows(&self) -> Result<Vec<NestedSetRow>, StoreError> {
        let rows = NodeRepo::list_coordinates(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(NestedSetRow::from).collect())
    }

    async fn rebuild(&self, root_id: DbId) -> Result<bool, StoreError> {
        NodeRepo::rebuild(&self.pool, root_id).await.map_err(backend)
    }

    async fn ensure_root(&self) -> Result<bool, StoreError> {
        NodeRepo::ensure_root(&self.pool).await.map_err(backend)
    }

    async fn count_nodes(&self) -> Result<i64, StoreError> {
        NodeRepo::count_non_root(&self.pool).await.map_err(backend)
    }

    async fn published_nodes(&self) -> Result<Vec<Node>, StoreError> {
        let rows = NodeRepo::list_published(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(Node::from).collect())
    }
}

#[async_trait]
impl TrackingStore for SqliteTaxonomyStore {
    async fn tracking_table_exists(&self) -> Result<bool, StoreError> {
        TrackingRepo::table_exists(&self.pool).await.map_err(backend)
    }

    async fn ensure_tracking_table(&self) -> Result<(), StoreError> {
        TrackingRepo::ensure_table(&self.pool).await.map_err(backend)
    }

    async fn insert_tracking(&self, record: &NewTrackingRecord) -> Result<DbId, StoreError> {
        TrackingRepo::insert(&self.pool, record)
            .await
            .map_err(backend)
    }

    async fn tracked_node_ids(&self) -> Result<Vec<DbId>, StoreError> {
        if !self.tracking_table_exists().await? {
            return Err(StoreError::TrackingUnavailable);
        }
        TrackingRepo::list_node_ids(&self.pool)
            .await
            .map_err(backend)
    }

    async fn list_tracking(&self) -> Result<Vec<TrackingRecord>, StoreError> {
        if !self.tracking_table_exists().await? {
            return Ok(Vec::new());
        }
        let rows = TrackingRepo::list_all(&self.pool).await.map_err(backend)?;
        Ok(rows.into_iter().map(TrackingRecord::from).collect())
    }

    async fn count_tracking(&self) -> Result<i64, StoreError> {
        if !self.tracking_table_exists().await? {
            return Ok(0);
        }
        TrackingRepo::count(&self.pool).await.map_err(backend)
    }

    async fn clear_tracking(&self) -> Result<u64, StoreError> {
        if !self.tracking_table_exists().await? {
            return Err(StoreError::TrackingUnavailable);
        }
        TrackingRepo::clear(&self.pool).await.map_err(backend)
    }
}
