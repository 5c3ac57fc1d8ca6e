//! Repository for the `taxonomy_nodes` table.
//!
//! Provides lookups, the last-child insert that keeps the nested set
//! consistent, and the rebuild primitive that renumbers the whole tree from
//! `parent_id`.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use taxonomy_core::nested_set::{compute_layout, ParentEdge};
use taxonomy_core::node::NewNode;
use taxonomy_core::types::{DbId, ROOT_ALIAS, ROOT_ID, ROOT_PARENT_ID};

use crate::models::node::{CoordinateRow, EdgeRow, NodeRow};

/// Column list for `taxonomy_nodes` queries.
const COLUMNS: &str = "\
    id, parent_id, lft, rgt, level, path, title, alias, description, note, \
    meta_description, meta_keywords, published, access, language, \
    created_user_id, created_time, modified_user_id, modified_time, hits, version";

/// Maximum ids bound into one `IN (...)` list.
const DELETE_CHUNK: usize = 500;

/// Takes the write lock up front, so a concurrent writer waits on the busy
/// timeout instead of failing when it upgrades from a read.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Provides CRUD and nested-set maintenance for taxonomy nodes.
pub struct NodeRepo;

impl NodeRepo {
    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<NodeRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM taxonomy_nodes WHERE id = ?");
        sqlx::query_as::<_, NodeRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_alias(
        pool: &SqlitePool,
        alias: &str,
    ) -> Result<Option<NodeRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM taxonomy_nodes WHERE alias = ?");
        sqlx::query_as::<_, NodeRow>(&query)
            .bind(alias)
            .fetch_optional(pool)
            .await
    }

    /// Number of nodes excluding the root.
    pub async fn count_non_root(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM taxonomy_nodes WHERE id <> ?")
            .bind(ROOT_ID)
            .fetch_one(pool)
            .await
    }

    /// Published non-root nodes in tree order.
    pub async fn list_published(pool: &SqlitePool) -> Result<Vec<NodeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM taxonomy_nodes \
             WHERE published = 1 AND id <> ? \
             ORDER BY lft, id"
        );
        sqlx::query_as::<_, NodeRow>(&query)
            .bind(ROOT_ID)
            .fetch_all(pool)
            .await
    }

    /// `(id, parent_id, lft, alias, path)` for every node, root included.
    pub async fn list_edges(pool: &SqlitePool) -> Result<Vec<EdgeRow>, sqlx::Error> {
        sqlx::query_as::<_, EdgeRow>(
            "SELECT id, parent_id, lft, alias, path FROM taxonomy_nodes ORDER BY lft, id",
        )
        .fetch_all(pool)
        .await
    }

    /// Stored coordinates for every node, ordered by `lft`.
    pub async fn list_coordinates(pool: &SqlitePool) -> Result<Vec<CoordinateRow>, sqlx::Error> {
        sqlx::query_as::<_, CoordinateRow>(
            "SELECT id, parent_id, lft, rgt, level, title FROM taxonomy_nodes ORDER BY lft, id",
        )
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert `node` as the last child of its parent.
    ///
    /// Opens space at the parent's `rgt` by shifting every boundary at or to
    /// the right of it by two, then places the node in the gap. The shift and
    /// the insert commit together. Returns [`sqlx::Error::RowNotFound`] if
    /// the parent does not exist.
    pub async fn insert_last_child(pool: &SqlitePool, node: &NewNode) -> Result<DbId, sqlx::Error> {
        let mut tx = pool.begin_with(BEGIN_WRITE).await?;

        let parent_rgt: i64 = sqlx::query_scalar("SELECT rgt FROM taxonomy_nodes WHERE id = ?")
            .bind(node.parent_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        sqlx::query("UPDATE taxonomy_nodes SET rgt = rgt + 2 WHERE rgt >= ?")
            .bind(parent_rgt)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE taxonomy_nodes SET lft = lft + 2 WHERE lft > ?")
            .bind(parent_rgt)
            .execute(&mut *tx)
            .await?;

        let id = sqlx::query(
            "INSERT INTO taxonomy_nodes \
                (parent_id, lft, rgt, level, path, title, alias, description, note, \
                 meta_description, meta_keywords, published, access, language, \
                 created_user_id, created_time, modified_user_id, modified_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(node.parent_id)
        .bind(parent_rgt)
        .bind(parent_rgt + 1)
        .bind(node.level)
        .bind(&node.path)
        .bind(&node.title)
        .bind(&node.alias)
        .bind(&node.description)
        .bind(&node.note)
        .bind(&node.meta_description)
        .bind(&node.meta_keywords)
        .bind(node.published)
        .bind(node.access)
        .bind(&node.language)
        .bind(node.created_user_id)
        .bind(node.created_time)
        .bind(node.modified_user_id)
        .bind(node.modified_time)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        Ok(id)
    }

    /// Point `id` at a new parent. Coordinates are left for the next rebuild.
    pub async fn update_parent(
        pool: &SqlitePool,
        id: DbId,
        parent_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE taxonomy_nodes SET parent_id = ? WHERE id = ?")
            .bind(parent_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_path(pool: &SqlitePool, id: DbId, path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE taxonomy_nodes SET path = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the given ids in chunks, never the root. Returns rows removed.
    pub async fn delete_many(pool: &SqlitePool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut deleted = 0;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM taxonomy_nodes WHERE id <> ");
            qb.push_bind(ROOT_ID);
            qb.push(" AND id IN (");
            {
                let mut sep = qb.separated(", ");
                for id in chunk {
                    sep.push_bind(*id);
                }
            }
            qb.push(")");
            deleted += qb.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Nested-set maintenance
    // -----------------------------------------------------------------------

    /// Renumber `lft`/`rgt`/`level` for the tree under `root_id`.
    ///
    /// `parent_id` is never modified. Nodes that cannot reach the root are
    /// collapsed to `lft = rgt = 0` so verification reports them. Returns
    /// `false` if `root_id` does not exist.
    pub async fn rebuild(pool: &SqlitePool, root_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin_with(BEGIN_WRITE).await?;

        let edges: Vec<EdgeRow> = sqlx::query_as(
            "SELECT id, parent_id, lft, alias, path FROM taxonomy_nodes ORDER BY lft, id",
        )
        .fetch_all(&mut *tx)
        .await?;
        if !edges.iter().any(|e| e.id == root_id) {
            return Ok(false);
        }

        let parent_edges: Vec<ParentEdge> = edges.iter().map(ParentEdge::from).collect();
        let layout = compute_layout(root_id, &parent_edges);

        for placement in &layout.placements {
            sqlx::query("UPDATE taxonomy_nodes SET lft = ?, rgt = ?, level = ? WHERE id = ?")
                .bind(placement.lft)
                .bind(placement.rgt)
                .bind(placement.level)
                .bind(placement.id)
                .execute(&mut *tx)
                .await?;
        }
        for &id in &layout.detached {
            sqlx::query("UPDATE taxonomy_nodes SET lft = 0, rgt = 0 WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        if !layout.detached.is_empty() {
            tracing::warn!(
                root_id,
                detached = layout.detached.len(),
                "Rebuild left nodes unreachable from the root",
            );
        }
        tracing::debug!(root_id, nodes = layout.placements.len(), "Nested set rebuilt");
        Ok(true)
    }

    /// Make sure the root sentinel exists with `parent_id = 0`, `level = 0`
    /// and an empty path. Returns `true` if a row was inserted or repaired.
    pub async fn ensure_root(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
        let existing = Self::find_by_id(pool, ROOT_ID).await?;

        match existing {
            None => {
                let max_rgt: Option<i64> =
                    sqlx::query_scalar("SELECT MAX(rgt) FROM taxonomy_nodes")
                        .fetch_one(pool)
                        .await?;
                sqlx::query(
                    "INSERT INTO taxonomy_nodes (id, parent_id, lft, rgt, level, path, title, alias) \
                     VALUES (?, ?, 0, ?, 0, '', 'ROOT', ?)",
                )
                .bind(ROOT_ID)
                .bind(ROOT_PARENT_ID)
                .bind(max_rgt.unwrap_or(0) + 1)
                .bind(ROOT_ALIAS)
                .execute(pool)
                .await?;
                tracing::warn!("Root node was missing and has been recreated");
                Ok(true)
            }
            Some(root)
                if root.parent_id != ROOT_PARENT_ID || root.level != 0 || !root.path.is_empty() =>
            {
                sqlx::query(
                    "UPDATE taxonomy_nodes SET parent_id = ?, level = 0, path = '' WHERE id = ?",
                )
                .bind(ROOT_PARENT_ID)
                .bind(ROOT_ID)
                .execute(pool)
                .await?;
                tracing::warn!(
                    parent_id = root.parent_id,
                    level = root.level,
                    "Root node had drifted and has been repaired",
                );
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }
}
