//! Row models for the `taxonomy_nodes` table.

use sqlx::FromRow;
use taxonomy_core::nested_set::{AliasEdge, NestedSetRow, ParentEdge};
use taxonomy_core::node::Node;
use taxonomy_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A full row from `taxonomy_nodes`.
#[derive(Debug, Clone, FromRow)]
pub struct NodeRow {
    pub id: DbId,
    pub parent_id: DbId,
    pub lft: i64,
    pub rgt: i64,
    pub level: i32,
    pub path: String,
    pub title: String,
    pub alias: String,
    pub description: String,
    pub note: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub published: bool,
    pub access: i64,
    pub language: String,
    pub created_user_id: DbId,
    pub created_time: Timestamp,
    pub modified_user_id: DbId,
    pub modified_time: Timestamp,
    pub hits: i64,
    pub version: i64,
}

impl From<NodeRow> for Node {
    fn from(row: NodeRow) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            lft: row.lft,
            rgt: row.rgt,
            level: row.level,
            path: row.path,
            title: row.title,
            alias: row.alias,
            description: row.description,
            note: row.note,
            meta_description: row.meta_description,
            meta_keywords: row.meta_keywords,
            published: row.published,
            access: row.access,
            language: row.language,
            created_user_id: row.created_user_id,
            created_time: row.created_time,
            modified_user_id: row.modified_user_id,
            modified_time: row.modified_time,
            hits: row.hits,
            version: row.version,
        }
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// `(id, parent_id, lft, alias, path)` projection used by rebuild and path
/// refresh.
#[derive(Debug, Clone, FromRow)]
pub struct EdgeRow {
    pub id: DbId,
    pub parent_id: DbId,
    pub lft: i64,
    pub alias: String,
    pub path: String,
}

impl From<&EdgeRow> for ParentEdge {
    fn from(row: &EdgeRow) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            lft: row.lft,
        }
    }
}

impl From<EdgeRow> for AliasEdge {
    fn from(row: EdgeRow) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            lft: row.lft,
            alias: row.alias,
            path: row.path,
        }
    }
}

/// Coordinates projection used by verification.
#[derive(Debug, Clone, FromRow)]
pub struct CoordinateRow {
    pub id: DbId,
    pub parent_id: DbId,
    pub lft: i64,
    pub rgt: i64,
    pub level: i32,
    pub title: String,
}

impl From<CoordinateRow> for NestedSetRow {
    fn from(row: CoordinateRow) -> Self {
        Self {
            id: row.id,
            parent_id: row.parent_id,
            lft: row.lft,
            rgt: row.rgt,
            level: row.level,
            title: row.title,
        }
    }
}
