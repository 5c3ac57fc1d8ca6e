//! Repository for the import ledger table.
//!
//! The table is not created by migrations. It appears the first time an
//! import records a node, which lets callers tell "never imported" apart
//! from "imported, then reset".

use sqlx::SqlitePool;
use taxonomy_core::tracking::{NewTrackingRecord, TRACKING_TABLE};
use taxonomy_core::types::DbId;

use crate::models::tracking::TrackingRow;

const COLUMNS: &str = "id, node_id, original_alias, imported_date, imported_by, source_payload";

/// Provides access to `taxonomy_import_tracking`.
pub struct TrackingRepo;

impl TrackingRepo {
    pub async fn table_exists(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(TRACKING_TABLE)
                .fetch_one(pool)
                .await?;
        Ok(count > 0)
    }

    /// Create the ledger table and its indexes if missing.
    pub async fn ensure_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {TRACKING_TABLE} (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 node_id INTEGER NOT NULL, \
                 original_alias TEXT NOT NULL, \
                 imported_date TEXT NOT NULL, \
                 imported_by INTEGER NOT NULL, \
                 source_payload TEXT NOT NULL\
             ); \
             CREATE INDEX IF NOT EXISTS idx_{TRACKING_TABLE}_node_id ON {TRACKING_TABLE}(node_id); \
             CREATE INDEX IF NOT EXISTS idx_{TRACKING_TABLE}_original_alias ON {TRACKING_TABLE}(original_alias); \
             CREATE INDEX IF NOT EXISTS idx_{TRACKING_TABLE}_imported_date ON {TRACKING_TABLE}(imported_date);"
        );
        sqlx::raw_sql(&ddl).execute(pool).await?;
        Ok(())
    }

    pub async fn insert(pool: &SqlitePool, record: &NewTrackingRecord) -> Result<DbId, sqlx::Error> {
        let query = format!(
            "INSERT INTO {TRACKING_TABLE} \
                (node_id, original_alias, imported_date, imported_by, source_payload) \
             VALUES (?, ?, ?, ?, ?)"
        );
        let result = sqlx::query(&query)
            .bind(record.node_id)
            .bind(&record.original_alias)
            .bind(record.imported_date)
            .bind(record.imported_by)
            .bind(&record.source_payload)
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Tracked node ids in insertion order.
    pub async fn list_node_ids(pool: &SqlitePool) -> Result<Vec<DbId>, sqlx::Error> {
        let query = format!("SELECT node_id FROM {TRACKING_TABLE} ORDER BY id");
        sqlx::query_scalar(&query).fetch_all(pool).await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<TrackingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {TRACKING_TABLE} ORDER BY id");
        sqlx::query_as::<_, TrackingRow>(&query).fetch_all(pool).await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {TRACKING_TABLE}");
        sqlx::query_scalar(&query).fetch_one(pool).await
    }

    /// Delete every ledger row. Returns the number removed.
    pub async fn clear(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM {TRACKING_TABLE}");
        let result = sqlx::query(&query).execute(pool).await?;
        Ok(result.rows_affected())
    }
}
