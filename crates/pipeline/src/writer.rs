//! Turns a resolved entry into a stored node.

use taxonomy_core::entry::EntryRecord;
use taxonomy_core::node::NewNode;
use taxonomy_core::outcome::ImportIssue;
use taxonomy_core::path::{effective_level, effective_path, truncate_path};
use taxonomy_core::store::{NodeStore, StoreError};
use taxonomy_core::types::DbId;

/// A node the writer created, as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenNode {
    pub id: DbId,
    pub parent_id: DbId,
    pub level: i32,
    pub path: String,
    /// Non-fatal notes, such as a truncated path.
    pub warnings: Vec<String>,
}

/// Builds and inserts one node per entry.
///
/// Stateless; each call commits independently through the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedSetWriter;

impl NestedSetWriter {
    pub fn new() -> Self {
        Self
    }

    /// Insert `entry` as the last child of `parent_id`.
    ///
    /// Entries whose alias already exists are skipped with
    /// [`ImportIssue::DuplicateAlias`]. Validation and store failures skip
    /// the entry with [`ImportIssue::StoreWriteFailed`].
    pub async fn write<S: NodeStore + ?Sized>(
        &self,
        store: &S,
        entry: &EntryRecord,
        parent_id: DbId,
    ) -> Result<WrittenNode, ImportIssue> {
        let write_failed = |detail: String| ImportIssue::StoreWriteFailed {
            index: entry.index,
            title: entry.title.clone(),
            detail,
        };

        match store.find_by_alias(&entry.alias).await {
            Ok(Some(_)) => {
                return Err(ImportIssue::DuplicateAlias {
                    index: entry.index,
                    alias: entry.alias.clone(),
                })
            }
            Ok(None) => {}
            Err(e) => return Err(write_failed(format!("alias lookup failed: {e}"))),
        }

        let parent = store
            .find_node(parent_id)
            .await
            .map_err(|e| write_failed(format!("parent lookup failed: {e}")))?
            .ok_or_else(|| write_failed(format!("parent {parent_id} no longer exists")))?;

        let mut warnings = Vec::new();
        let level = effective_level(parent.level, entry.level);
        let full_path = effective_path(&parent.path, &entry.alias, entry.path.as_deref());
        let path = truncate_path(&full_path);
        if path != full_path {
            tracing::warn!(
                alias = %entry.alias,
                original_len = full_path.chars().count(),
                "Path truncated to fit column",
            );
            warnings.push(format!(
                "Entry at index {} ('{}'): path truncated to '{path}'",
                entry.index, entry.alias
            ));
        }

        let new_node = NewNode::from_entry(entry, parent.id, level, path);
        new_node
            .check()
            .map_err(|e| write_failed(format!("check failed: {e}")))?;

        let id = match store.insert_node(&new_node).await {
            Ok(id) => id,
            Err(StoreError::DuplicateAlias(alias)) => {
                return Err(ImportIssue::DuplicateAlias {
                    index: entry.index,
                    alias,
                })
            }
            Err(e) => return Err(write_failed(format!("store failed: {e}"))),
        };

        // Re-read for the values the store actually kept.
        match store.find_node(id).await {
            Ok(Some(node)) => Ok(WrittenNode {
                id,
                parent_id: node.parent_id,
                level: node.level,
                path: node.path,
                warnings,
            }),
            Ok(None) | Err(_) => {
                tracing::warn!(id, alias = %entry.alias, "Inserted node could not be read back");
                warnings.push(format!(
                    "Node {id} ('{}') was inserted but could not be read back",
                    entry.alias
                ));
                Ok(WrittenNode {
                    id,
                    parent_id: new_node.parent_id,
                    level: new_node.level,
                    path: new_node.path,
                    warnings,
                })
            }
        }
    }
}
