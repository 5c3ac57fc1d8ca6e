//! Persisted taxonomy node and the insert DTO built from an entry.

use serde::{Deserialize, Serialize};

use crate::entry::EntryRecord;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp, MAX_PATH_LENGTH, ROOT_ID};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A node as stored in the taxonomy tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
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

impl Node {
    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Everything needed to insert a node as the last child of `parent_id`.
///
/// `lft`/`rgt` are not part of the DTO: the store places the node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNode {
    pub parent_id: DbId,
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
}

impl NewNode {
    /// Build the insert DTO for `entry` under a resolved parent.
    pub fn from_entry(entry: &EntryRecord, parent_id: DbId, level: i32, path: String) -> Self {
        Self {
            parent_id,
            level,
            path,
            title: entry.title.clone(),
            alias: entry.alias.clone(),
            description: entry.description.clone(),
            note: entry.note.clone(),
            meta_description: entry.meta_description.clone(),
            meta_keywords: entry.meta_keywords.clone(),
            published: entry.published,
            access: entry.access,
            language: entry.language.clone(),
            created_user_id: entry.created_user_id,
            created_time: entry.created_time,
            modified_user_id: entry.modified_user_id,
            modified_time: entry.modified_time,
        }
    }

    /// Validate the row before it is handed to the store.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::Validation("Title must not be empty".into()));
        }
        if self.alias.trim().is_empty() {
            return Err(CoreError::Validation("Alias must not be empty".into()));
        }
        if self.alias.contains('/') {
            return Err(CoreError::AliasSeparator(self.alias.clone()));
        }
        let length = self.path.chars().count();
        if length > MAX_PATH_LENGTH {
            return Err(CoreError::PathTooLong {
                length,
                max: MAX_PATH_LENGTH,
            });
        }
        if self.level < 1 {
            return Err(CoreError::InvalidLevel(self.level));
        }
        if self.parent_id < ROOT_ID {
            return Err(CoreError::InvalidParent(self.parent_id));
        }
        if self.language.trim().is_empty() {
            return Err(CoreError::Validation("Language must not be empty".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Read projections
// ---------------------------------------------------------------------------

/// A node offered as the batch default parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentCandidate {
    pub id: DbId,
    pub title: String,
    pub level: i32,
}

impl ParentCandidate {
    /// The root option, always listed first.
    pub fn root() -> Self {
        Self {
            id: ROOT_ID,
            title: "- No parent (root) -".to_string(),
            level: 0,
        }
    }

    /// Title indented by level, for plain-text pickers.
    pub fn label(&self) -> String {
        let depth = usize::try_from(self.level.saturating_sub(1)).unwrap_or(0);
        format!("{}{}", "- ".repeat(depth), self.title)
    }
}

impl From<&Node> for ParentCandidate {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            title: node.title.clone(),
            level: node.level,
        }
    }
}
