use crate::types::DbId;

/// Rule violations detected before a row reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Alias '{0}' must not contain '/'")]
    AliasSeparator(String),

    #[error("Path is {length} characters, maximum is {max}")]
    PathTooLong { length: usize, max: usize },

    #[error("Level must be at least 1, got {0}")]
    InvalidLevel(i32),

    #[error("Parent id {0} does not reference a node")]
    InvalidParent(DbId),
}
