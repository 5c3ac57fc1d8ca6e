/// All node and ledger primary keys are SQLite INTEGER PRIMARY KEY values.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Id of the root sentinel node every tree hangs from.
pub const ROOT_ID: DbId = 1;

/// `parent_id` carried by the root sentinel itself.
pub const ROOT_PARENT_ID: DbId = 0;

/// Alias of the root sentinel node.
pub const ROOT_ALIAS: &str = "root";

/// Width of the `path` column. Longer paths are truncated before insert.
pub const MAX_PATH_LENGTH: usize = 255;
