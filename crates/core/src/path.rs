//! Level and path rules for new nodes.
//!
//! A node's path is its parent's path joined with its own alias by `/`. The
//! root's path is empty, so first-level nodes get their bare alias. Paths are
//! stored in a 255-character column; longer ones keep their tail, which is
//! the part that identifies the node.

use crate::types::MAX_PATH_LENGTH;

/// Prefix marking a path that lost its leading characters.
pub const TRUNCATION_MARKER: &str = "...";

/// Path of a child with `alias` under a parent whose path is `parent_path`.
pub fn child_path(parent_path: &str, alias: &str) -> String {
    if parent_path.is_empty() {
        alias.to_string()
    } else {
        format!("{parent_path}/{alias}")
    }
}

/// Fit `path` into [`MAX_PATH_LENGTH`] characters.
///
/// Returns the path unchanged when it already fits. Otherwise the result is
/// [`TRUNCATION_MARKER`] followed by the longest suffix that keeps the total
/// within the limit. Lengths are counted in characters, not bytes.
pub fn truncate_path(path: &str) -> String {
    let len = path.chars().count();
    if len <= MAX_PATH_LENGTH {
        return path.to_string();
    }

    let keep = MAX_PATH_LENGTH - TRUNCATION_MARKER.len();
    let suffix: String = path.chars().skip(len - keep).collect();
    let truncated = format!("{TRUNCATION_MARKER}{suffix}");

    if truncated.chars().count() > MAX_PATH_LENGTH {
        return path.chars().skip(len - MAX_PATH_LENGTH).collect();
    }
    truncated
}

/// Whether [`truncate_path`] would change `path`.
pub fn needs_truncation(path: &str) -> bool {
    path.chars().count() > MAX_PATH_LENGTH
}

/// Level of a new node: the override when positive, else parent level + 1.
pub fn effective_level(parent_level: i32, level_override: Option<i32>) -> i32 {
    match level_override {
        Some(level) if level > 0 => level,
        _ => parent_level + 1,
    }
}

/// Path of a new node before truncation: the override when given, else the
/// path derived from the parent.
pub fn effective_path(parent_path: &str, alias: &str, path_override: Option<&str>) -> String {
    match path_override {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => child_path(parent_path, alias),
    }
}
