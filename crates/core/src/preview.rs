//! Dry-run summary of a decoded batch.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::entry::{EntryBatch, RejectedEntry};
use crate::hierarchy::order_by_hierarchy;
use crate::path::needs_truncation;
use crate::types::DbId;

/// One entry as it would be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub index: usize,
    pub title: String,
    pub alias: String,
    pub parent_alias: Option<String>,
    pub parent_id: Option<DbId>,
}

/// What committing a batch would attempt, computed without a store.
#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    pub total: usize,
    pub valid: usize,
    pub rejected: Vec<RejectedEntry>,
    pub batch_roots: usize,
    pub children: usize,
    /// Rows in insertion order.
    pub rows: Vec<PreviewRow>,
    /// Parent aliases that no entry in the batch defines. They must already
    /// exist in the store or the entry falls back to the default parent.
    pub external_parents: Vec<String>,
    /// Indices of entries whose override path will be truncated.
    pub truncated_paths: Vec<usize>,
    /// Aliases that appear more than once; only the first occurrence can import.
    pub duplicate_aliases: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportPreview {
    pub fn from_batch(batch: &EntryBatch) -> Self {
        let batch_roots = batch
            .entries
            .iter()
            .filter(|e| e.parent_alias.is_none())
            .count();

        let defined: HashSet<&str> = batch.entries.iter().map(|e| e.alias.as_str()).collect();
        let external_parents: BTreeSet<String> = batch
            .entries
            .iter()
            .filter_map(|e| e.parent_alias.as_deref())
            .filter(|parent| !defined.contains(parent))
            .map(str::to_string)
            .collect();

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for entry in &batch.entries {
            *seen.entry(entry.alias.as_str()).or_default() += 1;
        }
        let duplicate_aliases: BTreeSet<String> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(alias, _)| alias.to_string())
            .collect();

        let truncated_paths = batch
            .entries
            .iter()
            .filter(|e| e.path.as_deref().is_some_and(needs_truncation))
            .map(|e| e.index)
            .collect();

        let order = order_by_hierarchy(batch.entries.clone());
        let rows = order
            .entries
            .iter()
            .map(|e| PreviewRow {
                index: e.index,
                title: e.title.clone(),
                alias: e.alias.clone(),
                parent_alias: e.parent_alias.clone(),
                parent_id: e.parent_id,
            })
            .collect();

        Self {
            total: batch.source_len(),
            valid: batch.entries.len(),
            rejected: batch.rejected.clone(),
            batch_roots,
            children: batch.entries.len() - batch_roots,
            rows,
            external_parents: external_parents.into_iter().collect(),
            truncated_paths,
            duplicate_aliases: duplicate_aliases.into_iter().collect(),
            warnings: batch.warnings.clone(),
        }
    }
}
