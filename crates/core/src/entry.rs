//! Entry decoding for taxonomy imports.
//!
//! Turns an already-parsed JSON document into an [`EntryBatch`] of strongly
//! typed [`EntryRecord`]s. This is the only place where loosely typed input is
//! coerced and defaults are applied; everything downstream works on the typed
//! records.
//!
//! Accepted shapes:
//!
//! - `[ {..}, {..} ]`
//! - `{ "value": [ .. ] }`, `{ "tags": [ .. ] }`, `{ "categories": [ .. ] }`
//!
//! A shape problem rejects the whole document with
//! [`DecodeError::InvalidStructure`]. A problem with one element only rejects
//! that element; it is recorded in [`EntryBatch::rejected`] and the remaining
//! elements still decode.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::slug::alias_for_title;
use crate::types::{DbId, Timestamp, MAX_PATH_LENGTH};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Object keys that may wrap the entry array.
pub const WRAPPER_KEYS: &[&str] = &["value", "tags", "categories"];

/// Language tag applied when an entry does not carry one.
pub const DEFAULT_LANGUAGE: &str = "*";

/// Access level applied when an entry does not carry one.
pub const DEFAULT_ACCESS: i64 = 1;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Who is importing and when. Supplies the audit defaults.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
    pub actor_id: DbId,
    pub now: Timestamp,
}

impl DecodeContext {
    pub fn new(actor_id: DbId) -> Self {
        Self {
            actor_id,
            now: chrono::Utc::now(),
        }
    }
}

/// One normalized entry, ready for sorting and resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRecord {
    /// Position of the element in the source array.
    pub index: usize,
    pub title: String,
    pub alias: String,
    pub description: String,
    pub note: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub published: bool,
    pub access: i64,
    pub language: String,
    pub parent_id: Option<DbId>,
    pub parent_alias: Option<String>,
    /// Caller-supplied path, used instead of the computed one.
    pub path: Option<String>,
    /// Caller-supplied level, only kept when positive.
    pub level: Option<i32>,
    pub created_user_id: DbId,
    pub created_time: Timestamp,
    pub modified_user_id: DbId,
    pub modified_time: Timestamp,
    /// The original JSON element, kept for the tracking ledger.
    pub source: Value,
}

/// An element that could not be turned into an [`EntryRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    pub index: usize,
    pub reason: String,
}

/// The decoded form of one import document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntryBatch {
    pub entries: Vec<EntryRecord>,
    pub rejected: Vec<RejectedEntry>,
    /// Non-fatal diagnostics produced while decoding.
    pub warnings: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

impl EntryBatch {
    /// Parse raw bytes and decode them.
    pub fn from_slice(bytes: &[u8], ctx: &DecodeContext) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&value, ctx)
    }

    /// Decode an already-parsed JSON document.
    pub fn from_value(value: &Value, ctx: &DecodeContext) -> Result<Self, DecodeError> {
        let items = unwrap_entries(value)?;
        let mut batch = EntryBatch::default();

        for (index, item) in items.iter().enumerate() {
            match decode_entry(index, item, ctx) {
                Ok(entry) => {
                    if let Some(path) = entry.path.as_deref() {
                        let len = path.chars().count();
                        if len > MAX_PATH_LENGTH {
                            tracing::warn!(
                                index,
                                title = %entry.title,
                                path_len = len,
                                "Override path exceeds column width and will be truncated",
                            );
                            batch.warnings.push(format!(
                                "Entry at index {index} ('{}'): path has {len} characters and \
                                 will be truncated to {MAX_PATH_LENGTH}",
                                entry.title
                            ));
                        }
                    }
                    batch.entries.push(entry);
                }
                Err(reason) => {
                    tracing::debug!(index, %reason, "Rejected import entry");
                    batch.rejected.push(RejectedEntry { index, reason });
                }
            }
        }

        Ok(batch)
    }

    /// Total number of elements in the source document.
    pub fn source_len(&self) -> usize {
        self.entries.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RejectedEntry {
    /// Human-readable message naming the element index.
    pub fn message(&self) -> String {
        format!("Entry at index {}: {}", self.index, self.reason)
    }
}

fn unwrap_entries(value: &Value) -> Result<&Vec<Value>, DecodeError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or_else(|| {
                DecodeError::InvalidStructure(format!(
                    "expected an array of entries or an object wrapping one under one of: {}",
                    WRAPPER_KEYS.join(", ")
                ))
            })?,
        other => {
            return Err(DecodeError::InvalidStructure(format!(
                "expected an array of entries, found {}",
                json_kind(other)
            )))
        }
    };

    if items.is_empty() {
        return Err(DecodeError::InvalidStructure(
            "the entry list is empty".to_string(),
        ));
    }
    Ok(items)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Accepted spellings per field. When an element carries more than one, the
/// first one present with a usable value wins.
mod keys {
    pub const TITLE: &[&str] = &["title"];
    pub const ALIAS: &[&str] = &["alias"];
    pub const DESCRIPTION: &[&str] = &["description"];
    pub const NOTE: &[&str] = &["note"];
    pub const META_DESCRIPTION: &[&str] = &["meta_description", "metaDescription", "metadesc"];
    pub const META_KEYWORDS: &[&str] = &["meta_keywords", "metaKeywords", "metakey"];
    pub const PUBLISHED: &[&str] = &["published"];
    pub const ACCESS: &[&str] = &["access"];
    pub const LANGUAGE: &[&str] = &["language"];
    pub const PARENT_ID: &[&str] = &["parent_id", "parentId"];
    pub const PARENT_ALIAS: &[&str] = &["parent_alias", "parentAlias"];
    pub const PATH: &[&str] = &["path"];
    pub const LEVEL: &[&str] = &["level"];
    pub const CREATED_USER_ID: &[&str] = &["created_user_id", "createdUserId"];
    pub const CREATED_TIME: &[&str] = &["created_time", "createdTime"];
    pub const MODIFIED_USER_ID: &[&str] = &["modified_user_id", "modifiedUserId"];
    pub const MODIFIED_TIME: &[&str] = &["modified_time", "modifiedTime"];
}

/// Wire shape of one element. Every field is optional and leniently typed;
/// [`decode_entry`] applies the defaults.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    alias: Option<String>,
    description: Option<String>,
    note: Option<String>,
    meta_description: Option<String>,
    meta_keywords: Option<String>,
    published: Option<bool>,
    access: Option<i64>,
    language: Option<String>,
    parent_id: Option<i64>,
    parent_alias: Option<String>,
    path: Option<String>,
    level: Option<i64>,
    created_user_id: Option<i64>,
    created_time: Option<String>,
    modified_user_id: Option<i64>,
    modified_time: Option<String>,
}

impl RawEntry {
    fn from_map(map: &Map<String, Value>) -> Self {
        let text = |names: &[&str]| first(map, names, lenient::text);
        let int = |names: &[&str]| first(map, names, lenient::int);

        Self {
            title: text(keys::TITLE),
            alias: text(keys::ALIAS),
            description: text(keys::DESCRIPTION),
            note: text(keys::NOTE),
            meta_description: text(keys::META_DESCRIPTION),
            meta_keywords: text(keys::META_KEYWORDS),
            published: first(map, keys::PUBLISHED, lenient::flag),
            access: int(keys::ACCESS),
            language: text(keys::LANGUAGE),
            parent_id: int(keys::PARENT_ID),
            parent_alias: text(keys::PARENT_ALIAS),
            path: text(keys::PATH),
            level: int(keys::LEVEL),
            created_user_id: int(keys::CREATED_USER_ID),
            created_time: text(keys::CREATED_TIME),
            modified_user_id: int(keys::MODIFIED_USER_ID),
            modified_time: text(keys::MODIFIED_TIME),
        }
    }
}

fn first<T>(
    map: &Map<String, Value>,
    names: &[&str],
    coerce: fn(&Value) -> Option<T>,
) -> Option<T> {
    names
        .iter()
        .filter_map(|name| map.get(*name))
        .find_map(coerce)
}

fn decode_entry(index: usize, item: &Value, ctx: &DecodeContext) -> Result<EntryRecord, String> {
    let Value::Object(map) = item else {
        return Err(format!("expected an object, found {}", json_kind(item)));
    };
    let raw = RawEntry::from_map(map);
    let title = non_blank(raw.title).ok_or_else(|| "title is missing or empty".to_string())?;
    let alias = non_blank(raw.alias).unwrap_or_else(|| alias_for_title(&title, &ctx.now));
    let created_time = raw
        .created_time
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(ctx.now);
    let modified_time = raw
        .modified_time
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(created_time);

    Ok(EntryRecord {
        index,
        title,
        alias,
        description: raw.description.unwrap_or_default(),
        note: raw.note.unwrap_or_default(),
        meta_description: raw.meta_description.unwrap_or_default(),
        meta_keywords: raw.meta_keywords.unwrap_or_default(),
        published: raw.published.unwrap_or(true),
        access: raw.access.unwrap_or(DEFAULT_ACCESS),
        language: non_blank(raw.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        parent_id: raw.parent_id,
        parent_alias: non_blank(raw.parent_alias),
        path: non_blank(raw.path),
        level: raw
            .level
            .filter(|level| *level > 0)
            .and_then(|level| i32::try_from(level).ok()),
        created_user_id: raw.created_user_id.unwrap_or(ctx.actor_id),
        created_time,
        modified_user_id: raw.modified_user_id.unwrap_or(ctx.actor_id),
        modified_time,
        source: item.clone(),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&chrono::Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Coercions for loosely typed values. A value of the wrong kind yields
/// `None`.
mod lenient {
    use serde_json::Value;

    pub fn text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn flag(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            other => int(other).map(|n| n != 0),
        }
    }

    pub fn int(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
