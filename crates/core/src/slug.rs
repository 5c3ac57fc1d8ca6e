//! Alias generation from entry titles.
//!
//! An alias is a URL-safe slug: lowercase ASCII letters, digits and single
//! dashes, never starting or ending with a dash.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::types::Timestamp;

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("valid regex"));

static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));

static DASH_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

/// Turn a free-form title into an alias.
///
/// Accents are folded (`"Électronique"` becomes `"electronique"`), whitespace
/// and underscores become dashes, and every other character outside
/// `[a-z0-9-]` is dropped. May return an empty string for titles made only of
/// symbols; see [`alias_for_title`].
pub fn slugify(title: &str) -> String {
    let folded: String = title
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    let dashed = SEPARATOR_RE.replace_all(folded.trim(), "-");
    let cleaned = DISALLOWED_RE.replace_all(&dashed, "");
    let collapsed = DASH_RUN_RE.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// Timestamp alias used when a title produces no usable slug.
pub fn fallback_alias(now: &Timestamp) -> String {
    now.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Slugify `title`, falling back to a timestamp alias when the slug is empty.
pub fn alias_for_title(title: &str, now: &Timestamp) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        fallback_alias(now)
    } else {
        slug
    }
}
