//! Parent resolution for imported entries.
//!
//! An entry can name its parent by alias, by id, or not at all. The resolver
//! tries the references in the configured order, validating each against the
//! store, and falls back to the batch default parent. Resolution never fails
//! an entry; every fallback is explained in [`ResolvedParent::notes`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use taxonomy_core::entry::EntryRecord;
use taxonomy_core::store::NodeStore;
use taxonomy_core::types::{DbId, ROOT_ID};

// ---------------------------------------------------------------------------
// Precedence
// ---------------------------------------------------------------------------

/// Which explicit parent reference is tried first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentPrecedence {
    #[default]
    AliasFirst,
    IdFirst,
}

impl ParentPrecedence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AliasFirst => "alias",
            Self::IdFirst => "id",
        }
    }
}

impl fmt::Display for ParentPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParentPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alias" | "alias-first" | "alias_first" => Ok(Self::AliasFirst),
            "id" | "id-first" | "id_first" => Ok(Self::IdFirst),
            other => Err(format!(
                "unknown parent precedence '{other}', expected 'alias' or 'id'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Where the resolved parent id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentSource {
    Alias,
    Id,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParent {
    pub id: DbId,
    pub source: ParentSource,
    /// One note per reference that was given but could not be used.
    pub notes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves parents for one batch against a fixed default.
#[derive(Debug, Clone)]
pub struct ParentResolver {
    default_parent_id: DbId,
    precedence: ParentPrecedence,
}

impl ParentResolver {
    /// Build a resolver whose default parent is known to exist.
    ///
    /// A requested default that is not the root and does not exist is
    /// replaced by the root; the returned warning says so.
    pub async fn for_batch<S: NodeStore + ?Sized>(
        store: &S,
        requested_default: DbId,
        precedence: ParentPrecedence,
    ) -> (Self, Option<String>) {
        let mut warning = None;
        let mut default_parent_id = ROOT_ID;

        if requested_default > ROOT_ID {
            match store.find_node(requested_default).await {
                Ok(Some(_)) => default_parent_id = requested_default,
                Ok(None) => {
                    warning = Some(format!(
                        "Default parent {requested_default} does not exist, using root"
                    ));
                }
                Err(e) => {
                    warning = Some(format!(
                        "Default parent {requested_default} could not be verified ({e}), using root"
                    ));
                }
            }
        } else if requested_default != ROOT_ID {
            warning = Some(format!(
                "Default parent {requested_default} is not a valid node id, using root"
            ));
        }

        if let Some(w) = &warning {
            tracing::warn!(requested_default, "{w}");
        }

        (
            Self {
                default_parent_id,
                precedence,
            },
            warning,
        )
    }

    pub fn default_parent_id(&self) -> DbId {
        self.default_parent_id
    }

    pub fn precedence(&self) -> ParentPrecedence {
        self.precedence
    }

    /// Resolve the parent for `entry`.
    pub async fn resolve<S: NodeStore + ?Sized>(
        &self,
        store: &S,
        entry: &EntryRecord,
    ) -> ResolvedParent {
        let mut notes = Vec::new();

        let order = match self.precedence {
            ParentPrecedence::AliasFirst => [ParentSource::Alias, ParentSource::Id],
            ParentPrecedence::IdFirst => [ParentSource::Id, ParentSource::Alias],
        };

        for source in order {
            let found = match source {
                ParentSource::Alias => by_alias(store, entry, &mut notes).await,
                ParentSource::Id => by_id(store, entry, &mut notes).await,
                ParentSource::Default => None,
            };
            if let Some(id) = found {
                if id > ROOT_ID {
                    tracing::debug!(alias = %entry.alias, parent_id = id, ?source, "Parent resolved");
                    return ResolvedParent { id, source, notes };
                }
                // A reference that lands on the root means "no explicit parent".
            }
        }

        ResolvedParent {
            id: self.default_parent_id,
            source: ParentSource::Default,
            notes,
        }
    }
}

async fn by_alias<S: NodeStore + ?Sized>(
    store: &S,
    entry: &EntryRecord,
    notes: &mut Vec<String>,
) -> Option<DbId> {
    let alias = entry.parent_alias.as_deref()?;
    match store.find_by_alias(alias).await {
        Ok(Some(node)) => Some(node.id),
        Ok(None) => {
            notes.push(format!("parent alias '{alias}' not found"));
            None
        }
        Err(e) => {
            notes.push(format!("parent alias '{alias}' could not be looked up: {e}"));
            None
        }
    }
}

async fn by_id<S: NodeStore + ?Sized>(
    store: &S,
    entry: &EntryRecord,
    notes: &mut Vec<String>,
) -> Option<DbId> {
    let id = entry.parent_id.filter(|id| *id > ROOT_ID)?;
    match store.find_node(id).await {
        Ok(Some(node)) => Some(node.id),
        Ok(None) => {
            notes.push(format!("parent id {id} not found"));
            None
        }
        Err(e) => {
            notes.push(format!("parent id {id} could not be looked up: {e}"));
            None
        }
    }
}
