use taxonomy_core::types::{DbId, ROOT_ID};
use taxonomy_pipeline::ParentPrecedence;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Importer configuration loaded from environment variables.
///
/// Every field has a default suitable for local use. Command-line flags
/// override individual fields per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// SQLite connection string.
    pub database_url: String,
    /// User recorded as creator and importer.
    pub actor_id: DbId,
    /// Batch default parent.
    pub default_parent_id: DbId,
    pub precedence: ParentPrecedence,
    /// Pool size (default: `5`).
    pub max_connections: u32,
}

pub const DEFAULT_DATABASE_URL: &str = "sqlite://taxonomy.db?mode=rwc";

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            actor_id: 0,
            default_parent_id: ROOT_ID,
            precedence: ParentPrecedence::AliasFirst,
            max_connections: 5,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                         |
    /// |------------------------------|---------------------------------|
    /// | `DATABASE_URL`               | `sqlite://taxonomy.db?mode=rwc` |
    /// | `TAXONOMY_ACTOR_ID`          | `0`                             |
    /// | `TAXONOMY_DEFAULT_PARENT`    | `1`                             |
    /// | `TAXONOMY_PARENT_PRECEDENCE` | `alias`                         |
    /// | `TAXONOMY_MAX_CONNECTIONS`   | `5`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CliConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").unwrap_or(defaults.database_url);

        let actor_id = match var("TAXONOMY_ACTOR_ID") {
            Some(raw) => parse(&raw, "TAXONOMY_ACTOR_ID", "a non-negative integer")
                .filter(|id: &DbId| *id >= 0)
                .ok_or_else(|| invalid("TAXONOMY_ACTOR_ID", "a non-negative integer", raw))?,
            None => defaults.actor_id,
        };

        let default_parent_id = match var("TAXONOMY_DEFAULT_PARENT") {
            Some(raw) => parse(&raw, "TAXONOMY_DEFAULT_PARENT", "a node id")
                .filter(|id: &DbId| *id >= ROOT_ID)
                .ok_or_else(|| invalid("TAXONOMY_DEFAULT_PARENT", "a node id", raw))?,
            None => defaults.default_parent_id,
        };

        let precedence = match var("TAXONOMY_PARENT_PRECEDENCE") {
            Some(raw) => raw
                .parse()
                .map_err(|_| invalid("TAXONOMY_PARENT_PRECEDENCE", "'alias' or 'id'", raw))?,
            None => defaults.precedence,
        };

        let max_connections = match var("TAXONOMY_MAX_CONNECTIONS") {
            Some(raw) => parse(&raw, "TAXONOMY_MAX_CONNECTIONS", "a positive integer")
                .filter(|n: &u32| *n > 0)
                .ok_or_else(|| invalid("TAXONOMY_MAX_CONNECTIONS", "a positive integer", raw))?,
            None => defaults.max_connections,
        };

        Ok(Self {
            database_url,
            actor_id,
            default_parent_id,
            precedence,
            max_connections,
        })
    }
}

fn parse<T: std::str::FromStr>(raw: &str, var: &'static str, expected: &'static str) -> Option<T> {
    let parsed = raw.parse().ok();
    if parsed.is_none() {
        tracing::debug!(var, expected, value = raw, "Unparseable configuration value");
    }
    parsed
}

fn invalid(var: &'static str, expected: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected,
        value,
    }
}
