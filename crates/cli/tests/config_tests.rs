use std::collections::HashMap;

use assert_matches::assert_matches;
use taxonomy_cli::config::DEFAULT_DATABASE_URL;
use taxonomy_cli::{CliConfig, ConfigError};
use taxonomy_pipeline::ParentPrecedence;

fn load(vars: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    CliConfig::from_lookup(|key| vars.get(key).cloned())
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// An empty environment yields the documented defaults.
#[test]
fn test_defaults() {
    let config = load(&[]).unwrap();
    assert_eq!(config, CliConfig::default());
    assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    assert_eq!(config.default_parent_id, 1);
    assert_eq!(config.precedence, ParentPrecedence::AliasFirst);
    assert_eq!(config.max_connections, 5);
}

/// Blank values count as unset.
#[test]
fn test_blank_values_fall_back() {
    let config = load(&[("TAXONOMY_ACTOR_ID", "  "), ("DATABASE_URL", "")]).unwrap();
    assert_eq!(config.actor_id, 0);
    assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Every variable is read.
#[test]
fn test_reads_all_variables() {
    let config = load(&[
        ("DATABASE_URL", "sqlite::memory:"),
        ("TAXONOMY_ACTOR_ID", "42"),
        ("TAXONOMY_DEFAULT_PARENT", "7"),
        ("TAXONOMY_PARENT_PRECEDENCE", "id"),
        ("TAXONOMY_MAX_CONNECTIONS", "2"),
    ])
    .unwrap();

    assert_eq!(config.database_url, "sqlite::memory:");
    assert_eq!(config.actor_id, 42);
    assert_eq!(config.default_parent_id, 7);
    assert_eq!(config.precedence, ParentPrecedence::IdFirst);
    assert_eq!(config.max_connections, 2);
}

// ---------------------------------------------------------------------------
// Invalid values
// ---------------------------------------------------------------------------

/// Malformed values name the offending variable.
#[test]
fn test_invalid_values_are_rejected() {
    let cases = [
        ("TAXONOMY_ACTOR_ID", "-1"),
        ("TAXONOMY_ACTOR_ID", "admin"),
        ("TAXONOMY_DEFAULT_PARENT", "0"),
        ("TAXONOMY_PARENT_PRECEDENCE", "title"),
        ("TAXONOMY_MAX_CONNECTIONS", "0"),
    ];
    for (var, value) in cases {
        let err = load(&[(var, value)]).unwrap_err();
        assert_matches!(&err, ConfigError::Invalid { var: v, .. } if *v == var);
        assert!(err.to_string().contains(value), "{err}");
    }
}
