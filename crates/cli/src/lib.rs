//! Command-line front end for the taxonomy importer.

pub mod commands;
pub mod config;

pub use config::{CliConfig, ConfigError};
