//! Taxonomy import pipeline.
//!
//! Decoder → sorter → {resolver → writer → ledger} per entry → rebuild once
//! per batch. Every stage talks to storage through the
//! [`taxonomy_core::store`] traits.

pub mod importer;
pub mod ledger;
pub mod maintenance;
pub mod rebuild;
pub mod resolver;
pub mod writer;

pub use importer::{decode, ImportOptions, TaxonomyImporter};
pub use rebuild::{RebuildEngine, RebuildReport};
pub use resolver::{ParentPrecedence, ParentResolver};
