//! Domain types and pure logic for taxonomy imports.
//!
//! Nothing in this crate performs I/O. Persistence is reached through the
//! traits in [`store`].

pub mod entry;
pub mod error;
pub mod hierarchy;
pub mod nested_set;
pub mod node;
pub mod outcome;
pub mod path;
pub mod preview;
pub mod slug;
pub mod store;
pub mod tracking;
pub mod types;
