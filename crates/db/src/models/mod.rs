pub mod node;
pub mod tracking;
