//! Declarative schema model
//!
//! The schema document describes tables, their columns and foreign keys.
//! [`SchemaManager`] loads and persists it; the migration layer consumes the
//! validated [`DatabaseSchema`].

pub mod example;
pub mod manager;
pub mod types;

pub use example::example_schema;
pub use manager::SchemaManager;
pub use types::*;
