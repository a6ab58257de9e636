//! Migration System
//!
//! Schema tables flow through the resolver and compiler into immutable
//! migration units, which the journal stores and the runner applies.

pub mod builder;
pub mod compiler;
pub mod definitions;
pub mod manager;
pub mod resolver;
pub mod rollback;
pub mod runner;

pub use builder::MigrationBuilder;
pub use compiler::{compile, compile_schema, drop_table_cascade, tracking_table_sql, CompiledTable};
pub use definitions::*;
pub use manager::MigrationManager;
pub use rollback::MigrationRollback;
pub use runner::MigrationRunner;
