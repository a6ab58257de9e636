//! # keel-orm: schema-driven migrations for PostgreSQL
//!
//! A declarative table schema is ordered by its foreign-key dependencies,
//! compiled into `CREATE TABLE`/`DROP TABLE` statements, and stored as
//! immutable migration units. The runner applies and reverts those units
//! transactionally and records what ran in a tracking table.

pub mod backends;
pub mod database;
pub mod error;
pub mod migrations;
pub mod schema;

#[cfg(test)]
mod testing;

// Re-export core traits and types
pub use backends::{DatabasePool, DatabaseRow, DatabaseTransaction, DatabaseValue, PostgresPool};
pub use database::DatabaseConfig;
pub use error::{OrmError, OrmResult};
pub use migrations::{
    Migration, MigrationBuilder, MigrationConfig, MigrationManager, MigrationRecord,
    MigrationRollback, MigrationRunResult, MigrationRunner, MigrationState, MigrationStatus,
    RollbackResult,
};
pub use schema::{
    example_schema, ColumnDefinition, ColumnReference, ColumnType, DatabaseSchema, DefaultValue,
    OnDelete, SchemaManager, TableSchema,
};
