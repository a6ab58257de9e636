//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the fundamental types used throughout the migration system including
//! Migration, MigrationRecord, and MigrationConfig structures.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::backends::DatabaseRow;
use crate::error::OrmResult;

/// An immutable, named, timestamped pair of forward/reverse statement lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// `<unix-millis>_<name>`
    pub id: String,
    /// Human-readable name for the migration
    pub name: String,
    /// Creation time in unix milliseconds, same value as the `id` prefix
    pub timestamp: i64,
    /// Statements that apply the migration, in execution order
    pub up: Vec<String>,
    /// Statements that revert the migration, in execution order
    pub down: Vec<String>,
}

impl Migration {
    /// Assemble a unit, deriving its id from timestamp and name
    pub fn new(name: &str, timestamp: i64, up: Vec<String>, down: Vec<String>) -> Self {
        Self {
            id: format!("{}_{}", timestamp, name),
            name: name.to_string(),
            timestamp,
            up,
            down,
        }
    }
}

/// A row of the tracking table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub id: String,
    pub name: String,
    pub timestamp: i64,
    pub executed_at: NaiveDateTime,
}

impl MigrationRecord {
    /// Decode a tracking-table row, failing on missing columns or wrong types
    pub fn from_row(row: &dyn DatabaseRow) -> OrmResult<Self> {
        Ok(Self {
            id: row.get_by_name("id")?.into_string("id")?,
            name: row.get_by_name("name")?.into_string("name")?,
            timestamp: row.get_by_name("timestamp")?.into_i64("timestamp")?,
            executed_at: row.get_by_name("executed_at")?.into_datetime("executed_at")?,
        })
    }
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where migration files are stored
    pub migrations_dir: PathBuf,
    /// Table name for tracking migrations
    pub migrations_table: String,
    /// Location of the schema document
    pub schema_path: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: "_migrations".to_string(),
            schema_path: PathBuf::from("schema.json"),
        }
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// IDs of migrations that were applied
    pub applied_migrations: Vec<String>,
    /// Number of migrations that were skipped (already applied)
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of rolling back the latest migration
#[derive(Debug)]
pub struct RollbackResult {
    /// The migration that was rolled back, if any was applied
    pub rolled_back: Option<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Migration is pending (not yet applied)
    Pending,
    /// Migration has been applied
    Applied {
        /// When it was applied
        executed_at: NaiveDateTime,
    },
}

/// A journal unit paired with its status
#[derive(Debug, Clone)]
pub struct MigrationState {
    pub migration: Migration,
    pub status: MigrationStatus,
}
