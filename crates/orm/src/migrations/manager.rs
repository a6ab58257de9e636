//! Migration Manager - File system journal of migration units
//!
//! Each unit is stored as `<migrations_dir>/<id>.json` and never rewritten
//! once saved. The manager also owns the SQL used against the tracking table.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::backends::DatabaseValue;
use crate::error::{OrmError, OrmResult};
use crate::schema::TableSchema;

use super::builder::MigrationBuilder;
use super::compiler;
use super::definitions::{Migration, MigrationConfig};

/// Migration manager for creating and loading migrations
#[derive(Debug, Clone)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Path a unit with this id is stored at
    pub fn migration_path(&self, id: &str) -> PathBuf {
        self.config.migrations_dir.join(format!("{}.json", id))
    }

    /// Build a migration from `tables` and save it
    pub fn create_migration(&self, name: &str, tables: &[TableSchema]) -> OrmResult<Migration> {
        let migration = MigrationBuilder::build(name, tables)?;
        self.save(&migration)?;
        Ok(migration)
    }

    /// Persist a unit, refusing to overwrite an existing one
    pub fn save(&self, migration: &Migration) -> OrmResult<PathBuf> {
        let mut document = serde_json::to_string_pretty(migration)?;
        document.push('\n');
        fs::create_dir_all(&self.config.migrations_dir)?;

        let path = self.migration_path(&migration.id);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(OrmError::DuplicateMigration {
                    id: migration.id.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        // A partial document would make every later `list` fail
        let written = file.write_all(document.as_bytes()).and_then(|_| file.sync_all());
        drop(file);
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(
                    "Could not remove partial migration {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(e.into());
        }

        tracing::debug!("Saved migration {} to {}", migration.id, path.display());
        Ok(path)
    }

    /// All units, sorted by timestamp then id
    pub fn list(&self) -> OrmResult<Vec<Migration>> {
        let entries = match fs::read_dir(&self.config.migrations_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut migrations = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
                migrations.push(self.load(&path)?);
            }
        }

        migrations.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(migrations)
    }

    /// Look a unit up by id
    pub fn find(&self, id: &str) -> OrmResult<Option<Migration>> {
        let path = self.migration_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        self.load(&path).map(Some)
    }

    fn load(&self, path: &Path) -> OrmResult<Migration> {
        let corrupt = |message: String| OrmError::CorruptMigration {
            path: path.to_path_buf(),
            message,
        };

        let content = fs::read_to_string(path)?;
        let migration: Migration =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if migration.id != stem {
            return Err(corrupt(format!(
                "id '{}' does not match file name",
                migration.id
            )));
        }

        Ok(migration)
    }

    /// SQL to create the migrations tracking table
    pub fn create_migrations_table_sql(&self) -> String {
        compiler::tracking_table_sql(&self.config.migrations_table)
    }

    /// SQL to record a migration as applied
    pub fn record_migration_sql(&self, migration: &Migration) -> (String, Vec<DatabaseValue>) {
        (
            format!(
                "INSERT INTO {} (id, name, timestamp) VALUES ($1, $2, $3)",
                self.config.migrations_table
            ),
            vec![
                migration.id.as_str().into(),
                migration.name.as_str().into(),
                migration.timestamp.into(),
            ],
        )
    }

    /// SQL to remove a migration record (for rollback)
    pub fn remove_migration_sql(&self, migration_id: &str) -> (String, Vec<DatabaseValue>) {
        (
            format!("DELETE FROM {} WHERE id = $1", self.config.migrations_table),
            vec![migration_id.into()],
        )
    }

    /// SQL to get applied migrations, oldest first
    pub fn get_applied_migrations_sql(&self) -> String {
        format!(
            "SELECT id, name, timestamp, executed_at FROM {} ORDER BY timestamp ASC, id ASC",
            self.config.migrations_table
        )
    }

    /// SQL to get the most recently created applied migration
    pub fn get_latest_migration_sql(&self) -> String {
        format!(
            "SELECT id, name, timestamp, executed_at FROM {} \
             ORDER BY timestamp DESC, id DESC LIMIT 1",
            self.config.migrations_table
        )
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}
