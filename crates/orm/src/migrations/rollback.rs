//! Migration Rollback - Reverts the most recently created applied migration

use std::time::Instant;

use super::definitions::RollbackResult;
use super::runner::MigrationRunner;
use crate::error::{OrmError, OrmResult};

/// Extension trait for MigrationRunner to add rollback functionality
#[allow(async_fn_in_trait)]
pub trait MigrationRollback {
    /// Revert the applied migration with the greatest timestamp.
    ///
    /// Runs its `down` statements and deletes its tracking record in one
    /// transaction. Succeeds without doing anything when nothing is applied.
    async fn rollback_last(&self) -> OrmResult<RollbackResult>;
}

impl MigrationRollback for MigrationRunner {
    async fn rollback_last(&self) -> OrmResult<RollbackResult> {
        let start_time = Instant::now();

        self.ensure_migrations_table().await?;

        let Some(record) = self.get_latest_migration().await? else {
            tracing::info!("No migrations to rollback");
            return Ok(RollbackResult {
                rolled_back: None,
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        };

        let migration = self
            .manager()
            .find(&record.id)?
            .ok_or_else(|| OrmError::MissingMigrationFile {
                id: record.id.clone(),
            })?;

        tracing::info!("Rolling back migration: {}", migration.name);
        let removal = self.manager().remove_migration_sql(&migration.id);
        self.execute_unit(&migration, &migration.down, removal).await?;
        tracing::info!("Migration {} rolled back successfully", migration.name);

        Ok(RollbackResult {
            rolled_back: Some(migration.id),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}
