//! Migration Runner - Executes migrations against the database
//!
//! Every migration runs in its own transaction together with its tracking
//! record, so a unit is either fully applied and recorded or not at all.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use super::compiler;
use super::definitions::{
    Migration, MigrationRecord, MigrationRunResult, MigrationState, MigrationStatus,
};
use super::manager::MigrationManager;
use super::resolver;
use crate::backends::{DatabasePool, DatabaseTransaction, DatabaseValue};
use crate::database::DatabaseConfig;
use crate::error::{OrmError, OrmResult};
use crate::schema::DatabaseSchema;

/// Migration runner that executes migrations against a database
pub struct MigrationRunner {
    manager: MigrationManager,
    pool: Arc<dyn DatabasePool>,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(manager: MigrationManager, pool: Arc<dyn DatabasePool>) -> Self {
        Self { manager, pool }
    }

    /// Create a new migration runner by connecting with `config`
    pub async fn connect(manager: MigrationManager, config: &DatabaseConfig) -> OrmResult<Self> {
        let pool = config.connect().await?;
        Ok(Self::new(manager, pool))
    }

    /// Get the database pool
    pub fn pool(&self) -> &dyn DatabasePool {
        self.pool.as_ref()
    }

    /// Get the migration manager
    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Create the migrations directory and the tracking table
    pub async fn initialize(&self) -> OrmResult<()> {
        fs::create_dir_all(&self.manager.config().migrations_dir)?;
        self.ensure_migrations_table().await
    }

    /// Run all pending migrations in timestamp order
    pub async fn run_migrations(&self) -> OrmResult<MigrationRunResult> {
        let start_time = Instant::now();

        self.ensure_migrations_table().await?;

        let all_migrations = self.manager.list()?;
        let applied_ids: HashSet<String> = self
            .get_applied_migrations()
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();

        let mut applied_migration_ids = Vec::new();
        let mut skipped_count = 0;

        for migration in &all_migrations {
            if applied_ids.contains(&migration.id) {
                skipped_count += 1;
                continue;
            }

            tracing::info!("Running migration: {}", migration.name);
            let record = self.manager.record_migration_sql(migration);
            self.execute_unit(migration, &migration.up, record).await?;
            tracing::info!("Migration {} completed", migration.name);

            applied_migration_ids.push(migration.id.clone());
        }

        Ok(MigrationRunResult {
            applied_count: applied_migration_ids.len(),
            applied_migrations: applied_migration_ids,
            skipped_count,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Pair every journal unit with its status
    pub async fn status(&self) -> OrmResult<Vec<MigrationState>> {
        self.ensure_migrations_table().await?;

        let all_migrations = self.manager.list()?;
        let applied = self.get_applied_migrations().await?;

        let known: HashSet<&str> = all_migrations.iter().map(|m| m.id.as_str()).collect();
        for orphan in applied.iter().filter(|r| !known.contains(r.id.as_str())) {
            tracing::warn!(
                "Applied migration {} has no migration file in {}",
                orphan.id,
                self.manager.config().migrations_dir.display()
            );
        }

        Ok(all_migrations
            .into_iter()
            .map(|migration| {
                let status = match applied.iter().find(|r| r.id == migration.id) {
                    Some(record) => MigrationStatus::Applied {
                        executed_at: record.executed_at,
                    },
                    None => MigrationStatus::Pending,
                };
                MigrationState { migration, status }
            })
            .collect())
    }

    /// Drop every schema table, dependents first, in one transaction.
    ///
    /// Returns the dropped table names in execution order.
    pub async fn clear(&self, schema: &DatabaseSchema) -> OrmResult<Vec<String>> {
        let tables: Vec<String> = resolver::order(&schema.tables)?
            .into_iter()
            .rev()
            .map(|table| table.name)
            .collect();
        let statements: Vec<String> = tables
            .iter()
            .map(|name| compiler::drop_table_cascade(name))
            .collect();

        let mut transaction = self.pool.begin_transaction().await?;
        for statement in &statements {
            tracing::info!("Executing: {}", statement);
            if let Err(e) = transaction.execute(statement, &[]).await {
                abort(transaction).await;
                return Err(e);
            }
        }
        transaction
            .commit()
            .await
            .map_err(|e| OrmError::Transaction(format!("Failed to commit clear: {}", e)))?;

        Ok(tables)
    }

    /// Applied migrations recorded in the tracking table, oldest first
    pub async fn get_applied_migrations(&self) -> OrmResult<Vec<MigrationRecord>> {
        let sql = self.manager.get_applied_migrations_sql();
        let rows = self.pool.fetch_all(&sql, &[]).await?;
        rows.iter()
            .map(|row| MigrationRecord::from_row(&**row))
            .collect()
    }

    /// The applied migration with the greatest timestamp
    pub(crate) async fn get_latest_migration(&self) -> OrmResult<Option<MigrationRecord>> {
        let sql = self.manager.get_latest_migration_sql();
        let rows = self.pool.fetch_all(&sql, &[]).await?;
        rows.first()
            .map(|row| MigrationRecord::from_row(&**row))
            .transpose()
    }

    /// Ensure migrations table exists
    pub(crate) async fn ensure_migrations_table(&self) -> OrmResult<()> {
        let sql = self.manager.create_migrations_table_sql();
        self.pool.execute(&sql, &[]).await.map_err(|e| {
            OrmError::Database(format!("Failed to create migrations table: {}", e))
        })?;
        Ok(())
    }

    /// Run `statements` then the bookkeeping statement in one transaction.
    ///
    /// On the first failure the transaction is rolled back and the failing
    /// statement is reported.
    pub(crate) async fn execute_unit(
        &self,
        migration: &Migration,
        statements: &[String],
        bookkeeping: (String, Vec<DatabaseValue>),
    ) -> OrmResult<()> {
        let mut transaction = self.pool.begin_transaction().await?;

        for statement in statements {
            tracing::debug!("{}: {}", migration.id, statement);
            if let Err(e) = transaction.execute(statement, &[]).await {
                abort(transaction).await;
                return Err(statement_failure(migration, statement, e));
            }
        }

        let (sql, params) = bookkeeping;
        if let Err(e) = transaction.execute(&sql, &params).await {
            abort(transaction).await;
            return Err(statement_failure(migration, &sql, e));
        }

        transaction.commit().await.map_err(|e| {
            OrmError::Transaction(format!("Failed to commit migration {}: {}", migration.id, e))
        })
    }
}

async fn abort(transaction: Box<dyn DatabaseTransaction>) {
    if let Err(e) = transaction.rollback().await {
        tracing::error!("Rollback failed: {}", e);
    }
}

fn statement_failure(migration: &Migration, statement: &str, error: OrmError) -> OrmError {
    let message = match error {
        OrmError::Database(message) => message,
        other => other.to_string(),
    };
    OrmError::StatementExecution {
        migration: migration.id.clone(),
        statement: statement.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::definitions::MigrationConfig;
    use crate::schema::example_schema;
    use crate::testing::MockPool;
    use tempfile::TempDir;

    fn runner(dir: &TempDir, pool: &MockPool) -> MigrationRunner {
        let manager = MigrationManager::with_config(MigrationConfig {
            migrations_dir: dir.path().join("migrations"),
            ..MigrationConfig::default()
        });
        MigrationRunner::new(manager, Arc::new(pool.clone()))
    }

    fn unit(name: &str, timestamp: i64, table: &str) -> Migration {
        Migration::new(
            name,
            timestamp,
            vec![format!("CREATE TABLE {} (\n    id UUID\n);", table)],
            vec![format!("DROP TABLE IF EXISTS {};", table)],
        )
    }

    #[tokio::test]
    async fn test_initialize_creates_directory_and_table() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);

        runner.initialize().await.unwrap();
        assert!(dir.path().join("migrations").is_dir());
        assert!(pool.tracking_table_created());
    }

    #[tokio::test]
    async fn test_applies_pending_migrations_in_order() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);
        runner.manager().save(&unit("add_posts", 200, "posts")).unwrap();
        runner.manager().save(&unit("add_users", 100, "users")).unwrap();

        let result = runner.run_migrations().await.unwrap();
        assert_eq!(result.applied_count, 2);
        assert_eq!(result.applied_migrations, vec!["100_add_users", "200_add_posts"]);
        assert_eq!(result.skipped_count, 0);

        let records = runner.get_applied_migrations().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].executed_at < records[1].executed_at);
        assert_eq!(pool.tables(), vec!["users", "posts"]);
        assert_eq!(pool.commits(), 2);
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);
        runner.manager().save(&unit("add_users", 100, "users")).unwrap();

        runner.run_migrations().await.unwrap();
        let statements_after_first = pool.executed().len();

        let second = runner.run_migrations().await.unwrap();
        assert_eq!(second.applied_count, 0);
        assert_eq!(second.skipped_count, 1);
        assert_eq!(pool.executed().len(), statements_after_first);
        assert_eq!(runner.get_applied_migrations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_halts_and_keeps_earlier_commits() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);
        runner.manager().save(&unit("add_users", 100, "users")).unwrap();
        runner
            .manager()
            .save(&Migration::new(
                "add_posts",
                200,
                vec![
                    "CREATE TABLE posts (\n    id UUID\n);".to_string(),
                    "CREATE UNIQUE INDEX posts_slug_unique ON posts(slug);".to_string(),
                ],
                vec!["DROP TABLE IF EXISTS posts;".to_string()],
            ))
            .unwrap();
        runner.manager().save(&unit("add_tags", 300, "tags")).unwrap();
        pool.fail_on("posts_slug_unique");

        match runner.run_migrations().await {
            Err(OrmError::StatementExecution {
                migration,
                statement,
                message,
            }) => {
                assert_eq!(migration, "200_add_posts");
                assert!(statement.contains("posts_slug_unique"));
                assert!(message.contains("simulated failure"));
            }
            other => panic!("expected statement failure, got {:?}", other),
        }

        let applied: Vec<String> = runner
            .get_applied_migrations()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(applied, vec!["100_add_users"]);
        // posts was created inside the rolled back transaction
        assert_eq!(pool.tables(), vec!["users"]);
        assert_eq!(pool.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_status_reports_pending_and_applied() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);
        runner.manager().save(&unit("add_users", 100, "users")).unwrap();
        runner.run_migrations().await.unwrap();
        runner.manager().save(&unit("add_posts", 200, "posts")).unwrap();

        let states = runner.status().await.unwrap();
        assert_eq!(states.len(), 2);
        assert!(matches!(states[0].status, MigrationStatus::Applied { .. }));
        assert_eq!(states[1].status, MigrationStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_tolerates_orphaned_records() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);
        pool.seed_record("1_gone", "gone", 1);

        assert!(runner.status().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_drops_dependents_first() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);

        let dropped = runner.clear(&example_schema()).await.unwrap();
        assert_eq!(dropped, vec!["tags", "categories", "comments", "posts", "users"]);
        assert_eq!(
            pool.executed(),
            vec![
                "DROP TABLE IF EXISTS tags CASCADE;",
                "DROP TABLE IF EXISTS categories CASCADE;",
                "DROP TABLE IF EXISTS comments CASCADE;",
                "DROP TABLE IF EXISTS posts CASCADE;",
                "DROP TABLE IF EXISTS users CASCADE;",
            ]
        );
        assert_eq!(pool.commits(), 1);
    }

    #[tokio::test]
    async fn test_clear_failure_rolls_back_everything() {
        let dir = TempDir::new().unwrap();
        let pool = MockPool::new();
        let runner = runner(&dir, &pool);
        pool.fail_on("DROP TABLE IF EXISTS posts");

        assert!(runner.clear(&example_schema()).await.is_err());
        assert!(pool.executed().is_empty());
        assert_eq!(pool.rollbacks(), 1);
    }
}
