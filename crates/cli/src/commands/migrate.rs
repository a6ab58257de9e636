use anyhow::Context;
use keel_orm::{
    MigrationManager, MigrationRollback, MigrationRunner, MigrationStatus, SchemaManager,
};

use crate::config::GlobalArgs;

async fn connect(global: &GlobalArgs) -> anyhow::Result<MigrationRunner> {
    let manager = MigrationManager::with_config(global.migration_config());
    let runner = MigrationRunner::connect(manager, &global.database_config())
        .await
        .context("could not connect to the database")?;
    Ok(runner)
}

fn load_schema(global: &GlobalArgs) -> anyhow::Result<SchemaManager> {
    Ok(SchemaManager::open(&global.schema)?)
}

pub async fn init(global: &GlobalArgs) -> anyhow::Result<()> {
    let runner = connect(global).await?;
    runner.initialize().await?;
    runner.pool().close().await?;

    println!("Database initialized successfully");
    Ok(())
}

pub fn create(global: &GlobalArgs, name: &str) -> anyhow::Result<()> {
    let schema = load_schema(global)?;
    let tables = schema.get_all_tables();
    if tables.is_empty() {
        tracing::warn!(
            "Schema {} has no tables; the migration will be empty",
            global.schema.display()
        );
    }

    let manager = MigrationManager::with_config(global.migration_config());
    let migration = manager.create_migration(name, tables)?;

    for statement in migration.up.iter().filter(|s| s.starts_with("CREATE TABLE")) {
        tracing::debug!("Generated SQL: {}", statement);
    }
    println!(
        "Migration {} created successfully: {}",
        migration.name,
        manager.migration_path(&migration.id).display()
    );
    Ok(())
}

pub async fn up(global: &GlobalArgs) -> anyhow::Result<()> {
    let runner = connect(global).await?;
    let result = runner.run_migrations().await;
    runner.pool().close().await?;
    let result = result?;

    for id in &result.applied_migrations {
        println!("Applied migration: {}", id);
    }
    if result.applied_count == 0 {
        println!("Nothing to migrate");
    } else {
        println!(
            "All migrations completed successfully ({} applied in {}ms)",
            result.applied_count, result.execution_time_ms
        );
    }
    Ok(())
}

pub async fn down(global: &GlobalArgs) -> anyhow::Result<()> {
    let runner = connect(global).await?;
    let result = runner.rollback_last().await;
    runner.pool().close().await?;

    match result?.rolled_back {
        Some(id) => println!("Migration {} rolled back successfully", id),
        None => println!("No migrations to rollback"),
    }
    Ok(())
}

pub async fn clear(global: &GlobalArgs) -> anyhow::Result<()> {
    let schema = load_schema(global)?;
    let runner = connect(global).await?;
    let result = runner.clear(schema.schema()).await;
    runner.pool().close().await?;

    for table in result? {
        println!("Dropped table: {}", table);
    }
    println!("Database cleared successfully");
    Ok(())
}

pub async fn status(global: &GlobalArgs) -> anyhow::Result<()> {
    let runner = connect(global).await?;
    let states = runner.status().await;
    runner.pool().close().await?;
    let states = states?;

    println!("Migration Status:");
    println!("================");
    if states.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    for state in &states {
        match &state.status {
            MigrationStatus::Applied { executed_at } => {
                println!(
                    "  [applied {}] {}",
                    executed_at.format("%Y-%m-%d %H:%M:%S"),
                    state.migration.id
                )
            }
            MigrationStatus::Pending => println!("  [pending]  {}", state.migration.id),
        }
    }
    Ok(())
}
