//! Global flags and the configuration values built from them
//!
//! Environment variables are read here, by clap, and nowhere else.

use std::path::PathBuf;

use clap::Args;
use keel_orm::{DatabaseConfig, MigrationConfig};

use crate::logging::LoggingConfig;

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Full connection URL; overrides the --db-* flags
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_HOST", default_value = "localhost", global = true)]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432, global = true)]
    pub db_port: u16,

    #[arg(long, env = "DB_USER", default_value = "postgres", global = true)]
    pub db_user: String,

    #[arg(
        long,
        env = "DB_PASSWORD",
        default_value = "postgres",
        global = true,
        hide_env_values = true
    )]
    pub db_password: String,

    #[arg(long, env = "DB_NAME", default_value = "postgres", global = true)]
    pub db_name: String,

    /// Directory holding migration files
    #[arg(long, default_value = "migrations", global = true)]
    pub migrations_dir: PathBuf,

    /// Path of the schema document
    #[arg(long, default_value = "schema.json", global = true)]
    pub schema: PathBuf,

    /// Log executed statements
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl GlobalArgs {
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            username: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
            ..DatabaseConfig::default()
        }
    }

    pub fn migration_config(&self) -> MigrationConfig {
        MigrationConfig {
            migrations_dir: self.migrations_dir.clone(),
            schema_path: self.schema.clone(),
            ..MigrationConfig::default()
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: if self.verbose { "debug" } else { "info" }.to_string(),
            json_format: self.log_json,
        }
    }
}
