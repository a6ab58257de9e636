//! Database connection configuration
//!
//! [`DatabaseConfig`] is an immutable value handed to whatever opens
//! connections. Nothing in this crate reads process environment variables;
//! the binary resolves them at its argument boundary and builds the config.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use url::Url;

use crate::backends::{DatabasePool, PostgresPool};
use crate::error::{OrmError, OrmResult};

/// Connection settings for the target PostgreSQL database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "postgres".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// Configuration that connects through a single URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Resolve the connection URL, percent-encoding credentials when the URL
    /// is assembled from discrete fields
    pub fn connection_url(&self) -> OrmResult<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = Url::parse(&format!("postgres://{}:{}", self.host, self.port))
            .map_err(|e| OrmError::Configuration(format!("Invalid database host: {}", e)))?;
        url.set_username(&self.username)
            .map_err(|_| OrmError::Configuration("Invalid database username".to_string()))?;
        url.set_password(Some(&self.password))
            .map_err(|_| OrmError::Configuration("Invalid database password".to_string()))?;
        url.set_path(&self.database);

        Ok(url.to_string())
    }

    /// Check the settings before any connection attempt
    pub fn validate(&self) -> OrmResult<()> {
        let raw = self.connection_url()?;
        let parsed = Url::parse(&raw)
            .map_err(|e| OrmError::Configuration(format!("Invalid database URL: {}", e)))?;

        if parsed.scheme() != "postgres" && parsed.scheme() != "postgresql" {
            return Err(OrmError::Configuration(format!(
                "Unsupported database URL scheme '{}', expected postgres://",
                parsed.scheme()
            )));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(OrmError::Configuration(
                "Missing host in database URL".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(OrmError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Open a connection pool for the configured database
    pub async fn connect(&self) -> OrmResult<Arc<dyn DatabasePool>> {
        self.validate()?;
        let url = self.connection_url()?;

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .connect(&url)
            .await
            .map_err(|e| OrmError::Connection(format!("Failed to connect to database: {}", e)))?;

        tracing::debug!(
            "Database connection established (max_connections: {})",
            self.max_connections
        );
        Ok(Arc::new(PostgresPool::new(pool)))
    }
}
