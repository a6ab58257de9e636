//! Log subscriber setup
//!
//! Logs go to stderr so stdout carries only command output (for example the
//! DDL printed by `keel schema sql`).

use std::io;

use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for keel's own targets; `RUST_LOG` overrides the whole filter
    pub level: String,
    pub json_format: bool,
}

impl LoggingConfig {
    fn env_filter(&self) -> String {
        format!("keel={level},keel_orm={level}", level = self.level)
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.env_filter()))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).without_time().with_target(false))
            .try_init()?;
    }

    tracing::debug!("Logging initialized (level: {})", config.level);
    Ok(())
}
