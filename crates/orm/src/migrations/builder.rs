//! Migration Builder - assembles a migration unit from table definitions

use chrono::Utc;

use crate::error::{OrmError, OrmResult};
use crate::schema::TableSchema;

use super::compiler;
use super::definitions::Migration;
use super::resolver;

/// Builds full-schema migrations; performs no I/O
pub struct MigrationBuilder;

impl MigrationBuilder {
    /// Build a migration stamped with the current time
    pub fn build(name: &str, tables: &[TableSchema]) -> OrmResult<Migration> {
        Self::build_at(name, tables, Utc::now().timestamp_millis())
    }

    /// Build a migration stamped with `timestamp` (unix milliseconds).
    ///
    /// `up` runs the tables' statements in dependency order, `down` runs them
    /// in the reverse table order.
    pub fn build_at(name: &str, tables: &[TableSchema], timestamp: i64) -> OrmResult<Migration> {
        validate_name(name)?;

        let ordered = resolver::order(tables)?;
        let compiled: Vec<_> = ordered.iter().map(compiler::compile).collect();

        let up = compiled
            .iter()
            .flat_map(|table| table.up.iter().cloned())
            .collect();
        let down = compiled
            .iter()
            .rev()
            .flat_map(|table| table.down.iter().cloned())
            .collect();

        Ok(Migration::new(name, timestamp, up, down))
    }
}

fn validate_name(name: &str) -> OrmResult<()> {
    if name.is_empty() {
        return Err(OrmError::Validation(
            "Migration name cannot be empty".to_string(),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(OrmError::Validation(format!(
            "Migration name '{}' contains invalid character '{}'; use letters, digits, '_' or '-'",
            name, bad
        )));
    }
    Ok(())
}
