//! Core Database Backend Traits
//!
//! The migration runner only ever talks to the database through these traits:
//! plain statement execution, row fetching for the tracking table, and
//! explicit transactions. Rows cross the seam as [`DatabaseRow`] and are
//! decoded into typed records at the boundary.

use async_trait::async_trait;

use crate::error::{OrmError, OrmResult};

/// Abstract database connection pool trait
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Begin a transaction on a connection taken from the pool
    async fn begin_transaction(&self) -> OrmResult<Box<dyn DatabaseTransaction>>;

    /// Execute a statement directly on the pool and return affected rows
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64>;

    /// Execute a query directly on the pool and return the result rows
    async fn fetch_all(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> OrmResult<Vec<Box<dyn DatabaseRow>>>;

    /// Close the pool
    async fn close(&self) -> OrmResult<()>;
}

/// Abstract database transaction trait
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait DatabaseTransaction: Send + Sync {
    /// Execute a statement within the transaction
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> OrmResult<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> OrmResult<()>;
}

/// Abstract database row trait
pub trait DatabaseRow: Send + Sync {
    /// Get a column value by name
    fn get_by_name(&self, name: &str) -> OrmResult<DatabaseValue>;
}

/// Database value enumeration for parameter binding and row decoding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    String(String),
    DateTime(chrono::NaiveDateTime),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Name of the variant, used in decoding errors
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int32(_) => "int4",
            DatabaseValue::Int64(_) => "int8",
            DatabaseValue::String(_) => "text",
            DatabaseValue::DateTime(_) => "timestamp",
        }
    }

    pub fn into_string(self, column: &str) -> OrmResult<String> {
        match self {
            DatabaseValue::String(s) => Ok(s),
            other => Err(unexpected(column, "text", &other)),
        }
    }

    /// Integers of either width widen to i64
    pub fn into_i64(self, column: &str) -> OrmResult<i64> {
        match self {
            DatabaseValue::Int64(i) => Ok(i),
            DatabaseValue::Int32(i) => Ok(i as i64),
            other => Err(unexpected(column, "integer", &other)),
        }
    }

    pub fn into_datetime(self, column: &str) -> OrmResult<chrono::NaiveDateTime> {
        match self {
            DatabaseValue::DateTime(dt) => Ok(dt),
            other => Err(unexpected(column, "timestamp", &other)),
        }
    }
}

fn unexpected(column: &str, expected: &str, found: &DatabaseValue) -> OrmError {
    OrmError::Database(format!(
        "Column '{}' has unexpected type: expected {}, found {}",
        column,
        expected,
        found.kind()
    ))
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<chrono::NaiveDateTime> for DatabaseValue {
    fn from(value: chrono::NaiveDateTime) -> Self {
        DatabaseValue::DateTime(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}
