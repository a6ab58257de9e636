//! Error types for the ORM system
//!
//! Every fallible operation in the schema, compiler, journal and runner layers
//! returns [`OrmResult`]. Callers inspect the variant instead of relying on
//! panics or string matching.

use std::path::PathBuf;

/// ORM result type alias
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for ORM operations
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// The foreign-key graph contains a cycle
    #[error("Circular dependency detected at table '{table}'")]
    CircularDependency { table: String },

    /// A migration document on disk failed to parse or validate
    #[error("Corrupt migration file {}: {message}", path.display())]
    CorruptMigration { path: PathBuf, message: String },

    /// The tracking table references a migration that is not in the journal
    #[error("Migration file not found for applied migration: {id}")]
    MissingMigrationFile { id: String },

    /// A migration with the same id already exists in the journal
    #[error("Migration {id} already exists")]
    DuplicateMigration { id: String },

    /// The database rejected a statement while running a migration
    #[error("Failed to execute migration {migration}: {message}\n  statement: {statement}")]
    StatementExecution {
        migration: String,
        statement: String,
        message: String,
    },

    /// The schema document exists but could not be parsed
    #[error("Failed to load schema from {}: {message}", path.display())]
    SchemaLoad { path: PathBuf, message: String },

    /// Schema or input validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Table already present in the schema
    #[error("Table {0} already exists")]
    TableExists(String),

    /// Table not present in the schema
    #[error("Table {0} not found")]
    TableNotFound(String),

    /// Connection pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database query error outside of a migration body
    #[error("Database error: {0}")]
    Database(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrmError {
    /// Whether this error came from the database rejecting a migration statement
    pub fn is_statement_failure(&self) -> bool {
        matches!(self, OrmError::StatementExecution { .. })
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        OrmError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_names_table() {
        let err = OrmError::CircularDependency {
            table: "posts".to_string(),
        };
        assert_eq!(err.to_string(), "Circular dependency detected at table 'posts'");
    }

    #[test]
    fn test_statement_failure_includes_statement() {
        let err = OrmError::StatementExecution {
            migration: "1700000000000_init".to_string(),
            statement: "CREATE TABLE users ();".to_string(),
            message: "relation \"users\" already exists".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("1700000000000_init"));
        assert!(rendered.contains("CREATE TABLE users ();"));
        assert!(rendered.contains("already exists"));
        assert!(err.is_statement_failure());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: OrmError = io.into();
        assert!(matches!(err, OrmError::Io(_)));
        assert!(!err.is_statement_failure());
    }
}
