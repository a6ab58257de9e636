//! Database Backend Abstractions
//!
//! The migration runner is written against the traits in [`core`]; the
//! PostgreSQL implementation in [`postgres`] is the only production backend.

pub mod core;
pub mod postgres;

// Re-export core traits and types
pub use self::core::*;
pub use self::postgres::PostgresPool;
