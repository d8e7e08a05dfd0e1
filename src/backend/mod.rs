//! Backend implementations of the operator contract.

pub mod memory;
mod params;
pub mod relational;
mod rows;
pub mod sql;

pub use memory::{MemoryBackend, MemoryOperator};
pub use relational::{DbPool, RelationalConnector, RelationalOperator};
pub use sql::{PlaceholderStyle, SqlCompiler};

/// Supported relational engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    MySql,
    Postgres,
    Sqlite,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::MySql => write!(f, "mysql"),
            Engine::Postgres => write!(f, "postgresql"),
            Engine::Sqlite => write!(f, "sqlite"),
        }
    }
}
