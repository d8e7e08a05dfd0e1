//! Backend-agnostic database access core.
//!
//! One programming surface over heterogeneous storage backends: a dialect
//! registry describing each engine's capabilities and type mappings, a
//! sharding resolver routing rows across databases and tables, a
//! dialect-neutral query DSL, and a schema lifecycle manager driving CRUD,
//! DDL and transactions through pluggable backend operators.

pub mod backend;
pub mod config;
pub mod dialect;
pub mod error;
pub mod models;
pub mod query;
pub mod schema;
pub mod sharding;
pub mod transaction;

pub use config::SchemaConfig;
pub use dialect::{register_builtin_dialects, Dialect, DialectRegistry};
pub use error::{DbError, DbResult, ErrorKind};
pub use query::Query;
pub use schema::{SchemaManager, Session};
pub use sharding::ShardingConfig;
pub use transaction::TransactionalConfig;
