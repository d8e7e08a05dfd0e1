//! Process-wide dialect registry.
//!
//! Backends self-register here at process start via an explicit init routine;
//! the core only consumes `register` calls and fails fast on unknown names.
//! Registration is last-writer-wins on a name collision, and the collision is
//! reported rather than rejected.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::models::{JDBC_BIGINT, JDBC_BOOLEAN, JDBC_DECIMAL, JDBC_DOUBLE, JDBC_INTEGER, JDBC_TIMESTAMP, JDBC_VARCHAR};

static GLOBAL: Lazy<DialectRegistry> = Lazy::new(DialectRegistry::new);

/// Mapping from dialect name to a live dialect instance.
///
/// Supports concurrent `register`/`retrieve` from multiple initialization
/// threads. Most callers use the process-wide instance through the free
/// functions in this module; a standalone registry exists for tests and
/// embedders that want isolation.
#[derive(Debug, Default)]
pub struct DialectRegistry {
    dialects: RwLock<HashMap<String, Arc<Dialect>>>,
}

impl DialectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            dialects: RwLock::new(HashMap::new()),
        }
    }

    /// Register a dialect under its own name. Re-registration overwrites the
    /// previous binding and is reported, not rejected.
    pub fn register(&self, dialect: Arc<Dialect>) {
        let name = dialect.name().to_string();
        let mut dialects = self.dialects.write().expect("dialect registry poisoned");
        if dialects.insert(name.clone(), dialect).is_some() {
            warn!(dialect = %name, "Dialect re-registered; previous binding overwritten");
        } else {
            info!(dialect = %name, "Dialect registered");
        }
    }

    /// Check whether a name is bound. Empty or blank names are never bound.
    pub fn registered(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        let dialects = self.dialects.read().expect("dialect registry poisoned");
        dialects.contains_key(name)
    }

    /// Retrieve the dialect bound to a name, failing fast when unbound.
    pub fn retrieve(&self, name: &str) -> DbResult<Arc<Dialect>> {
        let dialects = self.dialects.read().expect("dialect registry poisoned");
        dialects
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::dialect_not_found(name))
    }

    /// Number of registered dialects.
    pub fn len(&self) -> usize {
        let dialects = self.dialects.read().expect("dialect registry poisoned");
        dialects.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register a dialect in the process-wide registry.
pub fn register_dialect(dialect: Arc<Dialect>) {
    GLOBAL.register(dialect);
}

/// Check whether a name is bound in the process-wide registry.
pub fn registered_dialect(name: &str) -> bool {
    GLOBAL.registered(name)
}

/// Retrieve a dialect from the process-wide registry.
pub fn retrieve_dialect(name: &str) -> DbResult<Arc<Dialect>> {
    GLOBAL.retrieve(name)
}

/// Register the built-in relational dialects.
///
/// This replaces classpath-style plugin discovery with an explicit routine:
/// embedders with custom backends call [`register_dialect`] after (or instead
/// of) this.
pub fn register_builtin_dialects() {
    register_dialect(mysql_dialect());
    register_dialect(postgresql_dialect());
    register_dialect(sqlite_dialect());
}

fn mysql_dialect() -> Arc<Dialect> {
    Dialect::builder("mysql")
        .validation_query("SELECT 1")
        .type_mapping(JDBC_VARCHAR, "VARCHAR({length})")
        .type_mapping(JDBC_INTEGER, "INT")
        .type_mapping(JDBC_BIGINT, "BIGINT")
        .type_mapping(JDBC_DOUBLE, "DOUBLE")
        .type_mapping(JDBC_DECIMAL, "DECIMAL({precision},{scale})")
        .type_mapping(JDBC_BOOLEAN, "TINYINT(1)")
        .type_mapping(JDBC_TIMESTAMP, "DATETIME")
        .build()
}

fn postgresql_dialect() -> Arc<Dialect> {
    Dialect::builder("postgresql")
        .validation_query("SELECT 1")
        .type_mapping(JDBC_VARCHAR, "VARCHAR({length})")
        .type_mapping(JDBC_INTEGER, "INTEGER")
        .type_mapping(JDBC_BIGINT, "BIGINT")
        .type_mapping(JDBC_DOUBLE, "DOUBLE PRECISION")
        .type_mapping(JDBC_DECIMAL, "NUMERIC({precision},{scale})")
        .type_mapping(JDBC_BOOLEAN, "BOOLEAN")
        .type_mapping(JDBC_TIMESTAMP, "TIMESTAMP")
        .build()
}

fn sqlite_dialect() -> Arc<Dialect> {
    Dialect::builder("sqlite")
        // SQLite has no pooled server processes behind it
        .support_pool(false)
        .validation_query("SELECT 1")
        .type_mapping(JDBC_VARCHAR, "TEXT")
        .type_mapping(JDBC_INTEGER, "INTEGER")
        .type_mapping(JDBC_BIGINT, "INTEGER")
        .type_mapping(JDBC_DOUBLE, "REAL")
        .type_mapping(JDBC_DECIMAL, "NUMERIC")
        .type_mapping(JDBC_BOOLEAN, "INTEGER")
        .type_mapping(JDBC_TIMESTAMP, "TEXT")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDefine, ValueType};

    #[test]
    fn test_register_and_retrieve() {
        let registry = DialectRegistry::new();
        registry.register(Dialect::builder("memsql").build());
        assert!(registry.registered("memsql"));
        let dialect = registry.retrieve("memsql").unwrap();
        assert_eq!(dialect.name(), "memsql");
    }

    #[test]
    fn test_retrieve_unknown_fails() {
        let registry = DialectRegistry::new();
        let err = registry.retrieve("nope").unwrap_err();
        match err {
            DbError::DialectNotFound { ref name } => assert_eq!(name, "nope"),
            other => panic!("expected DialectNotFound, got {other:?}"),
        }
        assert!(err.is_configuration());
    }

    #[test]
    fn test_blank_name_never_registered() {
        let registry = DialectRegistry::new();
        registry.register(Dialect::builder("x").build());
        assert!(!registry.registered(""));
        assert!(!registry.registered("   "));
    }

    #[test]
    fn test_reregistration_last_writer_wins() {
        let registry = DialectRegistry::new();
        registry.register(Dialect::builder("d").support_join(true).build());
        registry.register(Dialect::builder("d").support_join(false).build());
        assert_eq!(registry.len(), 1);
        let dialect = registry.retrieve("d").unwrap();
        assert!(!dialect.support_join());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = std::sync::Arc::new(DialectRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        registry.register(Dialect::builder(format!("d{}", i % 4)).build());
                        let _ = registry.retrieve(&format!("d{}", i % 4));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_builtin_dialects_register_globally() {
        register_builtin_dialects();
        assert!(registered_dialect("mysql"));
        assert!(registered_dialect("postgresql"));
        assert!(registered_dialect("sqlite"));

        let mysql = retrieve_dialect("mysql").unwrap();
        let column = ColumnDefine::new("name", JDBC_VARCHAR, ValueType::String).with_length(32);
        assert_eq!(mysql.column_type(&column), "VARCHAR(32)");

        let sqlite = retrieve_dialect("sqlite").unwrap();
        assert!(!sqlite.support_pool());
    }

    #[test]
    fn test_memsql_scenario() {
        // register dialect "memsql" with {12 -> VARCHAR({length})}, expect
        // VARCHAR(64) for a length-64 varchar column
        register_dialect(
            Dialect::builder("memsql")
                .type_mapping(12, "VARCHAR({length})")
                .build(),
        );
        let dialect = retrieve_dialect("memsql").unwrap();
        let column = ColumnDefine::new("title", 12, ValueType::String).with_length(64);
        assert_eq!(dialect.column_type(&column), "VARCHAR(64)");
    }
}
