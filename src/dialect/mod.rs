//! Dialect descriptors and the process-wide dialect registry.
//!
//! A dialect is a backend's static capability record: its name, join/pool
//! support flags, a connection-validation probe and a JDBC-type-code to
//! column-type template table. The core never knows concrete backends at
//! compile time; backends describe themselves here and self-register at
//! process start.

pub mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::models::ColumnDefine;

pub use registry::{
    register_builtin_dialects, register_dialect, registered_dialect, retrieve_dialect,
    DialectRegistry,
};

/// Static capability record for one backend.
///
/// Immutable after construction; build via [`DialectBuilder`].
#[derive(Debug, Clone)]
pub struct Dialect {
    name: String,
    support_join: bool,
    support_pool: bool,
    validation_query: String,
    /// JDBC type code -> column-type template with `{length}`, `{precision}`,
    /// `{scale}` placeholders.
    type_mappings: HashMap<i32, String>,
}

impl Dialect {
    /// Start building a dialect descriptor.
    pub fn builder(name: impl Into<String>) -> DialectBuilder {
        DialectBuilder {
            name: name.into(),
            support_join: true,
            support_pool: true,
            validation_query: "SELECT 1".to_string(),
            type_mappings: HashMap::new(),
        }
    }

    /// Dialect identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the backend can execute joins.
    pub fn support_join(&self) -> bool {
        self.support_join
    }

    /// Whether the backend supports pooled connections.
    pub fn support_pool(&self) -> bool {
        self.support_pool
    }

    /// The health-check probe statement.
    pub fn validation_query(&self) -> &str {
        &self.validation_query
    }

    /// Number of declared type mappings.
    pub fn mapping_count(&self) -> usize {
        self.type_mappings.len()
    }

    /// Render the backend column type for a column definition.
    ///
    /// An unmapped JDBC type code yields the empty string, never an error.
    /// Mapped templates have `{length}`, `{precision}` and `{scale}`
    /// substituted with the column's declared numeric facets in plain decimal.
    pub fn column_type(&self, column: &ColumnDefine) -> String {
        let Some(template) = self.type_mappings.get(&column.jdbc_type) else {
            return String::new();
        };
        template
            .replace("{length}", &column.length.to_string())
            .replace("{precision}", &column.precision.to_string())
            .replace("{scale}", &column.scale.to_string())
    }
}

/// Builder for [`Dialect`]. Join and pool support default to true and the
/// validation query to `SELECT 1`.
#[derive(Debug)]
pub struct DialectBuilder {
    name: String,
    support_join: bool,
    support_pool: bool,
    validation_query: String,
    type_mappings: HashMap<i32, String>,
}

impl DialectBuilder {
    pub fn support_join(mut self, support: bool) -> Self {
        self.support_join = support;
        self
    }

    pub fn support_pool(mut self, support: bool) -> Self {
        self.support_pool = support;
        self
    }

    pub fn validation_query(mut self, query: impl Into<String>) -> Self {
        self.validation_query = query.into();
        self
    }

    /// Declare a type mapping. A duplicate code is reported and the later
    /// mapping wins.
    pub fn type_mapping(mut self, jdbc_type: i32, template: impl Into<String>) -> Self {
        let template = template.into();
        if let Some(previous) = self.type_mappings.insert(jdbc_type, template) {
            warn!(
                dialect = %self.name,
                jdbc_type = jdbc_type,
                previous = %previous,
                "Duplicate type mapping; later mapping wins"
            );
        }
        self
    }

    /// Finish the descriptor. A dialect without type mappings is accepted but
    /// reported as a degraded configuration.
    pub fn build(self) -> Arc<Dialect> {
        if self.type_mappings.is_empty() {
            warn!(
                dialect = %self.name,
                "Dialect declared with no type mappings; column_type will always be empty"
            );
        }
        Arc::new(Dialect {
            name: self.name,
            support_join: self.support_join,
            support_pool: self.support_pool,
            validation_query: self.validation_query,
            type_mappings: self.type_mappings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDefine, ValueType, JDBC_DECIMAL, JDBC_VARCHAR};

    #[test]
    fn test_column_type_substitutes_length() {
        let dialect = Dialect::builder("memsql")
            .type_mapping(JDBC_VARCHAR, "VARCHAR({length})")
            .build();
        let column =
            ColumnDefine::new("name", JDBC_VARCHAR, ValueType::String).with_length(64);
        assert_eq!(dialect.column_type(&column), "VARCHAR(64)");
    }

    #[test]
    fn test_column_type_substitutes_precision_and_scale() {
        let dialect = Dialect::builder("test")
            .type_mapping(JDBC_DECIMAL, "DECIMAL({precision},{scale})")
            .build();
        let column =
            ColumnDefine::new("amount", JDBC_DECIMAL, ValueType::Decimal).with_precision(10, 2);
        assert_eq!(dialect.column_type(&column), "DECIMAL(10,2)");
    }

    #[test]
    fn test_column_type_unmapped_returns_empty() {
        let dialect = Dialect::builder("bare").build();
        let column = ColumnDefine::new("name", JDBC_VARCHAR, ValueType::String);
        assert_eq!(dialect.column_type(&column), "");
    }

    #[test]
    fn test_duplicate_mapping_last_wins() {
        let dialect = Dialect::builder("test")
            .type_mapping(JDBC_VARCHAR, "VARCHAR({length})")
            .type_mapping(JDBC_VARCHAR, "TEXT")
            .build();
        let column = ColumnDefine::new("name", JDBC_VARCHAR, ValueType::String).with_length(8);
        assert_eq!(dialect.column_type(&column), "TEXT");
        assert_eq!(dialect.mapping_count(), 1);
    }

    #[test]
    fn test_builder_defaults() {
        let dialect = Dialect::builder("d").build();
        assert!(dialect.support_join());
        assert!(dialect.support_pool());
        assert_eq!(dialect.validation_query(), "SELECT 1");
    }
}
