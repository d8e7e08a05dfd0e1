//! Sharding resolver.
//!
//! Per logical table, a sharding configuration binds a shard column to a
//! calculation strategy on up to two independent axes: the database axis and
//! the table axis. The resolver computes a shard-key string from a row's
//! values and can later test whether an arbitrary shard key belongs to the
//! table.

pub mod calculator;

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::models::{RowValues, TableDefine, ValueType};

pub use calculator::{
    create_calculator, register_calculator, Calculator, CalculatorRegistry, ModuloCalculator,
    RangeCalculator,
};

/// Placeholder substituted into a sharding result template.
pub const SHARDING_KEY_PLACEHOLDER: &str = "{shardingKey}";

/// Independent routing dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardingAxis {
    Database,
    Table,
}

/// Binding of one axis: default value, source column, result template,
/// declared value type and an optional calculation strategy.
#[derive(Clone)]
pub struct ShardingDetails {
    default_value: String,
    column: String,
    /// Result template containing [`SHARDING_KEY_PLACEHOLDER`].
    template: String,
    value_type: ValueType,
    calculator: Option<Arc<dyn Calculator>>,
}

impl std::fmt::Debug for ShardingDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardingDetails")
            .field("default_value", &self.default_value)
            .field("column", &self.column)
            .field("template", &self.template)
            .field("value_type", &self.value_type)
            .field("has_calculator", &self.calculator.is_some())
            .finish()
    }
}

impl ShardingDetails {
    /// Create an axis binding without a calculator: keys fall back to the
    /// default value and matching is exact string equality.
    pub fn new(
        default_value: impl Into<String>,
        column: impl Into<String>,
        template: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            default_value: default_value.into(),
            column: column.into(),
            template: template.into(),
            value_type,
            calculator: None,
        }
    }

    /// Attach a calculation strategy.
    pub fn with_calculator(mut self, calculator: Arc<dyn Calculator>) -> Self {
        self.calculator = Some(calculator);
        self
    }

    /// Attach a strategy by registry key.
    pub fn with_calculator_named(mut self, name: &str) -> DbResult<Self> {
        self.calculator = Some(create_calculator(name)?);
        Ok(self)
    }

    /// The bound source column.
    pub fn column(&self) -> &str {
        &self.column
    }

    fn render(&self, key: &str) -> String {
        self.template.replace(SHARDING_KEY_PLACEHOLDER, key)
    }

    /// Strip the template around a candidate, recovering the raw shard key.
    fn extract(&self, candidate: &str) -> Option<String> {
        let Some(pos) = self.template.find(SHARDING_KEY_PLACEHOLDER) else {
            // Template without placeholder renders as a literal
            return (candidate == self.template).then(|| candidate.to_string());
        };
        let prefix = &self.template[..pos];
        let suffix = &self.template[pos + SHARDING_KEY_PLACEHOLDER.len()..];
        candidate
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .map(|key| key.to_string())
    }

    fn sharding_key(&self, row: &RowValues) -> String {
        let key = match (row.get(self.column()), &self.calculator) {
            (Some(value), Some(calculator)) => match self.value_type.cast_to_string(value) {
                Some(casted) => calculator.result(&casted),
                // An uncastable value falls back like an absent one
                None => self.default_value.clone(),
            },
            _ => self.default_value.clone(),
        };
        self.render(&key)
    }

    fn match_key(&self, candidate: &str) -> bool {
        match &self.calculator {
            None => candidate == self.default_value,
            Some(calculator) => match self.extract(candidate) {
                Some(key) => calculator.matches(&key),
                None => false,
            },
        }
    }
}

/// Per-table sharding configuration: zero or one binding per axis.
///
/// Construction validates that each bound column exists in the table's
/// definition; a missing column is a configuration error carrying the table
/// and column names. Both axes unbound is a valid "no sharding applied"
/// configuration.
#[derive(Debug, Clone)]
pub struct ShardingConfig {
    table: String,
    database_axis: Option<ShardingDetails>,
    table_axis: Option<ShardingDetails>,
}

impl ShardingConfig {
    /// Bind sharding details to a table definition.
    pub fn new(
        table: &TableDefine,
        database_axis: Option<ShardingDetails>,
        table_axis: Option<ShardingDetails>,
    ) -> DbResult<Self> {
        for details in [&database_axis, &table_axis].into_iter().flatten() {
            if !table.has_column(details.column()) {
                return Err(DbError::table_define(&table.name, details.column()));
            }
        }
        Ok(Self {
            table: table.name.clone(),
            database_axis,
            table_axis,
        })
    }

    /// The logical table this configuration routes.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn details(&self, axis: ShardingAxis) -> Option<&ShardingDetails> {
        match axis {
            ShardingAxis::Database => self.database_axis.as_ref(),
            ShardingAxis::Table => self.table_axis.as_ref(),
        }
    }

    /// Compute the shard key for one axis from a row's values.
    ///
    /// An unbound axis yields the empty string. A missing or uncastable value,
    /// or a binding without a calculator, falls back to the configured default
    /// value before template substitution.
    pub fn sharding_key(&self, axis: ShardingAxis, row: &RowValues) -> String {
        let Some(details) = self.details(axis) else {
            return String::new();
        };
        let key = details.sharding_key(row);
        debug!(table = %self.table, ?axis, key = %key, "Resolved shard key");
        key
    }

    /// Test whether a previously computed shard key belongs to this table's
    /// axis. Without a calculator this is exact equality against the default
    /// value; with one, the calculator's own predicate decides.
    pub fn match_key(&self, axis: ShardingAxis, candidate: &str) -> bool {
        match self.details(axis) {
            None => false,
            Some(details) => details.match_key(candidate),
        }
    }
}

/// Convenience for rows: build a `RowValues` from pairs.
pub fn row(values: &[(&str, JsonValue)]) -> RowValues {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDefine, JDBC_BIGINT, JDBC_VARCHAR};
    use serde_json::json;

    fn orders() -> TableDefine {
        TableDefine::new(
            "orders",
            vec![
                ColumnDefine::new("id", JDBC_BIGINT, ValueType::Long),
                ColumnDefine::new("tenant_id", JDBC_BIGINT, ValueType::Long),
                ColumnDefine::new("status", JDBC_VARCHAR, ValueType::String),
            ],
        )
    }

    fn tenant_details() -> ShardingDetails {
        ShardingDetails::new("0", "tenant_id", "db_{shardingKey}", ValueType::Long)
            .with_calculator(Arc::new(ModuloCalculator::new(4)))
    }

    #[test]
    fn test_missing_column_fails_construction() {
        let details =
            ShardingDetails::new("0", "nonexistent", "db_{shardingKey}", ValueType::Long);
        let err = ShardingConfig::new(&orders(), Some(details), None).unwrap_err();
        match err {
            DbError::TableDefine { table, column } => {
                assert_eq!(table, "orders");
                assert_eq!(column, "nonexistent");
            }
            other => panic!("expected TableDefine, got {other:?}"),
        }
    }

    #[test]
    fn test_both_axes_unbound_is_valid() {
        let config = ShardingConfig::new(&orders(), None, None).unwrap();
        assert_eq!(config.sharding_key(ShardingAxis::Database, &row(&[])), "");
        assert_eq!(config.sharding_key(ShardingAxis::Table, &row(&[])), "");
        assert!(!config.match_key(ShardingAxis::Database, "anything"));
    }

    #[test]
    fn test_sharding_key_modulo() {
        let config = ShardingConfig::new(&orders(), Some(tenant_details()), None).unwrap();
        let key = config.sharding_key(ShardingAxis::Database, &row(&[("tenant_id", json!(9))]));
        assert_eq!(key, "db_1");
    }

    #[test]
    fn test_sharding_key_missing_value_uses_default() {
        let config = ShardingConfig::new(&orders(), Some(tenant_details()), None).unwrap();
        let key = config.sharding_key(ShardingAxis::Database, &row(&[("status", json!("ok"))]));
        assert_eq!(key, "db_0");
    }

    #[test]
    fn test_sharding_key_no_calculator_uses_default() {
        let details = ShardingDetails::new("9", "tenant_id", "db_{shardingKey}", ValueType::Long);
        let config = ShardingConfig::new(&orders(), Some(details), None).unwrap();
        let key = config.sharding_key(ShardingAxis::Database, &row(&[("tenant_id", json!(3))]));
        assert_eq!(key, "db_9");
    }

    #[test]
    fn test_match_key_without_calculator_is_equality_with_default() {
        let details = ShardingDetails::new("db_9", "tenant_id", "db_{shardingKey}", ValueType::Long);
        let config = ShardingConfig::new(&orders(), Some(details), None).unwrap();
        assert!(config.match_key(ShardingAxis::Database, "db_9"));
        assert!(!config.match_key(ShardingAxis::Database, "db_1"));
    }

    #[test]
    fn test_match_key_delegates_to_calculator() {
        let config = ShardingConfig::new(&orders(), Some(tenant_details()), None).unwrap();
        // residues 0..4 under the template are members; others are not
        assert!(config.match_key(ShardingAxis::Database, "db_1"));
        assert!(config.match_key(ShardingAxis::Database, "db_3"));
        assert!(!config.match_key(ShardingAxis::Database, "db_7"));
        assert!(!config.match_key(ShardingAxis::Database, "shard_1"));
    }

    #[test]
    fn test_match_key_consistent_with_sharding_key() {
        let config = ShardingConfig::new(&orders(), Some(tenant_details()), None).unwrap();
        for tenant in [0, 1, 7, 9, 12345] {
            let key =
                config.sharding_key(ShardingAxis::Database, &row(&[("tenant_id", json!(tenant))]));
            assert!(config.match_key(ShardingAxis::Database, &key));
        }
    }

    #[test]
    fn test_independent_axes() {
        let db_details = tenant_details();
        let table_details =
            ShardingDetails::new("0", "id", "orders_{shardingKey}", ValueType::Long)
                .with_calculator(Arc::new(ModuloCalculator::new(2)));
        let config =
            ShardingConfig::new(&orders(), Some(db_details), Some(table_details)).unwrap();
        let values = row(&[("tenant_id", json!(9)), ("id", json!(5))]);
        assert_eq!(config.sharding_key(ShardingAxis::Database, &values), "db_1");
        assert_eq!(
            config.sharding_key(ShardingAxis::Table, &values),
            "orders_1"
        );
    }
}
