//! Table and column definitions.
//!
//! These types are consumed as given from the entity-mapping subsystem; the
//! core reads them for dialect type mapping, DDL hooks and sharding column
//! validation but never derives them itself.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// JDBC type code for VARCHAR.
pub const JDBC_VARCHAR: i32 = 12;
/// JDBC type code for INTEGER.
pub const JDBC_INTEGER: i32 = 4;
/// JDBC type code for BIGINT.
pub const JDBC_BIGINT: i32 = -5;
/// JDBC type code for DOUBLE.
pub const JDBC_DOUBLE: i32 = 8;
/// JDBC type code for DECIMAL.
pub const JDBC_DECIMAL: i32 = 3;
/// JDBC type code for BOOLEAN.
pub const JDBC_BOOLEAN: i32 = 16;
/// JDBC type code for TIMESTAMP.
pub const JDBC_TIMESTAMP: i32 = 93;

/// Row data keyed by column name. Values use the JSON data model so that any
/// backend can consume them without a compile-time row type.
pub type RowValues = serde_json::Map<String, JsonValue>;

/// Declared value type of a column, used when casting row values for
/// shard-key calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Long,
    Float,
    Decimal,
    String,
    Bool,
    Timestamp,
}

impl ValueType {
    /// Cast a JSON value to this declared type, rendered as a canonical string.
    /// Returns None when the value cannot represent the declared type.
    pub fn cast_to_string(&self, value: &JsonValue) -> Option<String> {
        match self {
            Self::Int | Self::Long => match value {
                JsonValue::Number(n) => n.as_i64().map(|v| v.to_string()),
                JsonValue::String(s) => s.parse::<i64>().ok().map(|v| v.to_string()),
                _ => None,
            },
            Self::Float | Self::Decimal => match value {
                JsonValue::Number(n) => n.as_f64().map(|v| v.to_string()),
                JsonValue::String(s) => s.parse::<f64>().ok().map(|v| v.to_string()),
                _ => None,
            },
            Self::Bool => match value {
                JsonValue::Bool(b) => Some(b.to_string()),
                _ => None,
            },
            Self::String | Self::Timestamp => match value {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                JsonValue::Bool(b) => Some(b.to_string()),
                _ => None,
            },
        }
    }
}

/// Definition of a single column: name, JDBC type code and numeric facets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefine {
    pub name: String,
    /// JDBC type code (java.sql.Types numbering).
    pub jdbc_type: i32,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub scale: u32,
    pub value_type: ValueType,
}

impl ColumnDefine {
    /// Create a column definition with zeroed numeric facets.
    pub fn new(name: impl Into<String>, jdbc_type: i32, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            jdbc_type,
            length: 0,
            precision: 0,
            scale: 0,
            value_type,
        }
    }

    /// Set the declared length.
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Set the declared precision and scale.
    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

/// Definition of a logical table and its columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefine {
    pub name: String,
    pub columns: Vec<ColumnDefine>,
}

impl TableDefine {
    /// Create a table definition.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefine>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDefine> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check whether a column exists in this definition.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> TableDefine {
        TableDefine::new(
            "orders",
            vec![
                ColumnDefine::new("id", JDBC_BIGINT, ValueType::Long),
                ColumnDefine::new("name", JDBC_VARCHAR, ValueType::String).with_length(64),
                ColumnDefine::new("amount", JDBC_DECIMAL, ValueType::Decimal)
                    .with_precision(10, 2),
            ],
        )
    }

    #[test]
    fn test_column_lookup() {
        let table = sample_table();
        assert!(table.has_column("id"));
        assert!(table.has_column("amount"));
        assert!(!table.has_column("missing"));
        assert_eq!(table.column("name").unwrap().length, 64);
    }

    #[test]
    fn test_cast_int() {
        assert_eq!(
            ValueType::Long.cast_to_string(&json!(9)),
            Some("9".to_string())
        );
        assert_eq!(
            ValueType::Int.cast_to_string(&json!("42")),
            Some("42".to_string())
        );
        assert_eq!(ValueType::Int.cast_to_string(&json!(true)), None);
    }

    #[test]
    fn test_cast_string() {
        assert_eq!(
            ValueType::String.cast_to_string(&json!("abc")),
            Some("abc".to_string())
        );
        assert_eq!(
            ValueType::String.cast_to_string(&json!(7)),
            Some("7".to_string())
        );
    }

    #[test]
    fn test_cast_bool() {
        assert_eq!(
            ValueType::Bool.cast_to_string(&json!(false)),
            Some("false".to_string())
        );
        assert_eq!(ValueType::Bool.cast_to_string(&json!("false")), None);
    }
}
