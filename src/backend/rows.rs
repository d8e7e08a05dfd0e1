//! Row decoding for the relational backend.
//!
//! Result rows come back as JSON maps keyed by column name. Decoding is
//! category-driven: the column's reported type name picks a logical category
//! and the engine-specific decoder extracts the value. Decimals surface as
//! exact strings rather than lossy floats.

use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

use crate::backend::Engine;
use crate::models::RowValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Json,
    Uuid,
    Timestamp,
    Text,
}

fn categorize(type_name: &str, engine: Engine) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC affinity holds floats
        if engine == Engine::Sqlite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }
    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }
    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }
    if lower == "uuid" {
        return TypeCategory::Uuid;
    }
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }
    if lower.contains("timestamp") || lower.contains("datetime") || lower == "date" {
        return TypeCategory::Timestamp;
    }
    TypeCategory::Text
}

/// Raw DECIMAL/NUMERIC text, preserving the exact database representation.
#[derive(Debug)]
struct RawDecimal(String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let text = <String as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(text))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let text = <String as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(text))
    }
}

fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn bytes_to_json(bytes: Vec<u8>) -> JsonValue {
    JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decode a MySQL row into a JSON map.
pub(crate) fn mysql_row_values(row: &MySqlRow) -> RowValues {
    let mut values = RowValues::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let category = categorize(column.type_info().name(), Engine::MySql);
        let value = match category {
            TypeCategory::Integer => row
                .try_get::<Option<i64>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::Number(v.into()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => row
                .try_get::<Option<f64>, _>(idx)
                .ok()
                .flatten()
                .map(float_to_json)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Decimal => row
                .try_get::<Option<RawDecimal>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.0))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(bytes_to_json)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => row
                .try_get::<Option<JsonValue>, _>(idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Timestamp => {
                if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
                    JsonValue::String(v.to_string())
                } else if let Ok(Some(v)) =
                    row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
                {
                    JsonValue::String(v.to_rfc3339())
                } else {
                    JsonValue::Null
                }
            }
            TypeCategory::Uuid | TypeCategory::Text => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null),
        };
        values.insert(column.name().to_string(), value);
    }
    values
}

/// Decode a PostgreSQL row into a JSON map.
pub(crate) fn postgres_row_values(row: &PgRow) -> RowValues {
    let mut values = RowValues::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let category = categorize(column.type_info().name(), Engine::Postgres);
        let value = match category {
            TypeCategory::Integer => {
                if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
                    JsonValue::Number(v.into())
                } else if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
                    JsonValue::Number(v.into())
                } else if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
                    JsonValue::Number(v.into())
                } else {
                    JsonValue::Null
                }
            }
            TypeCategory::Float => row
                .try_get::<Option<f64>, _>(idx)
                .ok()
                .flatten()
                .map(float_to_json)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Decimal => row
                .try_get::<Option<RawDecimal>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.0))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(bytes_to_json)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => row
                .try_get::<Option<JsonValue>, _>(idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Uuid => row
                .try_get::<Option<uuid::Uuid>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Timestamp => {
                if let Ok(Some(v)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
                    JsonValue::String(v.to_rfc3339())
                } else if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
                    JsonValue::String(v.to_string())
                } else if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
                    JsonValue::String(v.to_string())
                } else {
                    JsonValue::Null
                }
            }
            TypeCategory::Text => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null),
        };
        values.insert(column.name().to_string(), value);
    }
    values
}

/// Decode a SQLite row into a JSON map.
pub(crate) fn sqlite_row_values(row: &SqliteRow) -> RowValues {
    let mut values = RowValues::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name().to_string();
        let category = categorize(&type_name, Engine::Sqlite);
        let value = match category {
            TypeCategory::Integer => row
                .try_get::<Option<i64>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::Number(v.into()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float | TypeCategory::Decimal => row
                .try_get::<Option<f64>, _>(idx)
                .ok()
                .flatten()
                .map(float_to_json)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(bytes_to_json)
                .unwrap_or(JsonValue::Null),
            // SQLite stores everything else as text, JSON included
            _ => match row.try_get::<Option<String>, _>(idx) {
                Ok(Some(v)) => {
                    if type_name.to_lowercase().contains("json") {
                        serde_json::from_str(&v).unwrap_or(JsonValue::String(v))
                    } else {
                        JsonValue::String(v)
                    }
                }
                _ => JsonValue::Null,
            },
        };
        values.insert(column.name().to_string(), value);
    }
    values
}
