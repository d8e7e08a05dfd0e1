//! Bind-value helpers for the relational backend.
//!
//! Bind values arrive as JSON documents in document order. These helpers map
//! each value onto the engine-specific bind call.

use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a value to a MySQL query.
pub(crate) fn bind_mysql<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    value: &'q JsonValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match value {
        JsonValue::Null => query.bind(None::<String>),
        JsonValue::Bool(v) => query.bind(*v),
        JsonValue::Number(n) => bind_number_mysql(query, n),
        JsonValue::String(v) => query.bind(v.as_str()),
        other => query.bind(Json(other)),
    }
}

fn bind_number_mysql<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    n: &serde_json::Number,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    if let Some(v) = n.as_i64() {
        query.bind(v)
    } else if let Some(v) = n.as_f64() {
        query.bind(v)
    } else {
        query.bind(n.to_string())
    }
}

/// Bind a value to a PostgreSQL query.
pub(crate) fn bind_postgres<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &'q JsonValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        JsonValue::Null => query.bind(None::<String>),
        JsonValue::Bool(v) => query.bind(*v),
        JsonValue::Number(n) => {
            if let Some(v) = n.as_i64() {
                query.bind(v)
            } else if let Some(v) = n.as_f64() {
                query.bind(v)
            } else {
                query.bind(n.to_string())
            }
        }
        JsonValue::String(v) => query.bind(v.as_str()),
        other => query.bind(Json(other)),
    }
}

/// Bind a value to a SQLite query. SQLite has no native JSON type; documents
/// are stored as their text rendering.
pub(crate) fn bind_sqlite<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q JsonValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        JsonValue::Null => query.bind(None::<String>),
        JsonValue::Bool(v) => query.bind(*v),
        JsonValue::Number(n) => {
            if let Some(v) = n.as_i64() {
                query.bind(v)
            } else if let Some(v) = n.as_f64() {
                query.bind(v)
            } else {
                query.bind(n.to_string())
            }
        }
        JsonValue::String(v) => query.bind(v.as_str()),
        other => query.bind(other.to_string()),
    }
}
