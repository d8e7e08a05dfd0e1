//! Data models consumed by the access core.
//!
//! This module re-exports the entity-mapping types (table/column definitions)
//! and the row-value representation used throughout the crate.

pub mod table;

pub use table::{
    ColumnDefine, RowValues, TableDefine, ValueType, JDBC_BIGINT, JDBC_BOOLEAN, JDBC_DECIMAL,
    JDBC_DOUBLE, JDBC_INTEGER, JDBC_TIMESTAMP, JDBC_VARCHAR,
};
