//! Error types for the database access core.
//!
//! This module defines all error types using `thiserror`. The taxonomy follows
//! three families: configuration errors (detected at construction time, never
//! downgraded), operation errors (propagated to the caller with backend detail
//! preserved) and degraded-configuration conditions (reported via `tracing`,
//! never raised from here).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Dialect not registered: {name}")]
    DialectNotFound { name: String },

    #[error("Table definition error: column '{column}' not found in table '{table}'")]
    TableDefine { table: String, column: String },

    #[error("Schema '{schema}' has no backend endpoints configured")]
    NoEndpoints { schema: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("No active operator for schema '{schema}': call begin_transactional first")]
    NoOperator { schema: String },

    #[error("Operation failed: {message}")]
    Operation {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Transaction error: {message} (transaction: {transaction_id})")]
    Transaction {
        message: String,
        transaction_id: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse classification of an error, used by transactional configs to decide
/// which error families force a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Operation,
    Connection,
    Transaction,
    Timeout,
    InvalidInput,
    Internal,
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a dialect-not-found error.
    pub fn dialect_not_found(name: impl Into<String>) -> Self {
        Self::DialectNotFound { name: name.into() }
    }

    /// Create a table-definition error.
    pub fn table_define(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::TableDefine {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create an operation error with optional SQL state.
    pub fn operation(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Operation {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            transaction_id: transaction_id.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error for rollback-class matching.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DialectNotFound { .. }
            | Self::TableDefine { .. }
            | Self::NoEndpoints { .. }
            | Self::Configuration { .. } => ErrorKind::Configuration,
            Self::NoOperator { .. } | Self::Operation { .. } => ErrorKind::Operation,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Transaction { .. } => ErrorKind::Transaction,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error was detected at configuration/initialization time.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if this error is retryable. The core itself never retries; the
    /// flag feeds the `RetryPolicy` hook backends may honor.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError, preserving backend detail.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::operation(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::operation("No rows returned", None),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::operation(format!("Type not found: {}", type_name), None)
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::operation(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::dialect_not_found("memsql");
        assert!(err.to_string().contains("memsql"));

        let err = DbError::table_define("orders", "tenant_id");
        assert!(err.to_string().contains("orders"));
        assert!(err.to_string().contains("tenant_id"));
    }

    #[test]
    fn test_configuration_classification() {
        assert!(DbError::dialect_not_found("x").is_configuration());
        assert!(DbError::table_define("t", "c").is_configuration());
        assert!(
            DbError::NoEndpoints {
                schema: "main".into()
            }
            .is_configuration()
        );
        assert!(!DbError::operation("boom", None).is_configuration());
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::timeout("query", 30).is_retryable());
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::operation("err", None).is_retryable());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(DbError::operation("x", None).kind(), ErrorKind::Operation);
        assert_eq!(
            DbError::transaction("x", "tx_1").kind(),
            ErrorKind::Transaction
        );
        assert_eq!(DbError::invalid_input("x").kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_operation_preserves_sql_state() {
        let err = DbError::operation("undefined table", Some("42P01".to_string()));
        match err {
            DbError::Operation { sql_state, .. } => {
                assert_eq!(sql_state.as_deref(), Some("42P01"));
            }
            _ => panic!("expected Operation"),
        }
    }

    #[test]
    fn test_connection_suggestion() {
        let err = DbError::connection("refused", "Check the server is running");
        assert_eq!(err.suggestion(), Some("Check the server is running"));
        assert_eq!(DbError::internal("x").suggestion(), None);
    }
}
