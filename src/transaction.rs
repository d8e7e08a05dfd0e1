//! Per-call transaction attributes.
//!
//! A `TransactionalConfig` is created once per transactional call boundary,
//! immutable, and discarded at transaction end. The generated identity exists
//! purely for correlation in logs; it has no bearing on commit/rollback
//! semantics.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, ErrorKind};

/// Transaction isolation levels, backend-interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Use the backend's default level.
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Immutable per-transaction attributes plus a generated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionalConfig {
    transaction_id: String,
    timeout_secs: i64,
    isolation: Isolation,
    rollback_for: Vec<ErrorKind>,
}

impl TransactionalConfig {
    /// Create a transactional config, or signal "no transaction requested".
    ///
    /// Returns `None` when `timeout_secs` is negative or the rollback-class
    /// list is empty. This is a deliberate sentinel, not a failure: callers
    /// propagate it as an auto-commit call. Every `Some` result carries a
    /// distinct, time-ordered transaction identity, even for identical
    /// arguments.
    pub fn new_instance(
        timeout_secs: i64,
        isolation: Isolation,
        rollback_for: Vec<ErrorKind>,
    ) -> Option<Self> {
        if timeout_secs < 0 || rollback_for.is_empty() {
            return None;
        }
        Some(Self {
            transaction_id: generate_transaction_id(),
            timeout_secs,
            isolation,
            rollback_for,
        })
    }

    /// The generated transaction identity.
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Configured timeout in seconds.
    pub fn timeout_secs(&self) -> i64 {
        self.timeout_secs
    }

    /// Configured isolation level.
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    /// Error classes that force a rollback.
    pub fn rollback_for(&self) -> &[ErrorKind] {
        &self.rollback_for
    }

    /// Whether an error belongs to a rollback-forcing class.
    pub fn should_rollback(&self, err: &DbError) -> bool {
        self.rollback_for.contains(&err.kind())
    }
}

/// Generate a unique, time-ordered transaction ID.
fn generate_transaction_id() -> String {
    format!("tx_{}", uuid::Uuid::now_v7().simple())
}
