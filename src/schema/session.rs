//! Explicit per-call context.
//!
//! A `Session` carries the operator and optional transaction attributes for
//! one logical call chain. It is created by the caller, passed through every
//! operation, and discarded when the chain ends. Nothing here is shared or
//! ambient; two sessions never observe each other.

use std::sync::Arc;

use crate::schema::operator::Operator;
use crate::transaction::TransactionalConfig;

/// Per-call state: the bound operator and the transaction attributes, if any.
pub struct Session {
    operator: Option<Arc<dyn Operator>>,
    transactional: Option<TransactionalConfig>,
}

impl Session {
    /// An auto-commit session with no operator bound yet.
    pub fn new() -> Self {
        Self {
            operator: None,
            transactional: None,
        }
    }

    /// A session carrying transaction attributes. The transaction itself
    /// starts when the manager binds an operator.
    pub fn transactional(config: TransactionalConfig) -> Self {
        Self {
            operator: None,
            transactional: Some(config),
        }
    }

    /// The transaction attributes, if this session is transactional.
    pub fn transactional_config(&self) -> Option<&TransactionalConfig> {
        self.transactional.as_ref()
    }

    /// Whether an operator is currently bound.
    pub fn is_bound(&self) -> bool {
        self.operator.is_some()
    }

    pub(crate) fn operator(&self) -> Option<&Arc<dyn Operator>> {
        self.operator.as_ref()
    }

    pub(crate) fn bind_operator(&mut self, operator: Arc<dyn Operator>) {
        self.operator = Some(operator);
    }

    pub(crate) fn take_operator(&mut self) -> Option<Arc<dyn Operator>> {
        self.operator.take()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("bound", &self.operator.is_some())
            .field("transactional", &self.transactional)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transaction::Isolation;

    #[test]
    fn test_new_session_is_unbound() {
        let session = Session::new();
        assert!(!session.is_bound());
        assert!(session.transactional_config().is_none());
    }

    #[test]
    fn test_transactional_session_carries_config() {
        let config =
            TransactionalConfig::new_instance(30, Isolation::Default, vec![ErrorKind::Operation])
                .unwrap();
        let id = config.transaction_id().to_string();
        let session = Session::transactional(config);
        assert_eq!(session.transactional_config().unwrap().transaction_id(), id);
    }
}
