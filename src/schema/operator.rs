//! The backend operator contract.
//!
//! An operator is a per-call backend handle performing CRUD, DDL and
//! transaction calls. Each concrete backend (pooled-relational,
//! distributed-client, remote-service) supplies its own implementation; the
//! lifecycle manager acquires operators through a [`SchemaConnector`] and
//! never sees the concrete type.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DbResult;
use crate::models::{RowValues, TableDefine};
use crate::query::{Condition, Query};
use crate::transaction::TransactionalConfig;

/// Resolved physical routing for one operation: which database and which
/// table shard a logical table maps to. Empty strings mean "unsharded".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardSpec {
    pub database: String,
    pub table: String,
}

impl ShardSpec {
    /// The unsharded routing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether any axis is routed.
    pub fn is_sharded(&self) -> bool {
        !self.database.is_empty() || !self.table.is_empty()
    }
}

/// Per-call backend handle. Implementations use interior mutability for their
/// in-flight transaction; all methods take `&self`.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Start a transaction with the config's timeout and isolation.
    async fn begin_transactional(&self, config: &TransactionalConfig) -> DbResult<()>;

    /// Commit the in-flight transaction.
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the in-flight transaction.
    async fn rollback(&self) -> DbResult<()>;

    /// Insert one row; returns rows affected.
    async fn insert(
        &self,
        table: &TableDefine,
        row: &RowValues,
        shard: &ShardSpec,
    ) -> DbResult<u64>;

    /// Fetch rows matching the example row by column equality.
    async fn retrieve(
        &self,
        table: &TableDefine,
        example: &RowValues,
        shard: &ShardSpec,
    ) -> DbResult<Vec<RowValues>>;

    /// Update matching rows with new values; returns rows affected.
    async fn update(
        &self,
        table: &TableDefine,
        values: &RowValues,
        condition: &Condition,
        shard: &ShardSpec,
    ) -> DbResult<u64>;

    /// Delete matching rows; returns rows affected.
    async fn delete(
        &self,
        table: &TableDefine,
        condition: &Condition,
        shard: &ShardSpec,
    ) -> DbResult<u64>;

    /// Execute a query tree.
    async fn query(&self, query: &Query, shard: &ShardSpec) -> DbResult<Vec<RowValues>>;

    /// Execute a query tree with write-intent locking.
    async fn query_for_update(&self, query: &Query, shard: &ShardSpec)
        -> DbResult<Vec<RowValues>>;

    /// Synchronize the table's DDL with its definition.
    async fn init_table(&self, table: &TableDefine, shard: &ShardSpec) -> DbResult<()>;

    /// Truncate one table.
    async fn truncate_table(&self, table: &str, shard: &ShardSpec) -> DbResult<()>;

    /// Truncate several tables.
    async fn truncate_tables(&self, tables: &[String], shard: &ShardSpec) -> DbResult<()> {
        for table in tables {
            self.truncate_table(table, shard).await?;
        }
        Ok(())
    }

    /// Drop one table.
    async fn drop_table(&self, table: &str, shard: &ShardSpec) -> DbResult<()>;

    /// Drop several tables.
    async fn drop_tables(&self, tables: &[String], shard: &ShardSpec) -> DbResult<()> {
        for table in tables {
            self.drop_table(table, shard).await?;
        }
        Ok(())
    }

    /// Release the operator's resources. Must not fail; called on every exit
    /// path of a transactional call.
    async fn release(&self);
}

/// Factory seam between the lifecycle manager and a concrete backend.
#[async_trait]
pub trait SchemaConnector: Send + Sync {
    /// Acquire a fresh operator for one logical call chain.
    async fn acquire(&self) -> DbResult<Arc<dyn Operator>>;

    /// Prime the backend's shard-routing table with the configured default.
    /// Invoked once at manager construction.
    async fn init_sharding(&self, default_shard_value: &str) -> DbResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_spec_none() {
        let spec = ShardSpec::none();
        assert!(!spec.is_sharded());
        assert_eq!(spec.database, "");
    }

    #[test]
    fn test_shard_spec_sharded() {
        let spec = ShardSpec {
            database: "db_1".into(),
            table: String::new(),
        };
        assert!(spec.is_sharded());
    }
}
