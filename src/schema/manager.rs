//! Schema lifecycle manager.
//!
//! One manager owns one logical schema: its configuration, its resolved
//! dialect and a connector to its backend. The manager validates its wiring at
//! construction, routes every operation through the session's operator and
//! resolves shard keys before handing work to the backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::SchemaConfig;
use crate::dialect::{retrieve_dialect, Dialect};
use crate::error::{DbError, DbResult};
use crate::models::{RowValues, TableDefine};
use crate::query::{Condition, Query};
use crate::schema::operator::{Operator, SchemaConnector, ShardSpec};
use crate::schema::session::Session;
use crate::sharding::{ShardingAxis, ShardingConfig};

/// Lifecycle manager for one configured schema.
pub struct SchemaManager {
    config: SchemaConfig,
    dialect: Arc<Dialect>,
    connector: Arc<dyn SchemaConnector>,
    sharding: RwLock<HashMap<String, ShardingConfig>>,
}

impl SchemaManager {
    /// Wire a schema to its backend.
    ///
    /// Fails fast on configuration defects: no endpoints, or a dialect name
    /// that is not registered. When sharding is enabled the backend's routing
    /// table is primed with the configured default before the manager is
    /// handed out.
    pub async fn connect(
        config: SchemaConfig,
        connector: Arc<dyn SchemaConnector>,
    ) -> DbResult<Self> {
        if config.servers.is_empty() && config.connection_string.is_none() {
            return Err(DbError::NoEndpoints {
                schema: config.schema_name.clone(),
            });
        }
        let dialect = retrieve_dialect(&config.dialect_name)?;
        if let Err(message) = config.pool_bounds.validate() {
            return Err(DbError::configuration(message));
        }
        if config.sharding {
            connector.init_sharding(&config.default_shard_value).await?;
        }
        info!(
            schema = %config.schema_name,
            dialect = %config.dialect_name,
            sharding = config.sharding,
            "Schema manager connected"
        );
        Ok(Self {
            config,
            dialect,
            connector,
            sharding: RwLock::new(HashMap::new()),
        })
    }

    /// The schema's configuration.
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// The schema's resolved dialect.
    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    /// Register sharding for one logical table. Later registrations for the
    /// same table replace earlier ones.
    pub fn register_sharding(&self, config: ShardingConfig) {
        let table = config.table().to_string();
        let mut sharding = self.sharding.write().expect("sharding map poisoned");
        if sharding.insert(table.clone(), config).is_some() {
            warn!(table = %table, "Sharding configuration replaced");
        }
    }

    /// Resolve the physical routing for a table from a row's values.
    ///
    /// Tables without a registered sharding configuration are unsharded.
    pub fn shard_spec(&self, table: &str, row: &RowValues) -> ShardSpec {
        let sharding = self.sharding.read().expect("sharding map poisoned");
        match sharding.get(table) {
            None => ShardSpec::none(),
            Some(config) => ShardSpec {
                database: config.sharding_key(ShardingAxis::Database, row),
                table: config.sharding_key(ShardingAxis::Table, row),
            },
        }
    }

    /// Bind an operator to the session and, when the session carries
    /// transaction attributes, start the transaction.
    ///
    /// Idempotent: a session with an operator already bound is left untouched.
    pub async fn begin_transactional(&self, session: &mut Session) -> DbResult<()> {
        if session.is_bound() {
            debug!(schema = %self.config.schema_name, "Operator already bound, begin is a no-op");
            return Ok(());
        }
        let operator = self.connector.acquire().await?;
        if let Some(config) = session.transactional_config() {
            operator.begin_transactional(config).await?;
            debug!(
                schema = %self.config.schema_name,
                transaction_id = %config.transaction_id(),
                "Transaction started"
            );
        }
        session.bind_operator(operator);
        Ok(())
    }

    /// Commit the session's transaction. A session without transaction
    /// attributes or without a bound operator commits nothing.
    pub async fn commit(&self, session: &mut Session) -> DbResult<()> {
        let (Some(config), Some(operator)) = (session.transactional_config(), session.operator())
        else {
            return Ok(());
        };
        operator.commit().await.map_err(|err| {
            DbError::transaction(err.to_string(), config.transaction_id().to_string())
        })?;
        debug!(transaction_id = %config.transaction_id(), "Transaction committed");
        Ok(())
    }

    /// Roll back the session's transaction. A session without transaction
    /// attributes or without a bound operator rolls back nothing.
    pub async fn rollback(&self, session: &mut Session) -> DbResult<()> {
        let (Some(config), Some(operator)) = (session.transactional_config(), session.operator())
        else {
            return Ok(());
        };
        operator.rollback().await.map_err(|err| {
            DbError::transaction(err.to_string(), config.transaction_id().to_string())
        })?;
        debug!(transaction_id = %config.transaction_id(), "Transaction rolled back");
        Ok(())
    }

    /// Unbind and release the session's operator. Runs unconditionally and
    /// never fails; call it on every exit path of a transactional chain.
    pub async fn clear_transactional(&self, session: &mut Session) {
        if let Some(operator) = session.take_operator() {
            operator.release().await;
            debug!(schema = %self.config.schema_name, "Operator released");
        }
    }

    fn bound_operator<'a>(&self, session: &'a Session) -> DbResult<&'a Arc<dyn Operator>> {
        session.operator().ok_or_else(|| DbError::NoOperator {
            schema: self.config.schema_name.clone(),
        })
    }

    /// Warn when an operation exceeds the advisory low-query timeout. The
    /// operation itself is never cancelled.
    fn report_slow(&self, operation: &str, table: &str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed > self.config.low_query_timeout() {
            warn!(
                schema = %self.config.schema_name,
                operation = %operation,
                table = %table,
                elapsed_ms = elapsed.as_millis() as u64,
                "Slow operation"
            );
        }
    }

    /// Insert one row; returns rows affected.
    pub async fn insert(
        &self,
        session: &Session,
        table: &TableDefine,
        row: &RowValues,
    ) -> DbResult<u64> {
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(&table.name, row);
        let started = Instant::now();
        let affected = operator.insert(table, row, &shard).await?;
        self.report_slow("insert", &table.name, started);
        Ok(affected)
    }

    /// Fetch rows matching the example row by column equality.
    pub async fn retrieve(
        &self,
        session: &Session,
        table: &TableDefine,
        example: &RowValues,
    ) -> DbResult<Vec<RowValues>> {
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(&table.name, example);
        let started = Instant::now();
        let rows = operator.retrieve(table, example, &shard).await?;
        self.report_slow("retrieve", &table.name, started);
        Ok(rows)
    }

    /// Update matching rows; returns rows affected.
    pub async fn update(
        &self,
        session: &Session,
        table: &TableDefine,
        values: &RowValues,
        condition: &Condition,
    ) -> DbResult<u64> {
        condition.validate()?;
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(&table.name, values);
        let started = Instant::now();
        let affected = operator.update(table, values, condition, &shard).await?;
        self.report_slow("update", &table.name, started);
        Ok(affected)
    }

    /// Delete matching rows; returns rows affected. Routed by the table's
    /// default shard since no row values are available.
    pub async fn delete(
        &self,
        session: &Session,
        table: &TableDefine,
        condition: &Condition,
    ) -> DbResult<u64> {
        condition.validate()?;
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(&table.name, &RowValues::new());
        let started = Instant::now();
        let affected = operator.delete(table, condition, &shard).await?;
        self.report_slow("delete", &table.name, started);
        Ok(affected)
    }

    /// Execute a query tree.
    pub async fn query(&self, session: &Session, query: &Query) -> DbResult<Vec<RowValues>> {
        query.validate()?;
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(&query.table, &RowValues::new());
        let started = Instant::now();
        let rows = operator.query(query, &shard).await?;
        self.report_slow("query", &query.table, started);
        Ok(rows)
    }

    /// Execute a query tree with write-intent locking.
    pub async fn query_for_update(
        &self,
        session: &Session,
        query: &Query,
    ) -> DbResult<Vec<RowValues>> {
        query.validate()?;
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(&query.table, &RowValues::new());
        let started = Instant::now();
        let rows = operator.query_for_update(query, &shard).await?;
        self.report_slow("query_for_update", &query.table, started);
        Ok(rows)
    }

    /// Synchronize a table's DDL with its definition.
    pub async fn init_table(&self, session: &Session, table: &TableDefine) -> DbResult<()> {
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(&table.name, &RowValues::new());
        operator.init_table(table, &shard).await
    }

    /// Truncate one table.
    pub async fn truncate_table(&self, session: &Session, table: &str) -> DbResult<()> {
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(table, &RowValues::new());
        operator.truncate_table(table, &shard).await
    }

    /// Truncate several tables.
    pub async fn truncate_tables(&self, session: &Session, tables: &[String]) -> DbResult<()> {
        for table in tables {
            self.truncate_table(session, table).await?;
        }
        Ok(())
    }

    /// Drop one table.
    pub async fn drop_table(&self, session: &Session, table: &str) -> DbResult<()> {
        let operator = self.bound_operator(session)?;
        let shard = self.shard_spec(table, &RowValues::new());
        operator.drop_table(table, &shard).await
    }

    /// Drop several tables.
    pub async fn drop_tables(&self, session: &Session, tables: &[String]) -> DbResult<()> {
        for table in tables {
            self.drop_table(session, table).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::dialect::register_builtin_dialects;
    use crate::error::ErrorKind;
    use crate::models::{ColumnDefine, ValueType, JDBC_BIGINT, JDBC_VARCHAR};
    use crate::sharding::{row, ModuloCalculator, ShardingDetails};
    use crate::transaction::{Isolation, TransactionalConfig};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubOperator {
        calls: Mutex<Vec<String>>,
    }

    impl StubOperator {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Operator for StubOperator {
        async fn begin_transactional(&self, config: &TransactionalConfig) -> DbResult<()> {
            self.record(format!("begin:{}", config.timeout_secs()));
            Ok(())
        }

        async fn commit(&self) -> DbResult<()> {
            self.record("commit");
            Ok(())
        }

        async fn rollback(&self) -> DbResult<()> {
            self.record("rollback");
            Ok(())
        }

        async fn insert(
            &self,
            table: &TableDefine,
            _row: &RowValues,
            shard: &ShardSpec,
        ) -> DbResult<u64> {
            self.record(format!("insert:{}:{}", table.name, shard.database));
            Ok(1)
        }

        async fn retrieve(
            &self,
            table: &TableDefine,
            _example: &RowValues,
            _shard: &ShardSpec,
        ) -> DbResult<Vec<RowValues>> {
            self.record(format!("retrieve:{}", table.name));
            Ok(vec![])
        }

        async fn update(
            &self,
            table: &TableDefine,
            _values: &RowValues,
            _condition: &Condition,
            _shard: &ShardSpec,
        ) -> DbResult<u64> {
            self.record(format!("update:{}", table.name));
            Ok(1)
        }

        async fn delete(
            &self,
            table: &TableDefine,
            _condition: &Condition,
            _shard: &ShardSpec,
        ) -> DbResult<u64> {
            self.record(format!("delete:{}", table.name));
            Ok(1)
        }

        async fn query(&self, query: &Query, _shard: &ShardSpec) -> DbResult<Vec<RowValues>> {
            self.record(format!("query:{}", query.table));
            Ok(vec![])
        }

        async fn query_for_update(
            &self,
            query: &Query,
            _shard: &ShardSpec,
        ) -> DbResult<Vec<RowValues>> {
            self.record(format!("query_for_update:{}", query.table));
            Ok(vec![])
        }

        async fn init_table(&self, table: &TableDefine, _shard: &ShardSpec) -> DbResult<()> {
            self.record(format!("init_table:{}", table.name));
            Ok(())
        }

        async fn truncate_table(&self, table: &str, _shard: &ShardSpec) -> DbResult<()> {
            self.record(format!("truncate:{}", table));
            Ok(())
        }

        async fn drop_table(&self, table: &str, _shard: &ShardSpec) -> DbResult<()> {
            self.record(format!("drop:{}", table));
            Ok(())
        }

        async fn release(&self) {
            self.record("release");
        }
    }

    struct StubConnector {
        operator: Arc<StubOperator>,
        init_sharding_calls: Mutex<Vec<String>>,
    }

    impl StubConnector {
        fn new() -> Self {
            Self {
                operator: Arc::new(StubOperator::default()),
                init_sharding_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SchemaConnector for StubConnector {
        async fn acquire(&self) -> DbResult<Arc<dyn Operator>> {
            Ok(self.operator.clone() as Arc<dyn Operator>)
        }

        async fn init_sharding(&self, default_shard_value: &str) -> DbResult<()> {
            self.init_sharding_calls
                .lock()
                .unwrap()
                .push(default_shard_value.to_string());
            Ok(())
        }
    }

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

    fn config() -> SchemaConfig {
        register_builtin_dialects();
        SchemaConfig::new("main", "mysql", BackendKind::PooledRelational)
            .server(crate::config::ServerInfo::new("localhost", 3306, 100))
    }

    async fn manager() -> (SchemaManager, Arc<StubOperator>) {
        let connector = Arc::new(StubConnector::new());
        let operator = connector.operator.clone();
        let manager = SchemaManager::connect(config(), connector).await.unwrap();
        (manager, operator)
    }

    #[tokio::test]
    async fn test_connect_requires_endpoints() {
        register_builtin_dialects();
        let config = SchemaConfig::new("empty", "mysql", BackendKind::PooledRelational);
        let err = SchemaManager::connect(config, Arc::new(StubConnector::new()))
            .await
            .err()
            .unwrap();
        match err {
            DbError::NoEndpoints { schema } => assert_eq!(schema, "empty"),
            other => panic!("expected NoEndpoints, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_requires_registered_dialect() {
        register_builtin_dialects();
        let config = SchemaConfig::new("main", "no-such-dialect", BackendKind::PooledRelational)
            .server(crate::config::ServerInfo::new("localhost", 3306, 100));
        let err = SchemaManager::connect(config, Arc::new(StubConnector::new()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::DialectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_connect_primes_sharding() {
        register_builtin_dialects();
        let connector = Arc::new(StubConnector::new());
        let config = config().with_sharding("db_0");
        SchemaManager::connect(config, connector.clone())
            .await
            .unwrap();
        assert_eq!(
            connector.init_sharding_calls.lock().unwrap().as_slice(),
            ["db_0"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_operator_fails_fast() {
        let (manager, operator) = manager().await;
        let session = Session::new();
        let err = manager
            .insert(&session, &orders(), &row(&[("id", json!(1))]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NoOperator { .. }));
        assert!(operator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_begin_is_idempotent() {
        let (manager, operator) = manager().await;
        let tx = TransactionalConfig::new_instance(
            30,
            Isolation::Default,
            vec![ErrorKind::Operation],
        )
        .unwrap();
        let mut session = Session::transactional(tx);
        manager.begin_transactional(&mut session).await.unwrap();
        manager.begin_transactional(&mut session).await.unwrap();
        assert_eq!(operator.calls(), ["begin:30"]);
    }

    #[tokio::test]
    async fn test_auto_commit_session_skips_transaction_calls() {
        let (manager, operator) = manager().await;
        let mut session = Session::new();
        manager.begin_transactional(&mut session).await.unwrap();
        manager.commit(&mut session).await.unwrap();
        manager.rollback(&mut session).await.unwrap();
        manager.clear_transactional(&mut session).await;
        assert_eq!(operator.calls(), ["release"]);
    }

    #[tokio::test]
    async fn test_transactional_lifecycle() {
        let (manager, operator) = manager().await;
        let tx = TransactionalConfig::new_instance(
            30,
            Isolation::Default,
            vec![ErrorKind::Operation],
        )
        .unwrap();
        let mut session = Session::transactional(tx);
        manager.begin_transactional(&mut session).await.unwrap();
        manager
            .insert(&session, &orders(), &row(&[("id", json!(1))]))
            .await
            .unwrap();
        manager.commit(&mut session).await.unwrap();
        manager.clear_transactional(&mut session).await;
        assert_eq!(
            operator.calls(),
            ["begin:30", "insert:orders:", "commit", "release"]
        );
        assert!(!session.is_bound());
    }

    #[tokio::test]
    async fn test_clear_is_unconditional() {
        let (manager, _) = manager().await;
        let mut session = Session::new();
        // nothing bound, clearing is still fine
        manager.clear_transactional(&mut session).await;
        assert!(!session.is_bound());
    }

    #[tokio::test]
    async fn test_insert_routes_through_sharding() {
        let (manager, operator) = manager().await;
        let table = orders();
        let details = ShardingDetails::new(
            "0",
            "tenant_id",
            "db_{shardingKey}",
            ValueType::Long,
        )
        .with_calculator(Arc::new(ModuloCalculator::new(4)));
        manager.register_sharding(ShardingConfig::new(&table, Some(details), None).unwrap());

        let mut session = Session::new();
        manager.begin_transactional(&mut session).await.unwrap();
        manager
            .insert(&session, &table, &row(&[("tenant_id", json!(9))]))
            .await
            .unwrap();
        assert_eq!(operator.calls(), ["insert:orders:db_1"]);
    }

    #[tokio::test]
    async fn test_unregistered_table_is_unsharded() {
        let (manager, _) = manager().await;
        let spec = manager.shard_spec("anything", &row(&[("id", json!(1))]));
        assert_eq!(spec, ShardSpec::none());
    }
}
