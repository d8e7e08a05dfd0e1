//! In-memory backend.
//!
//! Stores tables as row vectors and evaluates the query DSL directly, which
//! makes the full lifecycle testable without a database server. Supports the
//! comparison, BETWEEN, LIKE, NULL and IN operators, column projections,
//! ordering, limit and offset; joins, grouping and sub-queries are out of its
//! reach and rejected.
//!
//! Transactions are whole-store snapshots: begin clones the store, rollback
//! restores it, commit discards the snapshot.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::models::{RowValues, TableDefine};
use crate::query::{
    sort_by_code, Condition, ConditionCode, Conjunction, Item, Parameter, Query, SortDirection,
};
use crate::schema::{Operator, SchemaConnector, ShardSpec};
use crate::transaction::TransactionalConfig;

type Store = HashMap<String, Vec<RowValues>>;

/// In-memory backend serving one schema.
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Direct row access for assertions.
    pub async fn rows(&self, table: &str) -> Vec<RowValues> {
        self.store.lock().await.get(table).cloned().unwrap_or_default()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaConnector for MemoryBackend {
    async fn acquire(&self) -> DbResult<Arc<dyn Operator>> {
        Ok(Arc::new(MemoryOperator {
            store: self.store.clone(),
            snapshot: Mutex::new(None),
        }))
    }

    async fn init_sharding(&self, default_shard_value: &str) -> DbResult<()> {
        debug!(default = %default_shard_value, "Shard routing primed");
        Ok(())
    }
}

/// Operator over the shared in-memory store.
pub struct MemoryOperator {
    store: Arc<Mutex<Store>>,
    snapshot: Mutex<Option<Store>>,
}

impl MemoryOperator {
    /// The physical table shard name, or the logical name when unsharded.
    fn physical_table(logical: &str, shard: &ShardSpec) -> String {
        if shard.table.is_empty() {
            logical.to_string()
        } else {
            shard.table.clone()
        }
    }
}

fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn like_matches(value: &str, pattern: &str) -> bool {
    // % wildcards only, the common case
    match (pattern.starts_with('%'), pattern.ends_with('%')) {
        (true, true) => value.contains(pattern.trim_matches('%')),
        (true, false) => value.ends_with(pattern.trim_start_matches('%')),
        (false, true) => value.starts_with(pattern.trim_end_matches('%')),
        (false, false) => value == pattern,
    }
}

fn eval_parameter(parameter: &Parameter, row: &RowValues) -> DbResult<JsonValue> {
    match parameter {
        Parameter::Constant { value, .. } => Ok(value.clone()),
        Parameter::Column { column, .. } => {
            Ok(row.get(column).cloned().unwrap_or(JsonValue::Null))
        }
        other => Err(DbError::invalid_input(format!(
            "Memory backend cannot evaluate parameter {:?}",
            other
        ))),
    }
}

fn eval_condition(condition: &Condition, row: &RowValues) -> DbResult<bool> {
    match condition {
        Condition::Group(group) => {
            let mut results = Vec::with_capacity(group.children.len());
            for child in &group.children {
                results.push(eval_condition(child, row)?);
            }
            Ok(match group.conjunction {
                Conjunction::And => results.iter().all(|r| *r),
                Conjunction::Or => results.iter().any(|r| *r),
            })
        }
        Condition::Column(leaf) => {
            let value = row.get(&leaf.column).cloned().unwrap_or(JsonValue::Null);
            match leaf.code {
                ConditionCode::IsNull => return Ok(value.is_null()),
                ConditionCode::NotNull => return Ok(!value.is_null()),
                _ => {}
            }
            let parameter = leaf
                .parameter
                .as_ref()
                .ok_or_else(|| DbError::invalid_input("Condition missing parameter"))?;
            match (leaf.code, parameter) {
                (ConditionCode::Between | ConditionCode::NotBetween, Parameter::Ranges { begin, end, .. }) => {
                    let inside = matches!(
                        compare_values(&value, begin),
                        Some(Ordering::Greater | Ordering::Equal)
                    ) && matches!(
                        compare_values(&value, end),
                        Some(Ordering::Less | Ordering::Equal)
                    );
                    Ok(if leaf.code == ConditionCode::Between {
                        inside
                    } else {
                        !inside
                    })
                }
                (ConditionCode::In | ConditionCode::NotIn, Parameter::Arrays { values, .. }) => {
                    let member = values.contains(&value);
                    Ok(if leaf.code == ConditionCode::In {
                        member
                    } else {
                        !member
                    })
                }
                (ConditionCode::Like | ConditionCode::NotLike, parameter) => {
                    let pattern = eval_parameter(parameter, row)?;
                    let matched = match (&value, &pattern) {
                        (JsonValue::String(v), JsonValue::String(p)) => like_matches(v, p),
                        _ => false,
                    };
                    Ok(if leaf.code == ConditionCode::Like {
                        matched
                    } else {
                        !matched
                    })
                }
                (ConditionCode::Exists | ConditionCode::NotExists, _) => Err(
                    DbError::invalid_input("Memory backend does not support EXISTS"),
                ),
                (code, parameter) => {
                    let operand = eval_parameter(parameter, row)?;
                    let ordering = compare_values(&value, &operand);
                    Ok(match code {
                        ConditionCode::Equal => value == operand,
                        ConditionCode::NotEqual => value != operand,
                        ConditionCode::Greater => ordering == Some(Ordering::Greater),
                        ConditionCode::GreaterEqual => {
                            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                        }
                        ConditionCode::Less => ordering == Some(Ordering::Less),
                        ConditionCode::LessEqual => {
                            matches!(ordering, Some(Ordering::Less | Ordering::Equal))
                        }
                        _ => false,
                    })
                }
            }
        }
    }
}

fn project(row: &RowValues, items: &[Item]) -> DbResult<RowValues> {
    if items.is_empty() {
        return Ok(row.clone());
    }
    let mut projected = RowValues::new();
    for item in items {
        match item {
            Item::Column { column, alias, .. } => {
                let key = alias.clone().unwrap_or_else(|| column.clone());
                let value = row.get(column).cloned().unwrap_or(JsonValue::Null);
                projected.insert(key, value);
            }
            other => {
                return Err(DbError::invalid_input(format!(
                    "Memory backend cannot project {:?}",
                    other
                )))
            }
        }
    }
    Ok(projected)
}

#[async_trait]
impl Operator for MemoryOperator {
    async fn begin_transactional(&self, config: &TransactionalConfig) -> DbResult<()> {
        let mut snapshot = self.snapshot.lock().await;
        if snapshot.is_none() {
            *snapshot = Some(self.store.lock().await.clone());
            debug!(transaction_id = %config.transaction_id(), "Snapshot taken");
        }
        Ok(())
    }

    async fn commit(&self) -> DbResult<()> {
        self.snapshot.lock().await.take().ok_or_else(|| {
            DbError::operation("Commit without an active transaction", None)
        })?;
        Ok(())
    }

    async fn rollback(&self) -> DbResult<()> {
        let snapshot = self.snapshot.lock().await.take().ok_or_else(|| {
            DbError::operation("Rollback without an active transaction", None)
        })?;
        *self.store.lock().await = snapshot;
        Ok(())
    }

    async fn insert(
        &self,
        table: &TableDefine,
        row: &RowValues,
        shard: &ShardSpec,
    ) -> DbResult<u64> {
        for column in row.keys() {
            if !table.has_column(column) {
                return Err(DbError::table_define(&table.name, column));
            }
        }
        let physical = Self::physical_table(&table.name, shard);
        let mut store = self.store.lock().await;
        store.entry(physical).or_default().push(row.clone());
        Ok(1)
    }

    async fn retrieve(
        &self,
        table: &TableDefine,
        example: &RowValues,
        shard: &ShardSpec,
    ) -> DbResult<Vec<RowValues>> {
        let physical = Self::physical_table(&table.name, shard);
        let store = self.store.lock().await;
        let rows = store.get(&physical).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| {
                example.iter().all(|(column, expected)| {
                    row.get(column).unwrap_or(&JsonValue::Null) == expected
                })
            })
            .collect())
    }

    async fn update(
        &self,
        table: &TableDefine,
        values: &RowValues,
        condition: &Condition,
        shard: &ShardSpec,
    ) -> DbResult<u64> {
        let physical = Self::physical_table(&table.name, shard);
        let mut store = self.store.lock().await;
        let Some(rows) = store.get_mut(&physical) else {
            return Ok(0);
        };
        let mut affected = 0;
        for row in rows.iter_mut() {
            if eval_condition(condition, row)? {
                for (column, value) in values {
                    row.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete(
        &self,
        table: &TableDefine,
        condition: &Condition,
        shard: &ShardSpec,
    ) -> DbResult<u64> {
        let physical = Self::physical_table(&table.name, shard);
        let mut store = self.store.lock().await;
        let Some(rows) = store.get_mut(&physical) else {
            return Ok(0);
        };
        let before = rows.len();
        let mut failure = None;
        rows.retain(|row| match eval_condition(condition, row) {
            Ok(matched) => !matched,
            Err(err) => {
                failure.get_or_insert(err);
                true
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        Ok((before - rows.len()) as u64)
    }

    async fn query(&self, query: &Query, shard: &ShardSpec) -> DbResult<Vec<RowValues>> {
        if !query.joins.is_empty() || !query.group_bys.is_empty() {
            return Err(DbError::invalid_input(
                "Memory backend does not support joins or grouping",
            ));
        }
        let physical = Self::physical_table(&query.table, shard);
        let store = self.store.lock().await;
        let mut rows = store.get(&physical).cloned().unwrap_or_default();
        drop(store);

        if let Some(condition) = &query.condition {
            let mut filtered = Vec::with_capacity(rows.len());
            for row in rows {
                if eval_condition(condition, &row)? {
                    filtered.push(row);
                }
            }
            rows = filtered;
        }

        for order in query.order_bys.iter().rev() {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&JsonValue::Null);
                let right = b.get(&order.column).unwrap_or(&JsonValue::Null);
                let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let rows: Vec<RowValues> = rows.into_iter().skip(offset).collect();
        let rows: Vec<RowValues> = match query.limit {
            Some(limit) => rows.into_iter().take(limit as usize).collect(),
            None => rows,
        };

        let mut items = query.items.clone();
        sort_by_code(&mut items, Item::sort);
        rows.iter().map(|row| project(row, &items)).collect()
    }

    async fn query_for_update(
        &self,
        query: &Query,
        shard: &ShardSpec,
    ) -> DbResult<Vec<RowValues>> {
        // No row locking in a single-process store
        self.query(query, shard).await
    }

    async fn init_table(&self, table: &TableDefine, shard: &ShardSpec) -> DbResult<()> {
        let physical = Self::physical_table(&table.name, shard);
        self.store.lock().await.entry(physical).or_default();
        Ok(())
    }

    async fn truncate_table(&self, table: &str, shard: &ShardSpec) -> DbResult<()> {
        let physical = Self::physical_table(table, shard);
        if let Some(rows) = self.store.lock().await.get_mut(&physical) {
            rows.clear();
        }
        Ok(())
    }

    async fn drop_table(&self, table: &str, shard: &ShardSpec) -> DbResult<()> {
        let physical = Self::physical_table(table, shard);
        self.store.lock().await.remove(&physical);
        Ok(())
    }

    async fn release(&self) {
        // An open snapshot at release means the chain ended without commit
        let snapshot = self.snapshot.lock().await.take();
        if let Some(snapshot) = snapshot {
            *self.store.lock().await = snapshot;
            debug!("Open snapshot restored on release");
        }
    }
}
