//! Dialect-neutral query DSL.
//!
//! The DSL is a pure, inert tree: conditions, projection items, parameters
//! and joins. It knows no SQL and no wire format; a backend-specific compiler
//! walks it and may rely on the guarantees spelled out on each node type
//! (operator arity, ordered group children, stable sort codes, unbounded
//! function nesting).

pub mod compiler;
pub mod condition;
pub mod item;
pub mod join;
pub mod param;

use serde::{Deserialize, Serialize};

use crate::error::DbResult;

pub use compiler::{CompiledQuery, QueryCompiler};
pub use condition::{ColumnCondition, Condition, ConditionCode, Conjunction, GroupCondition};
pub use item::Item;
pub use join::{GroupBy, JoinKey, JoinType, QueryJoin};
pub use param::{sort_by_code, Parameter};

/// Sort direction for an ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One ordering entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub table: String,
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A complete query tree over one driver table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub joins: Vec<QueryJoin>,
    #[serde(default)]
    pub group_bys: Vec<GroupBy>,
    #[serde(default)]
    pub order_bys: Vec<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl Query {
    /// Start a query over a driver table. No items means "all columns".
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            items: Vec::new(),
            condition: None,
            joins: Vec::new(),
            group_bys: Vec::new(),
            order_bys: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Add a projection item.
    pub fn item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    /// Set the root filter condition.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Add a join.
    pub fn join(mut self, join: QueryJoin) -> Self {
        self.joins.push(join);
        self
    }

    /// Add a grouping column.
    pub fn group_by(mut self, group: GroupBy) -> Self {
        self.group_bys.push(group);
        self
    }

    /// Add an ordering entry.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_bys.push(order);
        self
    }

    /// Limit the result set.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip leading rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Validate the tree's arity contract before compilation.
    pub fn validate(&self) -> DbResult<()> {
        if let Some(condition) = &self.condition {
            condition.validate()?;
        }
        for item in &self.items {
            if let Item::Query { query, .. } = item {
                query.validate()?;
            }
        }
        Ok(())
    }

    /// Projection items in effective order (stable sort by sort code).
    pub fn sorted_items(&self) -> Vec<Item> {
        let mut items = self.items.clone();
        sort_by_code(&mut items, Item::sort);
        items
    }

    /// Joins in effective order (stable sort by sort code).
    pub fn sorted_joins(&self) -> Vec<QueryJoin> {
        let mut joins = self.joins.clone();
        sort_by_code(&mut joins, QueryJoin::sort);
        joins
    }
}
