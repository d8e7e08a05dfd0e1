//! Join metadata: binds a driver table to a joined table over ordered key
//! pairs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Left,
    Right,
    Full,
    Inner,
    Cross,
}

impl JoinType {
    /// The SQL join keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Inner => "INNER JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// One equi-join column pair: `driver.join_key = joined.reference_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKey {
    pub join_key: String,
    pub reference_key: String,
}

/// A join between a driver table and a joined table. The sort code fixes
/// join ordering when multiple joins exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryJoin {
    pub driver_table: String,
    pub join_table: String,
    pub join_type: JoinType,
    /// Ordered; order is preserved in the emitted ON clause.
    pub keys: Vec<JoinKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<i32>,
}

impl QueryJoin {
    /// Create a join over one or more key pairs.
    pub fn new(
        driver_table: impl Into<String>,
        join_table: impl Into<String>,
        join_type: JoinType,
        keys: Vec<JoinKey>,
    ) -> Self {
        Self {
            driver_table: driver_table.into(),
            join_table: join_table.into(),
            join_type,
            keys,
            sort: None,
        }
    }

    /// Shorthand for a single-pair join.
    pub fn on(
        driver_table: impl Into<String>,
        join_table: impl Into<String>,
        join_type: JoinType,
        join_key: impl Into<String>,
        reference_key: impl Into<String>,
    ) -> Self {
        Self::new(
            driver_table,
            join_table,
            join_type,
            vec![JoinKey {
                join_key: join_key.into(),
                reference_key: reference_key.into(),
            }],
        )
    }

    /// Set the sort code.
    pub fn with_sort(mut self, code: i32) -> Self {
        self.sort = Some(code);
        self
    }

    /// The sort code, if explicitly set.
    pub fn sort(&self) -> Option<i32> {
        self.sort
    }

    /// Reflexive identity check: true only for this join's exact driver and
    /// joined table pair.
    pub fn matches(&self, driver_table: &str, join_table: &str) -> bool {
        self.driver_table == driver_table && self.join_table == join_table
    }
}

/// A grouping column reference with a reflexive identity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    pub table: String,
    pub column: String,
}

impl GroupBy {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// True only for this exact table/column pair.
    pub fn matches(&self, table: &str, column: &str) -> bool {
        self.table == table && self.column == column
    }
}
