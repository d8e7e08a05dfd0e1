//! Projection items: the SELECT-list side of the DSL. Items mirror the
//! parameter tree shape but are used in projection rather than filtering.

use serde::{Deserialize, Serialize};

use crate::query::{Parameter, Query};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    /// A projected column, optionally distinct.
    Column {
        table: String,
        column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(default)]
        distinct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
    /// A projected function application over ordered parameters.
    Function {
        name: String,
        params: Vec<Parameter>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
    /// A projected sub-query.
    Query {
        query: Box<Query>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
}

impl Item {
    /// A plain column projection.
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            table: table.into(),
            column: column.into(),
            alias: None,
            distinct: false,
            sort: None,
        }
    }

    /// A function projection.
    pub fn function(name: impl Into<String>, params: Vec<Parameter>) -> Self {
        Self::Function {
            name: name.into(),
            params,
            alias: None,
            sort: None,
        }
    }

    /// A sub-query projection.
    pub fn query(query: Query) -> Self {
        Self::Query {
            query: Box::new(query),
            alias: None,
            sort: None,
        }
    }

    /// Mark a column projection distinct.
    pub fn distinct(mut self) -> Self {
        if let Self::Column {
            ref mut distinct, ..
        } = self
        {
            *distinct = true;
        }
        self
    }

    /// Set the output alias.
    pub fn with_alias(mut self, name: impl Into<String>) -> Self {
        match self {
            Self::Column { ref mut alias, .. }
            | Self::Function { ref mut alias, .. }
            | Self::Query { ref mut alias, .. } => *alias = Some(name.into()),
        }
        self
    }

    /// Set the sort code.
    pub fn with_sort(mut self, code: i32) -> Self {
        match self {
            Self::Column { ref mut sort, .. }
            | Self::Function { ref mut sort, .. }
            | Self::Query { ref mut sort, .. } => *sort = Some(code),
        }
        self
    }

    /// The sort code, if explicitly set.
    pub fn sort(&self) -> Option<i32> {
        match self {
            Self::Column { sort, .. } | Self::Function { sort, .. } | Self::Query { sort, .. } => {
                *sort
            }
        }
    }

    /// The output alias, if set.
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Column { alias, .. }
            | Self::Function { alias, .. }
            | Self::Query { alias, .. } => alias.as_deref(),
        }
    }
}
