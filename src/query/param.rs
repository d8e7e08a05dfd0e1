//! Typed operands within conditions and function calls.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::query::Query;

/// A typed operand. All variants carry an optional sort code used to preserve
/// caller-specified ordering of function arguments and projected items; an
/// unset code means "declaration order".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameter {
    /// Reference to a table column.
    Column {
        table: String,
        column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
    /// A literal value.
    Constant {
        value: JsonValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
    /// A function application over nested parameters; nesting is unbounded.
    Function {
        name: String,
        params: Vec<Parameter>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
    /// An embedded sub-query, optionally wrapped in a function.
    Query {
        query: Box<Query>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
    /// A begin/end pair, the operand shape of BETWEEN.
    Ranges {
        begin: JsonValue,
        end: JsonValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
    /// A literal list, the operand shape of IN.
    Arrays {
        values: Vec<JsonValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<i32>,
    },
}

impl Parameter {
    /// A column reference without alias.
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            table: table.into(),
            column: column.into(),
            alias: None,
            sort: None,
        }
    }

    /// A literal constant.
    pub fn constant(value: impl Into<JsonValue>) -> Self {
        Self::Constant {
            value: value.into(),
            sort: None,
        }
    }

    /// A function application.
    pub fn function(name: impl Into<String>, params: Vec<Parameter>) -> Self {
        Self::Function {
            name: name.into(),
            params,
            sort: None,
        }
    }

    /// An embedded sub-query.
    pub fn query(query: Query) -> Self {
        Self::Query {
            query: Box::new(query),
            function: None,
            sort: None,
        }
    }

    /// A begin/end range.
    pub fn ranges(begin: impl Into<JsonValue>, end: impl Into<JsonValue>) -> Self {
        Self::Ranges {
            begin: begin.into(),
            end: end.into(),
            sort: None,
        }
    }

    /// A literal list.
    pub fn arrays(values: Vec<JsonValue>) -> Self {
        Self::Arrays {
            values,
            sort: None,
        }
    }

    /// Set the sort code.
    pub fn with_sort(mut self, code: i32) -> Self {
        *self.sort_mut() = Some(code);
        self
    }

    /// The sort code, if explicitly set.
    pub fn sort(&self) -> Option<i32> {
        match self {
            Self::Column { sort, .. }
            | Self::Constant { sort, .. }
            | Self::Function { sort, .. }
            | Self::Query { sort, .. }
            | Self::Ranges { sort, .. }
            | Self::Arrays { sort, .. } => *sort,
        }
    }

    fn sort_mut(&mut self) -> &mut Option<i32> {
        match self {
            Self::Column { sort, .. }
            | Self::Constant { sort, .. }
            | Self::Function { sort, .. }
            | Self::Query { sort, .. }
            | Self::Ranges { sort, .. }
            | Self::Arrays { sort, .. } => sort,
        }
    }

    /// Whether this parameter produces exactly one scalar bind position.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Column { .. } | Self::Constant { .. } | Self::Function { .. } | Self::Query { .. }
        )
    }
}

/// Stable sort by sort code. Unset codes count as zero, so nodes without
/// explicit codes keep their declaration order while explicit codes reorder
/// relative to siblings sharing the same parent.
pub fn sort_by_code<T, F>(items: &mut [T], code: F)
where
    F: Fn(&T) -> Option<i32>,
{
    items.sort_by_key(|item| code(item).unwrap_or(0));
}
