//! Filter predicate DSL: column conditions and condition groups.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};
use crate::query::Parameter;

/// The closed operator set for column conditions. Each code determines the
/// arity and placeholder shape of its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCode {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Between,
    NotBetween,
    Like,
    NotLike,
    IsNull,
    NotNull,
    In,
    NotIn,
    Exists,
    NotExists,
}

impl ConditionCode {
    /// The SQL-ish operator text; backends may remap.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::IsNull => "IS NULL",
            Self::NotNull => "IS NOT NULL",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Exists => "EXISTS",
            Self::NotExists => "NOT EXISTS",
        }
    }

    /// Whether this operator takes no bind positions.
    pub fn is_nullary(&self) -> bool {
        matches!(self, Self::IsNull | Self::NotNull)
    }

    /// Whether this operator requires a `Ranges` parameter (two bind positions).
    pub fn wants_ranges(&self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }

    /// Whether this operator requires an `Arrays` parameter (N bind positions).
    pub fn wants_arrays(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

/// How siblings in a group combine. Explicit by design: compilers must not
/// silently assume conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    /// The SQL combinator keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// A leaf predicate over one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnCondition {
    pub code: ConditionCode,
    pub table: String,
    pub column: String,
    /// Optional aggregate/transform applied to the column before comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Absent only for NULL checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<Parameter>,
}

/// An internal node: ordered children combined by an explicit conjunction.
/// Child order must be preserved in generated output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCondition {
    pub conjunction: Conjunction,
    pub children: Vec<Condition>,
}

/// The filter predicate tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Column(ColumnCondition),
    Group(GroupCondition),
}

impl Condition {
    /// A leaf condition with a parameter.
    pub fn column(
        code: ConditionCode,
        table: impl Into<String>,
        column: impl Into<String>,
        parameter: Parameter,
    ) -> Self {
        Self::Column(ColumnCondition {
            code,
            table: table.into(),
            column: column.into(),
            function: None,
            parameter: Some(parameter),
        })
    }

    /// A NULL-check leaf (no parameter).
    pub fn null_check(
        code: ConditionCode,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::Column(ColumnCondition {
            code,
            table: table.into(),
            column: column.into(),
            function: None,
            parameter: None,
        })
    }

    /// An ordered group.
    pub fn group(conjunction: Conjunction, children: Vec<Condition>) -> Self {
        Self::Group(GroupCondition {
            conjunction,
            children,
        })
    }

    /// Apply an aggregate/transform function to a leaf condition's column.
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        if let Self::Column(ref mut leaf) = self {
            leaf.function = Some(name.into());
        }
        self
    }

    /// Validate the arity contract the compiler relies on:
    /// BETWEEN family takes `Ranges`, IN family takes `Arrays`, NULL checks
    /// take nothing, everything else takes exactly one scalar-producing
    /// parameter. Groups validate recursively.
    pub fn validate(&self) -> DbResult<()> {
        match self {
            Self::Group(group) => {
                for child in &group.children {
                    child.validate()?;
                }
                Ok(())
            }
            Self::Column(leaf) => {
                let describe = |msg: &str| {
                    DbError::invalid_input(format!(
                        "{} (condition {} on {}.{})",
                        msg,
                        leaf.code.symbol(),
                        leaf.table,
                        leaf.column
                    ))
                };
                match (&leaf.parameter, leaf.code) {
                    (None, code) if code.is_nullary() => Ok(()),
                    (Some(_), code) if code.is_nullary() => {
                        Err(describe("NULL checks take no parameter"))
                    }
                    (None, _) => Err(describe("Condition requires a parameter")),
                    (Some(Parameter::Ranges { .. }), code) if code.wants_ranges() => Ok(()),
                    (Some(_), code) if code.wants_ranges() => {
                        Err(describe("BETWEEN requires a Ranges parameter"))
                    }
                    (Some(Parameter::Arrays { .. }), code) if code.wants_arrays() => Ok(()),
                    (Some(_), code) if code.wants_arrays() => {
                        Err(describe("IN requires an Arrays parameter"))
                    }
                    (Some(param), _) if param.is_scalar() => Ok(()),
                    (Some(_), _) => {
                        Err(describe("Operator requires a scalar-producing parameter"))
                    }
                }
            }
        }
    }
}
