//! The compilation contract between the DSL and backends.
//!
//! The DSL performs no compilation itself. A backend walks the tree by
//! recursive descent (no fixed depth limit) and may rely on:
//! - operator arity: BETWEEN takes `Ranges` (two bind positions), IN takes
//!   `Arrays` (N positions), NULL checks take none, everything else one
//!   scalar-producing parameter;
//! - group children are ordered and that order must survive in the output;
//! - sort codes are a stable tie-break, unset meaning declaration order;
//! - bind positions are allocated in document order.

use serde_json::Value as JsonValue;

use crate::error::DbResult;
use crate::query::Query;

/// A query compiled to a backend's native representation: text plus bind
/// values in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub text: String,
    pub binds: Vec<JsonValue>,
}

impl CompiledQuery {
    pub fn new(text: impl Into<String>, binds: Vec<JsonValue>) -> Self {
        Self {
            text: text.into(),
            binds,
        }
    }
}

/// A backend-specific compiler over the DSL tree.
pub trait QueryCompiler: Send + Sync {
    /// Compile a full query tree.
    fn compile(&self, query: &Query) -> DbResult<CompiledQuery>;
}
