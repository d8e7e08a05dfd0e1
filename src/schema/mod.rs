//! Schema lifecycle: operator contract, per-call sessions and the manager
//! that ties a configured schema to its backend.

pub mod manager;
pub mod operator;
pub mod session;

pub use manager::SchemaManager;
pub use operator::{Operator, SchemaConnector, ShardSpec};
pub use session::Session;
