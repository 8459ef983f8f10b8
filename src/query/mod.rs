//! Query surface for memdex
//!
//! The user-facing layer: composition of pipeline trees over a snapshot,
//! lazy one-time compilation through the rewriter, cached compilation
//! outcomes, and prepared parameterized queries.
//!
//! # Design Principles
//!
//! - Composition is cheap and pure; all routing work happens at compile
//!   time, once per derived query
//! - Source and registry are shared by every derivation of one root
//! - Compilation failures cache like successes and re-surface unchanged

mod compiler;
mod errors;
mod provider;

pub use compiler::{CompiledQuery, PreparedQuery};
pub use errors::{QueryError, QueryResult};
pub use provider::{as_indexed_queryable, IndexedQuery};
