//! Query-surface error taxonomy.
//!
//! Errors are cloneable so a cached compilation failure can be handed to
//! every later execution attempt unchanged.

use thiserror::Error;

use crate::index::IndexError;
use crate::rewrite::RewriteError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors surfaced by compiling or running a query
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Index construction or lookup failure
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Fatal rewrite/compilation failure
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    /// `first` found no element
    #[error("sequence contains no matching element")]
    EmptySequence,

    /// A prepared query ran with fewer arguments than its placeholders
    #[error("no argument bound to external slot {slot}")]
    UnknownExternal { slot: usize },

    /// A rewritten tree references an index slot the registry lacks
    #[error("no index registered in slot {slot}")]
    UnknownIndexSlot { slot: usize },

    /// The shared registry lock was poisoned by a panicking writer
    #[error("index registry lock poisoned")]
    RegistryPoisoned,
}
