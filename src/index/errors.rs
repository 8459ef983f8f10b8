//! # Index Errors
//!
//! Error types for index construction and lookup.
//!
//! Argument-absence failures collapse to [`IndexError::EmptyPath`] here:
//! ownership and the type system make an absent comparer or collection
//! unrepresentable.

use thiserror::Error;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Index construction and lookup errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Index construction requires a non-empty field path
    #[error("index field path must not be empty")]
    EmptyPath,

    /// `first` on a lookup that produced no rows
    #[error("lookup for key {key} on field '{field}' produced no rows")]
    EmptyResult { field: String, key: String },
}
