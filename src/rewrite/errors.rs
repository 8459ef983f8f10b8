//! # Rewrite Errors
//!
//! An unsupported predicate shape is never an error; it routes the call to
//! the default scan. A call the closed dispatch table cannot resolve at all
//! is a configuration gap in the rewriter itself, fatal and surfaced to the
//! caller at compile time.

use thiserror::Error;

/// Result type for rewrite operations
pub type RewriteResult<T> = Result<T, RewriteError>;

/// Fatal rewriter/compiler configuration gaps
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    /// No executable operation exists for an emitted node
    #[error("no matching operation for '{op}': {detail}")]
    NoMatchingOperation { op: &'static str, detail: String },
}

impl RewriteError {
    pub fn no_match(op: &'static str, detail: impl Into<String>) -> Self {
        Self::NoMatchingOperation {
            op,
            detail: detail.into(),
        }
    }
}
