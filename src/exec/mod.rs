//! Pipeline execution for memdex
//!
//! Interprets rewritten trees against a source snapshot: scan stages
//! resolve through the rewrite dispatch table, index lookup stages read
//! from the registry and move hit counters.
//!
//! # Invariants
//!
//! - Scan and index routes produce the same rows in the same order for
//!   any tree the rewriter accepts
//! - Hit counters move only here, exactly once per index lookup

mod executor;
mod item;

pub use executor::{execute, ExecContext};
pub use item::{GroupItem, QueryItem};
