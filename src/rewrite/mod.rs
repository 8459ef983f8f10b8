//! Index-aware query rewriting for memdex
//!
//! Turns declarative pipeline trees into trees whose eligible calls read
//! from secondary indexes instead of scanning the source.
//!
//! # Design Principles
//!
//! - Closed dispatch: every operation resolves through one table shared by
//!   the rewriter and the executor
//! - Substitution failure is a routing decision with a recorded reason,
//!   never an error
//! - Fatal errors exist only for calls the dispatch table cannot resolve
//!   at all
//!
//! # Invariants
//!
//! - Rewriting is pure: no hit counter moves, no registry mutation
//! - Output trees share every unaffected subtree with their input
//! - A rewritten tree always passes [`dispatch::validate`]

pub mod dispatch;
mod errors;
mod explain;
mod rewriter;

pub use dispatch::{index_op_for, resolve_scan, split_comparer, validate, ScanOp};
pub use errors::{RewriteError, RewriteResult};
pub use explain::{ExplainPlan, ExplainStep};
pub use rewriter::{Decision, Outcome, Rewriter, ScanReason};
