//! Query expression tree for memdex
//!
//! An immutable representation of a declarative operation pipeline: a
//! source reference, chained operation calls, and embedded
//! predicate/key-selector lambdas.
//!
//! # Design Principles
//!
//! - Tagged union plus structural recursion, no dynamic dispatch
//! - Trees are immutable; rewriting produces new trees that share
//!   unaffected subtrees
//! - Lambda arguments travel quoted and are shape-inspected, never
//!   independently rewritten

pub mod build;
mod node;
pub mod shape;

pub use build::{external, field_eq, field_eq_key, key_selector, lit, param, ExprExt};
pub use node::{CallExpr, Expr, IndexLookupExpr, IndexOp, LambdaExpr, OpKind};
pub use shape::LambdaShape;
