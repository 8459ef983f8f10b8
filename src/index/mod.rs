//! Secondary index subsystem for memdex
//!
//! Indexes are derived, in-memory-only state built once over an immutable
//! snapshot of the backing collection.
//!
//! # Design Principles
//!
//! - Derived state: an index never changes a query result, only how it is
//!   obtained
//! - Identity-gated: an index is keyed by (field path, comparer instance);
//!   comparer identity, not behavioral equivalence, decides a match
//! - Deterministic: group order follows first appearance, row order follows
//!   source order
//!
//! # Invariants
//!
//! - Every source row appears in exactly one group
//! - The hit counter moves only on actual lookup invocations, exactly once
//!   per call

mod comparer;
mod errors;
mod index;
mod lookup;
mod registry;

pub use comparer::{Comparer, KeyComparer};
pub use errors::{IndexError, IndexResult};
pub use index::{FieldKey, Index, IndexStats};
pub use lookup::{KeyGroup, Lookup};
pub use registry::IndexRegistry;
