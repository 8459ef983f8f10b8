//! memdex - index-aware acceleration for in-memory declarative queries
//!
//! Declarative pipeline trees over immutable snapshots, rewritten to read
//! from secondary indexes wherever an eligible call resolves to one.

pub mod exec;
pub mod expr;
pub mod index;
pub mod query;
pub mod record;
pub mod rewrite;

pub use exec::{GroupItem, QueryItem};
pub use expr::{field_eq, field_eq_key, key_selector, LambdaExpr};
pub use index::{Comparer, IndexStats};
pub use query::{as_indexed_queryable, IndexedQuery, QueryError, QueryResult};
pub use record::{Record, ValueType};
