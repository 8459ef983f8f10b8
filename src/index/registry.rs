//! Ordered collection of indexes owned by a query root.
//!
//! Registration order is observable: diagnostics report indexes in the
//! order they were added, and an omitted query comparer resolves against
//! that order. The registry is shared by reference across every query
//! derived from a common root; callers serialize mutation (single-writer
//! discipline).

use std::sync::Arc;

use super::comparer::Comparer;
use super::index::{Index, IndexStats};
use crate::record::Record;

/// Registry mapping (path, comparer identity) to an index.
///
/// Multiple indexes may exist for the same path under different comparers.
#[derive(Debug, Default)]
pub struct IndexRegistry<T> {
    indexes: Vec<Arc<Index<T>>>,
}

impl<T> IndexRegistry<T> {
    pub fn new() -> Self {
        Self {
            indexes: Vec::new(),
        }
    }

    /// Appends an index; returns its slot (registration order).
    pub fn register(&mut self, index: Index<T>) -> usize {
        self.indexes.push(Arc::new(index));
        self.indexes.len() - 1
    }

    pub fn get(&self, slot: usize) -> Option<&Arc<Index<T>>> {
        self.indexes.get(slot)
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

impl<T: Record> IndexRegistry<T> {
    /// Exact-match lookup: path equality plus comparer identity.
    pub fn resolve(&self, path: &str, comparer: &Comparer) -> Option<(usize, &Arc<Index<T>>)> {
        self.indexes
            .iter()
            .enumerate()
            .find(|(_, index)| index.field_key().matches(path, comparer))
    }

    /// Resolution as a query sees it.
    ///
    /// An explicit comparer matches strictly by identity. An omitted
    /// comparer accepts a single index on the field outright; when several
    /// comparers exist for the same field, only the one built with the
    /// canonical default comparer qualifies.
    pub fn resolve_query(
        &self,
        path: &str,
        comparer: Option<&Comparer>,
    ) -> Option<(usize, &Arc<Index<T>>)> {
        match comparer {
            Some(c) => self.resolve(path, c),
            None => {
                let mut on_path = self
                    .indexes
                    .iter()
                    .enumerate()
                    .filter(|(_, index)| index.field_key().path() == path);
                let first = on_path.next()?;
                match on_path.next() {
                    None => Some(first),
                    Some(_) => self.resolve(path, &Comparer::structural()),
                }
            }
        }
    }

    /// Whether any index exists for `path`, under any comparer.
    pub fn has_path(&self, path: &str) -> bool {
        self.indexes
            .iter()
            .any(|index| index.field_key().path() == path)
    }

    /// Per-index diagnostics in registration order.
    pub fn stats(&self) -> Vec<IndexStats> {
        self.indexes.iter().map(|index| index.stats()).collect()
    }
}
