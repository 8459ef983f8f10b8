//! A secondary index over one field.
//!
//! Built once from the full backing snapshot; immutable afterwards except
//! for the hit counter, which counts actual lookup invocations during
//! execution and nothing else.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;

use crate::record::{Record, ValueType};

use super::comparer::Comparer;
use super::errors::{IndexError, IndexResult};
use super::lookup::{KeyGroup, Lookup};

/// Identity of a secondary index: extraction path plus comparer instance.
///
/// Two field keys are equal only when both the path and the comparer
/// *instance* match.
#[derive(Debug, Clone)]
pub struct FieldKey {
    path: String,
    comparer: Comparer,
}

impl FieldKey {
    pub fn new(path: impl Into<String>, comparer: Comparer) -> Self {
        Self {
            path: path.into(),
            comparer,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn comparer(&self) -> &Comparer {
        &self.comparer
    }

    /// Exact match: path equality plus comparer identity.
    pub fn matches(&self, path: &str, comparer: &Comparer) -> bool {
        self.path == path && self.comparer.same(comparer)
    }
}

/// Diagnostic snapshot for one index.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IndexStats {
    /// Indexed field path.
    pub path: String,
    /// Comparer name.
    pub comparer: String,
    /// Lookup invocations so far. Monotone; moves only during execution.
    pub hit: u64,
}

/// Hash multimap from extracted key to its group of records, plus a usage
/// counter.
#[derive(Debug)]
pub struct Index<T> {
    key: FieldKey,
    key_type: ValueType,
    lookup: Lookup<T>,
    hit: AtomicU64,
}

impl<T: Record> Index<T> {
    /// Groups every row of the snapshot by its extracted key.
    ///
    /// The key type is taken from the record type's declaration when it has
    /// one, otherwise inferred from the first extracted key.
    pub fn build(path: impl Into<String>, comparer: Comparer, rows: &[T]) -> IndexResult<Self> {
        let path = path.into();
        if path.is_empty() {
            return Err(IndexError::EmptyPath);
        }
        let key_type = T::field_type(&path).unwrap_or_else(|| {
            rows.first()
                .map(|row| ValueType::of(&row.field(&path)))
                .unwrap_or(ValueType::Null)
        });
        let lookup = Lookup::build(
            rows.iter().cloned(),
            |row| row.field(&path),
            comparer.clone(),
        );
        Ok(Self {
            key: FieldKey::new(path, comparer),
            key_type,
            lookup,
            hit: AtomicU64::new(0),
        })
    }

    /// Group whose key compares equal to `key`; empty when absent.
    ///
    /// Counts exactly one hit per call, irrespective of result size.
    pub fn lookup_equal(&self, key: &Value) -> &[T] {
        self.hit.fetch_add(1, Ordering::Relaxed);
        self.lookup.get(key)
    }

    /// All (key, group) pairs in first-appearance order. Counts one hit.
    pub fn lookup_groups(&self) -> &[KeyGroup<T>] {
        self.hit.fetch_add(1, Ordering::Relaxed);
        self.lookup.groups()
    }

    /// First row of the `key` group. Routes through [`Self::lookup_equal`],
    /// so it counts one hit; fails on an empty group.
    pub fn first(&self, key: &Value) -> IndexResult<&T> {
        self.lookup_equal(key)
            .first()
            .ok_or_else(|| IndexError::EmptyResult {
                field: self.key.path().to_string(),
                key: key.to_string(),
            })
    }

    /// First row of the `key` group, or `None`. Counts one hit.
    pub fn first_or_default(&self, key: &Value) -> Option<&T> {
        self.lookup_equal(key).first()
    }

    pub fn field_key(&self) -> &FieldKey {
        &self.key
    }

    /// Key type fixed at build time.
    pub fn key_type(&self) -> ValueType {
        self.key_type
    }

    /// Lookup invocations so far.
    pub fn hit(&self) -> u64 {
        self.hit.load(Ordering::Relaxed)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            path: self.key.path().to_string(),
            comparer: self.key.comparer().name().to_string(),
            hit: self.hit(),
        }
    }
}
