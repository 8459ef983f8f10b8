//! Ordered hash multimap from extracted key to grouped rows.
//!
//! Built once over an immutable snapshot. Invariants:
//!
//! - every source row lands in exactly one group
//! - group membership is decided by comparer equality
//! - order within a group follows source iteration order
//! - order across groups follows first appearance at build time

use std::collections::HashMap;

use serde_json::Value;

use super::comparer::Comparer;

/// One key group, in source order.
#[derive(Debug, Clone)]
pub struct KeyGroup<T> {
    key: Value,
    rows: Vec<T>,
}

impl<T> KeyGroup<T> {
    pub fn key(&self) -> &Value {
        &self.key
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }
}

/// Hash multimap keyed by comparer equality.
///
/// Groups live in a first-appearance-ordered vector; a bucket map from
/// comparer hash to group slots makes lookup constant-time.
#[derive(Debug)]
pub struct Lookup<T> {
    comparer: Comparer,
    groups: Vec<KeyGroup<T>>,
    buckets: HashMap<u64, Vec<usize>>,
}

impl<T> Lookup<T> {
    /// Groups every row by its extracted key under `comparer`.
    pub fn build<I, F>(rows: I, extract: F, comparer: Comparer) -> Self
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> Value,
    {
        let mut lookup = Self {
            comparer,
            groups: Vec::new(),
            buckets: HashMap::new(),
        };
        for row in rows {
            let key = extract(&row);
            lookup.push(key, row);
        }
        lookup
    }

    fn push(&mut self, key: Value, row: T) {
        let hash = self.comparer.hash_key(&key);
        let slots = self.buckets.entry(hash).or_default();
        for &slot in slots.iter() {
            if self.comparer.key_eq(&self.groups[slot].key, &key) {
                self.groups[slot].rows.push(row);
                return;
            }
        }
        slots.push(self.groups.len());
        self.groups.push(KeyGroup {
            key,
            rows: vec![row],
        });
    }

    /// Rows whose key compares equal to `key`; empty when absent.
    pub fn get(&self, key: &Value) -> &[T] {
        let hash = self.comparer.hash_key(key);
        if let Some(slots) = self.buckets.get(&hash) {
            for &slot in slots {
                if self.comparer.key_eq(&self.groups[slot].key, key) {
                    return &self.groups[slot].rows;
                }
            }
        }
        &[]
    }

    /// All groups in first-appearance order.
    pub fn groups(&self) -> &[KeyGroup<T>] {
        &self.groups
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn comparer(&self) -> &Comparer {
        &self.comparer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(rows: &[(&str, i64)], comparer: Comparer) -> Lookup<(String, i64)> {
        Lookup::build(
            rows.iter().map(|(k, v)| (k.to_string(), *v)),
            |(k, _)| json!(k),
            comparer,
        )
    }

    #[test]
    fn test_groups_follow_first_appearance() {
        let lookup = build(
            &[("NYC", 1), ("LA", 2), ("NYC", 3), ("SF", 4), ("LA", 5)],
            Comparer::structural(),
        );
        let keys: Vec<_> = lookup.groups().iter().map(|g| g.key().clone()).collect();
        assert_eq!(keys, vec![json!("NYC"), json!("LA"), json!("SF")]);
    }

    #[test]
    fn test_rows_keep_source_order() {
        let lookup = build(&[("a", 1), ("a", 2), ("a", 3)], Comparer::structural());
        let rows: Vec<i64> = lookup.get(&json!("a")).iter().map(|(_, v)| *v).collect();
        assert_eq!(rows, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_key_yields_empty_slice() {
        let lookup = build(&[("a", 1)], Comparer::structural());
        assert!(lookup.get(&json!("b")).is_empty());
    }

    #[test]
    fn test_comparer_decides_group_membership() {
        let lookup = build(&[("GAU1", 1), ("gau1", 2)], Comparer::case_insensitive());
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get(&json!("GaU1")).len(), 2);

        let exact = build(&[("GAU1", 1), ("gau1", 2)], Comparer::structural());
        assert_eq!(exact.len(), 2);
        assert_eq!(exact.get(&json!("GAU1")).len(), 1);
    }

    #[test]
    fn test_every_row_in_exactly_one_group() {
        let lookup = build(
            &[("x", 1), ("y", 2), ("x", 3), ("z", 4)],
            Comparer::structural(),
        );
        let total: usize = lookup.groups().iter().map(|g| g.rows().len()).sum();
        assert_eq!(total, 4);
    }
}
