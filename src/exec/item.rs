//! Execution result items.
//!
//! A pipeline stage consumes and produces a uniform item stream: records
//! from the source, projected scalar values, or key groups.

use serde_json::Value;

/// One group produced by `group_by`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupItem<T> {
    /// Group key, as extracted by the key selector.
    pub key: Value,
    /// Group members in source order.
    pub items: Vec<QueryItem<T>>,
}

/// One element of a pipeline stage's output.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryItem<T> {
    /// A source record.
    Record(T),
    /// A projected scalar value.
    Value(Value),
    /// A key group.
    Group(GroupItem<T>),
}

impl<T> QueryItem<T> {
    pub fn as_record(&self) -> Option<&T> {
        match self {
            QueryItem::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            QueryItem::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupItem<T>> {
        match self {
            QueryItem::Group(group) => Some(group),
            _ => None,
        }
    }
}
