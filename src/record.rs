//! Record access seam between the query engine and user domain types.
//!
//! The engine never inspects domain types directly; it reaches into them
//! through [`Record`], which extracts dynamic values by field path. JSON
//! object documents get a blanket implementation so schema-less data works
//! out of the box.

use std::fmt;

use serde_json::Value;

/// Closed tag over the dynamic value space.
///
/// Stands in for runtime type parameters during type reconciliation: an
/// index fixes its key type at build time, and replacement nodes are rebound
/// to the field's declared type before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueType {
    /// Tag of a concrete value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A queryable domain item.
///
/// `field` extracts the value at a field path; a missing field is `Null`,
/// not an error. `field_type` reports the declared type of a path when the
/// type carries a schema; `None` means no declaration, and the engine infers
/// the key type from the data at index build time.
pub trait Record: Clone {
    /// Extracts the value at `path`.
    fn field(&self, path: &str) -> Value;

    /// Declared value type of `path`, if the record type declares one.
    fn field_type(path: &str) -> Option<ValueType> {
        let _ = path;
        None
    }
}

/// Schema-less JSON object documents.
impl Record for Value {
    fn field(&self, path: &str) -> Value {
        self.get(path).cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_of() {
        assert_eq!(ValueType::of(&json!(null)), ValueType::Null);
        assert_eq!(ValueType::of(&json!(true)), ValueType::Bool);
        assert_eq!(ValueType::of(&json!(42)), ValueType::Number);
        assert_eq!(ValueType::of(&json!("x")), ValueType::String);
        assert_eq!(ValueType::of(&json!([1])), ValueType::Array);
        assert_eq!(ValueType::of(&json!({})), ValueType::Object);
    }

    #[test]
    fn test_json_document_field_access() {
        let doc = json!({ "city": "NYC", "zip": 10001 });
        assert_eq!(doc.field("city"), json!("NYC"));
        assert_eq!(doc.field("zip"), json!(10001));
    }

    #[test]
    fn test_missing_field_is_null() {
        let doc = json!({ "city": "NYC" });
        assert_eq!(doc.field("country"), Value::Null);
        // Non-object documents have no fields at all.
        assert_eq!(json!(3).field("city"), Value::Null);
    }

    #[test]
    fn test_json_documents_declare_no_types() {
        assert_eq!(<Value as Record>::field_type("city"), None);
    }
}
