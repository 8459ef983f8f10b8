//! Key comparers with identity semantics.
//!
//! A [`Comparer`] pairs a key-equality relation with a compatible hash. The
//! engine matches comparers by *instance identity*, never by behavior: two
//! separately constructed case-insensitive comparers are distinct, and a
//! query carrying one never triggers an index built with the other. The
//! canonical default comparer is a process-wide singleton so that every
//! omitted comparer shares a single identity.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use serde_json::Value;

/// Key equality plus a compatible hash.
///
/// Implementations must keep the two consistent: keys that compare equal
/// under `key_eq` must produce the same `hash_key`.
pub trait KeyComparer: Send + Sync {
    /// Key equality under this comparer.
    fn key_eq(&self, a: &Value, b: &Value) -> bool;

    /// Hash compatible with `key_eq`.
    fn hash_key(&self, key: &Value) -> u64;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Cheap clonable comparer handle. Identity is pointer identity of the
/// underlying instance.
#[derive(Clone)]
pub struct Comparer(Arc<dyn KeyComparer>);

impl Comparer {
    /// Wraps a caller-provided comparer. Every call mints a new identity.
    pub fn custom(comparer: impl KeyComparer + 'static) -> Self {
        Self(Arc::new(comparer))
    }

    /// The canonical default: structural value equality.
    ///
    /// Returns the same instance on every call, so omitted comparers all
    /// resolve to one identity.
    pub fn structural() -> Self {
        static CANONICAL: OnceLock<Comparer> = OnceLock::new();
        CANONICAL.get_or_init(|| Comparer::custom(Structural)).clone()
    }

    /// ASCII case-insensitive string comparison; structural elsewhere.
    ///
    /// Deliberately mints a fresh identity per call: behaviorally identical
    /// instances stay distinguishable, which is what gates index usage.
    pub fn case_insensitive() -> Self {
        Self::custom(CaseInsensitive)
    }

    /// Instance identity. This, not behavioral equivalence, decides whether
    /// a query comparer matches an index comparer.
    pub fn same(&self, other: &Comparer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn key_eq(&self, a: &Value, b: &Value) -> bool {
        self.0.key_eq(a, b)
    }

    pub fn hash_key(&self, key: &Value) -> u64 {
        self.0.hash_key(key)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for Comparer {
    fn default() -> Self {
        Self::structural()
    }
}

impl fmt::Debug for Comparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comparer({})", self.name())
    }
}

struct Structural;

impl KeyComparer for Structural {
    fn key_eq(&self, a: &Value, b: &Value) -> bool {
        a == b
    }

    fn hash_key(&self, key: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        hash_value(key, &mut hasher);
        hasher.finish()
    }

    fn name(&self) -> &'static str {
        "structural"
    }
}

struct CaseInsensitive;

impl KeyComparer for CaseInsensitive {
    fn key_eq(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::String(x), Value::String(y)) => x.eq_ignore_ascii_case(y),
            _ => a == b,
        }
    }

    fn hash_key(&self, key: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        match key {
            Value::String(s) => {
                hasher.write_u8(3);
                for byte in s.bytes() {
                    hasher.write_u8(byte.to_ascii_lowercase());
                }
            }
            other => hash_value(other, &mut hasher),
        }
        hasher.finish()
    }

    fn name(&self) -> &'static str {
        "case_insensitive"
    }
}

/// Deterministic structural hash over the dynamic value space.
///
/// Numbers hash through their f64 bits; representations that compare
/// unequal may still collide, which is allowed.
fn hash_value<H: Hasher>(value: &Value, hasher: &mut H) {
    match value {
        Value::Null => hasher.write_u8(0),
        Value::Bool(b) => {
            hasher.write_u8(1);
            b.hash(hasher);
        }
        Value::Number(n) => {
            hasher.write_u8(2);
            n.as_f64().unwrap_or(0.0).to_bits().hash(hasher);
        }
        Value::String(s) => {
            hasher.write_u8(3);
            s.hash(hasher);
        }
        Value::Array(items) => {
            hasher.write_u8(4);
            hasher.write_usize(items.len());
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(map) => {
            hasher.write_u8(5);
            hasher.write_usize(map.len());
            for (key, item) in map {
                key.hash(hasher);
                hash_value(item, hasher);
            }
        }
    }
}
