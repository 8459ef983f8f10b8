//! Expression construction helpers.
//!
//! Queries are composed from shared `Arc<Expr>` nodes; these helpers keep
//! call sites close to the declarative surface they stand for, e.g.
//! `param("o").member("customer_id").eq(lit("GAU1"))`.

use std::sync::Arc;

use serde_json::Value;

use super::node::{Expr, LambdaExpr};

/// Lambda parameter reference.
pub fn param(name: impl Into<String>) -> Arc<Expr> {
    Arc::new(Expr::Param(name.into()))
}

/// Constant value.
pub fn lit(value: impl Into<Value>) -> Arc<Expr> {
    Arc::new(Expr::Const(value.into()))
}

/// Placeholder for an externally supplied argument.
pub fn external(slot: usize) -> Arc<Expr> {
    Arc::new(Expr::External(slot))
}

/// Combinators over shared expression nodes.
pub trait ExprExt {
    /// Field access: `self.field`.
    fn member(&self, field: impl Into<String>) -> Arc<Expr>;
    /// Equality test: `self == other`.
    fn eq(&self, other: Arc<Expr>) -> Arc<Expr>;
    /// Conjunction: `self && other`.
    fn and(&self, other: Arc<Expr>) -> Arc<Expr>;
    /// Disjunction: `self || other`.
    fn or(&self, other: Arc<Expr>) -> Arc<Expr>;
}

impl ExprExt for Arc<Expr> {
    fn member(&self, field: impl Into<String>) -> Arc<Expr> {
        Arc::new(Expr::Member {
            target: Arc::clone(self),
            field: field.into(),
        })
    }

    fn eq(&self, other: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::Eq {
            left: Arc::clone(self),
            right: other,
        })
    }

    fn and(&self, other: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::And {
            left: Arc::clone(self),
            right: other,
        })
    }

    fn or(&self, other: Arc<Expr>) -> Arc<Expr> {
        Arc::new(Expr::Or {
            left: Arc::clone(self),
            right: other,
        })
    }
}

/// Predicate `row -> row.field == value`.
pub fn field_eq(field: &str, value: impl Into<Value>) -> LambdaExpr {
    field_eq_key(field, lit(value))
}

/// Predicate `row -> row.field == key`, for an arbitrary key expression
/// (constant or external placeholder).
pub fn field_eq_key(field: &str, key: Arc<Expr>) -> LambdaExpr {
    LambdaExpr::new("row", param("row").member(field).eq(key))
}

/// Key selector `row -> row.field`.
pub fn key_selector(field: &str) -> LambdaExpr {
    LambdaExpr::new("row", param("row").member(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_eq_shape() {
        let lambda = field_eq("city", "NYC");
        assert_eq!(lambda.param, "row");
        match lambda.body.as_ref() {
            Expr::Eq { left, right } => {
                assert!(matches!(left.as_ref(), Expr::Member { field, .. } if field == "city"));
                assert!(matches!(right.as_ref(), Expr::Const(v) if *v == json!("NYC")));
            }
            other => panic!("expected eq node, got {}", other.kind()),
        }
    }

    #[test]
    fn test_key_selector_shape() {
        let lambda = key_selector("city");
        assert!(matches!(
            lambda.body.as_ref(),
            Expr::Member { field, .. } if field == "city"
        ));
    }

    #[test]
    fn test_combinators_share_subtrees() {
        let base = param("row").member("city");
        let pred = base.eq(lit("NYC")).and(base.eq(lit("LA")));
        match pred.as_ref() {
            Expr::And { left, right } => {
                let (Expr::Eq { left: l, .. }, Expr::Eq { left: r, .. }) =
                    (left.as_ref(), right.as_ref())
                else {
                    panic!("expected eq on both sides");
                };
                assert!(Arc::ptr_eq(l, r));
            }
            other => panic!("expected and node, got {}", other.kind()),
        }
    }
}
