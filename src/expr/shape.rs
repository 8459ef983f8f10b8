//! Shape recognition for predicates and key selectors.
//!
//! The rewriter substitutes an index lookup only for two exact shapes:
//! `p -> p.field == key` (filter, first, first-or-default) and
//! `p -> p.field` (group-by). Anything else (conjunctions, computed
//! expressions, reversed operands) is an unsupported shape: not an error,
//! a routing decision that keeps the default scan.

use std::sync::Arc;

use super::node::{Expr, LambdaExpr};

/// Outcome of recognizing a lambda body.
#[derive(Debug, Clone)]
pub enum LambdaShape {
    /// `p -> p.field == key`; the key side is a constant or an external
    /// placeholder.
    FieldEquals { field: String, key: Arc<Expr> },
    /// `p -> p.field`
    FieldKey { field: String },
    /// Anything else; routed to the default scan.
    Unsupported,
}

/// Strips `Quote` wrappers.
pub fn unquote(expr: &Arc<Expr>) -> &Arc<Expr> {
    let mut current = expr;
    while let Expr::Quote(inner) = current.as_ref() {
        current = inner;
    }
    current
}

/// Recognizes the two index-eligible shapes.
pub fn recognize(lambda: &LambdaExpr) -> LambdaShape {
    match unquote(&lambda.body).as_ref() {
        Expr::Eq { left, right } => {
            if let Expr::Member { target, field } = left.as_ref() {
                if is_param(target, &lambda.param) && is_key_side(right) {
                    return LambdaShape::FieldEquals {
                        field: field.clone(),
                        key: Arc::clone(right),
                    };
                }
            }
            LambdaShape::Unsupported
        }
        Expr::Member { target, field } if is_param(target, &lambda.param) => {
            LambdaShape::FieldKey {
                field: field.clone(),
            }
        }
        _ => LambdaShape::Unsupported,
    }
}

fn is_param(expr: &Arc<Expr>, name: &str) -> bool {
    matches!(expr.as_ref(), Expr::Param(p) if p == name)
}

fn is_key_side(expr: &Arc<Expr>) -> bool {
    matches!(expr.as_ref(), Expr::Const(_) | Expr::External(_))
}
