//! Index-aware tree rewriting.
//!
//! A post-order walk over the pipeline spine. Each call whose target is
//! the root source is tested for substitution: the operation must have an
//! index counterpart, its lambda must match an eligible shape, and the
//! registry must resolve an index for the field under the call's comparer
//! rules. Every call gets a recorded decision; failure to substitute is a
//! routing outcome, never an error.

use std::sync::Arc;

use serde_json::Value;

use crate::expr::shape::{recognize, unquote, LambdaShape};
use crate::expr::{CallExpr, Expr, IndexLookupExpr, OpKind};
use crate::index::IndexRegistry;
use crate::record::{Record, ValueType};

use super::dispatch::{index_op_for, resolve_scan, ScanOp};
use super::errors::RewriteResult;

/// Why a call kept its default scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanReason {
    /// The call consumes a derived pipeline, not the root source.
    NotSourceTarget,
    /// The operation has no index counterpart.
    UnsupportedOperation,
    /// The lambda is not one of the index-eligible shapes.
    UnsupportedShape,
    /// An index exists for the field but not under the requested comparer.
    ComparerMismatch,
    /// No index covers the field.
    NoIndex,
    /// The constant key's type differs from the indexed key type.
    KeyTypeMismatch,
}

impl ScanReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanReason::NotSourceTarget => "target is a derived pipeline",
            ScanReason::UnsupportedOperation => "operation has no index form",
            ScanReason::UnsupportedShape => "unsupported lambda shape",
            ScanReason::ComparerMismatch => "comparer mismatch",
            ScanReason::NoIndex => "no index on field",
            ScanReason::KeyTypeMismatch => "key type mismatch",
        }
    }
}

/// How one call was routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Substituted by a lookup against the index in `slot`.
    IndexBound { slot: usize, path: String },
    /// Kept as a scan.
    Scan { reason: ScanReason },
}

/// One routing decision, in pipeline order (innermost call first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub op: OpKind,
    pub outcome: Outcome,
}

/// Rewrites a tree against one registry snapshot.
pub struct Rewriter<'a, T> {
    registry: &'a IndexRegistry<T>,
    decisions: Vec<Decision>,
}

impl<'a, T: Record> Rewriter<'a, T> {
    pub fn new(registry: &'a IndexRegistry<T>) -> Self {
        Self {
            registry,
            decisions: Vec::new(),
        }
    }

    /// Routing decisions recorded so far, innermost call first.
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn into_decisions(self) -> Vec<Decision> {
        self.decisions
    }

    /// Rewrites the pipeline, sharing every unaffected subtree.
    pub fn rewrite(&mut self, expr: &Arc<Expr>) -> RewriteResult<Arc<Expr>> {
        match expr.as_ref() {
            Expr::Call(call) => {
                let target = self.rewrite(&call.target)?;
                if let Some(lookup) = self.try_substitute(call, &target)? {
                    return Ok(Arc::new(Expr::IndexLookup(lookup)));
                }
                if Arc::ptr_eq(&target, &call.target) {
                    Ok(Arc::clone(expr))
                } else {
                    Ok(Arc::new(Expr::Call(CallExpr {
                        target,
                        op: call.op,
                        args: call.args.clone(),
                    })))
                }
            }
            _ => Ok(Arc::clone(expr)),
        }
    }

    fn decide_scan(&mut self, op: OpKind, reason: ScanReason) {
        self.decisions.push(Decision {
            op,
            outcome: Outcome::Scan { reason },
        });
    }

    /// Attempts substitution for one call whose target has already been
    /// rewritten. `None` means the call keeps its scan.
    fn try_substitute(
        &mut self,
        call: &CallExpr,
        target: &Arc<Expr>,
    ) -> RewriteResult<Option<IndexLookupExpr>> {
        if !matches!(target.as_ref(), Expr::Source) {
            self.decide_scan(call.op, ScanReason::NotSourceTarget);
            return Ok(None);
        }
        let Some(index_op) = index_op_for(call.op) else {
            self.decide_scan(call.op, ScanReason::UnsupportedOperation);
            return Ok(None);
        };

        let scan = resolve_scan(call)?;
        let (field, key, element, comparer) = match &scan {
            ScanOp::Filter { predicate }
            | ScanOp::First {
                predicate: Some(predicate),
            }
            | ScanOp::FirstOrDefault {
                predicate: Some(predicate),
            } => match recognize(predicate) {
                LambdaShape::FieldEquals { field, key } => (field, Some(key), None, None),
                _ => {
                    self.decide_scan(call.op, ScanReason::UnsupportedShape);
                    return Ok(None);
                }
            },
            ScanOp::GroupBy {
                key,
                element,
                comparer,
            } => match recognize(key) {
                LambdaShape::FieldKey { field } => {
                    (field, None, element.clone(), comparer.clone())
                }
                _ => {
                    self.decide_scan(call.op, ScanReason::UnsupportedShape);
                    return Ok(None);
                }
            },
            // Predicate-less first forms reduce nothing an index can answer.
            _ => {
                self.decide_scan(call.op, ScanReason::UnsupportedShape);
                return Ok(None);
            }
        };

        let Some((slot, index)) = self.registry.resolve_query(&field, comparer.as_ref()) else {
            let reason = if self.registry.has_path(&field) {
                ScanReason::ComparerMismatch
            } else {
                ScanReason::NoIndex
            };
            self.decide_scan(call.op, reason);
            return Ok(None);
        };

        // A constant key of the wrong type can never hit; keep the scan so
        // execution still returns the honest empty result.
        if let Some(key) = &key {
            if let Expr::Const(value) = unquote(key).as_ref() {
                if !key_type_compatible(index.key_type(), value) {
                    self.decide_scan(call.op, ScanReason::KeyTypeMismatch);
                    return Ok(None);
                }
            }
        }

        self.decisions.push(Decision {
            op: call.op,
            outcome: Outcome::IndexBound {
                slot,
                path: field.clone(),
            },
        });
        Ok(Some(IndexLookupExpr {
            slot,
            path: field,
            op: index_op,
            key,
            element,
            key_type: index.key_type(),
        }))
    }
}

/// Whether a constant key can possibly match the indexed key type.
///
/// A `Null` index key type means the type could not be determined at build
/// time (empty snapshot); every key is admitted then.
fn key_type_compatible(indexed: ValueType, key: &Value) -> bool {
    indexed == ValueType::Null || ValueType::of(key) == indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{field_eq, key_selector, LambdaExpr};
    use crate::index::{Comparer, Index};
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({ "city": "NYC", "n": 1 }),
            json!({ "city": "LA", "n": 2 }),
        ]
    }

    fn registry() -> IndexRegistry<Value> {
        let mut registry = IndexRegistry::new();
        registry.register(Index::build("city", Comparer::structural(), &rows()).unwrap());
        registry
    }

    fn filter_call(target: Arc<Expr>, lambda: LambdaExpr) -> Arc<Expr> {
        Arc::new(Expr::Call(CallExpr {
            target,
            op: OpKind::Filter,
            args: vec![Arc::new(Expr::Quote(Arc::new(Expr::Lambda(lambda))))],
        }))
    }

    #[test]
    fn test_filter_on_indexed_field_is_substituted() {
        let registry = registry();
        let mut rewriter = Rewriter::new(&registry);
        let tree = filter_call(Arc::new(Expr::Source), field_eq("city", "NYC"));

        let rewritten = rewriter.rewrite(&tree).unwrap();
        match rewritten.as_ref() {
            Expr::IndexLookup(lookup) => {
                assert_eq!(lookup.slot, 0);
                assert_eq!(lookup.path, "city");
                assert_eq!(lookup.op, crate::expr::IndexOp::LookupEqual);
            }
            other => panic!("expected index lookup, got {}", other.kind()),
        }
        assert_eq!(
            rewriter.decisions(),
            &[Decision {
                op: OpKind::Filter,
                outcome: Outcome::IndexBound {
                    slot: 0,
                    path: "city".into()
                },
            }]
        );
    }

    #[test]
    fn test_unindexed_field_keeps_scan_and_shares_tree() {
        let registry = registry();
        let mut rewriter = Rewriter::new(&registry);
        let tree = filter_call(Arc::new(Expr::Source), field_eq("country", "US"));

        let rewritten = rewriter.rewrite(&tree).unwrap();
        assert!(Arc::ptr_eq(&rewritten, &tree));
        assert_eq!(
            rewriter.decisions()[0].outcome,
            Outcome::Scan {
                reason: ScanReason::NoIndex
            }
        );
    }

    #[test]
    fn test_derived_target_is_not_substituted() {
        let registry = registry();
        let mut rewriter = Rewriter::new(&registry);
        // filter(city == NYC) then filter(city == LA): only the inner call
        // consumes the source.
        let inner = filter_call(Arc::new(Expr::Source), field_eq("city", "NYC"));
        let tree = filter_call(inner, field_eq("city", "LA"));

        let rewritten = rewriter.rewrite(&tree).unwrap();
        match rewritten.as_ref() {
            Expr::Call(call) => {
                assert!(matches!(call.target.as_ref(), Expr::IndexLookup(_)));
            }
            other => panic!("expected outer call, got {}", other.kind()),
        }
        assert_eq!(rewriter.decisions().len(), 2);
        assert_eq!(
            rewriter.decisions()[1].outcome,
            Outcome::Scan {
                reason: ScanReason::NotSourceTarget
            }
        );
    }

    #[test]
    fn test_explicit_comparer_mismatch_keeps_scan() {
        let registry = registry();
        let mut rewriter = Rewriter::new(&registry);
        let tree = Arc::new(Expr::Call(CallExpr {
            target: Arc::new(Expr::Source),
            op: OpKind::GroupBy,
            args: vec![
                Arc::new(Expr::Quote(Arc::new(Expr::Lambda(key_selector("city"))))),
                Arc::new(Expr::ComparerRef(Comparer::case_insensitive())),
            ],
        }));

        let rewritten = rewriter.rewrite(&tree).unwrap();
        assert!(Arc::ptr_eq(&rewritten, &tree));
        assert_eq!(
            rewriter.decisions()[0].outcome,
            Outcome::Scan {
                reason: ScanReason::ComparerMismatch
            }
        );
    }

    #[test]
    fn test_group_by_is_substituted() {
        let registry = registry();
        let mut rewriter = Rewriter::new(&registry);
        let tree = Arc::new(Expr::Call(CallExpr {
            target: Arc::new(Expr::Source),
            op: OpKind::GroupBy,
            args: vec![Arc::new(Expr::Quote(Arc::new(Expr::Lambda(key_selector(
                "city",
            )))))],
        }));

        let rewritten = rewriter.rewrite(&tree).unwrap();
        match rewritten.as_ref() {
            Expr::IndexLookup(lookup) => {
                assert_eq!(lookup.op, crate::expr::IndexOp::Groups);
                assert!(lookup.key.is_none());
            }
            other => panic!("expected index lookup, got {}", other.kind()),
        }
    }

    #[test]
    fn test_wrong_key_type_keeps_scan() {
        let registry = registry();
        let mut rewriter = Rewriter::new(&registry);
        let tree = filter_call(Arc::new(Expr::Source), field_eq("city", 42));

        let rewritten = rewriter.rewrite(&tree).unwrap();
        assert!(Arc::ptr_eq(&rewritten, &tree));
        assert_eq!(
            rewriter.decisions()[0].outcome,
            Outcome::Scan {
                reason: ScanReason::KeyTypeMismatch
            }
        );
    }

    #[test]
    fn test_predicate_less_first_keeps_scan() {
        let registry = registry();
        let mut rewriter = Rewriter::new(&registry);
        let tree = Arc::new(Expr::Call(CallExpr {
            target: Arc::new(Expr::Source),
            op: OpKind::First,
            args: vec![],
        }));

        let rewritten = rewriter.rewrite(&tree).unwrap();
        assert!(Arc::ptr_eq(&rewritten, &tree));
        assert_eq!(
            rewriter.decisions()[0].outcome,
            Outcome::Scan {
                reason: ScanReason::UnsupportedShape
            }
        );
    }
}
