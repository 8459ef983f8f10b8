//! Closed dispatch table from call nodes to executable scan operations.
//!
//! Every operation the tree language admits maps here to exactly one scan
//! form and, where one exists, one index counterpart. The table is the
//! single authority both the rewriter and the executor consult; a call that
//! does not resolve is a fatal `NoMatchingOperation`, caught at compile
//! time rather than during execution.

use std::sync::Arc;

use crate::expr::shape::unquote;
use crate::expr::{CallExpr, Expr, IndexOp, LambdaExpr, OpKind};
use crate::index::Comparer;

use super::errors::{RewriteError, RewriteResult};

/// Executable form of one pipeline call.
#[derive(Debug, Clone)]
pub enum ScanOp {
    Filter {
        predicate: LambdaExpr,
    },
    Select {
        selector: LambdaExpr,
    },
    GroupBy {
        key: LambdaExpr,
        element: Option<LambdaExpr>,
        comparer: Option<Comparer>,
    },
    First {
        predicate: Option<LambdaExpr>,
    },
    FirstOrDefault {
        predicate: Option<LambdaExpr>,
    },
}

/// Index counterpart of an operation, when one exists.
///
/// `select` has no index form; projections always run as scans over
/// whatever their target produced.
pub fn index_op_for(op: OpKind) -> Option<IndexOp> {
    match op {
        OpKind::Filter => Some(IndexOp::LookupEqual),
        OpKind::GroupBy => Some(IndexOp::Groups),
        OpKind::First => Some(IndexOp::First),
        OpKind::FirstOrDefault => Some(IndexOp::FirstOrDefault),
        OpKind::Select => None,
    }
}

/// Splits a call's argument list into its lambda arguments and the
/// optional trailing comparer reference.
pub fn split_comparer(args: &[Arc<Expr>]) -> (&[Arc<Expr>], Option<Comparer>) {
    match args.split_last() {
        Some((last, rest)) => match unquote(last).as_ref() {
            Expr::ComparerRef(comparer) => (rest, Some(comparer.clone())),
            _ => (args, None),
        },
        None => (args, None),
    }
}

fn as_lambda(arg: &Arc<Expr>) -> Option<LambdaExpr> {
    match unquote(arg).as_ref() {
        Expr::Lambda(lambda) => Some(lambda.clone()),
        _ => None,
    }
}

fn lambda_arg(call: &CallExpr, args: &[Arc<Expr>], position: usize) -> RewriteResult<LambdaExpr> {
    let arg = args.get(position).ok_or_else(|| {
        RewriteError::no_match(
            call.op.as_str(),
            format!("missing lambda argument at position {}", position),
        )
    })?;
    as_lambda(arg).ok_or_else(|| {
        RewriteError::no_match(
            call.op.as_str(),
            format!(
                "argument at position {} is not a lambda ({})",
                position,
                unquote(arg).kind()
            ),
        )
    })
}

/// Resolves a call node to its executable scan form.
///
/// The arity rules mirror the declarative surface: `filter` and `select`
/// take exactly one lambda; `group_by` takes a key selector, an optional
/// element selector, and an optional comparer; `first` and
/// `first_or_default` take at most one predicate.
pub fn resolve_scan(call: &CallExpr) -> RewriteResult<ScanOp> {
    let (lambdas, comparer) = split_comparer(&call.args);

    let reject_arity = |max: usize| -> RewriteResult<()> {
        if lambdas.len() > max {
            return Err(RewriteError::no_match(
                call.op.as_str(),
                format!("expected at most {} lambda argument(s), got {}", max, lambdas.len()),
            ));
        }
        Ok(())
    };

    match call.op {
        OpKind::Filter => {
            reject_arity(1)?;
            if comparer.is_some() {
                return Err(RewriteError::no_match(
                    call.op.as_str(),
                    "filter does not take a comparer",
                ));
            }
            Ok(ScanOp::Filter {
                predicate: lambda_arg(call, lambdas, 0)?,
            })
        }
        OpKind::Select => {
            reject_arity(1)?;
            if comparer.is_some() {
                return Err(RewriteError::no_match(
                    call.op.as_str(),
                    "select does not take a comparer",
                ));
            }
            Ok(ScanOp::Select {
                selector: lambda_arg(call, lambdas, 0)?,
            })
        }
        OpKind::GroupBy => {
            reject_arity(2)?;
            let key = lambda_arg(call, lambdas, 0)?;
            let element = if lambdas.len() > 1 {
                Some(lambda_arg(call, lambdas, 1)?)
            } else {
                None
            };
            Ok(ScanOp::GroupBy {
                key,
                element,
                comparer,
            })
        }
        OpKind::First | OpKind::FirstOrDefault => {
            reject_arity(1)?;
            if comparer.is_some() {
                return Err(RewriteError::no_match(
                    call.op.as_str(),
                    "first forms do not take a comparer",
                ));
            }
            let predicate = if lambdas.is_empty() {
                None
            } else {
                Some(lambda_arg(call, lambdas, 0)?)
            };
            match call.op {
                OpKind::First => Ok(ScanOp::First { predicate }),
                _ => Ok(ScanOp::FirstOrDefault { predicate }),
            }
        }
    }
}

/// Validates a rewritten tree before it is handed to the executor.
///
/// Walks the pipeline spine and every embedded lambda, confirming each
/// call still resolves through the dispatch table and no scalar position
/// holds an unbound parameter or a bare pipeline node.
pub fn validate(expr: &Arc<Expr>) -> RewriteResult<()> {
    match expr.as_ref() {
        Expr::Source => Ok(()),
        Expr::Call(call) => {
            validate(&call.target)?;
            let scan = resolve_scan(call)?;
            match &scan {
                ScanOp::Filter { predicate } | ScanOp::Select { selector: predicate } => {
                    validate_scalar(&predicate.body, &predicate.param)
                }
                ScanOp::GroupBy { key, element, .. } => {
                    validate_scalar(&key.body, &key.param)?;
                    if let Some(element) = element {
                        validate_scalar(&element.body, &element.param)?;
                    }
                    Ok(())
                }
                ScanOp::First { predicate } | ScanOp::FirstOrDefault { predicate } => {
                    match predicate {
                        Some(predicate) => validate_scalar(&predicate.body, &predicate.param),
                        None => Ok(()),
                    }
                }
            }
        }
        Expr::IndexLookup(lookup) => {
            if let Some(key) = &lookup.key {
                match unquote(key).as_ref() {
                    Expr::Const(_) | Expr::External(_) => {}
                    other => {
                        return Err(RewriteError::no_match(
                            lookup.op.as_str(),
                            format!("index lookup key must be constant or external, got {}", other.kind()),
                        ))
                    }
                }
            }
            if let Some(element) = &lookup.element {
                validate_scalar(&element.body, &element.param)?;
            }
            Ok(())
        }
        other => Err(RewriteError::no_match(
            "pipeline",
            format!("unexpected {} node on the pipeline spine", other.kind()),
        )),
    }
}

/// Validates a lambda body: the lambda's parameter may appear only as the
/// target of a field access, every parameter reference must name the
/// enclosing lambda's own parameter, and pipeline-only nodes must not
/// appear in scalar positions.
fn validate_scalar(expr: &Arc<Expr>, param: &str) -> RewriteResult<()> {
    match expr.as_ref() {
        Expr::Param(name) if name == param => Err(RewriteError::no_match(
            "lambda",
            format!("parameter '{}' used outside a field access", name),
        )),
        Expr::Param(name) => Err(RewriteError::no_match(
            "lambda",
            format!("unbound parameter '{}'", name),
        )),
        Expr::Member { target, .. } => match target.as_ref() {
            Expr::Param(name) if name == param => Ok(()),
            Expr::Param(name) => Err(RewriteError::no_match(
                "lambda",
                format!("unbound parameter '{}'", name),
            )),
            _ => validate_scalar(target, param),
        },
        Expr::Eq { left, right } | Expr::And { left, right } | Expr::Or { left, right } => {
            validate_scalar(left, param)?;
            validate_scalar(right, param)
        }
        Expr::Quote(inner) => validate_scalar(inner, param),
        Expr::Const(_) | Expr::External(_) => Ok(()),
        other => Err(RewriteError::no_match(
            "lambda",
            format!("unexpected {} node inside a lambda body", other.kind()),
        )),
    }
}
