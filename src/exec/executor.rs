//! Tree execution.
//!
//! Interprets a (usually rewritten) pipeline tree against a source
//! snapshot and registry. Scan calls resolve through the same dispatch
//! table the rewriter uses; index lookup nodes read from the registry and
//! move the hit counters. Execution materializes each stage as a vector,
//! matching the snapshot semantics of the indexes themselves.

use std::sync::Arc;

use serde_json::Value;

use crate::expr::shape::unquote;
use crate::expr::{Expr, IndexLookupExpr, IndexOp, LambdaExpr};
use crate::index::{Index, IndexRegistry, Lookup};
use crate::query::{QueryError, QueryResult};
use crate::record::Record;
use crate::rewrite::{resolve_scan, RewriteError, ScanOp};

use super::item::{GroupItem, QueryItem};

/// Everything one execution reads: the source snapshot, the registry the
/// tree was rewritten against, and the external argument values of a
/// prepared query.
pub struct ExecContext<'a, T> {
    pub source: &'a [T],
    pub registry: &'a IndexRegistry<T>,
    pub externals: &'a [Value],
}

impl<'a, T> ExecContext<'a, T> {
    fn external(&self, slot: usize) -> QueryResult<Value> {
        self.externals
            .get(slot)
            .cloned()
            .ok_or(QueryError::UnknownExternal { slot })
    }

    fn index(&self, slot: usize) -> QueryResult<&'a Arc<Index<T>>> {
        self.registry
            .get(slot)
            .ok_or(QueryError::UnknownIndexSlot { slot })
    }
}

/// Executes a pipeline tree to a materialized item vector.
pub fn execute<T: Record>(
    expr: &Arc<Expr>,
    ctx: &ExecContext<'_, T>,
) -> QueryResult<Vec<QueryItem<T>>> {
    match expr.as_ref() {
        Expr::Source => Ok(ctx
            .source
            .iter()
            .cloned()
            .map(QueryItem::Record)
            .collect()),
        Expr::Call(call) => {
            let input = execute(&call.target, ctx)?;
            exec_scan(resolve_scan(call)?, input, ctx)
        }
        Expr::IndexLookup(lookup) => exec_index_lookup(lookup, ctx),
        other => Err(RewriteError::no_match(
            "pipeline",
            format!("unexpected {} node on the pipeline spine", other.kind()),
        )
        .into()),
    }
}

fn exec_scan<T: Record>(
    scan: ScanOp,
    input: Vec<QueryItem<T>>,
    ctx: &ExecContext<'_, T>,
) -> QueryResult<Vec<QueryItem<T>>> {
    match scan {
        ScanOp::Filter { predicate } => {
            let mut kept = Vec::new();
            for item in input {
                if eval_predicate(&predicate, &item, ctx)? {
                    kept.push(item);
                }
            }
            Ok(kept)
        }
        ScanOp::Select { selector } => input
            .into_iter()
            .map(|item| {
                let value = eval_lambda(&selector, &item, ctx)?;
                Ok(QueryItem::Value(value))
            })
            .collect(),
        ScanOp::GroupBy {
            key,
            element,
            comparer,
        } => {
            let mut pairs = Vec::with_capacity(input.len());
            for item in input {
                let group_key = eval_lambda(&key, &item, ctx)?;
                let member = match &element {
                    Some(element) => QueryItem::Value(eval_lambda(element, &item, ctx)?),
                    None => item,
                };
                pairs.push((group_key, member));
            }
            let lookup = Lookup::build(
                pairs,
                |(key, _)| key.clone(),
                comparer.unwrap_or_default(),
            );
            Ok(lookup
                .groups()
                .iter()
                .map(|group| {
                    QueryItem::Group(GroupItem {
                        key: group.key().clone(),
                        items: group.rows().iter().map(|(_, item)| item.clone()).collect(),
                    })
                })
                .collect())
        }
        ScanOp::First { predicate } => {
            let first = take_first(input, predicate.as_ref(), ctx)?;
            match first {
                Some(item) => Ok(vec![item]),
                None => Err(QueryError::EmptySequence),
            }
        }
        ScanOp::FirstOrDefault { predicate } => {
            let first = take_first(input, predicate.as_ref(), ctx)?;
            Ok(first.into_iter().collect())
        }
    }
}

fn take_first<T: Record>(
    input: Vec<QueryItem<T>>,
    predicate: Option<&LambdaExpr>,
    ctx: &ExecContext<'_, T>,
) -> QueryResult<Option<QueryItem<T>>> {
    for item in input {
        let keep = match predicate {
            Some(predicate) => eval_predicate(predicate, &item, ctx)?,
            None => true,
        };
        if keep {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

fn exec_index_lookup<T: Record>(
    lookup: &IndexLookupExpr,
    ctx: &ExecContext<'_, T>,
) -> QueryResult<Vec<QueryItem<T>>> {
    let index = ctx.index(lookup.slot)?;
    match lookup.op {
        IndexOp::LookupEqual => {
            let key = key_value(lookup, ctx)?;
            Ok(index
                .lookup_equal(&key)
                .iter()
                .cloned()
                .map(QueryItem::Record)
                .collect())
        }
        IndexOp::Groups => index
            .lookup_groups()
            .iter()
            .map(|group| {
                let items = match &lookup.element {
                    Some(element) => group
                        .rows()
                        .iter()
                        .map(|row| {
                            let item = QueryItem::Record(row.clone());
                            Ok(QueryItem::Value(eval_lambda(element, &item, ctx)?))
                        })
                        .collect::<QueryResult<Vec<_>>>()?,
                    None => group
                        .rows()
                        .iter()
                        .cloned()
                        .map(QueryItem::Record)
                        .collect(),
                };
                Ok(QueryItem::Group(GroupItem {
                    key: group.key().clone(),
                    items,
                }))
            })
            .collect(),
        IndexOp::First => {
            let key = key_value(lookup, ctx)?;
            let record = index.first(&key)?;
            Ok(vec![QueryItem::Record(record.clone())])
        }
        IndexOp::FirstOrDefault => {
            let key = key_value(lookup, ctx)?;
            Ok(index
                .first_or_default(&key)
                .cloned()
                .map(QueryItem::Record)
                .into_iter()
                .collect())
        }
    }
}

/// Resolves an index lookup's key expression to a concrete value.
fn key_value<T>(lookup: &IndexLookupExpr, ctx: &ExecContext<'_, T>) -> QueryResult<Value> {
    let key = lookup.key.as_ref().ok_or_else(|| {
        RewriteError::no_match(lookup.op.as_str(), "index lookup without a key expression")
    })?;
    match unquote(key).as_ref() {
        Expr::Const(value) => Ok(value.clone()),
        Expr::External(slot) => ctx.external(*slot),
        other => Err(RewriteError::no_match(
            lookup.op.as_str(),
            format!("index lookup key must be constant or external, got {}", other.kind()),
        )
        .into()),
    }
}

fn eval_predicate<T: Record>(
    predicate: &LambdaExpr,
    item: &QueryItem<T>,
    ctx: &ExecContext<'_, T>,
) -> QueryResult<bool> {
    Ok(eval_lambda(predicate, item, ctx)? == Value::Bool(true))
}

/// Evaluates a lambda body with `item` bound to the lambda's parameter.
fn eval_lambda<T: Record>(
    lambda: &LambdaExpr,
    item: &QueryItem<T>,
    ctx: &ExecContext<'_, T>,
) -> QueryResult<Value> {
    eval_scalar(&lambda.body, &lambda.param, item, ctx)
}

fn eval_scalar<T: Record>(
    expr: &Arc<Expr>,
    param: &str,
    item: &QueryItem<T>,
    ctx: &ExecContext<'_, T>,
) -> QueryResult<Value> {
    match unquote(expr).as_ref() {
        Expr::Const(value) => Ok(value.clone()),
        Expr::External(slot) => ctx.external(*slot),
        Expr::Member { target, field } => match target.as_ref() {
            Expr::Param(name) if name == param => item_field(item, field),
            _ => {
                let value = eval_scalar(target, param, item, ctx)?;
                Ok(value.field(field))
            }
        },
        // Equality in scalar position is structural; comparers apply to
        // index and grouping keys only.
        Expr::Eq { left, right } => Ok(Value::Bool(
            eval_scalar(left, param, item, ctx)? == eval_scalar(right, param, item, ctx)?,
        )),
        Expr::And { left, right } => Ok(Value::Bool(
            eval_scalar(left, param, item, ctx)? == Value::Bool(true)
                && eval_scalar(right, param, item, ctx)? == Value::Bool(true),
        )),
        Expr::Or { left, right } => Ok(Value::Bool(
            eval_scalar(left, param, item, ctx)? == Value::Bool(true)
                || eval_scalar(right, param, item, ctx)? == Value::Bool(true),
        )),
        other => Err(RewriteError::no_match(
            "lambda",
            format!("unexpected {} node inside a lambda body", other.kind()),
        )
        .into()),
    }
}

/// Field extraction from one item.
fn item_field<T: Record>(item: &QueryItem<T>, field: &str) -> QueryResult<Value> {
    match item {
        QueryItem::Record(record) => Ok(record.field(field)),
        QueryItem::Value(value) => Ok(value.field(field)),
        QueryItem::Group(_) => Err(RewriteError::no_match(
            "lambda",
            format!("field access '{}' on a group item", field),
        )
        .into()),
    }
}
