//! The indexed query surface.
//!
//! An [`IndexedQuery`] pairs an immutable source snapshot with a registry
//! of secondary indexes, both shared across every query derived from the
//! same root. Composition only grows the tree; compilation happens once
//! per derived query, on first execution, and the outcome (success or
//! failure) is cached.

use std::sync::{Arc, OnceLock, RwLock};

use crate::exec::QueryItem;
use crate::expr::{CallExpr, Expr, LambdaExpr, OpKind};
use crate::index::{Comparer, Index, IndexRegistry, IndexStats};
use crate::record::Record;
use crate::rewrite::{Decision, ExplainPlan};

use super::compiler::{CompiledQuery, PreparedQuery};
use super::errors::{QueryError, QueryResult};

type Compiled<T> = Result<(CompiledQuery<T>, Vec<Decision>), QueryError>;

/// A queryable snapshot with index-aware execution.
///
/// Derived queries share the root's source and registry; an index
/// registered through any of them is visible to all. Callers serialize
/// registration against execution (single-writer discipline).
pub struct IndexedQuery<T: Record> {
    source: Arc<Vec<T>>,
    registry: Arc<RwLock<IndexRegistry<T>>>,
    expr: Arc<Expr>,
    compiled: OnceLock<Compiled<T>>,
}

impl<T: Record> IndexedQuery<T> {
    /// Wraps a snapshot with an empty registry.
    pub fn new(rows: impl Into<Vec<T>>) -> Self {
        Self {
            source: Arc::new(rows.into()),
            registry: Arc::new(RwLock::new(IndexRegistry::new())),
            expr: Arc::new(Expr::Source),
            compiled: OnceLock::new(),
        }
    }

    /// Registers an index on `path` under the canonical default comparer.
    pub fn add_indexer(&self, path: &str) -> QueryResult<&Self> {
        self.add_indexer_with(path, Comparer::structural())
    }

    /// Registers an index on `path` built with `comparer`.
    ///
    /// The index is visible to every query sharing this root that
    /// compiles afterwards; already-compiled queries keep their plan.
    pub fn add_indexer_with(&self, path: &str, comparer: Comparer) -> QueryResult<&Self> {
        let index = Index::build(path, comparer, &self.source)?;
        let mut registry = self
            .registry
            .write()
            .map_err(|_| QueryError::RegistryPoisoned)?;
        registry.register(index);
        Ok(self)
    }

    /// Derives a query whose tree appends one call to this query's tree.
    fn call(&self, op: OpKind, args: Vec<Arc<Expr>>) -> Self {
        Self {
            source: Arc::clone(&self.source),
            registry: Arc::clone(&self.registry),
            expr: Arc::new(Expr::Call(CallExpr {
                target: Arc::clone(&self.expr),
                op,
                args,
            })),
            compiled: OnceLock::new(),
        }
    }

    /// Keeps rows matching `predicate`.
    pub fn filter(&self, predicate: LambdaExpr) -> Self {
        self.call(OpKind::Filter, vec![quote(predicate)])
    }

    /// Projects each row through `selector`.
    pub fn select(&self, selector: LambdaExpr) -> Self {
        self.call(OpKind::Select, vec![quote(selector)])
    }

    /// Groups rows by `key` under the canonical default comparer.
    pub fn group_by(&self, key: LambdaExpr) -> Self {
        self.call(OpKind::GroupBy, vec![quote(key)])
    }

    /// Groups rows by `key`, optionally projecting members through
    /// `element` and comparing keys with `comparer`.
    pub fn group_by_with(
        &self,
        key: LambdaExpr,
        element: Option<LambdaExpr>,
        comparer: Option<Comparer>,
    ) -> Self {
        let mut args = vec![quote(key)];
        if let Some(element) = element {
            args.push(quote(element));
        }
        if let Some(comparer) = comparer {
            args.push(Arc::new(Expr::ComparerRef(comparer)));
        }
        self.call(OpKind::GroupBy, args)
    }

    /// Compiles on first use and caches the outcome, errors included.
    fn compiled(&self) -> &Compiled<T> {
        self.compiled.get_or_init(|| {
            CompiledQuery::compile(
                Arc::clone(&self.expr),
                Arc::clone(&self.source),
                Arc::clone(&self.registry),
            )
        })
    }

    /// Compiles (first use only) and executes the pipeline.
    pub fn execute(&self) -> QueryResult<Vec<QueryItem<T>>> {
        match self.compiled() {
            Ok((compiled, _)) => compiled.run(&[]),
            Err(err) => Err(err.clone()),
        }
    }

    /// First row matching `predicate`; [`QueryError::EmptySequence`] when
    /// none does.
    pub fn first(&self, predicate: Option<LambdaExpr>) -> QueryResult<QueryItem<T>> {
        let args = predicate.map(quote).into_iter().collect();
        let items = self.call(OpKind::First, args).execute()?;
        items.into_iter().next().ok_or(QueryError::EmptySequence)
    }

    /// First row matching `predicate`, or `None`.
    pub fn first_or_default(
        &self,
        predicate: Option<LambdaExpr>,
    ) -> QueryResult<Option<QueryItem<T>>> {
        let args = predicate.map(quote).into_iter().collect();
        let items = self.call(OpKind::FirstOrDefault, args).execute()?;
        Ok(items.into_iter().next())
    }

    /// Compiles a parameterized query once, for repeated execution with
    /// different arguments.
    ///
    /// `factory` receives `arity` placeholder expressions and composes
    /// the query with them in key positions.
    pub fn prepare<F>(&self, arity: usize, factory: F) -> QueryResult<PreparedQuery<T>>
    where
        F: FnOnce(&[Arc<Expr>]) -> Self,
    {
        let placeholders: Vec<Arc<Expr>> =
            (0..arity).map(|slot| Arc::new(Expr::External(slot))).collect();
        let query = factory(&placeholders);
        let (compiled, _) = CompiledQuery::compile(
            Arc::clone(&query.expr),
            Arc::clone(&query.source),
            Arc::clone(&query.registry),
        )?;
        Ok(PreparedQuery::new(compiled, arity))
    }

    /// Routing explain output for this query's pipeline.
    pub fn explain(&self) -> ExplainPlan {
        match self.compiled() {
            Ok((_, decisions)) => ExplainPlan::from_decisions(decisions),
            Err(err) => match err {
                QueryError::Rewrite(rewrite) => ExplainPlan::from_error(rewrite),
                other => ExplainPlan {
                    accepted: false,
                    steps: Vec::new(),
                    rejection_reason: Some(other.to_string()),
                },
            },
        }
    }

    /// Per-index diagnostics in registration order.
    pub fn index_stats(&self) -> QueryResult<Vec<IndexStats>> {
        let registry = self
            .registry
            .read()
            .map_err(|_| QueryError::RegistryPoisoned)?;
        Ok(registry.stats())
    }

    /// The snapshot this query reads.
    pub fn source(&self) -> &[T] {
        &self.source
    }

    /// The pipeline tree composed so far.
    pub fn expr(&self) -> &Arc<Expr> {
        &self.expr
    }
}

impl<T: Record> Clone for IndexedQuery<T> {
    /// Shares source, registry, and tree; the clone compiles on its own
    /// first use.
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            registry: Arc::clone(&self.registry),
            expr: Arc::clone(&self.expr),
            compiled: OnceLock::new(),
        }
    }
}

impl<T: Record + std::fmt::Debug> std::fmt::Debug for IndexedQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedQuery")
            .field("rows", &self.source.len())
            .field("expr", &self.expr.kind())
            .finish()
    }
}

fn quote(lambda: LambdaExpr) -> Arc<Expr> {
    Arc::new(Expr::Quote(Arc::new(Expr::Lambda(lambda))))
}

/// Wraps `rows` and registers a default-comparer index for each path in
/// `indexers`.
pub fn as_indexed_queryable<T: Record>(
    rows: impl Into<Vec<T>>,
    indexers: &[&str],
) -> QueryResult<IndexedQuery<T>> {
    let query = IndexedQuery::new(rows);
    for path in indexers {
        query.add_indexer(path)?;
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field_eq;
    use serde_json::{json, Value};

    fn rows() -> Vec<Value> {
        vec![
            json!({ "city": "NYC", "n": 1 }),
            json!({ "city": "LA", "n": 2 }),
        ]
    }

    #[test]
    fn test_compile_outcome_is_cached() {
        let query = as_indexed_queryable(rows(), &["city"]).unwrap();
        let filtered = query.filter(field_eq("city", "NYC"));

        assert_eq!(filtered.execute().unwrap().len(), 1);
        // Index registered after compilation does not change the plan.
        query.add_indexer("n").unwrap();
        let explain = filtered.explain();
        assert_eq!(explain.steps.len(), 1);
        assert_eq!(explain.steps[0].route, "INDEX");
    }

    #[test]
    fn test_registration_is_visible_across_derivations() {
        let query = IndexedQuery::new(rows());
        let filtered = query.filter(field_eq("city", "NYC"));
        // Registered through the root, after deriving but before the
        // derived query compiles.
        query.add_indexer("city").unwrap();

        filtered.execute().unwrap();
        assert_eq!(filtered.explain().steps[0].route, "INDEX");
    }

    #[test]
    fn test_empty_path_registration_fails() {
        let query = IndexedQuery::new(rows());
        assert!(matches!(
            query.add_indexer(""),
            Err(QueryError::Index(crate::index::IndexError::EmptyPath))
        ));
    }
}
