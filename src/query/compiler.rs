//! Compilation of pipeline trees into runnable queries.
//!
//! Compiling rewrites against one registry snapshot and validates the
//! result; it never reads the source and never moves a hit counter.
//! Running re-acquires the registry read lock so lookups resolve against
//! live indexes.

use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::exec::{execute, ExecContext, QueryItem};
use crate::expr::Expr;
use crate::index::IndexRegistry;
use crate::record::Record;
use crate::rewrite::{validate, Decision, Rewriter};

use super::errors::{QueryError, QueryResult};

/// A rewritten, validated tree bound to its source snapshot and registry.
#[derive(Debug, Clone)]
pub struct CompiledQuery<T> {
    tree: Arc<Expr>,
    source: Arc<Vec<T>>,
    registry: Arc<RwLock<IndexRegistry<T>>>,
}

impl<T: Record> CompiledQuery<T> {
    /// Rewrites and validates `tree` against the registry's current
    /// contents. Pure: no execution, no counter movement.
    pub fn compile(
        tree: Arc<Expr>,
        source: Arc<Vec<T>>,
        registry: Arc<RwLock<IndexRegistry<T>>>,
    ) -> QueryResult<(Self, Vec<Decision>)> {
        let rewritten;
        let decisions;
        {
            let guard = registry.read().map_err(|_| QueryError::RegistryPoisoned)?;
            let mut rewriter = Rewriter::new(&guard);
            rewritten = rewriter.rewrite(&tree)?;
            validate(&rewritten)?;
            decisions = rewriter.into_decisions();
        }
        Ok((
            Self {
                tree: rewritten,
                source,
                registry,
            },
            decisions,
        ))
    }

    /// The rewritten tree.
    pub fn tree(&self) -> &Arc<Expr> {
        &self.tree
    }

    /// Executes against the bound snapshot, with `externals` filling any
    /// placeholder slots.
    pub fn run(&self, externals: &[Value]) -> QueryResult<Vec<QueryItem<T>>> {
        let guard = self
            .registry
            .read()
            .map_err(|_| QueryError::RegistryPoisoned)?;
        let ctx = ExecContext {
            source: self.source.as_slice(),
            registry: &guard,
            externals,
        };
        execute(&self.tree, &ctx)
    }
}

/// A compiled query with external placeholder slots, rewritten once and
/// reusable across argument sets.
#[derive(Debug, Clone)]
pub struct PreparedQuery<T> {
    compiled: CompiledQuery<T>,
    arity: usize,
}

impl<T: Record> PreparedQuery<T> {
    pub(crate) fn new(compiled: CompiledQuery<T>, arity: usize) -> Self {
        Self { compiled, arity }
    }

    /// Number of external argument slots.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Runs the compiled tree with `args` bound to its placeholder slots.
    pub fn invoke(&self, args: &[Value]) -> QueryResult<Vec<QueryItem<T>>> {
        if args.len() < self.arity {
            return Err(QueryError::UnknownExternal { slot: args.len() });
        }
        self.compiled.run(args)
    }
}
