//! Query expression tree structures.
//!
//! The tree is a tagged union over node variants plus structural recursion;
//! rewriting always returns a new immutable tree sharing unaffected
//! subtrees through `Arc`, never mutating nodes in place.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::index::Comparer;
use crate::record::ValueType;

/// Declarative operations a query chain can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Filter by predicate
    Filter,
    /// Project each element
    Select,
    /// Group by key selector (optionally with element selector and comparer)
    GroupBy,
    /// First matching element; fails when empty
    First,
    /// First matching element or the default sentinel
    FirstOrDefault,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Filter => "filter",
            OpKind::Select => "select",
            OpKind::GroupBy => "group_by",
            OpKind::First => "first",
            OpKind::FirstOrDefault => "first_or_default",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The reduced operation set an index exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOp {
    /// Constant-time group lookup by key
    LookupEqual,
    /// All (key, group) pairs in first-appearance order
    Groups,
    /// First element of the key group; fails when empty
    First,
    /// First element of the key group, or the default sentinel
    FirstOrDefault,
}

impl IndexOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexOp::LookupEqual => "lookup_equal",
            IndexOp::Groups => "groups",
            IndexOp::First => "first",
            IndexOp::FirstOrDefault => "first_or_default",
        }
    }
}

impl fmt::Display for IndexOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chained operation call.
#[derive(Debug, Clone)]
pub struct CallExpr {
    /// The pipeline this call consumes.
    pub target: Arc<Expr>,
    pub op: OpKind,
    /// Quoted lambdas, plus at most one trailing comparer reference.
    pub args: Vec<Arc<Expr>>,
}

/// An embedded predicate or key selector.
#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub param: String,
    pub body: Arc<Expr>,
}

impl LambdaExpr {
    pub fn new(param: impl Into<String>, body: Arc<Expr>) -> Self {
        Self {
            param: param.into(),
            body,
        }
    }
}

/// Replacement node emitted by the rewriter in place of an eligible call.
#[derive(Debug, Clone)]
pub struct IndexLookupExpr {
    /// Registry slot of the resolved index.
    pub slot: usize,
    /// Indexed field path, kept for diagnostics.
    pub path: String,
    pub op: IndexOp,
    /// Lookup key (`Const` or `External`); `None` for group lookups.
    pub key: Option<Arc<Expr>>,
    /// Element selector for group lookups.
    pub element: Option<LambdaExpr>,
    /// Key type rebound to the field's declared value type.
    pub key_type: ValueType,
}

/// Immutable query-operation tree.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Root collection reference.
    Source,
    /// Chained operation call.
    Call(CallExpr),
    /// Predicate or key-selector lambda.
    Lambda(LambdaExpr),
    /// Field access on a target expression.
    Member { target: Arc<Expr>, field: String },
    /// Equality test.
    Eq { left: Arc<Expr>, right: Arc<Expr> },
    /// Conjunction. Never index-eligible; executable by the default scan.
    And { left: Arc<Expr>, right: Arc<Expr> },
    /// Disjunction. Never index-eligible; executable by the default scan.
    Or { left: Arc<Expr>, right: Arc<Expr> },
    /// Quoted subexpression (lambda arguments are carried quoted).
    Quote(Arc<Expr>),
    /// Constant value.
    Const(Value),
    /// Lambda parameter reference.
    Param(String),
    /// Comparer argument.
    ComparerRef(Comparer),
    /// Placeholder for an externally supplied argument (prepared queries).
    External(usize),
    /// Index lookup substituted for a scan.
    IndexLookup(IndexLookupExpr),
}

impl Expr {
    /// Variant name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Source => "source",
            Expr::Call(_) => "call",
            Expr::Lambda(_) => "lambda",
            Expr::Member { .. } => "member",
            Expr::Eq { .. } => "eq",
            Expr::And { .. } => "and",
            Expr::Or { .. } => "or",
            Expr::Quote(_) => "quote",
            Expr::Const(_) => "const",
            Expr::Param(_) => "param",
            Expr::ComparerRef(_) => "comparer",
            Expr::External(_) => "external",
            Expr::IndexLookup(_) => "index_lookup",
        }
    }
}
