//! Expression nodes for attribute values.
//!
//! A closed set of three kinds: literal values, scope traversals (variable
//! references), and function calls. Every variant owns its children
//! outright, exposes its source ranges, reports the variables it
//! references, and evaluates against an [`EvalContext`]
//! (see the `eval` module).
//!
//! The operator grammar (arithmetic, conditionals, indexing) is a separate
//! concern and is deliberately not represented here; downstream consumers
//! rely only on this contract.

use crate::eval::Value;
use ncl_lexer::Range;

/// A variable reference path: a root name plus attribute/index steps,
/// resolved against an evaluation context's variable scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub root: String,
    pub steps: Vec<TraversalStep>,
    pub src_range: Range,
}

impl Traversal {
    pub fn root_name(&self) -> &str {
        &self.root
    }
}

/// One step of a traversal beyond its root.
#[derive(Debug, Clone, PartialEq)]
pub enum TraversalStep {
    /// `.name`
    Attr { name: String, range: Range },
    /// `[key]`. Constructed by downstream tooling; the attribute grammar
    /// in this crate emits only `Attr` steps.
    Index { key: Value, range: Range },
}

/// An expression that always yields a fixed value.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralValue {
    pub value: Value,
    pub src_range: Range,
}

/// An expression that reads a value from the variable scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeTraversal {
    pub traversal: Traversal,
}

/// An expression that calls a function from the evaluation context.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,

    pub name_range: Range,
    pub open_paren_range: Range,
    pub close_paren_range: Range,
}

/// An attribute value expression. This is a closed set; adding a kind means
/// revisiting every match below, which is the point.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(LiteralValue),
    Traversal(ScopeTraversal),
    Call(FunctionCall),
}

impl Expression {
    /// The full source region of this expression.
    pub fn range(&self) -> Range {
        match self {
            Expression::Literal(lit) => lit.src_range.clone(),
            Expression::Traversal(st) => st.traversal.src_range.clone(),
            Expression::Call(call) => {
                Range::between(&call.name_range, &call.close_paren_range)
            }
        }
    }

    /// The region of the expression's head, for diagnostics that should
    /// point at the operator or name rather than a trailing argument list.
    /// For calls this spans the name through the opening parenthesis.
    pub fn start_range(&self) -> Range {
        match self {
            Expression::Literal(lit) => lit.src_range.clone(),
            Expression::Traversal(st) => st.traversal.src_range.clone(),
            Expression::Call(call) => {
                Range::between(&call.name_range, &call.open_paren_range)
            }
        }
    }

    /// The variable traversals this expression references, in source order.
    pub fn free_variables(&self) -> Vec<Traversal> {
        match self {
            Expression::Literal(_) => Vec::new(),
            Expression::Traversal(st) => vec![st.traversal.clone()],
            Expression::Call(call) => call
                .args
                .iter()
                .flat_map(Expression::free_variables)
                .collect(),
        }
    }

    /// Replace each direct child expression with the result of `f`.
    ///
    /// This is the generic rewrite hook: a transformation can rebuild a
    /// tree without matching on the concrete variant. Non-transforming
    /// walks return the child unchanged. Literals and traversals have no
    /// child nodes.
    pub fn map_children(self, f: &mut dyn FnMut(Expression) -> Expression) -> Expression {
        match self {
            Expression::Call(mut call) => {
                call.args = call.args.into_iter().map(&mut *f).collect();
                Expression::Call(call)
            }
            other => other,
        }
    }
}
