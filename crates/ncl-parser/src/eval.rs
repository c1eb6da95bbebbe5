//! Dynamic values and expression evaluation.
//!
//! The host application supplies an [`EvalContext`] of variable bindings
//! and callable functions; expression evaluation resolves against it and
//! reports failures as diagnostics rather than panicking or aborting. A
//! failed evaluation yields `Value::Null` alongside its diagnostics so
//! callers can keep going.

use crate::diagnostics::{has_errors, Diagnostic};
use crate::expr::{Expression, FunctionCall, Traversal, TraversalStep};
use ncl_lexer::Range;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A dynamic configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// The type of a [`Value`], for declaring and checking function signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// A parameter in a function's declared signature. `kind: None` accepts
/// any value.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: Option<ValueKind>,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }
}

/// A callable function exposed to expressions.
///
/// When `variadic` is set, arguments beyond the declared parameters are
/// accepted and checked against the last parameter's kind.
pub struct Function {
    pub params: Vec<Param>,
    pub variadic: bool,
    func: Box<dyn Fn(&[Value]) -> Result<Value, String>>,
}

impl Function {
    pub fn new(
        params: Vec<Param>,
        variadic: bool,
        func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) -> Self {
        Self {
            params,
            variadic,
            func: Box::new(func),
        }
    }

    /// Invoke the function body. Signature checking happens at the call
    /// site, where argument source ranges are available for diagnostics.
    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.func)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("params", &self.params)
            .field("variadic", &self.variadic)
            .finish_non_exhaustive()
    }
}

/// Variable bindings and callable functions supplied by the host.
#[derive(Debug, Default)]
pub struct EvalContext {
    pub variables: HashMap<String, Value>,
    pub functions: HashMap<String, Function>,
}

impl Expression {
    /// Evaluate this expression against `ctx`.
    ///
    /// Returns the computed value and any diagnostics raised on the way;
    /// on error the value is `Value::Null`.
    pub fn evaluate(&self, ctx: &EvalContext) -> (Value, Vec<Diagnostic>) {
        match self {
            Expression::Literal(lit) => (lit.value.clone(), Vec::new()),
            Expression::Traversal(st) => st.traversal.evaluate(ctx),
            Expression::Call(call) => call.evaluate(ctx),
        }
    }
}

impl Traversal {
    /// Resolve this path against the context's variable scope.
    pub fn evaluate(&self, ctx: &EvalContext) -> (Value, Vec<Diagnostic>) {
        let Some(root) = ctx.variables.get(&self.root) else {
            return (
                Value::Null,
                vec![Diagnostic::error(
                    "Unknown variable",
                    format!("There is no variable named {:?} in this scope.", self.root),
                    self.src_range.clone(),
                )],
            );
        };

        let mut current = root.clone();
        for step in &self.steps {
            match step {
                TraversalStep::Attr { name, range } => {
                    let Value::Object(fields) = &current else {
                        return (
                            Value::Null,
                            vec![Diagnostic::error(
                                "Unsupported attribute",
                                format!(
                                    "Attributes can be accessed only on object values, not on {} values.",
                                    current.kind()
                                ),
                                range.clone(),
                            )
                            .with_context(self.src_range.clone())],
                        );
                    };
                    let Some(next) = fields.get(name) else {
                        return (
                            Value::Null,
                            vec![Diagnostic::error(
                                "Unsupported attribute",
                                format!("This object does not have an attribute named {name:?}."),
                                range.clone(),
                            )
                            .with_context(self.src_range.clone())],
                        );
                    };
                    current = next.clone();
                }
                TraversalStep::Index { key, range } => {
                    match index_value(&current, key) {
                        Ok(next) => current = next,
                        Err(detail) => {
                            return (
                                Value::Null,
                                vec![Diagnostic::error("Invalid index", detail, range.clone())
                                    .with_context(self.src_range.clone())],
                            );
                        }
                    }
                }
            }
        }

        (current, Vec::new())
    }
}

/// Apply one index step: numeric indices into lists, string keys into
/// objects.
fn index_value(value: &Value, key: &Value) -> Result<Value, String> {
    match (value, key) {
        (Value::List(items), Value::Number(n)) => {
            let idx = *n as usize;
            if n.fract() != 0.0 || *n < 0.0 || idx >= items.len() {
                Err(format!(
                    "The given index {n} is not valid for a list with {} elements.",
                    items.len()
                ))
            } else {
                Ok(items[idx].clone())
            }
        }
        (Value::Object(fields), Value::String(k)) => fields
            .get(k)
            .cloned()
            .ok_or_else(|| format!("This object does not have an attribute named {k:?}.")),
        _ => Err(format!(
            "A {} value cannot be indexed with a {} key.",
            value.kind(),
            key.kind()
        )),
    }
}

impl FunctionCall {
    fn head_range(&self) -> Range {
        Range::between(&self.name_range, &self.open_paren_range)
    }

    fn full_range(&self) -> Range {
        Range::between(&self.name_range, &self.close_paren_range)
    }

    /// Resolve the named function, evaluate arguments, check the declared
    /// signature, and invoke. Argument diagnostics propagate; a failed
    /// argument aborts the call before the function body runs.
    fn evaluate(&self, ctx: &EvalContext) -> (Value, Vec<Diagnostic>) {
        let Some(function) = ctx.functions.get(&self.name) else {
            return (
                Value::Null,
                vec![Diagnostic::error(
                    "Call to unknown function",
                    format!("There is no function named {:?}.", self.name),
                    self.head_range(),
                )],
            );
        };

        let mut diags = Vec::new();

        if self.args.len() < function.params.len() {
            diags.push(
                Diagnostic::error(
                    "Not enough function arguments",
                    format!(
                        "Function {:?} expects {} argument(s), but {} were given.",
                        self.name,
                        function.params.len(),
                        self.args.len()
                    ),
                    self.head_range(),
                )
                .with_context(self.full_range()),
            );
            return (Value::Null, diags);
        }
        if !function.variadic && self.args.len() > function.params.len() {
            diags.push(
                Diagnostic::error(
                    "Too many function arguments",
                    format!(
                        "Function {:?} expects only {} argument(s), but {} were given.",
                        self.name,
                        function.params.len(),
                        self.args.len()
                    ),
                    self.head_range(),
                )
                .with_context(self.full_range()),
            );
            return (Value::Null, diags);
        }

        let mut vals = Vec::with_capacity(self.args.len());
        let mut failed = false;
        for arg in &self.args {
            let (val, arg_diags) = arg.evaluate(ctx);
            if has_errors(&arg_diags) {
                failed = true;
            }
            diags.extend(arg_diags);
            vals.push(val);
        }
        if failed {
            return (Value::Null, diags);
        }

        for (i, val) in vals.iter().enumerate() {
            let param = function
                .params
                .get(i)
                .or_else(|| function.params.last().filter(|_| function.variadic));
            let Some(param) = param else { continue };
            if let Some(kind) = param.kind {
                if val.kind() != kind {
                    diags.push(
                        Diagnostic::error(
                            "Invalid function argument",
                            format!(
                                "Invalid value for the {:?} parameter: a {} is required, but a {} was given.",
                                param.name,
                                kind,
                                val.kind()
                            ),
                            self.args[i].start_range(),
                        )
                        .with_context(self.full_range()),
                    );
                }
            }
        }
        if has_errors(&diags) {
            return (Value::Null, diags);
        }

        match function.call(&vals) {
            Ok(val) => (val, diags),
            Err(message) => {
                diags.push(
                    Diagnostic::error(
                        "Error in function call",
                        format!("Call to function {:?} failed: {message}.", self.name),
                        self.head_range(),
                    )
                    .with_context(self.full_range()),
                );
                (Value::Null, diags)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{LiteralValue, ScopeTraversal};
    use ncl_lexer::Pos;
    use pretty_assertions::assert_eq;

    fn range(sc: usize, sb: usize, ec: usize, eb: usize) -> Range {
        Range::new("test.ncl", Pos::new(1, sc, sb), Pos::new(1, ec, eb))
    }

    fn traversal(root: &str, steps: Vec<TraversalStep>) -> Expression {
        Expression::Traversal(ScopeTraversal {
            traversal: Traversal {
                root: root.to_string(),
                steps,
                src_range: range(1, 0, 10, 9),
            },
        })
    }

    fn literal(value: Value) -> Expression {
        Expression::Literal(LiteralValue {
            value,
            src_range: range(1, 0, 2, 1),
        })
    }

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        Expression::Call(FunctionCall {
            name: name.to_string(),
            args,
            name_range: range(1, 0, 4, 3),
            open_paren_range: range(4, 3, 5, 4),
            close_paren_range: range(10, 9, 11, 10),
        })
    }

    fn context() -> EvalContext {
        let mut ctx = EvalContext::default();
        ctx.variables
            .insert("port".to_string(), Value::Number(8080.0));
        let mut server = BTreeMap::new();
        server.insert("host".to_string(), Value::String("localhost".into()));
        ctx.variables
            .insert("server".to_string(), Value::Object(server));
        ctx.functions.insert(
            "upper".to_string(),
            Function::new(vec![Param::new("input", ValueKind::String)], false, |args| {
                match &args[0] {
                    Value::String(s) => Ok(Value::String(s.to_uppercase())),
                    _ => Err("not a string".to_string()),
                }
            }),
        );
        ctx
    }

    // =========================================================================
    // Literals and traversals
    // =========================================================================

    #[test]
    fn test_literal_evaluates_to_itself() {
        let (val, diags) = literal(Value::Bool(true)).evaluate(&context());
        assert!(diags.is_empty());
        assert_eq!(val, Value::Bool(true));
    }

    #[test]
    fn test_traversal_root() {
        let (val, diags) = traversal("port", vec![]).evaluate(&context());
        assert!(diags.is_empty());
        assert_eq!(val, Value::Number(8080.0));
    }

    #[test]
    fn test_traversal_attr_step() {
        let steps = vec![TraversalStep::Attr {
            name: "host".to_string(),
            range: range(7, 6, 12, 11),
        }];
        let (val, diags) = traversal("server", steps).evaluate(&context());
        assert!(diags.is_empty());
        assert_eq!(val, Value::String("localhost".into()));
    }

    #[test]
    fn test_unknown_variable() {
        let (val, diags) = traversal("missing", vec![]).evaluate(&context());
        assert_eq!(val, Value::Null);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unknown variable");
        assert!(diags[0].detail.contains("\"missing\""));
    }

    #[test]
    fn test_attr_on_non_object() {
        let steps = vec![TraversalStep::Attr {
            name: "host".to_string(),
            range: range(5, 4, 10, 9),
        }];
        let (val, diags) = traversal("port", steps).evaluate(&context());
        assert_eq!(val, Value::Null);
        assert_eq!(diags[0].summary, "Unsupported attribute");
        assert!(diags[0].detail.contains("number"));
    }

    #[test]
    fn test_missing_attr() {
        let steps = vec![TraversalStep::Attr {
            name: "missing".to_string(),
            range: range(7, 6, 15, 14),
        }];
        let (_, diags) = traversal("server", steps).evaluate(&context());
        assert_eq!(diags[0].summary, "Unsupported attribute");
        assert!(diags[0].detail.contains("\"missing\""));
    }

    #[test]
    fn test_index_step_into_list() {
        let mut ctx = context();
        ctx.variables.insert(
            "ports".to_string(),
            Value::List(vec![Value::Number(80.0), Value::Number(443.0)]),
        );
        let steps = vec![TraversalStep::Index {
            key: Value::Number(1.0),
            range: range(6, 5, 9, 8),
        }];
        let (val, diags) = traversal("ports", steps).evaluate(&ctx);
        assert!(diags.is_empty());
        assert_eq!(val, Value::Number(443.0));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let mut ctx = context();
        ctx.variables
            .insert("ports".to_string(), Value::List(vec![Value::Number(80.0)]));
        let steps = vec![TraversalStep::Index {
            key: Value::Number(3.0),
            range: range(6, 5, 9, 8),
        }];
        let (val, diags) = traversal("ports", steps).evaluate(&ctx);
        assert_eq!(val, Value::Null);
        assert_eq!(diags[0].summary, "Invalid index");
    }

    // =========================================================================
    // Function calls
    // =========================================================================

    #[test]
    fn test_call_invokes_function() {
        let expr = call("upper", vec![literal(Value::String("web".into()))]);
        let (val, diags) = expr.evaluate(&context());
        assert!(diags.is_empty());
        assert_eq!(val, Value::String("WEB".into()));
    }

    #[test]
    fn test_call_unknown_function() {
        let expr = call("missing", vec![]);
        let (val, diags) = expr.evaluate(&context());
        assert_eq!(val, Value::Null);
        assert_eq!(diags[0].summary, "Call to unknown function");
    }

    #[test]
    fn test_call_arity_mismatch() {
        let expr = call("upper", vec![]);
        let (_, diags) = expr.evaluate(&context());
        assert_eq!(diags[0].summary, "Not enough function arguments");

        let expr = call(
            "upper",
            vec![
                literal(Value::String("a".into())),
                literal(Value::String("b".into())),
            ],
        );
        let (_, diags) = expr.evaluate(&context());
        assert_eq!(diags[0].summary, "Too many function arguments");
    }

    #[test]
    fn test_call_kind_mismatch() {
        let expr = call("upper", vec![literal(Value::Number(1.0))]);
        let (val, diags) = expr.evaluate(&context());
        assert_eq!(val, Value::Null);
        assert_eq!(diags[0].summary, "Invalid function argument");
        assert!(diags[0].detail.contains("string is required"));
    }

    #[test]
    fn test_call_propagates_argument_diagnostics() {
        let expr = call("upper", vec![traversal("missing", vec![])]);
        let (val, diags) = expr.evaluate(&context());
        assert_eq!(val, Value::Null);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Unknown variable");
    }

    #[test]
    fn test_call_body_error_becomes_diagnostic() {
        let mut ctx = context();
        ctx.functions.insert(
            "fail".to_string(),
            Function::new(vec![], false, |_| Err("boom".to_string())),
        );
        let (val, diags) = call("fail", vec![]).evaluate(&ctx);
        assert_eq!(val, Value::Null);
        assert_eq!(diags[0].summary, "Error in function call");
        assert!(diags[0].detail.contains("boom"));
    }

    #[test]
    fn test_variadic_call() {
        let mut ctx = context();
        ctx.functions.insert(
            "sum".to_string(),
            Function::new(vec![Param::new("values", ValueKind::Number)], true, |args| {
                let mut total = 0.0;
                for arg in args {
                    match arg {
                        Value::Number(n) => total += n,
                        _ => return Err("not a number".to_string()),
                    }
                }
                Ok(Value::Number(total))
            }),
        );
        let expr = call(
            "sum",
            vec![
                literal(Value::Number(1.0)),
                literal(Value::Number(2.0)),
                literal(Value::Number(3.0)),
            ],
        );
        let (val, diags) = expr.evaluate(&ctx);
        assert!(diags.is_empty());
        assert_eq!(val, Value::Number(6.0));
    }
}
