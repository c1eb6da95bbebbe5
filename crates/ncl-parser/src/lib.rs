//! NCL Parser
//!
//! Parses a token stream into an error-annotated Abstract Syntax Tree of
//! configuration bodies: attributes (`name = value`) and labeled blocks
//! (`type "label" { ... }`), with a small expression grammar for attribute
//! values.
//!
//! Parsing is total: malformed input produces a best-effort tree plus an
//! ordered list of [`Diagnostic`]s rather than an error, and bracket-aware
//! resynchronization keeps a single pass reporting as many independent
//! problems as possible. An empty diagnostics list means the tree is fully
//! well-formed.

pub mod ast;
pub mod diagnostics;
pub mod eval;
pub mod expr;
pub mod parser;
pub mod peeker;
pub mod strings;
pub mod vars;

pub use ast::{Attribute, Block, Body, BodyItem};
pub use diagnostics::{has_errors, render_diagnostics, Diagnostic, Severity};
pub use eval::{EvalContext, Function, Param, Value, ValueKind};
pub use expr::{Expression, Traversal, TraversalStep};
pub use parser::Parser;

use ncl_lexer::Scanner;

/// Parse NCL source into a body and its diagnostics.
///
/// Scans `source` and parses the whole stream as one configuration body.
/// `filename` is carried into every range for use in diagnostics.
pub fn parse(source: &str, filename: &str) -> (Body, Vec<Diagnostic>) {
    let tokens = Scanner::scan(source, filename);
    let mut parser = Parser::new(tokens);
    parser.parse_body(ncl_lexer::TokenKind::Eof)
}
