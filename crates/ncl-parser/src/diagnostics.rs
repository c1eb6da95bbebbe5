//! Diagnostics for NCL parsing and evaluation.
//!
//! Parsing never fails outright: every API returns a best-effort tree plus
//! an ordered list of diagnostics, in the order the problems were detected.
//! An empty list means the tree is fully well-formed.

use ncl_lexer::Range;
use serde::Serialize;

/// How severe a diagnostic is. The syntax layer itself only emits errors;
/// warnings exist for downstream consumers that reuse this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found in source text.
///
/// `summary` is a short, stable headline; `detail` is a longer explanation
/// aimed at the configuration author. `subject` is the exact blame
/// location, and `context` optionally widens that to the surrounding
/// construct (for example a whole malformed block header).
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{summary} at {subject}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub subject: Range,
    pub context: Option<Range>,
}

impl Diagnostic {
    /// An error diagnostic with no context range.
    pub fn error(
        summary: impl Into<String>,
        detail: impl Into<String>,
        subject: Range,
    ) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            subject,
            context: None,
        }
    }

    /// Attach a wider context range.
    pub fn with_context(mut self, context: Range) -> Self {
        self.context = Some(context);
        self
    }
}

/// Whether any diagnostic in the list is an error.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.severity == Severity::Error)
}

/// Render diagnostics for terminal output.
pub fn render_diagnostics(diags: &[Diagnostic]) -> String {
    let mut output = String::new();
    for (index, diag) in diags.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        output.push_str(&render_diagnostic(diag));
    }
    output
}

/// Render a single diagnostic.
pub fn render_diagnostic(diag: &Diagnostic) -> String {
    let severity = match diag.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    let mut output = format!(
        "{severity}: {}\n  --> {}:{}:{}\n",
        diag.summary, diag.subject.filename, diag.subject.start.line, diag.subject.start.column
    );
    if !diag.detail.is_empty() {
        output.push_str(&format!("  {}\n", diag.detail));
    }
    output
}
