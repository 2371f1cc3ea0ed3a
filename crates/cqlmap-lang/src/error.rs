//! Parse errors.

use crate::span::{offset_to_line_col, Span};
use thiserror::Error;

/// Error while lexing or parsing a statement.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub span: Span,
    /// Optional fix suggestion.
    pub hint: Option<String>,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    /// Attach a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render the error against the statement text, pointing at the span.
    pub fn format_with_source(&self, source: &str) -> String {
        let (line, col) = offset_to_line_col(source, self.span.start);
        let mut out = format!("line {}:{} {}", line, col, self.message);
        if let Some(text) = source.lines().nth(line - 1) {
            let width = self.span.end.saturating_sub(self.span.start).max(1);
            out.push_str(&format!("\n  {}\n  {}{}", text, " ".repeat(col - 1), "^".repeat(width)));
        }
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\n  hint: {}", hint));
        }
        out
    }
}
