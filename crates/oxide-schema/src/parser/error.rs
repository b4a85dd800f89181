//! Parser error types.

use crate::lexer::Span;

/// A parse error with a 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {reason}")]
pub struct ParseError {
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
    /// What went wrong.
    pub reason: String,
    /// Byte range of the offending token or statement.
    pub span: Span,
}

impl ParseError {
    /// Creates an error located at `span` within `source`.
    #[must_use]
    pub fn at(source: &str, span: Span, reason: impl Into<String>) -> Self {
        let (line, column) = span.line_column(source);
        Self {
            line,
            column,
            reason: reason.into(),
            span,
        }
    }
}
