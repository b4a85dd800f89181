//! Source location tracking for tokens and parse errors.

use serde::Serialize;

/// A byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of the span in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merges two spans into one that covers both.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Returns the 1-based `(line, column)` of the span start within `source`.
    ///
    /// Columns count characters, not bytes.
    #[must_use]
    pub fn line_column(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }

    /// Returns the source text covered by this span.
    #[must_use]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len() {
        let span = Span::new(5, 10);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::new(3, 3).is_empty());
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged, Span::new(5, 15));
    }

    #[test]
    fn test_line_column_first_line() {
        assert_eq!(Span::new(0, 1).line_column("CREATE"), (1, 1));
        assert_eq!(Span::new(7, 8).line_column("CREATE TABLE"), (1, 8));
    }

    #[test]
    fn test_line_column_after_newlines() {
        let source = "CREATE TABLE t (\n  id integer,\n  bad ???\n);";
        let offset = source.find("???").unwrap();
        assert_eq!(Span::new(offset, offset + 3).line_column(source), (3, 7));
    }

    #[test]
    fn test_slice() {
        let source = "CREATE TABLE users";
        assert_eq!(Span::new(13, 18).slice(source), "users");
        assert_eq!(Span::new(40, 50).slice(source), "");
    }
}
