//! Source location utilities for converting byte offsets to line/column positions
//!
//! Positions are only ever used for diagnostics: the renderer never lets them influence
//! output.

use std::fmt;

/// A zero-based line/column position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Provides fast conversion from byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct SourceLocation {
    source: String,
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl SourceLocation {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];

        for (byte_pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }

        Self {
            source: source.to_string(),
            line_starts,
        }
    }

    /// Convert a byte offset to a line/column position
    pub fn byte_to_position(&self, byte_offset: usize) -> Position {
        let line = self
            .line_starts
            .binary_search(&byte_offset)
            .unwrap_or_else(|i| i - 1);

        let column = self.source[self.line_starts[line]..byte_offset.min(self.source.len())]
            .chars()
            .count();

        Position::new(line, column)
    }

    /// The text of a line, without its line break
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Indentation width of the line containing `byte_offset`, up to that offset.
    /// Tabs advance to the next multiple of eight.
    pub fn indentation_at(&self, byte_offset: usize) -> usize {
        let line = self.byte_to_position(byte_offset).line;
        let start = self.line_starts[line];
        self.source[start..byte_offset]
            .chars()
            .fold(0, |width, ch| match ch {
                '\t' => (width / 8 + 1) * 8,
                _ => width + 1,
            })
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_to_position_single_line() {
        let loc = SourceLocation::new("Hello");
        assert_eq!(loc.byte_to_position(0), Position::new(0, 0));
        assert_eq!(loc.byte_to_position(1), Position::new(0, 1));
        assert_eq!(loc.byte_to_position(4), Position::new(0, 4));
    }

    #[test]
    fn test_byte_to_position_multiline() {
        let loc = SourceLocation::new("Hello\nworld\ntest");

        assert_eq!(loc.byte_to_position(0), Position::new(0, 0));
        assert_eq!(loc.byte_to_position(5), Position::new(0, 5));
        assert_eq!(loc.byte_to_position(6), Position::new(1, 0));
        assert_eq!(loc.byte_to_position(10), Position::new(1, 4));
        assert_eq!(loc.byte_to_position(12), Position::new(2, 0));
        assert_eq!(loc.byte_to_position(15), Position::new(2, 3));
        assert_eq!(loc.line_count(), 3);
    }

    #[test]
    fn test_line_text() {
        let loc = SourceLocation::new("def f():\r\n    return 1\n");
        assert_eq!(loc.line_text(0), Some("def f():"));
        assert_eq!(loc.line_text(1), Some("    return 1"));
        assert_eq!(loc.line_text(2), Some(""));
        assert_eq!(loc.line_text(3), None);
    }

    #[test]
    fn test_indentation_with_tabs() {
        let loc = SourceLocation::new("x\n\ty\n  \tz\n    w");
        assert_eq!(loc.indentation_at(3), 8);
        assert_eq!(loc.indentation_at(8), 8);
        assert_eq!(loc.indentation_at(14), 4);
    }
}
