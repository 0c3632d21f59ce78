//! Error types
//!
//! A pattern that does not match is ordinary control flow (`Option::None`) and never shows up
//! here. These types are reserved for real failures: input the front end cannot read, rules
//! that cannot be compiled, and rendering defects.

use crate::syntax::{NodeKind, Operator, Position, SourceLocation};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// Front-end failures while reading source text or rule snippets
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid token at bytes {}..{}", .span.start, .span.end)]
    InvalidToken { span: Range<usize> },

    #[error("unindent does not match any outer indentation level at byte {offset}")]
    InconsistentDedent { offset: usize },

    #[error("syntax error at bytes {}..{}: {message}", .span.start, .span.end)]
    Syntax { span: Range<usize>, message: String },
}

impl ParseError {
    /// Byte offset where the failure was detected
    pub fn offset(&self) -> usize {
        match self {
            ParseError::InvalidToken { span } | ParseError::Syntax { span, .. } => span.start,
            ParseError::InconsistentDedent { offset } => *offset,
        }
    }

    /// Line/column of the failure in `source`
    pub fn position(&self, source: &str) -> Position {
        SourceLocation::new(source).byte_to_position(self.offset())
    }
}

/// Rule compile failures; always authoring defects, never input errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
    #[error("cannot parse pattern `{snippet}`: {source}")]
    Parse { snippet: String, source: ParseError },

    #[error("pattern `{snippet}` must be exactly one statement, found {count}")]
    NotSingleStatement { snippet: String, count: usize },

    #[error("pattern `{snippet}` has more than one wildcard in a single list")]
    MultipleWildcards { snippet: String },
}

/// Failures while extending a rule set
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("rule table must be a list of (pattern, template) string pairs: {0}")]
    MalformedTable(String),

    #[error("GLOBALS must be built from a string of whitespace-separated names")]
    MalformedGlobals,
}

/// Defects found while rendering a node
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("template `{template}` of rule `{rule}` references unbound placeholder `#{name}`")]
    UnboundPlaceholder {
        rule: String,
        template: String,
        name: String,
    },

    #[error("operator `{0}` has no pseudocode rendering")]
    OperatorNotSupported(Operator),

    #[error("{kind} node has no `{field}` field")]
    MissingField { kind: NodeKind, field: &'static str },

    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl RenderError {
    /// Whether rendering can carry on with the next statement
    ///
    /// Unsupported input stays local to the statement that holds it. Broken templates and
    /// rule tables would break every later statement too.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RenderError::OperatorNotSupported(_) | RenderError::MissingField { .. }
        )
    }
}

/// One step of the source back-trace attached to a rendering failure
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: NodeKind,
    pub position: Option<Position>,
    pub line: Option<String>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(position) => write!(f, "At node {} ({})", self.kind, position)?,
            None => write!(f, "At node {}", self.kind)?,
        }
        if let (Some(line), Some(position)) = (&self.line, &self.position) {
            write!(f, "\n{}\n{}^", line, " ".repeat(position.column))?;
        }
        Ok(())
    }
}

/// A rendering failure together with the nodes it unwound through, innermost first
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub error: RenderError,
    pub frames: Vec<Frame>,
}

impl Diagnostic {
    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.first()
    }
}

impl From<RenderError> for Diagnostic {
    fn from(error: RenderError) -> Self {
        Self {
            error,
            frames: Vec::new(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        for frame in &self.frames {
            write!(f, "\n{}", frame)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Any failure of the end-to-end source-to-pseudocode pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Render(#[from] Diagnostic),

    /// The document was rendered to the end, but these statements were replaced by markers
    #[error("{} statement(s) could not be rendered", .0.len())]
    Incomplete(Vec<Diagnostic>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display_has_caret() {
        let diagnostic = Diagnostic {
            error: RenderError::OperatorNotSupported(Operator::Pow),
            frames: vec![Frame {
                kind: NodeKind::BinOp,
                position: Some(Position::new(2, 8)),
                line: Some("    y = x ** 2".to_string()),
            }],
        };
        let text = diagnostic.to_string();
        assert!(text.starts_with("operator `**` has no pseudocode rendering"));
        assert!(text.contains("At node BinOp (3:9)"));
        assert!(text.ends_with("    y = x ** 2\n        ^"));
    }

    #[test]
    fn test_only_input_defects_are_recoverable() {
        assert!(RenderError::OperatorNotSupported(Operator::Pow).is_recoverable());
        let unbound = RenderError::UnboundPlaceholder {
            rule: "f(a)".to_string(),
            template: "#b".to_string(),
            name: "b".to_string(),
        };
        assert!(!unbound.is_recoverable());
        assert!(!RenderError::Rule(RuleError::MalformedGlobals).is_recoverable());
    }

    #[test]
    fn test_parse_error_position() {
        let error = ParseError::InvalidToken { span: 6..7 };
        assert_eq!(error.position("x = 1\ny = $"), Position::new(1, 0));
    }
}
