//! Pattern compilation
//!
//! A snippet must hold exactly one statement. An expression statement compiles to an
//! expression pattern (its template is inline text); anything else compiles to a statement
//! pattern, whose text template is terminated with a line break.

use super::matcher::{is_splat_field, match_pattern, wildcard_name, Bindings};
use crate::error::PatternError;
use crate::parser::parse_snippet;
use crate::syntax::{Field, NodeKind, SyntaxNode};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Whether a pattern stands for an expression or a whole statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Expression,
    Statement,
}

/// A compiled pattern tree together with the globals it was compiled against
#[derive(Debug, Clone)]
pub struct Pattern {
    node: SyntaxNode,
    mode: Mode,
    globals: Arc<BTreeSet<String>>,
    source: String,
}

impl Pattern {
    /// Compile `snippet`; names in `globals` match only themselves
    pub fn compile(snippet: &str, globals: Arc<BTreeSet<String>>) -> Result<Self, PatternError> {
        let (module, _) = parse_snippet(snippet).map_err(|source| PatternError::Parse {
            snippet: snippet.to_string(),
            source,
        })?;

        let mut body = match module.field("body") {
            Some(Field::List(body)) => body.clone(),
            _ => Vec::new(),
        };
        if body.len() != 1 {
            return Err(PatternError::NotSingleStatement {
                snippet: snippet.to_string(),
                count: body.len(),
            });
        }

        let statement = body.remove(0);
        let (node, mode) = match (statement.kind(), statement.node("value")) {
            (NodeKind::Expr, Some(value)) => (value.clone(), Mode::Expression),
            _ => (statement, Mode::Statement),
        };

        if has_multiple_wildcards(&node) {
            return Err(PatternError::MultipleWildcards {
                snippet: snippet.to_string(),
            });
        }

        Ok(Self {
            node,
            mode,
            globals,
            source: snippet.to_string(),
        })
    }

    pub fn matches<'t>(&self, target: &'t SyntaxNode) -> Option<Bindings<'t>> {
        match_pattern(&self.node, target, &self.globals)
    }

    pub fn node(&self) -> &SyntaxNode {
        &self.node
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn globals(&self) -> &BTreeSet<String> {
        &self.globals
    }

    /// The snippet this pattern was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Free variables in order of first appearance
    pub fn variables(&self) -> Vec<String> {
        let mut variables = Vec::new();
        collect_variables(&self.node, &self.globals, &mut variables);
        variables
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.source)
    }
}

fn collect_variables(node: &SyntaxNode, globals: &BTreeSet<String>, out: &mut Vec<String>) {
    if let Some(id) = node.name_id() {
        if !globals.contains(id) && !out.iter().any(|seen| seen == id) {
            out.push(id.to_string());
        }
    }
    for child in node.children() {
        collect_variables(child, globals, out);
    }
}

fn has_multiple_wildcards(node: &SyntaxNode) -> bool {
    let kind = node.kind();
    let too_many = node.fields().any(|(name, field)| match field {
        Field::List(elements) if is_splat_field(kind, name) => {
            elements
                .iter()
                .filter(|element| wildcard_name(element).is_some())
                .count()
                > 1
        }
        _ => false,
    });
    too_many || node.children().any(has_multiple_wildcards)
}
