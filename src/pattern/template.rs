//! Output templates
//!
//! A template is either literal text with `#name` placeholders or a callback. Text templates
//! render each placeholder's binding through the [`Emit`] sink, so captured sub-trees go
//! through the full rule chain again. Callbacks get the same sink and may decline a match
//! after the fact, in which case whatever they emitted is rewound by the caller.

use super::compiler::Mode;
use super::matcher::{Binding, Bindings};
use crate::error::{Diagnostic, RenderError};
use crate::syntax::SyntaxNode;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(\w+)").unwrap());

/// Result of applying a template to a successful match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    /// The callback rejected the match; the next rule should be tried
    Declined,
}

/// A point to rewind a sink to
///
/// `journal` counts the sink's own bookkeeping entries (rule hits, unhandled kinds) so that
/// those are undone together with the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub output: usize,
    pub journal: usize,
}

/// Output sink handed to templates
pub trait Emit {
    /// Append raw text
    fn emit(&mut self, text: &str);

    /// Render a sub-tree, consulting the rule chain first
    fn render(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic>;

    /// Current position, to rewind to on a declined match
    fn mark(&self) -> Mark;

    /// Drop everything emitted and recorded after `mark`
    fn rewind(&mut self, mark: Mark);

    /// Render a binding; list bindings render element by element
    fn render_binding(&mut self, binding: Binding<'_>) -> Result<(), Diagnostic> {
        match binding {
            Binding::Node(node) => self.render(node),
            Binding::List(nodes) => nodes.iter().try_for_each(|node| self.render(node)),
        }
    }
}

/// A template implemented in code
pub type Callback =
    Arc<dyn Fn(&Bindings<'_>, &mut dyn Emit) -> Result<Outcome, Diagnostic> + Send + Sync>;

/// One piece of a text template
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Clone)]
pub enum Template {
    Text {
        source: String,
        segments: Vec<Segment>,
    },
    Callback(Callback),
}

impl Template {
    pub fn text(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;
        for capture in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(name)) = (capture.get(0), capture.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }
        Template::Text {
            source: source.to_string(),
            segments,
        }
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&Bindings<'_>, &mut dyn Emit) -> Result<Outcome, Diagnostic> + Send + Sync + 'static,
    {
        Template::Callback(Arc::new(f))
    }

    /// Placeholder names in order of appearance; empty for callbacks
    pub fn placeholders(&self) -> Vec<&str> {
        match self {
            Template::Text { segments, .. } => segments
                .iter()
                .filter_map(|segment| match segment {
                    Segment::Placeholder(name) => Some(name.as_str()),
                    Segment::Literal(_) => None,
                })
                .collect(),
            Template::Callback(_) => Vec::new(),
        }
    }

    /// Fill the template from `bindings`
    ///
    /// Every placeholder must be bound; `rule` names the rule in the error otherwise. Text
    /// templates of statement patterns end with a line break.
    pub fn substitute(
        &self,
        rule: &str,
        bindings: &Bindings<'_>,
        mode: Mode,
        out: &mut dyn Emit,
    ) -> Result<Outcome, Diagnostic> {
        let (source, segments) = match self {
            Template::Callback(callback) => return callback(bindings, out),
            Template::Text { source, segments } => (source, segments),
        };

        if let Some(name) = self
            .placeholders()
            .into_iter()
            .find(|name| !bindings.contains_key(*name))
        {
            return Err(RenderError::UnboundPlaceholder {
                rule: rule.to_string(),
                template: source.clone(),
                name: name.to_string(),
            }
            .into());
        }

        for segment in segments {
            match segment {
                Segment::Literal(text) => out.emit(text),
                Segment::Placeholder(name) => {
                    if let Some(binding) = bindings.get(name) {
                        out.render_binding(*binding)?;
                    }
                }
            }
        }
        if mode == Mode::Statement {
            out.emit("\n");
        }
        Ok(Outcome::Handled)
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::text(source)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Text { source, .. } => f.debug_tuple("Text").field(source).finish(),
            Template::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Text { source, .. } => write!(f, "{:?}", source),
            Template::Callback(_) => f.write_str("<callback>"),
        }
    }
}
