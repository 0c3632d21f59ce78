//! Document processing
//!
//! A [`Session`] renders one source file: it parses the text, writes the optional LaTeX
//! wrapper around the rendered module and owns the per-document rule set that in-document
//! `PATTERNS` / `GLOBALS` statements extend. Sessions never share rule extensions; each
//! starts from the built-in library plus the configured rules.
//!
//! [`pattern_usage`] aggregates rule hit counts over several sessions for the `stats`
//! command.

use crate::config::{AlgorithmicConfig, RenderConfig};
use crate::error::{Error, RuleError};
use crate::parser::parse_module;
use crate::pattern::{Emit, Pattern, Template};
use crate::render::Renderer;
use crate::rules::RuleSet;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const PREAMBLE: &str = r"\documentclass[a4paper,oneside,article]{memoir}
\usepackage[T1]{fontenc}
\usepackage[noend]{algorithmic}
\usepackage{algorithm}
\usepackage{amsmath,amssymb}
\begin{document}
";

/// Macro overrides for typesetting closer to the source language
pub const NEW_STYLE: &str = r"\newcommand{\eq}{==}
\renewcommand{\gets}{=}
\renewcommand{\land}{\mathbin{\text{and}}}
\renewcommand{\lor}{\mathbin{\text{or}}}
";

/// Fallback definitions of the macros the renderer relies on
pub const PROLOGUE: &str = r"\providecommand{\eq}{=}
\providecommand{\emptystring}{\text{empty string}}
";

pub const POSTAMBLE: &str = "\\end{document}\n";

/// Rendering of a single document
pub struct Session {
    renderer: Renderer,
    options: RenderConfig,
}

impl Session {
    pub fn new(rules: Arc<RuleSet>, options: RenderConfig) -> Self {
        let renderer = Renderer::new(rules).with_dump_unhandled(options.dump_unhandled);
        Self { renderer, options }
    }

    /// Start from the built-in rules extended with the configured globals and patterns
    pub fn from_config(config: &AlgorithmicConfig) -> Result<Self, RuleError> {
        let mut rules = RuleSet::builtin()?;
        let extended = Arc::make_mut(&mut rules);
        extended.extend_globals(config.rules.globals.iter().cloned());
        extended.extend(
            config
                .rules
                .patterns
                .iter()
                .map(|entry| (entry.pattern.as_str(), Template::text(&entry.template))),
        )?;
        Ok(Self::new(rules, config.render.clone()))
    }

    /// Parse and render `source`
    ///
    /// Statements that cannot be rendered are replaced by a marker line and the rest of the
    /// document is still rendered; they are reported together as [`Error::Incomplete`]. On
    /// any failure the output produced so far stays available through [`Session::output`].
    pub fn render(&mut self, source: &str) -> Result<(), Error> {
        let module = parse_module(source)?;
        self.renderer.set_source(source);

        if self.options.preamble {
            self.renderer.emit(PREAMBLE);
        }
        if self.options.new_style {
            self.renderer.emit(NEW_STYLE);
        }
        if self.options.prologue {
            self.renderer.emit(PROLOGUE);
        }
        self.renderer.render(&module)?;
        if self.options.preamble {
            self.renderer.emit(POSTAMBLE);
        }

        let failures = self.renderer.take_failures();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Incomplete(failures))
        }
    }

    pub fn output(&self) -> &str {
        self.renderer.output()
    }

    pub fn into_output(self) -> String {
        self.renderer.into_output()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }
}

/// Where one rule fired across a batch of documents
#[derive(Debug, Clone)]
pub struct RuleUsage {
    pub pattern: Pattern,
    pub files: Vec<String>,
}

/// For every rule of the last session's rule set, in priority order, the documents in which
/// a rule with the same pattern fired
pub fn pattern_usage<'a, I>(sessions: I) -> Vec<RuleUsage>
where
    I: IntoIterator<Item = (&'a str, &'a Session)>,
{
    let mut fired: Vec<(&str, BTreeSet<String>)> = Vec::new();
    let mut last: Option<&RuleSet> = None;

    for (file, session) in sessions {
        let renderer = session.renderer();
        let hits = renderer.hits();
        let patterns = renderer
            .rules()
            .rules()
            .filter(|rule| hits.get(&rule.ordinal()).is_some_and(|count| *count > 0))
            .map(|rule| rule.describe())
            .collect();
        fired.push((file, patterns));
        last = Some(renderer.rules());
    }

    let Some(rules) = last else {
        return Vec::new();
    };
    rules
        .rules()
        .map(|rule| {
            let description = rule.describe();
            RuleUsage {
                pattern: rule.pattern().clone(),
                files: fired
                    .iter()
                    .filter(|(_, patterns)| patterns.contains(&description))
                    .map(|(file, _)| file.to_string())
                    .collect(),
            }
        })
        .collect()
}
