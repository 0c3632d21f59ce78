//! # algorithmic
//!
//! Renders reference implementations of algorithms, written in a small Python subset, as
//! LaTeX `algorithmic` pseudocode.
//!
//! The pipeline:
//!
//! 1. [`lexer`] and [`parser`] turn source text into a generic [`SyntaxNode`] tree
//! 2. [`rules`] holds an ordered [`RuleSet`] of pattern/template rewrites, compiled by
//!    [`pattern`], which documents may extend with `PATTERNS` and `GLOBALS` statements
//! 3. [`render`] walks the tree, offering each node to the rules before rendering it
//!    generically
//! 4. [`document`] wraps a rendered module into a LaTeX document, one [`Session`] per file
//!
//! Defaults and user rule tables come from [`config`].

pub mod config;
pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pattern;
pub mod render;
pub mod rules;
pub mod syntax;

pub use config::{AlgorithmicConfig, Loader};
pub use document::{pattern_usage, RuleUsage, Session};
pub use error::{Diagnostic, Error, ParseError, PatternError, RenderError, RuleError};
pub use parser::{parse_module, parse_snippet};
pub use pattern::{Pattern, Template};
pub use render::Renderer;
pub use rules::{Rule, RuleSet};
pub use syntax::{NodeKind, SyntaxNode};
