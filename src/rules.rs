//! Rule sets
//!
//! A [`RuleSet`] is the ordered list of `(pattern, template)` rewrite rules the renderer
//! consults before falling back to its built-in rendering of a node kind. Rules are tried
//! in priority order and the first one that matches and does not decline wins.
//!
//! Extension is batch-wise: a new batch is compiled against the globals accumulated so far
//! and placed in front of every existing rule, keeping its own internal order. A batch that
//! fails to compile leaves the set untouched.
//!
//! The built-in library (see `library`) is compiled once per process and shared; sessions
//! clone it before extending.

mod library;

use crate::error::{Diagnostic, PatternError, RuleError};
use crate::pattern::{Binding, Emit, Outcome, Pattern, Template};
use crate::syntax::{fold, SyntaxNode};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::sync::Arc;

pub use library::{DEFAULT_GLOBALS, DEFAULT_PATTERNS};

static BUILTIN: Lazy<Result<Arc<RuleSet>, RuleError>> = Lazy::new(library::build);

static PATTERNS_DIRECTIVE: Lazy<Result<Pattern, PatternError>> =
    Lazy::new(|| Pattern::compile("PATTERNS = p", directive_globals("PATTERNS")));

static GLOBALS_DIRECTIVE: Lazy<Result<Pattern, PatternError>> =
    Lazy::new(|| Pattern::compile("GLOBALS = s.split()", directive_globals("GLOBALS")));

fn directive_globals(name: &str) -> Arc<BTreeSet<String>> {
    Arc::new(BTreeSet::from([name.to_string()]))
}

/// One compiled rewrite rule
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Pattern,
    template: Template,
    ordinal: usize,
}

impl Rule {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Declaration index; stable across later extensions
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Human-readable name of the rule, its pattern snippet on one line
    pub fn describe(&self) -> String {
        self.pattern
            .source()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Ordered, extensible collection of rewrite rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    globals: Arc<BTreeSet<String>>,
    next_ordinal: usize,
}

impl RuleSet {
    /// A set with no rules and no globals
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared built-in rule library
    pub fn builtin() -> Result<Arc<RuleSet>, RuleError> {
        BUILTIN.clone()
    }

    pub fn globals(&self) -> &BTreeSet<String> {
        &self.globals
    }

    /// Rules in priority order
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add global names; rules compiled from now on match them literally
    pub fn extend_globals<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let globals = Arc::make_mut(&mut self.globals);
        globals.extend(names.into_iter().map(Into::into));
        tracing::trace!(count = globals.len(), "extended globals");
    }

    /// Compile `table` and place it ahead of every existing rule
    pub fn extend<I, S>(&mut self, table: I) -> Result<(), RuleError>
    where
        I: IntoIterator<Item = (S, Template)>,
        S: AsRef<str>,
    {
        let mut batch = Vec::new();
        for (offset, (snippet, template)) in table.into_iter().enumerate() {
            let pattern = Pattern::compile(snippet.as_ref(), Arc::clone(&self.globals))?;
            batch.push(Rule {
                pattern,
                template,
                ordinal: self.next_ordinal + offset,
            });
        }

        tracing::trace!(
            added = batch.len(),
            total = self.rules.len() + batch.len(),
            "extended rules"
        );
        self.next_ordinal += batch.len();
        self.rules.splice(0..0, batch);
        Ok(())
    }

    /// Apply the first rule that matches `node` and does not decline
    ///
    /// Returns the ordinal of the rule that handled the node, or `None` when no rule did.
    /// Output of a declining callback is rewound before the next rule is tried.
    pub fn apply_first_match(
        &self,
        node: &SyntaxNode,
        out: &mut dyn Emit,
    ) -> Result<Option<usize>, Diagnostic> {
        for rule in &self.rules {
            let Some(bindings) = rule.pattern.matches(node) else {
                continue;
            };
            let mark = out.mark();
            let description = rule.describe();
            match rule
                .template
                .substitute(&description, &bindings, rule.pattern.mode(), out)?
            {
                Outcome::Handled => {
                    tracing::debug!(rule = %description, kind = %node.kind(), "rule applied");
                    return Ok(Some(rule.ordinal));
                }
                Outcome::Declined => {
                    tracing::debug!(rule = %description, kind = %node.kind(), "rule declined");
                    out.rewind(mark);
                }
            }
        }
        Ok(None)
    }

    /// Extend the set from an in-document directive
    pub fn apply(&mut self, directive: Directive) -> Result<(), RuleError> {
        match directive {
            Directive::Patterns(table) => self.extend(
                table
                    .into_iter()
                    .map(|(pattern, template)| (pattern, Template::text(&template))),
            ),
            Directive::Globals(names) => {
                self.extend_globals(names);
                Ok(())
            }
        }
    }
}

/// A top-level statement that teaches the rule set new vocabulary
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `PATTERNS = [(pattern, template), ...]`
    Patterns(Vec<(String, String)>),
    /// `GLOBALS = "names ...".split()`
    Globals(Vec<String>),
}

/// Recognize a directive statement; `None` for any other statement
pub fn read_directive(node: &SyntaxNode) -> Result<Option<Directive>, RuleError> {
    let patterns = PATTERNS_DIRECTIVE.as_ref().map_err(|e| e.clone())?;
    if let Some(bindings) = patterns.matches(node) {
        let table = bindings
            .get("p")
            .and_then(Binding::as_node)
            .ok_or_else(|| RuleError::MalformedTable("missing table".to_string()))
            .and_then(read_table)?;
        return Ok(Some(Directive::Patterns(table)));
    }

    let globals = GLOBALS_DIRECTIVE.as_ref().map_err(|e| e.clone())?;
    if let Some(bindings) = globals.matches(node) {
        let names = bindings
            .get("s")
            .and_then(Binding::as_node)
            .ok_or(RuleError::MalformedGlobals)
            .and_then(read_globals)?;
        return Ok(Some(Directive::Globals(names)));
    }

    Ok(None)
}

/// Read a literal list of `(pattern, template)` string pairs
pub fn read_table(node: &SyntaxNode) -> Result<Vec<(String, String)>, RuleError> {
    let value = fold(node).ok_or_else(|| {
        RuleError::MalformedTable(format!("{} is not a literal", node.kind()))
    })?;
    let entries = value
        .as_sequence()
        .ok_or_else(|| RuleError::MalformedTable("expected a list or tuple".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry.as_sequence() {
            Some([pattern, template]) => match (pattern.as_str(), template.as_str()) {
                (Some(pattern), Some(template)) => Ok((pattern.to_string(), template.to_string())),
                _ => Err(RuleError::MalformedTable(format!(
                    "entry {} is not a pair of strings",
                    index
                ))),
            },
            _ => Err(RuleError::MalformedTable(format!(
                "entry {} is not a pair",
                index
            ))),
        })
        .collect()
}

/// Read the whitespace-separated names of a literal string
pub fn read_globals(node: &SyntaxNode) -> Result<Vec<String>, RuleError> {
    let value = fold(node).ok_or(RuleError::MalformedGlobals)?;
    let names = value.as_str().ok_or(RuleError::MalformedGlobals)?;
    Ok(names.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;
    use crate::pattern::Mark;

    #[derive(Default)]
    struct Recorder {
        out: String,
    }

    impl Emit for Recorder {
        fn emit(&mut self, text: &str) {
            self.out.push_str(text);
        }

        fn render(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
            self.out.push_str(node.name_id().unwrap_or("?"));
            Ok(())
        }

        fn mark(&self) -> Mark {
            Mark {
                output: self.out.len(),
                journal: 0,
            }
        }

        fn rewind(&mut self, mark: Mark) {
            self.out.truncate(mark.output);
        }
    }

    fn statement(source: &str) -> SyntaxNode {
        parse_module(source).unwrap().list("body")[0].clone()
    }

    fn expression(source: &str) -> SyntaxNode {
        statement(source).node("value").unwrap().clone()
    }

    fn apply(rules: &RuleSet, node: &SyntaxNode) -> (Option<usize>, String) {
        let mut out = Recorder::default();
        let ordinal = rules.apply_first_match(node, &mut out).unwrap();
        (ordinal, out.out)
    }

    #[test]
    fn test_builtin_library_compiles() {
        let rules = RuleSet::builtin().unwrap();
        assert_eq!(rules.len(), DEFAULT_PATTERNS.len() + 2);
        assert!(rules.globals().contains("range"));
        let ordinals: Vec<usize> = rules.rules().map(Rule::ordinal).collect();
        assert_eq!(ordinals, (0..rules.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_later_batches_take_priority() {
        let mut rules = RuleSet::empty();
        rules
            .extend([("f(a)", Template::text("first")), ("f(a)", Template::text("second"))])
            .unwrap();
        assert_eq!(apply(&rules, &expression("f(x)")), (Some(0), "first".to_string()));

        rules.extend([("f(a)", Template::text("third"))]).unwrap();
        assert_eq!(apply(&rules, &expression("f(x)")), (Some(2), "third".to_string()));
    }

    #[test]
    fn test_failed_batch_leaves_set_untouched() {
        let mut rules = RuleSet::empty();
        let error = rules
            .extend([("f(a)", Template::text("ok")), ("[*a, *b]", Template::text("bad"))])
            .unwrap_err();
        assert!(matches!(error, RuleError::Pattern(PatternError::MultipleWildcards { .. })));
        assert!(rules.is_empty());
    }

    #[test]
    fn test_globals_apply_to_later_rules_only() {
        let mut rules = RuleSet::empty();
        rules.extend([("size(a)", Template::text("early #a"))]).unwrap();
        rules.extend_globals(["size"]);
        rules.extend([("size(a)", Template::text("late #a"))]).unwrap();

        assert_eq!(apply(&rules, &expression("size(q)")).1, "late q");
        assert_eq!(apply(&rules, &expression("count(q)")).1, "early q");
    }

    #[test]
    fn test_declined_callback_falls_through() {
        let mut rules = RuleSet::empty();
        rules.extend([("g(a)", Template::text("fallback #a"))]).unwrap();
        rules
            .extend([(
                "g(a)",
                Template::callback(|_, out| {
                    out.emit("discarded");
                    Ok(Outcome::Declined)
                }),
            )])
            .unwrap();
        assert_eq!(apply(&rules, &expression("g(z)")), (Some(0), "fallback z".to_string()));
    }

    #[test]
    fn test_no_rule_matches() {
        let rules = RuleSet::builtin().unwrap();
        assert_eq!(apply(&rules, &expression("x")), (None, String::new()));
    }

    #[test]
    fn test_patterns_directive() {
        let mut rules = RuleSet::empty();
        let node = statement(r#"PATTERNS = [("prepend(a, b)", r"\text{insert $#b$ at front of $#a$}")]"#);
        let directive = read_directive(&node).unwrap().unwrap();
        rules.apply(directive).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            apply(&rules, &expression("prepend(xs, y)")).1,
            r"\text{insert $y$ at front of $xs$}"
        );
    }

    #[test]
    fn test_globals_directive() {
        let mut rules = RuleSet::empty();
        let node = statement(r#"GLOBALS = "sorted  reversed".split()"#);
        let directive = read_directive(&node).unwrap().unwrap();
        assert_eq!(
            directive,
            Directive::Globals(vec!["sorted".to_string(), "reversed".to_string()])
        );
        rules.apply(directive).unwrap();
        assert!(rules.globals().contains("sorted"));

        assert_eq!(read_directive(&statement("OTHER = 1")).unwrap(), None);
        assert_eq!(read_directive(&statement("PATTERNS += x")).unwrap(), None);
    }

    #[test]
    fn test_malformed_tables() {
        let error = read_directive(&statement("PATTERNS = [('a', 1)]")).unwrap_err();
        assert!(matches!(error, RuleError::MalformedTable(_)));

        let error = read_directive(&statement("PATTERNS = load()")).unwrap_err();
        assert!(matches!(error, RuleError::MalformedTable(_)));

        let error = read_directive(&statement("GLOBALS = names.split()")).unwrap_err();
        assert_eq!(error, RuleError::MalformedGlobals);
    }
}
