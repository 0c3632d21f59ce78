//! The renderer
//!
//! One recursive descent over the tree. Each node is offered to the rule set first; when no
//! rule handles it, the node is rendered by the fixed per-kind code below. Kinds without a
//! rendering are recorded, marked in the output and listed at the end of the module.
//!
//! A failure unwinds through [`Renderer::render`], which appends one [`Frame`] per enclosing
//! node so the caller can print a source back-trace. Inside a statement block the unwinding
//! stops at the failing statement: its partial output is rewound, a marker line takes its
//! place and the failure is kept in [`Renderer::failures`]. Only defects in the rules
//! themselves abort the whole module.

use super::names::{tex_function_name, tex_variable};
use super::operators::tex_operator;
use crate::error::{Diagnostic, Frame, RenderError, RuleError};
use crate::pattern::{Binding, Emit, Mark};
use crate::rules::{read_directive, RuleSet};
use crate::syntax::node::format_float;
use crate::syntax::{NodeKind, Scalar, SourceLocation, SyntaxNode};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub struct Renderer {
    rules: Arc<RuleSet>,
    out: String,
    unhandled: BTreeSet<&'static str>,
    hits: BTreeMap<usize, usize>,
    journal: Vec<Event>,
    failures: Vec<Diagnostic>,
    location: Option<SourceLocation>,
    dump_unhandled: bool,
}

/// Bookkeeping undone by [`Emit::rewind`]
#[derive(Debug, Clone, Copy)]
enum Event {
    Hit(usize),
    FirstUnhandled(&'static str),
    Failure,
}

impl Renderer {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            out: String::new(),
            unhandled: BTreeSet::new(),
            hits: BTreeMap::new(),
            journal: Vec::new(),
            failures: Vec::new(),
            location: None,
            dump_unhandled: false,
        }
    }

    /// Attach the source text the tree was parsed from, for back-traces
    pub fn with_source(mut self, source: &str) -> Self {
        self.set_source(source);
        self
    }

    pub fn set_source(&mut self, source: &str) {
        self.location = Some(SourceLocation::new(source));
    }

    /// Log every unhandled node with its source line, not just the first of each kind
    pub fn with_dump_unhandled(mut self, dump: bool) -> Self {
        self.dump_unhandled = dump;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The session's own rule set; cloned from the shared one on first write
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        Arc::make_mut(&mut self.rules)
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }

    /// Kinds that had no rendering, sorted by name
    pub fn unhandled(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.unhandled.iter().copied()
    }

    /// How often each rule fired, by rule ordinal
    pub fn hits(&self) -> &BTreeMap<usize, usize> {
        &self.hits
    }

    /// Statements that failed to render and were replaced by a marker, in output order
    pub fn failures(&self) -> &[Diagnostic] {
        &self.failures
    }

    pub fn take_failures(&mut self) -> Vec<Diagnostic> {
        self.journal.retain(|event| !matches!(event, Event::Failure));
        std::mem::take(&mut self.failures)
    }

    /// Render `node` and its subtree
    pub fn render(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        self.dispatch(node).map_err(|mut diagnostic| {
            diagnostic.frames.push(self.frame(node));
            diagnostic
        })
    }

    fn dispatch(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        let hit = Arc::clone(&self.rules).apply_first_match(node, self)?;
        match hit {
            Some(ordinal) => {
                *self.hits.entry(ordinal).or_default() += 1;
                self.journal.push(Event::Hit(ordinal));
                Ok(())
            }
            None => self.render_generic(node),
        }
    }

    fn frame(&self, node: &SyntaxNode) -> Frame {
        let location = self.location.as_ref();
        let position = node
            .span()
            .zip(location)
            .map(|(span, location)| location.byte_to_position(span.start));
        let line = position
            .zip(location)
            .and_then(|(position, location)| location.line_text(position.line))
            .map(str::to_string);
        Frame {
            kind: node.kind(),
            position,
            line,
        }
    }

    fn render_generic(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        match node.kind() {
            NodeKind::Module => self.render_module(node),
            NodeKind::FunctionDef => self.render_function(node),
            NodeKind::If => self.render_if(node, "IF"),
            NodeKind::For if node.list("orelse").is_empty() => {
                self.emit(r"\FOR{$");
                self.render(required(node, "target")?)?;
                self.emit(r" \in ");
                self.render(required(node, "iter")?)?;
                self.emit("$}\n");
                self.render_all(node.list("body"))?;
                self.emit("\\ENDFOR\n");
                Ok(())
            }
            NodeKind::While if node.list("orelse").is_empty() => {
                self.emit(r"\WHILE{$");
                self.render(required(node, "test")?)?;
                self.emit("$}\n");
                self.render_all(node.list("body"))?;
                self.emit("\\ENDWHILE\n");
                Ok(())
            }
            NodeKind::Expr => {
                let value = required(node, "value")?;
                match value.str_value() {
                    Some(text) => self.emit(&format!("\\STATE {}\n", text)),
                    None => {
                        self.emit(r"\STATE $");
                        self.render(value)?;
                        self.emit("$\n");
                    }
                }
                Ok(())
            }
            NodeKind::Assign => {
                self.emit(r"\STATE $");
                self.render_separated(node.list("targets"), ", ")?;
                self.emit(r" \gets ");
                self.render(required(node, "value")?)?;
                self.emit("$\n");
                Ok(())
            }
            NodeKind::AugAssign => {
                let op = node.op("op").ok_or(missing(node, "op"))?;
                self.emit(r"\STATE $");
                self.render(required(node, "target")?)?;
                self.emit(r"\mathbin{{");
                self.emit(tex_operator(op)?);
                self.emit(r"}{=}}");
                self.render(required(node, "value")?)?;
                self.emit("$\n");
                Ok(())
            }
            NodeKind::Return => {
                match node.node("value") {
                    Some(value) => {
                        self.emit(r"\RETURN $");
                        self.render(value)?;
                        self.emit("$\n");
                    }
                    None => self.emit("\\RETURN\n"),
                }
                Ok(())
            }
            NodeKind::Break => {
                self.emit("\\STATE \\textbf{break}\n");
                Ok(())
            }
            NodeKind::Continue => {
                self.emit("\\STATE \\textbf{continue}\n");
                Ok(())
            }
            NodeKind::Name => {
                let id = node.ident("id").ok_or(missing(node, "id"))?;
                self.emit(&tex_variable(id));
                Ok(())
            }
            NodeKind::Constant => self.render_constant(node),
            NodeKind::Attribute => {
                let attr = node.ident("attr").ok_or(missing(node, "attr"))?;
                self.render(required(node, "value")?)?;
                self.emit(". ");
                self.emit(&tex_variable(attr));
                self.emit(" ");
                Ok(())
            }
            NodeKind::Call => {
                self.render(required(node, "func")?)?;
                self.emit("(");
                let arguments: Vec<&SyntaxNode> = node
                    .list("args")
                    .iter()
                    .chain(node.list("keywords"))
                    .collect();
                for (index, argument) in arguments.into_iter().enumerate() {
                    if index > 0 {
                        self.emit(", ");
                    }
                    self.render(argument)?;
                }
                self.emit(")");
                Ok(())
            }
            NodeKind::Keyword => match node.ident("arg") {
                Some(arg) => {
                    self.emit(&tex_variable(arg));
                    self.emit(" = ");
                    self.render(required(node, "value")?)
                }
                None => {
                    self.mark_unhandled(node);
                    Ok(())
                }
            },
            NodeKind::Compare => {
                let ops = match node.scalar("ops") {
                    Some(Scalar::Ops(ops)) => ops.clone(),
                    _ => return Err(missing(node, "ops").into()),
                };
                self.render(required(node, "left")?)?;
                for (op, right) in ops.into_iter().zip(node.list("comparators")) {
                    self.emit(&format!(" {} ", tex_operator(op)?));
                    self.render(right)?;
                }
                Ok(())
            }
            NodeKind::BinOp => {
                let op = node.op("op").ok_or(missing(node, "op"))?;
                self.render(required(node, "left")?)?;
                self.emit(&format!(" {} ", tex_operator(op)?));
                self.render(required(node, "right")?)
            }
            NodeKind::BoolOp => {
                let op = node.op("op").ok_or(missing(node, "op"))?;
                let glyph = tex_operator(op)?;
                for (index, value) in node.list("values").iter().enumerate() {
                    if index > 0 {
                        self.emit(glyph);
                        self.emit(" ");
                    }
                    self.render(value)?;
                }
                Ok(())
            }
            NodeKind::UnaryOp => {
                let op = node.op("op").ok_or(missing(node, "op"))?;
                self.emit(tex_operator(op)?);
                self.render(required(node, "operand")?)
            }
            NodeKind::List => match matrix_rows(node) {
                Some(rows) => self.render_matrix(&rows),
                None => self.render_sequence(node.list("elts"), r"\langle ", r"\rangle "),
            },
            NodeKind::Tuple => self.render_sequence(node.list("elts"), "(", ")"),
            NodeKind::Set => self.render_sequence(node.list("elts"), r"\{", r"\}"),
            NodeKind::Subscript => {
                self.render(required(node, "value")?)?;
                self.emit("[");
                let slice = required(node, "slice")?;
                if slice.kind() == NodeKind::Tuple {
                    self.render_separated(slice.list("elts"), ", ")?;
                } else {
                    self.render(slice)?;
                }
                self.emit("]");
                Ok(())
            }
            NodeKind::For
            | NodeKind::While
            | NodeKind::ClassDef
            | NodeKind::Assert
            | NodeKind::Pass
            | NodeKind::Delete
            | NodeKind::Global
            | NodeKind::Nonlocal
            | NodeKind::Import
            | NodeKind::ImportFrom
            | NodeKind::Raise
            | NodeKind::Try
            | NodeKind::With
            | NodeKind::Slice
            | NodeKind::Dict
            | NodeKind::Starred
            | NodeKind::Lambda
            | NodeKind::IfExp
            | NodeKind::ListComp
            | NodeKind::SetComp
            | NodeKind::DictComp
            | NodeKind::GeneratorExp
            | NodeKind::Yield
            | NodeKind::YieldFrom
            | NodeKind::Comprehension
            | NodeKind::Arg
            | NodeKind::Alias
            | NodeKind::ExceptHandler
            | NodeKind::WithItem => {
                self.mark_unhandled(node);
                Ok(())
            }
        }
    }

    /// Top level: algorithms for public functions, rule directives, and the unhandled list
    fn render_module(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        for child in node.list("body") {
            if child.kind() == NodeKind::FunctionDef {
                self.render(child)?;
                continue;
            }
            let directive = read_directive(child).map_err(|error| self.rule_failure(child, error))?;
            if let Some(directive) = directive {
                let applied = self.rules_mut().apply(directive);
                applied.map_err(|error| self.rule_failure(child, error))?;
            }
        }

        if !self.unhandled.is_empty() {
            let kinds: Vec<&'static str> = self.unhandled().collect();
            self.emit("% Not handled:\n");
            for kind in kinds {
                self.emit(&format!("% {}\n", kind));
            }
        }
        Ok(())
    }

    fn rule_failure(&self, node: &SyntaxNode, error: RuleError) -> Diagnostic {
        let mut diagnostic = Diagnostic::from(RenderError::Rule(error));
        diagnostic.frames.push(self.frame(node));
        diagnostic
    }

    fn render_function(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        let name = node.ident("name").ok_or(missing(node, "name"))?;
        if name.starts_with('_') {
            return Ok(());
        }

        let parameters: Vec<String> = node
            .list("args")
            .iter()
            .filter(|arg| arg.scalar("star") == Some(&Scalar::Int(0)))
            .filter_map(|arg| arg.ident("arg"))
            .filter(|arg| !arg.starts_with('_'))
            .map(tex_variable)
            .collect();

        self.emit("\\begin{algorithm}\n");
        self.emit(&format!(
            "\\caption{{${}({})$}}\n",
            tex_function_name(name),
            parameters.join(", ")
        ));
        self.emit("\\begin{algorithmic}[1]\n");
        for (index, child) in node.list("body").iter().enumerate() {
            if index == 0 && is_docstring(child) {
                continue;
            }
            self.render_statement(child)?;
        }
        self.emit("\\end{algorithmic}\n\\end{algorithm}\n");
        Ok(())
    }

    /// An `elif` arrives as a lone nested `If` in the else branch. It is rendered here
    /// directly, so the whole chain closes with a single `\ENDIF`.
    fn render_if(&mut self, node: &SyntaxNode, role: &str) -> Result<(), Diagnostic> {
        self.emit(&format!("\\{}{{$", role));
        self.render(required(node, "test")?)?;
        self.emit("$}\n");
        self.render_all(node.list("body"))?;

        match node.list("orelse") {
            [] => {}
            [nested] if nested.kind() == NodeKind::If => return self.render_if(nested, "ELSIF"),
            orelse => {
                self.emit("\\ELSE\n");
                self.render_all(orelse)?;
            }
        }
        self.emit("\\ENDIF\n");
        Ok(())
    }

    fn render_constant(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        let text = match node.scalar("value") {
            Some(Scalar::Int(value)) => value.to_string(),
            Some(Scalar::Float(value)) => format_float(*value),
            Some(Scalar::Str(value)) if value.is_empty() => r"\emptystring ".to_string(),
            Some(Scalar::Str(value)) => format!(r"\verb+{}+", value),
            Some(Scalar::Bool(true)) => r"\textbf{true}".to_string(),
            Some(Scalar::Bool(false)) => r"\textbf{false}".to_string(),
            Some(Scalar::None) => r"\textsc{nil}".to_string(),
            Some(Scalar::Ellipsis) => {
                self.mark_unhandled(node);
                return Ok(());
            }
            _ => return Err(missing(node, "value").into()),
        };
        self.emit(&text);
        Ok(())
    }

    fn render_matrix(&mut self, rows: &[&[SyntaxNode]]) -> Result<(), Diagnostic> {
        self.emit("\\begin{pmatrix}\n");
        for row in rows {
            for (index, cell) in row.iter().enumerate() {
                if index > 0 {
                    self.emit("& ");
                }
                if is_number(cell) {
                    self.emit(r"\phantom{-}");
                }
                self.render(cell)?;
            }
            self.emit("\\\\\n");
        }
        self.emit("\\end{pmatrix}\n");
        Ok(())
    }

    fn render_sequence(
        &mut self,
        elements: &[SyntaxNode],
        left: &str,
        right: &str,
    ) -> Result<(), Diagnostic> {
        self.emit(left);
        self.render_separated(elements, ", ")?;
        self.emit(right);
        Ok(())
    }

    fn render_separated(&mut self, nodes: &[SyntaxNode], separator: &str) -> Result<(), Diagnostic> {
        for (index, node) in nodes.iter().enumerate() {
            if index > 0 {
                self.emit(separator);
            }
            self.render(node)?;
        }
        Ok(())
    }

    fn render_all(&mut self, nodes: &[SyntaxNode]) -> Result<(), Diagnostic> {
        nodes.iter().try_for_each(|node| self.render_statement(node))
    }

    /// Render one statement of a block, containing recoverable failures to it
    fn render_statement(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        let mark = self.mark();
        match self.render(node) {
            Err(diagnostic) if diagnostic.error.is_recoverable() => {
                tracing::debug!(
                    kind = %node.kind(),
                    error = %diagnostic.error,
                    "statement not rendered"
                );
                self.rewind(mark);
                self.emit(&format!("\\STATE \\text{{[{} not rendered]}}\n", node.kind()));
                self.failures.push(diagnostic);
                self.journal.push(Event::Failure);
                Ok(())
            }
            result => result,
        }
    }

    fn mark_unhandled(&mut self, node: &SyntaxNode) {
        let kind = node.kind();
        let first = self.unhandled.insert(kind.name());
        if first {
            self.journal.push(Event::FirstUnhandled(kind.name()));
        }
        if self.dump_unhandled {
            tracing::warn!("{}\n{} unhandled", self.frame(node), kind);
        } else if first {
            tracing::warn!(kind = kind.name(), "no rendering for node kind");
        }

        if kind.is_statement() {
            self.emit(&format!("\\STATE \\text{{[{}]}}\n", kind));
        } else {
            self.emit(&format!("\\text{{[{}]}}", kind));
        }
    }
}

impl Emit for Renderer {
    fn emit(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn render(&mut self, node: &SyntaxNode) -> Result<(), Diagnostic> {
        Renderer::render(self, node)
    }

    fn mark(&self) -> Mark {
        Mark {
            output: self.out.len(),
            journal: self.journal.len(),
        }
    }

    fn rewind(&mut self, mark: Mark) {
        self.out.truncate(mark.output);
        let undone = self.journal.split_off(mark.journal.min(self.journal.len()));
        for event in undone.into_iter().rev() {
            match event {
                Event::Hit(ordinal) => {
                    if let Some(count) = self.hits.get_mut(&ordinal) {
                        *count -= 1;
                        if *count == 0 {
                            self.hits.remove(&ordinal);
                        }
                    }
                }
                Event::FirstUnhandled(kind) => {
                    self.unhandled.remove(kind);
                }
                Event::Failure => {
                    self.failures.pop();
                }
            }
        }
    }

    /// Statement blocks captured by a rule keep failures local to each statement
    fn render_binding(&mut self, binding: Binding<'_>) -> Result<(), Diagnostic> {
        match binding {
            Binding::Node(node) => Renderer::render(self, node),
            Binding::List(nodes) if nodes.iter().all(|node| node.kind().is_statement()) => {
                self.render_all(nodes)
            }
            Binding::List(nodes) => nodes.iter().try_for_each(|node| Renderer::render(self, node)),
        }
    }
}

fn missing(node: &SyntaxNode, field: &'static str) -> RenderError {
    RenderError::MissingField {
        kind: node.kind(),
        field,
    }
}

fn required<'n>(node: &'n SyntaxNode, field: &'static str) -> Result<&'n SyntaxNode, Diagnostic> {
    node.node(field).ok_or_else(|| missing(node, field).into())
}

fn is_docstring(node: &SyntaxNode) -> bool {
    node.kind() == NodeKind::Expr && node.node("value").and_then(SyntaxNode::str_value).is_some()
}

fn is_number(node: &SyntaxNode) -> bool {
    matches!(
        node.scalar("value"),
        Some(Scalar::Int(_) | Scalar::Float(_))
    ) && node.kind() == NodeKind::Constant
}

/// Rows of a non-empty list whose elements are lists of one common length
fn matrix_rows(node: &SyntaxNode) -> Option<Vec<&[SyntaxNode]>> {
    let rows = node
        .list("elts")
        .iter()
        .map(|row| (row.kind() == NodeKind::List).then(|| row.list("elts")))
        .collect::<Option<Vec<_>>>()?;
    let width = rows.first()?.len();
    rows.iter().all(|row| row.len() == width).then_some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;
    use crate::pattern::{Outcome, Template};

    fn render_with(rules: Arc<RuleSet>, source: &str) -> Result<String, Diagnostic> {
        let module = parse_module(source).unwrap();
        let mut renderer = Renderer::new(rules).with_source(source);
        for statement in module.list("body") {
            renderer.render(statement)?;
        }
        Ok(renderer.into_output())
    }

    fn render(source: &str) -> String {
        render_with(RuleSet::builtin().unwrap(), source).unwrap()
    }

    #[test]
    fn test_simple_statements() {
        assert_eq!(render("assert 42"), "\\STATE $\\{42\\}$\n");
        assert_eq!(render("return 42"), "\\RETURN $42$\n");
        assert_eq!(render("return"), "\\RETURN\n");
        assert_eq!(render("continue"), "\\STATE \\textbf{continue}\n");
        assert_eq!(render("break"), "\\STATE \\textbf{break}\n");
        assert_eq!(render("total += x"), "\\STATE $\\textit{total}\\mathbin{{+}{=}}x$\n");
        assert_eq!(render("a, b = b, a"), "\\STATE $(a, b) \\gets (b, a)$\n");
        assert_eq!(render("i = j = 0"), "\\STATE $i, j \\gets 0$\n");
        assert_eq!(render("'Swap the halves.'"), "\\STATE Swap the halves.\n");
    }

    #[test]
    fn test_ranges() {
        assert_eq!(
            render("for x in range(n + 1): c"),
            "\\FOR{$x = 0$ \\TO $n$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for x in range(n): c"),
            "\\FOR{$x = 0$ \\TO $n - 1$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for x in range(a, n + 1): c"),
            "\\FOR{$x = a$ \\TO $n$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for x in range(a, n): c"),
            "\\FOR{$x = a$ \\TO $n - 1$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for x in range(a, n + 1, s): c"),
            "\\FOR{$x = a$ \\TO $n$ skipping $s$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for x in range(a, n, s): c"),
            "\\FOR{$x = a$ \\TO $n - 1$ skipping $s$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for x in range(10, n - 1, -1): c"),
            "\\FOR{$x = 10$ \\DOWNTO $n$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for x in range(10, n, -1): c"),
            "\\FOR{$x = 10$ \\DOWNTO $n + 1$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for a in b: c"),
            "\\FOR{$a \\in b$}\n\\STATE $c$\n\\ENDFOR\n"
        );
    }

    #[test]
    fn test_negative_steps() {
        assert_eq!(
            render("for i in range(n, k - 1, -2): c"),
            "\\FOR{$i = n$ \\DOWNTO $k$ skipping $2$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        assert_eq!(
            render("for i in range(n, 0, -3): c"),
            "\\FOR{$i = n$ \\DOWNTO $0 + 1$ skipping $3$}\n\\STATE $c$\n\\ENDFOR\n"
        );
        // A positive step is declined by the descending rules and rendered as "skipping"
        assert_eq!(
            render("for i in range(a, n, 2): c"),
            "\\FOR{$i = a$ \\TO $n - 1$ skipping $2$}\n\\STATE $c$\n\\ENDFOR\n"
        );
    }

    #[test]
    fn test_while_and_loop() {
        assert_eq!(
            render("while n < 1: n = n + 1"),
            "\\WHILE{$n < 1$}\n\\STATE $n \\gets n + 1$\n\\ENDWHILE\n"
        );
        assert_eq!(
            render("while True:\n    x = 1\n"),
            "\\LOOP\n\\STATE $x \\gets 1$\n\\ENDLOOP\n"
        );
    }

    #[test]
    fn test_if_elif_else_closes_once() {
        let source = "if a < b:\n    x = 1\nelif a > b:\n    x = 2\nelse:\n    x = 3\n";
        assert_eq!(
            render(source),
            "\\IF{$a < b$}\n\\STATE $x \\gets 1$\n\
             \\ELSIF{$a > b$}\n\\STATE $x \\gets 2$\n\
             \\ELSE\n\\STATE $x \\gets 3$\n\
             \\ENDIF\n"
        );
    }

    #[test]
    fn test_nested_if_keeps_its_own_terminator() {
        let source = "if a:\n    if b:\n        x = 1\n    elif c:\n        x = 2\nelse:\n    x = 3\n";
        let output = render(source);
        assert_eq!(output.matches("\\ENDIF").count(), 2);
        assert_eq!(output.matches("\\ELSIF").count(), 1);
        assert_eq!(output.matches("\\ELSE\n").count(), 1);
    }

    #[test]
    fn test_expressions() {
        assert_eq!(
            render("x = a and b or not c"),
            "\\STATE $x \\gets a\\land b\\lor \\text{not }c$\n"
        );
        assert_eq!(render("y = n % 2 == 0"), "\\STATE $y \\gets n \\bmod 2 \\eq 0$\n");
        assert_eq!(render("z = -x"), "\\STATE $z \\gets {-}x$\n");
        assert_eq!(render("s = a | b"), "\\STATE $s \\gets a \\cup b$\n");
        assert_eq!(
            render("t = v not in seen"),
            "\\STATE $t \\gets v \\not\\in \\textit{seen}$\n"
        );
        assert_eq!(
            render("x = len(a) // 2"),
            "\\STATE $x \\gets \\lfloor |a| / 2 \\rfloor $\n"
        );
        assert_eq!(render("x = float('inf')"), "\\STATE $x \\gets \\infty$\n");
        assert_eq!(render("x = min(a, b)"), "\\STATE $x \\gets \\min\\{a, b\\}$\n");
    }

    #[test]
    fn test_calls_and_access() {
        assert_eq!(
            render("xs.append(y)"),
            "\\STATE $\\text{insert $y$ at the end of $\\textit{xs}$}$\n"
        );
        assert_eq!(render("print(v)"), "\\STATE $\\text{output $v$}$\n");
        assert_eq!(render("g()"), "\\STATE $g()$\n");
        assert_eq!(render("f(x, key=k)"), "\\STATE $f(x, \\textit{key} = k)$\n");
        assert_eq!(
            render("u = self.size"),
            "\\STATE $u \\gets \\textit{self}. \\textit{size} $\n"
        );
        assert_eq!(render("v = m[i, j]"), "\\STATE $v \\gets m[i, j]$\n");
    }

    #[test]
    fn test_literals() {
        assert_eq!(render("a = 'hi'"), "\\STATE $a \\gets \\verb+hi+$\n");
        assert_eq!(render("a = ''"), "\\STATE $a \\gets \\emptystring $\n");
        assert_eq!(render("a = True"), "\\STATE $a \\gets \\textbf{true}$\n");
        assert_eq!(render("a = None"), "\\STATE $a \\gets \\textsc{nil}$\n");
        assert_eq!(render("a = 1.5"), "\\STATE $a \\gets 1.5$\n");
        assert_eq!(render("d = {}"), "\\STATE $d \\gets \\text{empty dictionary}$\n");
        assert_eq!(render("p = (a, b)"), "\\STATE $p \\gets (a, b)$\n");
        assert_eq!(render("q = {a, b}"), "\\STATE $q \\gets \\{a, b\\}$\n");
        assert_eq!(render("r = [a, b]"), "\\STATE $r \\gets \\langle a, b\\rangle $\n");
    }

    #[test]
    fn test_matrix() {
        assert_eq!(
            render("m = [[1, 2], [3, x]]"),
            "\\STATE $m \\gets \\begin{pmatrix}\n\
             \\phantom{-}1& \\phantom{-}2\\\\\n\
             \\phantom{-}3& x\\\\\n\
             \\end{pmatrix}\n$\n"
        );
        assert_eq!(
            render("m = [[1], [2, 3]]"),
            "\\STATE $m \\gets \\langle \\langle 1\\rangle , \\langle 2, 3\\rangle \\rangle $\n"
        );
    }

    #[test]
    fn test_unhandled_kinds_are_marked() {
        let source = "def f():\n    pass\n    x = lambda: 0\n    for a in b:\n        c\n    else:\n        d\n";
        let module = parse_module(source).unwrap();
        let mut renderer = Renderer::new(RuleSet::builtin().unwrap());
        renderer.render(&module).unwrap();
        let output = renderer.output();
        assert!(output.contains("\\STATE \\text{[Pass]}\n"));
        assert!(output.contains("\\STATE $x \\gets \\text{[Lambda]}$\n"));
        assert!(output.contains("\\STATE \\text{[For]}\n"));
        assert!(output.ends_with("% Not handled:\n% For\n% Lambda\n% Pass\n"));
        assert_eq!(renderer.unhandled().collect::<Vec<_>>(), vec!["For", "Lambda", "Pass"]);
    }

    #[test]
    fn test_exception_and_context_statements_are_marked() {
        let source = "def f(p):\n    with open(p) as fh:\n        x = 1\n    try:\n        y = 2\n    except KeyError:\n        y = 3\n    yield x\n";
        let module = parse_module(source).unwrap();
        let mut renderer = Renderer::new(RuleSet::builtin().unwrap());
        renderer.render(&module).unwrap();
        let output = renderer.output();
        assert!(output.contains("\\STATE \\text{[With]}\n\\STATE \\text{[Try]}\n"));
        assert!(output.contains("\\STATE $\\text{[Yield]}$\n"));
        assert!(output.ends_with("% Not handled:\n% Try\n% With\n% Yield\n"));
    }

    #[test]
    fn test_failures_stay_local_to_their_statement() {
        let source = "def f(n):\n    while n > 0:\n        m = n ** 2\n        n = n - 1\n    for i in xs:\n        k = -i ** 2\n    return n\n";
        let module = parse_module(source).unwrap();
        let mut renderer = Renderer::new(RuleSet::builtin().unwrap()).with_source(source);
        renderer.render(&module).unwrap();
        assert_eq!(
            renderer.output(),
            "\\begin{algorithm}\n\
             \\caption{$\\textsc{F}(n)$}\n\
             \\begin{algorithmic}[1]\n\
             \\WHILE{$n > 0$}\n\
             \\STATE \\text{[Assign not rendered]}\n\
             \\STATE $n \\gets n - 1$\n\
             \\ENDWHILE\n\
             \\FOR{$i \\in \\textit{xs}$}\n\
             \\STATE \\text{[Assign not rendered]}\n\
             \\ENDFOR\n\
             \\RETURN $n$\n\
             \\end{algorithmic}\n\
             \\end{algorithm}\n"
        );
        let lines: Vec<_> = renderer
            .failures()
            .iter()
            .map(|failure| failure.innermost().and_then(|frame| frame.position).map(|p| p.line))
            .collect();
        assert_eq!(lines, vec![Some(2), Some(5)]);
        assert_eq!(renderer.take_failures().len(), 2);
        assert!(renderer.failures().is_empty());
    }

    #[test]
    fn test_declined_callback_leaves_no_trace() {
        let builtin = RuleSet::builtin().unwrap();
        let fallback = builtin.len();
        let len_rule = builtin
            .rules()
            .find(|rule| rule.describe() == "len(a)")
            .unwrap()
            .ordinal();

        let mut rules = (*builtin).clone();
        rules.extend([("g(a, b)", Template::text("fallback"))]).unwrap();
        rules
            .extend([(
                "g(a, b)",
                Template::callback(|bindings, out| {
                    for name in ["a", "b"] {
                        if let Some(binding) = bindings.get(name) {
                            out.render_binding(*binding)?;
                        }
                    }
                    Ok(Outcome::Declined)
                }),
            )])
            .unwrap();

        let module = parse_module("g(len(x), lambda: 0)").unwrap();
        let mut renderer = Renderer::new(Arc::new(rules));
        renderer.render(&module.list("body")[0]).unwrap();
        assert_eq!(renderer.output(), "\\STATE $fallback$\n");
        assert_eq!(renderer.hits().get(&len_rule), None);
        assert_eq!(renderer.hits().get(&fallback), Some(&1));
        assert_eq!(renderer.unhandled().count(), 0);
    }

    #[test]
    fn test_module() {
        let source = r#""""Module docstring."""
GLOBALS = "swap".split()
PATTERNS = [("swap(a, b)", r"\text{swap $#a$ and $#b$}")]

def _helper(x):
    return x

def insertion_sort(A, _n):
    """Sort in place."""
    for j in range(1, len(A)):
        swap(A[j], A[j - 1])
    return A
"#;
        let module = parse_module(source).unwrap();
        let mut renderer = Renderer::new(RuleSet::builtin().unwrap()).with_source(source);
        renderer.render(&module).unwrap();
        assert_eq!(
            renderer.output(),
            "\\begin{algorithm}\n\
             \\caption{$\\textsc{Insertion-Sort}(A)$}\n\
             \\begin{algorithmic}[1]\n\
             \\FOR{$j = 1$ \\TO $|A| - 1$}\n\
             \\STATE $\\text{swap $A[j]$ and $A[j - 1]$}$\n\
             \\ENDFOR\n\
             \\RETURN $A$\n\
             \\end{algorithmic}\n\
             \\end{algorithm}\n"
        );
        assert!(renderer.rules().globals().contains("swap"));
        assert_eq!(renderer.rules().len(), RuleSet::builtin().unwrap().len() + 1);
    }

    #[test]
    fn test_hits_count_rule_ordinals() {
        let module = parse_module("def f(n):\n    return len(n) + len(n)\n").unwrap();
        let rules = RuleSet::builtin().unwrap();
        let len_rule = rules
            .rules()
            .find(|rule| rule.describe() == "len(a)")
            .unwrap()
            .ordinal();
        let mut renderer = Renderer::new(rules);
        renderer.render(&module).unwrap();
        assert_eq!(renderer.hits().get(&len_rule), Some(&2));
    }

    #[test]
    fn test_unsupported_operator_reports_frames() {
        let source = "x = 1\ny = x ** 2\n";
        let error = render_with(RuleSet::builtin().unwrap(), source).unwrap_err();
        assert_eq!(error.error, RenderError::OperatorNotSupported(crate::syntax::Operator::Pow));
        let innermost = error.innermost().unwrap();
        assert_eq!(innermost.kind, NodeKind::BinOp);
        assert_eq!(innermost.position.map(|p| (p.line, p.column)), Some((1, 4)));
        assert_eq!(innermost.line.as_deref(), Some("y = x ** 2"));
        assert_eq!(error.frames.last().unwrap().kind, NodeKind::Assign);
    }

    #[test]
    fn test_unbound_placeholder_aborts() {
        let mut rules = RuleSet::empty();
        rules.extend([("f(a)", Template::text("#b"))]).unwrap();
        let error = render_with(Arc::new(rules), "f(x)").unwrap_err();
        assert!(matches!(error.error, RenderError::UnboundPlaceholder { .. }));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let source = "def f(a):\n    while a:\n        a = a - 1\n    return a\n";
        let module = parse_module(source).unwrap();
        let rules = RuleSet::builtin().unwrap();
        let mut first = Renderer::new(Arc::clone(&rules));
        first.render(&module).unwrap();
        let mut second = Renderer::new(rules);
        second.render(&module).unwrap();
        assert_eq!(first.output(), second.output());
    }

    #[test]
    fn test_without_rules_generic_forms_render() {
        let output = render_with(
            Arc::new(RuleSet::empty()),
            "for x in xs:\n    continue\nwhile c:\n    break\n",
        )
        .unwrap();
        assert_eq!(
            output,
            "\\FOR{$x \\in \\textit{xs}$}\n\\STATE \\textbf{continue}\n\\ENDFOR\n\
             \\WHILE{$c$}\n\\STATE \\textbf{break}\n\\ENDWHILE\n"
        );
    }
}
