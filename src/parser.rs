//! Parser for the reference language
//!
//! Parsing is a straightforward chumsky grammar over the token stream produced by
//! [`crate::lexer`]. Indentation has already been turned into `Indent` / `Dedent` tokens, so
//! blocks are delimited exactly like bracketed groups.
//!
//! Spans on every node are byte ranges into the parsed text. They are what makes
//! [`SyntaxNode::source_text`] and the line/caret frames of rendering diagnostics work.
//!
//! ## Entry points
//!
//! - [`parse_module`]: a whole source file, producing a `Module` node
//! - [`parse_snippet`]: a rule pattern; common leading indentation is removed first so that
//!   patterns can be written as indented multi-line strings

mod expressions;
mod statements;

use crate::error::ParseError;
use crate::lexer::{lex_with_spans, Token};
use crate::syntax::{NodeKind, SyntaxNode};
use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use chumsky::Stream;
use std::ops::Range;

/// Type alias for parser error
pub(crate) type ParserError = Simple<Token>;

/// Boxed parser producing one node
pub(crate) type NodeParser = BoxedParser<'static, Token, SyntaxNode, ParserError>;

/// Span from the start of `first` to the end of `last`
pub(crate) fn cover(first: &SyntaxNode, last: &SyntaxNode) -> Range<usize> {
    let start = first.span().map_or(0, |span| span.start);
    let end = last.span().map_or(start, |span| span.end);
    start..end
}

/// Parse a complete source file into a `Module` node
pub fn parse_module(source: &str) -> Result<SyntaxNode, ParseError> {
    let tokens = lex_with_spans(source)?;
    let eoi = source.len();

    let body = statements::statement()
        .repeated()
        .then_ignore(end())
        .parse(Stream::from_iter(eoi..eoi, tokens.into_iter()))
        .map_err(|errors| convert_errors(errors, eoi))?;

    Ok(SyntaxNode::new(NodeKind::Module)
        .with_list("body", body.into_iter().flatten().collect())
        .with_span(0..eoi))
}

/// Parse a rule pattern or a code fragment
///
/// The returned module's spans refer to the dedented text, which is returned alongside it.
pub fn parse_snippet(snippet: &str) -> Result<(SyntaxNode, String), ParseError> {
    let text = dedent(snippet);
    let module = parse_module(&text)?;
    Ok((module, text))
}

/// Remove the indentation shared by all non-blank lines
fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    if margin == 0 {
        return text.to_string();
    }

    text.lines()
        .map(|line| line.get(margin..).unwrap_or("").trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn convert_errors(errors: Vec<ParserError>, eoi: usize) -> ParseError {
    errors
        .into_iter()
        .next()
        .map(convert_error)
        .unwrap_or(ParseError::Syntax {
            span: eoi..eoi,
            message: "invalid syntax".to_string(),
        })
}

fn convert_error(error: ParserError) -> ParseError {
    let message = match error.reason() {
        SimpleReason::Custom(message) => message.clone(),
        SimpleReason::Unclosed { delimiter, .. } => format!("unclosed {}", delimiter),
        SimpleReason::Unexpected => match error.found() {
            Some(token) => format!("unexpected {}", token),
            None => "unexpected end of input".to_string(),
        },
    };
    ParseError::Syntax {
        span: error.span(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Operator, Scalar};

    fn statement(source: &str) -> SyntaxNode {
        let module = parse_module(source).unwrap();
        let body = module.list("body");
        assert_eq!(body.len(), 1, "expected one statement in {:?}", source);
        body[0].clone()
    }

    fn expression(source: &str) -> SyntaxNode {
        let node = statement(source);
        assert_eq!(node.kind(), NodeKind::Expr);
        node.node("value").unwrap().clone()
    }

    #[test]
    fn test_precedence() {
        let node = expression("a + b * c");
        assert_eq!(node.kind(), NodeKind::BinOp);
        assert_eq!(node.op("op"), Some(Operator::Add));
        assert_eq!(node.node("right").unwrap().op("op"), Some(Operator::Mult));

        let node = expression("-x ** 2");
        assert_eq!(node.kind(), NodeKind::UnaryOp);
        assert_eq!(node.node("operand").unwrap().op("op"), Some(Operator::Pow));
    }

    #[test]
    fn test_left_associativity() {
        let node = expression("a - b - c");
        assert_eq!(node.node("left").unwrap().kind(), NodeKind::BinOp);
        assert!(node.node("right").unwrap().is_name("c"));
    }

    #[test]
    fn test_chained_comparison() {
        let node = expression("a == a == a");
        assert_eq!(node.kind(), NodeKind::Compare);
        assert_eq!(
            node.scalar("ops"),
            Some(&Scalar::Ops(vec![Operator::Eq, Operator::Eq]))
        );
        assert_eq!(node.list("comparators").len(), 2);

        let node = expression("x not in s");
        assert_eq!(node.scalar("ops"), Some(&Scalar::Ops(vec![Operator::NotIn])));
    }

    #[test]
    fn test_boolean_operators_flatten() {
        let node = expression("a and b and not c");
        assert_eq!(node.kind(), NodeKind::BoolOp);
        assert_eq!(node.list("values").len(), 3);
        assert_eq!(node.list("values")[2].op("op"), Some(Operator::Not));
    }

    #[test]
    fn test_calls_and_starred_arguments() {
        let node = expression("f(a, *b, key=c)");
        assert_eq!(node.kind(), NodeKind::Call);
        assert_eq!(node.list("args").len(), 2);
        assert_eq!(node.list("args")[1].kind(), NodeKind::Starred);
        assert_eq!(node.list("keywords")[0].ident("arg"), Some("key"));
    }

    #[test]
    fn test_subscripts() {
        let node = expression("m[i, j]");
        assert_eq!(node.node("slice").unwrap().kind(), NodeKind::Tuple);

        let node = expression("a[1:]");
        let slice = node.node("slice").unwrap();
        assert_eq!(slice.kind(), NodeKind::Slice);
        assert!(slice.node("upper").is_none());
    }

    #[test]
    fn test_displays() {
        assert_eq!(expression("{}").kind(), NodeKind::Dict);
        assert_eq!(expression("{1, 2}").kind(), NodeKind::Set);
        assert_eq!(expression("()").kind(), NodeKind::Tuple);
        assert_eq!(expression("(a)").kind(), NodeKind::Name);
        assert_eq!(expression("(a,)").kind(), NodeKind::Tuple);
        assert_eq!(expression("[x for x in y if x]").kind(), NodeKind::ListComp);
        assert_eq!(expression("[[1, 2], [3, 4]]").list("elts").len(), 2);
    }

    #[test]
    fn test_assignments() {
        let node = statement("a, b = b, a");
        assert_eq!(node.kind(), NodeKind::Assign);
        assert_eq!(node.list("targets")[0].kind(), NodeKind::Tuple);

        let node = statement("x = y = 0");
        assert_eq!(node.list("targets").len(), 2);

        let node = statement("total += x");
        assert_eq!(node.kind(), NodeKind::AugAssign);
        assert_eq!(node.op("op"), Some(Operator::Add));
    }

    #[test]
    fn test_for_target_stops_before_in() {
        let node = statement("for i, x in enumerate(xs): pass");
        assert_eq!(node.kind(), NodeKind::For);
        assert_eq!(node.node("target").unwrap().kind(), NodeKind::Tuple);
        assert_eq!(node.node("iter").unwrap().kind(), NodeKind::Call);
    }

    #[test]
    fn test_elif_chain_nests_in_orelse() {
        let node = statement("if a:\n    x\nelif b:\n    y\nelse:\n    z\n");
        let orelse = node.list("orelse");
        assert_eq!(orelse.len(), 1);
        assert_eq!(orelse[0].kind(), NodeKind::If);
        assert_eq!(orelse[0].list("orelse").len(), 1);
        assert_eq!(orelse[0].list("orelse")[0].kind(), NodeKind::Expr);
    }

    #[test]
    fn test_function_definition() {
        let node = statement("def f(a, _b=1, *rest):\n    \"\"\"Doc.\"\"\"\n    return a\n");
        assert_eq!(node.kind(), NodeKind::FunctionDef);
        assert_eq!(node.ident("name"), Some("f"));
        let args = node.list("args");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1].ident("arg"), Some("_b"));
        assert_eq!(args[2].scalar("star"), Some(&Scalar::Int(1)));
        assert_eq!(node.list("body")[0].node("value").unwrap().str_value(), Some("Doc."));
    }

    #[test]
    fn test_try_statement() {
        let source = "try:\n    x = f()\nexcept (KeyError, ValueError) as e:\n    x = 0\nexcept:\n    raise\nelse:\n    y = x\nfinally:\n    done()\n";
        let node = statement(source);
        assert_eq!(node.kind(), NodeKind::Try);
        let handlers = node.list("handlers");
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].kind(), NodeKind::ExceptHandler);
        assert_eq!(handlers[0].node("type").unwrap().kind(), NodeKind::Tuple);
        assert_eq!(handlers[0].ident("name"), Some("e"));
        assert!(handlers[1].node("type").is_none());
        assert_eq!(handlers[1].list("body")[0].kind(), NodeKind::Raise);
        assert_eq!(node.list("orelse").len(), 1);
        assert_eq!(node.list("finalbody").len(), 1);

        assert!(parse_module("try:\n    x\ny = 1\n").is_err());
    }

    #[test]
    fn test_with_statement() {
        let node = statement("with open(path) as f, lock:\n    data = f.read()\n");
        assert_eq!(node.kind(), NodeKind::With);
        let items = node.list("items");
        assert_eq!(items.len(), 2);
        assert!(items[0].node("optional_vars").unwrap().is_name("f"));
        assert!(items[1].node("context_expr").unwrap().is_name("lock"));
        assert!(items[1].node("optional_vars").is_none());
        assert_eq!(node.list("body").len(), 1);
    }

    #[test]
    fn test_yield() {
        let node = expression("yield a, b");
        assert_eq!(node.kind(), NodeKind::Yield);
        assert_eq!(node.node("value").unwrap().kind(), NodeKind::Tuple);

        assert!(expression("yield").node("value").is_none());
        assert_eq!(expression("yield from xs").kind(), NodeKind::YieldFrom);

        let node = statement("x = yield y");
        assert_eq!(node.kind(), NodeKind::Assign);
        assert_eq!(node.node("value").unwrap().kind(), NodeKind::Yield);
    }

    #[test]
    fn test_simple_statements_share_a_line() {
        let module = parse_module("a = 1; b = 2\n").unwrap();
        assert_eq!(module.list("body").len(), 2);
    }

    #[test]
    fn test_source_text_from_spans() {
        let source = "while n < 1:\n    n = n + 1\n";
        let node = statement(source);
        let test = node.node("test").unwrap();
        assert_eq!(test.source_text(source), Some("n < 1"));
        let assign = &node.list("body")[0];
        assert_eq!(assign.node("value").unwrap().source_text(source), Some("n + 1"));
    }

    #[test]
    fn test_syntax_error_position() {
        let source = "x = 1\ny = (2";
        let error = parse_module(source).unwrap_err();
        assert!(matches!(error, ParseError::Syntax { .. }));
        assert_eq!(error.position(source).line, 1);
    }

    #[test]
    fn test_snippets_are_dedented() {
        let (module, text) = parse_snippet("\n    while True:\n        b\n").unwrap();
        assert_eq!(module.list("body")[0].kind(), NodeKind::While);
        assert!(text.contains("while True:"));
    }
}
