//! Statement grammar
//!
//! A statement parser yields a `Vec` because one logical line may hold several simple
//! statements separated by `;`. Compound statements own a suite, which is either the rest of
//! the header line or an indented block between `Indent` and `Dedent`.
//!
//! `elif` chains are folded here: `if a: x elif b: y else: z` becomes an `If` whose `orelse`
//! is a single nested `If`, the same shape a hand-nested `else: if` produces.

use super::expressions::{expressions, Expressions};
use super::ParserError;
use crate::lexer::Token;
use crate::syntax::{Field, NodeKind, Operator, Scalar, SyntaxNode};
use chumsky::prelude::*;
use std::ops::Range;

type StatementsParser = BoxedParser<'static, Token, Vec<SyntaxNode>, ParserError>;

fn identifier() -> impl Parser<Token, String, Error = ParserError> + Clone {
    select! { Token::Name(id) => id }
}

/// Dotted module path, keeping leading dots of relative imports
fn dotted_name() -> impl Parser<Token, String, Error = ParserError> + Clone {
    identifier()
        .separated_by(just(Token::Dot))
        .at_least(1)
        .map(|parts| parts.join("."))
}

fn simple_statement(
    expressions: &Expressions,
) -> impl Parser<Token, SyntaxNode, Error = ParserError> + Clone {
    let Expressions {
        test,
        testlist,
        targets,
    } = expressions.clone();

    let keyword = select! {
        Token::Pass => NodeKind::Pass,
        Token::Break => NodeKind::Break,
        Token::Continue => NodeKind::Continue,
    }
    .map(SyntaxNode::new);

    let return_statement = just(Token::Return)
        .ignore_then(testlist.clone().or_not())
        .map(|value| SyntaxNode::new(NodeKind::Return).with_optional("value", value));

    let delete = just(Token::Del)
        .ignore_then(
            targets
                .clone()
                .map(|target| match target.kind() {
                    NodeKind::Tuple => target.list("elts").to_vec(),
                    _ => vec![target],
                }),
        )
        .map(|targets| SyntaxNode::new(NodeKind::Delete).with_list("targets", targets));

    let names = identifier()
        .map_with_span(|id, span| SyntaxNode::name(id).with_span(span))
        .separated_by(just(Token::Comma))
        .at_least(1);
    let global = just(Token::Global)
        .ignore_then(names.clone())
        .map(|names| SyntaxNode::new(NodeKind::Global).with_list("names", names));
    let nonlocal = just(Token::Nonlocal)
        .ignore_then(names)
        .map(|names| SyntaxNode::new(NodeKind::Nonlocal).with_list("names", names));

    let alias = |path: BoxedParser<'static, Token, String, ParserError>| {
        path.then(just(Token::As).ignore_then(identifier()).or_not())
            .map_with_span(|(name, asname), span| {
                let node = SyntaxNode::new(NodeKind::Alias).with_scalar("name", Scalar::Ident(name));
                let node = match asname {
                    Some(asname) => node.with_scalar("asname", Scalar::Ident(asname)),
                    None => node.with("asname", Field::Absent),
                };
                node.with_span(span)
            })
    };
    let import = just(Token::Import)
        .ignore_then(
            alias(dotted_name().boxed())
                .separated_by(just(Token::Comma))
                .at_least(1),
        )
        .map(|names| SyntaxNode::new(NodeKind::Import).with_list("names", names));

    let relative = select! {
        Token::Dot => ".",
        Token::Ellipsis => "...",
    }
    .repeated()
    .map(|dots: Vec<&str>| dots.concat());
    let module = relative
        .then(dotted_name().or_not())
        .map(|(dots, path)| format!("{}{}", dots, path.unwrap_or_default()));
    let star = just(Token::Star).map_with_span(|_, span| {
        SyntaxNode::new(NodeKind::Alias)
            .with_scalar("name", Scalar::Ident("*".to_string()))
            .with("asname", Field::Absent)
            .with_span(span)
    });
    let imported = alias(identifier().boxed())
        .separated_by(just(Token::Comma))
        .at_least(1)
        .allow_trailing();
    let import_from = just(Token::From)
        .ignore_then(module)
        .then_ignore(just(Token::Import))
        .then(choice((
            star.map(|alias| vec![alias]),
            imported
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen)),
            imported,
        )))
        .map(|(module, names)| {
            SyntaxNode::new(NodeKind::ImportFrom)
                .with_scalar("module", Scalar::Ident(module))
                .with_list("names", names)
        });

    let raise = just(Token::Raise)
        .ignore_then(
            test.clone()
                .then(just(Token::From).ignore_then(test.clone()).or_not())
                .or_not(),
        )
        .map(|operands| {
            let (exc, cause) = match operands {
                Some((exc, cause)) => (Some(exc), cause),
                None => (None, None),
            };
            SyntaxNode::new(NodeKind::Raise)
                .with_optional("exc", exc)
                .with_optional("cause", cause)
        });

    let assert = just(Token::Assert)
        .ignore_then(test.clone())
        .then(just(Token::Comma).ignore_then(test.clone()).or_not())
        .map(|(condition, msg)| {
            SyntaxNode::new(NodeKind::Assert)
                .with_node("test", condition)
                .with_optional("msg", msg)
        });

    // Expression statements, assignments and augmented assignments
    let augmented = filter_map(|span: Range<usize>, token| match token {
        Token::AugAssign(symbol) => Operator::from_augmented(&symbol)
            .ok_or_else(|| ParserError::custom(span, format!("unknown operator `{}`", symbol))),
        other => Err(ParserError::expected_input_found(
            span,
            Vec::new(),
            Some(other),
        )),
    });
    // yield [testlist] | yield from test
    let yield_expression = just(Token::Yield)
        .ignore_then(choice((
            just(Token::From)
                .ignore_then(test.clone())
                .map(|value| SyntaxNode::new(NodeKind::YieldFrom).with_node("value", value)),
            testlist
                .clone()
                .or_not()
                .map(|value| SyntaxNode::new(NodeKind::Yield).with_optional("value", value)),
        )))
        .map_with_span(|node, span| node.with_span(span));
    let value = yield_expression.clone().or(testlist.clone());

    let expression_statement = testlist
        .clone()
        .then(choice((
            augmented
                .then(value.clone())
                .map(|(op, value)| Assignment::Augmented(op, value)),
            just(Token::Assign)
                .ignore_then(value)
                .repeated()
                .at_least(1)
                .map(Assignment::Chain),
            empty().to(Assignment::Bare),
        )))
        .map(|(first, assignment)| match assignment {
            Assignment::Augmented(op, value) => SyntaxNode::new(NodeKind::AugAssign)
                .with_node("target", first)
                .with_scalar("op", Scalar::Op(op))
                .with_node("value", value),
            Assignment::Chain(mut rest) => {
                let value = rest.pop();
                let mut targets = vec![first];
                targets.extend(rest);
                SyntaxNode::new(NodeKind::Assign)
                    .with_list("targets", targets)
                    .with_optional("value", value)
            }
            Assignment::Bare => SyntaxNode::new(NodeKind::Expr).with_node("value", first),
        });

    choice((
        keyword,
        return_statement,
        delete,
        global,
        nonlocal,
        import,
        import_from,
        raise,
        assert,
        yield_expression.map(|value| SyntaxNode::new(NodeKind::Expr).with_node("value", value)),
        expression_statement,
    ))
    .map_with_span(|node, span| node.with_span(span))
}

#[derive(Clone)]
enum Assignment {
    Augmented(Operator, SyntaxNode),
    Chain(Vec<SyntaxNode>),
    Bare,
}

/// One statement line: `small (";" small)* [";"] NEWLINE`
fn simple_line(expressions: &Expressions) -> StatementsParser {
    simple_statement(expressions)
        .separated_by(just(Token::Semicolon))
        .at_least(1)
        .allow_trailing()
        .then_ignore(just(Token::Newline))
        .boxed()
}

/// One statement; a simple-statement line may produce several nodes
pub(super) fn statement() -> StatementsParser {
    let expressions = expressions();

    recursive(|statement: Recursive<Token, Vec<SyntaxNode>, ParserError>| {
        let Expressions {
            test,
            testlist,
            targets,
        } = expressions.clone();

        let block = just(Token::Newline)
            .ignore_then(just(Token::Indent))
            .ignore_then(statement.repeated().at_least(1))
            .then_ignore(just(Token::Dedent))
            .map(|statements| statements.into_iter().flatten().collect::<Vec<_>>());
        let suite = just(Token::Colon)
            .ignore_then(simple_line(&expressions).or(block))
            .boxed();
        let orelse = just(Token::Else).ignore_then(suite.clone()).or_not();

        let if_statement = just(Token::If)
            .ignore_then(test.clone())
            .then(suite.clone())
            .then(
                just(Token::Elif)
                    .ignore_then(test.clone())
                    .then(suite.clone())
                    .map_with_span(|(condition, body), span: Range<usize>| (condition, body, span))
                    .repeated(),
            )
            .then(orelse.clone())
            .map_with_span(|(((condition, body), elifs), orelse), span: Range<usize>| {
                let mut orelse = orelse.unwrap_or_default();
                for (condition, body, elif_span) in elifs.into_iter().rev() {
                    let nested = SyntaxNode::new(NodeKind::If)
                        .with_node("test", condition)
                        .with_list("body", body)
                        .with_list("orelse", orelse)
                        .with_span(elif_span.start..span.end);
                    orelse = vec![nested];
                }
                SyntaxNode::new(NodeKind::If)
                    .with_node("test", condition)
                    .with_list("body", body)
                    .with_list("orelse", orelse)
            });

        let while_statement = just(Token::While)
            .ignore_then(test.clone())
            .then(suite.clone())
            .then(orelse.clone())
            .map(|((condition, body), orelse)| {
                SyntaxNode::new(NodeKind::While)
                    .with_node("test", condition)
                    .with_list("body", body)
                    .with_list("orelse", orelse.unwrap_or_default())
            });

        let for_statement = just(Token::For)
            .ignore_then(targets)
            .then_ignore(just(Token::In))
            .then(testlist.clone())
            .then(suite.clone())
            .then(orelse.clone())
            .map(|(((target, iter), body), orelse)| {
                SyntaxNode::new(NodeKind::For)
                    .with_node("target", target)
                    .with_node("iter", iter)
                    .with_list("body", body)
                    .with_list("orelse", orelse.unwrap_or_default())
            });

        // try: suite (except [test [as name]]: suite)* [else: suite] [finally: suite]
        let handler = just(Token::Except)
            .ignore_then(
                test.clone()
                    .then(just(Token::As).ignore_then(identifier()).or_not())
                    .or_not(),
            )
            .then(suite.clone())
            .map_with_span(|(clause, body), span: Range<usize>| {
                let (exception, name) = match clause {
                    Some((exception, name)) => (Some(exception), name),
                    None => (None, None),
                };
                let handler =
                    SyntaxNode::new(NodeKind::ExceptHandler).with_optional("type", exception);
                let handler = match name {
                    Some(name) => handler.with_scalar("name", Scalar::Ident(name)),
                    None => handler.with("name", Field::Absent),
                };
                handler.with_list("body", body).with_span(span)
            });
        let try_statement = just(Token::Try)
            .ignore_then(suite.clone())
            .then(handler.repeated())
            .then(orelse)
            .then(just(Token::Finally).ignore_then(suite.clone()).or_not())
            .try_map(|(((body, handlers), orelse), finalbody), span| {
                if handlers.is_empty() && finalbody.is_none() {
                    return Err(ParserError::custom(span, "expected `except` or `finally`"));
                }
                Ok(SyntaxNode::new(NodeKind::Try)
                    .with_list("body", body)
                    .with_list("handlers", handlers)
                    .with_list("orelse", orelse.unwrap_or_default())
                    .with_list("finalbody", finalbody.unwrap_or_default()))
            });

        // with item ("," item)*: suite
        let with_item = test
            .clone()
            .then(just(Token::As).ignore_then(test.clone()).or_not())
            .map_with_span(|(context, target), span: Range<usize>| {
                SyntaxNode::new(NodeKind::WithItem)
                    .with_node("context_expr", context)
                    .with_optional("optional_vars", target)
                    .with_span(span)
            });
        let with_statement = just(Token::With)
            .ignore_then(with_item.separated_by(just(Token::Comma)).at_least(1))
            .then(suite.clone())
            .map(|(items, body)| {
                SyntaxNode::new(NodeKind::With)
                    .with_list("items", items)
                    .with_list("body", body)
            });

        // def name(a, b=1, *rest, **options) -> annotation: suite
        let annotation = just(Token::Colon).ignore_then(test.clone()).or_not();
        let star = select! {
            Token::Star => 1,
            Token::DoubleStar => 2,
        }
        .or_not()
        .map(|stars| stars.unwrap_or(0));
        let parameter = star
            .then(identifier().map_with_span(|id, span: Range<usize>| (id, span)))
            .then_ignore(annotation)
            .then(just(Token::Assign).ignore_then(test.clone()).or_not())
            .map(|((star, (id, span)), default)| {
                Some(
                    SyntaxNode::new(NodeKind::Arg)
                        .with_scalar("arg", Scalar::Ident(id))
                        .with_optional("default", default)
                        .with_scalar("star", Scalar::Int(star))
                        .with_span(span),
                )
            })
            // A bare `*` or `/` only separates parameter groups
            .or(just(Token::Star).or(just(Token::Slash)).to(None));
        let parameters = parameter
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(|parameters| parameters.into_iter().flatten().collect::<Vec<_>>());

        let function = just(Token::Def)
            .ignore_then(identifier())
            .then(parameters)
            .then(just(Token::Arrow).ignore_then(test.clone()).or_not())
            .then(suite.clone())
            .map(|(((name, args), returns), body)| {
                SyntaxNode::new(NodeKind::FunctionDef)
                    .with_scalar("name", Scalar::Ident(name))
                    .with_list("args", args)
                    .with_list("body", body)
                    .with_optional("returns", returns)
            });

        let bases = testlist
            .clone()
            .or_not()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(|bases| match bases {
                Some(node) if node.kind() == NodeKind::Tuple => node.list("elts").to_vec(),
                Some(node) => vec![node],
                None => Vec::new(),
            });
        let class = just(Token::Class)
            .ignore_then(identifier())
            .then(bases.or_not())
            .then(suite)
            .map(|((name, bases), body)| {
                SyntaxNode::new(NodeKind::ClassDef)
                    .with_scalar("name", Scalar::Ident(name))
                    .with_list("bases", bases.unwrap_or_default())
                    .with_list("body", body)
            });

        let decorators = just(Token::At)
            .ignore_then(test.clone())
            .then_ignore(just(Token::Newline))
            .repeated();
        let definition = decorators
            .then(function.or(class))
            .map(|(decorators, definition)| definition.with_list("decorators", decorators));

        let compound = choice((
            if_statement,
            while_statement,
            for_statement,
            try_statement,
            with_statement,
            definition,
        ))
        .map_with_span(|node, span| vec![node.with_span(span)]);

        compound.or(simple_line(&expressions))
    })
    .boxed()
}
