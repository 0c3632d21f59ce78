//! Expression grammar
//!
//! Precedence climbs from atoms to the conditional expression the same way the reference
//! grammar does:
//!
//! ```text
//! test       := lambda | or_test ["if" or_test "else" test]
//! or_test    := and_test ("or" and_test)*
//! and_test   := not_test ("and" not_test)*
//! not_test   := "not" not_test | comparison
//! comparison := or_expr (comp_op or_expr)*
//! or_expr    := xor_expr ("|" xor_expr)*   ... down to
//! factor     := ("+" | "-" | "~") factor | power
//! power      := primary ["**" factor]
//! primary    := atom (call | subscript | attribute)*
//! ```
//!
//! `or_expr` is its own recursion point because loop targets (`for x in ...`) must stop
//! before the `in` that a comparison would consume.

use super::{cover, NodeParser, ParserError};
use crate::lexer::Token;
use crate::syntax::{Field, NodeKind, Operator, Scalar, SyntaxNode};
use chumsky::prelude::*;
use std::ops::Range;

/// The expression entry points the statement grammar needs
#[derive(Clone)]
pub(super) struct Expressions {
    /// A single expression, including conditional expressions and lambdas
    pub test: NodeParser,
    /// A comma separated expression list; more than one item (or a trailing comma) is a tuple
    pub testlist: NodeParser,
    /// Loop and assignment targets: like `testlist` but stops before `in`
    pub targets: NodeParser,
}

pub(super) fn expressions() -> Expressions {
    let test = recursive(|test| {
        let test: NodeParser = test.boxed();
        let or_expr = recursive(|or_expr| {
            let or_expr: NodeParser = or_expr.boxed();
            bitwise_or(primary(test.clone(), or_expr))
        })
        .boxed();

        let or_test = or_test(or_expr);
        let conditional = or_test
            .clone()
            .then(
                just(Token::If)
                    .ignore_then(or_test.clone())
                    .then_ignore(just(Token::Else))
                    .then(test.clone())
                    .or_not(),
            )
            .map(|(body, rest)| match rest {
                Some((condition, orelse)) => {
                    let span = cover(&body, &orelse);
                    SyntaxNode::new(NodeKind::IfExp)
                        .with_node("test", condition)
                        .with_node("body", body)
                        .with_node("orelse", orelse)
                        .with_span(span)
                }
                None => body,
            });

        lambda(test).or(conditional)
    })
    .boxed();

    let or_expr = recursive(|or_expr| {
        let or_expr: NodeParser = or_expr.boxed();
        bitwise_or(primary(test.clone(), or_expr))
    })
    .boxed();

    Expressions {
        testlist: sequence(starred_or(test.clone())),
        targets: sequence(starred_or(or_expr)),
        test,
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn identifier() -> impl Parser<Token, String, Error = ParserError> + Clone {
    select! { Token::Name(id) => id }
}

/// `item ("," item)* [","]`, collapsing to the single item when there is no comma
fn sequence(item: NodeParser) -> NodeParser {
    item.clone()
        .then(just(Token::Comma).ignore_then(item).repeated())
        .then(just(Token::Comma).or_not())
        .map_with_span(|((first, rest), trailing), span: Range<usize>| {
            if rest.is_empty() && trailing.is_none() {
                first
            } else {
                let mut elts = vec![first];
                elts.extend(rest);
                tuple(elts, span)
            }
        })
        .boxed()
}

fn tuple(elts: Vec<SyntaxNode>, span: Range<usize>) -> SyntaxNode {
    SyntaxNode::new(NodeKind::Tuple)
        .with_list("elts", elts)
        .with_span(span)
}

/// `*value` or a plain item
fn starred_or(item: NodeParser) -> NodeParser {
    just(Token::Star)
        .ignore_then(item.clone())
        .map_with_span(|value, span| {
            SyntaxNode::new(NodeKind::Starred)
                .with_node("value", value)
                .with_span(span)
        })
        .or(item)
        .boxed()
}

fn binary(left: SyntaxNode, op: Operator, right: SyntaxNode) -> SyntaxNode {
    let span = cover(&left, &right);
    SyntaxNode::new(NodeKind::BinOp)
        .with_node("left", left)
        .with_scalar("op", Scalar::Op(op))
        .with_node("right", right)
        .with_span(span)
}

fn unary(op: Operator, operand: SyntaxNode, span: Range<usize>) -> SyntaxNode {
    SyntaxNode::new(NodeKind::UnaryOp)
        .with_scalar("op", Scalar::Op(op))
        .with_node("operand", operand)
        .with_span(span)
}

/// Left-associative binary level
fn left_assoc<O>(operand: NodeParser, operator: O) -> NodeParser
where
    O: Parser<Token, Operator, Error = ParserError> + Clone + 'static,
{
    operand
        .clone()
        .then(operator.then(operand).repeated())
        .foldl(|left, (op, right)| binary(left, op, right))
        .boxed()
}

// ============================================================================
// Atoms and trailers
// ============================================================================

/// `for target in iter if cond ...` clauses following a comprehension element
fn comprehension(
    or_expr: NodeParser,
) -> impl Parser<Token, Vec<SyntaxNode>, Error = ParserError> + Clone {
    let condition = or_test(or_expr.clone());
    just(Token::For)
        .ignore_then(sequence(starred_or(or_expr)))
        .then_ignore(just(Token::In))
        .then(condition.clone())
        .then(just(Token::If).ignore_then(condition).repeated())
        .map_with_span(|((target, iter), ifs), span| {
            SyntaxNode::new(NodeKind::Comprehension)
                .with_node("target", target)
                .with_node("iter", iter)
                .with_list("ifs", ifs)
                .with_span(span)
        })
        .repeated()
        .at_least(1)
}

fn literal() -> impl Parser<Token, SyntaxNode, Error = ParserError> + Clone {
    let number = filter_map(|span: Range<usize>, token| match token {
        Token::Int(text) => parse_int(&text).ok_or_else(|| {
            ParserError::custom(span, format!("invalid integer literal `{}`", text))
        }),
        Token::Float(text) => text.parse::<f64>().map(Scalar::Float).map_err(|_| {
            ParserError::custom(span, format!("invalid float literal `{}`", text))
        }),
        other => Err(ParserError::expected_input_found(
            span,
            Vec::new(),
            Some(other),
        )),
    });

    let string = select! { Token::Str(text) => text }
        .repeated()
        .at_least(1)
        .map(|parts: Vec<String>| Scalar::Str(parts.concat()));

    let keyword = select! {
        Token::True => Scalar::Bool(true),
        Token::False => Scalar::Bool(false),
        Token::None => Scalar::None,
        Token::Ellipsis => Scalar::Ellipsis,
    };

    choice((number, string, keyword))
        .map_with_span(|value, span| SyntaxNode::constant(value).with_span(span))
}

/// Integers that overflow the machine range degrade to floats
fn parse_int(text: &str) -> Option<Scalar> {
    let parsed = match text.get(..2) {
        Some("0x") | Some("0X") => i64::from_str_radix(&text[2..], 16),
        _ => text.parse::<i64>(),
    };
    match parsed {
        Ok(value) => Some(Scalar::Int(value)),
        Err(_) => text.parse::<f64>().ok().map(Scalar::Float),
    }
}

enum Trailer {
    Call {
        args: Vec<SyntaxNode>,
        keywords: Vec<SyntaxNode>,
    },
    Index(SyntaxNode),
    Attribute(String),
}

enum Argument {
    Positional(SyntaxNode),
    Keyword(SyntaxNode),
}

fn primary(test: NodeParser, or_expr: NodeParser) -> NodeParser {
    let comprehension = comprehension(or_expr);
    let item = starred_or(test.clone());

    let name = identifier().map_with_span(|id, span| SyntaxNode::name(id).with_span(span));

    // ( ... ): empty tuple, generator, parenthesized expression or tuple
    let generator = test
        .clone()
        .then(comprehension.clone())
        .map(|(elt, generators)| {
            let node = SyntaxNode::new(NodeKind::GeneratorExp)
                .with_node("elt", elt)
                .with_list("generators", generators);
            (node, true)
        });
    let grouped = item
        .clone()
        .then(just(Token::Comma).ignore_then(item.clone()).repeated())
        .then(just(Token::Comma).or_not())
        .map(|((first, rest), trailing)| {
            if rest.is_empty() && trailing.is_none() {
                (first, false)
            } else {
                let mut elts = vec![first];
                elts.extend(rest);
                (SyntaxNode::new(NodeKind::Tuple).with_list("elts", elts), true)
            }
        });
    let parenthesized = generator
        .or(grouped)
        .or_not()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .map_with_span(|inner, span| match inner {
            Some((node, true)) => node.with_span(span),
            Some((node, false)) => node,
            None => tuple(Vec::new(), span),
        });

    // [ ... ]: list or list comprehension
    let list_comp = test
        .clone()
        .then(comprehension.clone())
        .map(|(elt, generators)| {
            SyntaxNode::new(NodeKind::ListComp)
                .with_node("elt", elt)
                .with_list("generators", generators)
        });
    let list_display = item
        .clone()
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .map(|elts| SyntaxNode::new(NodeKind::List).with_list("elts", elts));
    let list = list_comp
        .or(list_display)
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map_with_span(|node, span| node.with_span(span));

    // { ... }: dict, set and their comprehensions
    let pair = test
        .clone()
        .then_ignore(just(Token::Colon))
        .then(test.clone());
    let dict_comp = pair
        .clone()
        .then(comprehension.clone())
        .map(|((key, value), generators)| {
            SyntaxNode::new(NodeKind::DictComp)
                .with_node("key", key)
                .with_node("value", value)
                .with_list("generators", generators)
        });
    let dict_display = pair
        .separated_by(just(Token::Comma))
        .at_least(1)
        .allow_trailing()
        .map(|pairs| {
            let (keys, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
            SyntaxNode::new(NodeKind::Dict)
                .with_list("keys", keys)
                .with_list("values", values)
        });
    let set_comp = test
        .clone()
        .then(comprehension.clone())
        .map(|(elt, generators)| {
            SyntaxNode::new(NodeKind::SetComp)
                .with_node("elt", elt)
                .with_list("generators", generators)
        });
    let set_display = item
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .allow_trailing()
        .map(|elts| SyntaxNode::new(NodeKind::Set).with_list("elts", elts));
    let empty_dict = empty().map(|_| {
        SyntaxNode::new(NodeKind::Dict)
            .with_list("keys", Vec::new())
            .with_list("values", Vec::new())
    });
    // Alternatives that accept nothing must come last, the closing brace is not part of them
    let braces = choice((dict_comp, set_comp, dict_display, set_display, empty_dict))
        .delimited_by(just(Token::LBrace), just(Token::RBrace))
        .map_with_span(|node, span| node.with_span(span));

    let atom = choice((name, literal(), parenthesized, list, braces)).boxed();

    // Call arguments
    let keyword = identifier()
        .map_with_span(|id, span: Range<usize>| (id, span))
        .then_ignore(just(Token::Assign))
        .then(test.clone())
        .map(|((id, span), value)| {
            let span = span.start..value.span().map_or(span.end, |s| s.end);
            SyntaxNode::new(NodeKind::Keyword)
                .with_scalar("arg", Scalar::Ident(id))
                .with_node("value", value)
                .with_span(span)
        });
    let double_starred = just(Token::DoubleStar)
        .ignore_then(test.clone())
        .map_with_span(|value, span| {
            SyntaxNode::new(NodeKind::Keyword)
                .with("arg", Field::Absent)
                .with_node("value", value)
                .with_span(span)
        });
    let generator_argument =
        test.clone()
            .then(comprehension)
            .map_with_span(|(elt, generators), span| {
                SyntaxNode::new(NodeKind::GeneratorExp)
                    .with_node("elt", elt)
                    .with_list("generators", generators)
                    .with_span(span)
            });
    let argument = choice((
        keyword.map(Argument::Keyword),
        double_starred.map(Argument::Keyword),
        generator_argument.map(Argument::Positional),
        item.map(Argument::Positional),
    ));
    let call = argument
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .map(|arguments| {
            let mut args = Vec::new();
            let mut keywords = Vec::new();
            for argument in arguments {
                match argument {
                    Argument::Positional(node) => args.push(node),
                    Argument::Keyword(node) => keywords.push(node),
                }
            }
            Trailer::Call { args, keywords }
        });

    // Subscripts and slices
    let slice = test
        .clone()
        .or_not()
        .then_ignore(just(Token::Colon))
        .then(test.clone().or_not())
        .then(just(Token::Colon).ignore_then(test.clone().or_not()).or_not())
        .map_with_span(|((lower, upper), step), span| {
            SyntaxNode::new(NodeKind::Slice)
                .with_optional("lower", lower)
                .with_optional("upper", upper)
                .with_optional("step", step.flatten())
                .with_span(span)
        });
    let index = sequence(slice.or(test).boxed())
        .delimited_by(just(Token::LBracket), just(Token::RBracket))
        .map(Trailer::Index);

    let attribute = just(Token::Dot)
        .ignore_then(identifier())
        .map(Trailer::Attribute);

    atom.then(
        choice((call, index, attribute))
            .map_with_span(|trailer, span: Range<usize>| (trailer, span))
            .repeated(),
    )
    .foldl(|value, (trailer, span)| {
        let start = value.span().map_or(span.start, |s| s.start);
        let node = match trailer {
            Trailer::Call { args, keywords } => SyntaxNode::new(NodeKind::Call)
                .with_node("func", value)
                .with_list("args", args)
                .with_list("keywords", keywords),
            Trailer::Index(slice) => SyntaxNode::new(NodeKind::Subscript)
                .with_node("value", value)
                .with_node("slice", slice),
            Trailer::Attribute(attr) => SyntaxNode::new(NodeKind::Attribute)
                .with_node("value", value)
                .with_scalar("attr", Scalar::Ident(attr)),
        };
        node.with_span(start..span.end)
    })
    .boxed()
}

// ============================================================================
// Operator levels
// ============================================================================

/// From `primary` up to bitwise or
fn bitwise_or(primary: NodeParser) -> NodeParser {
    let factor = recursive(|factor| {
        let power = primary
            .clone()
            .then(just(Token::DoubleStar).ignore_then(factor.clone()).or_not())
            .map(|(base, exponent)| match exponent {
                Some(exponent) => binary(base, Operator::Pow, exponent),
                None => base,
            });

        let sign = select! {
            Token::Plus => Operator::UAdd,
            Token::Minus => Operator::USub,
            Token::Tilde => Operator::Invert,
        };

        sign.then(factor)
            .map_with_span(|(op, operand), span| unary(op, operand, span))
            .or(power)
    })
    .boxed();

    let term = left_assoc(
        factor,
        select! {
            Token::Star => Operator::Mult,
            Token::Slash => Operator::Div,
            Token::DoubleSlash => Operator::FloorDiv,
            Token::Percent => Operator::Mod,
            Token::At => Operator::MatMult,
        },
    );
    let arith = left_assoc(
        term,
        select! {
            Token::Plus => Operator::Add,
            Token::Minus => Operator::Sub,
        },
    );
    let shift = left_assoc(
        arith,
        select! {
            Token::LeftShift => Operator::LShift,
            Token::RightShift => Operator::RShift,
        },
    );
    let and_expr = left_assoc(shift, just(Token::Ampersand).to(Operator::BitAnd));
    let xor_expr = left_assoc(and_expr, just(Token::Caret).to(Operator::BitXor));
    left_assoc(xor_expr, just(Token::Pipe).to(Operator::BitOr))
}

/// Comparisons and boolean operators over `or_expr`
fn or_test(or_expr: NodeParser) -> NodeParser {
    let comparison_op = choice((
        just(Token::Not).then(just(Token::In)).to(Operator::NotIn),
        just(Token::Is).then(just(Token::Not)).to(Operator::IsNot),
        select! {
            Token::Less => Operator::Lt,
            Token::Greater => Operator::Gt,
            Token::EqEq => Operator::Eq,
            Token::GreaterEq => Operator::GtE,
            Token::LessEq => Operator::LtE,
            Token::NotEq => Operator::NotEq,
            Token::In => Operator::In,
            Token::Is => Operator::Is,
        },
    ));

    let comparison = or_expr
        .clone()
        .then(comparison_op.then(or_expr).repeated())
        .map(|(left, rest)| {
            let span = match rest.last() {
                Some((_, last)) => cover(&left, last),
                None => return left,
            };
            let (ops, comparators): (Vec<_>, Vec<_>) = rest.into_iter().unzip();
            SyntaxNode::new(NodeKind::Compare)
                .with_node("left", left)
                .with_scalar("ops", Scalar::Ops(ops))
                .with_list("comparators", comparators)
                .with_span(span)
        });

    let not_test = recursive(|not_test| {
        just(Token::Not)
            .ignore_then(not_test)
            .map_with_span(|operand, span| unary(Operator::Not, operand, span))
            .or(comparison)
    })
    .boxed();

    let and_test = boolean(not_test, Token::And, Operator::And);
    boolean(and_test, Token::Or, Operator::Or)
}

/// `a and b and c` is a single node with three values
fn boolean(operand: NodeParser, token: Token, op: Operator) -> NodeParser {
    operand
        .clone()
        .then(just(token).ignore_then(operand).repeated())
        .map(move |(first, rest)| {
            let span = match rest.last() {
                Some(last) => cover(&first, last),
                None => return first,
            };
            let mut values = vec![first];
            values.extend(rest);
            SyntaxNode::new(NodeKind::BoolOp)
                .with_scalar("op", Scalar::Op(op))
                .with_list("values", values)
                .with_span(span)
        })
        .boxed()
}

fn lambda(test: NodeParser) -> impl Parser<Token, SyntaxNode, Error = ParserError> + Clone {
    let parameter = identifier()
        .map_with_span(|id, span: Range<usize>| (id, span))
        .then(just(Token::Assign).ignore_then(test.clone()).or_not())
        .map(|((id, span), default)| {
            SyntaxNode::new(NodeKind::Arg)
                .with_scalar("arg", Scalar::Ident(id))
                .with_optional("default", default)
                .with_scalar("star", Scalar::Int(0))
                .with_span(span)
        });

    just(Token::Lambda)
        .ignore_then(parameter.separated_by(just(Token::Comma)).allow_trailing())
        .then_ignore(just(Token::Colon))
        .then(test)
        .map_with_span(|(args, body), span| {
            SyntaxNode::new(NodeKind::Lambda)
                .with_list("args", args)
                .with_node("body", body)
                .with_span(span)
        })
}
