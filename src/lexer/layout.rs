//! Layout transformation
//!
//! Turns the raw token stream into logical lines with semantic `Indent` and `Dedent` tokens.
//!
//! # Algorithm
//!
//! 1. Track the bracket depth; a `Newline` inside brackets is dropped (implicit joining)
//! 2. A `Newline` that ends an empty line is dropped, blank lines never affect indentation
//! 3. For the first token of each logical line, measure its indentation from the source and
//!    compare with the top of the indentation stack:
//!    - greater: push it and emit one `Indent`
//!    - smaller: pop and emit a `Dedent` until the top is not greater; the line must land
//!      exactly on a previous level
//! 4. At the end of input, close the last logical line and emit a `Dedent` for every level
//!    still open
//!
//! Synthetic tokens get an empty span at the position of the token that triggered them.

use super::{SpannedToken, Token};
use crate::error::ParseError;
use crate::syntax::SourceLocation;

pub fn transform_layout(
    tokens: Vec<SpannedToken>,
    source: &str,
) -> Result<Vec<SpannedToken>, ParseError> {
    let location = SourceLocation::new(source);
    let mut result = Vec::with_capacity(tokens.len());
    let mut levels: Vec<usize> = vec![0];
    let mut depth: usize = 0;
    let mut at_line_start = true;

    for (token, span) in tokens {
        if token == Token::Newline {
            if depth == 0 && !at_line_start {
                result.push((token, span));
                at_line_start = true;
            }
            continue;
        }

        if at_line_start {
            let width = location.indentation_at(span.start);
            let current = levels.last().copied().unwrap_or(0);
            if width > current {
                levels.push(width);
                result.push((Token::Indent, span.start..span.start));
            } else {
                while levels.last().is_some_and(|&level| level > width) {
                    levels.pop();
                    result.push((Token::Dedent, span.start..span.start));
                }
                if levels.last().copied() != Some(width) {
                    return Err(ParseError::InconsistentDedent { offset: span.start });
                }
            }
            at_line_start = false;
        }

        if token.opens_bracket() {
            depth += 1;
        } else if token.closes_bracket() {
            depth = depth.saturating_sub(1);
        }
        result.push((token, span));
    }

    let end = source.len();
    if !at_line_start {
        result.push((Token::Newline, end..end));
    }
    for _ in 1..levels.len() {
        result.push((Token::Dedent, end..end));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_with_spans;

    fn layout(source: &str) -> Vec<Token> {
        let raw = tokenize_with_spans(source).unwrap();
        transform_layout(raw, source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    fn name(id: &str) -> Token {
        Token::Name(id.to_string())
    }

    #[test]
    fn test_flat_lines() {
        assert_eq!(
            layout("a\nb"),
            vec![name("a"), Token::Newline, name("b"), Token::Newline]
        );
    }

    #[test]
    fn test_blank_lines_and_comments_are_ignored() {
        assert_eq!(
            layout("a\n\n   \n# comment\nb\n"),
            vec![name("a"), Token::Newline, name("b"), Token::Newline]
        );
    }

    #[test]
    fn test_nested_indentation_closes_all_levels() {
        assert_eq!(
            layout("a\n  b\n    c\nd\n"),
            vec![
                name("a"),
                Token::Newline,
                Token::Indent,
                name("b"),
                Token::Newline,
                Token::Indent,
                name("c"),
                Token::Newline,
                Token::Dedent,
                Token::Dedent,
                name("d"),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_unclosed_levels_at_end_of_input() {
        assert_eq!(
            layout("a\n    b"),
            vec![
                name("a"),
                Token::Newline,
                Token::Indent,
                name("b"),
                Token::Newline,
                Token::Dedent,
            ]
        );
    }

    #[test]
    fn test_brackets_join_lines() {
        assert_eq!(
            layout("f(a,\n      b)\n"),
            vec![
                name("f"),
                Token::LParen,
                name("a"),
                Token::Comma,
                name("b"),
                Token::RParen,
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_inconsistent_dedent() {
        let source = "a\n    b\n  c\n";
        let raw = tokenize_with_spans(source).unwrap();
        assert_eq!(
            transform_layout(raw, source),
            Err(ParseError::InconsistentDedent { offset: 10 })
        );
    }
}
