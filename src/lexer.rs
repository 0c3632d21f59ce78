//! Lexer for the reference language
//!
//! Lexing happens in two passes, following the same split as indentation-sensitive formats:
//!
//! 1. `tokens`: a vanilla logos lexer produces raw tokens with byte spans. Blanks, comments
//!    and backslash continuations are skipped; every physical line break is a `Newline`.
//! 2. `layout`: physical lines become logical lines. Line breaks inside brackets and on blank
//!    lines are dropped, and changes of indentation become `Indent` / `Dedent` tokens, which
//!    the parser treats like braces.

pub mod layout;
pub mod tokens;

use crate::error::ParseError;
use logos::Logos;
use std::ops::Range;

pub use layout::transform_layout;
pub use tokens::Token;

/// A token together with the byte range it was read from
pub type SpannedToken = (Token, Range<usize>);

/// Tokenize `source` into raw tokens with their spans
pub fn tokenize_with_spans(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => return Err(ParseError::InvalidToken { span: lexer.span() }),
        }
    }

    Ok(tokens)
}

/// Main lexer function: tokenize and apply the layout pass
pub fn lex_with_spans(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let raw_tokens = tokenize_with_spans(source)?;
    transform_layout(raw_tokens, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_spans(tokens: Vec<SpannedToken>) -> Vec<Token> {
        tokens.into_iter().map(|(token, _)| token).collect()
    }

    #[test]
    fn test_invalid_character_is_reported_with_span() {
        let error = tokenize_with_spans("x = $").unwrap_err();
        assert_eq!(error, ParseError::InvalidToken { span: 4..5 });
    }

    #[test]
    fn test_lex_block() {
        let tokens = strip_spans(lex_with_spans("while x:\n    x = 1\n").unwrap());
        assert_eq!(
            tokens,
            vec![
                Token::While,
                Token::Name("x".into()),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Name("x".into()),
                Token::Assign,
                Token::Int("1".into()),
                Token::Newline,
                Token::Dedent,
            ]
        );
    }
}
