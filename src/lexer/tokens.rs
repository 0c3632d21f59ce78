//! Token definitions for the reference language
//!
//! Tokens are defined with the logos derive macro. Indentation is not tokenized here:
//! `Indent` and `Dedent` are synthetic tokens inserted by the layout pass, which works from
//! the spans of the raw tokens.
use logos::{Lexer, Logos};
use std::fmt;

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\f]+")]
#[logos(skip r"#[^\r\n]*")]
#[logos(skip r"\\\r?\n")]
pub enum Token {
    // Keywords
    #[token("def")]
    Def,
    #[token("class")]
    Class,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("not")]
    Not,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("is")]
    Is,
    #[token("lambda")]
    Lambda,
    #[token("pass")]
    Pass,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("assert")]
    Assert,
    #[token("del")]
    Del,
    #[token("global")]
    Global,
    #[token("nonlocal")]
    Nonlocal,
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("raise")]
    Raise,
    #[token("try")]
    Try,
    #[token("except")]
    Except,
    #[token("finally")]
    Finally,
    #[token("with")]
    With,
    #[token("yield")]
    Yield,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    None,

    // Literals and names
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Name(String),
    #[regex(r"[0-9][0-9_]*", |lex| lex.slice().replace('_', ""))]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| lex.slice().replace('_', ""))]
    Int(String),
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().replace('_', ""))]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().replace('_', ""))]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", |lex| lex.slice().replace('_', ""))]
    Float(String),
    #[regex(r#"[rRbBuUfF]{0,2}"([^"\\\r\n]|\\.)*""#, quoted)]
    #[regex(r#"[rRbBuUfF]{0,2}'([^'\\\r\n]|\\.)*'"#, quoted)]
    #[regex(r#"[rRbBuUfF]{0,2}""""#, triple_quoted)]
    #[regex(r#"[rRbBuUfF]{0,2}'''"#, triple_quoted)]
    Str(String),

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,
    #[token("@")]
    At,
    #[token("=")]
    Assign,
    #[regex(r"(\+|-|\*|@|/|//|%|\*\*|<<|>>|&|\||\^)=", |lex| lex.slice().to_owned())]
    AugAssign(String),

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("&")]
    Ampersand,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<<")]
    LeftShift,
    #[token(">>")]
    RightShift,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEq,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEq,

    // Line structure
    #[regex(r"\r?\n")]
    Newline,

    // Synthetic tokens produced by the layout pass
    Indent,
    Dedent,
}

impl Token {
    /// Opening bracket: newlines inside brackets do not end a logical line
    pub fn opens_bracket(&self) -> bool {
        matches!(self, Token::LParen | Token::LBracket | Token::LBrace)
    }

    pub fn closes_bracket(&self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "name `{}`", name),
            Token::Int(text) | Token::Float(text) => write!(f, "number `{}`", text),
            Token::Str(_) => f.write_str("string"),
            Token::AugAssign(symbol) => write!(f, "`{}`", symbol),
            Token::Newline => f.write_str("end of line"),
            Token::Indent => f.write_str("indent"),
            Token::Dedent => f.write_str("dedent"),
            other => write!(f, "`{:?}`", other),
        }
    }
}

/// Split a string token into its prefix and quote
fn prefix_len(slice: &str) -> usize {
    slice
        .find(|ch| ch == '"' || ch == '\'')
        .unwrap_or(slice.len())
}

fn is_raw(prefix: &str) -> bool {
    prefix.contains(['r', 'R'])
}

/// Single-line string literal: strip prefix and quotes, then decode escapes
fn quoted(lex: &mut Lexer<Token>) -> String {
    let slice = lex.slice();
    let start = prefix_len(slice);
    let body = &slice[start + 1..slice.len() - 1];
    decode(body, is_raw(&slice[..start]))
}

/// Triple-quoted string literal: the regex only matches the opening quotes, the body is
/// scanned here so that it may span lines and contain lone quotes
fn triple_quoted(lex: &mut Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let start = prefix_len(slice);
    let raw = is_raw(&slice[..start]);
    let quote = &slice[start..];

    let remainder = lex.remainder();
    let mut escaped = false;
    let mut end = None;
    for (offset, ch) in remainder.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if remainder[offset..].starts_with(quote) {
            end = Some(offset);
            break;
        }
    }

    let end = end?;
    let body = remainder[..end].to_string();
    lex.bump(end + quote.len());
    Some(decode(&body, raw))
}

/// Decode backslash escapes; unknown or malformed escapes are kept verbatim
fn decode(body: &str, raw: bool) -> String {
    if raw {
        return body.to_string();
    }
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(index) = rest.find('\\') {
        out.push_str(&rest[..index]);
        rest = &rest[index + 1..];
        match escape(rest) {
            Some((decoded, length)) => {
                out.extend(decoded);
                rest = &rest[length..];
            }
            None => out.push('\\'),
        }
    }
    out.push_str(rest);
    out
}

/// The character an escape stands for (nothing for a line continuation) and the length of
/// the escape after its backslash
fn escape(text: &str) -> Option<(Option<char>, usize)> {
    let ch = text.chars().next()?;
    let decoded = match ch {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0c}',
        'v' => '\u{0b}',
        '\\' | '\'' | '"' => ch,
        '\n' => return Some((None, 1)),
        'x' => return code_point(&text[1..], 2, 16).map(|(ch, length)| (Some(ch), length + 1)),
        'u' => return code_point(&text[1..], 4, 16).map(|(ch, length)| (Some(ch), length + 1)),
        'U' => return code_point(&text[1..], 8, 16).map(|(ch, length)| (Some(ch), length + 1)),
        '0'..='7' => return code_point(text, 3, 8).map(|(ch, length)| (Some(ch), length)),
        _ => return None,
    };
    Some((Some(decoded), 1))
}

/// Up to `width` digits in `radix`; hex escapes need all `width` of them
fn code_point(digits: &str, width: usize, radix: u32) -> Option<(char, usize)> {
    let length = digits
        .chars()
        .take(width)
        .take_while(|ch| ch.is_digit(radix))
        .count();
    if length == 0 || (radix == 16 && length < width) {
        return None;
    }
    let value = u32::from_str_radix(&digits[..length], radix).ok()?;
    char::from_u32(value).map(|ch| (ch, length))
}
