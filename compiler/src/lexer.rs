// Lexer for starc netlist files.
//
// Uses the `logos` crate for DFA-based lexing. Numbers, strings and
// identifiers carry no parsed value where the source text is what later
// passes need: use the span to retrieve it.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+|#[^\n]*")]
pub enum Token {
    // ── Keywords ──
    #[token("set")]
    Set,
    #[token("star")]
    Star,
    #[token("connect")]
    Connect,
    #[token("schedule")]
    Schedule,

    // ── Symbols ──
    #[token("->")]
    Arrow,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("*")]
    Times,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,

    // ── Literals ──
    /// Numeric literal (int, float, exponent, negative). Text via span.
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,

    /// String literal with `\"` and `\\` escapes.
    #[regex(r#""([^"\\]|\\.)*""#, parse_string)]
    StringLit(String),

    // ── Identifier ──
    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ── Structure ──
    /// One or more newlines (statement terminator).
    #[regex(r"\n+")]
    Newline,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Set => write!(f, "set"),
            Token::Star => write!(f, "star"),
            Token::Connect => write!(f, "connect"),
            Token::Schedule => write!(f, "schedule"),
            Token::Arrow => write!(f, "->"),
            Token::Colon => write!(f, ":"),
            Token::Dot => write!(f, "."),
            Token::Times => write!(f, "*"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Equals => write!(f, "="),
            Token::Number => write!(f, "<number>"),
            Token::StringLit(s) => write!(f, "\"{s}\""),
            Token::Ident => write!(f, "<ident>"),
            Token::Newline => write!(f, "<newline>"),
        }
    }
}

// ── Callbacks ──

fn parse_string(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1]; // strip quotes
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                '"' => result.push('"'),
                '\\' => result.push('\\'),
                // Only \" and \\ are escapes.
                _ => return None,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

// ── Public API ──

/// Lex a netlist into tokens.
///
/// Lexing is non-fatal: errors are collected and the lexer continues past
/// bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(source: &str) -> Vec<Token> {
        let result = lex(source);
        assert!(
            result.errors.is_empty(),
            "unexpected lex errors: {:?}",
            result.errors
        );
        result.tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn keywords() {
        assert_eq!(
            lex_ok("set star connect schedule"),
            vec![Token::Set, Token::Star, Token::Connect, Token::Schedule]
        );
    }

    #[test]
    fn keyword_vs_ident() {
        // `stars` is an identifier, not keyword `star` + `s`
        assert_eq!(lex_ok("star stars"), vec![Token::Star, Token::Ident]);
    }

    #[test]
    fn symbols() {
        assert_eq!(
            lex_ok("-> : . * ( ) [ ] , ="),
            vec![
                Token::Arrow,
                Token::Colon,
                Token::Dot,
                Token::Times,
                Token::LParen,
                Token::RParen,
                Token::LBracket,
                Token::RBracket,
                Token::Comma,
                Token::Equals,
            ]
        );
    }

    #[test]
    fn numbers_keep_their_text() {
        let src = "-2.5e3 42";
        let result = lex(src);
        let texts: Vec<&str> = result
            .tokens
            .iter()
            .map(|(_, s)| &src[s.start..s.end])
            .collect();
        assert_eq!(texts, vec!["-2.5e3", "42"]);
        assert!(result.tokens.iter().all(|(t, _)| *t == Token::Number));
    }

    #[test]
    fn port_reference() {
        assert_eq!(
            lex_ok("ramp1.output -> gain1.input"),
            vec![
                Token::Ident,
                Token::Dot,
                Token::Ident,
                Token::Arrow,
                Token::Ident,
                Token::Dot,
                Token::Ident,
            ]
        );
    }

    #[test]
    fn strings_with_escapes() {
        assert_eq!(
            lex_ok(r#""say \"hi\"" "$ref(in#1)""#),
            vec![
                Token::StringLit(r#"say "hi""#.into()),
                Token::StringLit("$ref(in#1)".into()),
            ]
        );
    }

    #[test]
    fn comments_and_newlines() {
        assert_eq!(
            lex_ok("a # comment\n\n\nb"),
            vec![Token::Ident, Token::Newline, Token::Ident]
        );
    }

    #[test]
    fn error_recovery() {
        let result = lex("foo ~ bar");
        assert_eq!(result.tokens.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].span, Span { start: 4, end: 5 });
    }
}
