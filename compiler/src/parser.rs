// Parser for starc netlist files.
//
// Parses a token stream (from the lexer) into an AST. Uses chumsky
// combinators. Grammar:
//
//     program       = nl* (statement (nl+ statement)*)? nl*
//     statement     = set_stmt | star_stmt | connect_stmt | schedule_stmt
//     set_stmt      = 'set' IDENT '=' (NUMBER | STRING | IDENT)
//     star_stmt     = 'star' IDENT ':' IDENT ('(' (arg (',' arg)*)? ')')?
//     arg           = IDENT '=' value
//     value         = NUMBER | STRING | IDENT | '[' value (',' value)* ']'
//     connect_stmt  = 'connect' port_ref '->' port_ref
//     port_ref      = IDENT '.' IDENT
//     schedule_stmt = 'schedule' item (',' item)*
//     item          = IDENT ('*' NUMBER)?
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Program>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a netlist. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = program_parser(source);
    let (program, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        program,
        errors: all_errors,
    }
}

// ── Main parser builder ──
//
// All grammar rules are built inside `program_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn program_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Program, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let text = move |span: SimpleSpan| source[span.start()..span.end()].to_string();

    // ── Newlines ──

    let nl = just(Token::Newline).repeated().ignored();

    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: text(span),
            span,
        }
    });

    let number = just(Token::Number).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        (text(span), span)
    });

    let string = select! {
        Token::StringLit(s) = e => (s, e.span()),
    };

    // ── Argument values ──

    let value = recursive(|value| {
        let array = value
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map_with(|items, e| ArgValue::Array(items, e.span()));

        choice((
            number.clone().map(|(t, s)| ArgValue::Number(t, s)),
            string.clone().map(|(t, s)| ArgValue::Str(t, s)),
            ident.clone().map(ArgValue::Ident),
            array,
        ))
    });

    let arg = ident
        .clone()
        .then_ignore(just(Token::Equals))
        .then(value)
        .map_with(|(name, value), e| ParamArg {
            name,
            value,
            span: e.span(),
        });

    // ── set_stmt ──

    let set_value = choice((
        number.clone().map(|(t, s)| SetValue::Number(t, s)),
        string.map(|(t, s)| SetValue::StringLit(t, s)),
        ident.clone().map(SetValue::Ident),
    ));

    let set_stmt = just(Token::Set)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Equals))
        .then(set_value)
        .map(|(name, value)| StatementKind::Set(SetStmt { name, value }));

    // ── star_stmt ──

    let args = arg
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen))
        .or_not()
        .map(Option::unwrap_or_default);

    let star_stmt = just(Token::Star)
        .ignore_then(ident.clone())
        .then_ignore(just(Token::Colon))
        .then(ident.clone())
        .then(args)
        .map(|((name, class), args)| StatementKind::Star(StarStmt { name, class, args }));

    // ── connect_stmt ──

    let port_ref = ident
        .clone()
        .then_ignore(just(Token::Dot))
        .then(ident.clone())
        .map_with(|(instance, port), e| PortRef {
            instance,
            port,
            span: e.span(),
        });

    let connect_stmt = just(Token::Connect)
        .ignore_then(port_ref.clone())
        .then_ignore(just(Token::Arrow))
        .then(port_ref)
        .map(|(from, to)| StatementKind::Connect(ConnectStmt { from, to }));

    // ── schedule_stmt ──

    let count = just(Token::Times).ignore_then(number.try_map(|(t, _), span| {
        t.parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| Rich::custom(span, format!("repetition count '{}' must be a positive integer", t)))
    }));

    let item = ident
        .clone()
        .then(count.or_not())
        .map_with(|(name, reps), e| ScheduleItem {
            name,
            repetitions: reps.unwrap_or(1),
            span: e.span(),
        });

    let schedule_stmt = just(Token::Schedule)
        .ignore_then(
            item.separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map(|entries| StatementKind::Schedule(ScheduleStmt { entries }));

    // ── Statement dispatch ──

    let statement = choice((set_stmt, star_stmt, connect_stmt, schedule_stmt)).map_with(
        |kind, e| Statement {
            kind,
            span: e.span(),
        },
    );

    // ── Program ──

    nl.clone()
        .ignore_then(
            statement
                .separated_by(just(Token::Newline).repeated().at_least(1))
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .then_ignore(nl)
        .map_with(move |statements, e| Program {
            statements,
            span: e.span(),
        })
}

// ── Tests ──
