// AST node types for starc netlist files.
//
// A netlist declares star instances, wires their ports and gives the
// schedule:
//
//     set iterations = 10
//     star ramp1 : Ramp(step = 0.5)
//     star gain1 : Gain(gain = 2.0)
//     connect ramp1.output -> gain1.input
//     schedule ramp1, gain1
//
// Every node carries a `SimpleSpan` for error reporting in later passes.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Root ──

/// A complete netlist: a sequence of top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub span: Span,
}

// ── Statements ──

/// A top-level statement with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Set(SetStmt),
    Star(StarStmt),
    Connect(ConnectStmt),
    Schedule(ScheduleStmt),
}

// ── set_stmt: 'set' IDENT '=' set_value ──

#[derive(Debug, Clone, PartialEq)]
pub struct SetStmt {
    pub name: Ident,
    pub value: SetValue,
}

/// RHS of a `set` statement. Numbers keep their source text.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Number(String, Span),
    StringLit(String, Span),
    Ident(Ident),
}

// ── star_stmt: 'star' IDENT ':' IDENT ( '(' args? ')' )? ──

#[derive(Debug, Clone, PartialEq)]
pub struct StarStmt {
    pub name: Ident,
    pub class: Ident,
    pub args: Vec<ParamArg>,
}

/// `name = value` inside a star statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamArg {
    pub name: Ident,
    pub value: ArgValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Source text of a numeric literal, e.g. `-2.5e3`.
    Number(String, Span),
    Str(String, Span),
    /// A bare word, e.g. `AND` or `YES`.
    Ident(Ident),
    Array(Vec<ArgValue>, Span),
}

impl ArgValue {
    /// The parameter expression handed to the star class.
    pub fn expr(&self) -> String {
        match self {
            ArgValue::Number(text, _) => text.clone(),
            ArgValue::Str(s, _) => s.clone(),
            ArgValue::Ident(id) => id.name.clone(),
            ArgValue::Array(items, _) => {
                let items: Vec<String> = items.iter().map(ArgValue::expr).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ArgValue::Number(_, s) | ArgValue::Str(_, s) | ArgValue::Array(_, s) => *s,
            ArgValue::Ident(id) => id.span,
        }
    }
}

// ── connect_stmt: 'connect' port_ref '->' port_ref ──

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectStmt {
    pub from: PortRef,
    pub to: PortRef,
}

/// `instance.port`
#[derive(Debug, Clone, PartialEq)]
pub struct PortRef {
    pub instance: Ident,
    pub port: Ident,
    pub span: Span,
}

// ── schedule_stmt: 'schedule' item (',' item)* ──

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleStmt {
    pub entries: Vec<ScheduleItem>,
}

/// `name` or `name * count`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleItem {
    pub name: Ident,
    pub repetitions: u32,
    pub span: Span,
}

// ── Identifiers ──

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}
