// diag.rs — Unified diagnostics model and generation-pass errors
//
// `Diagnostic` is the shared report type for every pass (netlist parse,
// graph construction, schedule checks, code generation). `GenError` is the
// failure type of the generation pass itself; every variant is fatal and
// maps onto a coded diagnostic for display.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::Span;
use crate::descriptor::Lifecycle;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0100`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code keeps its meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // Netlist syntax
    pub const E0001: DiagCode = DiagCode("E0001"); // parse error

    // Graph construction
    pub const E0100: DiagCode = DiagCode("E0100"); // unknown star class
    pub const E0101: DiagCode = DiagCode("E0101"); // duplicate instance name
    pub const E0102: DiagCode = DiagCode("E0102"); // unknown parameter
    pub const E0103: DiagCode = DiagCode("E0103"); // bad parameter value
    pub const E0104: DiagCode = DiagCode("E0104"); // unknown instance in connect
    pub const E0105: DiagCode = DiagCode("E0105"); // unknown port / wrong direction
    pub const E0106: DiagCode = DiagCode("E0106"); // port already connected
    pub const E0107: DiagCode = DiagCode("E0107"); // type mismatch
    pub const E0108: DiagCode = DiagCode("E0108"); // star configuration rejected
    pub const E0109: DiagCode = DiagCode("E0109"); // bad `set` statement

    // Schedule
    pub const E0300: DiagCode = DiagCode("E0300"); // unknown or duplicate schedule entry
    pub const E0301: DiagCode = DiagCode("E0301"); // star missing from schedule
    pub const E0302: DiagCode = DiagCode("E0302"); // consumer scheduled before producer

    // Generation
    pub const E0200: DiagCode = DiagCode("E0200"); // validation error
    pub const E0201: DiagCode = DiagCode("E0201"); // resolution error
    pub const E0202: DiagCode = DiagCode("E0202"); // shared symbol collision
    pub const E0203: DiagCode = DiagCode("E0203"); // lifecycle order violated

    // Warnings
    pub const W0100: DiagCode = DiagCode("W0100"); // unconnected port
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any pass.
///
/// `span` is absent for errors raised on graphs built through the library
/// API rather than from netlist text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Option<Span>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagLevel, span: Option<Span>, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(span: Option<Span>, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, span, message)
    }

    pub fn warning(span: Option<Span>, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, span, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(span) = &self.span {
            use chumsky::span::Span as _;
            write!(f, " (at {}..{})", span.start(), span.end())?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Generation errors ────────────────────────────────────────────────────

/// A fatal error of the generation pass.
///
/// There is no recovery: the first error aborts generation for the whole
/// graph and no partial program is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum GenError {
    /// A parameter or configuration rejected by a star's hooks.
    Validation {
        actor: String,
        param: String,
        message: String,
    },
    /// A placeholder token that cannot be resolved against its bindings.
    Resolution {
        actor: String,
        token: String,
        message: String,
    },
    /// Two different bodies registered under one shared symbol.
    NamespaceCollision {
        class: String,
        symbol: String,
        first: String,
        second: String,
    },
    /// A lifecycle transition attempted out of order.
    Lifecycle {
        actor: String,
        from: Lifecycle,
        to: Lifecycle,
    },
}

pub type GenResult<T> = Result<T, GenError>;

impl GenError {
    pub fn validation(
        actor: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        GenError::Validation {
            actor: actor.into(),
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn resolution(
        actor: impl Into<String>,
        token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        GenError::Resolution {
            actor: actor.into(),
            token: token.into(),
            message: message.into(),
        }
    }

    /// The actor instance the error is attributed to.
    pub fn actor(&self) -> &str {
        match self {
            GenError::Validation { actor, .. }
            | GenError::Resolution { actor, .. }
            | GenError::Lifecycle { actor, .. } => actor,
            GenError::NamespaceCollision { second, .. } => second,
        }
    }

    pub fn code(&self) -> DiagCode {
        match self {
            GenError::Validation { .. } => codes::E0200,
            GenError::Resolution { .. } => codes::E0201,
            GenError::NamespaceCollision { .. } => codes::E0202,
            GenError::Lifecycle { .. } => codes::E0203,
        }
    }

    pub fn to_diagnostic(&self, span: Option<Span>) -> Diagnostic {
        Diagnostic::error(span, self.to_string()).with_code(self.code())
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::Validation {
                actor,
                param,
                message,
            } => {
                if param.is_empty() {
                    write!(f, "{}: {}", actor, message)
                } else {
                    write!(f, "{}: parameter '{}': {}", actor, param, message)
                }
            }
            GenError::Resolution {
                actor,
                token,
                message,
            } => write!(f, "{}: cannot resolve '{}': {}", actor, token, message),
            GenError::NamespaceCollision {
                class,
                symbol,
                first,
                second,
            } => write!(
                f,
                "shared symbol '{}' of class {} defined by {} is redefined with a different body by {}",
                symbol, class, first, second
            ),
            GenError::Lifecycle { actor, from, to } => {
                write!(f, "{}: illegal lifecycle transition {:?} -> {:?}", actor, from, to)
            }
        }
    }
}

impl std::error::Error for GenError {}
