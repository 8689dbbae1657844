// precision.rs — Fixed-point precision descriptors and propagation
//
// A fixed-point output port whose OutputPrecision is empty is marked
// `Variable` during Initialize. After every star has initialized, the
// assembler calls `resolve_variables` for each star: a variable output
// adopts the precision a downstream consumer fixed for that net, or else
// becomes `Runtime` and is computed from the value flowing through it when
// the star fires.
//
// Preconditions: consumers record the precisions they fix during Initialize.
// Postconditions: no output port of a resolved star is left `Variable`.
// Failure modes: conflicting downstream precisions raise a validation error.
// Side effects: runtime precisions declare one `fix_prec` variable each.

use std::fmt;

use serde::Serialize;

use crate::codegen::{Section, StarCtx};
use crate::descriptor::Direction;
use crate::diag::GenResult;
use crate::types::DataType;

// ── Precision ───────────────────────────────────────────────────────────────

/// Bit layout of a fixed-point value: `int_bits` integer bits out of
/// `length` total bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Precision {
    pub int_bits: u32,
    pub length: u32,
}

impl Precision {
    pub const MAX_LENGTH: u32 = 64;

    pub fn new(int_bits: u32, length: u32) -> Result<Precision, String> {
        if length == 0 || length > Self::MAX_LENGTH {
            return Err(format!(
                "precision length {} is outside 1..={}",
                length,
                Self::MAX_LENGTH
            ));
        }
        if int_bits > length {
            return Err(format!(
                "{} integer bits do not fit in a {}-bit word",
                int_bits, length
            ));
        }
        Ok(Precision { int_bits, length })
    }

    pub fn frac_bits(&self) -> u32 {
        self.length - self.int_bits
    }

    /// Parse `int.frac` (e.g. `2.14`) or `int/length` (e.g. `2/16`).
    pub fn parse(s: &str) -> Result<Precision, String> {
        let s = s.trim();
        let number = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| format!("malformed precision '{}'", s))
        };
        if let Some((int, frac)) = s.split_once('.') {
            let int_bits = number(int)?;
            let frac_bits = number(frac)?;
            Precision::new(int_bits, int_bits.saturating_add(frac_bits))
        } else if let Some((int, len)) = s.split_once('/') {
            Precision::new(number(int)?, number(len)?)
        } else {
            Err(format!(
                "malformed precision '{}' (expected int.frac or int/length)",
                s
            ))
        }
    }

    /// Argument list form used in emitted `FIX_*` calls: `length, int_bits`.
    pub fn arguments(&self) -> String {
        format!("{}, {}", self.length, self.int_bits)
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.int_bits, self.frac_bits())
    }
}

// ── Precision state ─────────────────────────────────────────────────────────

/// Where a port's precision comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum PrecisionState {
    /// Not a fixed-point port, or not yet decided.
    #[default]
    Unspecified,
    Fixed(Precision),
    /// Marked variable; must be resolved before any fragment uses it.
    Variable,
    /// Computed while the program runs; held in the named `fix_prec` variable.
    Runtime(String),
}

impl PrecisionState {
    /// The expression substituted for `$precision(...)`.
    pub fn expression(&self) -> Result<String, String> {
        match self {
            PrecisionState::Fixed(p) => Ok(p.arguments()),
            PrecisionState::Runtime(sym) => Ok(format!("{}.len, {}.intb", sym, sym)),
            PrecisionState::Variable => {
                Err("precision is variable and has not been resolved".to_string())
            }
            PrecisionState::Unspecified => Err("precision has not been set".to_string()),
        }
    }
}

// ── Propagation ─────────────────────────────────────────────────────────────

/// Fix an output port's precision statically and publish it on its nets.
pub fn set_output(ctx: &mut StarCtx<'_>, port: &str, precision: Precision) -> GenResult<()> {
    set_state(ctx, port, PrecisionState::Fixed(precision))
}

/// Mark an output port as variable precision.
pub fn mark_variable(ctx: &mut StarCtx<'_>, port: &str) -> GenResult<()> {
    set_state(ctx, port, PrecisionState::Variable)
}

/// Fix the precision an input port requires. A variable output feeding
/// this port adopts it.
pub fn set_input(ctx: &mut StarCtx<'_>, port: &str, precision: Precision) -> GenResult<()> {
    let nets = fix_port(ctx, port, Direction::Input)?;
    if let Some(p) = ctx.actor.port_mut(port) {
        p.precision = PrecisionState::Fixed(precision);
    }
    for id in nets {
        ctx.net_mut(id).consumer_precision = Some(precision);
    }
    Ok(())
}

/// Channels of fixed-point port `port`, which must face `direction`.
fn fix_port(
    ctx: &StarCtx<'_>,
    port: &str,
    direction: Direction,
) -> GenResult<Vec<crate::id::NetId>> {
    let p = ctx.port(port)?;
    if p.direction != direction {
        return Err(ctx.invalid(port, format!("not an {:?} port", direction).to_lowercase()));
    }
    if p.dtype != DataType::Fix {
        return Err(ctx.invalid(port, format!("precision set on a {} port", p.dtype)));
    }
    Ok(p.channels.clone())
}

fn set_state(ctx: &mut StarCtx<'_>, port: &str, state: PrecisionState) -> GenResult<()> {
    let nets = fix_port(ctx, port, Direction::Output)?;
    if let Some(p) = ctx.actor.port_mut(port) {
        p.precision = state.clone();
    }
    for id in nets {
        ctx.net_mut(id).precision = state.clone();
    }
    Ok(())
}

/// Resolve every `Variable` output of the star.
///
/// A variable output adopts the precision fixed by its downstream consumer;
/// without one it becomes a runtime precision.
pub fn resolve_variables(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let variable: Vec<(String, Vec<crate::id::NetId>)> = ctx
        .actor
        .ports
        .iter()
        .filter(|p| p.direction == Direction::Output && p.precision == PrecisionState::Variable)
        .map(|p| (p.name.clone(), p.channels.clone()))
        .collect();

    for (port, nets) in variable {
        let mut adopted: Option<Precision> = None;
        for id in &nets {
            if let Some(downstream) = ctx.net(*id).consumer_precision {
                match adopted {
                    Some(existing) if existing != downstream => {
                        return Err(ctx.invalid(
                            "OutputPrecision",
                            format!(
                                "consumers of '{}' fix conflicting precisions {} and {}",
                                port, existing, downstream
                            ),
                        ));
                    }
                    _ => adopted = Some(downstream),
                }
            }
        }

        match adopted {
            Some(p) => {
                log::debug!("{}.{}: adopting downstream precision {}", ctx.name(), port, p);
                set_state(ctx, &port, PrecisionState::Fixed(p))?;
            }
            None => {
                let sym = ctx.star_symbol(&format!("{}_prec", port));
                log::debug!("{}.{}: precision computed at run time in {}", ctx.name(), port, sym);
                ctx.declare(&format!("static fix_prec {};", sym))?;
                set_state(ctx, &port, PrecisionState::Runtime(sym))?;
            }
        }
    }
    Ok(())
}

/// Emit the runtime precision computation for `port` from `value`, if the
/// port's precision is decided at run time. No code otherwise.
pub fn emit_runtime_precision(ctx: &mut StarCtx<'_>, port: &str, value: &str) -> GenResult<()> {
    let state = ctx
        .actor
        .port(port)
        .map(|p| p.precision.clone())
        .unwrap_or_default();
    if let PrecisionState::Runtime(sym) = state {
        ctx.emit(
            Section::Fire,
            &format!("FIX_SetPrecisionFromDouble(&{}, {});", sym, value),
        )?;
    }
    Ok(())
}
