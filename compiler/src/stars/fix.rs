// stars/fix.rs — Fixed-point stars
//
// Every fixed-point star builds on the same base: output precision and
// overflow parameters, input precision parameters, and hooks that publish
// precisions during Initialize and report overflows in Wrapup. Derived
// stars extend the base hooks with their own Fire hook.
//
// Preconditions: the generated program links against a `fix.h` runtime.
// Postconditions: every fixed-point output has a precision before Fire.
// Failure modes: malformed precisions, an empty InputPrecision when the
//                arriving precision is overridden.
// Side effects: none.

use std::path::Path;
use std::sync::Arc;

use crate::codeblock::CodeBlockLibrary;
use crate::codegen::{Section, StarCtx};
use crate::descriptor::{Direction, ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::GenResult;
use crate::library::LibraryError;
use crate::precision::{self, Precision};
use crate::types::{DataType, ParamType, ParamValue};

const FIX_BLOCKS: &str = include_str!("fix_blocks.c");

pub(super) fn classes() -> Result<Vec<StarClass>, LibraryError> {
    let blocks = Arc::new(
        CodeBlockLibrary::parse(FIX_BLOCKS)
            .map_err(|e| LibraryError::from_blocks(Path::new("fix_blocks.c"), 0, e))?,
    );
    let base = |name: &str| StarClass::new(name).include("\"fix.h\"").blocks(Arc::clone(&blocks));
    Ok(vec![
        output_params(base("FloatToFix"))
            .port(PortDecl::input("input", DataType::Float))
            .port(PortDecl::output("output", DataType::Fix))
            .hooks(base_hooks().extend(PhaseHooks::new().on(Phase::Fire, float_to_fix_fire))),
        input_params(base("FixToFloat"))
            .port(PortDecl::input("input", DataType::Fix))
            .port(PortDecl::output("output", DataType::Float))
            .hooks(base_hooks().extend(PhaseHooks::new().on(Phase::Fire, fix_to_float_fire))),
        input_params(output_params(base("AddFix")))
            .port(PortDecl::multi_input("input", DataType::Fix))
            .port(PortDecl::output("output", DataType::Fix))
            .hooks(
                base_hooks().extend(
                    PhaseHooks::new()
                        .on(Phase::Initialize, add_fix_initialize)
                        .on(Phase::Fire, add_fix_fire),
                ),
            ),
        input_params(output_params(base("GainFix")))
            .port(PortDecl::input("input", DataType::Fix))
            .port(PortDecl::output("output", DataType::Fix))
            .param(ParamDecl::new("gain", ParamType::Float, "1.0"))
            .hooks(base_hooks().extend(PhaseHooks::new().on(Phase::Fire, gain_fix_fire))),
    ])
}

// ── Base ────────────────────────────────────────────────────────────────────

const OVERFLOW_HANDLERS: [&str; 4] = ["SATURATE", "ZERO_SATURATE", "WRAPPED", "WARNING"];

fn output_params(class: StarClass) -> StarClass {
    class
        .param(ParamDecl::new("ReportOverflow", ParamType::yes_no(), "NO"))
        .param(ParamDecl::new(
            "OverflowHandler",
            ParamType::enumeration(&OVERFLOW_HANDLERS),
            "SATURATE",
        ))
        .param(ParamDecl::new("OutputPrecision", ParamType::Precision, ""))
}

fn input_params(class: StarClass) -> StarClass {
    class
        .param(ParamDecl::new("ArrivingPrecision", ParamType::yes_no(), "YES"))
        .param(ParamDecl::new("InputPrecision", ParamType::Precision, "2.14"))
}

fn base_hooks() -> PhaseHooks {
    PhaseHooks::new()
        .on(Phase::PreInitialize, fix_preinitialize)
        .on(Phase::Initialize, fix_initialize)
        .on(Phase::Wrapup, fix_wrapup)
}

fn reports_overflow(ctx: &StarCtx<'_>) -> bool {
    ctx.actor
        .param("ReportOverflow")
        .and_then(|p| p.value.as_str())
        == Some("YES")
}

fn precision_param(ctx: &StarCtx<'_>, name: &str) -> GenResult<Option<Precision>> {
    match ctx.param(name)? {
        ParamValue::Precision(p) => Ok(*p),
        _ => Err(ctx.invalid(name, "expected a precision")),
    }
}

fn fix_preinitialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if reports_overflow(ctx) {
        ctx.emit_block(Section::Declaration, "overflowCounters", &[])?;
    }
    Ok(())
}

fn fix_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if ctx.actor.param("OutputPrecision").is_some() {
        match precision_param(ctx, "OutputPrecision")? {
            Some(p) => precision::set_output(ctx, "output", p)?,
            None => precision::mark_variable(ctx, "output")?,
        }
    }

    let overrides_arriving = ctx
        .actor
        .param("ArrivingPrecision")
        .and_then(|p| p.value.as_str())
        == Some("NO");
    if overrides_arriving {
        let p = precision_param(ctx, "InputPrecision")?.ok_or_else(|| {
            ctx.invalid(
                "InputPrecision",
                "required when ArrivingPrecision is NO",
            )
        })?;
        let inputs: Vec<String> = ctx
            .actor
            .ports
            .iter()
            .filter(|port| port.direction == Direction::Input && port.dtype == DataType::Fix)
            .map(|port| port.name.clone())
            .collect();
        for port in inputs {
            precision::set_input(ctx, &port, p)?;
        }
    }
    Ok(())
}

fn fix_wrapup(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if reports_overflow(ctx) {
        let name = ctx.name().to_string();
        ctx.emit_block(Section::Wrapup, "reportOverflow", &[&name])?;
    }
    Ok(())
}

/// Emit `body` in Fire, counting overflows around it when reporting.
fn bracket_overflow(ctx: &mut StarCtx<'_>, body: &str) -> GenResult<()> {
    if !reports_overflow(ctx) {
        return ctx.emit(Section::Fire, body);
    }
    let clear = ctx.block("clearOverflow", &[])?;
    let check = ctx.block("checkOverflow", &["$starSymbol(overflows)"])?;
    ctx.emit(Section::Fire, &format!("{}\n{}\n{}", clear, body, check))
}

// ── Derived stars ───────────────────────────────────────────────────────────

fn float_to_fix_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    precision::emit_runtime_precision(ctx, "output", "$ref(input)")?;
    bracket_overflow(
        ctx,
        "FIX_DoubleAssign(&$ref(output), $precision(output), $ref(input), FIX_OVF_$val(OverflowHandler));",
    )
}

fn fix_to_float_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "$ref(output) = FIX_Fix2Double($ref(input), $precision(input));",
    )
}

fn add_fix_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    super::require_width(ctx, "input").map(|_| ())
}

fn add_fix_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = ctx.width("input")?;
    let doubles: Vec<String> = (1..=width)
        .map(|i| format!("FIX_Fix2Double($ref(input#{i}), $precision(input#{i}))"))
        .collect();
    precision::emit_runtime_precision(ctx, "output", &doubles.join(" + "))?;

    let lines: Vec<String> = (1..=width)
        .map(|i| {
            let op = if i == 1 { "FIX_Assign" } else { "FIX_AddAssign" };
            format!(
                "{op}(&$ref(output), $precision(output), $ref(input#{i}), $precision(input#{i}), FIX_OVF_$val(OverflowHandler));"
            )
        })
        .collect();
    bracket_overflow(ctx, &lines.join("\n"))
}

fn gain_fix_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    precision::emit_runtime_precision(
        ctx,
        "output",
        "$val(gain) * FIX_Fix2Double($ref(input), $precision(input))",
    )?;
    bracket_overflow(
        ctx,
        "FIX_MulDouble(&$ref(output), $precision(output), $ref(input), $precision(input), $val(gain), FIX_OVF_$val(OverflowHandler));",
    )
}
