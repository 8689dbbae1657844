// Arithmetic stars: scalar math, multi-input sums, complex parts.

use super::{channel_terms, require_width};
use crate::codegen::{Section, StarCtx};
use crate::descriptor::{ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::GenResult;
use crate::types::{DataType, ParamType};

pub(super) fn classes() -> Vec<StarClass> {
    vec![
        gain(),
        unary("Abs", abs_fire).include("<math.h>"),
        sgn(),
        unary("Sin", sin_fire).include("<math.h>"),
        unary("Cos", cos_fire).include("<math.h>"),
        sum("Add", DataType::Float),
        sum("AddInt", DataType::Int),
        add_cx(),
        rect_to_cx(),
        div_by_int(),
    ]
}

fn unary(name: &str, fire: fn(&mut StarCtx<'_>) -> GenResult<()>) -> StarClass {
    StarClass::new(name)
        .port(PortDecl::input("input", DataType::Float))
        .port(PortDecl::output("output", DataType::Float))
        .hooks(PhaseHooks::new().on(Phase::Fire, fire))
}

fn gain() -> StarClass {
    unary("Gain", gain_fire).param(ParamDecl::new("gain", ParamType::Float, "1.0"))
}

fn gain_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(Section::Fire, "$ref(output) = $val(gain) * $ref(input);")
}

fn abs_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(Section::Fire, "$ref(output) = fabs($ref(input));")
}

fn sin_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(Section::Fire, "$ref(output) = sin($ref(input));")
}

fn cos_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(Section::Fire, "$ref(output) = cos($ref(input));")
}

/// Sign of the input as an int: 1 for zero and above, -1 below.
fn sgn() -> StarClass {
    StarClass::new("Sgn")
        .port(PortDecl::input("input", DataType::Float))
        .port(PortDecl::output("output", DataType::Int))
        .hooks(PhaseHooks::new().on(Phase::Fire, sgn_fire))
}

fn sgn_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "$ref(output) = ($ref(input) >= 0.0) ? 1 : -1;",
    )
}

// ── Sums ────────────────────────────────────────────────────────────────────

fn sum(name: &str, dtype: DataType) -> StarClass {
    StarClass::new(name)
        .port(PortDecl::multi_input("input", dtype))
        .port(PortDecl::output("output", dtype))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, sum_initialize)
                .on(Phase::Fire, sum_fire),
        )
}

fn sum_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    require_width(ctx, "input").map(|_| ())
}

/// One term per connected channel, in connection order.
fn sum_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = ctx.width("input")?;
    let terms = channel_terms("input", width, "{}");
    ctx.emit(
        Section::Fire,
        &format!("$ref(output) = {};", terms.join(" + ")),
    )
}

fn add_cx() -> StarClass {
    StarClass::new("AddCx")
        .port(PortDecl::multi_input("input", DataType::Complex))
        .port(PortDecl::output("output", DataType::Complex))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, sum_initialize)
                .on(Phase::Fire, add_cx_fire),
        )
}

fn add_cx_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = ctx.width("input")?;
    let mut code = Vec::with_capacity(2);
    for part in ["real", "imag"] {
        let terms = channel_terms("input", width, &format!("{{}}.{}", part));
        code.push(format!("$ref(output).{} = {};", part, terms.join(" + ")));
    }
    ctx.emit(Section::Fire, &code.join("\n"))
}

fn rect_to_cx() -> StarClass {
    StarClass::new("RectToCx")
        .port(PortDecl::input("real", DataType::Float))
        .port(PortDecl::input("imag", DataType::Float))
        .port(PortDecl::output("output", DataType::Complex))
        .hooks(PhaseHooks::new().on(Phase::Fire, rect_to_cx_fire))
}

fn rect_to_cx_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "$ref(output).real = $ref(real);\n$ref(output).imag = $ref(imag);",
    )
}

// ── Integer division ────────────────────────────────────────────────────────

fn div_by_int() -> StarClass {
    StarClass::new("DivByInt")
        .port(PortDecl::input("input", DataType::Int))
        .port(PortDecl::output("output", DataType::Int))
        .param(ParamDecl::new("divisor", ParamType::Int, "2"))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, div_by_int_initialize)
                .on(Phase::Fire, div_by_int_fire),
        )
}

fn div_by_int_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if ctx.int_param("divisor")? == 0 {
        return Err(ctx.invalid("divisor", "must be non-zero"));
    }
    Ok(())
}

fn div_by_int_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(Section::Fire, "$ref(output) = $ref(input) / $val(divisor);")
}
