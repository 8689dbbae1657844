// Source stars.

use crate::codegen::{Section, StarCtx};
use crate::descriptor::{ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::GenResult;
use crate::types::{DataType, ParamType};

pub(super) fn classes() -> Vec<StarClass> {
    vec![ramp(), konst()]
}

/// Ramp: `value`, then `value + step`, ...
fn ramp() -> StarClass {
    StarClass::new("Ramp")
        .port(PortDecl::output("output", DataType::Float))
        .param(ParamDecl::new("step", ParamType::Float, "1.0"))
        .param(ParamDecl::state("value", ParamType::Float, "0.0"))
        .hooks(PhaseHooks::new().on(Phase::Fire, ramp_fire))
}

fn ramp_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "$ref(output) = $ref(value);\n$ref(value) += $val(step);",
    )
}

fn konst() -> StarClass {
    StarClass::new("Const")
        .port(PortDecl::output("output", DataType::Float))
        .param(ParamDecl::new("level", ParamType::Float, "0.0"))
        .hooks(PhaseHooks::new().on(Phase::Fire, const_fire))
}

fn const_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(Section::Fire, "$ref(output) = $val(level);")
}
