// Expr: an output computed from a user-written C expression over its inputs.

use crate::codegen::{Section, StarCtx};
use crate::descriptor::{ActorDescriptor, ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::{GenError, GenResult};
use crate::types::{DataType, ParamType};

pub(super) fn class() -> StarClass {
    StarClass::new("Expr")
        .port(PortDecl::multi_input("in", DataType::Float))
        .port(PortDecl::output("out", DataType::Float))
        .param(ParamDecl::new("expr", ParamType::Str, "$ref(in#1)"))
        .param(ParamDecl::new("inDataType", ParamType::Str, "f"))
        .param(ParamDecl::new("outDataType", ParamType::Str, "f"))
        .hooks(
            PhaseHooks::new()
                .configure_with(expr_configure)
                .on(Phase::Fire, expr_fire),
        )
}

/// Port types come from the one-letter type parameters.
fn expr_configure(actor: &mut ActorDescriptor) -> GenResult<()> {
    for (param, port) in [("inDataType", "in"), ("outDataType", "out")] {
        let letter = actor.value(param)?.literal();
        let dtype = DataType::from_letter(&letter).ok_or_else(|| {
            GenError::validation(
                actor.name.as_str(),
                param,
                format!("'{}' is not a data type; use f, i, c or a", letter),
            )
        })?;
        actor.set_port_type(port, dtype)?;
    }
    Ok(())
}

fn expr_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(Section::Fire, "$ref(out) = $val(expr);")
}
