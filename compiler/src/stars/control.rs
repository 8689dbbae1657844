// Routing stars: block reshaping, fan-out, data-dependent selection.

use super::require_width;
use crate::codegen::{Section, StarCtx};
use crate::descriptor::{ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::GenResult;
use crate::types::{DataType, ParamType};

pub(super) fn classes() -> Vec<StarClass> {
    vec![chop(), fork(), bus_fork(), select(), switch()]
}

// ── Chop ────────────────────────────────────────────────────────────────────

/// Reads `nread` samples and writes `nwrite`: output `j` is input
/// `offset + j`, or zero past the end of the input block.
fn chop() -> StarClass {
    StarClass::new("Chop")
        .port(PortDecl::input("input", DataType::Any))
        .port(PortDecl::output("output", DataType::Any))
        .param(ParamDecl::new("nread", ParamType::Int, "128"))
        .param(ParamDecl::new("nwrite", ParamType::Int, "64"))
        .param(ParamDecl::new("offset", ParamType::Int, "0"))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, chop_initialize)
                .on(Phase::Fire, chop_fire),
        )
}

struct ChopShape {
    nread: u32,
    nwrite: u32,
    offset: u32,
}

impl ChopShape {
    fn of(ctx: &StarCtx<'_>) -> GenResult<ChopShape> {
        let positive = |name: &str| -> GenResult<u32> {
            let n = ctx.int_param(name)?;
            u32::try_from(n)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| ctx.invalid(name, "must be positive"))
        };
        let nread = positive("nread")?;
        let nwrite = positive("nwrite")?;
        let offset = u32::try_from(ctx.int_param("offset")?)
            .map_err(|_| ctx.invalid("offset", "must be non-negative"))?;
        Ok(ChopShape {
            nread,
            nwrite,
            offset,
        })
    }

    /// Whether some output sample lies past the input block.
    fn zero_fills(&self) -> bool {
        u64::from(self.offset) + u64::from(self.nwrite) > u64::from(self.nread)
    }
}

fn chop_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let shape = ChopShape::of(ctx)?;
    if shape.zero_fills() && ctx.port("output")?.dtype == DataType::Complex {
        return Err(ctx.invalid(
            "offset",
            "complex outputs cannot be zero-filled; keep offset + nwrite within nread",
        ));
    }
    ctx.set_samples("input", shape.nread)?;
    ctx.set_samples("output", shape.nwrite)
}

fn chop_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let shape = ChopShape::of(ctx)?;
    let lines: Vec<String> = (0..shape.nwrite)
        .map(|j| {
            let from = u64::from(shape.offset) + u64::from(j);
            if from < u64::from(shape.nread) {
                format!("$ref(output, {}) = $ref(input, {});", j, from)
            } else {
                format!("$ref(output, {}) = 0;", j)
            }
        })
        .collect();
    ctx.emit(Section::Fire, &lines.join("\n"))
}

// ── Fan-out ─────────────────────────────────────────────────────────────────

fn fork() -> StarClass {
    StarClass::new("Fork")
        .port(PortDecl::input("input", DataType::Any))
        .port(PortDecl::multi_output("output", DataType::Any))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, fork_initialize)
                .on(Phase::Fire, fork_fire),
        )
}

fn fork_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    require_width(ctx, "output").map(|_| ())
}

fn fork_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = ctx.width("output")?;
    let lines: Vec<String> = (1..=width)
        .map(|i| format!("$ref(output#{}) = $ref(input);", i))
        .collect();
    ctx.emit(Section::Fire, &lines.join("\n"))
}

/// Copies each channel of a bus to both output buses.
fn bus_fork() -> StarClass {
    StarClass::new("BusFork")
        .port(PortDecl::multi_input("input", DataType::Any))
        .port(PortDecl::multi_output("outputA", DataType::Any))
        .port(PortDecl::multi_output("outputB", DataType::Any))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, bus_fork_initialize)
                .on(Phase::Fire, bus_fork_fire),
        )
}

fn bus_fork_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = require_width(ctx, "input")?;
    for bus in ["outputA", "outputB"] {
        let w = ctx.width(bus)?;
        if w != width {
            return Err(ctx.invalid(
                bus,
                format!("bus width {} does not match input width {}", w, width),
            ));
        }
    }
    Ok(())
}

fn bus_fork_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = ctx.width("input")?;
    let mut lines = Vec::with_capacity(width * 2);
    for i in 1..=width {
        lines.push(format!("$ref(outputA#{i}) = $ref(input#{i});"));
        lines.push(format!("$ref(outputB#{i}) = $ref(input#{i});"));
    }
    ctx.emit(Section::Fire, &lines.join("\n"))
}

// ── Select / Switch ─────────────────────────────────────────────────────────

fn select() -> StarClass {
    StarClass::new("Select")
        .port(PortDecl::input("trueInput", DataType::Any))
        .port(PortDecl::input("falseInput", DataType::Any))
        .port(PortDecl::input("control", DataType::Int))
        .port(PortDecl::output("output", DataType::Any))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, require_unity)
                .on(Phase::Fire, select_fire),
        )
}

fn select_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "$ref(output) = $ref(control) ? $ref(trueInput) : $ref(falseInput);",
    )
}

fn switch() -> StarClass {
    StarClass::new("Switch")
        .port(PortDecl::input("input", DataType::Any))
        .port(PortDecl::input("control", DataType::Int))
        .port(PortDecl::output("trueOutput", DataType::Any))
        .port(PortDecl::output("falseOutput", DataType::Any))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, require_unity)
                .on(Phase::Fire, switch_fire),
        )
}

fn switch_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "if ($ref(control))\n    $ref(trueOutput) = $ref(input);\nelse\n    $ref(falseOutput) = $ref(input);",
    )
}

/// Select and Switch move single samples through scalar buffers only.
fn require_unity(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if ctx.repetitions() != 1 {
        return Err(ctx.invalid(
            "control",
            format!(
                "Non-unity buffers connected to a {} not yet supported (scheduled {} times)",
                ctx.class(),
                ctx.repetitions()
            ),
        ));
    }
    Ok(())
}
