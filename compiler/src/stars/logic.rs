// Logic and quantization stars.

use super::{channel_terms, require_width};
use crate::codegen::{Section, StarCtx};
use crate::descriptor::{ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::GenResult;
use crate::types::{DataType, ParamType, ParamValue};

pub(super) fn classes() -> Vec<StarClass> {
    vec![logic(), int_to_bits(), quant(), quantizer()]
}

// ── Logic ───────────────────────────────────────────────────────────────────

const LOGIC_OPS: [&str; 7] = ["NOT", "AND", "NAND", "OR", "NOR", "XOR", "XNOR"];

fn logic() -> StarClass {
    StarClass::new("Logic")
        .port(PortDecl::multi_input("input", DataType::Int))
        .port(PortDecl::output("output", DataType::Int))
        .param(ParamDecl::new(
            "logic",
            ParamType::enumeration(&LOGIC_OPS),
            "AND",
        ))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, logic_initialize)
                .on(Phase::Fire, logic_fire),
        )
}

fn logic_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = require_width(ctx, "input")?;
    if ctx.str_param("logic")? == "NOT" && width != 1 {
        return Err(ctx.invalid(
            "logic",
            format!("NOT takes exactly one input, {} connected", width),
        ));
    }
    Ok(())
}

/// Inputs are truth values (non-zero is true); the output is 0 or 1.
fn logic_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = ctx.width("input")?;
    let terms = channel_terms("input", width, "({} != 0)");
    let op = ctx.str_param("logic")?;
    let and = || terms.join(" && ");
    let or = || terms.join(" || ");
    let xor = || format!("(({}) % 2)", terms.join(" + "));
    let expr = match op.as_str() {
        "NOT" => format!("!{}", terms.join("")),
        "AND" => and(),
        "NAND" => format!("!({})", and()),
        "OR" => or(),
        "NOR" => format!("!({})", or()),
        "XOR" => xor(),
        "XNOR" => format!("!{}", xor()),
        other => return Err(ctx.invalid("logic", format!("unknown operation '{}'", other))),
    };
    ctx.emit(Section::Fire, &format!("$ref(output) = {};", expr))
}

// ── Bit unpacking ───────────────────────────────────────────────────────────

const MAX_BITS: i64 = 32;

/// Splits each input word into its `nBits` low bits, most significant first.
/// With `nBits = 0` firing emits nothing and the output must stay unconnected.
fn int_to_bits() -> StarClass {
    StarClass::new("IntToBits")
        .port(PortDecl::input("input", DataType::Int))
        .port(PortDecl::output("output", DataType::Int))
        .param(ParamDecl::new("nBits", ParamType::Int, "4"))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, int_to_bits_initialize)
                .on(Phase::Fire, int_to_bits_fire),
        )
}

fn int_to_bits_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let n = ctx.int_param("nBits")?;
    if n < 0 {
        return Err(ctx.invalid("nBits", "must be non-negative"));
    }
    if n > MAX_BITS {
        return Err(ctx.invalid(
            "nBits",
            format!("must be at most {}, the bits in an int", MAX_BITS),
        ));
    }
    if n == 0 {
        if ctx.width("output")? > 0 {
            return Err(ctx.invalid(
                "nBits",
                "0 bits sends nothing; leave the output unconnected",
            ));
        }
        return Ok(());
    }
    ctx.set_samples("output", n as u32)
}

fn int_to_bits_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    match ctx.int_param("nBits")? {
        0 => return Ok(()),
        1 => return ctx.emit(Section::Fire, "$ref(output) = $ref(input) & 1;"),
        _ => {}
    }
    ctx.emit(
        Section::Fire,
        "{\n    int i;\n    int word = $ref(input);\n    for (i = 0; i < $val(nBits); i++) {\n        $ref(output, i) = (word >> ($val(nBits) - 1 - i)) & 1;\n    }\n}",
    )
}

// ── Quantizers ──────────────────────────────────────────────────────────────

const QUANT_SEARCH: &str = "static int $sharedSymbol(Quant,search)(const double* thresholds, int n, double x)
{
    int lo = 0;
    int hi = n;
    while (lo < hi) {
        int mid = (lo + hi) / 2;
        if (x < thresholds[mid])
            hi = mid;
        else
            lo = mid + 1;
    }
    return lo;
}";

/// Maps the input to `levels[k]`, where `k` counts the thresholds at or
/// below it.
fn quant() -> StarClass {
    StarClass::new("Quant")
        .port(PortDecl::input("input", DataType::Float))
        .port(PortDecl::output("output", DataType::Float))
        .param(ParamDecl::new("thresholds", ParamType::FloatArray, "0.0"))
        .param(ParamDecl::new("levels", ParamType::FloatArray, "-1.0 1.0"))
        .hooks(
            PhaseHooks::new()
                .on(Phase::PreInitialize, quant_preinitialize)
                .on(Phase::Initialize, quant_initialize)
                .on(Phase::Fire, quant_fire),
        )
}

fn quant_preinitialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.shared("search", QUANT_SEARCH).map(|_| ())
}

fn float_array<'p>(ctx: &'p StarCtx<'_>, name: &str) -> GenResult<&'p [f64]> {
    match ctx.param(name)? {
        ParamValue::FloatArray(v) => Ok(v),
        _ => Err(ctx.invalid(name, "expected an array of numbers")),
    }
}

fn quant_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let thresholds = float_array(ctx, "thresholds")?;
    let levels = float_array(ctx, "levels")?;
    if thresholds.is_empty() {
        return Err(ctx.invalid("thresholds", "at least one threshold is required"));
    }
    if levels.len() != thresholds.len() + 1 {
        return Err(ctx.invalid(
            "levels",
            format!(
                "{} thresholds need {} levels, found {}",
                thresholds.len(),
                thresholds.len() + 1,
                levels.len()
            ),
        ));
    }
    if thresholds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ctx.invalid("thresholds", "must be strictly increasing"));
    }
    Ok(())
}

fn quant_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "$ref(output) = $ref(levels, $sharedSymbol(Quant,search)($ref(thresholds), $size(thresholds), $ref(input)));",
    )
}

/// Uniform quantizer: `levels` equal steps over [min, max], each mapped to
/// its midpoint.
fn quantizer() -> StarClass {
    StarClass::new("Quantizer")
        .port(PortDecl::input("input", DataType::Float))
        .port(PortDecl::output("output", DataType::Float))
        .param(ParamDecl::new("levels", ParamType::Int, "2"))
        .param(ParamDecl::new("min", ParamType::Float, "-1.0"))
        .param(ParamDecl::new("max", ParamType::Float, "1.0"))
        .hooks(
            PhaseHooks::new()
                .on(Phase::Initialize, quantizer_initialize)
                .on(Phase::Fire, quantizer_fire),
        )
}

fn quantizer_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if ctx.int_param("levels")? <= 0 {
        return Err(ctx.invalid("levels", "must be positive"));
    }
    if ctx.float_param("max")? <= ctx.float_param("min")? {
        return Err(ctx.invalid("max", "must be greater than min"));
    }
    Ok(())
}

fn quantizer_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit(
        Section::Fire,
        "{
    double step = ($val(max) - ($val(min))) / $val(levels);
    int k = (int)(($ref(input) - ($val(min))) / step);
    if (k < 0)
        k = 0;
    if (k > $val(levels) - 1)
        k = $val(levels) - 1;
    $ref(output) = $val(min) + (k + 0.5) * step;
}",
    )
}

#[cfg(test)]
mod tests {
    use crate::codegen::{generate, CodegenOptions, Section};
    use crate::diag::GenError;
    use crate::graph::Graph;
    use crate::library::StarLibrary;

    fn logic_graph(op: &str, inputs: usize) -> Graph {
        let lib = StarLibrary::with_builtins().unwrap();
        let mut g = Graph::new();
        for i in 0..inputs {
            g.add_star(&lib, "Const", &format!("k{}", i), &[]).unwrap();
            g.add_star(&lib, "Sgn", &format!("c{}", i), &[]).unwrap();
        }
        g.add_star(&lib, "Logic", "l", &[("logic", op)]).unwrap();
        for i in 0..inputs {
            let (k, c) = (format!("k{}", i), format!("c{}", i));
            g.connect((&k, "output"), (&c, "input")).unwrap();
            g.connect((&c, "output"), ("l", "input")).unwrap();
        }
        g.add_star(&lib, "Printer", "p", &[]).unwrap();
        g.connect(("l", "output"), ("p", "input")).unwrap();
        g.resolve_types().unwrap();
        g.check_schedule().unwrap();
        g
    }

    #[test]
    fn xor_is_parity() {
        let mut g = logic_graph("xor", 3);
        let fire = generate(&mut g, &CodegenOptions::default())
            .unwrap()
            .section_text(Section::Fire);
        assert!(
            fire.contains("l_output = (((c0_output != 0) + (c1_output != 0) + (c2_output != 0)) % 2);"),
            "{fire}"
        );
    }

    #[test]
    fn nand_negates_the_conjunction() {
        let mut g = logic_graph("NAND", 2);
        let fire = generate(&mut g, &CodegenOptions::default())
            .unwrap()
            .section_text(Section::Fire);
        assert!(
            fire.contains("l_output = !((c0_output != 0) && (c1_output != 0));"),
            "{fire}"
        );
    }

    #[test]
    fn not_needs_one_input() {
        let mut g = logic_graph("NOT", 2);
        let err = generate(&mut g, &CodegenOptions::default()).unwrap_err();
        assert!(matches!(err, GenError::Validation { ref param, .. } if param == "logic"));
    }

    fn bits_into_printer(n: &str) -> crate::diag::GenResult<crate::codegen::GeneratedProgram> {
        let lib = StarLibrary::with_builtins().unwrap();
        let mut g = Graph::new();
        g.add_star(&lib, "Const", "k", &[]).unwrap();
        g.add_star(&lib, "Sgn", "s", &[]).unwrap();
        g.add_star(&lib, "IntToBits", "bits", &[("nBits", n)]).unwrap();
        g.add_star(&lib, "Printer", "p", &[]).unwrap();
        g.connect(("k", "output"), ("s", "input")).unwrap();
        g.connect(("s", "output"), ("bits", "input")).unwrap();
        g.connect(("bits", "output"), ("p", "input")).unwrap();
        g.resolve_types().unwrap();
        g.set_schedule(&[("k", 1), ("s", 1), ("bits", 1), ("p", 8)]).unwrap();
        g.check_schedule().unwrap();
        generate(&mut g, &CodegenOptions::default())
    }

    #[test]
    fn int_to_bits_bounds() {
        for n in ["-1", "33", "0"] {
            let err = bits_into_printer(n).unwrap_err();
            assert!(
                matches!(err, GenError::Validation { ref param, .. } if param == "nBits"),
                "nBits={n}: {err:?}"
            );
        }
        assert!(bits_into_printer("8").is_ok());
    }

    #[test]
    fn zero_bits_moves_nothing() {
        let lib = StarLibrary::with_builtins().unwrap();
        let mut g = Graph::new();
        g.add_star(&lib, "Const", "k", &[]).unwrap();
        g.add_star(&lib, "Sgn", "s", &[]).unwrap();
        g.add_star(&lib, "IntToBits", "bits", &[("nBits", "0")]).unwrap();
        g.connect(("k", "output"), ("s", "input")).unwrap();
        g.connect(("s", "output"), ("bits", "input")).unwrap();
        g.resolve_types().unwrap();
        g.check_schedule().unwrap();
        let program = generate(&mut g, &CodegenOptions::default()).unwrap();
        let fire = program.section_text(Section::Fire);
        assert!(!fire.contains("bits"), "{fire}");
        assert_eq!(program.section(Section::Fire).len(), 2);
    }

    fn quantizer_graph(levels: &str) -> Graph {
        let lib = StarLibrary::with_builtins().unwrap();
        let mut g = Graph::new();
        g.add_star(&lib, "Ramp", "r", &[]).unwrap();
        g.add_star(&lib, "Quantizer", "q", &[("levels", levels)]).unwrap();
        g.add_star(&lib, "Printer", "p", &[]).unwrap();
        g.connect(("r", "output"), ("q", "input")).unwrap();
        g.connect(("q", "output"), ("p", "input")).unwrap();
        g.resolve_types().unwrap();
        g.check_schedule().unwrap();
        g
    }

    #[test]
    fn quantizer_levels_must_be_positive() {
        for levels in ["0", "-3"] {
            let mut g = quantizer_graph(levels);
            let err = generate(&mut g, &CodegenOptions::default()).unwrap_err();
            assert!(
                matches!(err, GenError::Validation { ref param, .. } if param == "levels"),
                "levels={levels}: {err:?}"
            );
        }
        let mut g = quantizer_graph("4");
        let fire = generate(&mut g, &CodegenOptions::default())
            .unwrap()
            .section_text(Section::Fire);
        assert!(fire.contains("double step = (1.0 - (-1.0)) / 4;"), "{fire}");
    }
}

