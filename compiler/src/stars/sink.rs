// Printer: writes one line per firing, tab-separated across its inputs.

use super::require_width;
use crate::codegen::{Section, StarCtx};
use crate::descriptor::{ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::GenResult;
use crate::template::quote_dollars;
use crate::types::{c_string_literal, DataType, ParamType};

pub(super) fn class() -> StarClass {
    StarClass::new("Printer")
        .port(PortDecl::multi_input("input", DataType::Any))
        .param(ParamDecl::new("fileName", ParamType::Str, ""))
        .include("<stdio.h>")
        .include("<stdlib.h>")
        .hooks(
            PhaseHooks::new()
                .on(Phase::PreInitialize, printer_preinitialize)
                .on(Phase::Initialize, printer_initialize)
                .on(Phase::Fire, printer_fire)
                .on(Phase::Wrapup, printer_wrapup),
        )
}

fn printer_preinitialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.declare("static FILE* $starSymbol(fp);")
}

fn printer_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    require_width(ctx, "input")?;
    let file_name = ctx.str_param("fileName")?;
    if file_name.is_empty() {
        return ctx.emit(Section::Initialize, "$starSymbol(fp) = stdout;");
    }
    let path = quote_dollars(&c_string_literal(&file_name));
    ctx.emit(
        Section::Initialize,
        &format!(
            "if (($starSymbol(fp) = fopen({path}, \"w\")) == NULL) {{
    fprintf(stderr, \"cannot open %s for writing\\n\", {path});
    exit(1);
}}"
        ),
    )
}

fn printer_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    let width = ctx.width("input")?;
    let dtype = ctx.port("input")?.dtype;
    let mut lines = Vec::with_capacity(width + 1);
    for i in 1..=width {
        let value = format!("$ref(input#{})", i);
        lines.push(match dtype {
            DataType::Complex => format!(
                "fprintf($starSymbol(fp), \"%g %g\\t\", {v}.real, {v}.imag);",
                v = value
            ),
            DataType::Fix => format!(
                "fprintf($starSymbol(fp), \"%g\\t\", FIX_Fix2Double({}, $precision(input#{})));",
                value, i
            ),
            _ => format!("fprintf($starSymbol(fp), \"%g\\t\", (double) {});", value),
        });
    }
    lines.push("fprintf($starSymbol(fp), \"\\n\");".to_string());
    ctx.emit(Section::Fire, &lines.join("\n"))
}

fn printer_wrapup(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if ctx.str_param("fileName")?.is_empty() {
        return Ok(());
    }
    ctx.emit(Section::Wrapup, "fclose($starSymbol(fp));")
}

#[cfg(test)]
mod tests {
    use crate::codegen::{generate, CodegenOptions, GeneratedProgram, Section};
    use crate::graph::Graph;
    use crate::library::StarLibrary;

    fn print_ramp(params: &[(&str, &str)]) -> GeneratedProgram {
        let lib = StarLibrary::with_builtins().unwrap();
        let mut g = Graph::new();
        g.add_star(&lib, "Ramp", "r", &[]).unwrap();
        g.add_star(&lib, "Printer", "p", params).unwrap();
        g.connect(("r", "output"), ("p", "input")).unwrap();
        g.resolve_types().unwrap();
        g.check_schedule().unwrap();
        generate(&mut g, &CodegenOptions::default()).unwrap()
    }

    #[test]
    fn stdout_needs_no_cleanup() {
        let program = print_ramp(&[]);
        assert_eq!(program.section_text(Section::Initialize), "p_fp = stdout;");
        assert!(program.section(Section::Wrapup).is_empty());
    }

    #[test]
    fn file_is_opened_and_closed() {
        let program = print_ramp(&[("fileName", "out.txt")]);
        let init = program.section_text(Section::Initialize);
        assert!(init.contains("(p_fp = fopen(\"out.txt\", \"w\")) == NULL"), "{init}");
        assert!(init.contains("cannot open %s for writing\\n\", \"out.txt\");"), "{init}");
        assert_eq!(program.section_text(Section::Wrapup), "fclose(p_fp);");
    }

    #[test]
    fn file_name_is_a_valid_c_string() {
        let program = print_ramp(&[("fileName", "we\"ird$\\name")]);
        let init = program.section_text(Section::Initialize);
        assert!(init.contains("fopen(\"we\\\"ird$\\\\name\", \"w\")"), "{init}");
    }

    #[test]
    fn one_column_per_channel() {
        let lib = StarLibrary::with_builtins().unwrap();
        let mut g = Graph::new();
        g.add_star(&lib, "Ramp", "a", &[]).unwrap();
        g.add_star(&lib, "Const", "b", &[]).unwrap();
        g.add_star(&lib, "Printer", "p", &[]).unwrap();
        g.connect(("a", "output"), ("p", "input")).unwrap();
        g.connect(("b", "output"), ("p", "input")).unwrap();
        g.resolve_types().unwrap();
        g.check_schedule().unwrap();
        let fire = generate(&mut g, &CodegenOptions::default())
            .unwrap()
            .section_text(Section::Fire);
        assert!(
            fire.contains(
                "fprintf(p_fp, \"%g\\t\", (double) a_output);\nfprintf(p_fp, \"%g\\t\", (double) b_output);\nfprintf(p_fp, \"\\n\");"
            ),
            "{fire}"
        );
    }
}
