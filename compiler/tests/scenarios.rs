// End-to-end generation scenarios through the library API.
//
// Each test parses a netlist, runs the full pass pipeline and checks the
// assembled sections. The demo netlists under `demos/` are compiled as-is.

use std::path::{Path, PathBuf};

use starc::codegen::{CodegenOptions, GeneratedProgram, Section};
use starc::diag::{codes, Diagnostic};
use starc::library::StarLibrary;
use starc::pass::PassId;
use starc::pipeline::{run_pipeline, CompilationState};

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn demo(name: &str) -> String {
    let path = project_root().join("demos").join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e))
}

fn compile_with(source: &str, library: StarLibrary) -> Result<GeneratedProgram, Vec<Diagnostic>> {
    let parsed = starc::parser::parse(source);
    assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
    let mut state = CompilationState::new(parsed.program.unwrap(), library);
    match run_pipeline(&mut state, PassId::Generate, &CodegenOptions::default(), |_, _| {}) {
        Ok(()) => Ok(state.generated.unwrap()),
        Err(_) => Err(state.diagnostics),
    }
}

fn compile(source: &str) -> Result<GeneratedProgram, Vec<Diagnostic>> {
    compile_with(source, StarLibrary::with_builtins().unwrap())
}

fn compile_ok(source: &str) -> GeneratedProgram {
    compile(source).unwrap_or_else(|diags| {
        let text: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
        panic!("compilation failed:\n{}", text.join("\n"))
    })
}

fn first_error(source: &str) -> Diagnostic {
    let diags = compile(source).err().expect("expected compilation to fail");
    diags
        .into_iter()
        .find(|d| d.is_error())
        .expect("expected an error diagnostic")
}

// ── Demo netlists ───────────────────────────────────────────────────────────

#[test]
fn ramp_gain_demo() {
    let program = compile_ok(&demo("ramp_gain.net"));
    assert_eq!(program.iterations, 3);
    let fire = program.section_text(Section::Fire);
    assert!(fire.contains("ramp1_value += 0.5;"), "{fire}");
    assert!(fire.contains("gain1_output = 2.0 * ramp1_output;"), "{fire}");
    assert!(
        fire.contains("fprintf(printer_fp, \"%g\\t\", (double) gain1_output);"),
        "{fire}"
    );
    assert_eq!(
        program.section_text(Section::Initialize),
        "printer_fp = stdout;"
    );
}

#[test]
fn quantize_demo_defines_the_search_once() {
    let program = compile_ok(&demo("quantize.net"));
    let procedures = program.section(Section::Procedure);
    assert_eq!(procedures.len(), 1, "{:?}", procedures);
    assert!(procedures[0].text.contains("Quant_search"));
    let fire = program.section_text(Section::Fire);
    assert!(fire.contains("coarse_output = coarse_levels[Quant_search("), "{fire}");
    assert!(fire.contains("fine_output = fine_levels[Quant_search("), "{fire}");
    assert!(fire.contains("fork_output_1 = ramp1_output;"), "{fire}");
    assert!(fire.contains("fork_output_2 = ramp1_output;"), "{fire}");
    let decls = program.section_text(Section::Declaration);
    assert!(decls.contains("static double fine_thresholds[3] = {-0.5, 0.0, 0.5};"), "{decls}");
}

#[test]
fn chop_demo_buffers_follow_the_schedule() {
    let program = compile_ok(&demo("chop.net"));
    let decls = program.section_text(Section::Declaration);
    assert!(decls.contains("static double ramp1_output[4];"), "{decls}");
    assert!(decls.contains("static double chop_output[3];"), "{decls}");
    let fire = program.section_text(Section::Fire);
    assert!(fire.contains("ramp1_output[3] = ramp1_value;"), "{fire}");
    assert!(fire.contains("chop_output[0] = ramp1_output[2];"), "{fire}");
    assert!(fire.contains("chop_output[2] = 0;"), "{fire}");
    assert!(fire.contains("(double) chop_output[2]);"), "{fire}");
}

#[test]
fn fixed_point_demo_carries_precisions() {
    let program = compile_ok(&demo("fixed_point.net"));
    assert!(program
        .section_text(Section::Include)
        .contains("#include \"fix.h\""));
    let fire = program.section_text(Section::Fire);
    assert!(fire.contains("back_output = FIX_Fix2Double(half_output, 16, 4);"), "{fire}");
    assert!(fire.contains("tofix_overflows++;"), "{fire}");
    assert!(program
        .section_text(Section::Wrapup)
        .contains("tofix: %d overflow(s)"));
}

#[test]
fn template_star_demo() {
    let mut library = StarLibrary::with_builtins().unwrap();
    let n = library
        .load_file(&project_root().join("demos").join("scale.star"))
        .unwrap();
    assert_eq!(n, 1);
    let program = compile_with(&demo("template.net"), library).unwrap();
    let fire = program.section_text(Section::Fire);
    assert!(fire.contains("scale_output = 3.0 * ramp1_output;"), "{fire}");
    assert!(fire.contains("scale_count++;"), "{fire}");
    let decls = program.section_text(Section::Declaration);
    assert!(decls.contains("static int scale_count = 0;"), "{decls}");
    assert!(program
        .section_text(Section::Wrapup)
        .contains("scaled %d samples"));
}

// ── Shared resources ────────────────────────────────────────────────────────

#[test]
fn headers_are_included_once() {
    let program = compile_ok(
        "star r : Ramp\nstar a : Sin\nstar b : Cos\nstar p : Printer\n\
         connect r.output -> a.input\nconnect a.output -> b.input\nconnect b.output -> p.input\n",
    );
    let includes: Vec<&str> = program
        .section(Section::Include)
        .iter()
        .map(|f| f.text.as_str())
        .collect();
    assert_eq!(
        includes,
        vec!["#include <math.h>", "#include <stdio.h>", "#include <stdlib.h>"]
    );
}

#[test]
fn complex_typedef_is_emitted_once() {
    let program = compile_ok(
        "star re : Const(level = 1.0)\nstar im : Const(level = 2.0)\n\
         star cx : RectToCx\nstar cx2 : RectToCx\nstar sum : AddCx\nstar p : Printer\n\
         star re2 : Const\nstar im2 : Const\n\
         connect re.output -> cx.real\nconnect im.output -> cx.imag\n\
         connect re2.output -> cx2.real\nconnect im2.output -> cx2.imag\n\
         connect cx.output -> sum.input\nconnect cx2.output -> sum.input\n\
         connect sum.output -> p.input\n\
         schedule re, im, re2, im2, cx, cx2, sum, p\n",
    );
    let globals = program.section(Section::Global);
    assert_eq!(globals.len(), 1);
    assert!(globals[0].text.contains("typedef struct"));
    let decls = program.section_text(Section::Declaration);
    assert!(decls.contains("static complex cx_output;"), "{decls}");
}

#[test]
fn expression_star_inlines_its_expression() {
    let program = compile_ok(
        "star a : Ramp\nstar b : Const(level = 3.0)\n\
         star e : Expr(expr = \"$ref(in#1) * $ref(in#2) + 1.0\")\nstar p : Printer\n\
         connect a.output -> e.in\nconnect b.output -> e.in\nconnect e.out -> p.input\n",
    );
    let fire = program.section_text(Section::Fire);
    assert!(fire.contains("e_out = a_output * b_output + 1.0;"), "{fire}");
}

// ── Failures ────────────────────────────────────────────────────────────────

#[test]
fn unknown_class_is_reported_with_its_span() {
    let src = "star x : Nope\n";
    let d = first_error(src);
    assert_eq!(d.code, Some(codes::E0100));
    assert!(d.span.is_some());
}

#[test]
fn schedule_of_unknown_star_fails() {
    let d = first_error("star r : Ramp\nstar p : Printer\nconnect r.output -> p.input\nschedule r, q\n");
    assert_eq!(d.code, Some(codes::E0300));
}

#[test]
fn consumer_before_producer_fails() {
    let d = first_error("star r : Ramp\nstar p : Printer\nconnect r.output -> p.input\nschedule p, r\n");
    assert_eq!(d.code, Some(codes::E0302));
}

#[test]
fn unbalanced_rates_fail_generation() {
    let d = first_error(
        "star r : Ramp\nstar c : Chop(nread = 2, nwrite = 1)\nstar p : Printer\n\
         connect r.output -> c.input\nconnect c.output -> p.input\n",
    );
    assert_eq!(d.code, Some(codes::E0200));
    assert!(d.message.contains("unbalanced buffer"), "{}", d.message);
}

#[test]
fn quant_with_wrong_level_count_fails() {
    let d = first_error(
        "star r : Ramp\nstar q : Quant(thresholds = [0.0, 1.0], levels = [1.0, 2.0])\n\
         star p : Printer\nconnect r.output -> q.input\nconnect q.output -> p.input\n",
    );
    assert_eq!(d.code, Some(codes::E0200));
    assert!(d.message.contains("levels"), "{}", d.message);
}

#[test]
fn bad_expression_is_a_resolution_error() {
    let d = first_error(
        "star a : Ramp\nstar e : Expr(expr = \"$ref(nothing)\")\nstar p : Printer\n\
         connect a.output -> e.in\nconnect e.out -> p.input\n",
    );
    assert_eq!(d.code, Some(codes::E0201));
}

#[test]
fn unconnected_port_is_only_a_warning_at_build_time() {
    let parsed = starc::parser::parse("star r : Ramp\nstar g : Gain\nconnect r.output -> g.input\n");
    let mut state = CompilationState::new(
        parsed.program.unwrap(),
        StarLibrary::with_builtins().unwrap(),
    );
    run_pipeline(&mut state, PassId::BuildGraph, &CodegenOptions::default(), |_, _| {}).unwrap();
    assert!(state
        .diagnostics
        .iter()
        .any(|d| d.code == Some(codes::W0100) && !d.is_error()));
}

#[test]
fn shared_symbol_cannot_take_an_instance_name() {
    let mut library = StarLibrary::with_builtins().unwrap();
    library
        .load_str(
            "STAR(Scratch, IN(input, float), OUT(output, float))\n\
             /*** preinitBlock ***/\nstatic double $starSymbol(search);\n/**/\n\
             /*** fireBlock ***/\n$ref(output) = $ref(input);\n/**/\n",
            Path::new("scratch.star"),
        )
        .unwrap();
    let diags = compile_with(
        "star r : Ramp\nstar Quant : Scratch\nstar q : Quant\nstar p : Printer\n\
         connect r.output -> Quant.input\nconnect Quant.output -> q.input\n\
         connect q.output -> p.input\n",
        library,
    )
    .err()
    .expect("expected compilation to fail");
    let d = diags.iter().find(|d| d.is_error()).unwrap();
    assert_eq!(d.code, Some(codes::E0201));
    assert!(d.message.contains("Quant_search"), "{}", d.message);
}
