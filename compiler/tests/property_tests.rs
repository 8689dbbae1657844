// Property-based tests for compiler invariants.
//
// Three categories:
// 1. Gain chains: generated netlists of any length compile, with one buffer
//    per net and every placeholder resolved; a second compile is identical
// 2. Multiport sums reference every connected channel once, in order
// 3. Symbol namespace: claimed identifiers never collide
// 4. Resolver: text without placeholders passes through unchanged
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;

use starc::codegen::{CodegenOptions, Section};
use starc::library::StarLibrary;
use starc::pass::PassId;
use starc::pipeline::{run_pipeline, CompilationState};
use starc::symbols::SymbolTable;

// ── Netlist generator ───────────────────────────────────────────────────────

/// A Ramp feeding `gains.len()` Gain stars in series, ending in a Printer.
fn chain_netlist(gains: &[f64], iterations: u32) -> String {
    let mut src = format!("set iterations = {}\nstar src : Ramp\n", iterations);
    for (i, g) in gains.iter().enumerate() {
        src.push_str(&format!("star g{} : Gain(gain = {:?})\n", i, g));
    }
    src.push_str("star out : Printer\n");
    let mut prev = "src".to_string();
    for i in 0..gains.len() {
        src.push_str(&format!("connect {}.output -> g{}.input\n", prev, i));
        prev = format!("g{}", i);
    }
    src.push_str(&format!("connect {}.output -> out.input\n", prev));
    src
}

fn compile(src: &str) -> Result<starc::codegen::GeneratedProgram, String> {
    let parsed = starc::parser::parse(src);
    if !parsed.errors.is_empty() {
        return Err(format!("parse errors: {:?}", parsed.errors));
    }
    let mut state = CompilationState::new(
        parsed.program.unwrap(),
        StarLibrary::with_builtins().unwrap(),
    );
    match run_pipeline(&mut state, PassId::Generate, &CodegenOptions::default(), |_, _| {}) {
        Ok(()) => Ok(state.generated.unwrap()),
        Err(_) => Err(format!("diagnostics: {:?}", state.diagnostics)),
    }
}

fn arb_chain() -> impl Strategy<Value = (Vec<f64>, u32)> {
    (
        prop::collection::vec(-1000.0f64..1000.0f64, 0..12),
        1u32..100,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn gain_chains_compile((gains, iterations) in arb_chain()) {
        let src = chain_netlist(&gains, iterations);
        let program = compile(&src);
        prop_assert!(program.is_ok(), "{}", program.as_ref().err().unwrap());
        let program = program.unwrap();

        prop_assert_eq!(program.iterations, iterations);
        // One fire fragment per star: source, gains, printer.
        prop_assert_eq!(program.section(Section::Fire).len(), gains.len() + 2);
        let rendered = program.render();
        prop_assert!(!rendered.contains('$'), "unresolved placeholder:\n{}", rendered);
        let buffers = program
            .section(Section::Declaration)
            .iter()
            .filter(|f| f.text.starts_with("static double") && f.text.ends_with("_output;"))
            .count();
        prop_assert_eq!(buffers, gains.len() + 1);

        let again = compile(&src).unwrap();
        prop_assert_eq!(again.render(), rendered);
    }

    #[test]
    fn sums_reference_every_channel(width in 2usize..9) {
        let mut src = String::new();
        for i in 0..width {
            src.push_str(&format!("star c{} : Const\n", i));
        }
        src.push_str("star sum : Add\nstar out : Printer\n");
        for i in 0..width {
            src.push_str(&format!("connect c{}.output -> sum.input\n", i));
        }
        src.push_str("connect sum.output -> out.input\n");

        let program = compile(&src);
        prop_assert!(program.is_ok(), "{}", program.as_ref().err().unwrap());
        let fire = program.unwrap().section_text(Section::Fire);
        let terms: Vec<String> = (0..width).map(|i| format!("c{}_output", i)).collect();
        let expected = format!("sum_output = {};", terms.join(" + "));
        prop_assert!(fire.contains(&expected), "missing `{}` in\n{}", expected, fire);
    }

    #[test]
    fn claimed_symbols_are_unique(bases in prop::collection::vec("[a-c]{1,2}(_[0-9])?", 1..40)) {
        let mut table = SymbolTable::new();
        let mut seen = std::collections::HashSet::new();
        for base in &bases {
            let sym = table.claim(base);
            prop_assert!(sym.starts_with(base.as_str()));
            prop_assert!(seen.insert(sym.clone()), "duplicate symbol {}", sym);
        }
    }

    #[test]
    fn plain_text_passes_through(text in "[a-zA-Z0-9 ;=+*(){}\\[\\]\n]{0,80}") {
        let lib = StarLibrary::with_builtins().unwrap();
        let mut g = starc::graph::Graph::new();
        g.add_star(&lib, "Const", "c", &[]).unwrap();
        let actor = g.actor(g.find("c").unwrap());
        let binding = starc::resolve::Binding {
            actor,
            nets: &g.nets,
            firing: 0,
        };
        let mut symbols = SymbolTable::new();
        let out = starc::resolve::resolve(&text, &binding, &mut symbols).unwrap();
        prop_assert_eq!(out, text);
    }
}
