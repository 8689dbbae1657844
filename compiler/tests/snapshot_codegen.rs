// Snapshot tests: lock generated C output to detect unintended behavior changes.
//
// Uses the library API (parse → build graph → resolve types → check schedule
// → generate) directly. Snapshots are managed by `insta` and stored under
// `compiler/tests/snapshots/`.
//
// Run `cargo insta review` after intentional output changes to update baselines.

use std::path::{Path, PathBuf};

use starc::codegen::CodegenOptions;
use starc::library::StarLibrary;
use starc::pass::PassId;
use starc::pipeline::{run_pipeline, CompilationState};

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn run_to(name: &str, terminal: PassId) -> CompilationState {
    let path = project_root().join("demos").join(name);
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    let parsed = starc::parser::parse(&source);
    assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);
    let mut state = CompilationState::new(
        parsed.program.unwrap(),
        StarLibrary::with_builtins().unwrap(),
    );
    let options = CodegenOptions {
        iterations: None,
        banner: false,
    };
    run_pipeline(&mut state, terminal, &options, |_, _| {})
        .unwrap_or_else(|e| panic!("{:?} failed: {:?}", e.failing_pass, state_diags(&state)));
    state
}

fn state_diags(state: &CompilationState) -> Vec<String> {
    state.diagnostics.iter().map(|d| d.to_string()).collect()
}

#[test]
fn snapshot_ramp_gain_program() {
    let state = run_to("ramp_gain.net", PassId::Generate);
    let text = state.generated.as_ref().unwrap().render();
    insta::assert_snapshot!(text);
}

#[test]
fn snapshot_ramp_gain_dot() {
    let state = run_to("ramp_gain.net", PassId::CheckSchedule);
    let dot = starc::dot::emit_dot(state.graph.as_ref().unwrap());
    insta::assert_snapshot!(dot);
}
