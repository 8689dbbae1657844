// pipeline.rs — Compilation state and pass orchestration
//
// Holds the pass artifacts and runs the minimal set of passes for a given
// terminal PassId.
//
// Preconditions: the netlist is parsed and the star library loaded.
// Postconditions: artifacts for required passes are populated, or has_error is set.
// Failure modes: any pass emitting error-level diagnostics.
// Side effects: calls on_pass_complete after each pass for immediate display.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::ast::Program;
use crate::codegen::{CodegenOptions, GeneratedProgram};
use crate::diag::{DiagLevel, Diagnostic};
use crate::graph::Graph;
use crate::library::StarLibrary;
use crate::pass::{descriptor, required_passes, PassId};

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds and cache keys.
///
/// `source_hash`: SHA-256 of the raw netlist text.
/// `library_fingerprint`: SHA-256 of `StarLibrary::canonical_json()`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub library_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    source_hash: String,
    library_fingerprint: String,
    compiler_version: &'a str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    pub fn library_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.library_fingerprint)
    }

    /// Serialize provenance as JSON for `--emit build-info`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&BuildInfo {
            source_hash: self.source_hash_hex(),
            library_fingerprint: self.library_fingerprint_hex(),
            compiler_version: self.compiler_version,
        })
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute provenance from the netlist text and the loaded library.
pub fn compute_provenance(source: &str, library: &StarLibrary) -> serde_json::Result<Provenance> {
    let canonical = library.canonical_json()?;
    Ok(Provenance {
        source_hash: sha256(source.as_bytes()),
        library_fingerprint: sha256(canonical.as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Compilation state ──────────────────────────────────────────────────────

/// Holds all compilation artifacts and accumulated diagnostics.
pub struct CompilationState {
    pub library: StarLibrary,
    pub program: Program,
    pub graph: Option<Graph>,
    pub generated: Option<GeneratedProgram>,
    pub diagnostics: Vec<Diagnostic>,
    pub has_error: bool,
}

impl CompilationState {
    pub fn new(program: Program, library: StarLibrary) -> Self {
        Self {
            library,
            program,
            graph: None,
            generated: None,
            diagnostics: Vec::new(),
            has_error: false,
        }
    }
}

/// Pipeline execution failed due to error-level diagnostics in a pass.
/// The diagnostics are in `CompilationState.diagnostics`.
#[derive(Debug)]
pub struct PipelineError {
    pub failing_pass: PassId,
}

fn has_error_diags(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.level == DiagLevel::Error)
}

/// Per-pass post-processing: callback, accumulate, log, error check.
fn finish_pass(
    state: &mut CompilationState,
    pass_id: PassId,
    diags: Vec<Diagnostic>,
    elapsed: Duration,
    on_pass_complete: &mut impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    on_pass_complete(pass_id, &diags);
    let is_err = has_error_diags(&diags);
    state.diagnostics.extend(diags);
    log::info!(
        "{} complete, {:.1}ms",
        descriptor(pass_id).name,
        elapsed.as_secs_f64() * 1000.0
    );
    if is_err {
        state.has_error = true;
        return Err(PipelineError {
            failing_pass: pass_id,
        });
    }
    Ok(())
}

// ── Pipeline runner ────────────────────────────────────────────────────────

/// Run the minimal set of passes to produce `terminal`.
pub fn run_pipeline(
    state: &mut CompilationState,
    terminal: PassId,
    codegen_options: &CodegenOptions,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<(), PipelineError> {
    for pass_id in required_passes(terminal) {
        let t = Instant::now();
        let diags = match pass_id {
            PassId::BuildGraph => {
                let result = crate::graph::build_graph(&state.program, &state.library);
                state.graph = Some(result.graph);
                result.diagnostics
            }
            PassId::ResolveTypes => match state.graph.as_mut() {
                Some(graph) => match graph.resolve_types() {
                    Ok(()) => Vec::new(),
                    Err(e) => vec![e.to_diagnostic(None)],
                },
                None => missing_graph(),
            },
            PassId::CheckSchedule => match state.graph.as_mut() {
                Some(graph) => match graph.check_schedule() {
                    Ok(()) => Vec::new(),
                    Err(e) => vec![e.to_diagnostic(None)],
                },
                None => missing_graph(),
            },
            PassId::Generate => match state.graph.as_mut() {
                Some(graph) => match crate::codegen::generate(graph, codegen_options) {
                    Ok(program) => {
                        state.generated = Some(program);
                        Vec::new()
                    }
                    Err(e) => vec![e.to_diagnostic(graph.span_of(e.actor()))],
                },
                None => missing_graph(),
            },
        };
        finish_pass(state, pass_id, diags, t.elapsed(), &mut on_pass_complete)?;
    }
    Ok(())
}

fn missing_graph() -> Vec<Diagnostic> {
    vec![Diagnostic::error(None, "internal: no graph was built")]
}
