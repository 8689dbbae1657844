// codegen.rs — Code assembly for scheduled star graphs
//
// Drives every star through its lifecycle phases in schedule order and
// collects the resolved fragments into the sections of one C program.
// Phases run strictly in sequence: all PreInitialize hooks, then all
// Initialize hooks, precision propagation, buffer planning, Fire (once per
// repetition), Wrapup. Sections are append-only.
//
// Preconditions: the graph's types are resolved and its schedule checked.
// Postconditions: returns the program with every placeholder resolved.
// Failure modes: the first `GenError` from any hook aborts generation;
//                no partial program is returned.
// Side effects: none.

use std::fmt::Write as _;
use std::time::Instant;

use serde::Serialize;

use crate::descriptor::{ActorDescriptor, Lifecycle, Phase, Port};
use crate::diag::{GenError, GenResult};
use crate::graph::{self, Graph, Net, NetTable};
use crate::id::{ActorId, NetId};
use crate::precision;
use crate::resolve::{resolve, Binding};
use crate::symbols::SymbolTable;
use crate::types::{DataType, ParamValue};

const COMPLEX_TYPEDEF: &str = "typedef struct { double real; double imag; } complex;";

// ── Sections ────────────────────────────────────────────────────────────────

/// Named sections of the output program, in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Section {
    Include,
    Global,
    Procedure,
    Declaration,
    Initialize,
    Fire,
    Wrapup,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Include,
        Section::Global,
        Section::Procedure,
        Section::Declaration,
        Section::Initialize,
        Section::Fire,
        Section::Wrapup,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Section::Include => "include",
            Section::Global => "global",
            Section::Procedure => "procedure",
            Section::Declaration => "declaration",
            Section::Initialize => "initialize",
            Section::Fire => "fire",
            Section::Wrapup => "wrapup",
        }
    }
}

/// A resolved piece of code and the star (or shared symbol) it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub label: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Sections {
    fragments: [Vec<Fragment>; 7],
}

impl Sections {
    fn push(&mut self, section: Section, label: Option<String>, text: String) {
        self.fragments[section as usize].push(Fragment { label, text });
    }

    pub fn get(&self, section: Section) -> &[Fragment] {
        &self.fragments[section as usize]
    }
}

// ── Star context ────────────────────────────────────────────────────────────

/// What a hook sees: its own descriptor, the nets, the symbol namespace and
/// the output sections.
pub struct StarCtx<'a> {
    pub actor: &'a mut ActorDescriptor,
    nets: &'a mut NetTable,
    symbols: &'a mut SymbolTable,
    sections: &'a mut Sections,
    firing: u32,
    repetitions: u32,
    buffers_planned: bool,
}

impl<'a> StarCtx<'a> {
    pub fn name(&self) -> &str {
        &self.actor.name
    }

    pub fn class(&self) -> &str {
        &self.actor.class
    }

    /// Zero-based firing within the iteration (always 0 outside Fire).
    pub fn firing(&self) -> u32 {
        self.firing
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    fn label(&self) -> String {
        format!("{} ({})", self.actor.name, self.actor.class)
    }

    /// Resolve a template against this star's bindings.
    pub fn resolve(&mut self, template: &str) -> GenResult<String> {
        let binding = Binding {
            actor: &*self.actor,
            nets: &*self.nets,
            firing: self.firing,
        };
        resolve(template, &binding, &mut *self.symbols)
    }

    /// Resolve `template` and append it to `section`.
    pub fn emit(&mut self, section: Section, template: &str) -> GenResult<()> {
        let text = self.resolve(template)?;
        self.flush_pending();
        let label = self.label();
        self.sections.push(section, Some(label), text);
        Ok(())
    }

    /// Append to the per-instance declarations.
    pub fn declare(&mut self, template: &str) -> GenResult<()> {
        self.emit(Section::Declaration, template)
    }

    /// Fetch a code block of this star's class, arguments substituted.
    pub fn block(&self, name: &str, args: &[&str]) -> GenResult<String> {
        self.actor
            .blocks
            .get(name, args)
            .map_err(|m| GenError::resolution(self.actor.name.as_str(), name, m))
    }

    pub fn emit_block(&mut self, section: Section, name: &str, args: &[&str]) -> GenResult<()> {
        let body = self.block(name, args)?;
        self.emit(section, &body)
    }

    /// Require a header once per program. `math.h` and `<math.h>` are the
    /// same header; quoted names are kept as written.
    pub fn include(&mut self, header: &str) {
        let header = if header.starts_with('<') || header.starts_with('"') {
            header.to_string()
        } else {
            format!("<{}>", header)
        };
        if self.symbols.include(&header) {
            self.sections
                .push(Section::Include, None, format!("#include {}", header));
        }
    }

    /// Define the class-shared procedure `name` from `template` and return
    /// its symbol. Later identical definitions are dropped; a different
    /// body under the same name is a `NamespaceCollision`.
    pub fn shared(&mut self, name: &str, template: &str) -> GenResult<String> {
        let class = self.actor.class.clone();
        let symbol = self
            .symbols
            .shared_symbol(&class, name)
            .map_err(|m| GenError::resolution(self.actor.name.as_str(), name, m))?;
        let body = self.resolve(template)?;
        self.flush_pending();
        if self
            .symbols
            .register_shared(&class, name, &body, &self.actor.name)?
        {
            log::debug!("{}: defined shared {}", self.actor.name, symbol);
            self.sections
                .push(Section::Procedure, Some(format!("{} (shared)", symbol)), body);
        }
        Ok(symbol)
    }

    /// `$starSymbol(name)` outside a template.
    pub fn star_symbol(&mut self, name: &str) -> String {
        self.symbols.star_symbol(&self.actor.name, name)
    }

    pub fn param(&self, name: &str) -> GenResult<&ParamValue> {
        self.actor.value(name)
    }

    pub fn int_param(&self, name: &str) -> GenResult<i64> {
        self.param(name)?
            .as_int()
            .ok_or_else(|| self.invalid(name, "expected an integer"))
    }

    pub fn float_param(&self, name: &str) -> GenResult<f64> {
        self.param(name)?
            .as_float()
            .ok_or_else(|| self.invalid(name, "expected a number"))
    }

    pub fn str_param(&self, name: &str) -> GenResult<String> {
        self.param(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(name, "expected a string"))
    }

    /// Rewrite a state during generation.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> GenResult<()> {
        self.actor.set_param(name, value)
    }

    pub fn port(&self, name: &str) -> GenResult<&Port> {
        self.actor
            .port(name)
            .ok_or_else(|| self.invalid(name, "no such port"))
    }

    /// Connected channel count of a port.
    pub fn width(&self, port: &str) -> GenResult<usize> {
        self.port(port).map(Port::width)
    }

    /// Fix the samples a port moves per firing. Only before buffers exist.
    pub fn set_samples(&mut self, port: &str, samples: u32) -> GenResult<()> {
        if self.buffers_planned {
            return Err(self.invalid(port, "sample counts are fixed once buffers are planned"));
        }
        if samples == 0 {
            return Err(self.invalid(port, "a port must move at least one sample per firing"));
        }
        let name = self.actor.name.clone();
        let p = self
            .actor
            .port_mut(port)
            .ok_or_else(|| GenError::validation(name, port, "no such port"))?;
        p.samples = samples;
        Ok(())
    }

    /// A validation error attributed to this star and `param`.
    pub fn invalid(&self, param: &str, message: impl Into<String>) -> GenError {
        GenError::validation(self.actor.name.as_str(), param, message)
    }

    pub fn net(&self, id: NetId) -> &Net {
        self.nets.get(id)
    }

    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        self.nets.get_mut(id)
    }

    fn flush_pending(&mut self) {
        let pending = self.symbols.take_pending();
        if pending.is_empty() {
            return;
        }
        let label = self.label();
        for decl in pending {
            self.sections
                .push(Section::Declaration, Some(label.clone()), decl);
        }
    }
}

// ── Assembler ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Overrides the graph's iteration count.
    pub iterations: Option<u32>,
    /// Emit the leading "generated by" comment.
    pub banner: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            iterations: None,
            banner: true,
        }
    }
}

/// Step-by-step driver of one generation pass. `generate` runs all steps;
/// the individual steps are public so callers can stop between phases.
pub struct Assembler<'g> {
    graph: &'g mut Graph,
    symbols: SymbolTable,
    sections: Sections,
    buffers_planned: bool,
}

impl<'g> Assembler<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Assembler {
            graph,
            symbols: SymbolTable::new(),
            sections: Sections::default(),
            buffers_planned: false,
        }
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    pub fn preinitialize(&mut self) -> GenResult<()> {
        self.run_phase(Phase::PreInitialize, Lifecycle::PreInitialized)
    }

    pub fn initialize(&mut self) -> GenResult<()> {
        self.run_phase(Phase::Initialize, Lifecycle::Initialized)
    }

    /// Resolve every variable output precision left after Initialize.
    pub fn propagate_precisions(&mut self) -> GenResult<()> {
        let schedule = self.graph.schedule.clone();
        for entry in schedule {
            let mut ctx = self.ctx(entry.actor, 0, entry.repetitions);
            precision::resolve_variables(&mut ctx)?;
            ctx.flush_pending();
        }
        Ok(())
    }

    pub fn plan_buffers(&mut self) -> GenResult<()> {
        if self.graph.nets.iter().any(|n| n.dtype == DataType::Complex)
            && self.symbols.register_shared("complex", "typedef", COMPLEX_TYPEDEF, "graph")?
        {
            self.sections
                .push(Section::Global, None, COMPLEX_TYPEDEF.to_string());
        }
        let declarations = graph::plan_buffers(self.graph, &mut self.symbols)?;
        for (actor, decl) in declarations {
            let a = self.graph.actor(actor);
            let label = format!("{} ({})", a.name, a.class);
            self.sections.push(Section::Declaration, Some(label), decl);
        }
        self.buffers_planned = true;
        Ok(())
    }

    pub fn fire(&mut self) -> GenResult<()> {
        self.run_phase(Phase::Fire, Lifecycle::FireEmitted)
    }

    pub fn wrapup(&mut self) -> GenResult<()> {
        self.run_phase(Phase::Wrapup, Lifecycle::WrappedUp)
    }

    /// Retire every star and hand back the assembled program.
    pub fn finish(self, options: &CodegenOptions) -> GenResult<GeneratedProgram> {
        for actor in self.graph.actors.iter_mut() {
            actor.advance(Lifecycle::Done)?;
        }
        Ok(GeneratedProgram {
            iterations: options.iterations.unwrap_or(self.graph.iterations),
            banner: options.banner,
            sections: self.sections,
        })
    }

    fn ctx(&mut self, actor: ActorId, firing: u32, repetitions: u32) -> StarCtx<'_> {
        let Graph { actors, nets, .. } = &mut *self.graph;
        StarCtx {
            actor: &mut actors[actor.index()],
            nets,
            symbols: &mut self.symbols,
            sections: &mut self.sections,
            firing,
            repetitions,
            buffers_planned: self.buffers_planned,
        }
    }

    fn run_phase(&mut self, phase: Phase, target: Lifecycle) -> GenResult<()> {
        let started = Instant::now();
        let schedule = self.graph.schedule.clone();
        for entry in schedule {
            let firings = if phase == Phase::Fire {
                entry.repetitions
            } else {
                1
            };
            for firing in 0..firings {
                let mut ctx = self.ctx(entry.actor, firing, entry.repetitions);
                ctx.actor.check_transition(target)?;
                log::debug!("{}: {} (firing {})", ctx.name(), phase, firing);
                if phase == Phase::PreInitialize {
                    for header in ctx.actor.includes.clone() {
                        ctx.include(&header);
                    }
                }
                let hooks = ctx.actor.hooks.for_phase(phase).to_vec();
                for hook in hooks {
                    hook(&mut ctx)?;
                }
                ctx.flush_pending();
                ctx.actor.advance(target)?;
            }
        }
        log::debug!("{} phase done in {:?}", phase, started.elapsed());
        Ok(())
    }
}

/// Run a complete generation pass over `graph`.
pub fn generate(graph: &mut Graph, options: &CodegenOptions) -> GenResult<GeneratedProgram> {
    if graph.schedule.is_empty() && !graph.actors.is_empty() {
        return Err(GenError::validation(
            "graph",
            "",
            "no schedule; check the schedule before generating",
        ));
    }
    let started = Instant::now();
    let mut asm = Assembler::new(graph);
    asm.preinitialize()?;
    asm.initialize()?;
    asm.propagate_precisions()?;
    asm.plan_buffers()?;
    asm.fire()?;
    asm.wrapup()?;
    let program = asm.finish(options)?;
    log::info!("generated program in {:?}", started.elapsed());
    Ok(program)
}

// ── Output program ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub iterations: u32,
    pub banner: bool,
    sections: Sections,
}

impl GeneratedProgram {
    pub fn section(&self, section: Section) -> &[Fragment] {
        self.sections.get(section)
    }

    /// Raw text of one section: fragment bodies, one per line, no labels.
    pub fn section_text(&self, section: Section) -> String {
        self.section(section)
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sections as a JSON object keyed by section name.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut map = serde_json::Map::new();
        map.insert("iterations".to_string(), self.iterations.into());
        for section in Section::ALL {
            map.insert(
                section.name().to_string(),
                serde_json::to_value(self.section(section))?,
            );
        }
        serde_json::to_string_pretty(&serde_json::Value::Object(map))
    }

    /// The complete C program.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.banner {
            let _ = writeln!(
                out,
                "/* Generated by starc {}. Do not edit. */",
                env!("CARGO_PKG_VERSION")
            );
            out.push('\n');
        }
        for section in [
            Section::Include,
            Section::Global,
            Section::Procedure,
            Section::Declaration,
        ] {
            let fragments = self.section(section);
            if fragments.is_empty() {
                continue;
            }
            write_fragments(&mut out, fragments, "", section != Section::Include);
            out.push('\n');
        }

        out.push_str("int main(void)\n{\n    int iteration;\n");
        let init = self.section(Section::Initialize);
        if !init.is_empty() {
            out.push('\n');
            write_fragments(&mut out, init, "    ", true);
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "    for (iteration = 0; iteration < {}; iteration++) {{",
            self.iterations
        );
        write_fragments(&mut out, self.section(Section::Fire), "        ", true);
        out.push_str("    }\n");
        let wrapup = self.section(Section::Wrapup);
        if !wrapup.is_empty() {
            out.push('\n');
            write_fragments(&mut out, wrapup, "    ", true);
        }
        out.push_str("\n    return 0;\n}\n");
        out
    }
}

/// Write fragments indented, with a label comment wherever the owner changes.
fn write_fragments(out: &mut String, fragments: &[Fragment], indent: &str, labeled: bool) {
    let mut last: Option<&str> = None;
    for fragment in fragments {
        if labeled {
            if let Some(label) = fragment.label.as_deref() {
                if last != Some(label) {
                    let _ = writeln!(out, "{}/* {} */", indent, label);
                }
            }
            last = fragment.label.as_deref();
        }
        for line in fragment.text.lines() {
            if line.trim().is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "{}{}", indent, line);
            }
        }
    }
}
