// graph.rs — Dataflow graph of star instances
//
// Holds the instantiated stars, the nets wiring output channels to input
// channels, and the externally supplied schedule. The graph is built either
// from a parsed netlist (`build_graph`) or through the builder methods.
// Type resolution and schedule checks run as separate passes; buffer
// planning runs inside code generation once every star has initialized.
//
// Preconditions: star classes come from a loaded `StarLibrary`.
// Postconditions: after `resolve_types` no port is left `Any`; after
//                 `check_schedule` every star is scheduled exactly once,
//                 producers first.
// Failure modes: bad references, bad connections and bad schedules are
//                `GraphError`s (netlist builds collect them as diagnostics).
// Side effects: none.

use std::collections::HashMap;
use std::fmt;

use crate::ast::*;
use crate::descriptor::{ActorDescriptor, Direction, InstantiateError};
use crate::diag::{codes, DiagCode, Diagnostic, GenError, GenResult};
use crate::id::{ActorId, NetId};
use crate::library::StarLibrary;
use crate::precision::{Precision, PrecisionState};
use crate::symbols::SymbolTable;
use crate::types::DataType;

pub const DEFAULT_ITERATIONS: u32 = 1;

// ── Nets ────────────────────────────────────────────────────────────────────

/// One side of a net: a channel (1-based) of a port of an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub actor: ActorId,
    pub port: String,
    pub channel: u32,
}

/// Storage planned for a net: a scalar when `size == 1`, else an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    pub name: String,
    pub size: u32,
}

/// A connection from one output channel to one input channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    pub id: NetId,
    pub source: Endpoint,
    pub target: Endpoint,
    pub dtype: DataType,
    pub buffer: Option<Buffer>,
    /// Precision of the values carried, as published by the producer.
    pub precision: PrecisionState,
    /// Precision the consumer fixed for its input during Initialize.
    pub consumer_precision: Option<Precision>,
}

impl Net {
    pub fn new(source: Endpoint, target: Endpoint, dtype: DataType) -> Net {
        Net {
            id: NetId(0),
            source,
            target,
            dtype,
            buffer: None,
            precision: PrecisionState::Unspecified,
            consumer_precision: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetTable {
    nets: Vec<Net>,
}

impl NetTable {
    /// Add a net, assigning it the next ID.
    pub fn push(&mut self, mut net: Net) -> NetId {
        let id = NetId(self.nets.len() as u32);
        net.id = id;
        self.nets.push(net);
        id
    }

    pub fn get(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    pub fn get_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Net> {
        self.nets.iter()
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

// ── Graph ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub actor: ActorId,
    pub repetitions: u32,
}

/// A graph construction error with its stable code.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphError {
    pub code: DiagCode,
    pub message: String,
    pub hint: Option<String>,
}

impl GraphError {
    fn new(code: DiagCode, message: impl Into<String>) -> Self {
        GraphError {
            code,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn to_diagnostic(&self, span: Option<Span>) -> Diagnostic {
        let d = Diagnostic::error(span, self.message.clone()).with_code(self.code);
        match &self.hint {
            Some(h) => d.with_hint(h.clone()),
            None => d,
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for GraphError {}

#[derive(Debug)]
pub struct Graph {
    pub actors: Vec<ActorDescriptor>,
    pub nets: NetTable,
    /// Empty until `set_schedule` or `check_schedule` fills it.
    pub schedule: Vec<ScheduleEntry>,
    pub iterations: u32,
    spans: Vec<Option<Span>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            actors: Vec::new(),
            nets: NetTable::default(),
            schedule: Vec::new(),
            iterations: DEFAULT_ITERATIONS,
            spans: Vec::new(),
        }
    }

    pub fn find(&self, name: &str) -> Option<ActorId> {
        self.actors.iter().find(|a| a.name == name).map(|a| a.id)
    }

    pub fn actor(&self, id: ActorId) -> &ActorDescriptor {
        &self.actors[id.index()]
    }

    /// Source span of the star statement that declared `name`, if any.
    pub fn span_of(&self, name: &str) -> Option<Span> {
        self.find(name).and_then(|id| self.spans[id.index()])
    }

    pub fn repetitions(&self, id: ActorId) -> u32 {
        self.schedule
            .iter()
            .find(|e| e.actor == id)
            .map(|e| e.repetitions)
            .unwrap_or(1)
    }

    /// Instantiate `class` as `name` with parameter overrides.
    pub fn add_star(
        &mut self,
        library: &StarLibrary,
        class: &str,
        name: &str,
        overrides: &[(&str, &str)],
    ) -> Result<ActorId, GraphError> {
        self.add_star_at(library, class, name, overrides, None)
    }

    fn add_star_at(
        &mut self,
        library: &StarLibrary,
        class: &str,
        name: &str,
        overrides: &[(&str, &str)],
        span: Option<Span>,
    ) -> Result<ActorId, GraphError> {
        if self.find(name).is_some() {
            return Err(GraphError::new(
                codes::E0101,
                format!("duplicate star instance '{}'", name),
            ));
        }
        let star_class = library.lookup(class).ok_or_else(|| {
            GraphError::new(codes::E0100, format!("unknown star class '{}'", class))
                .with_hint("load the library that defines it with -L <file.star>")
        })?;
        let id = ActorId(self.actors.len() as u32);
        let actor = star_class
            .instantiate(id, name, overrides)
            .map_err(|e| match e {
                InstantiateError::UnknownParam(p) => GraphError::new(
                    codes::E0102,
                    format!("star '{}' ({}) has no parameter '{}'", name, class, p),
                )
                .with_hint(format!(
                    "parameters of {}: {}",
                    class,
                    star_class
                        .params
                        .iter()
                        .map(|p| p.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
                InstantiateError::BadValue { param, message } => GraphError::new(
                    codes::E0103,
                    format!("star '{}': parameter '{}': {}", name, param, message),
                ),
                InstantiateError::Rejected(err) => GraphError::new(codes::E0108, err.to_string()),
            })?;
        log::debug!("instantiated {} ({}) as {:?}", name, class, id);
        self.actors.push(actor);
        self.spans.push(span);
        Ok(id)
    }

    /// Wire output `from = (instance, port)` to input `to = (instance, port)`.
    pub fn connect(&mut self, from: (&str, &str), to: (&str, &str)) -> Result<NetId, GraphError> {
        let src = self.endpoint_port(from, Direction::Output)?;
        let dst = self.endpoint_port(to, Direction::Input)?;

        let (src_type, src_channel) = {
            let p = self.actors[src.index()]
                .port(from.1)
                .ok_or_else(|| GraphError::new(codes::E0105, "port vanished"))?;
            if !p.multi && !p.channels.is_empty() {
                return Err(GraphError::new(
                    codes::E0106,
                    format!("output '{}.{}' already drives a net", from.0, from.1),
                )
                .with_hint("fan out through a Fork star"));
            }
            (p.declared, p.width() as u32 + 1)
        };
        let (dst_type, dst_channel) = {
            let p = self.actors[dst.index()]
                .port(to.1)
                .ok_or_else(|| GraphError::new(codes::E0105, "port vanished"))?;
            if !p.multi && !p.channels.is_empty() {
                return Err(GraphError::new(
                    codes::E0106,
                    format!("input '{}.{}' is already connected", to.0, to.1),
                ));
            }
            (p.declared, p.width() as u32 + 1)
        };
        if src_type != DataType::Any && dst_type != DataType::Any && !src_type.converts_to(dst_type)
        {
            return Err(type_mismatch(from, to, src_type, dst_type));
        }

        let id = self.nets.push(Net::new(
            Endpoint {
                actor: src,
                port: from.1.to_string(),
                channel: src_channel,
            },
            Endpoint {
                actor: dst,
                port: to.1.to_string(),
                channel: dst_channel,
            },
            src_type,
        ));
        if let Some(p) = self.actors[src.index()].port_mut(from.1) {
            p.channels.push(id);
        }
        if let Some(p) = self.actors[dst.index()].port_mut(to.1) {
            p.channels.push(id);
        }
        Ok(id)
    }

    fn endpoint_port(
        &self,
        (instance, port): (&str, &str),
        direction: Direction,
    ) -> Result<ActorId, GraphError> {
        let id = self.find(instance).ok_or_else(|| {
            GraphError::new(codes::E0104, format!("unknown star instance '{}'", instance))
        })?;
        let actor = self.actor(id);
        match actor.port(port) {
            None => Err(GraphError::new(
                codes::E0105,
                format!("star '{}' ({}) has no port '{}'", instance, actor.class, port),
            )
            .with_hint(format!(
                "ports of {}: {}",
                actor.class,
                actor
                    .ports
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
            Some(p) if p.direction != direction => {
                let (is, want) = match direction {
                    Direction::Output => ("an input", "must start at an output"),
                    Direction::Input => ("an output", "must end at an input"),
                };
                Err(GraphError::new(
                    codes::E0105,
                    format!("'{}.{}' is {}; a connection {}", instance, port, is, want),
                ))
            }
            Some(_) => Ok(id),
        }
    }

    /// Supply the schedule: instance names with repetition counts.
    pub fn set_schedule(&mut self, entries: &[(&str, u32)]) -> Result<(), GraphError> {
        let mut schedule = Vec::with_capacity(entries.len());
        for &(name, repetitions) in entries {
            let actor = self.find(name).ok_or_else(|| {
                GraphError::new(codes::E0300, format!("schedule names unknown star '{}'", name))
            })?;
            if schedule.iter().any(|e: &ScheduleEntry| e.actor == actor) {
                return Err(GraphError::new(
                    codes::E0300,
                    format!("star '{}' is scheduled more than once", name),
                )
                .with_hint("use a repetition count, e.g. 'name*2'"));
            }
            if repetitions == 0 {
                return Err(GraphError::new(
                    codes::E0300,
                    format!("star '{}' is scheduled with zero repetitions", name),
                ));
            }
            schedule.push(ScheduleEntry { actor, repetitions });
        }
        self.schedule = schedule;
        Ok(())
    }

    /// Give every `Any` port a concrete type and type every net.
    ///
    /// The `Any` ports of one star share a single type, taken from the
    /// first concrete type found across their nets; leftovers become float.
    pub fn resolve_types(&mut self) -> Result<(), GraphError> {
        let mut group: Vec<Option<DataType>> = vec![None; self.actors.len()];
        let known = |actors: &[ActorDescriptor], group: &[Option<DataType>], e: &Endpoint| {
            let declared = actors[e.actor.index()]
                .port(&e.port)
                .map(|p| p.declared)
                .unwrap_or(DataType::Any);
            if declared == DataType::Any {
                group[e.actor.index()]
            } else {
                Some(declared)
            }
        };
        let is_any = |actors: &[ActorDescriptor], e: &Endpoint| {
            actors[e.actor.index()]
                .port(&e.port)
                .map(|p| p.declared == DataType::Any)
                .unwrap_or(false)
        };

        loop {
            let mut changed = false;
            for net in self.nets.iter() {
                let s = known(&self.actors, &group, &net.source);
                let d = known(&self.actors, &group, &net.target);
                if is_any(&self.actors, &net.source) && s.is_none() && d.is_some() {
                    group[net.source.actor.index()] = d;
                    changed = true;
                }
                if is_any(&self.actors, &net.target) && d.is_none() && s.is_some() {
                    group[net.target.actor.index()] = s;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        for (actor, resolved) in self.actors.iter_mut().zip(&group) {
            for port in actor.ports.iter_mut() {
                port.dtype = if port.declared == DataType::Any {
                    resolved.unwrap_or(DataType::Float)
                } else {
                    port.declared
                };
            }
        }

        for i in 0..self.nets.len() {
            let id = NetId(i as u32);
            let (source, target) = {
                let net = self.nets.get(id);
                (net.source.clone(), net.target.clone())
            };
            let src = &self.actors[source.actor.index()];
            let dst = &self.actors[target.actor.index()];
            let s = src.port(&source.port).map(|p| p.dtype).unwrap_or(DataType::Float);
            let d = dst.port(&target.port).map(|p| p.dtype).unwrap_or(DataType::Float);
            if !s.converts_to(d) {
                return Err(type_mismatch(
                    (src.name.as_str(), source.port.as_str()),
                    (dst.name.as_str(), target.port.as_str()),
                    s,
                    d,
                ));
            }
            self.nets.get_mut(id).dtype = s;
        }
        Ok(())
    }

    /// Check the supplied schedule, defaulting to declaration order.
    pub fn check_schedule(&mut self) -> Result<(), GraphError> {
        if self.schedule.is_empty() {
            self.schedule = self
                .actors
                .iter()
                .map(|a| ScheduleEntry {
                    actor: a.id,
                    repetitions: 1,
                })
                .collect();
        }
        let mut position = HashMap::new();
        for (i, entry) in self.schedule.iter().enumerate() {
            position.insert(entry.actor, i);
        }
        for actor in &self.actors {
            if !position.contains_key(&actor.id) {
                return Err(GraphError::new(
                    codes::E0301,
                    format!("star '{}' is missing from the schedule", actor.name),
                ));
            }
        }
        for net in self.nets.iter() {
            if position[&net.source.actor] >= position[&net.target.actor] {
                let src = self.actor(net.source.actor);
                let dst = self.actor(net.target.actor);
                return Err(GraphError::new(
                    codes::E0302,
                    format!(
                        "'{}' consumes from '{}' but is not scheduled after it",
                        dst.name, src.name
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Ports with no connection, as (actor, port) pairs.
    pub fn unconnected_ports(&self) -> Vec<(ActorId, String)> {
        self.actors
            .iter()
            .flat_map(|a| {
                a.ports
                    .iter()
                    .filter(|p| p.channels.is_empty())
                    .map(move |p| (a.id, p.name.clone()))
            })
            .collect()
    }
}

fn type_mismatch(
    from: (&str, &str),
    to: (&str, &str),
    src: DataType,
    dst: DataType,
) -> GraphError {
    GraphError::new(
        codes::E0107,
        format!(
            "type mismatch on {}.{} -> {}.{}: {} into {}",
            from.0, from.1, to.0, to.1, src, dst
        ),
    )
    .with_hint("insert a conversion star")
}

// ── Buffer planning ─────────────────────────────────────────────────────────

/// Plan one buffer per net once sample rates are final.
///
/// Returns the buffer declarations with the actor that owns each.
pub fn plan_buffers(
    graph: &mut Graph,
    symbols: &mut SymbolTable,
) -> GenResult<Vec<(ActorId, String)>> {
    let mut declarations = Vec::with_capacity(graph.nets.len());
    for i in 0..graph.nets.len() {
        let id = NetId(i as u32);
        let (source, target, dtype) = {
            let net = graph.nets.get(id);
            (net.source.clone(), net.target.clone(), net.dtype)
        };
        let src = graph.actor(source.actor);
        let dst = graph.actor(target.actor);
        let (sp, dp) = match (src.port(&source.port), dst.port(&target.port)) {
            (Some(sp), Some(dp)) => (sp, dp),
            _ => {
                return Err(GenError::validation(
                    dst.name.as_str(),
                    target.port.as_str(),
                    "net endpoint has no port",
                ))
            }
        };
        let overflow = || {
            GenError::validation(
                dst.name.as_str(),
                dp.name.as_str(),
                format!(
                    "buffer size overflows on {}.{} -> {}.{}",
                    src.name, sp.name, dst.name, dp.name
                ),
            )
        };
        let produced = graph
            .repetitions(source.actor)
            .checked_mul(sp.samples)
            .ok_or_else(overflow)?;
        let consumed = graph
            .repetitions(target.actor)
            .checked_mul(dp.samples)
            .ok_or_else(overflow)?;
        if produced != consumed {
            return Err(GenError::validation(
                dst.name.as_str(),
                dp.name.as_str(),
                format!(
                    "unbalanced buffer: {}.{} produces {} sample(s) per iteration but {}.{} consumes {}",
                    src.name, sp.name, produced, dst.name, dp.name, consumed
                ),
            ));
        }

        let base = if sp.multi {
            format!("{}_{}_{}", src.name, sp.name, source.channel)
        } else {
            format!("{}_{}", src.name, sp.name)
        };
        let name = symbols.claim(&base);
        let decl = if produced == 1 {
            format!("static {} {};", dtype.c_type(), name)
        } else {
            format!("static {} {}[{}];", dtype.c_type(), name, produced)
        };
        log::debug!("net {:?}: buffer {} of {} sample(s)", id, name, produced);
        declarations.push((source.actor, decl));
        graph.nets.get_mut(id).buffer = Some(Buffer {
            name,
            size: produced,
        });
    }
    Ok(declarations)
}

// ── Netlist front end ───────────────────────────────────────────────────────

/// Result of building a graph from a netlist.
#[derive(Debug)]
pub struct BuildResult {
    pub graph: Graph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a graph from a parsed netlist. Construction continues past
/// errors so every problem is reported in one run.
pub fn build_graph(program: &Program, library: &StarLibrary) -> BuildResult {
    let mut graph = Graph::new();
    let mut diagnostics = Vec::new();

    for stmt in &program.statements {
        match &stmt.kind {
            StatementKind::Star(star) => {
                let overrides: Vec<(&str, String)> = star
                    .args
                    .iter()
                    .map(|a| (a.name.name.as_str(), a.value.expr()))
                    .collect();
                let refs: Vec<(&str, &str)> =
                    overrides.iter().map(|(k, v)| (*k, v.as_str())).collect();
                if let Err(e) = graph.add_star_at(
                    library,
                    &star.class.name,
                    &star.name.name,
                    &refs,
                    Some(stmt.span),
                ) {
                    diagnostics.push(e.to_diagnostic(Some(stmt.span)));
                }
            }
            StatementKind::Set(set) => {
                if let Err(d) = apply_set(&mut graph, set) {
                    diagnostics.push(d);
                }
            }
            StatementKind::Connect(_) | StatementKind::Schedule(_) => {}
        }
    }

    for stmt in &program.statements {
        if let StatementKind::Connect(c) = &stmt.kind {
            let from = (c.from.instance.name.as_str(), c.from.port.name.as_str());
            let to = (c.to.instance.name.as_str(), c.to.port.name.as_str());
            if let Err(e) = graph.connect(from, to) {
                diagnostics.push(e.to_diagnostic(Some(stmt.span)));
            }
        }
    }

    let schedules: Vec<&Statement> = program
        .statements
        .iter()
        .filter(|s| matches!(s.kind, StatementKind::Schedule(_)))
        .collect();
    if schedules.len() > 1 {
        diagnostics.push(
            Diagnostic::error(Some(schedules[1].span), "more than one schedule statement")
                .with_code(codes::E0300),
        );
    }
    if let Some(stmt) = schedules.first() {
        if let StatementKind::Schedule(s) = &stmt.kind {
            let entries: Vec<(&str, u32)> = s
                .entries
                .iter()
                .map(|e| (e.name.name.as_str(), e.repetitions))
                .collect();
            if let Err(e) = graph.set_schedule(&entries) {
                diagnostics.push(e.to_diagnostic(Some(stmt.span)));
            }
        }
    }

    for (actor, port) in graph.unconnected_ports() {
        let a = graph.actor(actor);
        diagnostics.push(
            Diagnostic::warning(
                graph.spans[actor.index()],
                format!("port '{}' of '{}' is unconnected", port, a.name),
            )
            .with_code(codes::W0100),
        );
    }

    BuildResult { graph, diagnostics }
}

fn apply_set(graph: &mut Graph, set: &SetStmt) -> Result<(), Diagnostic> {
    match (set.name.name.as_str(), &set.value) {
        ("iterations", SetValue::Number(text, span)) => match text.parse::<u32>() {
            Ok(n) if n > 0 => {
                graph.iterations = n;
                Ok(())
            }
            _ => Err(Diagnostic::error(
                Some(*span),
                format!("iterations must be a positive integer, found '{}'", text),
            )
            .with_code(codes::E0109)),
        },
        ("iterations", _) => Err(Diagnostic::error(
            Some(set.name.span),
            "iterations must be a positive integer",
        )
        .with_code(codes::E0109)),
        (other, _) => Err(Diagnostic::error(
            Some(set.name.span),
            format!("unknown setting '{}'", other),
        )
        .with_code(codes::E0109)
        .with_hint("supported settings: iterations")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib() -> StarLibrary {
        StarLibrary::with_builtins().unwrap()
    }

    fn ramp_gain() -> Graph {
        let lib = lib();
        let mut g = Graph::new();
        g.add_star(&lib, "Ramp", "ramp1", &[]).unwrap();
        g.add_star(&lib, "Gain", "gain1", &[("gain", "2.0")]).unwrap();
        g.connect(("ramp1", "output"), ("gain1", "input")).unwrap();
        g
    }

    #[test]
    fn connect_records_channels() {
        let g = ramp_gain();
        assert_eq!(g.nets.len(), 1);
        let net = g.nets.get(NetId(0));
        assert_eq!(net.source.port, "output");
        assert_eq!(net.target.channel, 1);
        let gain = g.actor(g.find("gain1").unwrap());
        assert_eq!(gain.port("input").unwrap().channels, vec![NetId(0)]);
    }

    #[test]
    fn duplicate_instance() {
        let lib = lib();
        let mut g = ramp_gain();
        let err = g.add_star(&lib, "Gain", "gain1", &[]).unwrap_err();
        assert_eq!(err.code, codes::E0101);
    }

    #[test]
    fn unknown_class_and_parameter() {
        let lib = lib();
        let mut g = Graph::new();
        assert_eq!(g.add_star(&lib, "Gian", "x", &[]).unwrap_err().code, codes::E0100);
        let err = g.add_star(&lib, "Gain", "g", &[("gian", "2")]).unwrap_err();
        assert_eq!(err.code, codes::E0102);
        assert!(err.hint.unwrap().contains("gain"));
        let err = g.add_star(&lib, "Gain", "g", &[("gain", "two")]).unwrap_err();
        assert_eq!(err.code, codes::E0103);
    }

    #[test]
    fn single_output_cannot_fan_out() {
        let lib = lib();
        let mut g = ramp_gain();
        g.add_star(&lib, "Gain", "gain2", &[]).unwrap();
        let err = g.connect(("ramp1", "output"), ("gain2", "input")).unwrap_err();
        assert_eq!(err.code, codes::E0106);
    }

    #[test]
    fn wrong_direction() {
        let mut g = ramp_gain();
        let err = g.connect(("gain1", "input"), ("ramp1", "output")).unwrap_err();
        assert_eq!(err.code, codes::E0105);
    }

    #[test]
    fn polymorphic_ports_take_the_connected_type() {
        let lib = lib();
        let mut g = Graph::new();
        g.add_star(&lib, "Ramp", "r", &[]).unwrap();
        g.add_star(&lib, "Fork", "f", &[]).unwrap();
        g.add_star(&lib, "Printer", "p", &[]).unwrap();
        g.connect(("r", "output"), ("f", "input")).unwrap();
        g.connect(("f", "output"), ("p", "input")).unwrap();
        g.resolve_types().unwrap();
        let fork = g.actor(g.find("f").unwrap());
        assert_eq!(fork.port("input").unwrap().dtype, DataType::Float);
        assert_eq!(fork.port("output").unwrap().dtype, DataType::Float);
    }

    #[test]
    fn complex_into_float_is_a_mismatch() {
        let lib = lib();
        let mut g = Graph::new();
        g.add_star(&lib, "AddCx", "a", &[]).unwrap();
        g.add_star(&lib, "Gain", "g", &[]).unwrap();
        let err = g.connect(("a", "output"), ("g", "input")).unwrap_err();
        assert_eq!(err.code, codes::E0107);
    }

    #[test]
    fn default_schedule_is_declaration_order() {
        let mut g = ramp_gain();
        g.check_schedule().unwrap();
        assert_eq!(g.schedule.len(), 2);
        assert_eq!(g.schedule[0].actor, g.find("ramp1").unwrap());
    }

    #[test]
    fn consumer_before_producer_is_rejected() {
        let mut g = ramp_gain();
        g.set_schedule(&[("gain1", 1), ("ramp1", 1)]).unwrap();
        assert_eq!(g.check_schedule().unwrap_err().code, codes::E0302);
    }

    #[test]
    fn schedule_must_cover_every_star() {
        let mut g = ramp_gain();
        g.set_schedule(&[("ramp1", 1)]).unwrap();
        assert_eq!(g.check_schedule().unwrap_err().code, codes::E0301);
        assert_eq!(
            g.set_schedule(&[("ramp1", 1), ("ramp1", 2)]).unwrap_err().code,
            codes::E0300
        );
        assert_eq!(g.set_schedule(&[("ramp1", 0)]).unwrap_err().code, codes::E0300);
    }

    #[test]
    fn buffers_are_named_after_the_producer() {
        let mut g = ramp_gain();
        g.check_schedule().unwrap();
        let mut symbols = SymbolTable::new();
        let decls = plan_buffers(&mut g, &mut symbols).unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].1, "static double ramp1_output;");
        assert_eq!(
            g.nets.get(NetId(0)).buffer,
            Some(Buffer {
                name: "ramp1_output".into(),
                size: 1
            })
        );
    }

    #[test]
    fn unbalanced_rates_are_rejected() {
        let mut g = ramp_gain();
        g.set_schedule(&[("ramp1", 2), ("gain1", 1)]).unwrap();
        g.check_schedule().unwrap();
        let err = plan_buffers(&mut g, &mut SymbolTable::new()).unwrap_err();
        assert!(err.to_string().contains("unbalanced"), "got: {err}");
    }

    #[test]
    fn oversized_buffers_are_rejected() {
        let mut g = ramp_gain();
        for name in ["ramp1", "gain1"] {
            let id = g.find(name).unwrap();
            for port in ["input", "output"] {
                if let Some(p) = g.actors[id.index()].port_mut(port) {
                    p.samples = 65536;
                }
            }
        }
        g.set_schedule(&[("ramp1", 65536), ("gain1", 65536)]).unwrap();
        g.check_schedule().unwrap();
        let err = plan_buffers(&mut g, &mut SymbolTable::new()).unwrap_err();
        assert!(matches!(err, GenError::Validation { .. }), "got: {err:?}");
        assert!(err.to_string().contains("overflows"), "got: {err}");
    }
}
