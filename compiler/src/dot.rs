// dot.rs — Graphviz DOT output for starc dataflow graphs
//
// Transforms a Graph into DOT format suitable for rendering with `dot`,
// `neato`, or other Graphviz layout engines.
//
// Preconditions: `graph` is a constructed Graph (types resolved for
//                accurate edge labels).
// Postconditions: returns a valid DOT string representing the graph.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::descriptor::Direction;
use crate::graph::Graph;

/// Emit the graph as a Graphviz DOT string.
pub fn emit_dot(graph: &Graph) -> String {
    let mut buf = String::new();
    let _ = writeln!(buf, "digraph starc {{");
    let _ = writeln!(buf, "    rankdir=LR;");
    let _ = writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10, shape=record];");
    let _ = writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];");
    let _ = writeln!(buf);

    for actor in &graph.actors {
        let inputs: Vec<String> = actor
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Input)
            .map(|p| format!("<{}> {}", sanitize(&p.name), p.name))
            .collect();
        let outputs: Vec<String> = actor
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Output)
            .map(|p| format!("<{}> {}", sanitize(&p.name), p.name))
            .collect();
        let reps = graph.repetitions(actor.id);
        let title = if reps > 1 {
            format!("{}\\n{} x{}", actor.name, actor.class, reps)
        } else {
            format!("{}\\n{}", actor.name, actor.class)
        };
        let _ = writeln!(
            buf,
            "    {} [label=\"{{{{{}}}|{}|{{{}}}}}\"];",
            sanitize(&actor.name),
            inputs.join("|"),
            title,
            outputs.join("|"),
        );
    }

    if !graph.nets.is_empty() {
        let _ = writeln!(buf);
    }
    for net in graph.nets.iter() {
        let src = graph.actor(net.source.actor);
        let dst = graph.actor(net.target.actor);
        let label = match &net.buffer {
            Some(b) if b.size > 1 => format!("{}[{}]", net.dtype, b.size),
            _ => net.dtype.to_string(),
        };
        let _ = writeln!(
            buf,
            "    {}:{} -> {}:{} [label=\"{}\"];",
            sanitize(&src.name),
            sanitize(&net.source.port),
            sanitize(&dst.name),
            sanitize(&net.target.port),
            label,
        );
    }

    let _ = writeln!(buf, "}}");
    buf
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Sanitize a name to valid DOT identifier characters.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────────
