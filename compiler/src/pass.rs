// pass.rs — Pass descriptors: metadata, dependency resolution, artifact IDs
//
// Declares the compiler's semantic passes (parse is outside the runner),
// their dependency edges, and the artifacts they produce. Used by the
// pipeline runner to compute the minimal pass subset for each --emit target.

use std::collections::HashSet;

// ── Pass and Artifact identifiers ──────────────────────────────────────────

/// Identifies each compiler pass (parse runs before the runner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    BuildGraph,
    ResolveTypes,
    CheckSchedule,
    Generate,
}

/// Machine-readable artifact identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactId {
    Graph,     // Graph, instances and nets
    Typed,     // Graph with every port typed
    Scheduled, // Graph with a checked schedule
    Program,   // GeneratedProgram
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about a compiler pass.
pub struct PassDescriptor {
    /// Human-readable name for log output.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
    pub outputs: &'static [ArtifactId],
    /// Postconditions (documentation only).
    pub invariants: &'static str,
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::BuildGraph => PassDescriptor {
            name: "build_graph",
            inputs: &[],
            outputs: &[ArtifactId::Graph],
            invariants: "instances created, parameters evaluated, nets wired",
        },
        PassId::ResolveTypes => PassDescriptor {
            name: "resolve_types",
            inputs: &[PassId::BuildGraph],
            outputs: &[ArtifactId::Typed],
            invariants: "no port left Any, every net typed",
        },
        PassId::CheckSchedule => PassDescriptor {
            name: "check_schedule",
            inputs: &[PassId::ResolveTypes],
            outputs: &[ArtifactId::Scheduled],
            invariants: "every star scheduled once, producers before consumers",
        },
        PassId::Generate => PassDescriptor {
            name: "generate",
            inputs: &[PassId::CheckSchedule],
            outputs: &[ArtifactId::Program],
            invariants: "every placeholder resolved, every star Done",
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order.
pub const ALL_PASSES: [PassId; 4] = [
    PassId::BuildGraph,
    PassId::ResolveTypes,
    PassId::CheckSchedule,
    PassId::Generate,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
