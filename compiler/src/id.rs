// id.rs — Stable identifiers for graph artifacts
//
// Actors and nets are stored in dense vectors; these IDs index them.
// Assigned in netlist order during graph construction so every run over
// the same input assigns the same IDs.

use serde::Serialize;

/// Identifier of an actor instance (index into `Graph::actors`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActorId(pub u32);

/// Identifier of a net, i.e. one output channel wired to one input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NetId(pub u32);

impl ActorId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl NetId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
