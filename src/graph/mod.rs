//! Graph data structures for one map snapshot.
//!
//! Host records ([`WorldNode`], [`BleedEdge`], [`EmbassyEdge`]) arrive in a
//! [`GraphSnapshot`] and are resolved into a [`WorldGraph`]: petgraph's
//! StableGraph for topology, with Structure of Arrays (SoA) layout for
//! positions and velocities.

mod edge;
mod engine;
mod node;
mod snapshot;

pub use edge::{BleedEdge, EdgeId, EmbassyEdge, Link, LinkKind};
pub(crate) use engine::SimBuffers;
pub use engine::WorldGraph;
pub use node::{NodeId, WorldCounts, WorldNode};
pub use snapshot::GraphSnapshot;
