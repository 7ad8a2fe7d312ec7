//! WorldGraph - one snapshot resolved into simulation-ready form.
//!
//! The WorldGraph stores the relationship topology using petgraph's
//! StableGraph and keeps SoA (Structure of Arrays) buffers for positions and
//! velocities, indexed by [`NodeId`] slot. It is rebuilt from scratch on
//! every snapshot replacement; nothing here outlives one snapshot.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::Undirected;
use std::collections::HashMap;

use super::edge::{BleedEdge, EdgeId, EmbassyEdge, Link, LinkKind};
use super::node::{NodeId, WorldNode};
use super::snapshot::GraphSnapshot;

/// Mutable view over the simulation buffers.
pub(crate) struct SimBuffers<'a> {
    pub pos_x: &'a mut [f32],
    pub pos_y: &'a mut [f32],
    pub vel_x: &'a mut [f32],
    pub vel_y: &'a mut [f32],
}

/// The resolved graph for one snapshot.
///
/// This struct manages:
/// - Graph topology via petgraph (bleed and embassy links, undirected)
/// - Position/velocity buffers in SoA layout
/// - Mapping between host string ids and dense slots
pub struct WorldGraph {
    /// Nodes store their slot id, edges store the resolved link.
    graph: StableGraph<NodeId, Link, Undirected>,

    /// Slot -> petgraph NodeIndex
    node_indices: Vec<NodeIndex>,

    /// Link id -> petgraph EdgeIndex
    edge_indices: Vec<EdgeIndex>,

    /// Host id -> slot
    slots: HashMap<String, NodeId>,

    worlds: Vec<WorldNode>,
    bleed_edges: Vec<BleedEdge>,
    embassy_edges: Vec<EmbassyEdge>,

    /// Links dropped while resolving (dangling endpoint or self-loop)
    skipped_links: usize,

    pos_x: Vec<f32>,
    pos_y: Vec<f32>,
    vel_x: Vec<f32>,
    vel_y: Vec<f32>,
}

impl WorldGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::default(),
            node_indices: Vec::new(),
            edge_indices: Vec::new(),
            slots: HashMap::new(),
            worlds: Vec::new(),
            bleed_edges: Vec::new(),
            embassy_edges: Vec::new(),
            skipped_links: 0,
            pos_x: Vec::new(),
            pos_y: Vec::new(),
            vel_x: Vec::new(),
            vel_y: Vec::new(),
        }
    }

    /// Resolve a snapshot into slots and links.
    ///
    /// Bleed strengths are clamped to [0, 1]. Embassy links attract with
    /// `embassy_strength` when it is set and are purely visual otherwise.
    /// Duplicate world ids keep their first occurrence; links with a
    /// missing endpoint or identical endpoints are skipped.
    pub fn from_snapshot(snapshot: GraphSnapshot, embassy_strength: Option<f32>) -> Self {
        let GraphSnapshot {
            nodes,
            edges,
            embassy_edges,
        } = snapshot;

        let node_capacity = nodes.len();
        let edge_capacity = edges.len() + embassy_edges.len();
        let mut graph = StableGraph::with_capacity(node_capacity, edge_capacity);
        let mut node_indices = Vec::with_capacity(node_capacity);
        let mut slots = HashMap::with_capacity(node_capacity);
        let mut worlds = Vec::with_capacity(node_capacity);

        for world in nodes {
            if slots.contains_key(&world.id) {
                log::warn!("duplicate world id {:?} in snapshot, keeping the first", world.id);
                continue;
            }
            let id = NodeId(worlds.len() as u32);
            node_indices.push(graph.add_node(id));
            slots.insert(world.id.clone(), id);
            worlds.push(world);
        }

        let n = worlds.len();
        let mut this = Self {
            graph,
            node_indices,
            edge_indices: Vec::with_capacity(edge_capacity),
            slots,
            worlds,
            bleed_edges: Vec::new(),
            embassy_edges: Vec::new(),
            skipped_links: 0,
            pos_x: vec![0.0; n],
            pos_y: vec![0.0; n],
            vel_x: vec![0.0; n],
            vel_y: vec![0.0; n],
        };

        for (i, edge) in edges.iter().enumerate() {
            let strength = edge.clamped_strength();
            this.add_link(&edge.source_id, &edge.target_id, LinkKind::Bleed(i), Some(strength));
        }
        let embassy_strength = embassy_strength.map(super::edge::clamp_strength);
        for (i, edge) in embassy_edges.iter().enumerate() {
            this.add_link(
                &edge.source_node_id,
                &edge.target_node_id,
                LinkKind::Embassy(i),
                embassy_strength,
            );
        }

        if this.skipped_links > 0 {
            log::warn!(
                "skipped {} link(s) with a missing or repeated endpoint",
                this.skipped_links
            );
        }

        this.bleed_edges = edges;
        this.embassy_edges = embassy_edges;
        this
    }

    fn add_link(&mut self, source: &str, target: &str, kind: LinkKind, strength: Option<f32>) {
        let (Some(&a), Some(&b)) = (self.slots.get(source), self.slots.get(target)) else {
            self.skipped_links += 1;
            return;
        };
        if a == b {
            self.skipped_links += 1;
            return;
        }

        let id = EdgeId(self.edge_indices.len() as u32);
        let index = self.graph.add_edge(
            self.node_indices[a.index()],
            self.node_indices[b.index()],
            Link { id, kind, strength },
        );
        self.edge_indices.push(index);
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Number of worlds in the snapshot.
    pub fn node_count(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    /// Slot of a host world id.
    pub fn slot_of(&self, world_id: &str) -> Option<NodeId> {
        self.slots.get(world_id).copied()
    }

    /// The world record stored in a slot.
    pub fn world(&self, id: NodeId) -> Option<&WorldNode> {
        self.worlds.get(id.index())
    }

    pub fn worlds(&self) -> &[WorldNode] {
        &self.worlds
    }

    /// Get a node's position.
    pub fn position(&self, id: NodeId) -> Option<(f32, f32)> {
        let i = id.index();
        (i < self.pos_x.len()).then(|| (self.pos_x[i], self.pos_y[i]))
    }

    /// Set a node's position and stop it.
    pub fn set_position(&mut self, id: NodeId, x: f32, y: f32) {
        let i = id.index();
        if i < self.pos_x.len() {
            self.pos_x[i] = x;
            self.pos_y[i] = y;
            self.vel_x[i] = 0.0;
            self.vel_y[i] = 0.0;
        }
    }

    /// Slots of all worlds directly linked to `id`, each listed once.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let Some(&index) = self.node_indices.get(id.index()) else {
            return Vec::new();
        };
        let mut neighbors: Vec<NodeId> = self
            .graph
            .neighbors(index)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Number of resolved links (bleed and embassy).
    pub fn link_count(&self) -> usize {
        self.edge_indices.len()
    }

    /// Links dropped while resolving the snapshot.
    pub fn skipped_links(&self) -> usize {
        self.skipped_links
    }

    /// All resolved links as `(source, target, link)` in id order.
    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId, Link)> + '_ {
        self.edge_indices.iter().filter_map(move |&index| self.resolve_edge(index))
    }

    /// Look up one resolved link.
    pub fn link(&self, id: EdgeId) -> Option<(NodeId, NodeId, Link)> {
        let &index = self.edge_indices.get(id.0 as usize)?;
        self.resolve_edge(index)
    }

    fn resolve_edge(&self, index: EdgeIndex) -> Option<(NodeId, NodeId, Link)> {
        let (a, b) = self.graph.edge_endpoints(index)?;
        let source = *self.graph.node_weight(a)?;
        let target = *self.graph.node_weight(b)?;
        Some((source, target, *self.graph.edge_weight(index)?))
    }

    pub fn bleed_edge(&self, index: usize) -> Option<&BleedEdge> {
        self.bleed_edges.get(index)
    }

    pub fn embassy_edge(&self, index: usize) -> Option<&EmbassyEdge> {
        self.embassy_edges.get(index)
    }

    // =========================================================================
    // Buffer Access
    // =========================================================================

    /// Get X positions slice.
    pub fn positions_x(&self) -> &[f32] {
        &self.pos_x
    }

    /// Get Y positions slice.
    pub fn positions_y(&self) -> &[f32] {
        &self.pos_y
    }

    /// Get X velocities slice.
    pub fn velocities_x(&self) -> &[f32] {
        &self.vel_x
    }

    /// Get Y velocities slice.
    pub fn velocities_y(&self) -> &[f32] {
        &self.vel_y
    }

    /// Positions interleaved as [x0, y0, x1, y1, ...].
    pub fn interleaved_positions(&self) -> Vec<f32> {
        self.pos_x
            .iter()
            .zip(&self.pos_y)
            .flat_map(|(&x, &y)| [x, y])
            .collect()
    }

    pub(crate) fn buffers_mut(&mut self) -> SimBuffers<'_> {
        SimBuffers {
            pos_x: &mut self.pos_x,
            pos_y: &mut self.pos_y,
            vel_x: &mut self.vel_x,
            vel_y: &mut self.vel_y,
        }
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Get the bounding box of all nodes as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        if self.worlds.is_empty() {
            return None;
        }

        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for (&x, &y) in self.pos_x.iter().zip(&self.pos_y) {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        Some((min_x, min_y, max_x, max_y))
    }
}

impl Default for WorldGraph {
    fn default() -> Self {
        Self::new()
    }
}
