//! Idle drift applied after the layout settles.
//!
//! Each node with at least one neighbor sways from its settled position
//! toward the average direction of its neighbors and back:
//!
//! ```text
//! offset(t) = target × f(t),   f(t) = (1 - cos(2π·t / duration + phase)) / 2
//! ```
//!
//! `f` stays in [0, 1], so a node never overshoots past rest in the opposite
//! direction. Durations and phases are staggered by node index so drifting
//! nodes do not move in lockstep. Targets are computed once per snapshot.
//!
//! Drift is idle decorative motion only. Its frames are pushed through the
//! presentation patch channel and never committed back into the layout.

use serde::Deserialize;
use std::f32::consts::TAU;

use crate::graph::{NodeId, WorldGraph};

/// Reciprocal of the golden ratio, spreads phases evenly over the circle.
const PHASE_SPREAD: f32 = 0.618_034;

/// Drift amplitude and timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriftConfig {
    /// Length of the drift target for a node whose neighbors all lie in one
    /// direction, in model units.
    pub amplitude: f32,
    /// Oscillation period of node 0.
    pub base_duration_ms: f32,
    /// Extra period per stagger slot.
    pub stagger_ms: f32,
    /// Number of distinct periods cycled through by node index.
    pub stagger_slots: u32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            amplitude: 6.0,
            base_duration_ms: 4000.0,
            stagger_ms: 750.0,
            stagger_slots: 5,
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err("drift amplitude must be finite and non-negative".into());
        }
        if !self.base_duration_ms.is_finite() || self.base_duration_ms <= 0.0 {
            return Err("drift base duration must be positive".into());
        }
        if !self.stagger_ms.is_finite() || self.stagger_ms < 0.0 {
            return Err("drift stagger must be finite and non-negative".into());
        }
        Ok(())
    }
}

/// Per-node oscillation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftTrack {
    /// Offset at the peak of the sway, `None` for static nodes.
    pub target: Option<(f32, f32)>,
    pub duration_ms: f32,
    /// Radians.
    pub phase: f32,
}

/// Sway envelope in [0, 1] at `t_ms` for a track with the given timing.
#[inline]
pub fn envelope(t_ms: f32, duration_ms: f32, phase: f32) -> f32 {
    (1.0 - (TAU * t_ms / duration_ms + phase).cos()) * 0.5
}

/// Average unit vector from `id` toward its neighbors, scaled by `amplitude`.
///
/// Returns `None` for isolated nodes and when the unit vectors cancel out
/// or every neighbor sits exactly on top of the node.
pub fn drift_target(graph: &WorldGraph, id: NodeId, amplitude: f32) -> Option<(f32, f32)> {
    let (x, y) = graph.position(id)?;
    let neighbors = graph.neighbors(id);
    if neighbors.is_empty() {
        return None;
    }

    let (mut sum_x, mut sum_y) = (0.0_f32, 0.0_f32);
    for neighbor in &neighbors {
        let Some((nx, ny)) = graph.position(*neighbor) else {
            continue;
        };
        let (dx, dy) = (nx - x, ny - y);
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > f32::EPSILON {
            sum_x += dx / dist;
            sum_y += dy / dist;
        }
    }

    let count = neighbors.len() as f32;
    let (avg_x, avg_y) = (sum_x / count, sum_y / count);
    if avg_x * avg_x + avg_y * avg_y <= 1e-8 {
        return None;
    }
    Some((avg_x * amplitude, avg_y * amplitude))
}

/// Evaluates drift frames for one settled snapshot.
pub struct DriftAnimator {
    rest_x: Vec<f32>,
    rest_y: Vec<f32>,
    tracks: Vec<DriftTrack>,
    /// Nodes with a target, the only ones a frame moves.
    active: Vec<NodeId>,
    frame_x: Vec<f32>,
    frame_y: Vec<f32>,
}

impl DriftAnimator {
    /// Derive targets and timings from the settled graph.
    pub fn new(graph: &WorldGraph, config: &DriftConfig) -> Self {
        let n = graph.node_count();
        let slots = config.stagger_slots.max(1) as usize;

        let tracks: Vec<DriftTrack> = (0..n)
            .map(|i| DriftTrack {
                target: drift_target(graph, NodeId(i as u32), config.amplitude),
                duration_ms: config.base_duration_ms + (i % slots) as f32 * config.stagger_ms,
                phase: (i as f32 * PHASE_SPREAD).fract() * TAU,
            })
            .collect();

        let active: Vec<NodeId> = tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.target.is_some())
            .map(|(i, _)| NodeId(i as u32))
            .collect();

        log::debug!("drift prepared: {} of {} nodes active", active.len(), n);

        Self {
            rest_x: graph.positions_x().to_vec(),
            rest_y: graph.positions_y().to_vec(),
            tracks,
            active,
            frame_x: graph.positions_x().to_vec(),
            frame_y: graph.positions_y().to_vec(),
        }
    }

    pub fn track(&self, id: NodeId) -> Option<&DriftTrack> {
        self.tracks.get(id.index())
    }

    pub fn active_nodes(&self) -> &[NodeId] {
        &self.active
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// Offset of a node from its rest position at `t_ms`.
    pub fn offset_at(&self, id: NodeId, t_ms: f32) -> (f32, f32) {
        match self.tracks.get(id.index()) {
            Some(DriftTrack {
                target: Some((tx, ty)),
                duration_ms,
                phase,
            }) => {
                let f = envelope(t_ms, *duration_ms, *phase);
                (tx * f, ty * f)
            }
            _ => (0.0, 0.0),
        }
    }

    /// Recompute displayed positions of the active nodes at `t_ms`.
    pub fn advance(&mut self, t_ms: f32) {
        for k in 0..self.active.len() {
            let id = self.active[k];
            let (ox, oy) = self.offset_at(id, t_ms);
            let i = id.index();
            self.frame_x[i] = self.rest_x[i] + ox;
            self.frame_y[i] = self.rest_y[i] + oy;
        }
    }

    /// Displayed position of a node as of the last [`advance`](Self::advance).
    pub fn displayed(&self, id: NodeId) -> Option<(f32, f32)> {
        let i = id.index();
        (i < self.frame_x.len()).then(|| (self.frame_x[i], self.frame_y[i]))
    }

    pub fn displayed_x(&self) -> &[f32] {
        &self.frame_x
    }

    pub fn displayed_y(&self) -> &[f32] {
        &self.frame_y
    }

    /// Settled position of a node.
    pub fn rest(&self, id: NodeId) -> Option<(f32, f32)> {
        let i = id.index();
        (i < self.rest_x.len()).then(|| (self.rest_x[i], self.rest_y[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BleedEdge, EmbassyEdge, GraphSnapshot, WorldNode};

    fn star() -> WorldGraph {
        // w0 at the center with w1 to the right; w2 and w3 on opposite sides
        // of w4; w5 isolated.
        let nodes = (0..6).map(|i| WorldNode::new(format!("w{i}"))).collect();
        let snapshot = GraphSnapshot::new(
            nodes,
            vec![
                BleedEdge::new("w0", "w1", 0.5),
                BleedEdge::new("w4", "w2", 0.5),
                BleedEdge::new("w4", "w3", 0.5),
            ],
            vec![],
        );
        let mut graph = WorldGraph::from_snapshot(snapshot, None);
        graph.set_position(NodeId(0), 100.0, 100.0);
        graph.set_position(NodeId(1), 200.0, 100.0);
        graph.set_position(NodeId(2), 300.0, 300.0);
        graph.set_position(NodeId(3), 500.0, 300.0);
        graph.set_position(NodeId(4), 400.0, 300.0);
        graph.set_position(NodeId(5), 50.0, 500.0);
        graph
    }

    #[test]
    fn test_isolated_node_has_no_target() {
        let graph = star();
        assert_eq!(drift_target(&graph, NodeId(5), 6.0), None);

        let animator = DriftAnimator::new(&graph, &DriftConfig::default());
        assert_eq!(animator.track(NodeId(5)).unwrap().target, None);
        assert_eq!(animator.offset_at(NodeId(5), 1234.0), (0.0, 0.0));
    }

    #[test]
    fn test_target_points_toward_neighbors() {
        let graph = star();
        let (tx, ty) = drift_target(&graph, NodeId(0), 6.0).unwrap();
        assert!((tx - 6.0).abs() < 1e-5);
        assert!(ty.abs() < 1e-5);

        let (tx, _) = drift_target(&graph, NodeId(1), 6.0).unwrap();
        assert!((tx + 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_opposite_neighbors_cancel() {
        let graph = star();
        assert_eq!(drift_target(&graph, NodeId(4), 6.0), None);
    }

    #[test]
    fn test_embassy_links_count_as_neighbors() {
        let snapshot = GraphSnapshot::new(
            vec![WorldNode::new("a"), WorldNode::new("b")],
            vec![],
            vec![EmbassyEdge::new("a", "b")],
        );
        let mut graph = WorldGraph::from_snapshot(snapshot, None);
        graph.set_position(NodeId(0), 0.0, 0.0);
        graph.set_position(NodeId(1), 0.0, 50.0);
        let (tx, ty) = drift_target(&graph, NodeId(0), 2.0).unwrap();
        assert!(tx.abs() < 1e-5);
        assert!((ty - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_envelope_stays_in_unit_range() {
        for step in 0..2000 {
            let t = step as f32 * 7.3;
            let f = envelope(t, 4750.0, 1.3);
            assert!((0.0..=1.0).contains(&f), "f({t}) = {f}");
        }
        assert!(envelope(0.0, 4000.0, 0.0).abs() < 1e-6);
        assert!((envelope(2000.0, 4000.0, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sway_never_passes_rest() {
        let graph = star();
        let animator = DriftAnimator::new(&graph, &DriftConfig::default());
        let (tx, ty) = animator.track(NodeId(0)).unwrap().target.unwrap();
        for step in 0..500 {
            let (ox, oy) = animator.offset_at(NodeId(0), step as f32 * 31.0);
            assert!(ox * tx + oy * ty >= 0.0);
            assert!((ox * ox + oy * oy).sqrt() <= 6.0 + 1e-4);
        }
    }

    #[test]
    fn test_tracks_are_staggered() {
        let graph = star();
        let animator = DriftAnimator::new(&graph, &DriftConfig::default());
        let t0 = animator.track(NodeId(0)).unwrap();
        let t1 = animator.track(NodeId(1)).unwrap();
        let t5 = animator.track(NodeId(5)).unwrap();
        assert_eq!(t0.duration_ms, 4000.0);
        assert_eq!(t1.duration_ms, 4750.0);
        assert_eq!(t5.duration_ms, 4000.0);
        assert_ne!(t0.phase, t1.phase);
        assert!((0.0..TAU).contains(&t1.phase));
    }

    #[test]
    fn test_advance_moves_only_active_nodes() {
        let graph = star();
        let mut animator = DriftAnimator::new(&graph, &DriftConfig::default());
        assert_eq!(animator.active_nodes(), &[NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);

        animator.advance(900.0);
        assert_eq!(animator.displayed(NodeId(4)), Some((400.0, 300.0)));
        assert_eq!(animator.displayed(NodeId(5)), Some((50.0, 500.0)));

        let (rx, ry) = animator.rest(NodeId(0)).unwrap();
        let (ox, oy) = animator.offset_at(NodeId(0), 900.0);
        assert_eq!(animator.displayed(NodeId(0)), Some((rx + ox, ry + oy)));
    }
}
