//! MapSession - the per-component state machine.
//!
//! A session owns the transient state of the current snapshot and decides
//! what each animation frame does:
//!
//! ```text
//! replace_snapshot ──► Settling ──(energy < threshold | cap)──► Drifting
//!        ▲                 │                                      │
//!        └─────────────────┴──────── replace_snapshot / teardown ─┘
//! ```
//!
//! Exactly one loop is active per snapshot. Every replacement or teardown
//! bumps the generation; a frame scheduled under an older generation is
//! answered with [`FrameOutcome::Stale`] and must not be rescheduled.
//! Everything runs on one thread, so plain `&mut self` is enough.

use crate::config::MapConfig;
use crate::error::{MapError, validate_dimensions};
use crate::graph::{GraphSnapshot, NodeId, WorldGraph};
use crate::layout::{
    DriftAnimator, EdgeCurve, LayoutRun, SettleReason, TickOutcome, edge_curves, initialize_positions,
};
use crate::spatial::SpatialIndex;
use crate::view::{HitScene, HitTarget, HoverUpdate, InteractionController, SelectionEvent, Viewport};

/// Which loop currently owns the positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No snapshot, an empty snapshot, or torn down.
    Idle,
    Settling,
    Drifting,
}

/// Generation a frame callback was scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

impl FrameToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// What a frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// The frame belongs to a replaced snapshot; nothing was touched.
    Stale,
    /// Nothing to animate.
    Idle,
    /// The layout advanced and committed new positions.
    Layout {
        iteration: u32,
        energy: f32,
        settled: Option<SettleReason>,
    },
    /// Drift offsets were updated for the presentation patch.
    Drift,
}

impl FrameOutcome {
    /// Whether the caller should schedule another frame.
    pub fn wants_next_frame(&self) -> bool {
        matches!(self, FrameOutcome::Layout { .. } | FrameOutcome::Drift)
    }
}

pub struct MapSession {
    config: MapConfig,
    graph: WorldGraph,
    run: LayoutRun,
    drift: Option<DriftAnimator>,
    drift_started_at: Option<f64>,
    index: SpatialIndex,
    /// Curves as drawn, drift included.
    curves: Vec<EdgeCurve>,
    /// Curves at the committed positions, matching the R-tree.
    hit_curves: Vec<EdgeCurve>,
    viewport: Viewport,
    interaction: InteractionController,
    phase: Phase,
    generation: u64,
}

impl MapSession {
    pub fn new(width: f32, height: f32, config: MapConfig) -> Result<Self, MapError> {
        validate_dimensions(width, height)?;
        config.validate()?;

        Ok(Self {
            viewport: Viewport::new(width, height, config.viewport.clone()),
            interaction: InteractionController::new(config.interaction.clone()),
            config,
            graph: WorldGraph::new(),
            run: LayoutRun::new(),
            drift: None,
            drift_started_at: None,
            index: SpatialIndex::new(),
            curves: Vec::new(),
            hit_curves: Vec::new(),
            phase: Phase::Idle,
            generation: 0,
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Replace the snapshot and restart the simulation from iteration 0.
    ///
    /// Returns the token frames for the new snapshot must carry.
    pub fn replace_snapshot(&mut self, snapshot: GraphSnapshot) -> FrameToken {
        self.generation += 1;
        self.graph = WorldGraph::from_snapshot(snapshot, self.config.layout.embassy_strength);
        self.run = LayoutRun::new();
        self.drift = None;
        self.drift_started_at = None;
        self.interaction.reset();

        let (width, height) = (self.viewport.width(), self.viewport.height());
        initialize_positions(&mut self.graph, width, height, &self.config.layout);
        self.commit();

        self.phase = if self.graph.is_empty() {
            Phase::Idle
        } else {
            Phase::Settling
        };
        log::debug!(
            "snapshot {} loaded: {} worlds, {} links",
            self.generation,
            self.graph.node_count(),
            self.graph.link_count()
        );
        self.token()
    }

    /// Invalidate every pending frame and stop both loops.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.phase = Phase::Idle;
        self.drift = None;
        self.drift_started_at = None;
        self.interaction.reset();
    }

    pub fn token(&self) -> FrameToken {
        FrameToken(self.generation)
    }

    pub fn is_current(&self, token: FrameToken) -> bool {
        token.0 == self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    // =========================================================================
    // Frames
    // =========================================================================

    /// Run one animation frame scheduled under `token`.
    pub fn on_frame(&mut self, token: FrameToken, now_ms: f64) -> FrameOutcome {
        if !self.is_current(token) {
            return FrameOutcome::Stale;
        }
        match self.phase {
            Phase::Idle => FrameOutcome::Idle,
            Phase::Settling => self.settle_frame(),
            Phase::Drifting => self.drift_frame(now_ms),
        }
    }

    fn settle_frame(&mut self) -> FrameOutcome {
        let (width, height) = (self.viewport.width(), self.viewport.height());
        let mut outcome = TickOutcome::Running {
            iteration: self.run.iteration(),
            energy: self.run.energy(),
        };
        for _ in 0..self.config.layout.ticks_per_frame {
            outcome = self.run.step(&mut self.graph, width, height, &self.config.layout);
            if outcome.is_settled() {
                break;
            }
        }
        self.commit();

        match outcome {
            TickOutcome::Running { iteration, energy } => FrameOutcome::Layout {
                iteration,
                energy,
                settled: None,
            },
            TickOutcome::Settled {
                reason,
                iterations,
                energy,
            } => {
                self.enter_drift(reason, iterations, energy);
                FrameOutcome::Layout {
                    iteration: iterations,
                    energy,
                    settled: Some(reason),
                }
            }
        }
    }

    fn enter_drift(&mut self, reason: SettleReason, iterations: u32, energy: f32) {
        log::info!("layout settled after {iterations} iterations ({reason:?}, energy {energy:.4})");
        self.drift = Some(DriftAnimator::new(&self.graph, &self.config.drift));
        self.drift_started_at = None;
        self.phase = Phase::Drifting;
    }

    fn drift_frame(&mut self, now_ms: f64) -> FrameOutcome {
        let Some(drift) = self.drift.as_mut() else {
            return FrameOutcome::Idle;
        };
        if drift.is_idle() {
            return FrameOutcome::Idle;
        }

        let started = *self.drift_started_at.get_or_insert(now_ms);
        drift.advance((now_ms - started).max(0.0) as f32);
        self.curves = edge_curves(&self.graph, drift.displayed_x(), drift.displayed_y());
        FrameOutcome::Drift
    }

    /// Settle synchronously and hand over to drift.
    ///
    /// Used when the host wants a finished layout without animating it.
    /// Returns None while idle (no snapshot, empty, or torn down); nothing
    /// is ticked then.
    pub fn settle_now(&mut self) -> Option<TickOutcome> {
        if self.phase == Phase::Idle {
            return None;
        }
        let (width, height) = (self.viewport.width(), self.viewport.height());
        let outcome = self
            .run
            .run_to_completion(&mut self.graph, width, height, &self.config.layout);
        self.commit();
        if let TickOutcome::Settled {
            reason,
            iterations,
            energy,
        } = outcome
        {
            if self.phase == Phase::Settling {
                self.enter_drift(reason, iterations, energy);
            }
        }
        Some(outcome)
    }

    /// Publish the simulation's positions to hit-testing and edge geometry.
    ///
    /// Drift only moves the drawn curves; hit-testing keeps using the
    /// committed geometry for nodes and edges alike.
    fn commit(&mut self) {
        self.index.rebuild(self.graph.positions_x(), self.graph.positions_y());
        self.hit_curves = edge_curves(&self.graph, self.graph.positions_x(), self.graph.positions_y());
        self.curves = self.hit_curves.clone();
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn graph(&self) -> &WorldGraph {
        &self.graph
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn layout_run(&self) -> &LayoutRun {
        &self.run
    }

    pub fn drift(&self) -> Option<&DriftAnimator> {
        self.drift.as_ref()
    }

    pub fn curves(&self) -> &[EdgeCurve] {
        &self.curves
    }

    /// Positions to draw, `[x0, y0, x1, y1, ...]`: drifted while drifting,
    /// committed otherwise.
    pub fn displayed_positions(&self) -> Vec<f32> {
        match (&self.drift, self.phase) {
            (Some(drift), Phase::Drifting) => drift
                .displayed_x()
                .iter()
                .zip(drift.displayed_y())
                .flat_map(|(&x, &y)| [x, y])
                .collect(),
            _ => self.graph.interleaved_positions(),
        }
    }

    /// Worlds inside the visible model rectangle.
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let (min_x, min_y, max_x, max_y) = self.viewport.visible_rect();
        let pad = self.config.interaction.node_radius;
        self.index.in_rect(min_x - pad, min_y - pad, max_x + pad, max_y + pad)
    }

    // =========================================================================
    // Viewport & interaction
    // =========================================================================

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Apply a new container size. Returns true if the backdrop was regenerated.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<bool, MapError> {
        validate_dimensions(width, height)?;
        Ok(self.viewport.resize(width, height))
    }

    /// Center the committed layout in the viewport.
    pub fn fit_view(&mut self, padding: f32) {
        if let Some(bounds) = self.graph.bounds() {
            self.viewport.fit_to(bounds, padding);
        }
    }

    fn scene(&self) -> HitScene<'_> {
        HitScene {
            graph: &self.graph,
            index: &self.index,
            curves: &self.hit_curves,
            viewport: &self.viewport,
        }
    }

    pub fn hover(&self) -> Option<HitTarget> {
        self.interaction.hover()
    }

    pub fn pointer_move(&mut self, screen_x: f32, screen_y: f32) -> HoverUpdate {
        let scene = HitScene {
            graph: &self.graph,
            index: &self.index,
            curves: &self.hit_curves,
            viewport: &self.viewport,
        };
        self.interaction.pointer_move(&scene, screen_x, screen_y)
    }

    pub fn pointer_leave(&mut self) -> HoverUpdate {
        self.interaction.pointer_leave()
    }

    pub fn click(&self, screen_x: f32, screen_y: f32) -> Option<SelectionEvent> {
        self.interaction.click(&self.scene(), screen_x, screen_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BleedEdge, EmbassyEdge, WorldNode};
    use crate::layout::ForceConfig;

    fn chain() -> GraphSnapshot {
        GraphSnapshot::new(
            vec![WorldNode::new("a"), WorldNode::new("b"), WorldNode::new("c")],
            vec![BleedEdge::new("a", "b", 0.8)],
            vec![EmbassyEdge::new("b", "c")],
        )
    }

    fn capped(max_iterations: u32) -> MapConfig {
        MapConfig {
            layout: ForceConfig {
                max_iterations,
                energy_threshold: 0.0,
                ..ForceConfig::default()
            },
            ..MapConfig::default()
        }
    }

    fn session(config: MapConfig) -> MapSession {
        MapSession::new(800.0, 600.0, config).unwrap()
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(
            MapSession::new(-1.0, 600.0, MapConfig::default()),
            Err(MapError::InvalidDimensions { .. })
        ));
        let mut s = session(MapConfig::default());
        assert!(s.resize(f32::NAN, 10.0).is_err());
        assert_eq!(s.viewport().width(), 800.0);
    }

    #[test]
    fn test_settles_then_drifts() {
        let mut s = session(capped(3));
        let token = s.replace_snapshot(chain());
        assert_eq!(s.phase(), Phase::Settling);

        let first = s.on_frame(token, 0.0);
        assert!(matches!(first, FrameOutcome::Layout { iteration: 1, settled: None, .. }));
        s.on_frame(token, 16.0);
        let third = s.on_frame(token, 32.0);
        assert!(matches!(
            third,
            FrameOutcome::Layout {
                iteration: 3,
                settled: Some(SettleReason::IterationCap),
                ..
            }
        ));
        assert_eq!(s.phase(), Phase::Drifting);
        assert!(third.wants_next_frame());

        assert_eq!(s.on_frame(token, 48.0), FrameOutcome::Drift);
        assert_eq!(s.layout_run().iteration(), 3);
    }

    #[test]
    fn test_drift_leaves_committed_positions_alone() {
        let mut s = session(capped(1));
        let token = s.replace_snapshot(chain());
        s.on_frame(token, 0.0);
        let settled = s.graph().interleaved_positions();

        for frame in 1..20 {
            assert_eq!(s.on_frame(token, 100.0 * frame as f64), FrameOutcome::Drift);
        }
        assert_eq!(s.graph().interleaved_positions(), settled);

        let drift = s.drift().unwrap();
        let amplitude = s.config().drift.amplitude;
        for &id in drift.active_nodes() {
            let (rx, ry) = drift.rest(id).unwrap();
            let (dx, dy) = drift.displayed(id).unwrap();
            assert!(((dx - rx).powi(2) + (dy - ry).powi(2)).sqrt() <= amplitude + 1e-3);
        }
    }

    #[test]
    fn test_stale_frames_are_ignored() {
        let mut s = session(MapConfig::default());
        let old = s.replace_snapshot(chain());
        let current = s.replace_snapshot(chain());
        assert_ne!(old, current);

        let before = s.graph().interleaved_positions();
        assert_eq!(s.on_frame(old, 0.0), FrameOutcome::Stale);
        assert!(!FrameOutcome::Stale.wants_next_frame());
        assert_eq!(s.graph().interleaved_positions(), before);
        assert_eq!(s.layout_run().iteration(), 0);

        assert!(matches!(s.on_frame(current, 0.0), FrameOutcome::Layout { .. }));
    }

    #[test]
    fn test_teardown_invalidates_token() {
        let mut s = session(MapConfig::default());
        let token = s.replace_snapshot(chain());
        s.teardown();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.on_frame(token, 0.0), FrameOutcome::Stale);
        assert_eq!(s.on_frame(s.token(), 0.0), FrameOutcome::Idle);
    }

    #[test]
    fn test_replacement_restarts_from_zero() {
        let mut s = session(capped(2));
        let token = s.replace_snapshot(chain());
        s.on_frame(token, 0.0);
        s.on_frame(token, 16.0);
        assert_eq!(s.phase(), Phase::Drifting);

        s.replace_snapshot(chain());
        assert_eq!(s.phase(), Phase::Settling);
        assert_eq!(s.layout_run().iteration(), 0);
        assert!(s.drift().is_none());
    }

    #[test]
    fn test_empty_snapshot_is_idle() {
        let mut s = session(MapConfig::default());
        let token = s.replace_snapshot(GraphSnapshot::default());
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.on_frame(token, 0.0), FrameOutcome::Idle);
        assert!(s.displayed_positions().is_empty());
        assert!(s.curves().is_empty());
        assert_eq!(s.click(400.0, 300.0), None);
    }

    #[test]
    fn test_dangling_links_are_skipped() {
        let mut s = session(MapConfig::default());
        let snapshot = GraphSnapshot::new(
            vec![WorldNode::new("a"), WorldNode::new("b")],
            vec![BleedEdge::new("a", "b", 0.5), BleedEdge::new("a", "ghost", 0.5)],
            vec![EmbassyEdge::new("nowhere", "b")],
        );
        s.replace_snapshot(snapshot);
        assert_eq!(s.graph().link_count(), 1);
        assert_eq!(s.graph().skipped_links(), 2);
        assert_eq!(s.curves().len(), 1);
    }

    #[test]
    fn test_ticks_per_frame() {
        let config = MapConfig {
            layout: ForceConfig {
                ticks_per_frame: 5,
                energy_threshold: 0.0,
                ..ForceConfig::default()
            },
            ..MapConfig::default()
        };
        let mut s = session(config);
        let token = s.replace_snapshot(chain());
        assert!(matches!(s.on_frame(token, 0.0), FrameOutcome::Layout { iteration: 5, .. }));
    }

    #[test]
    fn test_settle_now_enters_drift() {
        let mut s = session(capped(40));
        s.replace_snapshot(chain());
        let outcome = s.settle_now().unwrap();
        assert!(outcome.is_settled());
        assert_eq!(s.phase(), Phase::Drifting);
        assert_eq!(s.layout_run().iteration(), 40);
    }

    #[test]
    fn test_settle_now_after_teardown_is_noop() {
        let mut s = session(MapConfig::default());
        s.replace_snapshot(chain());
        s.teardown();
        let before = s.graph().interleaved_positions();

        assert_eq!(s.settle_now(), None);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.layout_run().iteration(), 0);
        assert_eq!(s.graph().interleaved_positions(), before);
    }

    #[test]
    fn test_zero_size_viewport_is_accepted() {
        let mut s = MapSession::new(0.0, 0.0, MapConfig::default()).unwrap();
        s.replace_snapshot(chain());
        assert!(s.resize(800.0, 600.0).unwrap());
    }

    #[test]
    fn test_edges_hit_committed_geometry_while_drifting() {
        let mut s = session(capped(1));
        let token = s.replace_snapshot(chain());
        s.on_frame(token, 0.0);
        s.on_frame(token, 0.0);
        assert_eq!(s.on_frame(token, 1500.0), FrameOutcome::Drift);

        let committed = edge_curves(s.graph(), s.graph().positions_x(), s.graph().positions_y());
        assert_ne!(committed[0].to_array(), s.curves()[0].to_array());

        let (x, y) = committed[0].point_at(0.5);
        let (sx, sy) = s.viewport().model_to_screen(x, y);
        assert_eq!(
            s.click(sx, sy),
            Some(SelectionEvent::BleedEdgeSelected {
                edge: BleedEdge::new("a", "b", 0.8)
            })
        );
    }

    #[test]
    fn test_click_and_hover_use_committed_positions() {
        let mut s = session(capped(1));
        let token = s.replace_snapshot(chain());
        s.on_frame(token, 0.0);

        let (x, y) = s.graph().position(NodeId(1)).unwrap();
        let (sx, sy) = s.viewport().model_to_screen(x, y);
        match s.click(sx, sy) {
            Some(SelectionEvent::NodeSelected { node }) => assert_eq!(node.id, "b"),
            other => panic!("unexpected click result {other:?}"),
        }
        assert_eq!(
            s.pointer_move(sx, sy),
            HoverUpdate::Changed(Some(HitTarget::Node(NodeId(1))))
        );
        assert_eq!(s.hover(), Some(HitTarget::Node(NodeId(1))));
        assert_eq!(s.pointer_leave(), HoverUpdate::Changed(None));
    }

    #[test]
    fn test_visible_nodes_follow_viewport() {
        let mut s = session(capped(1));
        let token = s.replace_snapshot(chain());
        s.on_frame(token, 0.0);
        assert_eq!(s.visible_nodes().len(), 3);

        s.viewport_mut().pan_by(-5000.0, 0.0);
        assert!(s.visible_nodes().is_empty());
    }
}
