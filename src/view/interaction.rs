//! Hover and click resolution.
//!
//! Pointer positions are hit-tested geometrically against node circles
//! (through the R-tree) and edge curves; the physics model is not involved.
//! Nodes take priority over edges. Clicks produce a [`SelectionEvent`] for
//! the host application and change nothing else.

use serde::{Deserialize, Serialize};

use super::viewport::Viewport;
use crate::graph::{BleedEdge, EdgeId, EmbassyEdge, LinkKind, NodeId, WorldGraph, WorldNode};
use crate::layout::EdgeCurve;
use crate::spatial::SpatialIndex;

/// Hit-testing tolerances.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionConfig {
    /// Node circle radius in model units.
    pub node_radius: f32,
    /// Edge pick tolerance in screen pixels.
    pub edge_tolerance: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            node_radius: 28.0,
            edge_tolerance: 6.0,
        }
    }
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Node(NodeId),
    Edge(EdgeId),
}

/// Notification emitted when the user clicks a world or a relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SelectionEvent {
    NodeSelected { node: WorldNode },
    BleedEdgeSelected { edge: BleedEdge },
    EmbassyEdgeSelected { edge: EmbassyEdge },
}

impl SelectionEvent {
    /// Record behind a hit target.
    pub fn for_target(graph: &WorldGraph, target: HitTarget) -> Option<Self> {
        match target {
            HitTarget::Node(id) => graph
                .world(id)
                .map(|node| SelectionEvent::NodeSelected { node: node.clone() }),
            HitTarget::Edge(id) => {
                let (_, _, link) = graph.link(id)?;
                match link.kind {
                    LinkKind::Bleed(i) => graph
                        .bleed_edge(i)
                        .map(|edge| SelectionEvent::BleedEdgeSelected { edge: edge.clone() }),
                    LinkKind::Embassy(i) => graph
                        .embassy_edge(i)
                        .map(|edge| SelectionEvent::EmbassyEdgeSelected { edge: edge.clone() }),
                }
            }
        }
    }
}

/// Result of a pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverUpdate {
    Unchanged,
    /// The tooltip target changed (None: pointer left every target).
    Changed(Option<HitTarget>),
}

/// Everything a hit test reads, borrowed from the session.
pub struct HitScene<'a> {
    pub graph: &'a WorldGraph,
    pub index: &'a SpatialIndex,
    pub curves: &'a [EdgeCurve],
    pub viewport: &'a Viewport,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    config: InteractionConfig,
    hover: Option<HitTarget>,
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            hover: None,
        }
    }

    /// Current tooltip target.
    pub fn hover(&self) -> Option<HitTarget> {
        self.hover
    }

    /// Resolve a screen-space pointer position.
    pub fn hit_test(&self, scene: &HitScene<'_>, screen_x: f32, screen_y: f32) -> Option<HitTarget> {
        let (x, y) = scene.viewport.screen_to_model(screen_x, screen_y);

        if let Some(id) = scene.index.nearest_within(x, y, self.config.node_radius) {
            return Some(HitTarget::Node(id));
        }

        let tolerance = self.config.edge_tolerance / scene.viewport.zoom();
        scene
            .curves
            .iter()
            .map(|curve| (curve.edge, curve.distance_to(x, y)))
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(edge, _)| HitTarget::Edge(edge))
    }

    pub fn pointer_move(&mut self, scene: &HitScene<'_>, screen_x: f32, screen_y: f32) -> HoverUpdate {
        let target = self.hit_test(scene, screen_x, screen_y);
        self.set_hover(target)
    }

    pub fn pointer_leave(&mut self) -> HoverUpdate {
        self.set_hover(None)
    }

    /// Drop the hover target without reporting, e.g. when the graph is replaced.
    pub fn reset(&mut self) {
        self.hover = None;
    }

    fn set_hover(&mut self, target: Option<HitTarget>) -> HoverUpdate {
        if self.hover == target {
            return HoverUpdate::Unchanged;
        }
        self.hover = target;
        HoverUpdate::Changed(target)
    }

    /// Resolve a click into a selection notification.
    pub fn click(&self, scene: &HitScene<'_>, screen_x: f32, screen_y: f32) -> Option<SelectionEvent> {
        let target = self.hit_test(scene, screen_x, screen_y)?;
        SelectionEvent::for_target(scene.graph, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphSnapshot;
    use crate::layout::edge_curves;
    use crate::view::ViewportConfig;

    struct Fixture {
        graph: WorldGraph,
        index: SpatialIndex,
        curves: Vec<EdgeCurve>,
        viewport: Viewport,
    }

    impl Fixture {
        fn new() -> Self {
            let snapshot = GraphSnapshot::new(
                vec![
                    WorldNode::new("a").with_name("Aurelia"),
                    WorldNode::new("b").with_name("Brume"),
                    WorldNode::new("c").with_name("Cinder"),
                ],
                vec![BleedEdge::new("a", "b", 0.7)],
                vec![EmbassyEdge::new("b", "c")],
            );
            let mut graph = WorldGraph::from_snapshot(snapshot, None);
            graph.set_position(NodeId(0), 100.0, 100.0);
            graph.set_position(NodeId(1), 400.0, 100.0);
            graph.set_position(NodeId(2), 400.0, 400.0);

            let mut index = SpatialIndex::new();
            index.rebuild(graph.positions_x(), graph.positions_y());
            let curves = edge_curves(&graph, graph.positions_x(), graph.positions_y());
            let viewport = Viewport::new(800.0, 600.0, ViewportConfig::default());
            Self {
                graph,
                index,
                curves,
                viewport,
            }
        }

        fn scene(&self) -> HitScene<'_> {
            HitScene {
                graph: &self.graph,
                index: &self.index,
                curves: &self.curves,
                viewport: &self.viewport,
            }
        }
    }

    #[test]
    fn test_click_node_emits_selection() {
        let fixture = Fixture::new();
        let controller = InteractionController::default();
        let event = controller.click(&fixture.scene(), 110.0, 95.0).unwrap();
        match event {
            SelectionEvent::NodeSelected { node } => assert_eq!(node.name, "Aurelia"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_click_edges_by_kind() {
        let fixture = Fixture::new();
        let controller = InteractionController::default();

        // Apex of the bleed curve between a and b.
        let (x, y) = fixture.curves[0].point_at(0.5);
        let event = controller.click(&fixture.scene(), x, y).unwrap();
        assert_eq!(
            event,
            SelectionEvent::BleedEdgeSelected {
                edge: BleedEdge::new("a", "b", 0.7)
            }
        );

        let (x, y) = fixture.curves[1].point_at(0.5);
        let event = controller.click(&fixture.scene(), x, y).unwrap();
        assert!(matches!(event, SelectionEvent::EmbassyEdgeSelected { .. }));
    }

    #[test]
    fn test_click_empty_space() {
        let fixture = Fixture::new();
        let controller = InteractionController::default();
        assert_eq!(controller.click(&fixture.scene(), 700.0, 550.0), None);
    }

    #[test]
    fn test_node_wins_over_edge() {
        let fixture = Fixture::new();
        let controller = InteractionController::default();
        // On the bleed curve but inside node a's circle.
        let (x, y) = fixture.curves[0].point_at(0.05);
        assert_eq!(
            controller.hit_test(&fixture.scene(), x, y),
            Some(HitTarget::Node(NodeId(0)))
        );
    }

    #[test]
    fn test_hover_reports_changes_only() {
        let fixture = Fixture::new();
        let mut controller = InteractionController::default();
        let scene = fixture.scene();

        assert_eq!(
            controller.pointer_move(&scene, 400.0, 400.0),
            HoverUpdate::Changed(Some(HitTarget::Node(NodeId(2))))
        );
        assert_eq!(controller.pointer_move(&scene, 405.0, 402.0), HoverUpdate::Unchanged);
        assert_eq!(controller.hover(), Some(HitTarget::Node(NodeId(2))));
        assert_eq!(controller.pointer_leave(), HoverUpdate::Changed(None));
        assert_eq!(controller.pointer_leave(), HoverUpdate::Unchanged);
    }

    #[test]
    fn test_hit_respects_viewport() {
        let mut fixture = Fixture::new();
        fixture.viewport.pan_by(50.0, 0.0);
        let controller = InteractionController::default();
        // Node a is now drawn at screen (150, 100).
        assert_eq!(
            controller.hit_test(&fixture.scene(), 150.0, 100.0),
            Some(HitTarget::Node(NodeId(0)))
        );
        assert_eq!(controller.hit_test(&fixture.scene(), 60.0, 100.0), None);
    }

    #[test]
    fn test_selection_event_serializes_with_tag() {
        let event = SelectionEvent::NodeSelected {
            node: WorldNode::new("a"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "nodeSelected");
        assert_eq!(json["node"]["id"], "a");
    }
}
