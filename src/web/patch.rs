//! Presentation-only patching for drift frames.
//!
//! Drift never goes through the layout commit callback. Instead the patcher
//! writes straight to the elements the render adapter tagged:
//!
//! - `data-world-id="<id>"`: gets `transform="translate(dx dy)"`, the offset
//!   from the settled position.
//! - `data-edge-id="<n>"`: gets the path `d` of the drifted curve.
//!
//! The patcher owns the `transform` attribute of every `data-world-id`
//! element and overwrites it each frame; [`DriftPatcher::clear`] removes it.
//! The render adapter must therefore tag a wrapper group and place the node
//! inside it (by `cx`/`cy`, or a transform on an inner element), never by a
//! transform on the tagged element itself.
//!
//! This channel is for idle decorative motion only. Anything that changes
//! what the map means must go through a layout commit instead. Elements are
//! looked up once per snapshot and cached; a missing element is skipped.

use web_sys::{Document, Element};

use crate::error::MapError;
use crate::graph::{NodeId, WorldGraph};
use crate::layout::{DriftAnimator, EdgeCurve};

/// Attribute selector with the value quoted as a CSS string.
pub fn attr_selector(attr: &str, value: &str) -> String {
    let mut selector = String::with_capacity(attr.len() + value.len() + 6);
    selector.push('[');
    selector.push_str(attr);
    selector.push_str("=\"");
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                selector.push('\\');
                selector.push(c);
            }
            '\n' => selector.push_str("\\a "),
            _ => selector.push(c),
        }
    }
    selector.push_str("\"]");
    selector
}

/// SVG transform for a drift offset.
pub fn translate(dx: f32, dy: f32) -> String {
    format!("translate({dx:.2} {dy:.2})")
}

/// SVG path data for a quadratic edge curve.
pub fn curve_path(curve: &EdgeCurve) -> String {
    let [x0, y0, cx, cy, x1, y1] = curve.to_array();
    format!("M {x0:.2} {y0:.2} Q {cx:.2} {cy:.2} {x1:.2} {y1:.2}")
}

enum Slot {
    Unresolved,
    Missing,
    Found(Element),
}

pub struct DriftPatcher {
    document: Document,
    nodes: Vec<Slot>,
    edges: Vec<Slot>,
}

impl DriftPatcher {
    pub fn new() -> Result<Self, MapError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(MapError::NoWindow)?;
        Ok(Self {
            document,
            nodes: Vec::new(),
            edges: Vec::new(),
        })
    }

    /// Forget cached elements, e.g. after the snapshot was replaced.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Write one drift frame to the DOM.
    pub fn apply(&mut self, graph: &WorldGraph, drift: &DriftAnimator, curves: &[EdgeCurve]) {
        if self.nodes.len() != graph.node_count() {
            self.nodes = (0..graph.node_count()).map(|_| Slot::Unresolved).collect();
        }
        if self.edges.len() != curves.len() {
            self.edges = (0..curves.len()).map(|_| Slot::Unresolved).collect();
        }

        for &id in drift.active_nodes() {
            let (Some((rx, ry)), Some((x, y)), Some(world)) =
                (drift.rest(id), drift.displayed(id), graph.world(id))
            else {
                continue;
            };
            let selector = attr_selector("data-world-id", &world.id);
            if let Some(element) = resolve(&self.document, &mut self.nodes[id.index()], &selector) {
                set(element, "transform", &translate(x - rx, y - ry));
            }
        }

        for (slot, curve) in self.edges.iter_mut().zip(curves) {
            let selector = attr_selector("data-edge-id", &curve.edge.raw().to_string());
            if let Some(element) = resolve(&self.document, slot, &selector) {
                set(element, "d", &curve_path(curve));
            }
        }
    }

    /// Remove drift transforms, restoring the settled presentation.
    pub fn clear(&mut self) {
        for (i, slot) in self.nodes.iter().enumerate() {
            if let Slot::Found(element) = slot {
                if let Err(err) = element.remove_attribute("transform") {
                    log::warn!("failed to clear drift on {}: {err:?}", NodeId(i as u32));
                }
            }
        }
        self.reset();
    }
}

fn resolve<'a>(document: &Document, slot: &'a mut Slot, selector: &str) -> Option<&'a Element> {
    if matches!(slot, Slot::Unresolved) {
        *slot = match document.query_selector(selector) {
            Ok(Some(element)) => Slot::Found(element),
            Ok(None) => Slot::Missing,
            Err(err) => {
                log::warn!("invalid drift selector {selector}: {err:?}");
                Slot::Missing
            }
        };
    }
    match slot {
        Slot::Found(element) => Some(&*element),
        _ => None,
    }
}

fn set(element: &Element, name: &str, value: &str) {
    if let Err(err) = element.set_attribute(name, value) {
        log::warn!("failed to set {name}: {err:?}");
    }
}
