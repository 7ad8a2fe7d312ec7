//! Edge curve geometry.
//!
//! Every link is drawn as a quadratic Bézier from source to target whose
//! control point is pushed off the chord's midpoint along its normal. Bleed
//! and embassy links bow to opposite sides, so a pair of worlds joined by
//! both kinds shows two separate channels.

use crate::graph::{EdgeId, LinkKind, WorldGraph};

/// Normal offset of the control point as a fraction of the chord length.
pub const BLEED_BOW: f32 = 0.12;
pub const EMBASSY_BOW: f32 = -0.12;

/// Polyline resolution used for hit-testing.
const HIT_SEGMENTS: usize = 16;

/// Quadratic curve for one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCurve {
    pub edge: EdgeId,
    pub kind: LinkKind,
    pub from: (f32, f32),
    pub control: (f32, f32),
    pub to: (f32, f32),
}

/// Control point for a chord bowed by `bow` × its length.
#[inline]
pub fn control_point(from: (f32, f32), to: (f32, f32), bow: f32) -> (f32, f32) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mx, my) = ((from.0 + to.0) * 0.5, (from.1 + to.1) * 0.5);
    // (-dy, dx) is the chord normal scaled by the chord length.
    (mx - dy * bow, my + dx * bow)
}

impl EdgeCurve {
    pub fn new(edge: EdgeId, kind: LinkKind, from: (f32, f32), to: (f32, f32)) -> Self {
        let bow = if kind.is_embassy() { EMBASSY_BOW } else { BLEED_BOW };
        Self {
            edge,
            kind,
            from,
            control: control_point(from, to, bow),
            to,
        }
    }

    /// Point on the curve at parameter `t` in [0, 1].
    pub fn point_at(&self, t: f32) -> (f32, f32) {
        let u = 1.0 - t;
        let (a, b, c) = (u * u, 2.0 * u * t, t * t);
        (
            a * self.from.0 + b * self.control.0 + c * self.to.0,
            a * self.from.1 + b * self.control.1 + c * self.to.1,
        )
    }

    /// Approximate distance from a point to the curve.
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let mut best = f32::INFINITY;
        let mut prev = self.from;
        for step in 1..=HIT_SEGMENTS {
            let next = self.point_at(step as f32 / HIT_SEGMENTS as f32);
            best = best.min(segment_distance((x, y), prev, next));
            prev = next;
        }
        best
    }

    /// `[x0, y0, cx, cy, x1, y1]` for the render adapter.
    pub fn to_array(&self) -> [f32; 6] {
        [
            self.from.0,
            self.from.1,
            self.control.0,
            self.control.1,
            self.to.0,
            self.to.1,
        ]
    }
}

fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let (apx, apy) = (p.0 - a.0, p.1 - a.1);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + abx * t - p.0, a.1 + aby * t - p.1);
    (cx * cx + cy * cy).sqrt()
}

/// Curves for every resolved link, using the given position buffers.
pub fn edge_curves(graph: &WorldGraph, pos_x: &[f32], pos_y: &[f32]) -> Vec<EdgeCurve> {
    graph
        .links()
        .map(|(source, target, link)| {
            let (a, b) = (source.index(), target.index());
            EdgeCurve::new(link.id, link.kind, (pos_x[a], pos_y[a]), (pos_x[b], pos_y[b]))
        })
        .collect()
}

/// Flatten curves into `[x0, y0, cx, cy, x1, y1, ...]`.
pub fn flatten_curves(curves: &[EdgeCurve]) -> Vec<f32> {
    curves.iter().flat_map(|curve| curve.to_array()).collect()
}
