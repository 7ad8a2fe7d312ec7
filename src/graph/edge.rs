//! Edge records and the resolved links stored in the graph.
//!
//! Two relationship kinds connect worlds:
//! - Bleed edges carry a continuous strength in [0, 1] that acts as spring stiffness
//! - Embassy edges are discrete diplomatic channels with a label on each side

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a resolved link within the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Create a new EdgeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

impl From<u32> for EdgeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Thematic influence flowing between two worlds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BleedEdge {
    pub source_id: String,
    pub target_id: String,
    /// Spring stiffness analogue in [0, 1].
    pub strength: f32,
}

impl BleedEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, strength: f32) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            strength,
        }
    }

    /// Strength clamped to [0, 1]. NaN maps to 0.
    pub fn clamped_strength(&self) -> f32 {
        clamp_strength(self.strength)
    }
}

/// Diplomatic channel between a building in each of two worlds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbassyEdge {
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default)]
    pub source_label: String,
    #[serde(default)]
    pub target_label: String,
}

impl EmbassyEdge {
    pub fn new(source_node_id: impl Into<String>, target_node_id: impl Into<String>) -> Self {
        Self {
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            source_label: String::new(),
            target_label: String::new(),
        }
    }
}

/// Which snapshot record a resolved link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Index into the snapshot's bleed edges.
    Bleed(usize),
    /// Index into the snapshot's embassy edges.
    Embassy(usize),
}

impl LinkKind {
    #[inline]
    pub fn is_embassy(self) -> bool {
        matches!(self, LinkKind::Embassy(_))
    }
}

/// Edge weight stored in the graph: origin plus the strength the spring uses.
///
/// `strength` is `None` for embassy links when embassy attraction is disabled;
/// such links are drawn and hit-tested but exert no force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub id: EdgeId,
    pub kind: LinkKind,
    pub strength: Option<f32>,
}

pub(crate) fn clamp_strength(strength: f32) -> f32 {
    if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_id() {
        let id = EdgeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "Edge(42)");
    }

    #[test]
    fn test_strength_is_clamped() {
        assert_eq!(BleedEdge::new("a", "b", 1.7).clamped_strength(), 1.0);
        assert_eq!(BleedEdge::new("a", "b", -0.3).clamped_strength(), 0.0);
        assert_eq!(BleedEdge::new("a", "b", f32::NAN).clamped_strength(), 0.0);
        assert_eq!(BleedEdge::new("a", "b", 0.4).clamped_strength(), 0.4);
    }

    #[test]
    fn test_embassy_decodes_labels() {
        let json = r#"{
            "sourceNodeId": "a",
            "targetNodeId": "b",
            "sourceLabel": "Consulate",
            "targetLabel": "Tower"
        }"#;
        let edge: EmbassyEdge = serde_json::from_str(json).unwrap();
        assert_eq!(edge.source_label, "Consulate");
        assert_eq!(edge.target_label, "Tower");
    }
}
