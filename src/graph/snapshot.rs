//! Graph snapshots supplied by the host application.
//!
//! A snapshot is replaced wholesale whenever the underlying data changes.
//! It is never mutated; the engine copies what it needs into its own buffers.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use super::edge::{BleedEdge, EmbassyEdge};
use super::node::WorldNode;
use crate::error::MapError;

/// One consistent set of worlds and their relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub nodes: Vec<WorldNode>,
    /// Bleed edges.
    #[serde(default)]
    pub edges: Vec<BleedEdge>,
    #[serde(default)]
    pub embassy_edges: Vec<EmbassyEdge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<WorldNode>, edges: Vec<BleedEdge>, embassy_edges: Vec<EmbassyEdge>) -> Self {
        Self {
            nodes,
            edges,
            embassy_edges,
        }
    }

    /// Decode a snapshot object passed from JavaScript.
    pub fn from_js(value: JsValue) -> Result<Self, MapError> {
        serde_wasm_bindgen::from_value(value).map_err(|e| MapError::InvalidSnapshot(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_snapshot() {
        let json = r#"{
            "nodes": [{ "id": "a", "name": "A" }, { "id": "b", "name": "B" }],
            "edges": [{ "sourceId": "a", "targetId": "b", "strength": 0.5 }],
            "embassyEdges": [{
                "sourceNodeId": "b",
                "targetNodeId": "a",
                "sourceLabel": "Gate",
                "targetLabel": "Hall"
            }]
        }"#;
        let snapshot: GraphSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges[0].strength, 0.5);
        assert_eq!(snapshot.embassy_edges[0].source_node_id, "b");
    }

    #[test]
    fn test_edges_default_to_empty() {
        let snapshot: GraphSnapshot = serde_json::from_str(r#"{ "nodes": [] }"#).unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.edges.is_empty());
        assert!(snapshot.embassy_edges.is_empty());
    }

    #[test]
    fn test_missing_node_id_is_rejected() {
        let result: Result<GraphSnapshot, _> = serde_json::from_str(r#"{ "nodes": [{ "name": "x" }] }"#);
        assert!(result.is_err());
    }
}
