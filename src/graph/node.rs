//! World node records and their slot identifiers.
//!
//! A world arrives from the host application as a [`WorldNode`] record keyed
//! by its string id. Inside one snapshot each world is addressed by a dense
//! [`NodeId`] slot, which indexes the engine's position and velocity buffers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense slot identifier of a world within the current snapshot.
///
/// Slots are assigned in snapshot order and stay valid until the snapshot is
/// replaced. It wraps a u32 for efficient storage and WebAssembly interop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Slot index into the SoA buffers.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Summary counts shown on a world's card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldCounts {
    pub characters: u32,
    pub locations: u32,
    pub factions: u32,
}

/// A world entry on the multiverse map.
///
/// `theme` only selects a color in the render adapter; it has no effect on
/// the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldNode {
    /// Stable id assigned by the host application.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Category used for coloring.
    #[serde(default)]
    pub theme: String,
    /// Banner image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub counts: WorldCounts,
}

impl WorldNode {
    /// Create a world with only an id; display fields stay empty.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            theme: String::new(),
            banner_url: None,
            counts: WorldCounts::default(),
        }
    }

    /// Builder-style display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style theme.
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }
}
