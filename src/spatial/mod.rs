//! Spatial indexing for O(log n) hit testing.
//!
//! An R-tree over committed world positions answers nearest-world and
//! visible-rectangle queries for the interaction layer.

mod rtree;

pub use rtree::SpatialIndex;
