//! Layout algorithms for the multiverse map.
//!
//! - `force`: force-directed simulation and its termination policy
//! - `drift`: idle sway evaluated after the simulation settles
//! - `curve`: quadratic edge geometry shared by rendering and hit-testing

pub mod curve;
pub mod drift;
pub mod force;

pub use curve::{EdgeCurve, edge_curves, flatten_curves};
pub use drift::{DriftAnimator, DriftConfig, DriftTrack};
pub use force::{ForceConfig, LayoutRun, SettleReason, TickOutcome, initialize_positions, simulate_tick};
