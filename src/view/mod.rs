//! Viewport and pointer interaction.
//!
//! Both operate on the model coordinate space produced by the layout and
//! never feed back into the simulation.

pub mod backdrop;
pub mod interaction;
pub mod viewport;

pub use backdrop::{Backdrop, BackdropState, Star};
pub use interaction::{HitScene, HitTarget, HoverUpdate, InteractionConfig, InteractionController, SelectionEvent};
pub use viewport::{Viewport, ViewportConfig};
