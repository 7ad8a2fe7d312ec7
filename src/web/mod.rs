//! Browser glue: frame scheduling, host callbacks and the drift patch.
//!
//! Host callbacks are always invoked after the state borrow is released, so
//! a callback may call back into the map (read positions, replace the
//! snapshot) without tripping the `RefCell`.

pub mod frame_loop;
pub mod patch;

pub use frame_loop::FrameLoop;
pub use patch::DriftPatcher;

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use serde::Serialize;
use wasm_bindgen::JsValue;

use crate::layout::SettleReason;
use crate::session::{FrameOutcome, FrameToken, MapSession};

/// Payload of the `onLayout` callback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEvent {
    pub iteration: u32,
    pub energy: f32,
    /// Set on the frame the layout settled.
    pub settled: Option<SettleReason>,
}

/// JavaScript functions registered by the host.
#[derive(Debug, Clone, Default)]
pub struct Callbacks {
    pub on_layout: Option<Function>,
    pub on_select: Option<Function>,
    pub on_hover: Option<Function>,
}

/// Everything the facade and the frame loop share.
pub struct MapState {
    pub session: MapSession,
    pub callbacks: Callbacks,
    pub patcher: Option<DriftPatcher>,
}

impl MapState {
    pub fn new(session: MapSession) -> Self {
        Self {
            session,
            callbacks: Callbacks::default(),
            patcher: None,
        }
    }

    /// Run one frame and push drift to the DOM if patching is enabled.
    fn frame(&mut self, token: FrameToken, now_ms: f64) -> FrameOutcome {
        let outcome = self.session.on_frame(token, now_ms);
        if outcome == FrameOutcome::Drift {
            if let (Some(patcher), Some(drift)) = (self.patcher.as_mut(), self.session.drift()) {
                patcher.apply(self.session.graph(), drift, self.session.curves());
            }
        }
        outcome
    }
}

/// Frame handler shared by the rAF loop and manual stepping.
///
/// Returns the token to schedule next, or None once nothing is animating.
pub fn run_frame(state: &Rc<RefCell<MapState>>, token: FrameToken, now_ms: f64) -> Option<FrameToken> {
    let Ok(mut guard) = state.try_borrow_mut() else {
        log::warn!("map state busy, frame deferred");
        return Some(token);
    };
    let outcome = guard.frame(token, now_ms);
    let on_layout = guard.callbacks.on_layout.clone();
    drop(guard);

    if let FrameOutcome::Layout {
        iteration,
        energy,
        settled,
    } = outcome
    {
        deliver(
            on_layout.as_ref(),
            &LayoutEvent {
                iteration,
                energy,
                settled,
            },
        );
    }
    outcome.wants_next_frame().then_some(token)
}

/// Serialize `payload` and hand it to a host callback.
pub fn deliver<T: Serialize + ?Sized>(callback: Option<&Function>, payload: &T) {
    let Some(callback) = callback else {
        return;
    };
    match serde_wasm_bindgen::to_value(payload) {
        Ok(value) => {
            if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                log::warn!("host callback threw: {err:?}");
            }
        }
        Err(err) => log::warn!("failed to serialize callback payload: {err}"),
    }
}
