//! Multiverse Map - WASM Module
//!
//! Force-directed layout, idle drift and viewport math for the multiverse
//! map. It is compiled to WebAssembly and exposes a JavaScript-friendly API
//! via wasm-bindgen; everything below `web` is plain Rust and tested natively.
//!
//! # Architecture
//!
//! - `graph`: world/edge records resolved into petgraph's StableGraph
//! - `layout`: force simulation, drift animator and edge curves
//! - `spatial`: R-tree spatial indexing for O(log n) hit testing
//! - `view`: viewport, starfield backdrop and pointer interaction
//! - `session`: per-snapshot state machine (settling, then drifting)
//! - `web`: requestAnimationFrame loop, host callbacks, drift DOM patch

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Float32Array, Function};
use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod session;
pub mod spatial;
pub mod view;
pub mod web;

use config::MapConfig;
use error::MapError;
use graph::{GraphSnapshot, LinkKind, NodeId};
use layout::flatten_curves;
use session::{MapSession, Phase};
use view::{HoverUpdate, SelectionEvent};
use web::{DriftPatcher, FrameLoop, LayoutEvent, MapState};

/// Initialize the WASM module: console logging and the panic hook.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // A second module instance on the same page already installed a logger.
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Main entry point for the map component.
///
/// All methods take `&self` so host callbacks fired from inside a call can
/// call back into the map.
#[wasm_bindgen]
pub struct MultiverseMapWasm {
    state: Rc<RefCell<MapState>>,
    frames: RefCell<Option<FrameLoop>>,
    running: Cell<bool>,
}

#[wasm_bindgen]
impl MultiverseMapWasm {
    /// Create a map for a container of the given size, with default tuning.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32) -> Result<MultiverseMapWasm, JsValue> {
        Ok(Self::build(width, height, MapConfig::default())?)
    }

    /// Create a map with a partial config object; omitted fields keep their
    /// defaults.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(width: f32, height: f32, config: JsValue) -> Result<MultiverseMapWasm, JsValue> {
        let config = MapConfig::from_js(config)?;
        Ok(Self::build(width, height, config)?)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Replace the graph snapshot `{ nodes, edges, embassyEdges }`.
    ///
    /// Positions are re-initialized and the simulation restarts from
    /// iteration 0. Frames still pending for the previous snapshot are
    /// discarded.
    #[wasm_bindgen(js_name = setSnapshot)]
    pub fn set_snapshot(&self, snapshot: JsValue) -> Result<(), JsValue> {
        let snapshot = GraphSnapshot::from_js(snapshot)?;
        let token = {
            let mut state = self.state.borrow_mut();
            if let Some(patcher) = state.patcher.as_mut() {
                patcher.clear();
            }
            state.session.replace_snapshot(snapshot)
        };
        if self.running.get() {
            self.schedule(token)?;
        }
        Ok(())
    }

    /// Start animating with requestAnimationFrame.
    pub fn start(&self) -> Result<(), JsValue> {
        self.running.set(true);
        let token = self.state.borrow().session.token();
        Ok(self.schedule(token)?)
    }

    /// Pause the animation loop. `start` resumes where it stopped.
    pub fn stop(&self) {
        self.running.set(false);
        if let Some(frames) = self.frames.borrow().as_ref() {
            frames.cancel();
        }
    }

    /// Tear down: stop the loop, drop drift and invalidate pending frames.
    pub fn dispose(&self) {
        self.stop();
        let mut state = self.state.borrow_mut();
        if let Some(patcher) = state.patcher.as_mut() {
            patcher.clear();
        }
        state.session.teardown();
    }

    /// Run one frame by hand, for hosts that drive their own loop.
    ///
    /// Returns true while there is more to animate.
    #[wasm_bindgen(js_name = advanceFrame)]
    pub fn advance_frame(&self, now_ms: f64) -> bool {
        let token = self.state.borrow().session.token();
        web::run_frame(&self.state, token, now_ms).is_some()
    }

    /// Settle synchronously, then hand over to drift.
    ///
    /// Returns true if the layout converged (false: iteration cap).
    pub fn settle(&self) -> Result<bool, JsValue> {
        let (outcome, on_layout, token) = {
            let mut state = self.state.borrow_mut();
            let outcome = state.session.settle_now();
            (outcome, state.callbacks.on_layout.clone(), state.session.token())
        };
        let Some(layout::TickOutcome::Settled {
            reason,
            iterations,
            energy,
        }) = outcome
        else {
            return Ok(false);
        };
        web::deliver(
            on_layout.as_ref(),
            &LayoutEvent {
                iteration: iterations,
                energy,
                settled: Some(reason),
            },
        );
        if self.running.get() {
            self.schedule(token)?;
        }
        Ok(reason == layout::SettleReason::Converged)
    }

    /// Patch drift straight onto elements tagged `data-world-id` /
    /// `data-edge-id`. Idle decorative motion only.
    #[wasm_bindgen(js_name = enableDriftPatch)]
    pub fn enable_drift_patch(&self, enabled: bool) -> Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        if enabled {
            if state.patcher.is_none() {
                state.patcher = Some(DriftPatcher::new()?);
            }
        } else if let Some(mut patcher) = state.patcher.take() {
            patcher.clear();
        }
        Ok(())
    }

    // =========================================================================
    // Host Callbacks
    // =========================================================================

    /// `callback({ iteration, energy, settled })` after every committed layout frame.
    #[wasm_bindgen(js_name = onLayout)]
    pub fn on_layout(&self, callback: Option<Function>) {
        self.state.borrow_mut().callbacks.on_layout = callback;
    }

    /// `callback({ type, node | edge })` when a world or relationship is clicked.
    #[wasm_bindgen(js_name = onSelect)]
    pub fn on_select(&self, callback: Option<Function>) {
        self.state.borrow_mut().callbacks.on_select = callback;
    }

    /// `callback(target | undefined)` when the tooltip target changes.
    #[wasm_bindgen(js_name = onHover)]
    pub fn on_hover(&self, callback: Option<Function>) {
        self.state.borrow_mut().callbacks.on_hover = callback;
    }

    // =========================================================================
    // Layout State
    // =========================================================================

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.state.borrow().session.graph().node_count() as u32
    }

    #[wasm_bindgen(js_name = linkCount)]
    pub fn link_count(&self) -> u32 {
        self.state.borrow().session.graph().link_count() as u32
    }

    /// Edges dropped from the last snapshot (dangling endpoints, self-loops).
    #[wasm_bindgen(js_name = skippedLinks)]
    pub fn skipped_links(&self) -> u32 {
        self.state.borrow().session.graph().skipped_links() as u32
    }

    /// World id stored at a position slot.
    #[wasm_bindgen(js_name = worldId)]
    pub fn world_id(&self, slot: u32) -> Option<String> {
        self.state
            .borrow()
            .session
            .graph()
            .world(NodeId(slot))
            .map(|w| w.id.clone())
    }

    /// Position slot of a world id.
    #[wasm_bindgen(js_name = slotOf)]
    pub fn slot_of(&self, world_id: &str) -> Option<u32> {
        self.state.borrow().session.graph().slot_of(world_id).map(|id| id.0)
    }

    /// `"idle"`, `"settling"` or `"drifting"`.
    pub fn phase(&self) -> String {
        match self.state.borrow().session.phase() {
            Phase::Idle => "idle",
            Phase::Settling => "settling",
            Phase::Drifting => "drifting",
        }
        .to_string()
    }

    #[wasm_bindgen(js_name = isSettled)]
    pub fn is_settled(&self) -> bool {
        self.state.borrow().session.layout_run().settled().is_some()
    }

    pub fn iteration(&self) -> u32 {
        self.state.borrow().session.layout_run().iteration()
    }

    pub fn energy(&self) -> f32 {
        self.state.borrow().session.layout_run().energy()
    }

    // =========================================================================
    // Geometry Buffers
    // =========================================================================

    /// Displayed positions `[x0, y0, x1, y1, ...]`, drift included.
    pub fn positions(&self) -> Float32Array {
        Float32Array::from(self.state.borrow().session.displayed_positions().as_slice())
    }

    /// Positions as committed by the layout, without drift.
    #[wasm_bindgen(js_name = committedPositions)]
    pub fn committed_positions(&self) -> Float32Array {
        Float32Array::from(self.state.borrow().session.graph().interleaved_positions().as_slice())
    }

    /// Edge curves as `[x0, y0, cx, cy, x1, y1]` per edge, in edge id order.
    #[wasm_bindgen(js_name = edgeCurves)]
    pub fn edge_curves(&self) -> Float32Array {
        Float32Array::from(flatten_curves(self.state.borrow().session.curves()).as_slice())
    }

    /// Per edge: 0 for a bleed edge, 1 for an embassy edge.
    #[wasm_bindgen(js_name = edgeKinds)]
    pub fn edge_kinds(&self) -> Vec<u8> {
        self.state
            .borrow()
            .session
            .curves()
            .iter()
            .map(|curve| match curve.kind {
                LinkKind::Bleed(_) => 0,
                LinkKind::Embassy(_) => 1,
            })
            .collect()
    }

    /// Backdrop stars as `[x, y, radius, opacity]` per star, in screen space.
    pub fn stars(&self) -> Float32Array {
        let state = self.state.borrow();
        let stars: Vec<f32> = state
            .session
            .viewport()
            .backdrop()
            .backdrop()
            .map(|b| {
                b.stars
                    .iter()
                    .flat_map(|s| [s.x, s.y, s.radius, s.opacity])
                    .collect()
            })
            .unwrap_or_default();
        Float32Array::from(stars.as_slice())
    }

    /// Slots of the worlds inside the visible area.
    #[wasm_bindgen(js_name = visibleNodes)]
    pub fn visible_nodes(&self) -> Vec<u32> {
        self.state
            .borrow()
            .session
            .visible_nodes()
            .into_iter()
            .map(u32::from)
            .collect()
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    /// Apply a drag delta in screen pixels.
    pub fn pan(&self, dx: f32, dy: f32) {
        self.state.borrow_mut().session.viewport_mut().pan_by(dx, dy);
    }

    /// One wheel event. Returns the new zoom.
    pub fn wheel(&self, delta_y: f32) -> f32 {
        self.state.borrow_mut().session.viewport_mut().wheel(delta_y)
    }

    /// Wheel event anchored at the cursor. Returns the new zoom.
    #[wasm_bindgen(js_name = zoomAt)]
    pub fn zoom_at(&self, delta_y: f32, screen_x: f32, screen_y: f32) -> f32 {
        self.state
            .borrow_mut()
            .session
            .viewport_mut()
            .zoom_at(delta_y, screen_x, screen_y)
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&self) -> f32 {
        self.state.borrow_mut().session.viewport_mut().zoom_in()
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&self) -> f32 {
        self.state.borrow_mut().session.viewport_mut().zoom_out()
    }

    /// Container was measured again. Returns true if the backdrop changed.
    pub fn resize(&self, width: f32, height: f32) -> Result<bool, JsValue> {
        Ok(self.state.borrow_mut().session.resize(width, height)?)
    }

    /// Center the layout in the viewport, leaving `padding` model units.
    #[wasm_bindgen(js_name = fitView)]
    pub fn fit_view(&self, padding: f32) {
        self.state.borrow_mut().session.fit_view(padding);
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&self) {
        self.state.borrow_mut().session.viewport_mut().reset();
    }

    #[wasm_bindgen(js_name = getZoom)]
    pub fn get_zoom(&self) -> f32 {
        self.state.borrow().session.viewport().zoom()
    }

    #[wasm_bindgen(js_name = getPanX)]
    pub fn get_pan_x(&self) -> f32 {
        self.state.borrow().session.viewport().pan().0
    }

    #[wasm_bindgen(js_name = getPanY)]
    pub fn get_pan_y(&self) -> f32 {
        self.state.borrow().session.viewport().pan().1
    }

    /// `[x, y]` in model space.
    #[wasm_bindgen(js_name = screenToModel)]
    pub fn screen_to_model(&self, screen_x: f32, screen_y: f32) -> Vec<f32> {
        let (x, y) = self.state.borrow().session.viewport().screen_to_model(screen_x, screen_y);
        vec![x, y]
    }

    /// `[x, y]` in screen space.
    #[wasm_bindgen(js_name = modelToScreen)]
    pub fn model_to_screen(&self, model_x: f32, model_y: f32) -> Vec<f32> {
        let (x, y) = self.state.borrow().session.viewport().model_to_screen(model_x, model_y);
        vec![x, y]
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Pointer moved over the map. Fires `onHover` if the target changed.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, screen_x: f32, screen_y: f32) -> bool {
        let update = self.state.borrow_mut().session.pointer_move(screen_x, screen_y);
        self.report_hover(update)
    }

    /// Pointer left the map. Fires `onHover` with `undefined` if something was hovered.
    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&self) -> bool {
        let update = self.state.borrow_mut().session.pointer_leave();
        self.report_hover(update)
    }

    /// Click at a screen position. Fires `onSelect` and returns true if
    /// something was hit.
    pub fn click(&self, screen_x: f32, screen_y: f32) -> bool {
        let (event, on_select) = {
            let state = self.state.borrow();
            (
                state.session.click(screen_x, screen_y),
                state.callbacks.on_select.clone(),
            )
        };
        match event {
            Some(event) => {
                web::deliver(on_select.as_ref(), &event);
                true
            }
            None => false,
        }
    }
}

impl MultiverseMapWasm {
    fn build(width: f32, height: f32, config: MapConfig) -> Result<Self, MapError> {
        let session = MapSession::new(width, height, config)?;
        Ok(Self {
            state: Rc::new(RefCell::new(MapState::new(session))),
            frames: RefCell::new(None),
            running: Cell::new(false),
        })
    }

    /// Make sure a frame is pending for `token`, creating the loop on first use.
    fn schedule(&self, token: session::FrameToken) -> Result<(), MapError> {
        let mut frames = self.frames.borrow_mut();
        if frames.is_none() {
            let state = Rc::clone(&self.state);
            *frames = Some(FrameLoop::new(move |scheduled, now| {
                web::run_frame(&state, scheduled, now)
            })?);
        }
        match frames.as_ref() {
            Some(frames) => frames.schedule(token),
            None => Ok(()),
        }
    }

    fn report_hover(&self, update: HoverUpdate) -> bool {
        let HoverUpdate::Changed(target) = update else {
            return false;
        };
        let (payload, on_hover) = {
            let state = self.state.borrow();
            (
                target.and_then(|t| SelectionEvent::for_target(state.session.graph(), t)),
                state.callbacks.on_hover.clone(),
            )
        };
        web::deliver(on_hover.as_ref(), &payload);
        true
    }
}
