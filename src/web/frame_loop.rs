//! requestAnimationFrame driver.
//!
//! One closure lives for the lifetime of the loop and is re-registered each
//! frame. The pending request remembers the [`FrameToken`] it was scheduled
//! for, so a frame that fires after the snapshot changed is handed the old
//! token and rejected by the session.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

use crate::error::MapError;
use crate::session::FrameToken;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;
type Pending = Rc<Cell<Option<(i32, FrameToken)>>>;

pub struct FrameLoop {
    window: Window,
    callback: FrameCallback,
    pending: Pending,
}

impl FrameLoop {
    /// Create a loop around `on_frame`.
    ///
    /// The handler receives the token the frame was scheduled for and the
    /// rAF timestamp, and returns the token to schedule next (None stops).
    pub fn new<F>(mut on_frame: F) -> Result<Self, MapError>
    where
        F: FnMut(FrameToken, f64) -> Option<FrameToken> + 'static,
    {
        let window = web_sys::window().ok_or(MapError::NoWindow)?;
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let pending: Pending = Rc::new(Cell::new(None));

        let (window_inner, callback_inner, pending_inner) =
            (window.clone(), Rc::clone(&callback), Rc::clone(&pending));
        *callback.borrow_mut() = Some(Closure::new(move |now: f64| {
            let Some((_, token)) = pending_inner.take() else {
                return;
            };
            let next = on_frame(token, now);
            // A host callback may already have scheduled a newer frame.
            if let (Some(next), None) = (next, pending_inner.get()) {
                if let Err(err) = request(&window_inner, &callback_inner, &pending_inner, next) {
                    log::error!("{err}");
                }
            }
        }));

        Ok(Self {
            window,
            callback,
            pending,
        })
    }

    /// Ensure a frame is pending for `token`, replacing any request made for
    /// an older one.
    pub fn schedule(&self, token: FrameToken) -> Result<(), MapError> {
        match self.pending.get() {
            Some((_, pending)) if pending == token => Ok(()),
            Some(_) => {
                self.cancel();
                request(&self.window, &self.callback, &self.pending, token)
            }
            None => request(&self.window, &self.callback, &self.pending, token),
        }
    }

    /// Cancel the pending request, if any.
    pub fn cancel(&self) {
        if let Some((id, _)) = self.pending.take() {
            if let Err(err) = self.window.cancel_animation_frame(id) {
                log::warn!("{}", MapError::scheduler(err));
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
        // The closure holds clones of `callback`; dropping it breaks the cycle.
        self.callback.borrow_mut().take();
    }
}

fn request(
    window: &Window,
    callback: &FrameCallback,
    pending: &Pending,
    token: FrameToken,
) -> Result<(), MapError> {
    let callback = callback.borrow();
    let Some(cb) = callback.as_ref() else {
        return Ok(());
    };
    let id = window
        .request_animation_frame(cb.as_ref().unchecked_ref())
        .map_err(MapError::scheduler)?;
    pending.set(Some((id, token)));
    Ok(())
}
