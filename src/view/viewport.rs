//! Pan/zoom state and screen↔model transforms.
//!
//! The transform is `screen = (model + pan) × zoom`. Dragging converts a
//! screen delta into model units by dividing by the zoom; wheel events
//! multiply the zoom by a fixed step and clamp it to the configured range.

use serde::Deserialize;

use super::backdrop::BackdropState;

/// Zoom bounds, zoom step and backdrop settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Factor applied per wheel event (> 1).
    pub zoom_step: f32,
    /// Stars per 10 000 square pixels.
    pub star_density: f32,
    pub star_seed: u64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 1.1,
            star_density: 1.2,
            star_seed: 0x57a2,
        }
    }
}

impl ViewportConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite()) || self.min_zoom <= 0.0 {
            return Err("zoom bounds must be finite and positive".into());
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            ));
        }
        if !self.zoom_step.is_finite() || self.zoom_step <= 1.0 {
            return Err("zoom_step must be greater than 1".into());
        }
        if !self.star_density.is_finite() || self.star_density < 0.0 {
            return Err("star_density must be finite and non-negative".into());
        }
        Ok(())
    }
}

/// Viewport of the map component.
#[derive(Debug, Clone)]
pub struct Viewport {
    config: ViewportConfig,
    width: f32,
    height: f32,
    pan_x: f32,
    pan_y: f32,
    zoom: f32,
    backdrop: BackdropState,
}

impl Viewport {
    pub fn new(width: f32, height: f32, config: ViewportConfig) -> Self {
        let mut backdrop = BackdropState::new(config.star_density, config.star_seed);
        backdrop.on_resize(width, height);
        let zoom = 1.0_f32.clamp(config.min_zoom, config.max_zoom);
        Self {
            config,
            width,
            height,
            pan_x: 0.0,
            pan_y: 0.0,
            zoom,
            backdrop,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> (f32, f32) {
        (self.pan_x, self.pan_y)
    }

    pub fn backdrop(&self) -> &BackdropState {
        &self.backdrop
    }

    /// Apply a drag gesture given in screen pixels.
    pub fn pan_by(&mut self, screen_dx: f32, screen_dy: f32) {
        self.pan_x += screen_dx / self.zoom;
        self.pan_y += screen_dy / self.zoom;
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.config.min_zoom, self.config.max_zoom)
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.zoom = self.clamp_zoom(self.zoom * self.config.zoom_step);
        self.zoom
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.zoom = self.clamp_zoom(self.zoom / self.config.zoom_step);
        self.zoom
    }

    /// One wheel event: negative `delta_y` zooms in, positive zooms out.
    pub fn wheel(&mut self, delta_y: f32) -> f32 {
        if delta_y < 0.0 {
            self.zoom_in()
        } else if delta_y > 0.0 {
            self.zoom_out()
        } else {
            self.zoom
        }
    }

    /// Wheel event that keeps the model point under the cursor fixed.
    pub fn zoom_at(&mut self, delta_y: f32, screen_x: f32, screen_y: f32) -> f32 {
        let (mx, my) = self.screen_to_model(screen_x, screen_y);
        self.wheel(delta_y);
        self.pan_x = screen_x / self.zoom - mx;
        self.pan_y = screen_y / self.zoom - my;
        self.zoom
    }

    /// Update dimensions after the container was measured again.
    ///
    /// Returns true if the starfield was regenerated.
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        self.width = width;
        self.height = height;
        self.backdrop.on_resize(width, height)
    }

    pub fn screen_to_model(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (screen_x / self.zoom - self.pan_x, screen_y / self.zoom - self.pan_y)
    }

    pub fn model_to_screen(&self, model_x: f32, model_y: f32) -> (f32, f32) {
        ((model_x + self.pan_x) * self.zoom, (model_y + self.pan_y) * self.zoom)
    }

    /// Visible model rectangle as (min_x, min_y, max_x, max_y).
    pub fn visible_rect(&self) -> (f32, f32, f32, f32) {
        let (min_x, min_y) = self.screen_to_model(0.0, 0.0);
        let (max_x, max_y) = self.screen_to_model(self.width, self.height);
        (min_x, min_y, max_x, max_y)
    }

    /// Center a model bounding box, zooming as far as the bounds allow.
    pub fn fit_to(&mut self, bounds: (f32, f32, f32, f32), padding: f32) {
        let (min_x, min_y, max_x, max_y) = bounds;
        let bw = (max_x - min_x).max(0.0) + 2.0 * padding;
        let bh = (max_y - min_y).max(0.0) + 2.0 * padding;
        if bw > 0.0 && bh > 0.0 && self.width > 0.0 && self.height > 0.0 {
            self.zoom = self.clamp_zoom((self.width / bw).min(self.height / bh));
        }

        let (cx, cy) = ((min_x + max_x) * 0.5, (min_y + max_y) * 0.5);
        self.pan_x = self.width / (2.0 * self.zoom) - cx;
        self.pan_y = self.height / (2.0 * self.zoom) - cy;
    }

    /// Back to identity pan and unit zoom.
    pub fn reset(&mut self) {
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        self.zoom = self.clamp_zoom(1.0);
    }
}
