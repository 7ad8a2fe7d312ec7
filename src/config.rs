//! Map configuration.
//!
//! Every section deserializes with defaults, so the host only passes the
//! values it wants to override:
//!
//! ```js
//! map.withConfig({ layout: { maxIterations: 500 }, viewport: { maxZoom: 4 } });
//! ```

use serde::Deserialize;
use wasm_bindgen::JsValue;

use crate::error::MapError;
use crate::layout::{DriftConfig, ForceConfig};
use crate::view::{InteractionConfig, ViewportConfig};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapConfig {
    pub layout: ForceConfig,
    pub drift: DriftConfig,
    pub viewport: ViewportConfig,
    pub interaction: InteractionConfig,
}

impl MapConfig {
    /// Decode a config object passed from JavaScript and validate it.
    pub fn from_js(value: JsValue) -> Result<Self, MapError> {
        let config: MapConfig =
            serde_wasm_bindgen::from_value(value).map_err(|e| MapError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MapError> {
        self.layout.validate().map_err(MapError::InvalidConfig)?;
        self.drift.validate().map_err(MapError::InvalidConfig)?;
        self.viewport.validate().map_err(MapError::InvalidConfig)?;
        if !self.interaction.node_radius.is_finite() || self.interaction.node_radius < 0.0 {
            return Err(MapError::InvalidConfig("node_radius must be finite and non-negative".into()));
        }
        Ok(())
    }
}
