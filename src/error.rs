//! Errors raised at the module boundary.
//!
//! The layout code itself never fails; malformed input is rejected here
//! before it reaches the engine.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Boundary error for the map module.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    #[error("viewport dimensions must be finite and non-negative, got {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },

    #[error("invalid graph snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("invalid map configuration: {0}")]
    InvalidConfig(String),

    #[error("no global window available")]
    NoWindow,

    #[error("animation frame scheduling failed: {0}")]
    Scheduler(String),
}

impl MapError {
    /// Build a scheduler error from a thrown JS value.
    pub(crate) fn scheduler(value: JsValue) -> Self {
        MapError::Scheduler(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<MapError> for JsValue {
    fn from(err: MapError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

/// Check that viewport dimensions can be handed to the engine.
pub fn validate_dimensions(width: f32, height: f32) -> Result<(), MapError> {
    if width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0 {
        Ok(())
    } else {
        Err(MapError::InvalidDimensions { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dimensions() {
        assert!(validate_dimensions(800.0, 600.0).is_ok());
        assert!(validate_dimensions(0.0, 0.0).is_ok());
        assert_eq!(
            validate_dimensions(-1.0, 600.0),
            Err(MapError::InvalidDimensions {
                width: -1.0,
                height: 600.0
            })
        );
        assert!(validate_dimensions(f32::NAN, 10.0).is_err());
        assert!(validate_dimensions(10.0, f32::INFINITY).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = MapError::InvalidSnapshot("missing field `id`".into());
        assert_eq!(err.to_string(), "invalid graph snapshot: missing field `id`");
    }
}
