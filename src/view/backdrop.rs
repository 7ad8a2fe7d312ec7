//! Decorative starfield behind the map.
//!
//! Stars are placed in screen space from a fixed seed. The field is
//! generated on the first non-empty resize and then kept stable; it is only
//! regenerated when the container grows past the extent it was generated
//! for, so enlarging the window never exposes an empty band. Shrinking keeps
//! the existing field.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Upper bound on stars in one field, whatever the density and extent.
pub const MAX_STARS: usize = 20_000;

/// One star of the backdrop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub opacity: f32,
}

/// A generated starfield and the extent it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Backdrop {
    pub width: f32,
    pub height: f32,
    pub stars: Vec<Star>,
}

impl Backdrop {
    /// Generate `density` stars per 10 000 square pixels, at most [`MAX_STARS`].
    pub fn generate(width: f32, height: f32, density: f32, seed: u64) -> Self {
        let wanted = (width * height) / 10_000.0 * density;
        let count = if wanted.is_finite() {
            (wanted.round().max(0.0) as usize).min(MAX_STARS)
        } else if wanted > 0.0 {
            MAX_STARS
        } else {
            0
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        let stars = (0..count)
            .map(|_| Star {
                x: rng.r#gen::<f32>() * width,
                y: rng.r#gen::<f32>() * height,
                radius: 0.4 + rng.r#gen::<f32>() * 1.2,
                opacity: 0.3 + rng.r#gen::<f32>() * 0.7,
            })
            .collect();

        Self {
            width,
            height,
            stars,
        }
    }

    /// Whether the field fully covers a container of the given size.
    pub fn covers(&self, width: f32, height: f32) -> bool {
        width <= self.width && height <= self.height
    }
}

/// Owns the backdrop for the lifetime of one map component.
#[derive(Debug, Clone)]
pub struct BackdropState {
    density: f32,
    seed: u64,
    backdrop: Option<Backdrop>,
    generations: u32,
}

impl BackdropState {
    pub fn new(density: f32, seed: u64) -> Self {
        Self {
            density,
            seed,
            backdrop: None,
            generations: 0,
        }
    }

    /// React to a container resize. Returns true when the field was
    /// (re)generated.
    pub fn on_resize(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        if let Some(backdrop) = &self.backdrop {
            if backdrop.covers(width, height) {
                return false;
            }
        }

        // Grow to cover both the old and the new extent.
        let (w, h) = match &self.backdrop {
            Some(old) => (old.width.max(width), old.height.max(height)),
            None => (width, height),
        };
        self.backdrop = Some(Backdrop::generate(w, h, self.density, self.seed));
        self.generations += 1;
        log::debug!("starfield generated for {w}x{h}");
        true
    }

    pub fn backdrop(&self) -> Option<&Backdrop> {
        self.backdrop.as_ref()
    }

    /// How many times the field has been generated.
    pub fn generations(&self) -> u32 {
        self.generations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_seeded_and_bounded() {
        let a = Backdrop::generate(800.0, 600.0, 1.5, 42);
        let b = Backdrop::generate(800.0, 600.0, 1.5, 42);
        assert_eq!(a, b);
        assert_eq!(a.stars.len(), 72);
        for star in &a.stars {
            assert!((0.0..=800.0).contains(&star.x));
            assert!((0.0..=600.0).contains(&star.y));
            assert!(star.opacity <= 1.0);
        }
    }

    #[test]
    fn test_star_count_is_capped() {
        assert_eq!(Backdrop::generate(800.0, 600.0, 1e6, 1).stars.len(), MAX_STARS);
        assert_eq!(Backdrop::generate(800.0, 600.0, f32::INFINITY, 1).stars.len(), MAX_STARS);
        assert!(Backdrop::generate(800.0, 600.0, f32::NAN, 1).stars.is_empty());
    }

    #[test]
    fn test_generated_once_for_stable_sizes() {
        let mut state = BackdropState::new(1.0, 7);
        assert!(!state.on_resize(0.0, 0.0));
        assert!(state.on_resize(800.0, 600.0));
        assert!(!state.on_resize(800.0, 600.0));
        assert!(!state.on_resize(640.0, 480.0));
        assert_eq!(state.generations(), 1);
        assert_eq!(state.backdrop().unwrap().width, 800.0);
    }

    #[test]
    fn test_regenerated_when_container_grows() {
        let mut state = BackdropState::new(1.0, 7);
        state.on_resize(800.0, 600.0);
        assert!(state.on_resize(1600.0, 500.0));
        let backdrop = state.backdrop().unwrap();
        assert_eq!((backdrop.width, backdrop.height), (1600.0, 600.0));
        assert_eq!(state.generations(), 2);
    }
}
