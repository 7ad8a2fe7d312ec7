//! Force-directed layout for the multiverse map.
//!
//! One tick of the simulation applies:
//! - Repulsion between every node pair, `repulsion / max(d, min_distance)²`
//! - Spring attraction along links, shorter and stiffer for stronger links
//! - A weak pull toward the viewport center
//!
//! Forces are accumulated from a single read of the previous positions and
//! then integrated for all nodes at once, so processing order never biases
//! the result. Velocities are damped every tick and positions are clamped to
//! a margin inside the viewport.
//!
//! The caller drives the loop through [`LayoutRun`], which stops once the
//! energy (Σ|v|²) falls below a threshold or an iteration cap is hit.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::graph::WorldGraph;

/// Golden angle in radians, used for spiral placement and tie-breaking.
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// Squared distance below which two nodes count as coincident.
const COINCIDENT_EPSILON_SQ: f32 = 1e-6;

/// Tunable force constants and loop bounds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForceConfig {
    /// Repulsion coefficient between every node pair.
    pub repulsion: f32,
    /// Base spring stiffness, scaled by link strength.
    pub spring: f32,
    /// Rest length of a strength-1 link.
    pub rest_length_min: f32,
    /// Rest length of a strength-0 link.
    pub rest_length_max: f32,
    /// Pull toward the viewport center.
    pub centering: f32,
    /// Velocity retained each tick (0.0 - 1.0).
    pub damping: f32,
    /// Distance floor applied before any inverse-distance law.
    pub min_distance: f32,
    pub max_velocity: f32,
    /// Inset from the viewport edges that positions are clamped to.
    pub margin: f32,
    /// Maximum initial jitter in either axis.
    pub jitter: f32,
    /// Seed for the initial jitter.
    pub seed: u64,
    /// Fixed strength of embassy links; `None` makes them visual only.
    pub embassy_strength: Option<f32>,
    /// Energy below which the layout counts as settled.
    pub energy_threshold: f32,
    pub max_iterations: u32,
    /// Simulation ticks run per animation frame.
    pub ticks_per_frame: u32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            repulsion: 2000.0,
            spring: 0.05,
            rest_length_min: 80.0,
            rest_length_max: 200.0,
            centering: 0.005,
            damping: 0.85,
            min_distance: 1.0,
            max_velocity: 40.0,
            margin: 40.0,
            jitter: 8.0,
            seed: 0x5eed,
            embassy_strength: Some(0.25),
            energy_threshold: 0.05,
            max_iterations: 300,
            ticks_per_frame: 1,
        }
    }
}

impl ForceConfig {
    /// Rest length of a link with the given (clamped) strength.
    #[inline]
    pub fn rest_length(&self, strength: f32) -> f32 {
        self.rest_length_max - strength * (self.rest_length_max - self.rest_length_min)
    }

    /// Spring stiffness of a link with the given (clamped) strength.
    #[inline]
    pub fn stiffness(&self, strength: f32) -> f32 {
        self.spring * (0.2 + 0.8 * strength)
    }

    /// Magnitude of the repulsion between two nodes `distance` apart.
    #[inline]
    pub fn repulsion_force(&self, distance: f32) -> f32 {
        let d = distance.max(self.min_distance);
        self.repulsion / (d * d)
    }

    /// Check invariants the integrator relies on.
    pub fn validate(&self) -> Result<(), String> {
        let finite = [
            self.repulsion,
            self.spring,
            self.rest_length_min,
            self.rest_length_max,
            self.centering,
            self.damping,
            self.min_distance,
            self.max_velocity,
            self.margin,
            self.jitter,
            self.energy_threshold,
        ];
        if finite.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err("force constants must be finite and non-negative".into());
        }
        if self.damping >= 1.0 {
            return Err(format!("damping must be below 1.0, got {}", self.damping));
        }
        if self.min_distance <= 0.0 {
            return Err("min_distance must be positive".into());
        }
        if self.rest_length_min > self.rest_length_max {
            return Err("rest_length_min must not exceed rest_length_max".into());
        }
        if self.jitter > self.rest_length_max {
            return Err(format!(
                "jitter {} exceeds the layout scale (rest_length_max {})",
                self.jitter, self.rest_length_max
            ));
        }
        if self.ticks_per_frame == 0 {
            return Err("ticks_per_frame must be at least 1".into());
        }
        Ok(())
    }
}

/// Lower and upper clamp for one axis of the viewport.
#[inline]
fn axis_bounds(extent: f32, margin: f32) -> (f32, f32) {
    if extent >= 2.0 * margin {
        (margin, extent - margin)
    } else {
        (extent * 0.5, extent * 0.5)
    }
}

/// Deterministic separation direction for a coincident pair.
#[inline]
fn pair_direction(i: usize, j: usize) -> (f32, f32) {
    let angle = GOLDEN_ANGLE * (i * 31 + j + 1) as f32;
    (angle.cos(), angle.sin())
}

/// Outer radius of the initial spiral.
#[inline]
fn spiral_radius(width: f32, height: f32, margin: f32) -> f32 {
    let short = width.min(height);
    if short > 2.0 * margin {
        short * 0.5 - margin
    } else if short > 0.0 {
        short * 0.45
    } else {
        width.max(height) * 0.45
    }
}

/// Place every node on a golden-angle spiral around the viewport center.
///
/// The spiral radius is bounded by the smaller half-dimension minus the
/// margin, so nodes start well inside the viewport. A viewport narrower
/// than two margins still gets a positive radius, so every slot lands on a
/// distinct ring even without jitter. A seeded jitter breaks the symmetry;
/// results are clamped to [0, width] × [0, height]. Velocities are reset.
pub fn initialize_positions(graph: &mut WorldGraph, width: f32, height: f32, config: &ForceConfig) {
    let n = graph.node_count();
    if n == 0 {
        return;
    }

    let (cx, cy) = (width * 0.5, height * 0.5);
    let max_radius = spiral_radius(width, height, config.margin);
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let jitter = config.jitter;

    let buffers = graph.buffers_mut();
    for i in 0..n {
        let radius = max_radius * ((i as f32 + 0.5) / n as f32).sqrt();
        let angle = i as f32 * GOLDEN_ANGLE;
        let (jx, jy) = if jitter > 0.0 {
            (rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter))
        } else {
            (0.0, 0.0)
        };

        buffers.pos_x[i] = (cx + radius * angle.cos() + jx).clamp(0.0, width);
        buffers.pos_y[i] = (cy + radius * angle.sin() + jy).clamp(0.0, height);
        buffers.vel_x[i] = 0.0;
        buffers.vel_y[i] = 0.0;
    }
}

/// Advance the simulation by one tick and return the energy.
///
/// An empty graph is a no-op returning 0.0. Links with a missing endpoint
/// were dropped when the graph was resolved and never reach this point.
pub fn simulate_tick(graph: &mut WorldGraph, width: f32, height: f32, config: &ForceConfig) -> f32 {
    let n = graph.node_count();
    if n == 0 {
        return 0.0;
    }

    let mut force_x = vec![0.0_f32; n];
    let mut force_y = vec![0.0_f32; n];

    {
        let pos_x = graph.positions_x();
        let pos_y = graph.positions_y();

        // Repulsion, O(n²)
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = pos_x[j] - pos_x[i];
                let dy = pos_y[j] - pos_y[i];
                let dist_sq = dx * dx + dy * dy;

                let (ux, uy, dist) = if dist_sq > COINCIDENT_EPSILON_SQ {
                    let dist = dist_sq.sqrt();
                    (dx / dist, dy / dist, dist)
                } else {
                    let (ux, uy) = pair_direction(i, j);
                    (ux, uy, 0.0)
                };

                let f = config.repulsion_force(dist);
                force_x[i] -= ux * f;
                force_y[i] -= uy * f;
                force_x[j] += ux * f;
                force_y[j] += uy * f;
            }
        }

        // Springs
        for (source, target, link) in graph.links() {
            let Some(strength) = link.strength else {
                continue;
            };
            let (a, b) = (source.index(), target.index());
            let dx = pos_x[b] - pos_x[a];
            let dy = pos_y[b] - pos_y[a];
            let dist_sq = dx * dx + dy * dy;
            if dist_sq <= COINCIDENT_EPSILON_SQ {
                // No direction to pull along; repulsion separates them first.
                continue;
            }
            let dist = dist_sq.sqrt();
            let f = config.stiffness(strength) * (dist - config.rest_length(strength));
            let (fx, fy) = (dx / dist * f, dy / dist * f);
            force_x[a] += fx;
            force_y[a] += fy;
            force_x[b] -= fx;
            force_y[b] -= fy;
        }

        // Centering
        let (cx, cy) = (width * 0.5, height * 0.5);
        for i in 0..n {
            force_x[i] += (cx - pos_x[i]) * config.centering;
            force_y[i] += (cy - pos_y[i]) * config.centering;
        }
    }

    // Commit
    let (min_x, max_x) = axis_bounds(width, config.margin);
    let (min_y, max_y) = axis_bounds(height, config.margin);
    let buffers = graph.buffers_mut();
    let mut energy = 0.0_f32;

    for i in 0..n {
        let mut vx = (buffers.vel_x[i] + force_x[i]) * config.damping;
        let mut vy = (buffers.vel_y[i] + force_y[i]) * config.damping;

        let speed_sq = vx * vx + vy * vy;
        if speed_sq > config.max_velocity * config.max_velocity {
            let scale = config.max_velocity / speed_sq.sqrt();
            vx *= scale;
            vy *= scale;
        }

        let mut x = buffers.pos_x[i] + vx;
        let mut y = buffers.pos_y[i] + vy;

        if !x.is_finite() || !y.is_finite() {
            x = width * 0.5;
            y = height * 0.5;
            vx = 0.0;
            vy = 0.0;
        }
        if x < min_x || x > max_x {
            x = x.clamp(min_x, max_x);
            vx = 0.0;
        }
        if y < min_y || y > max_y {
            y = y.clamp(min_y, max_y);
            vy = 0.0;
        }

        buffers.pos_x[i] = x;
        buffers.pos_y[i] = y;
        buffers.vel_x[i] = vx;
        buffers.vel_y[i] = vy;
        energy += vx * vx + vy * vy;
    }

    energy
}

/// Why a layout run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SettleReason {
    /// Energy fell below the threshold.
    Converged,
    /// The iteration cap was reached first.
    IterationCap,
}

/// Result of advancing a [`LayoutRun`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Running {
        iteration: u32,
        energy: f32,
    },
    Settled {
        reason: SettleReason,
        iterations: u32,
        energy: f32,
    },
}

impl TickOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, TickOutcome::Settled { .. })
    }
}

/// Termination policy for one snapshot's simulation.
#[derive(Debug, Clone, Default)]
pub struct LayoutRun {
    iteration: u32,
    energy: f32,
    settled: Option<SettleReason>,
}

impl LayoutRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks run so far.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Energy reported by the most recent tick.
    pub fn energy(&self) -> f32 {
        self.energy
    }

    pub fn settled(&self) -> Option<SettleReason> {
        self.settled
    }

    /// Run one tick unless the run has already settled.
    pub fn step(
        &mut self,
        graph: &mut WorldGraph,
        width: f32,
        height: f32,
        config: &ForceConfig,
    ) -> TickOutcome {
        if self.settled.is_none() {
            if graph.is_empty() {
                self.settled = Some(SettleReason::Converged);
            } else {
                self.energy = simulate_tick(graph, width, height, config);
                self.iteration += 1;

                if self.energy < config.energy_threshold {
                    self.settled = Some(SettleReason::Converged);
                } else if self.iteration >= config.max_iterations {
                    self.settled = Some(SettleReason::IterationCap);
                }
            }
        }

        match self.settled {
            Some(reason) => TickOutcome::Settled {
                reason,
                iterations: self.iteration,
                energy: self.energy,
            },
            None => TickOutcome::Running {
                iteration: self.iteration,
                energy: self.energy,
            },
        }
    }

    /// Tick synchronously until the run settles.
    pub fn run_to_completion(
        &mut self,
        graph: &mut WorldGraph,
        width: f32,
        height: f32,
        config: &ForceConfig,
    ) -> TickOutcome {
        loop {
            let outcome = self.step(graph, width, height, config);
            if outcome.is_settled() {
                return outcome;
            }
        }
    }
}
