use serde::{Deserialize, Serialize};

use crate::Rgb;

/// Permitted scroll speed range in world units per second.
pub const SCROLL_SPEED_RANGE: (f32, f32) = (150.0, 500.0);
/// Permitted gravity range in world units per second squared.
pub const GRAVITY_RANGE: (f32, f32) = (800.0, 2800.0);
/// Permitted jump impulse range; negative values point up the screen.
pub const JUMP_FORCE_RANGE: (f32, f32) = (-1400.0, -600.0);
/// Permitted spawn interval range in milliseconds.
pub const SPAWN_INTERVAL_RANGE: (f32, f32) = (500.0, 2000.0);

/// Continuous gameplay tuning derived from a track.
///
/// `jump_force` follows screen-space convention: it is negative and its
/// magnitude is the launch speed of a jump.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameplayParameters {
    /// Horizontal scroll speed in world units per second.
    pub scroll_speed: f32,
    /// Downward acceleration in world units per second squared.
    pub gravity: f32,
    /// Jump impulse in world units per second.
    pub jump_force: f32,
    /// Likelihood of spikes in mixed patterns.
    pub spike_chance: f32,
    /// Likelihood of blocks in mixed patterns.
    pub block_chance: f32,
    /// Likelihood that a mixed spawn attempt leaves a gap.
    pub gap_chance: f32,
    /// Likelihood of doubling a spike cluster.
    pub double_chance: f32,
    /// Base time between spawn attempts in milliseconds.
    pub spawn_interval_ms: f32,
    /// Fill color of lethal obstacles.
    pub obstacle_color: Rgb,
    /// Glow color of lethal obstacles.
    pub obstacle_glow: Rgb,
}

impl GameplayParameters {
    /// Horizontal distance covered during one full jump parabola.
    #[must_use]
    pub fn jump_arc_distance(&self) -> f32 {
        if self.gravity <= 0.0 {
            return 0.0;
        }
        self.scroll_speed * (2.0 * self.jump_force.abs() / self.gravity)
    }

    /// Reports whether every field lies within its documented bounds.
    #[must_use]
    pub fn is_within_bounds(&self) -> bool {
        let within = |value: f32, (low, high): (f32, f32)| value >= low && value <= high;
        let unit = |value: f32| (0.0..=1.0).contains(&value);

        within(self.scroll_speed, SCROLL_SPEED_RANGE)
            && within(self.gravity, GRAVITY_RANGE)
            && within(self.jump_force, JUMP_FORCE_RANGE)
            && within(self.spawn_interval_ms, SPAWN_INTERVAL_RANGE)
            && unit(self.spike_chance)
            && unit(self.block_chance)
            && unit(self.gap_chance)
            && unit(self.double_chance)
    }
}
