#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Maps track audio profiles onto continuous gameplay parameters.
//!
//! Every formula is monotone in the feature driving it and every output is
//! clamped into the bounds published by `pulse_runner_core`, so callers can
//! rely on directional relationships regardless of how extreme the input is.

mod theme;

use std::time::Duration;

use pulse_runner_core::{
    GameplayParameters, Rgb, TrackAudioProfile, GRAVITY_RANGE, JUMP_FORCE_RANGE,
    SCROLL_SPEED_RANGE, SPAWN_INTERVAL_RANGE,
};

pub use theme::visual_theme;

/// Scroll speed applied to a neutral track in world units per second.
pub const DEFAULT_BASE_SPEED: f32 = 300.0;
/// Gravity multiplier applied to a neutral track.
pub const DEFAULT_GRAVITY_SCALE: f32 = 1.0;
/// Length of the parameter blend between consecutive tracks.
pub const DEFAULT_TRANSITION: Duration = Duration::from_secs(2);

const BASE_GRAVITY: f32 = 1800.0;
const TEMPO_RANGE: (f32, f32) = (60.0, 200.0);
const REFERENCE_TEMPO: f32 = 120.0;
const JUMP_HEIGHT_BASE: f32 = 160.0;
const JUMP_HEIGHT_DANCE: f32 = 60.0;

/// Derives clamped gameplay parameters for a track.
///
/// Non-finite or negative inputs collapse to their floor; tempo never drops
/// below 60 BPM so the interval maths cannot divide by zero.
#[must_use]
pub fn to_params(
    track: &TrackAudioProfile,
    base_speed: f32,
    base_gravity_scale: f32,
) -> GameplayParameters {
    let energy = unit(track.energy);
    let valence = unit(track.valence);
    let danceability = unit(track.danceability);
    let acousticness = unit(track.acousticness);
    let tempo = floored(track.tempo, TEMPO_RANGE.0).min(TEMPO_RANGE.1);
    let base_speed = floored(base_speed, 0.0);
    let gravity_scale = floored(base_gravity_scale, 0.0);

    let scroll_speed = base_speed * (0.6 + 0.8 * energy) * (tempo / REFERENCE_TEMPO);
    let gravity =
        BASE_GRAVITY * gravity_scale * (1.2 - 0.5 * acousticness) * (0.9 + 0.2 * energy);
    let gravity = clamp_range(gravity, GRAVITY_RANGE);
    let jump_height = JUMP_HEIGHT_BASE + JUMP_HEIGHT_DANCE * danceability;
    let jump_force = -(2.0 * gravity * jump_height).sqrt();
    let beat_ms = 60_000.0 / tempo;
    let spawn_interval_ms = beat_ms * (4.0 - 3.0 * energy);

    let theme = visual_theme(track);

    GameplayParameters {
        scroll_speed: clamp_range(scroll_speed, SCROLL_SPEED_RANGE),
        gravity,
        jump_force: clamp_range(jump_force, JUMP_FORCE_RANGE),
        spike_chance: unit(0.3 + 0.4 * energy),
        block_chance: unit(0.2 + 0.3 * (1.0 - valence)),
        gap_chance: unit(0.1 + 0.2 * danceability),
        double_chance: unit(0.05 + 0.35 * energy * danceability),
        spawn_interval_ms: clamp_range(spawn_interval_ms, SPAWN_INTERVAL_RANGE),
        obstacle_color: theme.obstacle_color,
        obstacle_glow: theme.obstacle_glow,
    }
}

/// Interpolates two parameter bundles field by field.
///
/// `t` is clamped to `[0, 1]` and the endpoints return the inputs exactly.
/// Colors are blended in linear light.
#[must_use]
pub fn blend(a: &GameplayParameters, b: &GameplayParameters, t: f32) -> GameplayParameters {
    if t.is_nan() || t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }

    GameplayParameters {
        scroll_speed: lerp(a.scroll_speed, b.scroll_speed, t),
        gravity: lerp(a.gravity, b.gravity, t),
        jump_force: lerp(a.jump_force, b.jump_force, t),
        spike_chance: lerp(a.spike_chance, b.spike_chance, t),
        block_chance: lerp(a.block_chance, b.block_chance, t),
        gap_chance: lerp(a.gap_chance, b.gap_chance, t),
        double_chance: lerp(a.double_chance, b.double_chance, t),
        spawn_interval_ms: lerp(a.spawn_interval_ms, b.spawn_interval_ms, t),
        obstacle_color: blend_color(a.obstacle_color, b.obstacle_color, t),
        obstacle_glow: blend_color(a.obstacle_glow, b.obstacle_glow, t),
    }
}

/// Blends two colors in linear light and re-encodes them as sRGB.
#[must_use]
pub fn blend_color(a: Rgb, b: Rgb, t: f32) -> Rgb {
    if t.is_nan() || t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }

    let channel = |from: u8, to: u8| {
        let mixed = lerp(srgb_to_linear(from), srgb_to_linear(to), t);
        linear_to_srgb(mixed)
    };

    Rgb::from_rgb(
        channel(a.red(), b.red()),
        channel(a.green(), b.green()),
        channel(a.blue(), b.blue()),
    )
}

/// Fixed-length blend from one parameter bundle towards another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    from: GameplayParameters,
    to: GameplayParameters,
    elapsed: Duration,
    duration: Duration,
}

impl Transition {
    /// Starts a blend window. A zero duration completes immediately.
    #[must_use]
    pub const fn new(from: GameplayParameters, to: GameplayParameters, duration: Duration) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    /// Advances the window and returns the parameters at the new instant.
    pub fn advance(&mut self, dt: Duration) -> GameplayParameters {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        self.sample()
    }

    /// Completed fraction of the window in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Whether the window has fully elapsed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Parameters at the current instant.
    #[must_use]
    pub fn sample(&self) -> GameplayParameters {
        if self.is_complete() {
            return self.to;
        }
        blend(&self.from, &self.to, self.progress())
    }

    /// Parameters the window converges on.
    #[must_use]
    pub const fn target(&self) -> &GameplayParameters {
        &self.to
    }
}

fn unit(value: f32) -> f32 {
    floored(value, 0.0).min(1.0)
}

fn floored(value: f32, floor: f32) -> f32 {
    if value.is_finite() {
        value.max(floor)
    } else {
        floor
    }
}

fn clamp_range(value: f32, (low, high): (f32, f32)) -> f32 {
    if value.is_nan() {
        return low;
    }
    value.clamp(low, high)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn srgb_to_linear(channel: u8) -> f32 {
    let c = f32::from(channel) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_track() -> TrackAudioProfile {
        TrackAudioProfile::new("x", "Song", "Artist", 180_000).with_features(0.9, 160.0, 0.8, 0.9, 0.1)
    }

    #[test]
    fn high_energy_track_hits_speed_and_interval_clamps() {
        let params = to_params(&scenario_track(), DEFAULT_BASE_SPEED, DEFAULT_GRAVITY_SCALE);
        assert!((params.scroll_speed - 500.0).abs() < 1.0, "{params:?}");
        assert!((params.spawn_interval_ms - 500.0).abs() < 1.0, "{params:?}");
        assert!(params.is_within_bounds());
    }

    #[test]
    fn zero_tempo_is_treated_as_floor() {
        let track = scenario_track().with_features(0.5, 0.0, 0.5, 0.5, 0.5);
        let params = to_params(&track, DEFAULT_BASE_SPEED, DEFAULT_GRAVITY_SCALE);
        assert!(params.is_within_bounds());
        assert_eq!(params.spawn_interval_ms, 2000.0);
    }

    #[test]
    fn extreme_inputs_stay_in_bounds() {
        let extremes = [
            (f32::NAN, f32::INFINITY, -3.0, 9.0, f32::NEG_INFINITY),
            (5.0, 10_000.0, 5.0, 5.0, 5.0),
            (-5.0, -10.0, -5.0, -5.0, -5.0),
        ];
        for (energy, tempo, valence, dance, acoustic) in extremes {
            let track = scenario_track().with_features(energy, tempo, valence, dance, acoustic);
            for (speed, gravity) in [(0.0, 0.0), (1e9, 1e9), (f32::NAN, f32::NAN)] {
                let params = to_params(&track, speed, gravity);
                assert!(params.is_within_bounds(), "{params:?}");
            }
        }
    }

    #[test]
    fn acousticness_lowers_gravity() {
        let dry = scenario_track().with_features(0.5, 120.0, 0.5, 0.5, 0.0);
        let acoustic = scenario_track().with_features(0.5, 120.0, 0.5, 0.5, 1.0);
        let dry = to_params(&dry, DEFAULT_BASE_SPEED, DEFAULT_GRAVITY_SCALE);
        let acoustic = to_params(&acoustic, DEFAULT_BASE_SPEED, DEFAULT_GRAVITY_SCALE);
        assert!(acoustic.gravity < dry.gravity);
    }

    #[test]
    fn colors_blend_through_linear_light() {
        let black = Rgb::from_rgb(0, 0, 0);
        let white = Rgb::from_rgb(255, 255, 255);
        let mid = blend_color(black, white, 0.5);
        assert_eq!(mid, Rgb::from_rgb(188, 188, 188));
        assert_eq!(blend_color(black, white, 0.0), black);
        assert_eq!(blend_color(black, white, 1.0), white);
    }

    #[test]
    fn transition_converges_on_target() {
        let from = to_params(
            &scenario_track().with_features(0.1, 90.0, 0.2, 0.3, 0.9),
            DEFAULT_BASE_SPEED,
            DEFAULT_GRAVITY_SCALE,
        );
        let to = to_params(&scenario_track(), DEFAULT_BASE_SPEED, DEFAULT_GRAVITY_SCALE);
        let mut transition = Transition::new(from, to, Duration::from_secs(2));

        assert_eq!(transition.sample(), from);
        let halfway = transition.advance(Duration::from_secs(1));
        assert!((transition.progress() - 0.5).abs() < 1e-6);
        assert!(halfway.scroll_speed > from.scroll_speed && halfway.scroll_speed < to.scroll_speed);

        let done = transition.advance(Duration::from_secs(5));
        assert!(transition.is_complete());
        assert_eq!(done, to);
    }

    #[test]
    fn zero_length_transition_is_already_complete() {
        let params = to_params(&scenario_track(), DEFAULT_BASE_SPEED, DEFAULT_GRAVITY_SCALE);
        let transition = Transition::new(params, params, Duration::ZERO);
        assert!(transition.is_complete());
        assert_eq!(transition.progress(), 1.0);
    }
}
