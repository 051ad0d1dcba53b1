use pulse_runner_core::{MapTheme, Rgb, TrackAudioProfile};

const DEFAULT_OBSTACLE: Rgb = Rgb::from_rgb(0xff, 0x44, 0x44);
const DEFAULT_GLOW: Rgb = Rgb::from_rgb(0xff, 0x66, 0x66);
const DEFAULT_BACKGROUND: Rgb = Rgb::from_rgb(0x1a, 0x1a, 0x2e);
const DEFAULT_PARTICLE: Rgb = Rgb::from_rgb(0xff, 0xff, 0xff);

/// Derives the visual theme of a track from its mood and instrumentation.
///
/// Valence picks the base palette, acousticness overrides the obstacle
/// colors and background, and high energy adds an intensity effect.
#[must_use]
pub fn visual_theme(track: &TrackAudioProfile) -> MapTheme {
    let energy = feature_or_neutral(track.energy);
    let valence = feature_or_neutral(track.valence);
    let acousticness = feature_or_neutral(track.acousticness);

    let mut obstacle_color = DEFAULT_OBSTACLE;
    let mut obstacle_glow = DEFAULT_GLOW;
    let mut background_color = DEFAULT_BACKGROUND;
    let mut particle_color = DEFAULT_PARTICLE;
    let mut special_effects = Vec::new();

    if valence > 0.7 {
        obstacle_color = Rgb::from_rgb(0x44, 0xff, 0x44);
        obstacle_glow = Rgb::from_rgb(0x66, 0xff, 0x66);
        particle_color = Rgb::from_rgb(0xff, 0xff, 0x44);
        special_effects.push("sparkles".to_owned());
    } else if valence < 0.3 {
        obstacle_color = Rgb::from_rgb(0xff, 0x00, 0x66);
        obstacle_glow = Rgb::from_rgb(0xff, 0x33, 0x88);
        particle_color = Rgb::from_rgb(0x66, 0x66, 0x99);
        special_effects.push("mist".to_owned());
    }

    if acousticness > 0.6 {
        obstacle_color = Rgb::from_rgb(0xff, 0x88, 0x44);
        obstacle_glow = Rgb::from_rgb(0xff, 0xaa, 0x66);
        background_color = Rgb::from_rgb(0x2e, 0x1a, 0x1a);
        special_effects.push("warm_glow".to_owned());
    } else if acousticness < 0.2 {
        obstacle_color = Rgb::from_rgb(0x44, 0x44, 0xff);
        obstacle_glow = Rgb::from_rgb(0x66, 0x66, 0xff);
        background_color = Rgb::from_rgb(0x0a, 0x0a, 0x1e);
        special_effects.push("digital_trails".to_owned());
    }

    if energy > 0.7 {
        special_effects.push("intense_glow".to_owned());
    }

    let mood = if valence > 0.5 { "bright" } else { "dark" };
    let texture = if acousticness > 0.5 {
        "organic"
    } else {
        "digital"
    };

    MapTheme {
        name: format!("{mood}_{texture}"),
        obstacle_color,
        obstacle_glow,
        background_color,
        particle_color,
        special_effects,
    }
}

fn feature_or_neutral(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.5
    }
}
