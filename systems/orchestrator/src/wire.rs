//! JSON wire format exchanged with the generative collaborator.
//!
//! Decoding is lenient: missing numbers fall back to safe defaults, unknown
//! pattern types become `mixed`, unknown modifiers are dropped and prose
//! around the JSON object is ignored. Bounds are left to the validator.

use pulse_runner_core::{
    MapPattern, MapTheme, MapVersion, ModifierKind, PatternKind, Rgb, SongMap, TrackAudioProfile,
    VisualModifier,
};
use pulse_runner_system_validation::constants::{
    DEFAULT_DENSITY, DEFAULT_DIFFICULTY, DEFAULT_SPACING,
};
use serde::{Deserialize, Serialize};

use crate::GenerationError;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    track_id: Option<String>,
    #[serde(default)]
    patterns: Vec<WirePattern>,
    #[serde(default)]
    difficulty_curve: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    visual_theme: Option<WireTheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_duration: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    difficulty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spike_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gap_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collectible_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    visual_modifiers: Vec<WireModifier>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireModifier {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    intensity: Option<f64>,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTheme {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    obstacle_color: Option<String>,
    #[serde(default)]
    obstacle_glow: Option<String>,
    #[serde(default)]
    background_color: Option<String>,
    #[serde(default)]
    particle_color: Option<String>,
    #[serde(default)]
    special_effects: Vec<String>,
}

/// Encodes a map in the wire format.
pub fn encode_map(map: &SongMap) -> Result<String, GenerationError> {
    let wire = WireMap {
        track_id: Some(map.track_id.as_str().to_owned()),
        patterns: map.patterns.iter().map(encode_pattern).collect(),
        difficulty_curve: map
            .difficulty_curve
            .iter()
            .map(|sample| f64::from(*sample))
            .collect(),
        visual_theme: Some(WireTheme {
            name: Some(map.visual_theme.name.clone()),
            obstacle_color: Some(map.visual_theme.obstacle_color.to_hex()),
            obstacle_glow: Some(map.visual_theme.obstacle_glow.to_hex()),
            background_color: Some(map.visual_theme.background_color.to_hex()),
            particle_color: Some(map.visual_theme.particle_color.to_hex()),
            special_effects: map.visual_theme.special_effects.clone(),
        }),
        total_duration: Some(map.total_duration_ms as f64),
    };
    Ok(serde_json::to_string(&wire)?)
}

fn encode_pattern(pattern: &MapPattern) -> WirePattern {
    WirePattern {
        id: Some(pattern.id.clone()),
        kind: Some(pattern.kind.name().to_owned()),
        start_time: Some(pattern.start_ms as f64),
        duration: Some(pattern.duration_ms as f64),
        density: Some(f64::from(pattern.density)),
        difficulty: Some(f64::from(pattern.difficulty)),
        spacing: Some(f64::from(pattern.spacing)),
        spike_count: pattern.spike_count.map(f64::from),
        block_width: pattern.block_width.map(f64::from),
        gap_width: pattern.gap_width.map(f64::from),
        collectible_count: pattern.collectible_count.map(f64::from),
        visual_modifiers: pattern
            .modifiers
            .iter()
            .map(|modifier| WireModifier {
                kind: modifier_name(modifier.kind).to_owned(),
                intensity: Some(f64::from(modifier.intensity)),
                start_time: Some(modifier.start_ms as f64),
                duration: Some(modifier.duration_ms as f64),
            })
            .collect(),
    }
}

/// Decodes a collaborator response into a map for `track`.
///
/// `theme` supplies every theme field the payload omits or garbles. The
/// returned map always belongs to `track` and is tagged as generated.
pub fn decode_map(
    payload: &str,
    track: &TrackAudioProfile,
    theme: MapTheme,
) -> Result<SongMap, GenerationError> {
    let json = extract_object(payload).ok_or(GenerationError::MissingJson)?;
    let wire: WireMap = serde_json::from_str(json)?;

    let mut cursor = 0;
    let mut patterns = Vec::with_capacity(wire.patterns.len());
    for (index, pattern) in wire.patterns.into_iter().enumerate() {
        let decoded = decode_pattern(pattern, index, &track.id.to_string(), cursor);
        cursor = decoded.end_ms();
        patterns.push(decoded);
    }
    if patterns.is_empty() {
        return Err(GenerationError::EmptyPatterns);
    }

    Ok(SongMap {
        track_id: track.id.clone(),
        patterns,
        difficulty_curve: wire
            .difficulty_curve
            .into_iter()
            .map(|sample| sample as f32)
            .collect(),
        visual_theme: decode_theme(wire.visual_theme, theme),
        total_duration_ms: wire.total_duration.map_or(track.duration_ms, to_millis),
        version: MapVersion::Generated,
    })
}

fn decode_pattern(pattern: WirePattern, index: usize, track: &str, cursor: u64) -> MapPattern {
    let kind = pattern
        .kind
        .as_deref()
        .and_then(PatternKind::from_name)
        .unwrap_or(PatternKind::Mixed);

    MapPattern {
        id: pattern
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{track}_{:02}", index + 1)),
        kind,
        start_ms: pattern.start_time.map_or(cursor, to_millis),
        duration_ms: pattern.duration.map_or(0, to_millis),
        density: pattern.density.map_or(DEFAULT_DENSITY, |value| value as f32),
        difficulty: pattern
            .difficulty
            .map_or(DEFAULT_DIFFICULTY, |value| to_count(value).unwrap_or(DEFAULT_DIFFICULTY)),
        spacing: pattern.spacing.map_or(DEFAULT_SPACING, |value| value as f32),
        spike_count: pattern.spike_count.and_then(to_count),
        block_width: pattern.block_width.map(|value| value as f32),
        gap_width: pattern.gap_width.map(|value| value as f32),
        collectible_count: pattern.collectible_count.and_then(to_count),
        modifiers: pattern
            .visual_modifiers
            .into_iter()
            .filter_map(|modifier| {
                Some(VisualModifier {
                    kind: ModifierKind::from_name(&modifier.kind)?,
                    intensity: modifier.intensity.map_or(0.5, |value| value as f32),
                    start_ms: modifier.start_time.map_or(0, to_millis),
                    duration_ms: modifier.duration.map_or(0, to_millis),
                })
            })
            .collect(),
    }
}

fn decode_theme(wire: Option<WireTheme>, fallback: MapTheme) -> MapTheme {
    let Some(wire) = wire else {
        return fallback;
    };
    let color = |value: Option<String>, default: Rgb| {
        value
            .and_then(|hex| Rgb::from_hex(&hex).ok())
            .unwrap_or(default)
    };

    MapTheme {
        name: wire
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(fallback.name),
        obstacle_color: color(wire.obstacle_color, fallback.obstacle_color),
        obstacle_glow: color(wire.obstacle_glow, fallback.obstacle_glow),
        background_color: color(wire.background_color, fallback.background_color),
        particle_color: color(wire.particle_color, fallback.particle_color),
        special_effects: if wire.special_effects.is_empty() {
            fallback.special_effects
        } else {
            wire.special_effects
        },
    }
}

fn extract_object(payload: &str) -> Option<&str> {
    let start = payload.find('{')?;
    let end = payload.rfind('}')?;
    (end > start).then(|| &payload[start..=end])
}

fn to_millis(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u64::MAX as f64) as u64
    } else {
        0
    }
}

fn to_count(value: f64) -> Option<u8> {
    value
        .is_finite()
        .then(|| value.round().clamp(0.0, f64::from(u8::MAX)) as u8)
}

const fn modifier_name(kind: ModifierKind) -> &'static str {
    match kind {
        ModifierKind::ColorShift => "color_shift",
        ModifierKind::ParticleBurst => "particle_burst",
        ModifierKind::ScreenShake => "screen_shake",
        ModifierKind::GlowPulse => "glow_pulse",
    }
}
