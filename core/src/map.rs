use serde::{Deserialize, Serialize};

use crate::{Rgb, TrackId};

/// Obstacle-generation behaviour of a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Ground spikes, optionally clustered.
    Spikes,
    /// Solid blocks the player must hop over.
    Blocks,
    /// Deliberately obstacle-free interval.
    Gaps,
    /// Non-lethal pickups.
    Collectibles,
    /// Weighted mixture of spikes and blocks.
    Mixed,
}

impl PatternKind {
    /// Parses the lowercase name used in map payloads.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "spikes" => Some(Self::Spikes),
            "blocks" => Some(Self::Blocks),
            "gaps" => Some(Self::Gaps),
            "collectibles" => Some(Self::Collectibles),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    /// Lowercase name used in map payloads.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Spikes => "spikes",
            Self::Blocks => "blocks",
            Self::Gaps => "gaps",
            Self::Collectibles => "collectibles",
            Self::Mixed => "mixed",
        }
    }

    /// Whether the kind can act as a recovery interval.
    #[must_use]
    pub const fn is_restful(&self) -> bool {
        matches!(self, Self::Gaps | Self::Collectibles)
    }
}

/// Cosmetic effect layered on top of a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Hue rotation of obstacle colors.
    ColorShift,
    /// Particle emission on beat.
    ParticleBurst,
    /// Camera shake.
    ScreenShake,
    /// Pulsing obstacle glow.
    GlowPulse,
}

impl ModifierKind {
    /// Parses the snake_case name used in map payloads.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "color_shift" | "colorShift" => Some(Self::ColorShift),
            "particle_burst" | "particleBurst" => Some(Self::ParticleBurst),
            "screen_shake" | "screenShake" => Some(Self::ScreenShake),
            "glow_pulse" | "glowPulse" => Some(Self::GlowPulse),
            _ => None,
        }
    }
}

/// Timed cosmetic effect, relative to the start of its pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualModifier {
    /// Effect to apply.
    pub kind: ModifierKind,
    /// Strength in `[0, 1]`.
    pub intensity: f32,
    /// Offset from the pattern start in milliseconds.
    pub start_ms: u64,
    /// Length of the effect in milliseconds.
    pub duration_ms: u64,
}

/// One time-bounded segment of a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapPattern {
    /// Identifier unique within its map.
    pub id: String,
    /// Obstacle-generation behaviour.
    pub kind: PatternKind,
    /// Song-relative start in milliseconds.
    pub start_ms: u64,
    /// Length in milliseconds.
    pub duration_ms: u64,
    /// Spawn density in `[0, 0.7]`.
    pub density: f32,
    /// Difficulty rating in `[1, 10]`.
    pub difficulty: u8,
    /// Minimum horizontal spacing between obstacles in world units.
    pub spacing: f32,
    /// Spikes per cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spike_count: Option<u8>,
    /// Width of spawned blocks in world units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_width: Option<f32>,
    /// Width of authored gaps in world units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_width: Option<f32>,
    /// Number of pickups the pattern offers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collectible_count: Option<u8>,
    /// Cosmetic effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<VisualModifier>,
}

impl MapPattern {
    /// Creates a pattern without type-specific fields or modifiers.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: PatternKind,
        start_ms: u64,
        duration_ms: u64,
        density: f32,
        difficulty: u8,
        spacing: f32,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            start_ms,
            duration_ms,
            density,
            difficulty,
            spacing,
            spike_count: None,
            block_width: None,
            gap_width: None,
            collectible_count: None,
            modifiers: Vec::new(),
        }
    }

    /// Song-relative end of the pattern (exclusive).
    #[must_use]
    pub const fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }

    /// Whether the song-relative instant falls inside `[start, end)`.
    #[must_use]
    pub const fn contains(&self, elapsed_ms: u64) -> bool {
        elapsed_ms >= self.start_ms && elapsed_ms < self.end_ms()
    }

    /// Whether the pattern qualifies as a recovery interval for the player.
    #[must_use]
    pub fn is_breather(&self) -> bool {
        self.kind.is_restful()
            && self.density <= BREATHER_MAX_DENSITY
            && self.duration_ms >= BREATHER_MIN_DURATION_MS
    }
}

/// Highest density a breather pattern may carry.
pub const BREATHER_MAX_DENSITY: f32 = 0.25;
/// Shortest duration a breather pattern may last.
pub const BREATHER_MIN_DURATION_MS: u64 = 4_000;

/// Visual styling attached to a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapTheme {
    /// Theme name.
    pub name: String,
    /// Fill color of lethal obstacles.
    pub obstacle_color: Rgb,
    /// Glow color of lethal obstacles.
    pub obstacle_glow: Rgb,
    /// Clear color of the playfield.
    pub background_color: Rgb,
    /// Particle tint.
    pub particle_color: Rgb,
    /// Named effects the host may render.
    #[serde(default)]
    pub special_effects: Vec<String>,
}

/// Provenance of a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapVersion {
    /// Installed straight from the template library.
    Template,
    /// Produced by the generative collaborator.
    Generated,
    /// Template placeholder installed while generation is pending.
    Fallback,
}

/// Ordered pattern sequence and theme for one track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongMap {
    /// Track the map belongs to.
    pub track_id: TrackId,
    /// Time-ascending, non-overlapping patterns.
    pub patterns: Vec<MapPattern>,
    /// Normalised difficulty samples in `[0, 1]`.
    pub difficulty_curve: Vec<f32>,
    /// Visual styling.
    pub visual_theme: MapTheme,
    /// Span covered by the patterns in milliseconds.
    pub total_duration_ms: u64,
    /// Provenance tag.
    pub version: MapVersion,
}

impl SongMap {
    /// Finds the pattern covering `elapsed_ms`, looping once the map is exhausted.
    ///
    /// Returns the pattern index together with the pattern. Maps without
    /// patterns or duration, and instants falling between authored patterns,
    /// yield `None`.
    #[must_use]
    pub fn pattern_at(&self, elapsed_ms: u64) -> Option<(usize, &MapPattern)> {
        if self.total_duration_ms == 0 {
            return None;
        }

        let looped = elapsed_ms % self.total_duration_ms;
        let index = self
            .patterns
            .partition_point(|pattern| pattern.start_ms <= looped)
            .checked_sub(1)?;
        let pattern = &self.patterns[index];
        pattern.contains(looped).then_some((index, pattern))
    }

    /// End of the last pattern, or zero for an empty map.
    #[must_use]
    pub fn native_duration_ms(&self) -> u64 {
        self.patterns.last().map_or(0, MapPattern::end_ms)
    }

    /// Sum of every pattern duration.
    #[must_use]
    pub fn pattern_duration_sum(&self) -> u64 {
        self.patterns.iter().map(|pattern| pattern.duration_ms).sum()
    }
}
