#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Playability repair for pattern sequences of any provenance.
//!
//! [`validate`] is total: it never rejects a map, it clamps and reorders it
//! until every pattern is physically beatable. [`audit`] reports the softer
//! pacing rules that a map should follow but that repair alone cannot
//! guarantee.

mod audit;
pub mod constants;

use log::debug;
use pulse_runner_core::{MapPattern, PatternKind, SongMap, VisualModifier};

pub use audit::{audit, Finding, PlayabilityReport};

use constants::{
    CURVE_SAMPLES, DEFAULT_DENSITY, DEFAULT_SPACING, DIFFICULTY_RANGE,
    EDGE_DIFFICULTY_CAP, FILLER_SPACING, GAP_WIDTH_RANGE, MAX_BLOCK_WIDTH, MAX_DENSITY,
    MAX_SPIKE_COUNT, MIN_SPACING,
};

/// Repairs a map so it satisfies every playability bound.
///
/// Patterns are clamped field by field, sorted by start time, trimmed where
/// they overlap their predecessor and dropped when nothing remains of them.
/// Holes in the timeline are filled with empty `gaps` intervals so the
/// patterns cover the whole map. The first and last authored patterns are
/// eased to at most difficulty 3, and fillers never exceed that. Applying the function twice yields the same map as
/// applying it once.
#[must_use]
pub fn validate(map: SongMap) -> SongMap {
    let SongMap {
        track_id,
        patterns,
        difficulty_curve,
        visual_theme,
        total_duration_ms,
        version,
    } = map;
    let original_count = patterns.len();

    let mut patterns: Vec<MapPattern> = patterns.into_iter().map(clamp_pattern).collect();
    patterns.sort_by_key(|pattern| pattern.start_ms);
    let mut patterns = resolve_overlaps(patterns);
    ease_edges(&mut patterns);

    let total_duration_ms = patterns
        .last()
        .map_or(total_duration_ms, |last| total_duration_ms.max(last.end_ms()));
    let patterns = fill_holes(patterns, total_duration_ms);

    if patterns.len() != original_count {
        debug!(
            "repaired timeline of {track_id}: {original_count} patterns became {}",
            patterns.len()
        );
    }

    let mut repaired = SongMap {
        track_id,
        patterns,
        difficulty_curve: Vec::new(),
        visual_theme,
        total_duration_ms,
        version,
    };
    repaired.difficulty_curve = if difficulty_curve.is_empty() {
        derive_curve(&repaired)
    } else {
        difficulty_curve.into_iter().map(clamp_curve_sample).collect()
    };
    repaired
}

fn clamp_pattern(pattern: MapPattern) -> MapPattern {
    MapPattern {
        density: finite_or(pattern.density, DEFAULT_DENSITY).clamp(0.0, MAX_DENSITY),
        difficulty: pattern.difficulty.clamp(DIFFICULTY_RANGE.0, DIFFICULTY_RANGE.1),
        spacing: finite_or(pattern.spacing, DEFAULT_SPACING).max(MIN_SPACING),
        spike_count: pattern.spike_count.map(|count| count.min(MAX_SPIKE_COUNT)),
        block_width: pattern
            .block_width
            .filter(|width| width.is_finite() && *width > 0.0)
            .map(|width| width.min(MAX_BLOCK_WIDTH)),
        gap_width: pattern
            .gap_width
            .filter(|width| width.is_finite())
            .map(|width| width.clamp(GAP_WIDTH_RANGE.0, GAP_WIDTH_RANGE.1)),
        modifiers: pattern
            .modifiers
            .into_iter()
            .map(|modifier| VisualModifier {
                intensity: finite_or(modifier.intensity, 0.0).clamp(0.0, 1.0),
                ..modifier
            })
            .collect(),
        ..pattern
    }
}

fn resolve_overlaps(sorted: Vec<MapPattern>) -> Vec<MapPattern> {
    let mut resolved: Vec<MapPattern> = Vec::with_capacity(sorted.len());
    for mut pattern in sorted {
        let cursor = resolved.last().map_or(0, MapPattern::end_ms);
        if pattern.start_ms < cursor {
            let end = pattern.end_ms();
            pattern.start_ms = cursor;
            pattern.duration_ms = end.saturating_sub(cursor);
        }
        if pattern.duration_ms > 0 {
            resolved.push(pattern);
        }
    }
    resolved
}

fn fill_holes(patterns: Vec<MapPattern>, total_duration_ms: u64) -> Vec<MapPattern> {
    if patterns.is_empty() {
        return patterns;
    }

    let mut filled = Vec::with_capacity(patterns.len() + 2);
    let mut cursor = 0;
    for pattern in patterns {
        if pattern.start_ms > cursor {
            filled.push(filler(filled.len(), cursor, pattern.start_ms));
        }
        cursor = pattern.end_ms();
        filled.push(pattern);
    }
    if total_duration_ms > cursor {
        filled.push(filler(filled.len(), cursor, total_duration_ms));
    }
    filled
}

fn filler(index: usize, start_ms: u64, end_ms: u64) -> MapPattern {
    MapPattern::new(
        format!("filler_{index:02}"),
        PatternKind::Gaps,
        start_ms,
        end_ms - start_ms,
        0.0,
        DIFFICULTY_RANGE.0,
        FILLER_SPACING,
    )
}

fn ease_edges(patterns: &mut [MapPattern]) {
    if let Some(first) = patterns.first_mut() {
        first.difficulty = first.difficulty.min(EDGE_DIFFICULTY_CAP);
    }
    if let Some(last) = patterns.last_mut() {
        last.difficulty = last.difficulty.min(EDGE_DIFFICULTY_CAP);
    }
}

fn derive_curve(map: &SongMap) -> Vec<f32> {
    if map.total_duration_ms == 0 || map.patterns.is_empty() {
        return Vec::new();
    }

    (0..CURVE_SAMPLES)
        .map(|sample| {
            let offset = (2 * sample as u64 + 1) * map.total_duration_ms / (2 * CURVE_SAMPLES as u64);
            map.pattern_at(offset)
                .map_or(0.0, |(_, pattern)| {
                    f32::from(pattern.difficulty) / f32::from(DIFFICULTY_RANGE.1)
                })
        })
        .collect()
}

fn clamp_curve_sample(sample: f32) -> f32 {
    finite_or(sample, 0.0).clamp(0.0, 1.0)
}

fn finite_or(value: f32, default: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        default
    }
}
