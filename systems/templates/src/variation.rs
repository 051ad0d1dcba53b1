use pulse_runner_core::{MapPattern, MapTheme, MapVersion, SongMap, TrackAudioProfile};

use crate::{scale_to_duration, ReferenceMap};

// Energy gap at which the adjustments reach their full amplitude.
const FULL_ADJUSTMENT_GAP: f32 = 0.3;
const DENSITY_SHIFT: f32 = 0.1;
const HARDER_SPACING_SHIFT: f32 = -10.0;
const EASIER_SPACING_SHIFT: f32 = 20.0;
const CURVE_SHIFT: f32 = 0.1;
const MAX_DENSITY: f32 = 0.7;
const MIN_SPACING: f32 = 80.0;

/// Adapts a reference exemplar to a track.
///
/// The layout is scaled to the track duration. A track hotter than the
/// exemplar gets denser, harder, tighter patterns; a calmer one gets sparser,
/// easier, wider ones. Shifts grow with the energy gap and never exceed
/// +-0.1 density, +-1 difficulty, -10/+20 spacing.
#[must_use]
pub fn compose_variation(
    reference: &ReferenceMap,
    track: &TrackAudioProfile,
    theme: MapTheme,
) -> SongMap {
    let scaled = scale_to_duration(reference.map(), track.duration_ms);
    let gap = track.energy - reference.profile().energy;
    let weight = if gap.is_finite() {
        (gap.abs() / FULL_ADJUSTMENT_GAP).min(1.0)
    } else {
        0.0
    };
    let harder = gap > 0.0;

    let patterns = scaled
        .patterns
        .iter()
        .enumerate()
        .map(|(index, pattern)| MapPattern {
            id: format!("{}_{:02}", track.id, index + 1),
            ..adjust_pattern(pattern, weight, harder)
        })
        .collect();

    let curve_shift = weight * if harder { CURVE_SHIFT } else { -CURVE_SHIFT };
    let difficulty_curve = scaled
        .difficulty_curve
        .iter()
        .map(|sample| (sample + curve_shift).clamp(0.0, 1.0))
        .collect();

    SongMap {
        track_id: track.id.clone(),
        patterns,
        difficulty_curve,
        visual_theme: theme,
        total_duration_ms: scaled.total_duration_ms,
        version: MapVersion::Generated,
    }
}

fn adjust_pattern(pattern: &MapPattern, weight: f32, harder: bool) -> MapPattern {
    let (density_shift, spacing_shift) = if harder {
        (DENSITY_SHIFT, HARDER_SPACING_SHIFT)
    } else {
        (-DENSITY_SHIFT, EASIER_SPACING_SHIFT)
    };
    let step = weight.round() as u8;
    let difficulty = if harder {
        pattern.difficulty.saturating_add(step)
    } else {
        pattern.difficulty.saturating_sub(step)
    };

    MapPattern {
        density: (pattern.density + density_shift * weight).clamp(0.0, MAX_DENSITY),
        difficulty: difficulty.clamp(1, 10),
        spacing: (pattern.spacing + spacing_shift * weight).max(MIN_SPACING),
        ..pattern.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TemplateLibrary;
    use pulse_runner_core::{Rgb, TrackId};

    fn theme() -> MapTheme {
        MapTheme {
            name: "bright_digital".to_owned(),
            obstacle_color: Rgb::from_rgb(0x44, 0x44, 0xff),
            obstacle_glow: Rgb::from_rgb(0x66, 0x66, 0xff),
            background_color: Rgb::from_rgb(0x0a, 0x0a, 0x1e),
            particle_color: Rgb::from_rgb(0xff, 0xff, 0x44),
            special_effects: Vec::new(),
        }
    }

    fn track(energy: f32) -> TrackAudioProfile {
        TrackAudioProfile::new("song", "Song", "Artist", 150_000)
            .with_features(energy, 120.0, 0.5, 0.5, 0.5)
    }

    #[test]
    fn hotter_tracks_get_denser_tighter_patterns() {
        let library = TemplateLibrary::embedded().expect("embedded tables parse");
        let reference = library.select_reference(0.6, 120.0, 0.5);
        let map = compose_variation(reference, &track(0.95), theme());

        assert_eq!(map.track_id, TrackId::new("song"));
        assert_eq!(map.version, MapVersion::Generated);
        assert_eq!(map.total_duration_ms, 150_000);
        assert_eq!(map.patterns.len(), reference.map().patterns.len());
        assert_eq!(map.patterns[0].id, "song_01");

        for (adapted, original) in map.patterns.iter().zip(&reference.map().patterns) {
            assert!(adapted.density >= original.density);
            assert!(adapted.density <= original.density + DENSITY_SHIFT + 1e-6);
            assert!(adapted.spacing <= original.spacing);
            assert!(adapted.difficulty <= original.difficulty + 1);
            assert_eq!(adapted.kind, original.kind);
        }
    }

    #[test]
    fn calmer_tracks_get_sparser_wider_patterns() {
        let library = TemplateLibrary::embedded().expect("embedded tables parse");
        let reference = library.select_reference(0.85, 160.0, 0.7);
        let map = compose_variation(reference, &track(0.2), theme());

        for (adapted, original) in map.patterns.iter().zip(&reference.map().patterns) {
            assert!(adapted.density <= original.density);
            assert!(adapted.spacing >= original.spacing);
            assert!(adapted.spacing <= original.spacing + EASIER_SPACING_SHIFT + 1e-3);
            assert!(adapted.difficulty + 1 >= original.difficulty);
            assert!(adapted.difficulty >= 1);
        }
    }

    #[test]
    fn matching_energy_keeps_layout() {
        let library = TemplateLibrary::embedded().expect("embedded tables parse");
        let reference = library.select_reference(0.6, 120.0, 0.5);
        let map = compose_variation(reference, &track(0.6), theme());

        for (adapted, original) in map.patterns.iter().zip(&reference.map().patterns) {
            assert_eq!(adapted.density, original.density);
            assert_eq!(adapted.spacing, original.spacing);
            assert_eq!(adapted.difficulty, original.difficulty);
        }
        assert_eq!(map.visual_theme, theme());
    }
}
