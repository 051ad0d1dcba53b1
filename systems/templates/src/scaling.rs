use pulse_runner_core::{MapPattern, SongMap, VisualModifier};

const RESCALE_TOLERANCE: f64 = 0.1;

/// Stretches or compresses a map so it spans `target_ms`.
///
/// Maps within 10% of the target, maps without a native duration and zero
/// targets are returned unchanged. Otherwise every pattern boundary is
/// rescaled and rounded independently, which keeps the patterns contiguous,
/// bounds each duration to within one millisecond of its exact proportional
/// value and makes the durations of a gap-free map sum to the target.
#[must_use]
pub fn scale_to_duration(map: &SongMap, target_ms: u64) -> SongMap {
    let native_ms = if map.total_duration_ms > 0 {
        map.total_duration_ms
    } else {
        map.native_duration_ms()
    };

    if native_ms == 0 || target_ms == 0 {
        return map.clone();
    }

    let scale = target_ms as f64 / native_ms as f64;
    if (scale - 1.0).abs() <= RESCALE_TOLERANCE {
        return map.clone();
    }

    let rescale = |boundary: u64| scale_boundary(boundary, native_ms, target_ms);
    let patterns = map
        .patterns
        .iter()
        .map(|pattern| {
            let start_ms = rescale(pattern.start_ms);
            let end_ms = rescale(pattern.end_ms());
            MapPattern {
                start_ms,
                duration_ms: end_ms.saturating_sub(start_ms),
                modifiers: pattern
                    .modifiers
                    .iter()
                    .map(|modifier| scale_modifier(modifier, native_ms, target_ms))
                    .collect(),
                ..pattern.clone()
            }
        })
        .collect();

    SongMap {
        patterns,
        total_duration_ms: target_ms,
        ..map.clone()
    }
}

fn scale_modifier(modifier: &VisualModifier, native_ms: u64, target_ms: u64) -> VisualModifier {
    let start_ms = scale_boundary(modifier.start_ms, native_ms, target_ms);
    let end_ms = scale_boundary(
        modifier.start_ms.saturating_add(modifier.duration_ms),
        native_ms,
        target_ms,
    );
    VisualModifier {
        start_ms,
        duration_ms: end_ms.saturating_sub(start_ms),
        ..modifier.clone()
    }
}

fn scale_boundary(boundary: u64, native_ms: u64, target_ms: u64) -> u64 {
    let numerator = u128::from(boundary) * u128::from(target_ms) + u128::from(native_ms / 2);
    u64::try_from(numerator / u128::from(native_ms)).unwrap_or(u64::MAX)
}
