use std::fmt::Write as _;

use pulse_runner_core::SongMap;

/// Renders a compact textual summary of a map for use as a generation exemplar.
#[must_use]
pub fn describe(map: &SongMap) -> String {
    let mut out = String::new();
    let curve = map
        .difficulty_curve
        .iter()
        .map(|sample| format!("{sample:.2}"))
        .collect::<Vec<_>>()
        .join(", ");

    let _ = writeln!(
        out,
        "Reference level \"{}\" | duration {}ms",
        map.visual_theme.name, map.total_duration_ms
    );
    let _ = writeln!(out, "Difficulty curve: [{curve}]");
    let _ = write!(out, "Patterns ({}):", map.patterns.len());

    for pattern in &map.patterns {
        let _ = write!(
            out,
            "\n  {:<13} t={}-{}ms  density={}  diff={}  spacing={}",
            pattern.kind.name(),
            pattern.start_ms,
            pattern.end_ms(),
            pattern.density,
            pattern.difficulty,
            pattern.spacing
        );
        if let Some(count) = pattern.spike_count.filter(|count| *count > 0) {
            let _ = write!(out, "  spikes={count}");
        }
        if let Some(width) = pattern.block_width {
            let _ = write!(out, "  blockW={width}");
        }
        if let Some(width) = pattern.gap_width {
            let _ = write!(out, "  gapW={width}");
        }
        if let Some(count) = pattern.collectible_count.filter(|count| *count > 0) {
            let _ = write!(out, "  coins={count}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TemplateLibrary;

    #[test]
    fn lists_every_pattern_with_type_specific_fields() {
        let library = TemplateLibrary::embedded().expect("embedded tables parse");
        let reference = library.select_reference(0.6, 120.0, 0.5);
        let text = describe(reference.map());

        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Reference level \"neon_bright\" | duration 92000ms")
        );
        assert!(lines
            .next()
            .is_some_and(|line| line.starts_with("Difficulty curve: [0.10, 0.15")));
        assert_eq!(lines.next(), Some("Patterns (10):"));
        let first = lines.next().expect("first pattern line");
        assert!(first.contains("spikes        t=0-8000ms"), "{first}");
        assert!(first.contains("spikes=1"), "{first}");
        assert_eq!(lines.count(), 9);
    }
}
