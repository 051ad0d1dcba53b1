use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use pulse_runner_core::{sanitize_tracks, TrackAudioProfile};

/// Reads a JSON array of track profiles and drops the malformed ones.
pub(crate) fn load_tracks(path: &Path) -> Result<Vec<TrackAudioProfile>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read track list {}", path.display()))?;
    parse_tracks(&contents).with_context(|| format!("invalid track list {}", path.display()))
}

pub(crate) fn parse_tracks(contents: &str) -> Result<Vec<TrackAudioProfile>> {
    let tracks: Vec<TrackAudioProfile> =
        serde_json::from_str(contents).context("failed to parse track profiles")?;
    let received = tracks.len();
    let tracks = sanitize_tracks(tracks);
    if tracks.len() < received {
        log::warn!("dropped {} malformed tracks", received - tracks.len());
    }
    if tracks.is_empty() {
        bail!("track list contains no playable track");
    }
    Ok(tracks)
}

/// Built-in playlist spanning calm to frantic profiles.
pub(crate) fn demo_playlist() -> Vec<TrackAudioProfile> {
    vec![
        TrackAudioProfile::new("demo-dawn", "Dawn Chorus", "Field Notes", 45_000)
            .with_features(0.25, 84.0, 0.7, 0.35, 0.85),
        TrackAudioProfile::new("demo-drive", "Night Drive", "Synth Club", 60_000)
            .with_features(0.72, 118.0, 0.45, 0.68, 0.12),
        TrackAudioProfile::new("demo-rush", "Redline", "Pulse Engine", 50_000)
            .with_features(0.95, 174.0, 0.55, 0.8, 0.03),
        TrackAudioProfile::new("demo-drift", "Low Tide", "Harbor Lights", 55_000)
            .with_features(0.45, 100.0, 0.3, 0.5, 0.6),
    ]
}
