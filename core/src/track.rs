use std::fmt;

use serde::{Deserialize, Serialize};

const DEFAULT_FEATURE: f32 = 0.5;
const DEFAULT_TEMPO: f32 = 120.0;

/// Stable identifier of a track supplied by the metadata collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Creates a new track identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Audio characteristics of a single track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAudioProfile {
    /// Identifier of the track.
    pub id: TrackId,
    /// Display title.
    pub name: String,
    /// Display artist credit.
    pub artist: String,
    /// Playback length in milliseconds.
    pub duration_ms: u64,
    /// Perceived intensity in `[0, 1]`.
    pub energy: f32,
    /// Tempo in beats per minute.
    pub tempo: f32,
    /// Musical positivity in `[0, 1]`.
    pub valence: f32,
    /// Rhythmic suitability for dancing in `[0, 1]`.
    pub danceability: f32,
    /// Confidence that the track is acoustic in `[0, 1]`.
    pub acousticness: f32,
    /// Popularity score as reported by the metadata collaborator.
    #[serde(default)]
    pub popularity: u32,
    /// Whether the track carries an explicit content flag.
    #[serde(default)]
    pub explicit: bool,
}

impl TrackAudioProfile {
    /// Creates a profile with neutral audio features.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: TrackId::new(id),
            name: name.into(),
            artist: artist.into(),
            duration_ms,
            energy: DEFAULT_FEATURE,
            tempo: DEFAULT_TEMPO,
            valence: DEFAULT_FEATURE,
            danceability: DEFAULT_FEATURE,
            acousticness: DEFAULT_FEATURE,
            popularity: 0,
            explicit: false,
        }
    }

    /// Replaces the audio features driving gameplay.
    #[must_use]
    pub fn with_features(
        mut self,
        energy: f32,
        tempo: f32,
        valence: f32,
        danceability: f32,
        acousticness: f32,
    ) -> Self {
        self.energy = energy;
        self.tempo = tempo;
        self.valence = valence;
        self.danceability = danceability;
        self.acousticness = acousticness;
        self
    }

    /// Reports whether the identifying metadata is present.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.id.as_str().trim().is_empty()
            && !self.name.trim().is_empty()
            && !self.artist.trim().is_empty()
            && self.duration_ms > 0
    }

    fn sanitized(mut self) -> Self {
        self.energy = unit_feature(self.energy);
        self.valence = unit_feature(self.valence);
        self.danceability = unit_feature(self.danceability);
        self.acousticness = unit_feature(self.acousticness);
        if !self.tempo.is_finite() || self.tempo < 0.0 {
            self.tempo = DEFAULT_TEMPO;
        }
        self
    }
}

fn unit_feature(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        DEFAULT_FEATURE
    }
}

/// Filters malformed tracks and clamps audio features into their ranges.
///
/// Tracks lacking an id, name, artist or positive duration never reach the
/// gameplay core.
#[must_use]
pub fn sanitize_tracks(tracks: Vec<TrackAudioProfile>) -> Vec<TrackAudioProfile> {
    tracks
        .into_iter()
        .filter(TrackAudioProfile::is_well_formed)
        .map(TrackAudioProfile::sanitized)
        .collect()
}
