use pulse_runner_core::TrackAudioProfile;
use pulse_runner_system_templates::{describe, ReferenceMap};
use pulse_runner_system_validation::constants::PLAYABILITY_RULES;
use thiserror::Error;

/// Failures of a single generation attempt. None of them reach the player.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The collaborator could not be reached or refused the request.
    #[error("generation service failed: {0}")]
    Transport(String),
    /// The collaborator gave up waiting for a result.
    #[error("generation service timed out")]
    Timeout,
    /// The response contained no JSON object.
    #[error("generation payload contains no json object")]
    MissingJson,
    /// The response JSON did not describe a map.
    #[error("generation payload is not a valid map")]
    InvalidPayload(#[from] serde_json::Error),
    /// The response described a map without any pattern.
    #[error("generation payload contains no patterns")]
    EmptyPatterns,
    /// The generation job panicked.
    #[error("generation job panicked: {0}")]
    Panicked(String),
    /// The generation job could not be scheduled.
    #[error("failed to schedule generation job: {0}")]
    Dispatch(String),
}

/// Everything the generative collaborator needs to compose a map for a track.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    track: TrackAudioProfile,
    reference: ReferenceMap,
}

impl GenerationRequest {
    /// Bundles a track with the exemplar closest to it.
    #[must_use]
    pub fn new(track: TrackAudioProfile, reference: ReferenceMap) -> Self {
        Self { track, reference }
    }

    /// Track the map is requested for.
    #[must_use]
    pub const fn track(&self) -> &TrackAudioProfile {
        &self.track
    }

    /// Exemplar the generated map should imitate.
    #[must_use]
    pub const fn reference(&self) -> &ReferenceMap {
        &self.reference
    }

    /// Text instructions for prompt-driven collaborators.
    #[must_use]
    pub fn prompt(&self) -> String {
        let track = &self.track;
        let profile = self.reference.profile();
        format!(
            "Compose a level for \"{name}\" by {artist}.\n\
             Track: duration {duration}ms, tempo {tempo:.0} BPM, energy {energy:.2}, \
             valence {valence:.2}, danceability {dance:.2}, acousticness {acoustic:.2}.\n\
             Closest reference \"{reference}\" (energy {ref_energy:.2}, tempo {ref_tempo:.0}, \
             danceability {ref_dance:.2}):\n{exemplar}\n\n\
             Keep the reference structure. If the track has more energy than the reference, \
             raise density by up to 0.1, difficulty by up to 1 and reduce spacing by up to 10; \
             if it has less, do the opposite and widen spacing by up to 20. Scale every pattern \
             to the track duration and keep start times contiguous.\n{rules}\n\n\
             Answer with one JSON object: {{\"patterns\": [{{\"id\", \"type\", \"startTime\", \
             \"duration\", \"density\", \"difficulty\", \"spacing\", \"spikeCount\", \
             \"blockWidth\", \"gapWidth\", \"collectibleCount\"}}], \"difficultyCurve\": [], \
             \"totalDuration\"}}",
            name = track.name,
            artist = track.artist,
            duration = track.duration_ms,
            tempo = track.tempo,
            energy = track.energy,
            valence = track.valence,
            dance = track.danceability,
            acoustic = track.acousticness,
            reference = self.reference.name(),
            ref_energy = profile.energy,
            ref_tempo = profile.tempo,
            ref_dance = profile.danceability,
            exemplar = describe(self.reference.map()),
            rules = PLAYABILITY_RULES,
        )
    }
}

/// External collaborator that composes maps.
///
/// Implementations run on dispatcher threads and may block.
pub trait GenerationService: Send + Sync {
    /// Produces a JSON payload shaped like a map for the request.
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
