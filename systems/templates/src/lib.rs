#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hand-authored pattern tables and the pure helpers that select and adapt them.
//!
//! The tables themselves are data assets embedded from `data/*.toml`:
//! premade maps serve as the synchronous fallback while reference maps act
//! as exemplars for generation.

mod describe;
mod scaling;
mod variation;

pub use describe::describe;
pub use scaling::scale_to_duration;
pub use variation::compose_variation;

use log::debug;
use pulse_runner_core::{MapPattern, MapTheme, MapVersion, SongMap, TrackAudioProfile, TrackId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const PREMADE_TABLE: &str = include_str!("../data/premade.toml");
const REFERENCE_TABLE: &str = include_str!("../data/reference.toml");

const TEMPO_DISTANCE_SCALE: f32 = 200.0;
const ENERGY_DISTANCE_WEIGHT: f32 = 2.0;

/// Errors raised while loading pattern tables.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The table could not be parsed.
    #[error("failed to parse {table} pattern table")]
    InvalidTable {
        /// Name of the offending table.
        table: &'static str,
        /// Underlying parse failure.
        #[source]
        source: toml::de::Error,
    },
    /// The table contained no maps.
    #[error("{table} pattern table contains no maps")]
    EmptyTable {
        /// Name of the offending table.
        table: &'static str,
    },
    /// A reference map lacked the audio profile used to match it.
    #[error("reference map `{track_id}` has no profile")]
    MissingProfile {
        /// Identifier of the offending map.
        track_id: String,
    },
}

/// Audio characteristics a reference map was authored for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProfile {
    /// Perceived intensity in `[0, 1]`.
    pub energy: f32,
    /// Tempo in beats per minute.
    pub tempo: f32,
    /// Rhythmic suitability for dancing in `[0, 1]`.
    pub danceability: f32,
}

impl ReferenceProfile {
    /// Weighted distance to a track's characteristics. Energy counts double.
    #[must_use]
    pub fn distance(&self, energy: f32, tempo: f32, danceability: f32) -> f32 {
        ENERGY_DISTANCE_WEIGHT * (energy - self.energy).abs()
            + ((tempo - self.tempo) / TEMPO_DISTANCE_SCALE).abs()
            + (danceability - self.danceability).abs()
    }
}

/// Exemplar map with the profile it was authored for.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceMap {
    name: String,
    profile: ReferenceProfile,
    map: SongMap,
}

impl ReferenceMap {
    /// Display name of the exemplar.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Characteristics the exemplar was authored for.
    #[must_use]
    pub const fn profile(&self) -> &ReferenceProfile {
        &self.profile
    }

    /// The exemplar layout.
    #[must_use]
    pub const fn map(&self) -> &SongMap {
        &self.map
    }
}

#[derive(Deserialize)]
struct MapTable {
    #[serde(default)]
    maps: Vec<MapRecord>,
}

#[derive(Deserialize)]
struct MapRecord {
    track_id: String,
    #[serde(default)]
    name: Option<String>,
    total_duration_ms: u64,
    #[serde(default)]
    difficulty_curve: Vec<f32>,
    theme: MapTheme,
    #[serde(default)]
    profile: Option<ReferenceProfile>,
    #[serde(default)]
    patterns: Vec<MapPattern>,
}

impl MapRecord {
    fn into_map(self) -> SongMap {
        SongMap {
            track_id: TrackId::new(self.track_id),
            patterns: self.patterns,
            difficulty_curve: self.difficulty_curve,
            visual_theme: self.theme,
            total_duration_ms: self.total_duration_ms,
            version: MapVersion::Template,
        }
    }
}

/// Premade fallback maps and reference exemplars.
#[derive(Clone, Debug)]
pub struct TemplateLibrary {
    premade: Vec<SongMap>,
    references: Vec<ReferenceMap>,
}

impl TemplateLibrary {
    /// Loads the tables embedded in the crate.
    pub fn embedded() -> Result<Self, TemplateError> {
        Self::from_toml(PREMADE_TABLE, REFERENCE_TABLE)
    }

    /// Loads custom premade and reference tables. Both must contain at least one map.
    pub fn from_toml(premade: &str, reference: &str) -> Result<Self, TemplateError> {
        let premade: Vec<SongMap> = parse_table("premade", premade)?
            .into_iter()
            .map(MapRecord::into_map)
            .collect();

        let references = parse_table("reference", reference)?
            .into_iter()
            .map(|record| {
                let profile = record.profile.ok_or_else(|| TemplateError::MissingProfile {
                    track_id: record.track_id.clone(),
                })?;
                let name = record.name.clone().unwrap_or_else(|| record.track_id.clone());
                Ok(ReferenceMap {
                    name,
                    profile,
                    map: record.into_map(),
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        debug!(
            "loaded {} premade and {} reference maps",
            premade.len(),
            references.len()
        );

        Ok(Self {
            premade,
            references,
        })
    }

    /// Premade fallback maps in table order.
    #[must_use]
    pub fn premade(&self) -> &[SongMap] {
        &self.premade
    }

    /// Reference exemplars in table order.
    #[must_use]
    pub fn references(&self) -> &[ReferenceMap] {
        &self.references
    }

    /// Picks the premade map a track id hashes to. The same id always yields the same map.
    #[must_use]
    pub fn select_template(&self, track_id: &TrackId) -> &SongMap {
        &self.premade[template_index(track_id, self.premade.len())]
    }

    /// Picks the exemplar closest to the supplied characteristics.
    #[must_use]
    pub fn select_reference(&self, energy: f32, tempo: f32, danceability: f32) -> &ReferenceMap {
        let mut best = &self.references[0];
        let mut best_distance = best.profile.distance(energy, tempo, danceability);
        for candidate in &self.references[1..] {
            let distance = candidate.profile.distance(energy, tempo, danceability);
            if distance < best_distance {
                best = candidate;
                best_distance = distance;
            }
        }
        best
    }

    /// Template placeholder for a track, scaled to its duration and tagged as a fallback.
    #[must_use]
    pub fn fallback_for(&self, track: &TrackAudioProfile) -> SongMap {
        self.adapted_template(track, MapVersion::Fallback)
    }

    /// Template map for a track when no generation is available.
    #[must_use]
    pub fn template_for(&self, track: &TrackAudioProfile) -> SongMap {
        self.adapted_template(track, MapVersion::Template)
    }

    fn adapted_template(&self, track: &TrackAudioProfile, version: MapVersion) -> SongMap {
        let template = self.select_template(&track.id);
        debug!(
            "track {} uses template {} as {:?}",
            track.id, template.track_id, version
        );
        let mut map = scale_to_duration(template, track.duration_ms);
        map.track_id = track.id.clone();
        map.version = version;
        map
    }
}

fn parse_table(table: &'static str, contents: &str) -> Result<Vec<MapRecord>, TemplateError> {
    let parsed: MapTable =
        toml::from_str(contents).map_err(|source| TemplateError::InvalidTable { table, source })?;
    if parsed.maps.is_empty() {
        return Err(TemplateError::EmptyTable { table });
    }
    Ok(parsed.maps)
}

fn template_index(track_id: &TrackId, len: usize) -> usize {
    let digest = Sha256::digest(track_id.as_str().as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) % len as u64) as usize
}
