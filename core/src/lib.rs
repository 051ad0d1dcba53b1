#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Pulse Runner engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! The track, map and parameter data model lives here as well so every
//! system agrees on a single definition of a [`SongMap`].

mod color;
mod map;
mod parameters;
mod track;

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

pub use color::{ColorParseError, Rgb};
pub use map::{
    MapPattern, MapTheme, MapVersion, ModifierKind, PatternKind, SongMap, VisualModifier,
    BREATHER_MAX_DENSITY, BREATHER_MIN_DURATION_MS,
};
pub use parameters::{
    GameplayParameters, GRAVITY_RANGE, JUMP_FORCE_RANGE, SCROLL_SPEED_RANGE, SPAWN_INTERVAL_RANGE,
};
pub use track::{sanitize_tracks, TrackAudioProfile, TrackId};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Pulse Runner.";

/// Lifecycle phase of a play session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the host to start the session.
    Idle,
    /// Obstacles spawn and scroll under steady parameters.
    Playing,
    /// Obstacles keep spawning while parameters blend towards the next track.
    Transitioning,
    /// The player collided with a lethal obstacle. Terminal until restart.
    Dead,
}

impl Phase {
    /// Whether the simulation advances obstacles and scoring in this phase.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Transitioning)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the playlist walked by the session.
    ConfigurePlaylist {
        /// Validated tracks in playback order.
        tracks: Vec<TrackAudioProfile>,
    },
    /// Sets the length of the parameter blend applied between tracks.
    ConfigureTransition {
        /// Duration of the blend window.
        duration: Duration,
    },
    /// Starts playback of the first track.
    Start,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the player jump.
    Jump,
    /// Forces an immediate advance to the next track.
    SkipTrack,
    /// Installs the map the spawner should walk for a track.
    InstallMap {
        /// Track the map belongs to.
        track_id: TrackId,
        /// Shared read-only map handle.
        map: Arc<SongMap>,
    },
    /// Supplies the gameplay parameters derived for a track.
    SetParameters {
        /// Track the parameters were derived from.
        track_id: TrackId,
        /// Parameters to blend towards.
        parameters: GameplayParameters,
    },
    /// Requests that an obstacle be placed into the playfield.
    SpawnObstacle {
        /// Type of obstacle to create.
        kind: ObstacleKind,
        /// Candidate bounding box in world units.
        bounds: Bounds,
    },
    /// Checks the player against live obstacles and awards score.
    ResolveCollisions,
    /// Returns a finished or running session to [`Phase::Idle`].
    Restart,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the session entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
    /// Announces that a new track became active.
    TrackChanged {
        /// Index of the track within the playlist.
        index: usize,
        /// Identifier of the active track.
        track_id: TrackId,
        /// What caused the change.
        reason: TrackChangeReason,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that playback crossed into a different pattern.
    PatternEntered {
        /// Index of the pattern within the installed map.
        index: usize,
        /// Behaviour of the entered pattern.
        kind: PatternKind,
    },
    /// Reports progress of the parameter blend.
    ParametersBlended {
        /// Completed fraction of the blend window.
        progress: f32,
    },
    /// Reports that the parameter blend completed.
    TransitionFinished,
    /// Confirms that an obstacle entered the playfield.
    ObstacleSpawned {
        /// Identifier assigned by the world.
        obstacle: ObstacleId,
        /// Type of obstacle.
        kind: ObstacleKind,
        /// Committed bounding box.
        bounds: Bounds,
    },
    /// Reports that a spawn request was refused.
    ObstacleSpawnRejected {
        /// Type of obstacle requested.
        kind: ObstacleKind,
        /// Why the request was refused.
        reason: SpawnRejection,
    },
    /// Confirms that an obstacle left the playfield.
    ObstacleRemoved {
        /// Identifier of the removed obstacle.
        obstacle: ObstacleId,
        /// Why the obstacle was removed.
        reason: RemovalReason,
    },
    /// Reports an updated score.
    ScoreChanged {
        /// Score after the change.
        score: u32,
        /// Points awarded by the change.
        delta: u32,
    },
    /// Confirms that the player left the ground.
    PlayerJumped,
    /// Reports that the player touched a lethal obstacle.
    PlayerDied {
        /// Obstacle the player collided with.
        obstacle: ObstacleId,
    },
    /// Reports the end of the death animation.
    GameOver {
        /// Final score of the session.
        score: u32,
    },
    /// Confirms that a map now drives the spawner.
    MapInstalled {
        /// Track the map belongs to.
        track_id: TrackId,
        /// Provenance of the installed map.
        version: MapVersion,
    },
    /// Reports that a map or parameter update targeted an inactive track.
    UpdateIgnored {
        /// Track the update targeted.
        track_id: TrackId,
    },
}

/// Cause of a track change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackChangeReason {
    /// The session started on its first track.
    Started,
    /// The previous track played to completion.
    Completed,
    /// The player skipped the previous track.
    Skipped,
}

/// Reasons a spawn request may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnRejection {
    /// The session is not in an active phase.
    Inactive,
    /// The candidate box overlaps a live obstacle.
    Overlap,
    /// The candidate box has no area.
    Degenerate,
}

/// Reasons an obstacle leaves the playfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// The obstacle scrolled past the trailing screen edge.
    OffScreen,
    /// The player picked the collectible up.
    Collected,
    /// The obstacle was cleared because the track changed or the session restarted.
    Reset,
}

/// Kind of obstacle the spawner may place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Lethal ground spike cluster.
    Spike,
    /// Lethal solid block.
    Block,
    /// Score pickup.
    Collectible,
}

impl ObstacleKind {
    /// Whether touching the obstacle kills the player.
    #[must_use]
    pub const fn is_lethal(&self) -> bool {
        !matches!(self, Self::Collectible)
    }
}

/// Unique identifier assigned to an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new obstacle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Axis-aligned bounding box in world units.
///
/// `x` grows to the right and `y` grows up from the ground line; the origin
/// is the bottom-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Bounds {
    /// Creates a new bounding box from its bottom-left corner and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge.
    #[must_use]
    pub const fn left(&self) -> f32 {
        self.x
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> f32 {
        self.y
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Horizontal extent.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Vertical extent.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Whether the box encloses a positive, finite area.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Whether the interiors of the two boxes intersect. Touching edges do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.bottom() < other.top()
            && other.bottom() < self.top()
    }

    /// Returns the box moved horizontally by `dx`.
    #[must_use]
    pub fn translated(&self, dx: f32) -> Self {
        Self { x: self.x + dx, ..*self }
    }

    /// Returns the box moved so its bottom edge sits at `y`.
    #[must_use]
    pub fn with_bottom(&self, y: f32) -> Self {
        Self { y, ..*self }
    }
}

/// Fixed playfield geometry shared by the world and the spawner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Playfield {
    width: f32,
    spawn_edge: f32,
    lookahead: f32,
    player_x: f32,
    player_size: f32,
}

impl Playfield {
    /// Default geometry: an 800 unit wide screen with spawns just beyond the right edge.
    pub const DEFAULT: Self = Self::new(800.0, 850.0, 1_200.0, 120.0, 28.0);

    /// Creates a playfield description.
    #[must_use]
    pub const fn new(
        width: f32,
        spawn_edge: f32,
        lookahead: f32,
        player_x: f32,
        player_size: f32,
    ) -> Self {
        Self {
            width,
            spawn_edge,
            lookahead,
            player_x,
            player_size,
        }
    }

    /// Visible width of the screen.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Earliest x at which new obstacles may be placed.
    #[must_use]
    pub const fn spawn_edge(&self) -> f32 {
        self.spawn_edge
    }

    /// Furthest distance beyond the spawn edge a candidate may be placed.
    #[must_use]
    pub const fn lookahead(&self) -> f32 {
        self.lookahead
    }

    /// Left edge of the player.
    #[must_use]
    pub const fn player_x(&self) -> f32 {
        self.player_x
    }

    /// Side length of the square player hitbox.
    #[must_use]
    pub const fn player_size(&self) -> f32 {
        self.player_size
    }
}

impl Default for Playfield {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Immutable representation of a single obstacle used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleSnapshot {
    /// Unique identifier assigned to the obstacle.
    pub id: ObstacleId,
    /// Type of obstacle.
    pub kind: ObstacleKind,
    /// Current bounding box.
    pub bounds: Bounds,
    /// Whether the clear bonus was already awarded.
    pub cleared: bool,
}

/// Read-only snapshot describing every live obstacle.
#[derive(Clone, Debug, Default)]
pub struct ObstacleView {
    snapshots: Vec<ObstacleSnapshot>,
}

impl ObstacleView {
    /// Creates a new obstacle view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ObstacleSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ObstacleSnapshot> {
        self.snapshots.iter()
    }

    /// Number of live obstacles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no obstacle is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Right edge of the obstacle furthest along the track, if any.
    #[must_use]
    pub fn rightmost_edge(&self) -> Option<f32> {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.bounds.right())
            .reduce(f32::max)
    }

    /// Whether the candidate box intersects any live obstacle.
    #[must_use]
    pub fn overlaps_any(&self, candidate: &Bounds) -> bool {
        self.snapshots
            .iter()
            .any(|snapshot| snapshot.bounds.overlaps(candidate))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ObstacleSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player's physical state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Current hitbox.
    pub bounds: Bounds,
    /// Vertical velocity; positive values move up.
    pub vertical_velocity: f32,
    /// Whether the player rests on the ground line.
    pub grounded: bool,
}
