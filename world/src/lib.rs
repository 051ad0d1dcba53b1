#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for Pulse Runner.
//!
//! The world owns the playlist clock, the player, the live obstacles and the
//! score. It only changes through [`apply`] and is read through [`query`].

use std::{sync::Arc, time::Duration};

use log::{debug, info};
use pulse_runner_core::{
    Bounds, Command, Event, GameplayParameters, ObstacleId, ObstacleKind, ObstacleSnapshot, Phase,
    Playfield, RemovalReason, SongMap, SpawnRejection, TrackAudioProfile, TrackChangeReason,
    TrackId, WELCOME_BANNER,
};
use pulse_runner_system_parameters::{Transition, DEFAULT_TRANSITION};

/// Points awarded for touching a collectible.
pub const COLLECTIBLE_SCORE: u32 = 10;
/// Points awarded once the player has passed a lethal obstacle.
pub const CLEAR_SCORE: u32 = 5;
/// Time between the fatal collision and the game over notification.
pub const DEATH_ANIMATION: Duration = Duration::from_millis(600);

#[derive(Clone, Copy, Debug)]
struct Obstacle {
    id: ObstacleId,
    kind: ObstacleKind,
    bounds: Bounds,
    cleared: bool,
}

impl Obstacle {
    fn snapshot(&self) -> ObstacleSnapshot {
        ObstacleSnapshot {
            id: self.id,
            kind: self.kind,
            bounds: self.bounds,
            cleared: self.cleared,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Player {
    height: f32,
    vertical_velocity: f32,
}

impl Player {
    const fn grounded() -> Self {
        Self {
            height: 0.0,
            vertical_velocity: 0.0,
        }
    }

    fn is_grounded(&self) -> bool {
        self.height <= 0.0 && self.vertical_velocity <= 0.0
    }

    fn bounds(&self, playfield: &Playfield) -> Bounds {
        Bounds::new(
            playfield.player_x(),
            self.height,
            playfield.player_size(),
            playfield.player_size(),
        )
    }

    fn integrate(&mut self, gravity: f32, dt: f32) {
        if self.is_grounded() {
            return;
        }
        self.vertical_velocity -= gravity * dt;
        self.height += self.vertical_velocity * dt;
        if self.height <= 0.0 {
            self.height = 0.0;
            self.vertical_velocity = 0.0;
        }
    }
}

/// Represents the authoritative Pulse Runner session state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    playfield: Playfield,
    playlist: Vec<TrackAudioProfile>,
    transition_duration: Duration,
    phase: Phase,
    track_index: usize,
    track_elapsed: Duration,
    parameters: Option<GameplayParameters>,
    transition: Option<Transition>,
    map: Option<Arc<SongMap>>,
    pattern_index: Option<usize>,
    pattern_lap: u64,
    obstacles: Vec<Obstacle>,
    next_obstacle: u32,
    player: Player,
    score: u32,
    death_timer: Option<Duration>,
}

impl World {
    /// Creates an idle session on the default playfield.
    #[must_use]
    pub fn new() -> Self {
        Self::with_playfield(Playfield::DEFAULT)
    }

    /// Creates an idle session on a custom playfield.
    #[must_use]
    pub fn with_playfield(playfield: Playfield) -> Self {
        Self {
            banner: WELCOME_BANNER,
            playfield,
            playlist: Vec::new(),
            transition_duration: DEFAULT_TRANSITION,
            phase: Phase::Idle,
            track_index: 0,
            track_elapsed: Duration::ZERO,
            parameters: None,
            transition: None,
            map: None,
            pattern_index: None,
            pattern_lap: 0,
            obstacles: Vec::new(),
            next_obstacle: 0,
            player: Player::grounded(),
            score: 0,
            death_timer: None,
        }
    }

    fn current_track(&self) -> Option<&TrackAudioProfile> {
        self.playlist.get(self.track_index)
    }

    fn is_current(&self, track_id: &TrackId) -> bool {
        self.current_track()
            .is_some_and(|track| &track.id == track_id)
    }

    fn set_phase(&mut self, phase: Phase, out_events: &mut Vec<Event>) {
        if self.phase != phase {
            self.phase = phase;
            out_events.push(Event::PhaseChanged { phase });
        }
    }

    fn clear_obstacles(&mut self, out_events: &mut Vec<Event>) {
        for obstacle in self.obstacles.drain(..) {
            out_events.push(Event::ObstacleRemoved {
                obstacle: obstacle.id,
                reason: RemovalReason::Reset,
            });
        }
    }

    fn enter_track(&mut self, index: usize, reason: TrackChangeReason, out_events: &mut Vec<Event>) {
        self.track_index = index;
        self.track_elapsed = Duration::ZERO;
        self.map = None;
        self.pattern_index = None;
        self.pattern_lap = 0;
        self.clear_obstacles(out_events);

        if let Some(track) = self.playlist.get(index) {
            info!("track {index} ({}) starts: {reason:?}", track.id);
            out_events.push(Event::TrackChanged {
                index,
                track_id: track.id.clone(),
                reason,
            });
        }
    }

    fn advance_track(&mut self, reason: TrackChangeReason, out_events: &mut Vec<Event>) {
        if self.playlist.is_empty() {
            return;
        }
        let next = (self.track_index + 1) % self.playlist.len();
        self.enter_track(next, reason, out_events);
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        self.clear_obstacles(out_events);
        self.track_index = 0;
        self.track_elapsed = Duration::ZERO;
        self.parameters = None;
        self.transition = None;
        self.map = None;
        self.pattern_index = None;
        self.pattern_lap = 0;
        self.player = Player::grounded();
        self.score = 0;
        self.death_timer = None;
    }

    fn award(&mut self, delta: u32, out_events: &mut Vec<Event>) {
        self.score = self.score.saturating_add(delta);
        out_events.push(Event::ScoreChanged {
            score: self.score,
            delta,
        });
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.phase == Phase::Dead {
            self.run_death_timer(dt, out_events);
            return;
        }
        if !self.phase.is_active() {
            return;
        }

        out_events.push(Event::TimeAdvanced { dt });

        self.track_elapsed = self.track_elapsed.saturating_add(dt);
        let track_length = self
            .current_track()
            .map(|track| Duration::from_millis(track.duration_ms));
        if track_length.is_some_and(|length| self.track_elapsed >= length) {
            self.advance_track(TrackChangeReason::Completed, out_events);
        }

        self.advance_transition(dt, out_events);

        let Some(parameters) = self.parameters else {
            return;
        };
        let seconds = dt.as_secs_f32();
        self.player.integrate(parameters.gravity, seconds);

        let dx = -parameters.scroll_speed * seconds;
        for obstacle in &mut self.obstacles {
            obstacle.bounds = obstacle.bounds.translated(dx);
        }
        self.cull_offscreen(out_events);
        self.track_pattern(out_events);
    }

    fn advance_transition(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        self.parameters = Some(transition.advance(dt));
        let progress = transition.progress();
        let complete = transition.is_complete();
        out_events.push(Event::ParametersBlended { progress });

        if complete {
            self.transition = None;
            out_events.push(Event::TransitionFinished);
            self.set_phase(Phase::Playing, out_events);
        }
    }

    fn cull_offscreen(&mut self, out_events: &mut Vec<Event>) {
        self.obstacles.retain(|obstacle| {
            let visible = obstacle.bounds.right() >= 0.0;
            if !visible {
                out_events.push(Event::ObstacleRemoved {
                    obstacle: obstacle.id,
                    reason: RemovalReason::OffScreen,
                });
            }
            visible
        });
    }

    fn track_pattern(&mut self, out_events: &mut Vec<Event>) {
        let Some(map) = &self.map else {
            return;
        };
        let elapsed_ms = u64::try_from(self.track_elapsed.as_millis()).unwrap_or(u64::MAX);
        let lap = elapsed_ms.checked_div(map.total_duration_ms).unwrap_or(0);
        let entered = map.pattern_at(elapsed_ms).map(|(index, pattern)| (index, pattern.kind));
        let index = entered.map(|(index, _)| index);
        if index == self.pattern_index && lap == self.pattern_lap {
            return;
        }

        self.pattern_index = index;
        self.pattern_lap = lap;
        if let Some((index, kind)) = entered {
            debug!("pattern {index} ({}) begins", kind.name());
            out_events.push(Event::PatternEntered { index, kind });
        }
    }

    fn run_death_timer(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(remaining) = self.death_timer else {
            return;
        };
        let remaining = remaining.saturating_sub(dt);
        if remaining.is_zero() {
            self.death_timer = None;
            info!("game over with score {}", self.score);
            out_events.push(Event::GameOver { score: self.score });
        } else {
            self.death_timer = Some(remaining);
        }
    }

    fn jump(&mut self, out_events: &mut Vec<Event>) {
        if !self.phase.is_active() || !self.player.is_grounded() {
            return;
        }
        let Some(parameters) = self.parameters else {
            return;
        };
        self.player.vertical_velocity = -parameters.jump_force;
        out_events.push(Event::PlayerJumped);
    }

    fn set_parameters(
        &mut self,
        track_id: TrackId,
        parameters: GameplayParameters,
        out_events: &mut Vec<Event>,
    ) {
        if !self.is_current(&track_id) {
            out_events.push(Event::UpdateIgnored { track_id });
            return;
        }

        let Some(live) = self.parameters else {
            self.parameters = Some(parameters);
            return;
        };
        if self.transition_duration.is_zero() {
            self.parameters = Some(parameters);
            self.transition = None;
            return;
        }

        self.transition = Some(Transition::new(live, parameters, self.transition_duration));
        if self.phase.is_active() {
            self.set_phase(Phase::Transitioning, out_events);
        }
    }

    fn install_map(&mut self, track_id: TrackId, map: Arc<SongMap>, out_events: &mut Vec<Event>) {
        if !self.is_current(&track_id) || map.track_id != track_id {
            out_events.push(Event::UpdateIgnored { track_id });
            return;
        }

        info!(
            "installing {:?} map for track {track_id} ({} patterns)",
            map.version,
            map.patterns.len()
        );
        let version = map.version;
        self.map = Some(map);
        self.pattern_index = None;
        self.pattern_lap = 0;
        out_events.push(Event::MapInstalled { track_id, version });
        self.track_pattern(out_events);
    }

    fn spawn_obstacle(&mut self, kind: ObstacleKind, bounds: Bounds, out_events: &mut Vec<Event>) {
        let rejection = if !self.phase.is_active() {
            Some(SpawnRejection::Inactive)
        } else if !bounds.is_valid() {
            Some(SpawnRejection::Degenerate)
        } else if self
            .obstacles
            .iter()
            .any(|obstacle| obstacle.bounds.overlaps(&bounds))
        {
            Some(SpawnRejection::Overlap)
        } else {
            None
        };
        if let Some(reason) = rejection {
            debug!("spawn of {kind:?} rejected: {reason:?}");
            out_events.push(Event::ObstacleSpawnRejected { kind, reason });
            return;
        }

        let id = ObstacleId::new(self.next_obstacle);
        self.next_obstacle = self.next_obstacle.wrapping_add(1);
        self.obstacles.push(Obstacle {
            id,
            kind,
            bounds,
            cleared: false,
        });
        out_events.push(Event::ObstacleSpawned {
            obstacle: id,
            kind,
            bounds,
        });
    }

    fn resolve_collisions(&mut self, out_events: &mut Vec<Event>) {
        if !self.phase.is_active() {
            return;
        }

        let player = self.player.bounds(&self.playfield);
        let mut collected = Vec::new();
        let mut cleared = 0;
        let mut fatal = None;
        for obstacle in &mut self.obstacles {
            if obstacle.bounds.overlaps(&player) {
                if obstacle.kind.is_lethal() {
                    fatal = Some(obstacle.id);
                    break;
                }
                collected.push(obstacle.id);
            } else if obstacle.kind.is_lethal()
                && !obstacle.cleared
                && obstacle.bounds.right() < player.left()
            {
                obstacle.cleared = true;
                cleared += 1;
            }
        }

        if let Some(obstacle) = fatal {
            info!("player hit obstacle {}", obstacle.get());
            self.death_timer = Some(DEATH_ANIMATION);
            self.transition = None;
            self.set_phase(Phase::Dead, out_events);
            out_events.push(Event::PlayerDied { obstacle });
            return;
        }

        for _ in 0..cleared {
            self.award(CLEAR_SCORE, out_events);
        }
        if collected.is_empty() {
            return;
        }
        self.obstacles
            .retain(|obstacle| !collected.contains(&obstacle.id));
        for obstacle in collected {
            out_events.push(Event::ObstacleRemoved {
                obstacle,
                reason: RemovalReason::Collected,
            });
            self.award(COLLECTIBLE_SCORE, out_events);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigurePlaylist { tracks } => {
            world.reset(out_events);
            world.playlist = tracks
                .into_iter()
                .filter(TrackAudioProfile::is_well_formed)
                .collect();
            world.set_phase(Phase::Idle, out_events);
        }
        Command::ConfigureTransition { duration } => {
            world.transition_duration = duration;
        }
        Command::Start => {
            if world.phase != Phase::Idle || world.playlist.is_empty() {
                return;
            }
            world.set_phase(Phase::Playing, out_events);
            world.enter_track(0, TrackChangeReason::Started, out_events);
        }
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::Jump => world.jump(out_events),
        Command::SkipTrack => {
            if world.phase.is_active() {
                world.advance_track(TrackChangeReason::Skipped, out_events);
            }
        }
        Command::InstallMap { track_id, map } => world.install_map(track_id, map, out_events),
        Command::SetParameters {
            track_id,
            parameters,
        } => world.set_parameters(track_id, parameters, out_events),
        Command::SpawnObstacle { kind, bounds } => world.spawn_obstacle(kind, bounds, out_events),
        Command::ResolveCollisions => world.resolve_collisions(out_events),
        Command::Restart => {
            if world.phase == Phase::Idle {
                return;
            }
            world.reset(out_events);
            world.set_phase(Phase::Idle, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{sync::Arc, time::Duration};

    use pulse_runner_core::{
        GameplayParameters, MapPattern, ObstacleView, Phase, PlayerSnapshot, Playfield, SongMap,
        TrackAudioProfile,
    };

    use super::World;

    /// Reports the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase
    }

    /// Current score.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }

    /// Tracks in playback order.
    #[must_use]
    pub fn playlist(world: &World) -> &[TrackAudioProfile] {
        &world.playlist
    }

    /// Index of the current track within the playlist.
    #[must_use]
    pub fn track_index(world: &World) -> usize {
        world.track_index
    }

    /// Track being played, or the first track before the session starts.
    #[must_use]
    pub fn current_track(world: &World) -> Option<&TrackAudioProfile> {
        world.current_track()
    }

    /// Track that follows the current one, wrapping around the playlist.
    #[must_use]
    pub fn upcoming_track(world: &World) -> Option<&TrackAudioProfile> {
        if world.playlist.is_empty() {
            return None;
        }
        world
            .playlist
            .get((world.track_index + 1) % world.playlist.len())
    }

    /// Time spent on the current track.
    #[must_use]
    pub fn track_elapsed(world: &World) -> Duration {
        world.track_elapsed
    }

    /// Live gameplay parameters, absent until the host supplies some.
    #[must_use]
    pub fn parameters(world: &World) -> Option<&GameplayParameters> {
        world.parameters.as_ref()
    }

    /// Completed fraction of the running parameter blend, if one is running.
    #[must_use]
    pub fn transition_progress(world: &World) -> Option<f32> {
        world.transition.as_ref().map(|transition| transition.progress())
    }

    /// Map driving the spawner for the current track.
    #[must_use]
    pub fn map(world: &World) -> Option<&Arc<SongMap>> {
        world.map.as_ref()
    }

    /// Pattern covering the current playback instant together with its index.
    #[must_use]
    pub fn current_pattern(world: &World) -> Option<(usize, &MapPattern)> {
        let map = world.map.as_ref()?;
        let index = world.pattern_index?;
        map.patterns.get(index).map(|pattern| (index, pattern))
    }

    /// Captures a read-only view of the live obstacles.
    #[must_use]
    pub fn obstacle_view(world: &World) -> ObstacleView {
        ObstacleView::from_snapshots(
            world
                .obstacles
                .iter()
                .map(super::Obstacle::snapshot)
                .collect(),
        )
    }

    /// Captures the player's physical state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            bounds: world.player.bounds(&world.playfield),
            vertical_velocity: world.player.vertical_velocity,
            grounded: world.player.is_grounded(),
        }
    }

    /// Fixed playfield geometry.
    #[must_use]
    pub fn playfield(world: &World) -> &Playfield {
        &world.playfield
    }
}
