use glam::Vec2;
use log::info;
use pulse_runner_core::{Command, Event, ObstacleKind, TrackAudioProfile};
use pulse_runner_rendering::{FrameInput, FrameOutput, Palette};
use pulse_runner_system_orchestrator::{CacheStats, MapOrchestrator};
use pulse_runner_system_parameters::to_params;
use pulse_runner_system_spawning::{Config as SpawningConfig, Spawning};
use pulse_runner_world::{self as world, query, World};

use crate::config::GameplayConfig;

/// Seconds of warning the autopilot wants before an obstacle reaches the player.
const AUTOPILOT_LEAD_SECS: f32 = 0.12;

/// Totals reported once the host stops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Summary {
    pub(crate) frames: u64,
    pub(crate) runs: u32,
    pub(crate) best_score: u32,
    pub(crate) score: u32,
    pub(crate) cache: CacheStats,
}

/// Frame loop wiring the world, the spawner and the map orchestrator together.
pub(crate) struct Simulation {
    world: World,
    orchestrator: MapOrchestrator,
    spawning: Spawning,
    base_speed: f32,
    gravity_scale: f32,
    autopilot: bool,
    frames: u64,
    runs: u32,
    best_score: u32,
}

impl Simulation {
    pub(crate) fn new(
        tracks: Vec<TrackAudioProfile>,
        mut orchestrator: MapOrchestrator,
        gameplay: &GameplayConfig,
        transition: std::time::Duration,
        autopilot: bool,
    ) -> Self {
        let world = World::new();
        let spawning = Spawning::new(SpawningConfig::new(
            *query::playfield(&world),
            gameplay.seed,
        ));
        orchestrator.clear();

        let mut simulation = Self {
            world,
            orchestrator,
            spawning,
            base_speed: gameplay.base_speed,
            gravity_scale: gameplay.gravity_scale,
            autopilot,
            frames: 0,
            runs: 0,
            best_score: 0,
        };

        let mut events = Vec::new();
        simulation.apply(Command::ConfigurePlaylist { tracks }, &mut events);
        simulation.apply(Command::ConfigureTransition { duration: transition }, &mut events);
        simulation.start(&mut events);
        simulation
    }

    /// Advances the session by one host frame.
    pub(crate) fn step(&mut self, input: FrameInput) -> FrameOutput {
        self.frames += 1;
        let mut events = Vec::new();

        let active = query::current_track(&self.world).map(|track| track.id.clone());
        for upgrade in self.orchestrator.poll(active.as_ref()) {
            self.apply(
                Command::InstallMap {
                    track_id: upgrade.track_id,
                    map: upgrade.map,
                },
                &mut events,
            );
        }

        if input.skip_track_pressed {
            self.apply(Command::SkipTrack, &mut events);
        }
        if input.jump_pressed || self.autopilot_wants_jump() {
            self.apply(Command::Jump, &mut events);
        }
        self.apply(Command::Tick { dt: input.dt }, &mut events);

        let mut commands = Vec::new();
        self.spawning.handle(
            &events,
            query::phase(&self.world),
            query::current_pattern(&self.world).map(|(_, pattern)| pattern),
            query::parameters(&self.world),
            &query::obstacle_view(&self.world),
            &mut commands,
        );
        for command in commands {
            self.apply(command, &mut events);
        }
        self.apply(Command::ResolveCollisions, &mut events);

        let game_over = events
            .iter()
            .any(|event| matches!(event, Event::GameOver { .. }));
        if game_over {
            self.best_score = self.best_score.max(query::score(&self.world));
            self.apply(Command::Restart, &mut events);
            self.start(&mut events);
        }

        let palette = query::parameters(&self.world)
            .map(Palette::from_parameters)
            .unwrap_or_default();
        let player = query::player(&self.world).bounds;
        FrameOutput::from_events(
            &events,
            &palette,
            Vec2::new(player.left(), player.bottom()),
        )
    }

    pub(crate) fn summary(&self) -> Summary {
        let score = query::score(&self.world);
        Summary {
            frames: self.frames,
            runs: self.runs,
            best_score: self.best_score.max(score),
            score,
            cache: self.orchestrator.stats(),
        }
    }

    fn start(&mut self, events: &mut Vec<Event>) {
        self.runs += 1;
        info!("starting run {}", self.runs);
        self.apply(Command::Start, events);
    }

    /// Applies a command and prepares every track the command switched to.
    fn apply(&mut self, command: Command, events: &mut Vec<Event>) {
        let first_new = events.len();
        world::apply(&mut self.world, command, events);

        let entered: Vec<usize> = events[first_new..]
            .iter()
            .filter_map(|event| match event {
                Event::TrackChanged { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        for index in entered {
            self.prepare_track(index, events);
        }
    }

    fn prepare_track(&mut self, index: usize, events: &mut Vec<Event>) {
        let Some(track) = query::playlist(&self.world).get(index).cloned() else {
            return;
        };

        let map = self.orchestrator.ensure_map(&track);
        let parameters = to_params(&track, self.base_speed, self.gravity_scale);
        self.apply(
            Command::InstallMap {
                track_id: track.id.clone(),
                map,
            },
            events,
        );
        self.apply(
            Command::SetParameters {
                track_id: track.id,
                parameters,
            },
            events,
        );

        if let Some(upcoming) = query::upcoming_track(&self.world).cloned() {
            self.orchestrator.prefetch(&upcoming);
        }
    }

    fn autopilot_wants_jump(&self) -> bool {
        if !self.autopilot || !query::phase(&self.world).is_active() {
            return false;
        }
        let Some(parameters) = query::parameters(&self.world) else {
            return false;
        };
        let player = query::player(&self.world);
        if !player.grounded {
            return false;
        }

        let reach = parameters.scroll_speed * AUTOPILOT_LEAD_SECS;
        query::obstacle_view(&self.world).iter().any(|obstacle| {
            let distance = obstacle.bounds.left() - player.bounds.right();
            obstacle.kind != ObstacleKind::Collectible && (0.0..=reach).contains(&distance)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use pulse_runner_core::{MapVersion, Phase};
    use pulse_runner_system_orchestrator::{
        ManualClock, ManualDispatcher, OrchestratorConfig,
    };
    use pulse_runner_system_templates::TemplateLibrary;

    use super::*;
    use crate::{local_service::LocalComposer, tracks::demo_playlist};

    const FRAME: Duration = Duration::from_millis(16);

    fn library() -> TemplateLibrary {
        TemplateLibrary::embedded().expect("embedded tables parse")
    }

    impl Simulation {
        fn phase(&self) -> Phase {
            query::phase(&self.world)
        }

        fn current_map_version(&self) -> Option<MapVersion> {
            query::map(&self.world).map(|map| map.version)
        }
    }

    fn frame() -> FrameInput {
        FrameInput {
            dt: FRAME,
            ..FrameInput::default()
        }
    }

    #[test]
    fn offline_session_installs_templates_and_spawns() {
        let orchestrator = MapOrchestrator::offline(
            OrchestratorConfig::default(),
            library(),
            Box::new(ManualClock::new()),
        );
        let mut simulation = Simulation::new(
            demo_playlist(),
            orchestrator,
            &GameplayConfig::default(),
            Duration::from_secs(2),
            true,
        );
        assert_eq!(simulation.phase(), Phase::Playing);
        assert_eq!(simulation.current_map_version(), Some(MapVersion::Template));

        let mut spawned = 0;
        for _ in 0..1_200 {
            let output = simulation.step(frame());
            spawned += output
                .commands
                .iter()
                .filter(|command| {
                    matches!(
                        command,
                        pulse_runner_rendering::RenderCommand::SpawnObstacle { .. }
                    )
                })
                .count();
        }
        assert!(spawned > 0);

        let summary = simulation.summary();
        assert_eq!(summary.frames, 1_200);
        assert!(summary.runs >= 1);
        // The current and the upcoming track are cached.
        assert_eq!(summary.cache.entries, 2);
    }

    #[test]
    fn generated_map_replaces_fallback_of_active_track() {
        let dispatcher = ManualDispatcher::new();
        let orchestrator = MapOrchestrator::with_service(
            OrchestratorConfig::default(),
            library(),
            Box::new(ManualClock::new()),
            Arc::new(LocalComposer::new(Duration::ZERO, 0.0, 1)),
            Box::new(dispatcher.clone()),
        );
        let mut simulation = Simulation::new(
            demo_playlist(),
            orchestrator,
            &GameplayConfig::default(),
            Duration::from_secs(2),
            true,
        );
        assert_eq!(simulation.current_map_version(), Some(MapVersion::Fallback));
        assert_eq!(dispatcher.pending(), 2);

        assert_eq!(dispatcher.run_all(), 2);
        let _ = simulation.step(frame());
        assert_eq!(simulation.current_map_version(), Some(MapVersion::Generated));
        assert_eq!(simulation.summary().cache.generated, 2);
    }

    #[test]
    fn skip_prepares_the_next_track() {
        let orchestrator = MapOrchestrator::offline(
            OrchestratorConfig::default(),
            library(),
            Box::new(ManualClock::new()),
        );
        let mut simulation = Simulation::new(
            demo_playlist(),
            orchestrator,
            &GameplayConfig::default(),
            Duration::from_secs(2),
            false,
        );

        let output = simulation.step(FrameInput {
            skip_track_pressed: true,
            ..frame()
        });
        assert!(output.notifications.iter().any(|notification| matches!(
            notification,
            pulse_runner_rendering::Notification::TrackChanged { index: 1, .. }
        )));
        assert_eq!(simulation.phase(), Phase::Transitioning);
        assert_eq!(simulation.current_map_version(), Some(MapVersion::Template));
        assert_eq!(simulation.summary().cache.entries, 3);
    }
}
