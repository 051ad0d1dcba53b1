use std::{sync::Arc, time::Duration};

use pulse_runner_core::{
    Command, Event, GameplayParameters, MapPattern, MapTheme, MapVersion, ObstacleKind,
    PatternKind, Phase, Rgb, SongMap, TrackAudioProfile, TrackId,
};
use pulse_runner_system_spawning::{min_gap, spawn_interval, Config, Spawning};
use pulse_runner_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(16);

fn parameters() -> GameplayParameters {
    GameplayParameters {
        scroll_speed: 200.0,
        gravity: 2_800.0,
        jump_force: -600.0,
        spike_chance: 0.6,
        block_chance: 0.4,
        gap_chance: 0.2,
        double_chance: 0.3,
        spawn_interval_ms: 1_000.0,
        obstacle_color: Rgb::from_rgb(0xff, 0x44, 0x44),
        obstacle_glow: Rgb::from_rgb(0xff, 0x66, 0x66),
    }
}

fn single_pattern_map(kind: PatternKind, density: f32, spacing: f32) -> SongMap {
    let mut pattern = MapPattern::new("only", kind, 0, 60_000, density, 3, spacing);
    pattern.spike_count = Some(2);
    pattern.block_width = Some(45.0);
    pattern.collectible_count = Some(4);
    map_of(vec![pattern], 60_000)
}

fn mixed_map() -> SongMap {
    let patterns = vec![
        MapPattern::new("m1", PatternKind::Spikes, 0, 8_000, 0.3, 2, 120.0),
        MapPattern::new("m2", PatternKind::Mixed, 8_000, 12_000, 0.6, 4, 90.0),
        MapPattern::new("m3", PatternKind::Collectibles, 20_000, 5_000, 0.2, 2, 100.0),
        MapPattern::new("m4", PatternKind::Blocks, 25_000, 10_000, 0.5, 3, 160.0),
        MapPattern::new("m5", PatternKind::Gaps, 35_000, 5_000, 0.1, 1, 100.0),
    ];
    map_of(patterns, 40_000)
}

fn map_of(patterns: Vec<MapPattern>, total_duration_ms: u64) -> SongMap {
    let white = Rgb::from_rgb(0xff, 0xff, 0xff);
    SongMap {
        track_id: TrackId::new("track"),
        patterns,
        difficulty_curve: Vec::new(),
        visual_theme: MapTheme {
            name: "plain".to_owned(),
            obstacle_color: white,
            obstacle_glow: white,
            background_color: white,
            particle_color: white,
            special_effects: Vec::new(),
        },
        total_duration_ms,
        version: MapVersion::Template,
    }
}

fn started_world(map: SongMap, parameters: GameplayParameters) -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigurePlaylist {
            tracks: vec![TrackAudioProfile::new("track", "Song", "Artist", 600_000)],
        },
        &mut events,
    );
    world::apply(&mut world, Command::Start, &mut events);
    world::apply(
        &mut world,
        Command::SetParameters {
            track_id: TrackId::new("track"),
            parameters,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::InstallMap {
            track_id: TrackId::new("track"),
            map: Arc::new(map),
        },
        &mut events,
    );
    world
}

/// Runs the frame loop and returns every spawn the world accepted.
fn run(world: &mut World, spawning: &mut Spawning, frames: usize) -> Vec<Event> {
    let mut accepted = Vec::new();
    for _ in 0..frames {
        let mut events = Vec::new();
        world::apply(world, Command::Tick { dt: FRAME }, &mut events);

        let mut commands = Vec::new();
        spawning.handle(
            &events,
            query::phase(world),
            query::current_pattern(world).map(|(_, pattern)| pattern),
            query::parameters(world),
            &query::obstacle_view(world),
            &mut commands,
        );

        for command in commands {
            let mut spawn_events = Vec::new();
            world::apply(world, command, &mut spawn_events);
            accepted.extend(
                spawn_events
                    .into_iter()
                    .filter(|event| matches!(event, Event::ObstacleSpawned { .. })),
            );
        }
        assert_no_overlap_and_min_gap(world);
    }
    accepted
}

fn assert_no_overlap_and_min_gap(world: &World) {
    let parameters = query::parameters(world).expect("parameters installed");
    let floor = min_gap(0.0, parameters);
    let mut obstacles: Vec<_> = query::obstacle_view(world).into_vec();
    obstacles.sort_by(|a, b| a.bounds.left().total_cmp(&b.bounds.left()));

    for pair in obstacles.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        assert!(
            !previous.bounds.overlaps(&next.bounds),
            "obstacles {:?} and {:?} overlap",
            previous.id,
            next.id
        );
        let gap = next.bounds.left() - previous.bounds.right();
        assert!(
            gap >= floor - 0.05,
            "gap {gap} between {:?} and {:?} is below {floor}",
            previous.id,
            next.id
        );
    }
}

fn spawned_kinds(events: &[Event]) -> Vec<ObstacleKind> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::ObstacleSpawned { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn spawned_obstacles_never_overlap_and_keep_the_jump_gap() {
    let mut world = started_world(mixed_map(), parameters());
    let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 0x5eed));

    let accepted = run(&mut world, &mut spawning, 40_000 / 16);
    assert!(!accepted.is_empty(), "expected the map to spawn obstacles");
}

#[test]
fn tight_jump_arc_is_enforced_for_fast_tracks() {
    let fast = GameplayParameters {
        scroll_speed: 500.0,
        gravity: 1_200.0,
        jump_force: -1_000.0,
        ..parameters()
    };
    let mut world = started_world(single_pattern_map(PatternKind::Spikes, 0.7, 80.0), fast);
    let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 11));

    let accepted = run(&mut world, &mut spawning, 20_000 / 16);
    assert!(!accepted.is_empty());
}

#[test]
fn denser_patterns_spawn_more_often() {
    let count = |density: f32| {
        let mut world = started_world(
            single_pattern_map(PatternKind::Blocks, density, 80.0),
            parameters(),
        );
        let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 3));
        run(&mut world, &mut spawning, 30_000 / 16).len()
    };

    let sparse = count(0.1);
    let dense = count(0.6);
    assert!(dense > sparse, "dense {dense} should exceed sparse {sparse}");
    assert!(spawn_interval(&parameters(), 0.6) < spawn_interval(&parameters(), 0.1));
}

#[test]
fn gap_patterns_spawn_nothing() {
    let mut world = started_world(
        single_pattern_map(PatternKind::Gaps, 0.2, 100.0),
        parameters(),
    );
    let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 5));

    assert!(run(&mut world, &mut spawning, 10_000 / 16).is_empty());
}

#[test]
fn fixed_kinds_are_honoured() {
    for (pattern, expected) in [
        (PatternKind::Spikes, ObstacleKind::Spike),
        (PatternKind::Blocks, ObstacleKind::Block),
        (PatternKind::Collectibles, ObstacleKind::Collectible),
    ] {
        let mut world = started_world(single_pattern_map(pattern, 0.4, 100.0), parameters());
        let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 9));
        let kinds = spawned_kinds(&run(&mut world, &mut spawning, 10_000 / 16));
        assert!(!kinds.is_empty());
        assert!(kinds.iter().all(|kind| *kind == expected), "{pattern:?}");
    }
}

#[test]
fn collectible_patterns_offer_their_budget_only() {
    let mut world = started_world(
        single_pattern_map(PatternKind::Collectibles, 0.6, 100.0),
        parameters(),
    );
    let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 13));

    let accepted = run(&mut world, &mut spawning, 20_000 / 16);
    assert_eq!(accepted.len(), 4);
}

#[test]
fn no_spawns_without_an_active_session() {
    let mut world = World::new();
    let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 1));
    let mut commands = Vec::new();
    spawning.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_secs(10),
        }],
        query::phase(&world),
        None,
        query::parameters(&world),
        &query::obstacle_view(&world),
        &mut commands,
    );
    assert!(commands.is_empty());

    let mut events = Vec::new();
    world::apply(&mut world, Command::Start, &mut events);
    assert!(events.is_empty(), "an empty playlist cannot start");
}

#[test]
fn identical_seeds_replay_identically() {
    let replay = |seed: u64| {
        let mut world = started_world(mixed_map(), parameters());
        let mut spawning = Spawning::new(Config::new(*query::playfield(&world), seed));
        run(&mut world, &mut spawning, 40_000 / 16)
    };

    let first = replay(0xfeed_beef);
    let second = replay(0xfeed_beef);
    assert_eq!(first, second);
}

#[test]
fn looping_collectible_pattern_refills_its_budget_each_pass() {
    let mut pattern = MapPattern::new("loop", PatternKind::Collectibles, 0, 4_000, 0.2, 2, 100.0);
    pattern.collectible_count = Some(2);
    let mut world = started_world(map_of(vec![pattern], 4_000), parameters());
    let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 21));

    let accepted = run(&mut world, &mut spawning, 12_000 / 16);
    assert_eq!(accepted.len(), 6, "two collectibles on each of three passes");
}

#[test]
fn spawned_obstacle_position_follows_scroll_after_spawn() {
    let mut world = started_world(
        single_pattern_map(PatternKind::Blocks, 0.0, 100.0),
        parameters(),
    );
    let playfield = *query::playfield(&world);
    let mut spawning = Spawning::new(Config::new(playfield, 2));

    let mut spawned_at = None;
    for frame in 1..=73_u32 {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: FRAME }, &mut events);
        let mut commands = Vec::new();
        spawning.handle(
            &events,
            query::phase(&world),
            query::current_pattern(&world).map(|(_, pattern)| pattern),
            query::parameters(&world),
            &query::obstacle_view(&world),
            &mut commands,
        );
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        world::apply(&mut world, Command::ResolveCollisions, &mut events);

        if events
            .iter()
            .any(|event| matches!(event, Event::ObstacleSpawned { .. }))
        {
            assert!(spawned_at.is_none(), "one obstacle per interval");
            spawned_at = Some(frame);
            let left = query::obstacle_view(&world)
                .iter()
                .next()
                .expect("spawned obstacle")
                .bounds
                .left();
            assert_eq!(left, playfield.spawn_edge(), "spawns are placed after the scroll");
        }
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::ScoreChanged { .. })));
    }

    // 63 frames of 16 ms reach the one second interval.
    assert_eq!(spawned_at, Some(63));
    let obstacles = query::obstacle_view(&world).into_vec();
    assert_eq!(obstacles.len(), 1);
    let expected = playfield.spawn_edge() - 10.0 * parameters().scroll_speed * FRAME.as_secs_f32();
    let left = obstacles[0].bounds.left();
    assert!(
        (left - expected).abs() < 1e-2,
        "obstacle at {left}, expected {expected}"
    );
}

fn mixed_map_for(track: &str, duration_ms: u64) -> Arc<SongMap> {
    let mut pattern = MapPattern::new("mix", PatternKind::Mixed, 0, duration_ms, 0.5, 4, 90.0);
    pattern.spike_count = Some(2);
    let mut map = map_of(vec![pattern], duration_ms);
    map.track_id = TrackId::new(track);
    Arc::new(map)
}

struct Session {
    tracks: Vec<(TrackAudioProfile, GameplayParameters)>,
    changes: Vec<usize>,
}

impl Session {
    /// Applies a command and installs map and parameters for every track it entered.
    fn apply(&mut self, world: &mut World, command: Command, events: &mut Vec<Event>) {
        let first_new = events.len();
        world::apply(world, command, events);
        let entered: Vec<usize> = events[first_new..]
            .iter()
            .filter_map(|event| match event {
                Event::TrackChanged { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        for index in entered {
            assert!(query::obstacle_view(world).is_empty());
            let (track, parameters) = self.tracks[index].clone();
            world::apply(
                world,
                Command::InstallMap {
                    track_id: track.id.clone(),
                    map: mixed_map_for(track.id.as_str(), track.duration_ms),
                },
                events,
            );
            world::apply(
                world,
                Command::SetParameters {
                    track_id: track.id,
                    parameters,
                },
                events,
            );
            self.changes.push(index);
        }
    }
}

#[test]
fn placement_holds_across_blends_and_track_changes() {
    let calm = GameplayParameters {
        scroll_speed: 160.0,
        gravity: 2_400.0,
        jump_force: -700.0,
        spawn_interval_ms: 1_400.0,
        ..parameters()
    };
    let drive = GameplayParameters {
        scroll_speed: 300.0,
        gravity: 1_800.0,
        jump_force: -900.0,
        spawn_interval_ms: 900.0,
        ..parameters()
    };
    let rush = GameplayParameters {
        scroll_speed: 480.0,
        gravity: 1_000.0,
        jump_force: -1_200.0,
        spawn_interval_ms: 550.0,
        ..parameters()
    };
    let mut session = Session {
        tracks: vec![
            (TrackAudioProfile::new("calm", "Calm", "Artist", 6_000), calm),
            (TrackAudioProfile::new("drive", "Drive", "Artist", 20_000), drive),
            (TrackAudioProfile::new("rush", "Rush", "Artist", 20_000), rush),
        ],
        changes: Vec::new(),
    };

    let mut world = World::new();
    let mut events = Vec::new();
    let playlist = session.tracks.iter().map(|(track, _)| track.clone()).collect();
    session.apply(
        &mut world,
        Command::ConfigurePlaylist { tracks: playlist },
        &mut events,
    );
    session.apply(
        &mut world,
        Command::ConfigureTransition {
            duration: Duration::from_secs(2),
        },
        &mut events,
    );
    session.apply(&mut world, Command::Start, &mut events);
    assert_eq!(session.changes, vec![0]);

    // Shortest interval any blend of these parameters can reach.
    let shortest = spawn_interval(&rush, 0.5);
    let mut spawning = Spawning::new(Config::new(*query::playfield(&world), 0xb1e4d));
    let mut since_change = Duration::ZERO;
    let mut awaiting_first_spawn = true;
    let mut spawns_after_skip = 0;
    let mut skipped = false;

    for _ in 0..15_000 / 16 {
        let mut events = Vec::new();
        let changes_before = session.changes.len();

        let halfway_through_blend = query::track_index(&world) == 1
            && query::track_elapsed(&world) >= Duration::from_secs(1);
        if !skipped && halfway_through_blend {
            assert_eq!(query::phase(&world), Phase::Transitioning);
            assert!(query::transition_progress(&world).is_some_and(|progress| progress >= 0.5));
            session.apply(&mut world, Command::SkipTrack, &mut events);
            skipped = true;
        }
        session.apply(&mut world, Command::Tick { dt: FRAME }, &mut events);

        if session.changes.len() > changes_before {
            since_change = Duration::ZERO;
            awaiting_first_spawn = true;
        } else {
            since_change += FRAME;
        }

        let live = *query::parameters(&world).expect("parameters installed");
        let pattern = query::current_pattern(&world).map(|(_, pattern)| pattern.clone());
        let mut commands = Vec::new();
        spawning.handle(
            &events,
            query::phase(&world),
            pattern.as_ref(),
            Some(&live),
            &query::obstacle_view(&world),
            &mut commands,
        );

        for command in commands {
            let rightmost = query::obstacle_view(&world).rightmost_edge();
            let mut spawn_events = Vec::new();
            session.apply(&mut world, command, &mut spawn_events);
            for event in &spawn_events {
                let Event::ObstacleSpawned { bounds, .. } = event else {
                    continue;
                };
                if let Some(right) = rightmost {
                    let gap = bounds.left() - right;
                    let floor = min_gap(90.0, &live);
                    assert!(gap >= floor - 0.05, "gap {gap} is below {floor}");
                }
                if awaiting_first_spawn {
                    assert!(
                        since_change + FRAME >= shortest,
                        "spawned {since_change:?} after a track change"
                    );
                    awaiting_first_spawn = false;
                }
                if skipped {
                    spawns_after_skip += 1;
                }
            }
        }

        let obstacles = query::obstacle_view(&world).into_vec();
        for (index, obstacle) in obstacles.iter().enumerate() {
            for other in &obstacles[index + 1..] {
                assert!(!obstacle.bounds.overlaps(&other.bounds));
            }
        }
    }

    assert!(skipped, "the skip happened during the blend");
    assert_eq!(session.changes, vec![0, 1, 2]);
    assert!(spawns_after_skip > 0);
}
