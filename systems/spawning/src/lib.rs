#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded spawning system that walks the active pattern and places obstacles.
//!
//! The system never mutates the world. It decides when an obstacle is due,
//! which kind it should be and where it fits, then emits
//! [`Command::SpawnObstacle`] for the world to commit.

use std::time::Duration;

use log::debug;
use pulse_runner_core::{
    Bounds, Command, Event, GameplayParameters, MapPattern, ObstacleKind, ObstacleView,
    PatternKind, Phase, Playfield,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Fraction by which a fully dense pattern shortens the spawn interval.
pub const DENSITY_INTERVAL_FACTOR: f32 = 0.6;
/// Smallest horizontal gap allowed between consecutive obstacles.
pub const MIN_OBSTACLE_GAP: f32 = 80.0;
/// Most spikes placed in one cluster.
pub const MAX_CLUSTER: u8 = 5;

const SPIKE_WIDTH: f32 = 24.0;
const SPIKE_HEIGHT: f32 = 30.0;
const BLOCK_HEIGHT: f32 = 40.0;
const DEFAULT_BLOCK_WIDTH: f32 = 40.0;
const COLLECTIBLE_SIZE: f32 = 20.0;
const COLLECTIBLE_ELEVATION: f32 = 70.0;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    playfield: Playfield,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration for the provided playfield and seed.
    #[must_use]
    pub const fn new(playfield: Playfield, rng_seed: u64) -> Self {
        Self {
            playfield,
            rng_seed,
        }
    }
}

/// Obstacle the active pattern asks for, before placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnPlan {
    /// Type of obstacle.
    pub kind: ObstacleKind,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
    /// Height of the bottom edge above the ground line.
    pub elevation: f32,
}

/// Pure system that emits spawn commands while a pattern is active.
#[derive(Debug)]
pub struct Spawning {
    playfield: Playfield,
    rng: ChaCha8Rng,
    accumulator: Duration,
    collectibles_placed: u8,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            playfield: config.playfield,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            accumulator: Duration::ZERO,
            collectibles_placed: 0,
        }
    }

    /// Consumes the frame's events and views to emit at most one spawn command.
    ///
    /// When the due obstacle does not fit, nothing is emitted and the
    /// accumulated time is held at one interval, so the attempt repeats on the
    /// next frame without building a backlog.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: Phase,
        pattern: Option<&MapPattern>,
        parameters: Option<&GameplayParameters>,
        obstacles: &ObstacleView,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.accumulator = self.accumulator.saturating_add(*dt);
                }
                Event::PatternEntered { .. } => self.collectibles_placed = 0,
                Event::TrackChanged { .. } => {
                    self.accumulator = Duration::ZERO;
                    self.collectibles_placed = 0;
                }
                _ => {}
            }
        }

        if !phase.is_active() {
            self.accumulator = Duration::ZERO;
            return;
        }
        let (Some(pattern), Some(parameters)) = (pattern, parameters) else {
            self.accumulator = Duration::ZERO;
            return;
        };

        let interval = spawn_interval(parameters, pattern.density);
        if self.accumulator < interval {
            return;
        }

        let Some(plan) = self.plan(pattern, parameters) else {
            self.accumulator -= interval;
            return;
        };
        let gap = min_gap(pattern.spacing, parameters);
        let Some(bounds) = place(&plan, gap, obstacles, &self.playfield) else {
            debug!("no room for {:?} within the look-ahead window", plan.kind);
            self.accumulator = interval;
            return;
        };

        self.accumulator -= interval;
        if plan.kind == ObstacleKind::Collectible {
            self.collectibles_placed = self.collectibles_placed.saturating_add(1);
        }
        debug!(
            "spawning {:?} at x={:.1} in pattern {}",
            plan.kind,
            bounds.left(),
            pattern.id
        );
        out.push(Command::SpawnObstacle {
            kind: plan.kind,
            bounds,
        });
    }

    fn plan(&mut self, pattern: &MapPattern, parameters: &GameplayParameters) -> Option<SpawnPlan> {
        match pattern.kind {
            PatternKind::Spikes => Some(self.spike_cluster(pattern, parameters)),
            PatternKind::Blocks => Some(block(pattern)),
            PatternKind::Gaps => None,
            PatternKind::Collectibles => {
                let budget = pattern.collectible_count.unwrap_or(u8::MAX);
                (self.collectibles_placed < budget).then_some(collectible())
            }
            PatternKind::Mixed => {
                if chance(&mut self.rng, parameters.gap_chance) {
                    return None;
                }
                let density = pattern.density.clamp(0.0, 1.0);
                let spike_weight = parameters.spike_chance.max(0.0) * (0.5 + density);
                let block_weight = parameters.block_chance.max(0.0) * (1.2 - density);
                let total = spike_weight + block_weight;
                let spike = if total > 0.0 {
                    self.rng.gen::<f32>() * total < spike_weight
                } else {
                    true
                };
                Some(if spike {
                    self.spike_cluster(pattern, parameters)
                } else {
                    block(pattern)
                })
            }
        }
    }

    fn spike_cluster(&mut self, pattern: &MapPattern, parameters: &GameplayParameters) -> SpawnPlan {
        let mut count = pattern.spike_count.unwrap_or(1).clamp(1, MAX_CLUSTER);
        if chance(&mut self.rng, parameters.double_chance) {
            count = count.saturating_mul(2).min(MAX_CLUSTER);
        }
        SpawnPlan {
            kind: ObstacleKind::Spike,
            width: SPIKE_WIDTH * f32::from(count),
            height: SPIKE_HEIGHT,
            elevation: 0.0,
        }
    }
}

/// Time between two spawn attempts for a pattern of the given density.
#[must_use]
pub fn spawn_interval(parameters: &GameplayParameters, density: f32) -> Duration {
    let density = if density.is_finite() {
        density.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let millis = parameters.spawn_interval_ms * (1.0 - DENSITY_INTERVAL_FACTOR * density);
    if !millis.is_finite() {
        return Duration::from_secs(1);
    }
    Duration::from_secs_f32(millis.max(1.0) / 1_000.0)
}

/// Smallest distance to keep between the previous obstacle and the next one.
#[must_use]
pub fn min_gap(spacing: f32, parameters: &GameplayParameters) -> f32 {
    let spacing = if spacing.is_finite() { spacing } else { 0.0 };
    spacing
        .max(MIN_OBSTACLE_GAP)
        .max(parameters.jump_arc_distance())
}

/// Finds the bounds for a planned obstacle, or `None` when it does not fit.
#[must_use]
pub fn place(
    plan: &SpawnPlan,
    gap: f32,
    obstacles: &ObstacleView,
    playfield: &Playfield,
) -> Option<Bounds> {
    let x = obstacles
        .rightmost_edge()
        .map_or(playfield.spawn_edge(), |right| {
            playfield.spawn_edge().max(right + gap)
        });
    if x > playfield.spawn_edge() + playfield.lookahead() {
        return None;
    }

    let candidate = Bounds::new(x, plan.elevation, plan.width, plan.height);
    (candidate.is_valid() && !obstacles.overlaps_any(&candidate)).then_some(candidate)
}

fn block(pattern: &MapPattern) -> SpawnPlan {
    let width = pattern
        .block_width
        .filter(|width| width.is_finite() && *width > 0.0)
        .unwrap_or(DEFAULT_BLOCK_WIDTH);
    SpawnPlan {
        kind: ObstacleKind::Block,
        width,
        height: BLOCK_HEIGHT,
        elevation: 0.0,
    }
}

const fn collectible() -> SpawnPlan {
    SpawnPlan {
        kind: ObstacleKind::Collectible,
        width: COLLECTIBLE_SIZE,
        height: COLLECTIBLE_SIZE,
        elevation: COLLECTIBLE_ELEVATION,
    }
}

fn chance(rng: &mut ChaCha8Rng, probability: f32) -> bool {
    rng.gen::<f32>() < probability
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_runner_core::{ObstacleId, ObstacleSnapshot, Rgb};

    fn parameters() -> GameplayParameters {
        GameplayParameters {
            scroll_speed: 300.0,
            gravity: 1_800.0,
            jump_force: -900.0,
            spike_chance: 0.5,
            block_chance: 0.5,
            gap_chance: 0.0,
            double_chance: 0.0,
            spawn_interval_ms: 1_000.0,
            obstacle_color: Rgb::from_rgb(0xff, 0x44, 0x44),
            obstacle_glow: Rgb::from_rgb(0xff, 0x66, 0x66),
        }
    }

    fn view(bounds: &[Bounds]) -> ObstacleView {
        ObstacleView::from_snapshots(
            bounds
                .iter()
                .enumerate()
                .map(|(index, bounds)| ObstacleSnapshot {
                    id: ObstacleId::new(index as u32),
                    kind: ObstacleKind::Block,
                    bounds: *bounds,
                    cleared: false,
                })
                .collect(),
        )
    }

    #[test]
    fn interval_shrinks_with_density() {
        let parameters = parameters();
        assert_eq!(spawn_interval(&parameters, 0.0), Duration::from_secs(1));
        assert!(spawn_interval(&parameters, 0.5) < spawn_interval(&parameters, 0.2));
        assert_eq!(
            spawn_interval(&parameters, f32::NAN),
            spawn_interval(&parameters, 0.0)
        );
    }

    #[test]
    fn gap_respects_spacing_floor_and_jump_arc() {
        let parameters = parameters();
        let arc = parameters.jump_arc_distance();
        assert!((arc - 300.0).abs() < 1e-3);
        assert_eq!(min_gap(20.0, &parameters), arc);
        assert_eq!(min_gap(450.0, &parameters), 450.0);

        let slow = GameplayParameters {
            scroll_speed: 50.0,
            ..parameters
        };
        assert_eq!(min_gap(20.0, &slow), MIN_OBSTACLE_GAP);
    }

    #[test]
    fn placement_follows_the_rightmost_obstacle() {
        let playfield = Playfield::DEFAULT;
        let plan = block(&MapPattern::new("b", PatternKind::Blocks, 0, 1_000, 0.3, 2, 100.0));

        let empty = place(&plan, 100.0, &view(&[]), &playfield).expect("fits");
        assert_eq!(empty.left(), playfield.spawn_edge());

        let near = view(&[Bounds::new(900.0, 0.0, 40.0, 40.0)]);
        let after = place(&plan, 100.0, &near, &playfield).expect("fits");
        assert_eq!(after.left(), 1_040.0);

        let far = view(&[Bounds::new(1_900.0, 0.0, 40.0, 40.0)]);
        assert!(place(&plan, 200.0, &far, &playfield).is_none());
    }

    #[test]
    fn doubled_clusters_are_capped() {
        let mut spawning = Spawning::new(Config::new(Playfield::DEFAULT, 7));
        let mut pattern = MapPattern::new("s", PatternKind::Spikes, 0, 1_000, 0.3, 2, 100.0);
        pattern.spike_count = Some(3);
        let always_double = GameplayParameters {
            double_chance: 1.0,
            ..parameters()
        };
        let plan = spawning
            .plan(&pattern, &always_double)
            .expect("spikes always spawn");
        assert_eq!(plan.width, SPIKE_WIDTH * f32::from(MAX_CLUSTER));
    }

    #[test]
    fn collectible_patterns_stop_at_their_budget() {
        let mut spawning = Spawning::new(Config::new(Playfield::DEFAULT, 7));
        let mut pattern = MapPattern::new("c", PatternKind::Collectibles, 0, 1_000, 0.2, 1, 100.0);
        pattern.collectible_count = Some(2);
        spawning.collectibles_placed = 2;
        assert!(spawning.plan(&pattern, &parameters()).is_none());

        let events = [Event::PatternEntered {
            index: 1,
            kind: PatternKind::Collectibles,
        }];
        let mut out = Vec::new();
        spawning.handle(
            &events,
            Phase::Playing,
            Some(&pattern),
            Some(&parameters()),
            &view(&[]),
            &mut out,
        );
        assert_eq!(spawning.collectibles_placed, 0);
    }

    #[test]
    fn track_change_restarts_the_interval_and_the_budget() {
        let mut spawning = Spawning::new(Config::new(Playfield::DEFAULT, 7));
        let pattern = MapPattern::new("b", PatternKind::Blocks, 0, 1_000, 0.0, 1, 100.0);
        spawning.accumulator = Duration::from_secs(5);
        spawning.collectibles_placed = 3;

        let events = [
            Event::TimeAdvanced {
                dt: Duration::from_millis(16),
            },
            Event::TrackChanged {
                index: 1,
                track_id: pulse_runner_core::TrackId::new("next"),
                reason: pulse_runner_core::TrackChangeReason::Completed,
            },
        ];
        let mut out = Vec::new();
        spawning.handle(
            &events,
            Phase::Playing,
            Some(&pattern),
            Some(&parameters()),
            &view(&[]),
            &mut out,
        );

        assert!(out.is_empty());
        assert_eq!(spawning.accumulator, Duration::ZERO);
        assert_eq!(spawning.collectibles_placed, 0);
    }

    #[test]
    fn blocked_placement_does_not_build_a_backlog() {
        let mut spawning = Spawning::new(Config::new(Playfield::DEFAULT, 7));
        let pattern = MapPattern::new("b", PatternKind::Blocks, 0, 60_000, 0.0, 1, 100.0);
        let parameters = parameters();
        let blocked = view(&[Bounds::new(2_000.0, 0.0, 40.0, 40.0)]);
        let frame = [Event::TimeAdvanced {
            dt: Duration::from_millis(500),
        }];

        let mut out = Vec::new();
        for _ in 0..10 {
            spawning.handle(
                &frame,
                Phase::Playing,
                Some(&pattern),
                Some(&parameters),
                &blocked,
                &mut out,
            );
        }
        assert!(out.is_empty());
        assert_eq!(spawning.accumulator, spawn_interval(&parameters, 0.0));

        let short = [Event::TimeAdvanced {
            dt: Duration::from_millis(16),
        }];
        let mut spawned = 0;
        for _ in 0..5 {
            let mut out = Vec::new();
            spawning.handle(
                &short,
                Phase::Playing,
                Some(&pattern),
                Some(&parameters),
                &view(&[]),
                &mut out,
            );
            spawned += out.len();
        }
        assert_eq!(spawned, 1, "only the one due obstacle spawns once room opens");
    }
}
