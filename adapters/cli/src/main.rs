#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Pulse Runner sessions headlessly.

mod config;
mod headless;
mod local_service;
mod simulation;
mod tracks;

use std::{cell::RefCell, path::PathBuf, rc::Rc, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pulse_runner_rendering::{Color, HostBackend, Presentation};
use pulse_runner_system_orchestrator::{MapOrchestrator, MonotonicClock, ThreadDispatcher};
use pulse_runner_system_templates::TemplateLibrary;
use pulse_runner_world::{query, World};

use crate::{
    config::RunnerConfig, headless::HeadlessBackend, local_service::LocalComposer,
    simulation::Simulation,
};

#[derive(Debug, Parser)]
#[command(name = "pulse-runner", about = "Music-driven auto-runner", version)]
struct Cli {
    /// TOML file with gameplay, cache and generation settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of track profiles. Defaults to the built-in playlist.
    #[arg(long)]
    tracks: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 3_600)]
    frames: u64,

    /// Simulated frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Seed overriding the configured spawner seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Serve premade templates only and never request generated maps.
    #[arg(long)]
    offline: bool,

    /// Sleep between frames so the session runs at wall-clock speed.
    #[arg(long)]
    realtime: bool,
}

/// Entry point for the Pulse Runner command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let banner = query::welcome_banner(&World::new());
    info!("{banner}");
    println!("{banner}");

    let mut config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.gameplay.seed = seed;
    }

    let playlist = match &cli.tracks {
        Some(path) => tracks::load_tracks(path)?,
        None => tracks::demo_playlist(),
    };
    info!("loaded {} tracks", playlist.len());

    let library = TemplateLibrary::embedded().context("failed to load embedded map tables")?;
    let clock = Box::new(MonotonicClock::new());
    let orchestrator = if cli.offline || !config.generation.enabled {
        info!("map generation disabled; serving premade templates");
        MapOrchestrator::offline(config.orchestrator(), library, clock)
    } else {
        let composer = LocalComposer::new(
            Duration::from_millis(config.generation.latency_ms),
            config.generation.failure_rate,
            config.gameplay.seed,
        );
        MapOrchestrator::with_service(
            config.orchestrator(),
            library,
            clock,
            Arc::new(composer),
            Box::new(ThreadDispatcher),
        )
    };

    let simulation = Rc::new(RefCell::new(Simulation::new(
        playlist,
        orchestrator,
        &config.gameplay,
        config.transition(),
        true,
    )));
    let presentation = Presentation::new(
        "Pulse Runner",
        Color::from_rgb_u8(0x0a, 0x0a, 0x1a),
        cli.fps,
    )?;

    let session = Rc::clone(&simulation);
    HeadlessBackend::new(cli.frames, cli.realtime).run(presentation, move |input| {
        session.borrow_mut().step(input)
    })?;

    let summary = simulation.borrow().summary();
    println!(
        "simulated {} frames over {} runs, best score {}, final score {}",
        summary.frames, summary.runs, summary.best_score, summary.score
    );
    let cache = summary.cache;
    println!(
        "maps cached {}/{}, generated {}, failed {}, stale {}, evicted {}, in flight {}",
        cache.entries,
        cache.capacity,
        cache.generated,
        cache.failures,
        cache.stale_results,
        cache.evictions,
        cache.in_flight
    );
    info!("issued {} generation requests", cache.requests_issued);
    Ok(())
}
