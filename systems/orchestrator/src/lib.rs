#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Map acquisition for the frame loop.
//!
//! [`MapOrchestrator::ensure_map`] always answers synchronously with a ready
//! map: the cached one, or a validated template placeholder. When a
//! [`GenerationService`] is configured the orchestrator also issues at most one
//! background request per track and hands finished maps back through
//! [`MapOrchestrator::poll`], which only reports an upgrade for the track that
//! is active at that moment.

mod cache;
mod clock;
mod dispatch;
mod service;
pub mod wire;

use std::{
    collections::{HashMap, HashSet},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use pulse_runner_core::{MapVersion, SongMap, TrackAudioProfile, TrackId};
use pulse_runner_system_parameters::visual_theme;
use pulse_runner_system_templates::TemplateLibrary;
use pulse_runner_system_validation::validate;

pub use cache::{CacheEntry, MapCache};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use dispatch::{Dispatcher, Job, ManualDispatcher, ThreadDispatcher};
pub use service::{GenerationError, GenerationRequest, GenerationService};

/// Tunables of the cache and of background generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Most maps kept at once.
    pub capacity: usize,
    /// Age after which a cached map is swept.
    pub ttl: Duration,
    /// Interval between two sweeps.
    pub sweep_interval: Duration,
    /// Age after which an unanswered request is abandoned.
    pub generation_budget: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
            generation_budget: Duration::from_secs(30),
        }
    }
}

/// Lifecycle of a track's map as seen by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Nothing is cached for the track.
    Pending,
    /// A ready map is cached and a generated replacement is on its way.
    Generating,
    /// A ready map is cached and nothing is outstanding.
    Ready,
    /// The last generation attempt failed; the cached placeholder stays in use.
    Failed,
}

/// Generated map that should replace the live map of the active track.
#[derive(Clone, Debug, PartialEq)]
pub struct MapUpgrade {
    /// Track the map belongs to.
    pub track_id: TrackId,
    /// The validated generated map.
    pub map: Arc<SongMap>,
}

/// Counters describing the cache and request traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Maps currently cached.
    pub entries: usize,
    /// Most maps kept at once.
    pub capacity: usize,
    /// Requests currently outstanding.
    pub in_flight: usize,
    /// Requests issued since construction.
    pub requests_issued: u64,
    /// Generated maps installed into the cache.
    pub generated: u64,
    /// Requests that failed or ran over budget.
    pub failures: u64,
    /// Results discarded because their request had been abandoned.
    pub stale_results: u64,
    /// Maps removed by capacity pressure or expiry.
    pub evictions: u64,
}

struct Generation {
    service: Arc<dyn GenerationService>,
    dispatcher: Box<dyn Dispatcher>,
}

struct Completion {
    track_id: TrackId,
    ticket: u64,
    outcome: Result<SongMap, GenerationError>,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    ticket: u64,
    started_at: Duration,
}

/// Owns the map cache and the background generation pipeline.
///
/// Every method is meant to be called from the frame loop thread and none of
/// them blocks.
pub struct MapOrchestrator {
    config: OrchestratorConfig,
    library: TemplateLibrary,
    cache: MapCache,
    clock: Box<dyn Clock>,
    generation: Option<Generation>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    in_flight: HashMap<TrackId, InFlight>,
    failed: HashSet<TrackId>,
    next_ticket: u64,
    last_sweep: Duration,
    stats: CacheStats,
}

impl MapOrchestrator {
    /// Creates an orchestrator that serves template maps only.
    #[must_use]
    pub fn offline(
        config: OrchestratorConfig,
        library: TemplateLibrary,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self::build(config, library, clock, None)
    }

    /// Creates an orchestrator that upgrades placeholders with generated maps.
    #[must_use]
    pub fn with_service(
        config: OrchestratorConfig,
        library: TemplateLibrary,
        clock: Box<dyn Clock>,
        service: Arc<dyn GenerationService>,
        dispatcher: Box<dyn Dispatcher>,
    ) -> Self {
        Self::build(
            config,
            library,
            clock,
            Some(Generation {
                service,
                dispatcher,
            }),
        )
    }

    fn build(
        config: OrchestratorConfig,
        library: TemplateLibrary,
        clock: Box<dyn Clock>,
        generation: Option<Generation>,
    ) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let last_sweep = clock.now();
        Self {
            cache: MapCache::new(config.capacity, config.ttl),
            config,
            library,
            clock,
            generation,
            sender,
            receiver,
            in_flight: HashMap::new(),
            failed: HashSet::new(),
            next_ticket: 0,
            last_sweep,
            stats: CacheStats::default(),
        }
    }

    /// Returns a ready map for the track without waiting.
    ///
    /// A cached map is returned as is. Otherwise a validated template
    /// placeholder is cached and returned, and a generation request is
    /// issued unless one is already outstanding for the track.
    pub fn ensure_map(&mut self, track: &TrackAudioProfile) -> Arc<SongMap> {
        if let Some(entry) = self.cache.get(&track.id) {
            return Arc::clone(entry.map());
        }

        let placeholder = if self.generation.is_some() {
            self.library.fallback_for(track)
        } else {
            self.library.template_for(track)
        };
        let map = Arc::new(validate(placeholder));
        self.store(track.id.clone(), Arc::clone(&map));
        debug!("track {} serves {:?} map", track.id, map.version);

        self.request_generation(track);
        map
    }

    /// Warms the cache for an upcoming track.
    pub fn prefetch(&mut self, track: &TrackAudioProfile) {
        let _ = self.ensure_map(track);
    }

    /// Ingests finished generations and housekeeps the cache.
    ///
    /// Returns the upgrades that concern `active`. Results for other tracks
    /// only update the cache.
    pub fn poll(&mut self, active: Option<&TrackId>) -> Vec<MapUpgrade> {
        let mut upgrades = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            if let Some(upgrade) = self.complete(completion, active) {
                upgrades.push(upgrade);
            }
        }

        let now = self.clock.now();
        self.abandon_overdue(now);
        if now.saturating_sub(self.last_sweep) >= self.config.sweep_interval {
            self.last_sweep = now;
            let expired = self.cache.sweep_expired(now);
            if !expired.is_empty() {
                debug!("swept {} expired maps", expired.len());
                self.stats.evictions += expired.len() as u64;
            }
        }
        upgrades
    }

    /// Reports whether a request for the track is outstanding.
    #[must_use]
    pub fn is_generating(&self, track_id: &TrackId) -> bool {
        self.in_flight.contains_key(track_id)
    }

    /// Cached map of the track, if any.
    #[must_use]
    pub fn get_cached(&self, track_id: &TrackId) -> Option<Arc<SongMap>> {
        self.cache.get(track_id).map(|entry| Arc::clone(entry.map()))
    }

    /// Lifecycle of the track's map.
    #[must_use]
    pub fn status(&self, track_id: &TrackId) -> CacheStatus {
        if self.cache.get(track_id).is_none() {
            CacheStatus::Pending
        } else if self.in_flight.contains_key(track_id) {
            CacheStatus::Generating
        } else if self.failed.contains(track_id) {
            CacheStatus::Failed
        } else {
            CacheStatus::Ready
        }
    }

    /// Traffic and occupancy counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            capacity: self.cache.capacity(),
            in_flight: self.in_flight.len(),
            ..self.stats
        }
    }

    /// Forgets every cached map and outstanding request.
    ///
    /// Results of requests issued before the call are discarded when they
    /// arrive.
    pub fn clear(&mut self) {
        info!(
            "clearing map cache ({} maps, {} requests outstanding)",
            self.cache.len(),
            self.in_flight.len()
        );
        self.cache.clear();
        self.in_flight.clear();
        self.failed.clear();
    }

    fn request_generation(&mut self, track: &TrackAudioProfile) {
        let Some(generation) = &self.generation else {
            return;
        };
        if self.in_flight.contains_key(&track.id) {
            return;
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let reference = self
            .library
            .select_reference(track.energy, track.tempo, track.danceability)
            .clone();
        let request = GenerationRequest::new(track.clone(), reference);
        let service = Arc::clone(&generation.service);
        let sender = self.sender.clone();
        let track_id = track.id.clone();

        let job: Job = Box::new(move || {
            let outcome = run_generation(service.as_ref(), &request);
            let _ = sender.send(Completion {
                track_id,
                ticket,
                outcome,
            });
        });

        match generation.dispatcher.dispatch(job) {
            Ok(()) => {
                debug!("requested generation for track {} (#{ticket})", track.id);
                let _ = self.in_flight.insert(
                    track.id.clone(),
                    InFlight {
                        ticket,
                        started_at: self.clock.now(),
                    },
                );
                let _ = self.failed.remove(&track.id);
                self.stats.requests_issued += 1;
            }
            Err(error) => {
                warn!("generation for track {} not scheduled: {error}", track.id);
                let _ = self.failed.insert(track.id.clone());
                self.stats.failures += 1;
            }
        }
    }

    fn complete(&mut self, completion: Completion, active: Option<&TrackId>) -> Option<MapUpgrade> {
        let Completion {
            track_id,
            ticket,
            outcome,
        } = completion;

        let current = self.in_flight.get(&track_id).map(|request| request.ticket);
        if current != Some(ticket) {
            debug!("discarding stale generation #{ticket} for track {track_id}");
            self.stats.stale_results += 1;
            return None;
        }
        let _ = self.in_flight.remove(&track_id);

        match outcome {
            Ok(mut map) => {
                map.track_id = track_id.clone();
                map.version = MapVersion::Generated;
                let map = Arc::new(map);
                self.store(track_id.clone(), Arc::clone(&map));
                let _ = self.failed.remove(&track_id);
                self.stats.generated += 1;

                if active == Some(&track_id) {
                    info!("generated map ready for active track {track_id}");
                    Some(MapUpgrade { track_id, map })
                } else {
                    info!("generated map cached for inactive track {track_id}");
                    None
                }
            }
            Err(error) => {
                warn!("generation for track {track_id} failed, keeping fallback: {error}");
                let _ = self.failed.insert(track_id);
                self.stats.failures += 1;
                None
            }
        }
    }

    fn abandon_overdue(&mut self, now: Duration) {
        let budget = self.config.generation_budget;
        let overdue: Vec<TrackId> = self
            .in_flight
            .iter()
            .filter(|(_, request)| now.saturating_sub(request.started_at) > budget)
            .map(|(track_id, _)| track_id.clone())
            .collect();
        for track_id in overdue {
            warn!("generation for track {track_id} exceeded its budget, keeping fallback");
            let _ = self.in_flight.remove(&track_id);
            let _ = self.failed.insert(track_id);
            self.stats.failures += 1;
        }
    }

    fn store(&mut self, track_id: TrackId, map: Arc<SongMap>) {
        if let Some(evicted) = self.cache.insert(track_id, map, self.clock.now()) {
            debug!("evicted map of track {evicted}");
            self.stats.evictions += 1;
        }
    }
}

fn run_generation(
    service: &dyn GenerationService,
    request: &GenerationRequest,
) -> Result<SongMap, GenerationError> {
    let payload = panic::catch_unwind(AssertUnwindSafe(|| service.generate(request)))
        .map_err(|panic| GenerationError::Panicked(panic_message(panic.as_ref())))??;
    let theme = visual_theme(request.track());
    let map = wire::decode_map(&payload, request.track(), theme)?;
    Ok(validate(map))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_messages_are_extracted() {
        let caught = panic::catch_unwind(|| panic!("boom")).expect_err("closure panics");
        assert_eq!(panic_message(caught.as_ref()), "boom");

        let caught =
            panic::catch_unwind(|| panic!("{} {}", "formatted", 7)).expect_err("closure panics");
        assert_eq!(panic_message(caught.as_ref()), "formatted 7");
    }

    #[test]
    fn default_config_matches_session_tuning() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.generation_budget, Duration::from_secs(30));
    }
}
