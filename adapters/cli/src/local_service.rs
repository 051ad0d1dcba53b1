use std::{
    sync::{Mutex, PoisonError},
    thread,
    time::Duration,
};

use pulse_runner_system_orchestrator::{
    wire, GenerationError, GenerationRequest, GenerationService,
};
use pulse_runner_system_parameters::visual_theme;
use pulse_runner_system_templates::compose_variation;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// In-process stand-in for the remote map composer.
///
/// Answers with a reference variation in the wire format, after an optional
/// delay, and drops a configurable share of requests.
#[derive(Debug)]
pub(crate) struct LocalComposer {
    latency: Duration,
    failure_rate: f32,
    rng: Mutex<ChaCha8Rng>,
}

impl LocalComposer {
    pub(crate) fn new(latency: Duration, failure_rate: f32, seed: u64) -> Self {
        Self {
            latency,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl GenerationService for LocalComposer {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let roll: f32 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen();
        if roll < self.failure_rate {
            return Err(GenerationError::Transport(format!(
                "local composer dropped the request for {}",
                request.track().id
            )));
        }

        let track = request.track();
        let map = compose_variation(request.reference(), track, visual_theme(track));
        let payload = wire::encode_map(&map)?;
        Ok(format!("Level for \"{}\":\n{payload}\n", track.name))
    }
}
