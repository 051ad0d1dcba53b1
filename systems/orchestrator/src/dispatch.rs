use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use crate::GenerationError;

/// Unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs generation jobs away from the frame loop.
pub trait Dispatcher {
    /// Schedules the job. Returning an error means the job will never run.
    fn dispatch(&self, job: Job) -> Result<(), GenerationError>;
}

/// Runs every job on its own named OS thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadDispatcher;

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), GenerationError> {
        thread::Builder::new()
            .name("map-generation".to_owned())
            .spawn(job)
            .map(drop)
            .map_err(|error| GenerationError::Dispatch(error.to_string()))
    }
}

/// Queues jobs until the owner runs them explicitly.
///
/// Clones share one queue, so a test can hand one clone to the orchestrator
/// and resolve requests through another.
#[derive(Clone, Default)]
pub struct ManualDispatcher {
    queue: Arc<Mutex<VecDeque<Job>>>,
}

impl ManualDispatcher {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Runs the oldest queued job. Returns `false` when the queue was empty.
    pub fn run_next(&self) -> bool {
        let job = self.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs queued jobs until the queue is empty and returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ManualDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualDispatcher")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Dispatcher for ManualDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), GenerationError> {
        self.lock().push_back(job);
        Ok(())
    }
}
