//! Jobs and the handlers that process them.
//!
//! A [`Job`] is an opaque string payload. Workers hand every job they pull off
//! the queue to the pool's [`JobHandler`] and wait for it to finish before
//! looking for more work, so a handler bounds how quickly a worker can react to
//! cancellation.

use crate::WorkerId;
use core::{future::Future, time::Duration};

/// Payload submitted to the pool.
pub type Job = String;

/// Default latency of [`SimulatedWork`].
pub const DEFAULT_JOB_LATENCY: Duration = Duration::from_millis(500);

/// Processes a single job on behalf of a worker.
///
/// Handlers have no failure path: a job is considered done once the returned
/// future resolves. A handler that panics takes its worker down with it (the
/// worker still deregisters itself), but leaves the rest of the pool alone.
///
/// Any `Fn(WorkerId, Job) -> impl Future<Output = ()>` closure is a handler.
pub trait JobHandler: Send + Sync + 'static {
    fn handle(&self, worker: WorkerId, job: Job) -> impl Future<Output = ()> + Send;
}

impl<F, Fut> JobHandler for F
where
    F: Fn(WorkerId, Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    fn handle(&self, worker: WorkerId, job: Job) -> impl Future<Output = ()> + Send {
        self(worker, job)
    }
}

/// Stand-in for real work: sleeps for a fixed latency per job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatedWork {
    latency: Duration,
}

impl SimulatedWork {
    pub const fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub const fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_LATENCY)
    }
}

impl JobHandler for SimulatedWork {
    async fn handle(&self, _worker: WorkerId, _job: Job) {
        tokio::time::sleep(self.latency).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn simulated_work_sleeps_for_latency() {
        let work = SimulatedWork::new(Duration::from_millis(250));
        let start = Instant::now();
        work.handle(WorkerId::new(0), "Task 0".into()).await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn default_latency_matches_constant() {
        assert_eq!(SimulatedWork::default().latency(), DEFAULT_JOB_LATENCY);
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let handler = {
            let seen = Arc::clone(&seen);
            move |worker: WorkerId, job: Job| {
                let seen = Arc::clone(&seen);
                async move { seen.lock().push((worker, job)) }
            }
        };

        handler.handle(WorkerId::new(3), "Task 7".into()).await;
        assert_eq!(*seen.lock(), vec![(WorkerId::new(3), "Task 7".to_string())]);
    }
}
