//! The [`Pool`]: worker registry, bounded job queue, and shutdown sequencing.
//!
//! Workers are Tokio tasks pulling from one shared bounded queue. Each worker
//! owns a private [`CancellationToken`] so it can be stopped without touching
//! its siblings, and removes itself from the registry on the way out.
//! A [`TaskTracker`] counts the workers that have been started but not yet
//! fully exited; shutdown waits on it.

use super::worker::{
    ExitGuard, JobQueue, SharedQueue, WorkerContext, WorkerHandle, WorkerId, worker_loop,
};
use crate::{
    DEFAULT_EVENT_CAPACITY, Error, Job, JobHandler, PoolConfig, PoolEvent, Result, SimulatedWork,
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};
use tokio::{
    runtime::Handle,
    sync::{broadcast, mpsc, mpsc::error::TrySendError},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Live workers plus the id counter, guarded together by one lock.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    workers: BTreeMap<WorkerId, WorkerHandle>,
    next_id: u64,
}

impl Registry {
    /// Allocates the next id and stores a fresh handle for it. Returns the
    /// worker's own copy of the handle.
    fn register(&mut self) -> WorkerHandle {
        let id = WorkerId::new(self.next_id);
        self.next_id += 1;

        let handle = WorkerHandle::new(id);
        self.workers.insert(id, handle.clone());
        handle
    }

    pub(crate) fn remove(&mut self, id: WorkerId) -> Option<WorkerHandle> {
        self.workers.remove(&id)
    }

    fn get(&self, id: WorkerId) -> Option<&WorkerHandle> {
        self.workers.get(&id)
    }

    fn handles(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.workers.values()
    }

    fn ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.workers.keys().copied()
    }

    fn len(&self) -> usize {
        self.workers.len()
    }
}

/// A dynamically resizable pool of workers fed by a bounded job queue.
///
/// Workers can be added and removed at any time. Jobs are submitted without
/// ever blocking: a full queue rejects the job instead. [`Pool::shutdown`]
/// closes the queue, lets the workers finish everything already queued, and
/// returns once every worker has exited.
///
/// Dropping a pool without calling `shutdown` closes the queue as well; the
/// workers then drain it and exit on their own, but nobody waits for them.
pub struct Pool<H = SimulatedWork> {
    registry: Arc<Mutex<Registry>>,
    // `None` once shutdown has closed the queue.
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    queue: SharedQueue,
    closing: CancellationToken,
    tracker: TaskTracker,
    handler: Arc<H>,
    events: broadcast::Sender<PoolEvent>,
    runtime: Handle,
    capacity: usize,
}

impl Pool<SimulatedWork> {
    /// Creates a pool whose queue holds at most `buffer_size` jobs and whose
    /// workers run [`SimulatedWork`] with its default latency.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is zero, or if called outside of a Tokio
    /// runtime.
    pub fn new(buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than 0");
        Self::build(buffer_size, DEFAULT_EVENT_CAPACITY, SimulatedWork::default())
    }
}

impl<H: JobHandler> Pool<H> {
    /// Creates a pool from a validated [`PoolConfig`] whose workers hand every
    /// job to `handler`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn with_handler(config: PoolConfig, handler: H) -> Self {
        Self::build(config.buffer_size(), config.event_capacity(), handler)
    }

    fn build(buffer_size: usize, event_capacity: usize, handler: H) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        let (events, _) = broadcast::channel(event_capacity);

        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            sender: Mutex::new(Some(tx)),
            queue: Arc::new(JobQueue::new(rx)),
            closing: CancellationToken::new(),
            tracker: TaskTracker::new(),
            handler: Arc::new(handler),
            events,
            runtime: Handle::current(),
            capacity: buffer_size,
        }
    }

    /// Starts a new worker and returns its id without waiting for it to run.
    ///
    /// By the time this returns the worker is registered and counted, so a
    /// subsequent [`Pool::shutdown`] is guaranteed to wait for it.
    ///
    /// Adding a worker after shutdown is tolerated: the worker finds the queue
    /// closed and stops right away.
    pub fn add_worker(&self) -> WorkerId {
        let mut registry = self.registry.lock();
        let handle = registry.register();
        let live = self.tracker.token();
        drop(registry);

        let id = handle.id();
        let ctx = WorkerContext {
            handle,
            closing: self.closing.clone(),
            queue: Arc::clone(&self.queue),
            handler: Arc::clone(&self.handler),
            exit: ExitGuard::new(id, Arc::clone(&self.registry), self.events.clone(), live),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Worker {id} registered");

        self.runtime.spawn(worker_loop(ctx));
        id
    }

    /// Asks worker `id` to stop after its current job, if it has one.
    ///
    /// Unknown or already stopped ids are ignored. Does not wait: the worker
    /// removes itself from the registry once it actually exits. Returns whether
    /// a registered worker was signalled.
    ///
    /// A removed worker always stops with [`StopReason::Cancelled`]. If
    /// shutdown begins before it gets to stop, it leaves the queue to the
    /// remaining workers instead of draining it.
    ///
    /// [`StopReason::Cancelled`]: crate::StopReason::Cancelled
    pub fn remove_worker(&self, id: WorkerId) -> bool {
        let registry = self.registry.lock();
        match registry.get(id) {
            Some(handle) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Cancelling worker {id}");
                handle.remove();
                true
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::trace!("Ignoring removal of unknown worker {id}");
                false
            }
        }
    }

    /// Queues `job` without blocking.
    ///
    /// # Errors
    ///
    /// - [`Error::QueueFull`] if the queue is at capacity.
    /// - [`Error::PoolClosed`] if [`Pool::shutdown`] has already closed the
    ///   queue.
    ///
    /// Both hand the job back.
    pub fn send_job(&self, job: impl Into<Job>) -> Result<()> {
        let job = job.into();
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Err(Error::PoolClosed { job });
        };

        self.queue.reserve();
        tx.try_send(job).map_err(|e| {
            self.queue.unreserve();
            match e {
                TrySendError::Full(job) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Rejecting job {job}: queue is full");
                    Error::QueueFull { job }
                }
                TrySendError::Closed(job) => Error::PoolClosed { job },
            }
        })
    }

    /// Closes the queue, stops every worker, and waits until all of them have
    /// exited.
    ///
    /// Jobs already queued are still run: a worker told to stop while the pool
    /// is closing first drains the queue. A job can only be left behind if no
    /// worker is alive to take it; such jobs are reported as
    /// [`PoolEvent::Discarded`].
    ///
    /// Running jobs are never interrupted, so this can take as long as the
    /// slowest job in flight plus the time to drain the buffer. Calling it
    /// again is a no-op that returns once the pool is empty.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "pool_shutdown"))]
    pub async fn shutdown(&self) {
        // === Phase 1: Close the job queue ===
        let _was_open = self.sender.lock().take().is_some();
        self.closing.cancel();
        #[cfg(feature = "tracing")]
        {
            if _was_open {
                tracing::info!("Job queue closed");
            } else {
                tracing::debug!("Job queue already closed");
            }
        }

        // === Phase 2: Cancel every registered worker ===
        {
            let registry = self.registry.lock();
            #[cfg(feature = "tracing")]
            tracing::info!("Cancelling {} workers", registry.len());
            for handle in registry.handles() {
                handle.cancel();
            }
        }

        // === Phase 3: Wait for every worker to exit ===
        self.tracker.close();
        self.tracker.wait().await;

        // === Phase 4: Report jobs nobody was left to run ===
        self.discard_leftovers().await;

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");
    }

    async fn discard_leftovers(&self) {
        for job in self.queue.take_buffered().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Discarding job {job}: no worker left to run it");
            let _ = self.events.send(PoolEvent::Discarded { job });
        }
    }

    /// Subscribes to worker lifecycle notifications emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.events.subscribe()
    }

    /// Ids of the workers currently registered, in ascending order.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.registry.lock().ids().collect()
    }

    /// Number of workers currently registered.
    pub fn active_workers(&self) -> usize {
        self.registry.lock().len()
    }

    /// Number of jobs waiting in the queue, not counting the ones workers are
    /// already running. Stays accurate while shutdown drains the queue.
    pub fn queued_jobs(&self) -> usize {
        self.queue.len()
    }

    /// Maximum number of jobs the queue holds.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether shutdown has closed the queue.
    pub fn is_closed(&self) -> bool {
        self.closing.is_cancelled()
    }
}
