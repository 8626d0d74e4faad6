use super::manager::Registry;
use crate::{Job, JobHandler, PoolEvent, StopReason};
use core::{
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::{
    sync::{CancellationToken, WaitForCancellationFuture},
    task::task_tracker::TaskTrackerToken,
};

/// Receiving half of the job queue, shared by every worker of a pool.
pub(crate) type SharedQueue = Arc<JobQueue>;

/// The queue's receiver plus a count of the jobs buffered in it.
///
/// The count is kept here rather than derived from the sender so it stays
/// accurate after shutdown has dropped the sender and the workers are still
/// draining.
#[derive(Debug)]
pub(crate) struct JobQueue {
    rx: tokio::sync::Mutex<mpsc::Receiver<Job>>,
    pending: AtomicUsize,
}

impl JobQueue {
    pub(crate) fn new(rx: mpsc::Receiver<Job>) -> Self {
        Self {
            rx: tokio::sync::Mutex::new(rx),
            pending: AtomicUsize::new(0),
        }
    }

    /// Counts a job about to be sent. Must happen before the send so a worker
    /// never takes a job that has not been counted yet.
    pub(crate) fn reserve(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    /// Undoes [`JobQueue::reserve`] for a send that was rejected.
    pub(crate) fn unreserve(&self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits for the next job. `None` once the queue is closed and drained.
    ///
    /// Cancel-safe: dropping this future either never acquired the lock or never
    /// received a job, so losing a `select!` race loses nothing.
    pub(crate) async fn next(&self) -> Option<Job> {
        let job = self.rx.lock().await.recv().await;
        if job.is_some() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
        }
        job
    }

    /// Takes whatever is buffered right now without waiting for more.
    pub(crate) async fn take_buffered(&self) -> Vec<Job> {
        let mut rx = self.rx.lock().await;
        let mut jobs = Vec::new();
        while let Ok(job) = rx.try_recv() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            jobs.push(job);
        }
        jobs
    }
}

/// Identifier of a worker, unique within its [`Pool`] and never reused.
///
/// Ids are handed out in strictly increasing order starting at zero.
///
/// [`Pool`]: crate::Pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry entry for a live worker: its id and its private cancellation
/// token. The worker task holds a clone sharing the same signals.
#[derive(Clone, Debug)]
pub(crate) struct WorkerHandle {
    id: WorkerId,
    cancel: CancellationToken,
    removed: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub(crate) fn new(id: WorkerId) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
            removed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) const fn id(&self) -> WorkerId {
        self.id
    }

    /// Signals this worker, and only this worker, to stop. Safe to call any
    /// number of times, including after the worker has already exited.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Like [`WorkerHandle::cancel`], but also marks the worker as removed:
    /// it will not help drain the queue even if shutdown begins before it
    /// gets around to stopping.
    pub(crate) fn remove(&self) {
        self.removed.store(true, Ordering::Release);
        self.cancel.cancel();
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this worker has been cancelled.
    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

/// Runs when a worker leaves its loop, whichever way it leaves.
///
/// Removes the worker's own registry entry, publishes the stop notification,
/// and only then releases the pool's live-count token (fields drop after
/// `drop` returns), so a finished `shutdown` always sees an empty registry.
///
/// The guard is built before the task is spawned. A task that is dropped
/// without ever being polled still deregisters. The stop reason is only set
/// when the loop ends on its own; otherwise the guard tells an unwinding
/// handler panic apart from a task dropped by its runtime.
pub(crate) struct ExitGuard {
    id: WorkerId,
    registry: Arc<Mutex<Registry>>,
    events: broadcast::Sender<PoolEvent>,
    reason: Option<StopReason>,
    _live: TaskTrackerToken,
}

impl ExitGuard {
    pub(crate) fn new(
        id: WorkerId,
        registry: Arc<Mutex<Registry>>,
        events: broadcast::Sender<PoolEvent>,
        live: TaskTrackerToken,
    ) -> Self {
        Self {
            id,
            registry,
            events,
            reason: None,
            _live: live,
        }
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let reason = self.reason.unwrap_or_else(|| {
            if std::thread::panicking() {
                StopReason::Panicked
            } else {
                StopReason::Aborted
            }
        });
        self.registry.lock().remove(self.id);

        #[cfg(feature = "tracing")]
        {
            match reason {
                StopReason::Panicked => tracing::error!("Worker {} stopped ({reason})", self.id),
                StopReason::Aborted => tracing::warn!("Worker {} stopped ({reason})", self.id),
                StopReason::Cancelled | StopReason::QueueClosed => {
                    tracing::info!("Worker {} stopped ({reason})", self.id);
                }
            }
        }

        let _ = self.events.send(PoolEvent::Stopped {
            worker: self.id,
            reason,
        });
    }
}

/// Everything a worker task owns.
pub(crate) struct WorkerContext<H> {
    pub(crate) handle: WorkerHandle,
    pub(crate) closing: CancellationToken,
    pub(crate) queue: SharedQueue,
    pub(crate) handler: Arc<H>,
    pub(crate) exit: ExitGuard,
}

/// Worker task: consumes jobs from the shared queue until it is cancelled or
/// the queue is closed and empty.
///
/// Each iteration races the worker's own cancellation against the next job
/// without preferring either. Jobs run to completion; cancellation is only
/// observed between jobs, so the longest job bounds how long a stop takes.
///
/// A cancellation that arrives while the pool is closing does not stop the
/// worker outright: the queue is already closed at that point, so the worker
/// keeps taking buffered jobs until none are left and then stops. A worker
/// that was removed before shutdown stops without draining, even if it only
/// notices its cancellation after shutdown has begun.
pub(crate) async fn worker_loop<H: JobHandler>(ctx: WorkerContext<H>) {
    let WorkerContext {
        handle,
        closing,
        queue,
        handler,
        mut exit,
    } = ctx;
    let id = exit.id;

    #[cfg(feature = "tracing")]
    tracing::info!("Worker {id} started");
    let _ = exit.events.send(PoolEvent::Started { worker: id });

    let reason = loop {
        if handle.is_removed() {
            break StopReason::Cancelled;
        }

        tokio::select! {
            () = handle.cancelled() => {
                if handle.is_removed() || !closing.is_cancelled() {
                    break StopReason::Cancelled;
                }

                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {id} draining queue before stopping");
                while let Some(job) = queue.next().await {
                    process(id, job, &*handler, &exit.events).await;
                    if handle.is_removed() {
                        break;
                    }
                }
                break if handle.is_removed() {
                    StopReason::Cancelled
                } else {
                    StopReason::QueueClosed
                };
            }
            job = queue.next() => match job {
                Some(job) => process(id, job, &*handler, &exit.events).await,
                None => break StopReason::QueueClosed,
            },
        }
    };
    exit.reason = Some(reason);
}

async fn process<H: JobHandler>(
    id: WorkerId,
    job: Job,
    handler: &H,
    events: &broadcast::Sender<PoolEvent>,
) {
    #[cfg(feature = "tracing")]
    tracing::info!("Worker {id} processing job: {job}");
    let _ = events.send(PoolEvent::Processing {
        worker: id,
        job: job.clone(),
    });

    handler.handle(id, job).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_id_orders_and_displays_raw_value() {
        assert!(WorkerId::new(1) < WorkerId::new(2));
        assert_eq!(WorkerId::new(42).get(), 42);
        assert_eq!(WorkerId::new(7).to_string(), "7");
    }

    #[test]
    fn cancel_is_idempotent() {
        let handle = WorkerHandle::new(WorkerId::new(0));
        let worker_side = handle.clone();
        assert!(!worker_side.is_cancelled());

        handle.cancel();
        handle.cancel();
        assert!(worker_side.is_cancelled());
        assert!(handle.is_cancelled());
        assert!(!worker_side.is_removed());
    }

    #[test]
    fn remove_cancels_and_marks_removed() {
        let handle = WorkerHandle::new(WorkerId::new(3));
        let worker_side = handle.clone();

        handle.remove();
        assert!(worker_side.is_cancelled());
        assert!(worker_side.is_removed());
    }

    #[tokio::test]
    async fn queue_count_tracks_buffered_jobs() {
        let (tx, rx) = mpsc::channel(4);
        let queue = JobQueue::new(rx);

        for job in ["a", "b", "c"] {
            queue.reserve();
            tx.try_send(job.into()).expect("queue has room");
        }
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.next().await.as_deref(), Some("a"));
        assert_eq!(queue.len(), 2);

        drop(tx);
        assert_eq!(queue.take_buffered().await, vec!["b", "c"]);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.next().await, None);
    }

    #[test]
    fn cancelling_one_handle_leaves_others_alone() {
        let a = WorkerHandle::new(WorkerId::new(0));
        let b = WorkerHandle::new(WorkerId::new(1));

        a.cancel();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert_eq!(b.id(), WorkerId::new(1));
    }
}
