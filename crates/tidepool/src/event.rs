//! Observable lifecycle notifications.
//!
//! The pool broadcasts a [`PoolEvent`] every time a worker starts, picks up a
//! job, or stops, and for every job shutdown had to throw away. Subscribers get
//! their own receiver via [`Pool::subscribe`]; events emitted while nobody is
//! subscribed are dropped.
//!
//! [`Pool::subscribe`]: crate::Pool::subscribe

use crate::{Job, WorkerId};
use core::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    /// The worker entered its run loop.
    Started { worker: WorkerId },
    /// The worker took `job` off the queue and is about to process it.
    Processing { worker: WorkerId, job: Job },
    /// The worker exited and has been removed from the registry.
    Stopped { worker: WorkerId, reason: StopReason },
    /// Shutdown found `job` still queued with no worker left to run it.
    Discarded { job: Job },
}

impl PoolEvent {
    /// The worker this event is about, if any.
    pub const fn worker(&self) -> Option<WorkerId> {
        match self {
            Self::Started { worker }
            | Self::Processing { worker, .. }
            | Self::Stopped { worker, .. } => Some(*worker),
            Self::Discarded { .. } => None,
        }
    }
}

/// Why a worker left its run loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// Its own cancellation fired outside of shutdown.
    Cancelled,
    /// The queue was closed and had nothing left for it.
    QueueClosed,
    /// The job handler panicked.
    Panicked,
    /// The task was dropped before its loop finished, for instance because
    /// the runtime shut down underneath it.
    Aborted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::QueueClosed => write!(f, "queue closed"),
            Self::Panicked => write!(f, "panicked"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}
