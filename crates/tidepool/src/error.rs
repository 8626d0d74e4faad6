//! Error types for the worker pool.
//!
//! Every error here is local to the call that produced it: nothing crosses the
//! worker/caller boundary asynchronously, and job execution itself has no
//! failure path.
//!
//! ## Error Cases
//! - `QueueFull`: the bounded job queue is at capacity.
//! - `PoolClosed`: a job was submitted after shutdown closed the queue.
//! - `InvalidConfig`: a [`PoolConfig`] was built with unusable values.
//!
//! [`PoolConfig`]: crate::PoolConfig

use crate::Job;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for the pool.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The queue is at capacity. The rejected job is handed back so the
    /// caller can retry later or drop it.
    #[error("Job queue is full")]
    QueueFull { job: Job },

    /// The pool has begun shutting down and no longer accepts jobs.
    #[error("Pool is shut down")]
    PoolClosed { job: Job },

    /// The configuration cannot be used to build a pool.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Recovers the payload of a rejected submission, if there is one.
    pub fn into_job(self) -> Option<Job> {
        match self {
            Self::QueueFull { job } | Self::PoolClosed { job } => Some(job),
            Self::InvalidConfig { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_job_is_recoverable() {
        let err = Error::QueueFull {
            job: "Task 0".to_string(),
        };
        assert_eq!(err.to_string(), "Job queue is full");
        assert_eq!(err.into_job().as_deref(), Some("Task 0"));

        let err = Error::PoolClosed {
            job: "Task 1".to_string(),
        };
        assert_eq!(err.into_job().as_deref(), Some("Task 1"));
    }

    #[test]
    fn config_error_has_no_job() {
        let err = Error::InvalidConfig {
            reason: "buffer_size must be greater than 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid config: buffer_size must be greater than 0"
        );
        assert!(err.into_job().is_none());
    }
}
