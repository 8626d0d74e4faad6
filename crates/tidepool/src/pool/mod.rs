//! Worker pool with per-worker cancellation and coordinated shutdown.
//!
//! ## Submodules
//!
//! - [`manager`] - The [`Pool`]: registry, queue, and shutdown sequencing.
//! - [`worker`] - Worker identity, cancellation handle, and the run loop.
//!
//! ## Worker lifecycle
//!
//! `Starting -> Running -> Stopping -> Stopped`. A worker is registered and
//! counted before [`Pool::add_worker`] returns, runs until its own token is
//! cancelled or the queue is closed and empty, and deregisters itself through
//! a drop guard on every exit path.

pub mod manager;
pub mod worker;


pub use manager::Pool;
pub use worker::WorkerId;
