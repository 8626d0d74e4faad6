//! The scripted caller that drives a [`tidepool::Pool`].
//!
//! ## Structure
//!
//! - [`config`] - CLI/env settings and their validation.
//! - [`scenario`] - The add/submit/remove walkthrough.
//! - [`telemetry`] - Log subscriber setup.

pub mod config;
pub mod scenario;
pub mod telemetry;
