#![doc = include_str!("../README.md")]

mod config;
mod error;
mod event;
mod job;
mod pool;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::event::*;
pub use crate::job::*;
pub use crate::pool::{Pool, WorkerId};
