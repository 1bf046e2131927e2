//! Scheduler layer for the agent
//!
//! This layer decides when to look for work and drives each job found to
//! completion. Exactly one poll or one job is in progress at any time.

pub mod rotation;
pub mod runner;
pub mod watcher;

pub use rotation::{Backoff, Rotation};
pub use runner::{JobOutcome, JobRunner};
pub use watcher::{Repeat, Watcher};
