//! Core domain types
//!
//! This module contains the core domain structures used across Ally crates.
//! Jobs are produced by external submitters (queue files or job servers) and
//! consumed by the agent; reports are produced by the agent and delivered to
//! the destination a job names.

pub mod job;
pub mod report;
