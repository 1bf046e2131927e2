//! Repository layer
//!
//! Repositories are thin wrappers around HTTP communication with job
//! servers. They hold no business logic; the network job source decides what
//! a response means.
//!
//! Repositories are trait-based so the network source can be driven by a
//! scripted fake in tests.

mod job_servers;

pub use job_servers::HttpJobServerRepository;
pub use job_servers::JobServerRepository;
