//! Data Transfer Objects for job-server communication
//!
//! Payloads exchanged with remote job servers and the typed view the agent
//! takes of them.

pub mod job;
