//! Ally Core
//!
//! Core types shared by the accessibility-audit agent and its HTTP client.
//!
//! This crate contains:
//! - Domain types: Jobs and the reports produced by running them
//! - DTOs: Job-server payloads and their classification

pub mod domain;
pub mod dto;
