//! Service layer
//!
//! Services are the agent's external capabilities: running a job's checks
//! and delivering the resulting report. The job runner only sees the
//! traits, so either capability can be replaced without touching the
//! scheduling code.

mod checks;
mod reports;

// Re-export traits
pub use checks::CheckService;
pub use reports::ReportService;

// Re-export implementations
pub use checks::CommandCheckService;
pub use reports::StandardReportService;
