//! Server rotation policy
//!
//! Job servers are polled in a cyclic order fixed once per session by a
//! random shuffle, so that sessions do not all start with the same server.
//! A counter of consecutive unproductive polls tells the watcher when a full
//! cycle has found nothing anywhere and it is time for the long wait.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::AgentError;

/// How long to wait before the next poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Still sweeping the current cycle: short inter-server delay
    Sweep,
    /// A whole cycle came back empty: idle interval
    Idle,
}

/// Cyclic traversal state over job-server endpoints
#[derive(Debug, Clone)]
pub struct Rotation {
    endpoints: Vec<String>,
    cursor: usize,
    no_job_count: usize,
}

impl Rotation {
    /// Creates a rotation in the given order
    pub fn new(endpoints: Vec<String>) -> Result<Self, AgentError> {
        if endpoints.is_empty() {
            return Err(AgentError::Configuration(
                "rotation needs at least one job server".to_string(),
            ));
        }
        Ok(Self {
            endpoints,
            cursor: 0,
            no_job_count: 0,
        })
    }

    /// Creates a rotation over a uniformly shuffled copy of `endpoints`
    pub fn shuffled<G: Rng + ?Sized>(
        mut endpoints: Vec<String>,
        rng: &mut G,
    ) -> Result<Self, AgentError> {
        endpoints.shuffle(rng);
        Self::new(endpoints)
    }

    /// Returns the endpoint at the cursor and moves the cursor on
    pub fn advance(&mut self) -> &str {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.endpoints.len();
        &self.endpoints[index]
    }

    /// Counts a poll that produced no job
    pub fn record_no_job(&mut self) {
        self.no_job_count += 1;
    }

    /// Wait tier for the next poll
    pub fn backoff(&self) -> Backoff {
        if self.no_job_count >= self.endpoints.len() {
            Backoff::Idle
        } else {
            Backoff::Sweep
        }
    }

    /// Starts a fresh cycle count, after the idle wait or after a job ran
    pub fn reset(&mut self) {
        self.no_job_count = 0;
    }

    /// Endpoints in rotation order
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    #[cfg(test)]
    pub fn no_job_count(&self) -> usize {
        self.no_job_count
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn servers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://s{}.test/job", i)).collect()
    }

    #[test]
    fn test_empty_rotation_rejected() {
        assert!(matches!(
            Rotation::new(Vec::new()),
            Err(AgentError::Configuration(_))
        ));
    }

    #[test]
    fn test_advance_wraps() {
        let mut rotation = Rotation::new(servers(3)).unwrap();
        let visited: Vec<String> = (0..4).map(|_| rotation.advance().to_string()).collect();
        assert_eq!(visited[0], visited[3]);
        assert_eq!(rotation.cursor(), 1);
    }

    #[test]
    fn test_full_cycle_visits_each_endpoint_once_before_idle() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rotation = Rotation::shuffled(servers(5), &mut rng).unwrap();
        let mut seen = HashSet::new();

        while rotation.backoff() == Backoff::Sweep {
            assert!(seen.insert(rotation.advance().to_string()));
            rotation.record_no_job();
        }

        assert_eq!(seen.len(), 5);
        assert_eq!(rotation.no_job_count(), 5);
        rotation.reset();
        assert_eq!(rotation.backoff(), Backoff::Sweep);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let rotation = Rotation::shuffled(servers(8), &mut rng).unwrap();
        let mut sorted = rotation.endpoints().to_vec();
        sorted.sort();
        let mut expected = servers(8);
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
