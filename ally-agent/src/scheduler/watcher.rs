//! Watch loop
//!
//! Ties job sources, waiting and the job runner together. Each iteration
//! polls once, runs what it found, then decides whether and when to poll
//! again. The loops are plain `loop`s with an explicit `sleep` at every wait,
//! so a session that runs forever holds a constant amount of state.

use ally_core::dto::job::PollOutcome;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AgentError;
use crate::repository::JobServerRepository;
use crate::scheduler::{Backoff, JobOutcome, JobRunner, Rotation};
use crate::source::{DirectorySource, JobSource, NetworkSource};

/// Whether a directory watch checks once or keeps checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Check once and stop
    Once,
    /// Check, wait this long, check again, forever
    Every(Duration),
}

impl Repeat {
    /// Maps a command-line interval in seconds; any negative value means once
    pub fn from_interval(seconds: i64) -> Self {
        match u64::try_from(seconds) {
            Ok(secs) => Self::Every(Duration::from_secs(secs)),
            Err(_) => Self::Once,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Once => "once".to_string(),
            Self::Every(interval) => {
                format!("repeatedly, with {}-second intervals", interval.as_secs())
            }
        }
    }
}

/// Counters for a finished watch session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub polls: usize,
    pub jobs_run: usize,
    pub jobs_failed: usize,
}

impl WatchSummary {
    fn record(&mut self, outcome: &JobOutcome) {
        self.jobs_run += 1;
        if !outcome.is_completed() {
            self.jobs_failed += 1;
        }
    }
}

/// The agent's top-level control loop
pub struct Watcher {
    config: Config,
    runner: JobRunner,
}

impl Watcher {
    /// Creates a watcher for one configuration
    pub fn new(config: Config, runner: JobRunner) -> Self {
        Self { config, runner }
    }

    /// Watches the configured queue directory
    pub async fn start_directory(&self, repeat: Repeat) -> WatchSummary {
        let mut source = DirectorySource::new(self.config.todo_dir(), self.config.done_dir());
        self.watch_directory(&mut source, repeat).await
    }

    /// Watches the configured job servers
    ///
    /// Fails with `AgentError::Configuration`, before any request is sent,
    /// when the job-server list is empty or holds a malformed URL.
    pub async fn start_network<R: JobServerRepository>(
        &self,
        repository: R,
        forever: bool,
    ) -> Result<WatchSummary, AgentError> {
        let endpoints = self.config.endpoints()?;
        let rotation = Rotation::shuffled(endpoints, &mut rand::rng())?;
        let mut source = NetworkSource::new(repository, rotation);
        Ok(self.watch_network(&mut source, forever).await)
    }

    /// Polls a directory-style source once or repeatedly
    ///
    /// Returns only in `Repeat::Once` mode.
    pub async fn watch_directory<S: JobSource>(
        &self,
        source: &mut S,
        repeat: Repeat,
    ) -> WatchSummary {
        info!(
            "Directory watching of {} started {}",
            source.describe(),
            repeat.describe()
        );
        let mut summary = WatchSummary::default();

        loop {
            summary.polls += 1;
            match source.poll().await {
                Ok(PollOutcome::JobFound(job)) => {
                    info!("Directory job {} found", job.id);
                    let outcome = self.runner.run(&job, &mut *source).await;
                    summary.record(&outcome);
                }
                Ok(PollOutcome::NoJob(_)) => {
                    info!("No job to do in {}", source.describe());
                }
                Ok(PollOutcome::InvalidResponse(reason)) => {
                    warn!("Invalid job in {}: {}", source.describe(), reason);
                }
                Err(e) => {
                    error!("Directory watching failed: {}", e);
                }
            }

            match repeat {
                Repeat::Once => return summary,
                Repeat::Every(interval) => time::sleep(interval).await,
            }
        }
    }

    /// Polls job servers in rotation
    ///
    /// Waits the short inter-server delay before each poll, or the idle
    /// interval once a whole cycle has come back without a job. Returns after
    /// the first job unless `forever` is set.
    pub async fn watch_network<R: JobServerRepository>(
        &self,
        source: &mut NetworkSource<R>,
        forever: bool,
    ) -> WatchSummary {
        info!(
            "Network watching of {} started {}",
            source.describe(),
            if forever {
                format!(
                    "repeatedly, with {}-second intervals",
                    self.config.idle_interval.as_secs()
                )
            } else {
                "until one job is done".to_string()
            }
        );
        let mut summary = WatchSummary::default();

        loop {
            match source.rotation().backoff() {
                Backoff::Idle => {
                    info!(
                        "No job on any server; waiting {:?}",
                        self.config.idle_interval
                    );
                    time::sleep(self.config.idle_interval).await;
                    source.rotation_mut().reset();
                }
                Backoff::Sweep => time::sleep(self.config.server_delay).await,
            }

            summary.polls += 1;
            let job = match source.poll().await {
                Ok(PollOutcome::JobFound(job)) => job,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Poll failed: {}", e);
                    continue;
                }
            };

            let outcome = self.runner.run(&job, &mut *source).await;
            summary.record(&outcome);

            if !forever {
                info!("Network watching ended after 1 job");
                return summary;
            }
            source.rotation_mut().reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::runner::fakes::{FakeChecks, FakeReports};
    use ally_client::ClientError;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    const MESSAGE: &str = r#"{"message":"none"}"#;
    const JOB: &str = r#"{"id":"j1","sources":{"sendReportTo":"http://reports.test/in"}}"#;

    /// Scripted job servers; unscripted polls answer with a message
    #[derive(Clone, Default)]
    struct FakeServers {
        scripts: Arc<Mutex<HashMap<String, VecDeque<Result<String, u16>>>>>,
        requests: Arc<Mutex<Vec<(String, Instant)>>>,
        rejections: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeServers {
        fn script(&self, endpoint: &str, replies: &[Result<&str, u16>]) {
            self.scripts.lock().unwrap().insert(
                endpoint.to_string(),
                replies.iter().map(|r| r.map(str::to_string)).collect(),
            );
        }

        fn requests(&self) -> Vec<(String, Instant)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobServerRepository for FakeServers {
        async fn request_job(&self, endpoint: &str) -> Result<String, ClientError> {
            self.requests
                .lock()
                .unwrap()
                .push((endpoint.to_string(), Instant::now()));
            let reply = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(endpoint)
                .and_then(VecDeque::pop_front);
            match reply {
                Some(Ok(body)) => Ok(body),
                Some(Err(status)) => Err(ClientError::api_error(status, "down")),
                None => Ok(MESSAGE.to_string()),
            }
        }

        async fn report_invalid(&self, endpoint: &str, message: &str) -> Result<(), ClientError> {
            self.rejections
                .lock()
                .unwrap()
                .push((endpoint.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct Harness {
        watcher: Watcher,
        checks: Arc<FakeChecks>,
        reports: Arc<FakeReports>,
    }

    fn harness(config: Config) -> Harness {
        let checks = Arc::new(FakeChecks::default());
        let reports = Arc::new(FakeReports::default());
        let runner = JobRunner::new(checks.clone(), reports.clone(), "agent-1".to_string(), false);
        Harness {
            watcher: Watcher::new(config, runner),
            checks,
            reports,
        }
    }

    fn assert_waited(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(100),
            "waited {:?}, expected {:?}",
            actual,
            expected
        );
    }

    fn network(servers: &FakeServers, endpoints: &[&str]) -> NetworkSource<FakeServers> {
        let rotation = Rotation::new(endpoints.iter().map(|e| e.to_string()).collect()).unwrap();
        NetworkSource::new(servers.clone(), rotation)
    }

    #[test]
    fn test_repeat_from_interval() {
        assert_eq!(Repeat::from_interval(-1), Repeat::Once);
        assert_eq!(
            Repeat::from_interval(0),
            Repeat::Every(Duration::from_secs(0))
        );
        assert_eq!(
            Repeat::from_interval(300),
            Repeat::Every(Duration::from_secs(300))
        );
    }

    #[tokio::test]
    async fn test_directory_once_without_jobs_runs_nothing() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("todo")).unwrap();
        fs::write(root.path().join("todo/readme.txt"), "not a job").unwrap();
        let h = harness(Config::new("agent-1".to_string(), root.path().to_path_buf()));

        let summary = h.watcher.start_directory(Repeat::Once).await;

        assert_eq!(summary.polls, 1);
        assert_eq!(summary.jobs_run, 0);
        assert!(h.checks.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_directory_once_runs_and_archives_job() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("todo")).unwrap();
        fs::write(
            root.path().join("todo/a.json"),
            r#"{"id":"j1","sources":{"sendReportTo":"r"}}"#,
        )
        .unwrap();
        let h = harness(Config::new("agent-1".to_string(), root.path().to_path_buf()));

        let summary = h.watcher.start_directory(Repeat::Once).await;

        assert_eq!(summary.jobs_run, 1);
        assert_eq!(summary.jobs_failed, 0);
        assert_eq!(h.checks.job_ids(), vec!["j1".to_string()]);
        let todo: Vec<_> = fs::read_dir(root.path().join("todo"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(!todo.iter().any(|name| name == "a.json"));
        assert!(root.path().join("done/a.json").exists());
    }

    #[tokio::test]
    async fn test_directory_once_survives_unreadable_queue() {
        let root = tempfile::tempdir().unwrap();
        let h = harness(Config::new("agent-1".to_string(), root.path().join("missing")));

        let summary = h.watcher.start_directory(Repeat::Once).await;

        assert_eq!(summary.polls, 1);
        assert_eq!(summary.jobs_run, 0);
    }

    #[tokio::test]
    async fn test_directory_repeat_drains_queue_past_bad_file() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("todo")).unwrap();
        for (file, body) in [
            ("1.json", r#"{"id":"j1","sources":{"sendReportTo":"r"}}"#),
            ("2.json", "{broken"),
            ("3.json", r#"{"id":"j3","sources":{"sendReportTo":"r"}}"#),
        ] {
            fs::write(root.path().join("todo").join(file), body).unwrap();
        }
        let h = harness(Config::new("agent-1".to_string(), root.path().to_path_buf()));

        let done = root.path().join("done");
        let drained = async {
            while !(done.join("1.json").exists() && done.join("3.json").exists()) {
                time::sleep(Duration::from_millis(10)).await;
            }
        };

        tokio::select! {
            _ = h.watcher.start_directory(Repeat::Every(Duration::from_millis(10))) => {
                panic!("repeating watch returned");
            }
            drained = time::timeout(Duration::from_secs(30), drained) => {
                assert!(drained.is_ok(), "queue not drained");
            }
        }

        assert_eq!(h.checks.job_ids(), vec!["j1".to_string(), "j3".to_string()]);
        assert!(root.path().join("done/1.json").exists());
        assert!(root.path().join("done/3.json").exists());
        assert!(root.path().join("todo/2.json").exists());
    }

    #[tokio::test]
    async fn test_network_aborts_on_malformed_endpoint() {
        let servers = FakeServers::default();
        let config = Config::default().with_job_urls("http://s1.test/job+s2.test/job");
        let h = harness(config);

        let result = h.watcher.start_network(servers.clone(), true).await;

        assert!(matches!(result, Err(AgentError::Configuration(_))));
        assert!(servers.requests().is_empty());
    }

    #[tokio::test]
    async fn test_network_aborts_on_empty_endpoint_list() {
        let servers = FakeServers::default();
        let h = harness(Config::default());

        let result = h.watcher.start_network(servers.clone(), false).await;

        assert!(matches!(result, Err(AgentError::Configuration(_))));
        assert!(servers.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_once_stops_after_first_job() {
        let servers = FakeServers::default();
        servers.script("http://s1.test/job", &[Ok(JOB), Ok(JOB)]);
        servers.script("http://s2.test/job", &[Ok(JOB), Ok(JOB)]);
        let config = Config::default().with_job_urls("http://s1.test/job+http://s2.test/job");
        let h = harness(config);

        let summary = h
            .watcher
            .start_network(servers.clone(), false)
            .await
            .unwrap();

        assert_eq!(summary.polls, 1);
        assert_eq!(summary.jobs_run, 1);
        assert_eq!(servers.requests().len(), 1);
        assert_eq!(h.checks.job_ids(), vec!["j1".to_string()]);
        let delivered = h.reports.delivered.lock().unwrap();
        assert_eq!(delivered[0].0, "http://reports.test/in");
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_idle_backoff_after_full_cycle() {
        let servers = FakeServers::default();
        let h = harness(Config::default());
        let mut source = network(&servers, &["http://s1.test/job", "http://s2.test/job"]);
        assert_eq!(source.describe(), "2 job server(s)");
        let start = Instant::now();

        let watch = h.watcher.watch_network(&mut source, true);
        assert!(time::timeout(Duration::from_secs(305), watch).await.is_err());

        let requests = servers.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].0, "http://s1.test/job");
        assert_eq!(requests[1].0, "http://s2.test/job");
        assert_eq!(requests[2].0, "http://s1.test/job");
        assert_waited(requests[0].1 - start, Duration::from_secs(2));
        assert_waited(requests[1].1 - requests[0].1, Duration::from_secs(2));
        assert_waited(requests[2].1 - requests[1].1, Duration::from_secs(300));
        // Reset after the idle wait, then one more unproductive poll
        assert_eq!(source.rotation().no_job_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_invalid_and_failed_polls_keep_rotating() {
        let servers = FakeServers::default();
        servers.script("http://s1.test/job", &[Ok(r#"{"id":"j1","sources":{}}"#)]);
        servers.script("http://s2.test/job", &[Err(502)]);
        servers.script("http://s3.test/job", &[Ok("<html>oops</html>")]);
        let h = harness(Config::default());
        let mut source = network(
            &servers,
            &["http://s1.test/job", "http://s2.test/job", "http://s3.test/job"],
        );

        let watch = h.watcher.watch_network(&mut source, false);
        assert!(time::timeout(Duration::from_secs(7), watch).await.is_err());

        assert_eq!(servers.requests().len(), 3);
        assert_eq!(source.rotation().no_job_count(), 3);
        assert_eq!(source.rotation().backoff(), Backoff::Idle);
        let rejections = servers.rejections.lock().unwrap();
        assert_eq!(rejections.len(), 2);
        assert_eq!(rejections[0].0, "http://s1.test/job");
        assert!(rejections[0].1.contains("report destination"));
        assert_eq!(rejections[1].0, "http://s3.test/job");
        assert!(h.checks.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_forever_resumes_with_next_server() {
        let servers = FakeServers::default();
        servers.script("http://s1.test/job", &[Ok(MESSAGE)]);
        servers.script("http://s2.test/job", &[Ok(JOB)]);
        let h = harness(Config::default());
        let mut source = network(
            &servers,
            &["http://s1.test/job", "http://s2.test/job", "http://s3.test/job"],
        );

        let watch = h.watcher.watch_network(&mut source, true);
        assert!(time::timeout(Duration::from_secs(7), watch).await.is_err());

        let visited: Vec<String> = servers.requests().into_iter().map(|(e, _)| e).collect();
        assert_eq!(
            visited,
            vec!["http://s1.test/job", "http://s2.test/job", "http://s3.test/job"]
        );
        assert_eq!(h.checks.job_ids(), vec!["j1".to_string()]);
        // Counter restarted after the job; only s3's answer counted since
        assert_eq!(source.rotation().no_job_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failed_job_does_not_stop_forever_watch() {
        let servers = FakeServers::default();
        servers.script("http://s1.test/job", &[Ok(JOB), Ok(JOB)]);
        let checks = Arc::new(FakeChecks::failing());
        let runner = JobRunner::new(
            checks.clone(),
            Arc::new(FakeReports::default()),
            "agent-1".to_string(),
            false,
        );
        let watcher = Watcher::new(Config::default(), runner);
        let mut source = network(&servers, &["http://s1.test/job"]);

        let watch = watcher.watch_network(&mut source, true);
        assert!(time::timeout(Duration::from_secs(5), watch).await.is_err());

        assert_eq!(checks.job_ids().len(), 2);
    }
}
