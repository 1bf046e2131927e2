//! Directory job source
//!
//! Pending jobs are `.json` files in `<job_dir>/todo`. Files are taken in
//! lexicographic order of their names. A completed job's file is moved to
//! `<job_dir>/done`, after which the name is free for a new job. A file whose
//! job failed, or that did not parse, stays in `todo/` and is skipped until it
//! is rewritten.

use ally_core::domain::job::Job;
use ally_core::dto::job::PollOutcome;
use async_trait::async_trait;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use super::JobSource;
use crate::error::AgentError;

/// Suffix of job files
const JOB_SUFFIX: &str = ".json";

/// Identity of one version of a job file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileStamp {
    name: OsString,
    modified: Option<SystemTime>,
    len: u64,
}

/// The job handed out by the last poll, until archived or abandoned
#[derive(Debug)]
struct InFlight {
    job_id: String,
    stamp: FileStamp,
}

/// Job source backed by a queue directory
pub struct DirectorySource {
    todo_dir: PathBuf,
    done_dir: PathBuf,
    /// Files left in `todo/` that must not be picked up again
    skipped: HashSet<FileStamp>,
    in_flight: Option<InFlight>,
}

impl DirectorySource {
    /// Creates a directory source
    ///
    /// # Arguments
    /// * `todo_dir` - Directory holding pending job files
    /// * `done_dir` - Directory completed job files are moved to
    pub fn new(todo_dir: PathBuf, done_dir: PathBuf) -> Self {
        Self {
            todo_dir,
            done_dir,
            skipped: HashSet::new(),
            in_flight: None,
        }
    }

    /// Lists job files, sorted by name
    async fn job_files(&self) -> Result<Vec<FileStamp>, AgentError> {
        let read_error = |source| AgentError::SourceRead {
            path: self.todo_dir.display().to_string(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.todo_dir)
            .await
            .map_err(read_error)?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
            let name = entry.file_name();
            if !name.to_str().is_some_and(|n| n.ends_with(JOB_SUFFIX)) {
                continue;
            }
            let metadata = entry.metadata().await.map_err(read_error)?;
            files.push(FileStamp {
                name,
                modified: metadata.modified().ok(),
                len: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn load(path: &Path) -> Result<Job, AgentError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AgentError::SourceRead {
                path: path.display().to_string(),
                source,
            })?;

        serde_json::from_str(&raw).map_err(|e| AgentError::JobParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Takes the in-flight entry if it belongs to `job`
    fn take_in_flight(&mut self, job: &Job) -> Option<InFlight> {
        if self.in_flight.as_ref().is_some_and(|f| f.job_id == job.id) {
            self.in_flight.take()
        } else {
            None
        }
    }
}

#[async_trait]
impl JobSource for DirectorySource {
    fn describe(&self) -> String {
        self.todo_dir.display().to_string()
    }

    async fn poll(&mut self) -> Result<PollOutcome, AgentError> {
        if let Some(stale) = self.in_flight.take() {
            warn!("Job {} was neither archived nor abandoned", stale.job_id);
            self.skipped.insert(stale.stamp);
        }

        let files = self.job_files().await?;
        // Forget files that were removed or rewritten
        self.skipped.retain(|stamp| files.contains(stamp));

        let pending = files.into_iter().find(|f| !self.skipped.contains(f));
        let Some(stamp) = pending else {
            return Ok(PollOutcome::NoJob(None));
        };

        let path = self.todo_dir.join(&stamp.name);
        let job = match Self::load(&path).await {
            Ok(job) => job,
            Err(e) => {
                self.skipped.insert(stamp);
                return Err(e);
            }
        };

        debug!("Loaded job {} from {}", job.id, path.display());
        self.in_flight = Some(InFlight {
            job_id: job.id.clone(),
            stamp,
        });

        Ok(PollOutcome::JobFound(job))
    }

    async fn archive(&mut self, job: &Job) -> Result<(), AgentError> {
        let archive_error = |message: String| AgentError::Archive {
            job_id: job.id.clone(),
            message,
        };

        let Some(taken) = self.take_in_flight(job) else {
            return Err(archive_error("job was not taken from this directory".to_string()));
        };
        let path = self.todo_dir.join(&taken.stamp.name);

        let moved = async {
            tokio::fs::create_dir_all(&self.done_dir)
                .await
                .map_err(|e| {
                    archive_error(format!("cannot create {}: {}", self.done_dir.display(), e))
                })?;
            tokio::fs::rename(&path, self.done_dir.join(&taken.stamp.name))
                .await
                .map_err(|e| archive_error(format!("cannot move {}: {}", path.display(), e)))
        }
        .await;

        if moved.is_err() {
            self.skipped.insert(taken.stamp);
            return moved;
        }

        info!("Job {} archived in {}", job.id, self.done_dir.display());
        Ok(())
    }

    async fn abandon(&mut self, job: &Job) {
        if let Some(taken) = self.take_in_flight(job) {
            debug!(
                "Leaving {} in place after job {} failed",
                taken.stamp.name.to_string_lossy(),
                job.id
            );
            self.skipped.insert(taken.stamp);
        }
    }
}
