//! Job persistence
//!
//! Status and log writes are advisory: a failed write is logged and
//! swallowed so it can never change the outcome of a pipeline.

use async_trait::async_trait;
use chrono::Utc;
use openapi_server::models::{JobStage, JobState, JobStatus};
use tracing::{debug, warn};

use crate::errors::BuildError;
use crate::storage::layout::JobLayout;

/// Storage for job status records and logs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Allocate storage for a new job
    async fn create(&self, job_id: &str) -> Result<(), BuildError>;

    /// Whether a status record exists for the job
    async fn exists(&self, job_id: &str) -> bool;

    /// Replace the status record (best-effort)
    async fn write_status(&self, job_id: &str, state: JobState, stage: JobStage, message: &str);

    /// Append one line to the job log (best-effort)
    async fn append_log(&self, job_id: &str, text: &str);

    /// Current status record, `None` when missing or unreadable
    async fn read_status(&self, job_id: &str) -> Option<JobStatus>;

    /// Up to `max_bytes` trailing bytes of the log, empty when missing
    async fn read_log_tail(&self, job_id: &str, max_bytes: u64) -> String;
}

/// Job store backed by one directory per job
#[derive(Debug, Clone)]
pub struct FsJobStore {
    layout: JobLayout,
}

impl FsJobStore {
    pub fn new(layout: JobLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }
}

#[async_trait]
impl JobStore for FsJobStore {
    async fn create(&self, job_id: &str) -> Result<(), BuildError> {
        self.layout.job_dir(job_id).create().await
    }

    async fn exists(&self, job_id: &str) -> bool {
        self.layout.status_file(job_id).exists().await
    }

    async fn write_status(&self, job_id: &str, state: JobState, stage: JobStage, message: &str) {
        let status = JobStatus::new(state, stage, message);
        let file = self.layout.status_file(job_id);
        if let Err(e) = file.write_json(&status).await {
            warn!("Failed to write status for job {}: {}", job_id, e);
            return;
        }
        debug!("Job {} status: {}/{} {}", job_id, state, stage, message);
    }

    async fn append_log(&self, job_id: &str, text: &str) {
        let line = format!("[{}] {}", Utc::now().format("%Y-%m-%d %H:%M:%S"), text);
        if let Err(e) = self.layout.log_file(job_id).append_line(&line).await {
            warn!("Failed to append log for job {}: {}", job_id, e);
        }
    }

    async fn read_status(&self, job_id: &str) -> Option<JobStatus> {
        let file = self.layout.status_file(job_id);
        if !file.exists().await {
            return None;
        }
        match file.read_json().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Unreadable status for job {}: {}", job_id, e);
                None
            }
        }
    }

    async fn read_log_tail(&self, job_id: &str, max_bytes: u64) -> String {
        let file = self.layout.log_file(job_id);
        if !file.exists().await {
            return String::new();
        }
        file.read_tail(max_bytes).await.unwrap_or_else(|e| {
            warn!("Unreadable log for job {}: {}", job_id, e);
            String::new()
        })
    }
}
