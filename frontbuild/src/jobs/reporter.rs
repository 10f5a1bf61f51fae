//! Read-only job status queries

use std::sync::Arc;

use openapi_server::models::{JobStage, JobState, JobStatus, StatusResponse};

use crate::errors::BuildError;
use crate::jobs::store::JobStore;
use crate::utils::is_valid_job_id;

/// Message reported for a status record that exists but cannot be parsed
pub const UNREADABLE_STATUS: &str = "Unreadable status record";

/// Answers status queries from the job store
pub struct StatusReporter {
    store: Arc<dyn JobStore>,
    log_tail_bytes: u64,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn JobStore>, log_tail_bytes: u64) -> Self {
        Self {
            store,
            log_tail_bytes,
        }
    }

    /// Current status and log tail of a job
    pub async fn get_status(&self, job_id: &str) -> Result<StatusResponse, BuildError> {
        if !is_valid_job_id(job_id) || !self.store.exists(job_id).await {
            return Err(BuildError::NotFound(format!("job {}", job_id)));
        }

        // A record that exists but cannot be parsed stays visible as such
        let status = match self.store.read_status(job_id).await {
            Some(status) => status,
            None => JobStatus::new(JobState::Queued, JobStage::Init, UNREADABLE_STATUS),
        };
        let log = self.store.read_log_tail(job_id, self.log_tail_bytes).await;

        Ok(StatusResponse { status, log })
    }
}
