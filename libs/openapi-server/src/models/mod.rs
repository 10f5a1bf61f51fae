//! API models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse job health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Started,
    Finished,
    Failed,
}

impl JobState {
    /// Finished and failed jobs never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Started => "started",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline step a job is executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    Init,
    Zipping,
    Upload,
    Building,
    Download,
    Deploy,
    Done,
    Error,
}

impl JobStage {
    /// Position in the pipeline order. `Error` sorts last.
    pub fn rank(&self) -> u8 {
        match self {
            JobStage::Init => 0,
            JobStage::Zipping => 1,
            JobStage::Upload => 2,
            JobStage::Building => 3,
            JobStage::Download => 4,
            JobStage::Deploy => 5,
            JobStage::Done => 6,
            JobStage::Error => 7,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Done | JobStage::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Init => "init",
            JobStage::Zipping => "zipping",
            JobStage::Upload => "upload",
            JobStage::Building => "building",
            JobStage::Download => "download",
            JobStage::Deploy => "deploy",
            JobStage::Done => "done",
            JobStage::Error => "error",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted status record of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub stage: JobStage,
    pub message: String,

    /// Time of the last status write
    #[serde(rename = "ts")]
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    pub fn new(state: JobState, stage: JobStage, message: impl Into<String>) -> Self {
        Self {
            state,
            stage,
            message: message.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Status query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,

    /// Trailing part of the job log
    pub log: String,
}

/// Launch response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchResponse {
    pub job_id: String,
}

/// Error body for non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
