//! API models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response to `POST /build`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnqueueResponse {
    /// Remote job handle, absent when the service misbehaves
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Build status reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBuildStatus {
    Queued,
    Building,
    Finished,
    Failed,

    /// Any value this client does not know about yet
    #[serde(other)]
    Unknown,
}

impl RemoteBuildStatus {
    /// Whether polling can stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteBuildStatus::Finished | RemoteBuildStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteBuildStatus::Queued => "queued",
            RemoteBuildStatus::Building => "building",
            RemoteBuildStatus::Finished => "finished",
            RemoteBuildStatus::Failed => "failed",
            RemoteBuildStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RemoteBuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response to `GET /status/{job_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStatusResponse {
    pub status: RemoteBuildStatus,

    /// Failure detail, only set when `status` is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
