//! Finite State Machine for the build pipeline
//!
//! Stages only move forward, one step at a time. `Error` can be entered from
//! any stage that is not already terminal.

use openapi_server::models::JobStage;

/// Pipeline event
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Start building the upload archive
    Archive,

    /// Start uploading the archive
    Upload,

    /// Start waiting for the remote build
    Build,

    /// Start downloading the artifact
    Download,

    /// Start deploying the artifact
    Deploy,

    /// Pipeline completed
    Complete,

    /// Pipeline failed
    Fail(String),
}

/// Pipeline FSM
#[derive(Debug, Clone)]
pub struct PipelineFsm {
    stage: JobStage,
    error: Option<String>,
}

impl PipelineFsm {
    /// Create a new FSM at `init`
    pub fn new() -> Self {
        Self {
            stage: JobStage::Init,
            error: None,
        }
    }

    /// Get current stage
    pub fn stage(&self) -> JobStage {
        self.stage
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and return the new stage
    pub fn process(&mut self, event: PipelineEvent) -> Result<JobStage, String> {
        let new_stage = match (self.stage, &event) {
            (JobStage::Init, PipelineEvent::Archive) => JobStage::Zipping,
            (JobStage::Zipping, PipelineEvent::Upload) => JobStage::Upload,
            (JobStage::Upload, PipelineEvent::Build) => JobStage::Building,
            (JobStage::Building, PipelineEvent::Download) => JobStage::Download,
            (JobStage::Download, PipelineEvent::Deploy) => JobStage::Deploy,
            (JobStage::Deploy, PipelineEvent::Complete) => JobStage::Done,

            (stage, PipelineEvent::Fail(err)) if !stage.is_terminal() => {
                self.error = Some(err.clone());
                JobStage::Error
            }

            // Invalid transitions
            (stage, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", stage, event));
            }
        };

        self.stage = new_stage;
        Ok(new_stage)
    }
}

impl Default for PipelineFsm {
    fn default() -> Self {
        Self::new()
    }
}
