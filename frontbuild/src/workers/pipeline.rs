//! Build pipeline worker
//!
//! Drives one job through archive, upload, remote build, download and deploy.
//! Errors from any step are handled in exactly one place, [`Worker::run`],
//! which records them in the job store.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use openapi_client::models::{RemoteBuildStatus, RemoteStatusResponse};
use openapi_server::models::{JobStage, JobState};
use tracing::{error, info, warn};

use crate::archive::frontend::{create_frontend_archive, ArchiveOptions};
use crate::deploy::artifact::{deploy, DeployOptions};
use crate::errors::BuildError;
use crate::http::builds::BuildObserver;
use crate::http::client::{ClientOptions, RemoteBuildClient};
use crate::jobs::store::JobStore;
use crate::storage::layout::JobLayout;
use crate::storage::settings::Settings;
use crate::workers::fsm::{PipelineEvent, PipelineFsm};

/// Runs the build pipeline for a job
pub struct Worker {
    store: Arc<dyn JobStore>,
    client: RemoteBuildClient,
    layout: JobLayout,
    project_root: PathBuf,
    archive_options: ArchiveOptions,
    deploy_options: DeployOptions,
}

impl Worker {
    /// Create a worker from process settings
    pub fn new(settings: &Settings, store: Arc<dyn JobStore>) -> Result<Self, BuildError> {
        let client =
            RemoteBuildClient::new(&settings.api_base, ClientOptions::from(&settings.remote))?;

        Ok(Self {
            store,
            client,
            layout: settings.layout(),
            project_root: settings.project_root.clone(),
            archive_options: ArchiveOptions::default(),
            deploy_options: DeployOptions::default(),
        })
    }

    /// Run the pipeline and record the outcome
    ///
    /// The returned error has already been written to the job store.
    pub async fn run(&self, job_id: &str) -> Result<(), BuildError> {
        info!("Starting pipeline for job {}", job_id);
        let mut fsm = PipelineFsm::new();

        match self.execute(job_id, &mut fsm).await {
            Ok(()) => {
                self.store.append_log(job_id, "Pipeline finished").await;
                self.store
                    .write_status(job_id, JobState::Finished, JobStage::Done, "Success")
                    .await;
                info!("Job {} finished", job_id);
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(transition) = fsm.process(PipelineEvent::Fail(message.clone())) {
                    warn!("Job {}: {}", job_id, transition);
                }
                self.store
                    .append_log(job_id, &format!("[ERROR] {}", message))
                    .await;
                self.store
                    .write_status(job_id, JobState::Failed, JobStage::Error, &message)
                    .await;
                error!("Job {} failed: {}", job_id, message);
                Err(e)
            }
        }
    }

    async fn execute(&self, job_id: &str, fsm: &mut PipelineFsm) -> Result<(), BuildError> {
        self.store.create(job_id).await?;

        // Archive
        self.enter(job_id, fsm, PipelineEvent::Archive, "Creating archive")
            .await?;
        let upload = self.layout.upload_archive(job_id);
        let summary =
            create_frontend_archive(&self.project_root, upload.path(), &self.archive_options)
                .await?;
        self.store
            .append_log(
                job_id,
                &format!(
                    "Archive created: {} entries, {} bytes, sha256 {}",
                    summary.entries, summary.bytes, summary.sha256
                ),
            )
            .await;

        // Upload
        self.enter(job_id, fsm, PipelineEvent::Upload, "Uploading archive")
            .await?;
        let remote_job_id = self.client.enqueue(upload.path()).await?;
        self.store
            .append_log(job_id, &format!("Upload complete, remote job {}", remote_job_id))
            .await;

        // Remote build
        self.enter(job_id, fsm, PipelineEvent::Build, "Waiting for remote build")
            .await?;
        let observer = JobObserver::new(self.store.as_ref(), job_id);
        self.client.wait(&remote_job_id, &observer).await?;
        self.store.append_log(job_id, "Remote build finished").await;

        // Download
        self.enter(job_id, fsm, PipelineEvent::Download, "Downloading artifact")
            .await?;
        let artifact = self.layout.artifact_archive(job_id);
        let bytes = self.client.download(&remote_job_id, artifact.path()).await?;
        self.store
            .append_log(job_id, &format!("Artifact downloaded: {} bytes", bytes))
            .await;

        // Deploy
        self.enter(job_id, fsm, PipelineEvent::Deploy, "Deploying artifact")
            .await?;
        let deployed = deploy(&self.project_root, artifact.path(), &self.deploy_options).await?;
        self.store
            .append_log(job_id, &format!("Deployed artifact layout {}", deployed))
            .await;

        fsm.process(PipelineEvent::Complete)
            .map_err(BuildError::Internal)?;
        Ok(())
    }

    /// Move to the next stage and publish it before the step runs
    async fn enter(
        &self,
        job_id: &str,
        fsm: &mut PipelineFsm,
        event: PipelineEvent,
        message: &str,
    ) -> Result<(), BuildError> {
        let stage = fsm.process(event).map_err(BuildError::Internal)?;
        self.store
            .write_status(job_id, JobState::Started, stage, message)
            .await;
        info!("Job {} entered stage {}", job_id, stage);
        Ok(())
    }
}

/// Publishes remote build progress as `building` status updates
struct JobObserver<'a> {
    store: &'a dyn JobStore,
    job_id: &'a str,
    last_seen: Mutex<Option<RemoteBuildStatus>>,
}

impl<'a> JobObserver<'a> {
    fn new(store: &'a dyn JobStore, job_id: &'a str) -> Self {
        Self {
            store,
            job_id,
            last_seen: Mutex::new(None),
        }
    }
}

#[async_trait]
impl BuildObserver for JobObserver<'_> {
    async fn on_remote_status(&self, status: &RemoteStatusResponse) {
        let changed = {
            let mut last_seen = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
            let changed = last_seen.as_ref() != Some(&status.status);
            *last_seen = Some(status.status.clone());
            changed
        };

        self.store
            .write_status(
                self.job_id,
                JobState::Started,
                JobStage::Building,
                &format!("Remote status: {}", status.status),
            )
            .await;
        if changed {
            self.store
                .append_log(self.job_id, &format!("Remote status: {}", status.status))
                .await;
        }
    }
}
