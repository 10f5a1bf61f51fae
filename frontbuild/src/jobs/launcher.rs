//! Job launching
//!
//! `start` only prepares the job and hands it to a [`WorkerSpawner`]; the
//! worker reports everything else through the job store.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use openapi_server::models::{JobStage, JobState};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::errors::BuildError;
use crate::jobs::store::JobStore;
use crate::utils::generate_job_id;
use crate::workers::pipeline::Worker;

/// Name of the worker executable
pub const WORKER_BIN_NAME: &str = "frontbuild-worker";

/// Starts a worker for a job without waiting for it
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    async fn spawn(&self, job_id: &str) -> Result<(), BuildError>;
}

/// Runs each job in a detached `frontbuild-worker` process
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    worker_bin: PathBuf,
}

impl ProcessSpawner {
    pub fn new(worker_bin: impl Into<PathBuf>) -> Self {
        Self {
            worker_bin: worker_bin.into(),
        }
    }

    /// Use the configured worker, or the one installed next to this executable
    pub fn locate(configured: Option<PathBuf>) -> Result<Self, BuildError> {
        if let Some(worker_bin) = configured {
            return Ok(Self::new(worker_bin));
        }
        let current = std::env::current_exe()?;
        let worker_bin =
            current.with_file_name(format!("{}{}", WORKER_BIN_NAME, std::env::consts::EXE_SUFFIX));
        Ok(Self::new(worker_bin))
    }

    pub fn worker_bin(&self) -> &PathBuf {
        &self.worker_bin
    }
}

#[async_trait]
impl WorkerSpawner for ProcessSpawner {
    async fn spawn(&self, job_id: &str) -> Result<(), BuildError> {
        let mut command = Command::new(&self.worker_bin);
        command
            .arg(job_id)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        // Own process group: the worker outlives the launcher's terminal
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            BuildError::SpawnError(format!(
                "Failed to start {}: {}",
                self.worker_bin.display(),
                e
            ))
        })?;
        debug!("Spawned worker pid {:?} for job {}", child.id(), job_id);

        // Reap the child when it exits; nobody waits on it otherwise
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!("Worker for job {} exited with {}", job_id, status),
                Err(e) => error!("Failed to wait for worker of job {}: {}", job_id, e),
            }
        });
        Ok(())
    }
}

/// Runs each job on a tokio task inside the current process
#[derive(Clone)]
pub struct TaskSpawner {
    worker: Arc<Worker>,
}

impl TaskSpawner {
    pub fn new(worker: Arc<Worker>) -> Self {
        Self { worker }
    }
}

#[async_trait]
impl WorkerSpawner for TaskSpawner {
    async fn spawn(&self, job_id: &str) -> Result<(), BuildError> {
        let worker = self.worker.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            // the outcome is already recorded in the job store
            let _ = worker.run(&job_id).await;
        });
        Ok(())
    }
}

/// Creates jobs and hands them to a worker
pub struct JobLauncher {
    store: Arc<dyn JobStore>,
    spawner: Arc<dyn WorkerSpawner>,
}

impl JobLauncher {
    pub fn new(store: Arc<dyn JobStore>, spawner: Arc<dyn WorkerSpawner>) -> Self {
        Self { store, spawner }
    }

    /// Create a job, start its worker and return the job id immediately
    pub async fn start(&self) -> Result<String, BuildError> {
        let job_id = generate_job_id();

        self.store.create(&job_id).await?;
        self.store
            .write_status(&job_id, JobState::Queued, JobStage::Init, "Queued")
            .await;
        self.store.append_log(&job_id, "Job queued").await;

        if let Err(e) = self.spawner.spawn(&job_id).await {
            let message = e.to_string();
            self.store
                .append_log(&job_id, &format!("[ERROR] {}", message))
                .await;
            self.store
                .write_status(&job_id, JobState::Failed, JobStage::Error, &message)
                .await;
            error!("Failed to launch job {}: {}", job_id, message);
            return Err(e);
        }

        info!("Launched job {}", job_id);
        Ok(job_id)
    }
}
