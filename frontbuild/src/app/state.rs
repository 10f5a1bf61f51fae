//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::errors::BuildError;
use crate::jobs::launcher::{JobLauncher, ProcessSpawner, TaskSpawner, WorkerSpawner};
use crate::jobs::reporter::StatusReporter;
use crate::jobs::store::{FsJobStore, JobStore};
use crate::server::state::ServerState;
use crate::storage::settings::Settings;
use crate::workers::pipeline::Worker;

/// Where launched workers run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// Detached `frontbuild-worker` process per job
    Process,

    /// Tokio task inside the current process
    InProcess,
}

/// Main application state
pub struct AppState {
    /// Settings resolved at startup
    pub settings: Arc<Settings>,

    /// Job store
    pub store: Arc<dyn JobStore>,

    /// Job launcher
    pub launcher: Arc<JobLauncher>,

    /// Status reporter
    pub reporter: Arc<StatusReporter>,
}

impl AppState {
    /// Initialize application state
    pub fn init(settings: Settings, mode: SpawnMode) -> Result<Self, BuildError> {
        info!("Initializing with job root {}", settings.job_root.display());
        let settings = Arc::new(settings);
        let store: Arc<dyn JobStore> = Arc::new(FsJobStore::new(settings.layout()));

        let spawner: Arc<dyn WorkerSpawner> = match mode {
            SpawnMode::Process => {
                let spawner = ProcessSpawner::locate(settings.worker_bin.clone())?;
                info!("Workers run as {}", spawner.worker_bin().display());
                Arc::new(spawner)
            }
            SpawnMode::InProcess => {
                let worker = Worker::new(&settings, store.clone())?;
                Arc::new(TaskSpawner::new(Arc::new(worker)))
            }
        };

        let launcher = Arc::new(JobLauncher::new(store.clone(), spawner));
        let reporter = Arc::new(StatusReporter::new(store.clone(), settings.log_tail_bytes));

        Ok(Self {
            settings,
            store,
            launcher,
            reporter,
        })
    }

    /// State for the HTTP handlers
    pub fn server_state(&self) -> Arc<ServerState> {
        Arc::new(ServerState::new(
            self.launcher.clone(),
            self.reporter.clone(),
        ))
    }
}
