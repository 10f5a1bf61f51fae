//! frontbuild-worker - runs the build pipeline for one job
//!
//! Usage: `frontbuild-worker <job_id>`. Progress is reported only through the
//! job directory; stdout and stderr are usually detached.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use openapi_server::models::{JobStage, JobState};
use tracing::error;

use frontbuild::jobs::store::{FsJobStore, JobStore};
use frontbuild::logs::{init_logging, LogOptions};
use frontbuild::storage::settings::Settings;
use frontbuild::utils::is_valid_job_id;
use frontbuild::workers::pipeline::Worker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let job_id = match args.as_slice() {
        [job_id] if is_valid_job_id(job_id) => job_id.clone(),
        _ => {
            eprintln!("Usage: frontbuild-worker <job_id>");
            return ExitCode::from(2);
        }
    };

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    let layout = settings.layout();

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        stderr: false,
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        file_prefix: "worker.log".to_string(),
        json_format: true,
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let store: Arc<dyn JobStore> = Arc::new(FsJobStore::new(layout));
    let worker = match Worker::new(&settings, store.clone()) {
        Ok(worker) => worker,
        Err(e) => {
            // Nothing else will record this failure
            let message = e.to_string();
            error!("Failed to initialize worker for job {}: {}", job_id, message);
            store
                .append_log(&job_id, &format!("[ERROR] {}", message))
                .await;
            store
                .write_status(&job_id, JobState::Failed, JobStage::Error, &message)
                .await;
            return ExitCode::FAILURE;
        }
    };

    match worker.run(&job_id).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
