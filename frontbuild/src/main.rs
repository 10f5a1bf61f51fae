//! frontbuild - Entry Point
//!
//! Launches build-and-deploy jobs, reports their status, or serves both over
//! HTTP. The pipeline itself runs in `frontbuild-worker`.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::time::Duration;

use colored::Colorize;
use openapi_server::models::{JobStage, JobState, LaunchResponse};
use serde::Serialize;
use tracing::{error, info};

use frontbuild::app::state::{AppState, SpawnMode};
use frontbuild::errors::BuildError;
use frontbuild::jobs::reporter::StatusReporter;
use frontbuild::logs::{init_logging, LogOptions};
use frontbuild::server::serve::serve;
use frontbuild::storage::settings::Settings;
use frontbuild::utils::version_info;

const USAGE: &str = "\
Usage: frontbuild <command>

Commands:
  --launch              start a job and print its id
  --status=<job_id>     print the status and log tail of a job
  --watch=<job_id>      follow a job until it finishes
  --serve               serve POST /jobs and GET /jobs/status?job_id=
  --version             print version information

Options:
  --in-process          run workers inside this process instead of spawning
                        frontbuild-worker
";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    if cli_args.contains_key("version") {
        print_json(&version_info());
        return ExitCode::SUCCESS;
    }
    if cli_args.contains_key("help") || cli_args.is_empty() {
        print!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let mode = if cli_args.contains_key("in-process") {
        SpawnMode::InProcess
    } else {
        SpawnMode::Process
    };
    let app = match AppState::init(settings, mode) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            return ExitCode::from(2);
        }
    };
    let poll_interval = app
        .settings
        .remote
        .poll_interval()
        .min(Duration::from_secs(1));

    if cli_args.contains_key("serve") {
        let result = serve(
            &app.settings.server,
            app.server_state(),
            await_shutdown_signal(),
        )
        .await;
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Server failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    if cli_args.contains_key("launch") {
        let job_id = match app.launcher.start().await {
            Ok(job_id) => job_id,
            Err(e) => {
                error!("Failed to launch job: {}", e);
                return ExitCode::FAILURE;
            }
        };
        print_json(&LaunchResponse {
            job_id: job_id.clone(),
        });
        // An in-process worker dies with this process, so stay for it
        if mode == SpawnMode::InProcess {
            return watch(&app.reporter, &job_id, poll_interval).await;
        }
        return ExitCode::SUCCESS;
    }

    if let Some(job_id) = cli_args.get("status") {
        return match app.reporter.get_status(job_id).await {
            Ok(report) => {
                print_json(&report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    if let Some(job_id) = cli_args.get("watch") {
        return watch(&app.reporter, job_id, poll_interval).await;
    }

    eprint!("{}", USAGE);
    ExitCode::from(2)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Print stage changes until the job reaches a terminal state
async fn watch(reporter: &StatusReporter, job_id: &str, interval: Duration) -> ExitCode {
    let mut last_seen: Option<(JobStage, String)> = None;

    loop {
        let report = match reporter.get_status(job_id).await {
            Ok(report) => report,
            Err(BuildError::NotFound(_)) => {
                eprintln!("{} unknown job {}", "error:".red().bold(), job_id);
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return ExitCode::FAILURE;
            }
        };

        let status = report.status;
        let current = (status.stage, status.message.clone());
        if last_seen.as_ref() != Some(&current) {
            let stage = match status.state {
                JobState::Finished => status.stage.as_str().green().bold(),
                JobState::Failed => status.stage.as_str().red().bold(),
                _ => status.stage.as_str().cyan(),
            };
            eprintln!(
                "{} {:<9} {}",
                status.updated_at.format("%H:%M:%S").to_string().dimmed(),
                stage,
                status.message
            );
            last_seen = Some(current);
        }

        match status.state {
            JobState::Finished => return ExitCode::SUCCESS,
            JobState::Failed => return ExitCode::FAILURE,
            _ => tokio::time::sleep(interval).await,
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down...");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received, shutting down...");
                    }
                }
                return;
            }
            Err(e) => error!("Unable to listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received, shutting down...");
}
