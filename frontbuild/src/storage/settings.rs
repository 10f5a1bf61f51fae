//! Settings management
//!
//! Settings are resolved once at process start: an optional JSON file named by
//! `FRONTBUILD_SETTINGS` provides the base, then individual environment
//! variables override it.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::BuildError;
use crate::logs::LogLevel;
use crate::storage::layout::JobLayout;

pub const ENV_SETTINGS_FILE: &str = "FRONTBUILD_SETTINGS";
pub const ENV_API_BASE: &str = "FRONTBUILD_API_BASE";
pub const ENV_PROJECT_ROOT: &str = "FRONTBUILD_PROJECT_ROOT";
pub const ENV_JOB_ROOT: &str = "FRONTBUILD_JOB_ROOT";
pub const ENV_LOG_LEVEL: &str = "FRONTBUILD_LOG_LEVEL";
pub const ENV_WORKER_BIN: &str = "FRONTBUILD_WORKER_BIN";

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Base URL of the remote build service
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Root of the frontend project to build and deploy into
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Directory holding one subdirectory per job
    #[serde(default = "default_job_root")]
    pub job_root: PathBuf,

    /// Worker executable; defaults to `frontbuild-worker` next to the
    /// current executable
    #[serde(default)]
    pub worker_bin: Option<PathBuf>,

    /// Maximum log bytes returned by a status query
    #[serde(default = "default_log_tail_bytes")]
    pub log_tail_bytes: u64,

    /// Remote build service timing
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Local HTTP server
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_project_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_job_root() -> PathBuf {
    JobLayout::default().job_root
}

fn default_log_tail_bytes() -> u64 {
    8000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            api_base: default_api_base(),
            project_root: default_project_root(),
            job_root: default_job_root(),
            worker_bin: None,
            log_tail_bytes: default_log_tail_bytes(),
            remote: RemoteSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn load() -> Result<Self, BuildError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load settings using `lookup` in place of the process environment
    pub fn load_with<F>(lookup: F) -> Result<Self, BuildError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match lookup(ENV_SETTINGS_FILE) {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    BuildError::ConfigError(format!("Unable to read settings file {}: {}", path, e))
                })?;
                serde_json::from_str::<Settings>(&contents).map_err(|e| {
                    BuildError::ConfigError(format!("Invalid settings file {}: {}", path, e))
                })?
            }
            None => Settings::default(),
        };

        if let Some(api_base) = lookup(ENV_API_BASE) {
            settings.api_base = api_base;
        }
        if let Some(project_root) = lookup(ENV_PROJECT_ROOT) {
            settings.project_root = PathBuf::from(project_root);
        }
        if let Some(job_root) = lookup(ENV_JOB_ROOT) {
            settings.job_root = PathBuf::from(job_root);
        }
        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            settings.log_level = log_level.parse().map_err(BuildError::ConfigError)?;
        }
        if let Some(worker_bin) = lookup(ENV_WORKER_BIN) {
            settings.worker_bin = Some(PathBuf::from(worker_bin));
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), BuildError> {
        let url = url::Url::parse(&self.api_base).map_err(|e| {
            BuildError::ConfigError(format!("Invalid API base URL {}: {}", self.api_base, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BuildError::ConfigError(format!(
                "Unsupported API base URL scheme: {}",
                url.scheme()
            )));
        }
        if self.remote.poll_interval_ms == 0 {
            return Err(BuildError::ConfigError(
                "Poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Job layout rooted at `job_root`
    pub fn layout(&self) -> JobLayout {
        JobLayout::new(&self.job_root)
    }
}

/// Remote build service timing, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Ceiling for the archive upload
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,

    /// Delay between status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Ceiling for a single status poll
    #[serde(default = "default_poll_request_timeout_ms")]
    pub poll_request_timeout_ms: u64,

    /// Overall budget for the remote build
    #[serde(default = "default_wait_budget_ms")]
    pub wait_budget_ms: u64,

    /// Ceiling for the artifact download
    #[serde(default = "default_download_timeout_ms")]
    pub download_timeout_ms: u64,

    /// Remote error messages are cut to this many characters
    #[serde(default = "default_max_error_len")]
    pub max_error_len: usize,
}

fn default_upload_timeout_ms() -> u64 {
    120_000
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_poll_request_timeout_ms() -> u64 {
    15_000
}

fn default_wait_budget_ms() -> u64 {
    3_600_000
}

fn default_download_timeout_ms() -> u64 {
    600_000
}

fn default_max_error_len() -> usize {
    1000
}

impl RemoteSettings {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_request_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_request_timeout_ms)
    }

    pub fn wait_budget(&self) -> Duration {
        Duration::from_millis(self.wait_budget_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            upload_timeout_ms: default_upload_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_request_timeout_ms: default_poll_request_timeout_ms(),
            wait_budget_ms: default_wait_budget_ms(),
            download_timeout_ms: default_download_timeout_ms(),
            max_error_len: default_max_error_len(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}
