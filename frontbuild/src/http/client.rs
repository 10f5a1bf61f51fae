//! HTTP client implementation

use std::time::Duration;

use reqwest::{redirect, Client, Response};
use tracing::debug;
use url::Url;

use crate::errors::BuildError;
use crate::storage::settings::RemoteSettings;
use crate::utils::truncate_message;

/// Timing and limits for the remote build service
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Ceiling for the archive upload
    pub upload_timeout: Duration,

    /// Delay between status polls
    pub poll_interval: Duration,

    /// Ceiling for a single status poll
    pub poll_request_timeout: Duration,

    /// Overall budget for the remote build
    pub wait_budget: Duration,

    /// Ceiling for the artifact download
    pub download_timeout: Duration,

    /// Remote error messages are cut to this many characters
    pub max_error_len: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&RemoteSettings::default())
    }
}

impl From<&RemoteSettings> for ClientOptions {
    fn from(settings: &RemoteSettings) -> Self {
        Self {
            upload_timeout: settings.upload_timeout(),
            poll_interval: settings.poll_interval(),
            poll_request_timeout: settings.poll_request_timeout(),
            wait_budget: settings.wait_budget(),
            download_timeout: settings.download_timeout(),
            max_error_len: settings.max_error_len,
        }
    }
}

/// HTTP client for the remote build service
#[derive(Debug, Clone)]
pub struct RemoteBuildClient {
    pub(crate) client: Client,
    base_url: Url,
    pub(crate) options: ClientOptions,
}

impl RemoteBuildClient {
    /// Create a new client for the service at `base_url`
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self, BuildError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BuildError::ConfigError(format!("Invalid API base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BuildError::ConfigError(format!(
                "API base URL cannot carry paths: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .redirect(redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            base_url,
            options,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Build `{base_url}/{segments...}`, escaping each segment
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, BuildError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BuildError::ConfigError(format!("Invalid API base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turn a non-2xx response into [`BuildError::RemoteStatus`]
    ///
    /// Reads at most enough of the body to fill `max_error_len` characters.
    pub(crate) async fn check_status(&self, mut response: Response) -> Result<Response, BuildError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let limit = self.options.max_error_len.saturating_mul(4).max(1);
        let mut bytes: Vec<u8> = Vec::new();
        while bytes.len() < limit {
            match response.chunk().await {
                Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    debug!("Failed to read error body from {}: {}", self.base_url, e);
                    break;
                }
            }
        }
        bytes.truncate(limit);

        let body = String::from_utf8_lossy(&bytes);
        debug!("{} returned {}: {}", self.base_url, status, body);
        Err(BuildError::RemoteStatus {
            status: status.as_u16(),
            body: truncate_message(body.trim(), self.options.max_error_len),
        })
    }
}
