//! Remote build API client

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use openapi_client::models::{EnqueueResponse, RemoteBuildStatus, RemoteStatusResponse};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::archive::frontend::validate_archive;
use crate::errors::BuildError;
use crate::filesys::file::File;
use crate::http::client::RemoteBuildClient;
use crate::utils::truncate_message;

/// Receives every successfully parsed status poll
#[async_trait]
pub trait BuildObserver: Send + Sync {
    async fn on_remote_status(&self, status: &RemoteStatusResponse);
}

/// Observer that ignores progress
pub struct NoopObserver;

#[async_trait]
impl BuildObserver for NoopObserver {
    async fn on_remote_status(&self, _status: &RemoteStatusResponse) {}
}

impl RemoteBuildClient {
    /// Upload the archive and start a remote build
    ///
    /// Returns the remote job handle.
    pub async fn enqueue(&self, archive_path: &Path) -> Result<String, BuildError> {
        let url = self.endpoint(&["build"])?;
        let file = tokio::fs::File::open(archive_path).await?;
        let length = file.metadata().await?.len();
        info!("Uploading {} bytes to {}", length, url);

        let part = Part::stream_with_length(Body::from(file), length)
            .file_name("upload.zip")
            .mime_str("application/zip")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.options.upload_timeout)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let body = response.text().await?;
        let parsed: EnqueueResponse = serde_json::from_str(&body).map_err(|e| {
            BuildError::ProtocolError(format!("Invalid enqueue response: {}", e))
        })?;

        match parsed.job_id.filter(|id| !id.trim().is_empty()) {
            Some(job_id) => {
                info!("Remote build queued as {}", job_id);
                Ok(job_id)
            }
            None => Err(BuildError::ProtocolError(
                "Enqueue response is missing job_id".to_string(),
            )),
        }
    }

    /// Poll until the remote build finishes, fails, or the wait budget runs out
    ///
    /// A failed poll is logged and retried on the next tick.
    pub async fn wait(
        &self,
        remote_job_id: &str,
        observer: &dyn BuildObserver,
    ) -> Result<RemoteStatusResponse, BuildError> {
        let budget = self.options.wait_budget;
        let started = Instant::now();
        let mut tick: u64 = 0;

        loop {
            tick += 1;
            match self.poll_status(remote_job_id).await {
                Ok(status) => {
                    observer.on_remote_status(&status).await;
                    match status.status {
                        RemoteBuildStatus::Finished => {
                            info!("Remote build {} finished after {} polls", remote_job_id, tick);
                            return Ok(status);
                        }
                        RemoteBuildStatus::Failed => {
                            let message = status
                                .error
                                .as_deref()
                                .unwrap_or("no error message provided");
                            return Err(BuildError::RemoteFailed(truncate_message(
                                message.trim(),
                                self.options.max_error_len,
                            )));
                        }
                        _ => debug!("Remote build {} is {}", remote_job_id, status.status),
                    }
                }
                Err(e) => {
                    warn!("Status poll {} for {} failed, retrying: {}", tick, remote_job_id, e);
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= budget {
                return Err(BuildError::Timeout(budget));
            }
            tokio::time::sleep(self.options.poll_interval.min(budget - elapsed)).await;
        }
    }

    async fn poll_status(&self, remote_job_id: &str) -> Result<RemoteStatusResponse, BuildError> {
        let url = self.endpoint(&["status", remote_job_id])?;
        let response = self
            .client
            .get(url)
            .timeout(self.options.poll_request_timeout)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| BuildError::ProtocolError(format!("Invalid status response: {}", e)))
    }

    /// Stream the finished artifact to `dest_path`
    ///
    /// On any failure the partial file is removed. Returns the byte count.
    pub async fn download(&self, remote_job_id: &str, dest_path: &Path) -> Result<u64, BuildError> {
        match self.download_to(remote_job_id, dest_path).await {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(rm) = File::new(dest_path).delete().await {
                    warn!("Failed to remove partial download {}: {}", dest_path.display(), rm);
                }
                Err(e)
            }
        }
    }

    async fn download_to(&self, remote_job_id: &str, dest_path: &Path) -> Result<u64, BuildError> {
        let url = self.endpoint(&["download", remote_job_id])?;
        info!("Downloading artifact from {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.options.download_timeout)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let mut file = tokio::fs::File::create(dest_path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let path = dest_path.to_path_buf();
        tokio::task::spawn_blocking(move || validate_archive(&path)).await??;

        info!("Downloaded {} bytes to {}", written, dest_path.display());
        Ok(written)
    }
}
