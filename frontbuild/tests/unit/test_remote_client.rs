//! Remote build client tests

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::StatusCode;
use openapi_client::models::{RemoteBuildStatus, RemoteStatusResponse};
use tokio_test::{assert_err, assert_ok};

use frontbuild::archive::frontend::validate_archive;
use frontbuild::errors::BuildError;
use frontbuild::http::builds::{BuildObserver, NoopObserver};
use frontbuild::http::client::RemoteBuildClient;

use crate::common::{fast_options, zip_bytes, MockConfig, MockRemote, Outcome, REMOTE_JOB_ID};

async fn client_for(config: MockConfig) -> (MockRemote, RemoteBuildClient) {
    let mock = MockRemote::start(config).await;
    let client = RemoteBuildClient::new(&mock.base_url, fast_options()).unwrap();
    (mock, client)
}

fn archive_file(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("upload.zip");
    std::fs::write(&path, zip_bytes(&[("package.json", "{}")])).unwrap();
    path
}

#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<RemoteBuildStatus>>,
}

#[async_trait]
impl BuildObserver for RecordingObserver {
    async fn on_remote_status(&self, status: &RemoteStatusResponse) {
        self.seen.lock().unwrap().push(status.status.clone());
    }
}

#[tokio::test]
async fn test_enqueue_uploads_multipart_file() {
    let (mock, client) = client_for(MockConfig::default()).await;
    let dir = tempfile::tempdir().unwrap();

    let archive = archive_file(&dir);
    let remote_id = client.enqueue(&archive).await.unwrap();
    assert_eq!(remote_id, REMOTE_JOB_ID);

    let uploads = mock.uploads();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&uploads[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"upload.zip\""));
    let contents = std::fs::read(&archive).unwrap();
    assert!(uploads[0]
        .body
        .windows(contents.len())
        .any(|window| window == contents.as_slice()));
}

#[tokio::test]
async fn test_enqueue_without_job_id_is_protocol_error() {
    for body in [r#"{"status":"queued"}"#, r#"{"job_id":""}"#, "not json"] {
        let (_mock, client) = client_for(MockConfig {
            enqueue_body: body.to_string(),
            ..Default::default()
        })
        .await;
        let dir = tempfile::tempdir().unwrap();

        let result = client.enqueue(&archive_file(&dir)).await;
        assert!(
            matches!(result, Err(BuildError::ProtocolError(_))),
            "body {} gave {:?}",
            body,
            result
        );
    }
}

#[tokio::test]
async fn test_enqueue_rejected_by_service() {
    let (_mock, client) = client_for(MockConfig {
        enqueue_status: StatusCode::INTERNAL_SERVER_ERROR,
        enqueue_body: "queue unavailable".to_string(),
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    match client.enqueue(&archive_file(&dir)).await {
        Err(BuildError::RemoteStatus { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "queue unavailable");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_large_error_body_is_bounded() {
    let (_mock, client) = client_for(MockConfig {
        enqueue_status: StatusCode::BAD_GATEWAY,
        enqueue_body: "y".repeat(200_000),
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();

    match client.enqueue(&archive_file(&dir)).await {
        Err(BuildError::RemoteStatus { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body.chars().count(), 1001);
            assert!(body.ends_with('…'));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_tolerates_failed_polls() {
    let (mock, client) = client_for(MockConfig {
        failing_polls: 2,
        building_polls: 2,
        ..Default::default()
    })
    .await;
    let observer = RecordingObserver::default();

    let status = assert_ok!(client.wait(REMOTE_JOB_ID, &observer).await);
    assert_eq!(status.status, RemoteBuildStatus::Finished);
    assert_eq!(mock.polls(), 5);

    // failed polls are never reported
    let seen = observer.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            RemoteBuildStatus::Building,
            RemoteBuildStatus::Building,
            RemoteBuildStatus::Finished,
        ]
    );
}

#[tokio::test]
async fn test_wait_reports_bounded_remote_error() {
    let long_error = "x".repeat(5000);
    let (_mock, client) = client_for(MockConfig {
        outcome: Outcome::Failed(long_error),
        ..Default::default()
    })
    .await;

    match client.wait(REMOTE_JOB_ID, &NoopObserver).await {
        Err(BuildError::RemoteFailed(message)) => {
            assert!(message.starts_with("xxx"));
            assert_eq!(message.chars().count(), 1001);
            assert!(message.ends_with('…'));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_times_out_after_budget() {
    let mut options = fast_options();
    options.wait_budget = Duration::from_millis(200);
    options.poll_interval = Duration::from_millis(50);
    let mock = MockRemote::start(MockConfig {
        outcome: Outcome::NeverFinishes,
        ..Default::default()
    })
    .await;
    let client = RemoteBuildClient::new(&mock.base_url, options).unwrap();

    let started = Instant::now();
    let result = client.wait(REMOTE_JOB_ID, &NoopObserver).await;
    let elapsed = started.elapsed();

    match assert_err!(result) {
        BuildError::Timeout(budget) => assert_eq!(budget, Duration::from_millis(200)),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(200), "gave up after {:?}", elapsed);
    assert!(mock.polls() >= 2);
}

#[tokio::test]
async fn test_download_follows_redirects() {
    let artifact = zip_bytes(&[("dist/index.html", "<html>")]);
    let (mock, client) = client_for(MockConfig {
        artifact: artifact.clone(),
        redirect_download: true,
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");

    let written = client.download(REMOTE_JOB_ID, &dest).await.unwrap();
    assert_eq!(written, artifact.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), artifact);
    assert_eq!(validate_archive(&dest).unwrap(), 1);
    assert_eq!(mock.downloads(), 1);
}

#[tokio::test]
async fn test_download_of_invalid_artifact_removes_file() {
    let (_mock, client) = client_for(MockConfig {
        artifact: b"<html>Bad gateway</html>".to_vec(),
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");

    let result = client.download(REMOTE_JOB_ID, &dest).await;
    assert!(matches!(result, Err(BuildError::InvalidArchive(_))));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_unreachable_service() {
    // Bind then drop a listener to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RemoteBuildClient::new(&format!("http://{}/api", addr), fast_options()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let result = client.enqueue(&archive_file(&dir)).await;
    assert!(matches!(result, Err(BuildError::HttpError(_))));
}
