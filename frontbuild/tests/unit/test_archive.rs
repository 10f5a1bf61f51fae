//! Upload archive tests

use frontbuild::archive::frontend::{create_frontend_archive, list_entries, ArchiveOptions};
use frontbuild::errors::BuildError;
use frontbuild::utils::sha256_file;

use crate::common::{sample_project, write_file};

#[tokio::test]
async fn test_archive_contains_only_allowed_paths() {
    let project = sample_project();
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("upload.zip");

    let summary = create_frontend_archive(project.path(), &path, &ArchiveOptions::default())
        .await
        .unwrap();

    let entries = list_entries(&path).unwrap();
    assert_eq!(
        entries,
        vec![
            "package.json",
            "public/favicon.ico",
            "resources/css/app.css",
            "resources/js/app.js",
            "vite.config.js",
        ]
    );
    assert_eq!(summary.entries, entries.len());
    assert_eq!(summary.bytes, std::fs::metadata(&path).unwrap().len());
    assert_eq!(summary.sha256, sha256_file(&path).unwrap());
}

#[tokio::test]
async fn test_archive_is_deterministic() {
    let project = sample_project();
    let out = tempfile::tempdir().unwrap();
    let first = out.path().join("first.zip");
    let second = out.path().join("second.zip");
    let options = ArchiveOptions::default();

    let a = create_frontend_archive(project.path(), &first, &options).await.unwrap();
    // touching a file changes its mtime but not the archive
    write_file(project.path(), "resources/js/app.js", "import './bootstrap'");
    let b = create_frontend_archive(project.path(), &second, &options).await.unwrap();

    assert_eq!(a.sha256, b.sha256);
    assert_eq!(a.bytes, b.bytes);
}

#[tokio::test]
async fn test_archive_overwrites_existing_output() {
    let project = sample_project();
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("upload.zip");
    std::fs::write(&path, "stale bytes").unwrap();

    let summary = create_frontend_archive(project.path(), &path, &ArchiveOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.entries, 5);
}

#[tokio::test]
async fn test_archive_of_project_without_sources_is_invalid() {
    let project = tempfile::tempdir().unwrap();
    write_file(project.path(), ".env", "APP_KEY=secret");
    write_file(project.path(), "node_modules/vite/index.js", "module.exports = 2");
    let out = tempfile::tempdir().unwrap();

    let result = create_frontend_archive(
        project.path(),
        &out.path().join("upload.zip"),
        &ArchiveOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(BuildError::InvalidArchive(_))));
}

#[tokio::test]
async fn test_archive_rejects_missing_project_root() {
    let out = tempfile::tempdir().unwrap();
    let result = create_frontend_archive(
        &out.path().join("missing"),
        &out.path().join("upload.zip"),
        &ArchiveOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(BuildError::InvalidArchive(_))));
}

#[tokio::test]
async fn test_archive_respects_custom_options() {
    let project = sample_project();
    write_file(project.path(), "resources/views/welcome.blade.php", "<html>");
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("upload.zip");

    let mut options = ArchiveOptions::default();
    options.include_dirs = vec!["resources".to_string()];
    options.exclude_paths.insert("resources/views".to_string());

    create_frontend_archive(project.path(), &path, &options).await.unwrap();
    let entries = list_entries(&path).unwrap();
    assert!(entries.contains(&"resources/js/app.js".to_string()));
    assert!(!entries.iter().any(|e| e.starts_with("public/")));
    assert!(!entries.iter().any(|e| e.starts_with("resources/views")));
}

#[cfg(unix)]
#[tokio::test]
async fn test_archive_skips_symlinks() {
    let project = sample_project();
    let outside = tempfile::tempdir().unwrap();
    write_file(outside.path(), "secret.txt", "do not upload");
    std::os::unix::fs::symlink(
        outside.path().join("secret.txt"),
        project.path().join("resources/js/linked.txt"),
    )
    .unwrap();
    std::os::unix::fs::symlink(outside.path(), project.path().join("resources/linked-dir")).unwrap();

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("upload.zip");
    create_frontend_archive(project.path(), &path, &ArchiveOptions::default())
        .await
        .unwrap();

    let entries = list_entries(&path).unwrap();
    assert!(!entries.iter().any(|e| e.contains("linked")));
}
