//! Artifact deployment tests

use std::path::Path;

use frontbuild::deploy::artifact::{deploy, DeployOptions, DeployedLayout};
use frontbuild::errors::BuildError;

use crate::common::{read_file, sample_project, write_file, zip_bytes};

fn write_artifact(dir: &Path, files: &[(&str, &str)]) -> std::path::PathBuf {
    let path = dir.join("artifact.zip");
    std::fs::write(&path, zip_bytes(files)).unwrap();
    path
}

fn scratch_dirs(project_root: &Path) -> Vec<String> {
    std::fs::read_dir(project_root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".frontbuild-deploy-"))
        .collect()
}

#[tokio::test]
async fn test_deploy_each_output_layout() {
    for layout in ["public/build", "build", "dist"] {
        let project = sample_project();
        let jobs = tempfile::tempdir().unwrap();
        let manifest = format!("{}/manifest.json", layout);
        let script = format!("{}/assets/app.js", layout);
        let artifact = write_artifact(
            jobs.path(),
            &[
                (manifest.as_str(), "{}"),
                (script.as_str(), "console.log('new')"),
            ],
        );

        let deployed = deploy(project.path(), &artifact, &DeployOptions::default())
            .await
            .unwrap();
        assert_eq!(deployed, DeployedLayout::Output(layout.to_string()));

        let live = project.path().join("public/build");
        assert_eq!(read_file(&live, "manifest.json"), "{}");
        assert_eq!(read_file(&live, "assets/app.js"), "console.log('new')");
        // replaced wholesale, nothing merged from the old tree
        assert!(!live.join("old.js").exists());
        // untouched siblings
        assert_eq!(read_file(project.path(), "public/favicon.ico"), "icon");
        assert!(scratch_dirs(project.path()).is_empty());
    }
}

#[tokio::test]
async fn test_deploy_prefers_earlier_layouts() {
    let project = sample_project();
    let jobs = tempfile::tempdir().unwrap();
    let artifact = write_artifact(
        jobs.path(),
        &[("dist/from-dist.js", "dist"), ("build/from-build.js", "build")],
    );

    let deployed = deploy(project.path(), &artifact, &DeployOptions::default())
        .await
        .unwrap();
    assert_eq!(deployed, DeployedLayout::Output("build".to_string()));
    assert!(project.path().join("public/build/from-build.js").exists());
    assert!(!project.path().join("public/build/from-dist.js").exists());
}

#[tokio::test]
async fn test_deploy_public_fallback_replaces_public() {
    let project = sample_project();
    let jobs = tempfile::tempdir().unwrap();
    let artifact = write_artifact(jobs.path(), &[("public/robots.txt", "User-agent: *")]);

    let deployed = deploy(project.path(), &artifact, &DeployOptions::default())
        .await
        .unwrap();
    assert_eq!(deployed, DeployedLayout::PublicFallback);
    assert_eq!(read_file(project.path(), "public/robots.txt"), "User-agent: *");
    assert!(!project.path().join("public/favicon.ico").exists());
    assert!(!project.path().join("public/build").exists());
}

#[tokio::test]
async fn test_deploy_creates_missing_deployment_dir() {
    let project = tempfile::tempdir().unwrap();
    let jobs = tempfile::tempdir().unwrap();
    let artifact = write_artifact(jobs.path(), &[("dist/index.html", "<html>")]);

    deploy(project.path(), &artifact, &DeployOptions::default())
        .await
        .unwrap();
    assert_eq!(read_file(project.path(), "public/build/index.html"), "<html>");
}

#[tokio::test]
async fn test_deploy_without_output_leaves_project_alone() {
    let project = sample_project();
    let jobs = tempfile::tempdir().unwrap();
    let artifact = write_artifact(jobs.path(), &[("src/main.js", "console.log(1)")]);

    let result = deploy(project.path(), &artifact, &DeployOptions::default()).await;
    match result {
        Err(BuildError::DeployError(message)) => {
            assert_eq!(message, "artifact missing expected output")
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(read_file(project.path(), "public/build/old.js"), "console.log('old')");
    assert!(scratch_dirs(project.path()).is_empty());
}

#[tokio::test]
async fn test_deploy_rejects_corrupt_artifact() {
    let project = sample_project();
    let jobs = tempfile::tempdir().unwrap();
    let artifact = jobs.path().join("artifact.zip");
    std::fs::write(&artifact, "definitely not a zip").unwrap();

    let result = deploy(project.path(), &artifact, &DeployOptions::default()).await;
    assert!(matches!(result, Err(BuildError::ZipError(_))));
    assert_eq!(read_file(project.path(), "public/build/old.js"), "console.log('old')");
    assert!(scratch_dirs(project.path()).is_empty());
}

#[tokio::test]
async fn test_deploy_into_custom_directory() {
    let project = sample_project();
    let jobs = tempfile::tempdir().unwrap();
    let artifact = write_artifact(jobs.path(), &[("dist/app.js", "new")]);
    write_file(project.path(), "web/assets/stale.js", "old");

    let options = DeployOptions {
        deployment_dir: "web/assets".to_string(),
        ..Default::default()
    };
    deploy(project.path(), &artifact, &options).await.unwrap();

    assert_eq!(read_file(project.path(), "web/assets/app.js"), "new");
    assert!(!project.path().join("web/assets/stale.js").exists());
    assert_eq!(read_file(project.path(), "public/build/old.js"), "console.log('old')");
}
