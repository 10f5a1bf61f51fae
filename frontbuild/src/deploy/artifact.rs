//! Artifact deployment
//!
//! The artifact is extracted into a scratch directory inside the project
//! root, so the final swap is a rename on the same filesystem. The scratch
//! directory is removed on the way out whatever happens.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{error, info};
use zip::ZipArchive;

use crate::errors::BuildError;

/// Where build output lives in an artifact, in lookup order
pub const ARTIFACT_LAYOUTS: [&str; 3] = ["public/build", "build", "dist"];

/// Deployment targets inside the project root
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Live deployment directory, relative to the project root
    pub deployment_dir: String,

    /// Public assets directory, replaced when the artifact only has `public`
    pub public_dir: String,

    /// Candidate output locations inside the artifact
    pub layouts: Vec<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            deployment_dir: "public/build".to_string(),
            public_dir: "public".to_string(),
            layouts: ARTIFACT_LAYOUTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Which part of the artifact was deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployedLayout {
    /// A build output directory replaced the deployment directory
    Output(String),

    /// The artifact's `public` tree replaced the project's public directory
    PublicFallback,
}

impl fmt::Display for DeployedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployedLayout::Output(layout) => write!(f, "{}", layout),
            DeployedLayout::PublicFallback => f.write_str("public (fallback)"),
        }
    }
}

/// Extract `artifact_path` and swap its build output into `project_root`
pub async fn deploy(
    project_root: &Path,
    artifact_path: &Path,
    options: &DeployOptions,
) -> Result<DeployedLayout, BuildError> {
    let project_root = project_root.to_path_buf();
    let artifact_path = artifact_path.to_path_buf();
    let options = options.clone();

    tokio::task::spawn_blocking(move || deploy_blocking(&project_root, &artifact_path, &options))
        .await?
}

fn deploy_blocking(
    project_root: &Path,
    artifact_path: &Path,
    options: &DeployOptions,
) -> Result<DeployedLayout, BuildError> {
    if !project_root.is_dir() {
        return Err(BuildError::DeployError(format!(
            "project root {} is not a directory",
            project_root.display()
        )));
    }

    let scratch = tempfile::Builder::new()
        .prefix(".frontbuild-deploy-")
        .tempdir_in(project_root)?;
    let extracted = scratch.path().join("extracted");
    fs::create_dir(&extracted)?;

    let mut archive = ZipArchive::new(fs::File::open(artifact_path)?)?;
    archive.extract(&extracted)?;

    for layout in &options.layouts {
        let source = extracted.join(layout);
        if source.is_dir() {
            let live = project_root.join(&options.deployment_dir);
            replace_dir(&source, &live, scratch.path())?;
            info!("Deployed artifact layout {} to {}", layout, live.display());
            return Ok(DeployedLayout::Output(layout.clone()));
        }
    }

    let public = extracted.join(&options.public_dir);
    if public.is_dir() {
        let live = project_root.join(&options.public_dir);
        replace_dir(&public, &live, scratch.path())?;
        info!("Deployed artifact public tree to {}", live.display());
        return Ok(DeployedLayout::PublicFallback);
    }

    Err(BuildError::DeployError(
        "artifact missing expected output".to_string(),
    ))
}

/// Replace `live` with `source` using two renames
///
/// The old tree is moved into `scratch` first and restored if the second
/// rename fails.
fn replace_dir(source: &Path, live: &Path, scratch: &Path) -> Result<(), BuildError> {
    if let Some(parent) = live.parent() {
        fs::create_dir_all(parent)?;
    }

    let retired: PathBuf = scratch.join("retired");
    let had_live = match fs::symlink_metadata(live) {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };
    if had_live {
        fs::rename(live, &retired)?;
    }

    if let Err(e) = fs::rename(source, live) {
        if had_live {
            if let Err(restore) = fs::rename(&retired, live) {
                error!("Failed to restore {}: {}", live.display(), restore);
            }
        }
        return Err(BuildError::DeployError(format!(
            "failed to move new output into {}: {}",
            live.display(),
            e
        )));
    }
    Ok(())
}
