//! On-disk layout of the job root

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Paths for every job under a single job root
#[derive(Debug, Clone)]
pub struct JobLayout {
    /// Directory holding one subdirectory per job
    pub job_root: PathBuf,
}

impl JobLayout {
    /// Create a new job layout
    pub fn new(job_root: impl Into<PathBuf>) -> Self {
        Self {
            job_root: job_root.into(),
        }
    }

    /// Directory owned by one job
    pub fn job_dir(&self, job_id: &str) -> Dir {
        Dir::new(self.job_root.join(job_id))
    }

    /// Status record (JSON, replaced on every write)
    pub fn status_file(&self, job_id: &str) -> File {
        self.job_dir(job_id).file("status.json")
    }

    /// Append-only plain text log
    pub fn log_file(&self, job_id: &str) -> File {
        self.job_dir(job_id).file("job.log")
    }

    /// Archive sent to the remote build service
    pub fn upload_archive(&self, job_id: &str) -> File {
        self.job_dir(job_id).file("upload.zip")
    }

    /// Artifact downloaded from the remote build service
    pub fn artifact_archive(&self, job_id: &str) -> File {
        self.job_dir(job_id).file("artifact.zip")
    }

    /// Diagnostics written by detached worker processes
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.job_root.join("logs"))
    }
}

impl Default for JobLayout {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("frontbuild-jobs"))
    }
}
