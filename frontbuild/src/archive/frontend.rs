//! Frontend source archive
//!
//! Builds the zip uploaded to the remote build service from an allow-list of
//! top-level project paths. The output is deterministic: entries are sorted
//! and carry a fixed modification time.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::errors::BuildError;
use crate::utils::sha256_file;

/// What goes into the archive
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Top-level files included when present
    pub include_files: Vec<String>,

    /// Top-level directories included recursively when present
    pub include_dirs: Vec<String>,

    /// Directory names pruned at any depth
    pub exclude_dir_names: HashSet<String>,

    /// File names skipped at any depth
    pub exclude_file_names: HashSet<String>,

    /// Project-relative paths skipped entirely
    pub exclude_paths: HashSet<String>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            include_files: strings(&[
                "package.json",
                "package-lock.json",
                "yarn.lock",
                "pnpm-lock.yaml",
                ".npmrc",
                "vite.config.js",
                "vite.config.mjs",
                "vite.config.ts",
                "tsconfig.json",
                "jsconfig.json",
                "postcss.config.js",
                "postcss.config.cjs",
                "tailwind.config.js",
                "tailwind.config.ts",
            ]),
            include_dirs: strings(&["resources", "public"]),
            exclude_dir_names: strings(&[
                "node_modules",
                ".git",
                ".svn",
                ".hg",
                ".idea",
                ".vscode",
                ".cache",
            ]),
            exclude_file_names: strings(&[".DS_Store", "Thumbs.db", "desktop.ini"]),
            exclude_paths: strings(&["public/build", "public/hot", "public/storage"]),
        }
    }
}

fn strings<C: FromIterator<String>>(items: &[&str]) -> C {
    items.iter().map(|s| s.to_string()).collect()
}

/// Result of a successful archive build
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub bytes: u64,
    pub sha256: String,
}

/// Build the upload archive for `project_root` at `output_path`
///
/// Any existing file at `output_path` is overwritten. Fails with
/// [`BuildError::InvalidArchive`] unless the result opens and holds at least
/// one entry.
pub async fn create_frontend_archive(
    project_root: &Path,
    output_path: &Path,
    options: &ArchiveOptions,
) -> Result<ArchiveSummary, BuildError> {
    let project_root = project_root.to_path_buf();
    let output_path = output_path.to_path_buf();
    let options = options.clone();

    tokio::task::spawn_blocking(move || build_archive(&project_root, &output_path, &options))
        .await?
}

fn build_archive(
    project_root: &Path,
    output_path: &Path,
    options: &ArchiveOptions,
) -> Result<ArchiveSummary, BuildError> {
    if !project_root.is_dir() {
        return Err(BuildError::InvalidArchive(format!(
            "project root {} is not a directory",
            project_root.display()
        )));
    }

    let mut entries = collect_entries(project_root, options)?;
    entries.sort_by(|a, b| a.1.cmp(&b.1));
    debug!("Archiving {} files from {}", entries.len(), project_root.display());

    let file = fs::File::create(output_path)?;
    let mut zip = ZipWriter::new(file);
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    for (source, name) in &entries {
        zip.start_file(name.as_str(), file_options)?;
        let mut reader = fs::File::open(source)?;
        io::copy(&mut reader, &mut zip)?;
    }
    zip.finish()?;

    let count = validate_archive(output_path)?;
    let summary = ArchiveSummary {
        entries: count,
        bytes: fs::metadata(output_path)?.len(),
        sha256: sha256_file(output_path)?,
    };
    info!(
        "Created archive {} ({} entries, {} bytes)",
        output_path.display(),
        summary.entries,
        summary.bytes
    );
    Ok(summary)
}

fn collect_entries(
    project_root: &Path,
    options: &ArchiveOptions,
) -> Result<Vec<(PathBuf, String)>, BuildError> {
    let mut entries = Vec::new();

    for name in &options.include_files {
        let path = project_root.join(name);
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_file() && !is_excluded_file(name, name, options) => {
                entries.push((path, name.clone()));
            }
            _ => {}
        }
    }

    for name in &options.include_dirs {
        let path = project_root.join(name);
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() && !options.exclude_paths.contains(name) => {
                walk_dir(&path, name, options, &mut entries)?;
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn walk_dir(
    dir: &Path,
    relative: &str,
    options: &ArchiveOptions,
    entries: &mut Vec<(PathBuf, String)>,
) -> Result<(), BuildError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            warn!("Skipping non UTF-8 path {}", entry.path().display());
            continue;
        };
        let child = format!("{}/{}", relative, name);

        // file_type() does not follow symlinks, so links are never archived
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if options.exclude_dir_names.contains(name) || options.exclude_paths.contains(&child) {
                continue;
            }
            walk_dir(&entry.path(), &child, options, entries)?;
        } else if file_type.is_file() && !is_excluded_file(name, &child, options) {
            entries.push((entry.path(), child));
        }
    }
    Ok(())
}

fn is_excluded_file(name: &str, relative: &str, options: &ArchiveOptions) -> bool {
    options.exclude_file_names.contains(name) || options.exclude_paths.contains(relative)
}

/// Check that `path` is an openable zip with at least one entry
///
/// Returns the number of entries.
pub fn validate_archive(path: &Path) -> Result<usize, BuildError> {
    let file = fs::File::open(path)
        .map_err(|e| BuildError::InvalidArchive(format!("{}: {}", path.display(), e)))?;
    let archive = ZipArchive::new(file)
        .map_err(|e| BuildError::InvalidArchive(format!("{}: {}", path.display(), e)))?;

    if archive.len() == 0 {
        return Err(BuildError::InvalidArchive(format!(
            "{} has no entries",
            path.display()
        )));
    }
    Ok(archive.len())
}

/// Entry names of a zip archive, in archive order
pub fn list_entries(path: &Path) -> Result<Vec<String>, BuildError> {
    let archive = ZipArchive::new(fs::File::open(path)?)?;
    Ok(archive.file_names().map(str::to_string).collect())
}
