//! Staging built libraries into consumer directories.
//!
//! Deployment is deliberately not transactional: copies run in a fixed order,
//! the first failure stops the run, and copies that already happened stay.

use std::fs::{self, FileTimes, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::error::DeployError;
use crate::platform::PlatformProfile;
use crate::report::Reporter;

/// A library the toolchain is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub logical_name: String,
    pub source_directory: PathBuf,
}

impl BuildArtifact {
    pub fn new(logical_name: impl Into<String>, source_directory: impl Into<PathBuf>) -> Self {
        Self {
            logical_name: logical_name.into(),
            source_directory: source_directory.into(),
        }
    }

    /// Where the library lands once the toolchain has run.
    pub fn source_path(&self, profile: &PlatformProfile) -> PathBuf {
        self.source_directory
            .join(profile.library_filename(&self.logical_name))
    }
}

/// One copy of one library into one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    pub source_path: PathBuf,
    pub destination_directory: PathBuf,
    pub file_name: String,
}

impl CopyTask {
    pub fn destination_path(&self) -> PathBuf {
        self.destination_directory.join(&self.file_name)
    }
}

/// Performs a single copy task.
pub trait FileCopier {
    /// Copies `task.source_path` into the destination directory and returns
    /// the absolute path of the new file.
    fn copy(&self, task: &CopyTask) -> Result<PathBuf, DeployError>;
}

/// Copies on the local filesystem, keeping permissions and timestamps.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCopier;

impl FileCopier for FsCopier {
    fn copy(&self, task: &CopyTask) -> Result<PathBuf, DeployError> {
        let destination = task.destination_path();

        // Both checks happen before the destination is opened, so a failure
        // here leaves the consumer directory untouched.
        let metadata = match fs::metadata(&task.source_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DeployError::SourceMissing {
                    source_path: task.source_path.clone(),
                });
            }
            Err(source) => return Err(io_error(task, &destination, source)),
        };
        if !task.destination_directory.is_dir() {
            return Err(DeployError::DestinationMissing {
                directory: task.destination_directory.clone(),
            });
        }

        fs::copy(&task.source_path, &destination)
            .map_err(|source| classify(task, &destination, source))?;

        match (metadata.accessed(), metadata.modified()) {
            (Ok(accessed), Ok(modified)) => {
                let times = FileTimes::new()
                    .set_accessed(accessed)
                    .set_modified(modified);
                OpenOptions::new()
                    .write(true)
                    .open(&destination)
                    .and_then(|file| file.set_times(times))
                    .map_err(|source| io_error(task, &destination, source))?;
            }
            _ => debug!("timestamps unavailable for {}", task.source_path.display()),
        }

        std::path::absolute(&destination).map_err(|source| io_error(task, &destination, source))
    }
}

#[cfg(windows)]
const LOCKED_FILE_CODES: &[i32] = &[
    32, // ERROR_SHARING_VIOLATION
    33, // ERROR_LOCK_VIOLATION
];

#[cfg(not(windows))]
const LOCKED_FILE_CODES: &[i32] = &[
    26, // ETXTBSY
];

/// True when `err` means the destination is held open or write-protected.
pub fn is_locked_or_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
        || err
            .raw_os_error()
            .is_some_and(|code| LOCKED_FILE_CODES.contains(&code))
}

fn classify(task: &CopyTask, destination: &Path, source: io::Error) -> DeployError {
    if is_locked_or_denied(&source) {
        return DeployError::PermissionDenied {
            destination: destination.to_path_buf(),
            source,
        };
    }
    if source.kind() == io::ErrorKind::NotFound && !task.source_path.exists() {
        return DeployError::SourceMissing {
            source_path: task.source_path.clone(),
        };
    }
    io_error(task, destination, source)
}

fn io_error(task: &CopyTask, destination: &Path, source: io::Error) -> DeployError {
    DeployError::Io {
        source_path: task.source_path.clone(),
        destination: destination.to_path_buf(),
        source,
    }
}

/// Copies artifacts into consumer directories, stopping at the first failure.
#[derive(Debug)]
pub struct Deployer<'a, C = FsCopier> {
    profile: &'a PlatformProfile,
    copier: C,
}

impl<'a> Deployer<'a> {
    pub fn new(profile: &'a PlatformProfile) -> Self {
        Self::with_copier(profile, FsCopier)
    }
}

impl<'a, C: FileCopier> Deployer<'a, C> {
    pub fn with_copier(profile: &'a PlatformProfile, copier: C) -> Self {
        Self { profile, copier }
    }

    /// Expands artifacts and destinations into copy tasks, artifact-major,
    /// keeping the caller's order on both axes.
    pub fn plan(&self, artifacts: &[BuildArtifact], destinations: &[PathBuf]) -> Vec<CopyTask> {
        artifacts
            .iter()
            .flat_map(|artifact| {
                let source_path = artifact.source_path(self.profile);
                let file_name = self.profile.library_filename(&artifact.logical_name);
                destinations.iter().map(move |destination| CopyTask {
                    source_path: source_path.clone(),
                    destination_directory: destination.clone(),
                    file_name: file_name.clone(),
                })
            })
            .collect()
    }

    /// Runs every copy task in order.
    ///
    /// # Errors
    /// Returns the first failing task's error. Remaining tasks are not
    /// attempted and earlier copies are not rolled back.
    #[instrument(skip_all, fields(artifacts = artifacts.len(), destinations = destinations.len()))]
    pub fn deploy(
        &self,
        artifacts: &[BuildArtifact],
        destinations: &[PathBuf],
        reporter: &dyn Reporter,
    ) -> Result<Vec<PathBuf>, DeployError> {
        let tasks = self.plan(artifacts, destinations);
        let mut deployed = Vec::with_capacity(tasks.len());

        for task in &tasks {
            match self.copier.copy(task) {
                Ok(path) => {
                    debug!("copied {} to {}", task.source_path.display(), path.display());
                    reporter.on_copy_result(task, Ok(&path));
                    deployed.push(path);
                }
                Err(e) => {
                    warn!("copy of {} stopped the deploy: {}", task.file_name, e);
                    reporter.on_copy_result(task, Err(&e));
                    return Err(e);
                }
            }
        }

        Ok(deployed)
    }
}
