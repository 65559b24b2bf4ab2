use std::path::PathBuf;

use thiserror::Error;

use crate::supervisor::SupervisorState;

/// Result alias for pipeline phases.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failures of a stagecraft run. Every variant ends the invocation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported platform '{os}': only windows and linux are supported")]
    UnsupportedPlatform { os: String },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("failed to start '{program}': {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait on {what} (pid {pid}): {source}")]
    Wait {
        what: &'static str,
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("a supervisor runs one session; this one is already {state:?}")]
    SupervisorReused { state: SupervisorState },

    #[error("nothing to run: the [run] section is missing from the config")]
    MissingRunConfig,
}

/// The toolchain exited unsuccessfully.
#[derive(Debug, Error)]
#[error("build failed ({status})")]
pub struct BuildError {
    pub status: std::process::ExitStatus,
    /// Everything the toolchain wrote to stderr, decoded lossily.
    pub stderr_text: String,
}

/// A single copy task failed; no later task was attempted.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("missing file {}", source_path.display())]
    SourceMissing { source_path: PathBuf },

    #[error("permission denied copying to {}", destination.display())]
    PermissionDenied {
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("destination directory {} does not exist", directory.display())]
    DestinationMissing { directory: PathBuf },

    #[error("failed to copy {} to {}: {source}", source_path.display(), destination.display())]
    Io {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// A short hint for the operator on how to get past this failure.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            Self::SourceMissing { .. } => {
                Some("you might need to build the artifacts first (drop --no-build)")
            }
            Self::PermissionDenied { .. } => Some("make sure the game isn't running"),
            Self::DestinationMissing { .. } => Some("check the deploy destinations in the config"),
            Self::Io { .. } => None,
        }
    }
}
