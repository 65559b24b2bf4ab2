//! Core logic for stagecraft.
//!
//! This crate resolves the host platform, drives the toolchain, stages the
//! resulting shared libraries into consumer directories, and supervises the
//! client/server pair used for manual testing.

pub mod build;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod supervisor;

pub use build::Builder;
pub use config::StageConfig;
pub use deploy::{BuildArtifact, CopyTask, Deployer};
pub use error::{BuildError, DeployError, Error, Result};
pub use pipeline::{Pipeline, PipelineOptions, PipelineOutcome};
pub use platform::{OsFamily, PlatformProfile};
pub use report::{NullReporter, Reporter};
pub use supervisor::{ProcessRole, RunOutcome, StdioMode, Supervisor};
