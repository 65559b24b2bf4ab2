//! Structured progress events emitted by the pipeline.
//!
//! The pipeline never prints. Front ends implement [`Reporter`] to narrate a
//! run however they like; [`NullReporter`] keeps runs silent.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::deploy::CopyTask;
use crate::error::{BuildError, DeployError, Error};
use crate::supervisor::ProcessRole;

/// Receiver for pipeline events.
pub trait Reporter {
    /// The toolchain finished, successfully or not.
    fn on_build_result(&self, result: Result<(), &BuildError>);
    /// One copy task finished. `Ok` carries the absolute destination path.
    fn on_copy_result(&self, task: &CopyTask, result: Result<&Path, &DeployError>);
    fn on_process_spawned(&self, role: ProcessRole, pid: u32);
    fn on_process_exited(&self, role: ProcessRole, pid: u32, status: ExitStatus);

    fn on_build_started(&self, _release: bool) {}

    /// The toolchain never produced an exit status, e.g. it could not start.
    fn on_build_aborted(&self, _error: &Error) {}

    fn on_deploy_started(&self, _tasks: usize) {}

    fn on_deploy_finished(&self, _deployed: &[PathBuf]) {}

    /// The client is gone and the server is about to be killed.
    fn on_server_killing(&self, _pid: u32) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_build_result(&self, _result: Result<(), &BuildError>) {}

    fn on_copy_result(&self, _task: &CopyTask, _result: Result<&Path, &DeployError>) {}

    fn on_process_spawned(&self, _role: ProcessRole, _pid: u32) {}

    fn on_process_exited(&self, _role: ProcessRole, _pid: u32, _status: ExitStatus) {}
}
