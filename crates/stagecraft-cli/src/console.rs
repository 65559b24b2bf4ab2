use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use stagecraft_core::deploy::CopyTask;
use stagecraft_core::{BuildError, DeployError, Error, ProcessRole, Reporter};

use crate::styles::{paint, FAILURE, HINT, PATH, SUCCESS};

/// Narrates a run on stdout, with paths shown relative to the project root.
#[derive(Debug)]
pub struct ConsoleReporter {
    root: PathBuf,
}

impl ConsoleReporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pretty(&self, path: &Path) -> String {
        let shown = path.strip_prefix(&self.root).unwrap_or(path);
        let text = shown.to_string_lossy().replace('\\', "/");
        paint(PATH, text)
    }

    fn copy_line(&self, task: &CopyTask) -> String {
        format!(
            "{} to {}",
            self.pretty(&task.source_path),
            self.pretty(&task.destination_directory)
        )
    }
}

fn flush() {
    let _ = std::io::stdout().flush();
}

impl Reporter for ConsoleReporter {
    fn on_build_started(&self, release: bool) {
        let profile = if release { "release" } else { "debug" };
        print!("Building crates ({profile})... ");
        flush();
    }

    fn on_build_result(&self, result: Result<(), &BuildError>) {
        match result {
            Ok(()) => println!("Build {}!", paint(SUCCESS, "successful")),
            Err(e) => {
                println!("The {}, tsk tsk tsk!", paint(FAILURE, "build failed"));
                println!("{}", e.stderr_text);
            }
        }
    }

    fn on_build_aborted(&self, _error: &Error) {
        println!("{}", paint(FAILURE, "aborted"));
    }

    fn on_deploy_started(&self, tasks: usize) {
        println!("Copying native libraries ({tasks})...");
    }

    fn on_copy_result(&self, task: &CopyTask, result: Result<&Path, &DeployError>) {
        match result {
            Ok(_) => println!("\t{} {}", paint(SUCCESS, "Copied"), self.copy_line(task)),
            Err(e) => {
                match e {
                    DeployError::SourceMissing { source_path } => println!(
                        "\t{} {}!",
                        paint(FAILURE, "Missing file"),
                        self.pretty(source_path)
                    ),
                    DeployError::PermissionDenied { .. } => println!(
                        "\t{} copying {}!",
                        paint(FAILURE, "Permission error"),
                        self.copy_line(task)
                    ),
                    DeployError::DestinationMissing { directory } => println!(
                        "\t{} {}!",
                        paint(FAILURE, "Missing directory"),
                        self.pretty(directory)
                    ),
                    DeployError::Io { source, .. } => println!(
                        "\t{} copying {}: {}",
                        paint(FAILURE, "Failed"),
                        self.copy_line(task),
                        source
                    ),
                }
                if let Some(help) = e.help() {
                    println!("{}", paint(HINT, help));
                }
            }
        }
    }

    fn on_deploy_finished(&self, deployed: &[PathBuf]) {
        println!(
            "Successfully copied {} native {}.",
            deployed.len(),
            if deployed.len() == 1 { "library" } else { "libraries" }
        );
    }

    fn on_process_spawned(&self, role: ProcessRole, pid: u32) {
        match role {
            ProcessRole::Server => println!(
                "Server {} with PID {}.",
                paint(SUCCESS, "running"),
                paint(PATH, pid)
            ),
            ProcessRole::Client => println!("Client {}.", paint(SUCCESS, "running")),
        }
    }

    fn on_server_killing(&self, pid: u32) {
        print!("Killing server (PID {})... ", paint(PATH, pid));
        flush();
    }

    fn on_process_exited(&self, role: ProcessRole, _pid: u32, status: ExitStatus) {
        match role {
            ProcessRole::Client => {
                println!("Client has been {} ({}).", paint(FAILURE, "closed"), status)
            }
            ProcessRole::Server => println!("Server {}.", paint(FAILURE, "closed")),
        }
    }
}
