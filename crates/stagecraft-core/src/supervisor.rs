//! Launching and tearing down the client/server pair.
//!
//! The server starts first, then the client. Only the client is waited on;
//! once it exits the server is killed and reaped. There is no timeout, so a
//! client that never exits keeps the supervisor blocked.

use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::report::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessRole {
    Server,
    Client,
}

impl ProcessRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl Display for ProcessRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which process, if any, writes to the supervisor's terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    #[default]
    None,
    Server,
    Client,
}

impl StdioMode {
    pub fn routing_for(self, role: ProcessRole) -> StdioRouting {
        match (self, role) {
            (Self::Server, ProcessRole::Server) | (Self::Client, ProcessRole::Client) => {
                StdioRouting::Inherited
            }
            _ => StdioRouting::Suppressed,
        }
    }
}

/// Where a child's stdout and stderr go. Stdin is always inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioRouting {
    Inherited,
    Suppressed,
}

impl StdioRouting {
    fn stdio(self) -> Stdio {
        match self {
            Self::Inherited => Stdio::inherit(),
            Self::Suppressed => Stdio::null(),
        }
    }
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// A running child. Consumed once its exit status has been observed.
#[derive(Debug)]
pub struct ProcessHandle {
    role: ProcessRole,
    pid: u32,
    stdio: StdioRouting,
    child: Child,
}

impl ProcessHandle {
    fn spawn(role: ProcessRole, command: &ProcessCommand, stdio: StdioRouting) -> Result<Self> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::inherit())
            .stdout(stdio.stdio())
            .stderr(stdio.stdio())
            .spawn()
            .map_err(|source| Error::ProcessSpawn {
                program: command.program.display().to_string(),
                source,
            })?;
        let pid = child.id();
        debug!("spawned {} with pid {} ({:?})", role, pid, stdio);
        Ok(Self {
            role,
            pid,
            stdio,
            child,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Sends a forced kill. A child that already exited is not an error.
    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("kill of {} (pid {}) failed: {}", self.role, self.pid, e);
        }
    }

    fn wait(mut self) -> Result<ProcessExit> {
        let status = self.child.wait().map_err(|source| Error::Wait {
            what: self.role.as_str(),
            pid: self.pid,
            source,
        })?;
        Ok(ProcessExit {
            role: self.role,
            pid: self.pid,
            stdio: self.stdio,
            status,
        })
    }
}

/// The observed end of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub role: ProcessRole,
    pub pid: u32,
    pub stdio: StdioRouting,
    pub status: ExitStatus,
}

impl ProcessExit {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Exit information for both halves of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub server: ProcessExit,
    pub client: ProcessExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NotStarted,
    ServerSpawned,
    ClientSpawned,
    ClientExited,
    ServerKilled,
    Done,
}

impl SupervisorState {
    fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::ServerSpawned),
            Self::ServerSpawned => Some(Self::ClientSpawned),
            Self::ClientSpawned => Some(Self::ClientExited),
            Self::ClientExited => Some(Self::ServerKilled),
            Self::ServerKilled => Some(Self::Done),
            Self::Done => None,
        }
    }
}

/// Runs one client/server session. A supervisor is single use.
pub struct Supervisor<'r> {
    reporter: &'r dyn Reporter,
    state: SupervisorState,
}

impl<'r> Supervisor<'r> {
    pub fn new(reporter: &'r dyn Reporter) -> Self {
        Self {
            reporter,
            state: SupervisorState::NotStarted,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    fn advance(&mut self, to: SupervisorState) {
        debug_assert_eq!(self.state.next(), Some(to), "supervisor states are strictly ordered");
        debug!("supervisor {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    /// Runs the session to completion.
    ///
    /// The client's exit code is reported but never treated as a failure.
    ///
    /// # Errors
    /// [`Error::ProcessSpawn`] if either process cannot be started and
    /// [`Error::SupervisorReused`] if this supervisor already ran. Once the
    /// server is up, every failure kills and reaps it before returning.
    #[instrument(skip_all, fields(mode = ?stdio_mode))]
    pub fn run(
        &mut self,
        server: &ProcessCommand,
        client: &ProcessCommand,
        stdio_mode: StdioMode,
    ) -> Result<RunOutcome> {
        if self.state != SupervisorState::NotStarted {
            return Err(Error::SupervisorReused { state: self.state });
        }

        let server_handle = ProcessHandle::spawn(
            ProcessRole::Server,
            server,
            stdio_mode.routing_for(ProcessRole::Server),
        )?;
        self.advance(SupervisorState::ServerSpawned);
        self.reporter
            .on_process_spawned(ProcessRole::Server, server_handle.pid());

        let client_handle = match ProcessHandle::spawn(
            ProcessRole::Client,
            client,
            stdio_mode.routing_for(ProcessRole::Client),
        ) {
            Ok(handle) => handle,
            Err(e) => return Err(self.abandon(server_handle, e)),
        };
        self.advance(SupervisorState::ClientSpawned);
        self.reporter
            .on_process_spawned(ProcessRole::Client, client_handle.pid());

        let client_exit = match client_handle.wait() {
            Ok(exit) => exit,
            Err(e) => return Err(self.abandon(server_handle, e)),
        };
        self.advance(SupervisorState::ClientExited);
        info!(target: "stagecraft", "client exited with {}", client_exit.status);
        self.reporter
            .on_process_exited(ProcessRole::Client, client_exit.pid, client_exit.status);

        self.reporter.on_server_killing(server_handle.pid());
        let server_exit = self.stop_server(server_handle)?;
        self.advance(SupervisorState::ServerKilled);
        self.advance(SupervisorState::Done);

        Ok(RunOutcome {
            server: server_exit,
            client: client_exit,
        })
    }

    /// Tears the server down after `error` and hands the error back.
    fn abandon(&self, server: ProcessHandle, error: Error) -> Error {
        warn!("stopping server after failure: {}", error);
        if let Err(e) = self.stop_server(server) {
            warn!("server cleanup failed: {}", e);
        }
        error
    }

    fn stop_server(&self, mut server: ProcessHandle) -> Result<ProcessExit> {
        server.kill();
        let exit = server.wait()?;
        debug!("server exited with {}", exit.status);
        self.reporter
            .on_process_exited(ProcessRole::Server, exit.pid, exit.status);
        Ok(exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_inherits_exactly_the_selected_role() {
        assert_eq!(
            StdioMode::Server.routing_for(ProcessRole::Server),
            StdioRouting::Inherited
        );
        assert_eq!(
            StdioMode::Server.routing_for(ProcessRole::Client),
            StdioRouting::Suppressed
        );
        assert_eq!(
            StdioMode::Client.routing_for(ProcessRole::Client),
            StdioRouting::Inherited
        );
        assert_eq!(
            StdioMode::Client.routing_for(ProcessRole::Server),
            StdioRouting::Suppressed
        );
        for role in [ProcessRole::Server, ProcessRole::Client] {
            assert_eq!(StdioMode::None.routing_for(role), StdioRouting::Suppressed);
        }
    }

    #[test]
    fn states_advance_in_a_single_chain() {
        let mut state = SupervisorState::NotStarted;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }
        assert_eq!(
            seen,
            vec![
                SupervisorState::NotStarted,
                SupervisorState::ServerSpawned,
                SupervisorState::ClientSpawned,
                SupervisorState::ClientExited,
                SupervisorState::ServerKilled,
                SupervisorState::Done,
            ]
        );
    }

    #[cfg(unix)]
    mod unix {
        use std::os::unix::process::ExitStatusExt;

        use super::super::*;
        use crate::report::testing::{Event, RecordingReporter};
        use crate::report::NullReporter;

        fn sleeper() -> ProcessCommand {
            ProcessCommand::new("sleep").arg("30")
        }

        fn shell(script: &str) -> ProcessCommand {
            ProcessCommand::new("sh").args(["-c", script])
        }

        fn is_running(pid: u32) -> bool {
            std::process::Command::new("kill")
                .args(["-0", &pid.to_string()])
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        }

        #[test]
        fn server_is_killed_after_client_exits() {
            let reporter = RecordingReporter::default();
            let mut supervisor = Supervisor::new(&reporter);

            let outcome = supervisor
                .run(&sleeper(), &shell("exit 0"), StdioMode::None)
                .expect("run should complete");

            assert!(outcome.client.status.success());
            assert_eq!(outcome.server.status.signal(), Some(9));
            assert_eq!(outcome.server.code(), None);
            assert!(!is_running(outcome.server.pid));
            assert_eq!(supervisor.state(), SupervisorState::Done);
            assert_eq!(
                reporter.events(),
                vec![
                    Event::Spawned {
                        role: ProcessRole::Server
                    },
                    Event::Spawned {
                        role: ProcessRole::Client
                    },
                    Event::Exited {
                        role: ProcessRole::Client
                    },
                    Event::Killing,
                    Event::Exited {
                        role: ProcessRole::Server
                    },
                ]
            );
        }

        #[test]
        fn client_failure_code_is_returned_not_raised() {
            let mut supervisor = Supervisor::new(&NullReporter);

            let outcome = supervisor
                .run(&sleeper(), &shell("exit 7"), StdioMode::None)
                .expect("client exit codes are not failures");

            assert_eq!(outcome.client.code(), Some(7));
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn server_mode_routes_only_server_output_to_terminal() {
            let dir = tempfile::tempdir().unwrap();
            let server_fds = dir.path().join("server-fds");
            let client_fds = dir.path().join("client-fds");
            // Each child records where its own stdin, stdout and stderr point.
            let report = r#"fds="$(readlink /proc/$$/fd/0) $(readlink /proc/$$/fd/1) $(readlink /proc/$$/fd/2)"; echo "$fds""#;
            let server = shell(&format!(
                "{report} > '{0}.tmp' && mv '{0}.tmp' '{0}'; exec sleep 30",
                server_fds.display()
            ));
            let client = shell(&format!(
                "until [ -s '{0}' ]; do sleep 0.05; done; {report} > '{1}'",
                server_fds.display(),
                client_fds.display()
            ));

            let outcome = Supervisor::new(&NullReporter)
                .run(&server, &client, StdioMode::Server)
                .expect("run should complete");
            assert!(outcome.client.status.success());

            let own = |fd: u32| {
                std::fs::read_link(format!("/proc/self/fd/{fd}"))
                    .unwrap()
                    .display()
                    .to_string()
            };
            let read = |path: &std::path::Path| {
                std::fs::read_to_string(path)
                    .unwrap()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            };
            assert_eq!(read(&server_fds), vec![own(0), own(1), own(2)]);
            assert_eq!(read(&client_fds), vec![own(0), "/dev/null".into(), "/dev/null".into()]);
        }

        #[test]
        fn supervisor_refuses_a_second_session() {
            let mut supervisor = Supervisor::new(&NullReporter);
            supervisor
                .run(&sleeper(), &shell("exit 0"), StdioMode::None)
                .expect("first run should complete");

            let err = supervisor
                .run(&sleeper(), &shell("exit 0"), StdioMode::None)
                .expect_err("second run must be rejected");

            assert!(matches!(
                err,
                Error::SupervisorReused {
                    state: SupervisorState::Done
                }
            ));
        }

        #[test]
        fn failure_after_server_start_reaps_the_server() {
            let reporter = RecordingReporter::default();
            let supervisor = Supervisor::new(&reporter);
            let server =
                ProcessHandle::spawn(ProcessRole::Server, &sleeper(), StdioRouting::Suppressed)
                    .unwrap();
            let pid = server.pid();

            let err = supervisor.abandon(
                server,
                Error::Wait {
                    what: "client",
                    pid: 0,
                    source: std::io::Error::from(std::io::ErrorKind::Interrupted),
                },
            );

            assert!(matches!(err, Error::Wait { what: "client", .. }));
            assert!(!is_running(pid));
            assert_eq!(
                reporter.events(),
                vec![Event::Exited {
                    role: ProcessRole::Server
                }]
            );
        }

        #[test]
        fn server_that_already_exited_is_still_reaped() {
            let mut supervisor = Supervisor::new(&NullReporter);

            let outcome = supervisor
                .run(&shell("exit 3"), &shell("sleep 0.2"), StdioMode::None)
                .expect("run should complete");

            assert_eq!(outcome.server.code(), Some(3));
            assert_eq!(supervisor.state(), SupervisorState::Done);
        }

        #[test]
        fn missing_server_program_is_a_spawn_failure() {
            let reporter = RecordingReporter::default();
            let mut supervisor = Supervisor::new(&reporter);

            let err = supervisor
                .run(
                    &ProcessCommand::new("/nonexistent/engine"),
                    &shell("exit 0"),
                    StdioMode::None,
                )
                .expect_err("server cannot start");

            assert!(matches!(err, Error::ProcessSpawn { .. }));
            assert_eq!(supervisor.state(), SupervisorState::NotStarted);
            assert!(reporter.events().is_empty());
        }

        #[test]
        fn missing_client_program_reaps_the_server() {
            let reporter = RecordingReporter::default();
            let mut supervisor = Supervisor::new(&reporter);

            let err = supervisor
                .run(
                    &sleeper(),
                    &ProcessCommand::new("/nonexistent/engine"),
                    StdioMode::None,
                )
                .expect_err("client cannot start");

            assert!(matches!(err, Error::ProcessSpawn { ref program, .. } if program == "/nonexistent/engine"));
            assert_eq!(
                reporter.events(),
                vec![
                    Event::Spawned {
                        role: ProcessRole::Server
                    },
                    Event::Exited {
                        role: ProcessRole::Server
                    },
                ]
            );
        }
    }
}
