use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::build::Builder;
use crate::config::{RoleConfig, StageConfig};
use crate::constants::ENGINE_PATH_FLAG;
use crate::deploy::Deployer;
use crate::error::{Error, Result};
use crate::platform::PlatformProfile;
use crate::report::Reporter;
use crate::supervisor::{ProcessCommand, RunOutcome, StdioMode, Supervisor};

/// What a single invocation should do.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub release: bool,
    pub skip_build: bool,
    /// Engine executable; the run phase only happens when this is set.
    pub engine: Option<PathBuf>,
    pub stdio_mode: StdioMode,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    /// Absolute paths of every staged library, in copy order.
    pub deployed: Vec<PathBuf>,
    pub run: Option<RunOutcome>,
}

/// Build, deploy, then optionally run, stopping at the first failing phase.
pub struct Pipeline<'a> {
    config: &'a StageConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a StageConfig, reporter: &'a dyn Reporter) -> Self {
        Self { config, reporter }
    }

    /// Runs against the host platform.
    pub fn run(&self, options: &PipelineOptions) -> Result<PipelineOutcome> {
        let profile = PlatformProfile::resolve()?;
        self.run_with(&profile, options)
    }

    /// Runs as if the host reported `os`.
    pub fn run_on(&self, os: &str, options: &PipelineOptions) -> Result<PipelineOutcome> {
        let profile = PlatformProfile::resolve_for(os)?;
        self.run_with(&profile, options)
    }

    #[instrument(skip_all, fields(project = %self.config.project.name, family = %profile.family()))]
    pub fn run_with(
        &self,
        profile: &PlatformProfile,
        options: &PipelineOptions,
    ) -> Result<PipelineOutcome> {
        let session = match &options.engine {
            Some(engine) => Some(self.session_commands(engine)?),
            None => None,
        };

        let builder = Builder::new(
            profile,
            &self.config.build,
            self.config.crate_root(),
            self.config.target_dir(),
        );

        if options.skip_build {
            info!(target: "stagecraft", "skip build: --no-build");
        } else {
            self.reporter.on_build_started(options.release);
            let result = builder.build(options.release);
            match &result {
                Ok(()) => self.reporter.on_build_result(Ok(())),
                Err(Error::Build(e)) => self.reporter.on_build_result(Err(e)),
                Err(e) => self.reporter.on_build_aborted(e),
            }
            result?;
        }

        let deployed = self.deploy(profile, &builder, options.release)?;

        let run = match session {
            Some((server, client)) => {
                let mut supervisor = Supervisor::new(self.reporter);
                Some(supervisor.run(&server, &client, options.stdio_mode)?)
            }
            None => None,
        };

        Ok(PipelineOutcome { deployed, run })
    }

    fn deploy(
        &self,
        profile: &PlatformProfile,
        builder: &Builder<'_>,
        release: bool,
    ) -> Result<Vec<PathBuf>> {
        let deployer = Deployer::new(profile);
        let groups = self
            .config
            .deploy
            .iter()
            .map(|group| {
                let artifacts = builder.artifacts(&group.artifacts, release);
                let destinations = group
                    .destinations
                    .iter()
                    .map(|dir| self.config.resolve(dir))
                    .collect::<Vec<_>>();
                (artifacts, destinations)
            })
            .collect::<Vec<_>>();

        let tasks = groups
            .iter()
            .map(|(artifacts, destinations)| artifacts.len() * destinations.len())
            .sum();
        self.reporter.on_deploy_started(tasks);

        let mut deployed = Vec::with_capacity(tasks);
        for (artifacts, destinations) in &groups {
            deployed.extend(deployer.deploy(artifacts, destinations, self.reporter)?);
        }

        self.reporter.on_deploy_finished(&deployed);
        Ok(deployed)
    }

    fn session_commands(&self, engine: &Path) -> Result<(ProcessCommand, ProcessCommand)> {
        let run = self.config.run.as_ref().ok_or(Error::MissingRunConfig)?;
        Ok((
            self.engine_command(engine, &run.server),
            self.engine_command(engine, &run.client),
        ))
    }

    fn engine_command(&self, engine: &Path, role: &RoleConfig) -> ProcessCommand {
        ProcessCommand::new(engine)
            .args(&role.args)
            .arg(ENGINE_PATH_FLAG)
            .arg(self.config.resolve(&role.project))
    }
}
