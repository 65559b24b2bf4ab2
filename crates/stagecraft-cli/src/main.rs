use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use stagecraft_core::constants::CONFIG_FILE;
use stagecraft_core::{Pipeline, PipelineOptions, PlatformProfile, StageConfig, StdioMode};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod console;
mod styles;

use console::ConsoleReporter;
use styles as s;

/// The command-line interface for stagecraft.
#[derive(Debug, Parser)]
#[command(name = "stagecraft")]
#[command(version)]
#[command(styles = s::get_clap_styles())]
#[command(about = "Build native libraries, stage them for the game, and run it")]
#[command(
    long_about = "Builds the project's shared libraries, copies the resulting .dll/.so files \
into every directory that needs them, and can launch the game server and client \
together so you don't have to juggle windows while testing.

The project layout is read from stagecraft.toml (see --config)."
)]
#[command(
    after_help = "\x1b[1;32mExamples:\x1b[0m\n  \x1b[36mstagecraft\x1b[0m                        \x1b[2m# Release build + copy\x1b[0m\n  \x1b[36mstagecraft --debug --no-build\x1b[0m     \x1b[2m# Re-copy existing debug libraries\x1b[0m\n  \x1b[36mstagecraft -r godot -s server\x1b[0m     \x1b[2m# Build, copy, run; show server output\x1b[0m"
)]
pub(crate) struct Cli {
    /// Build/copy the libraries in debug mode.
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Don't run the toolchain; copy whatever was built last.
    #[arg(long, default_value_t = false)]
    no_build: bool,
    /// Run the client & server with this engine executable after copying.
    #[arg(short = 'r', long = "run", value_name = "ENGINE")]
    engine: Option<PathBuf>,
    /// Whose stdout+stderr is shown while the game runs.
    #[arg(short = 's', long = "stdout", value_enum, default_value_t = StdoutTarget::Neither)]
    stdout: StdoutTarget,
    /// Path to the stagecraft config file.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StdoutTarget {
    #[value(alias = "s")]
    Server,
    #[value(alias = "c")]
    Client,
    Neither,
}

impl From<StdoutTarget> for StdioMode {
    fn from(target: StdoutTarget) -> Self {
        match target {
            StdoutTarget::Server => StdioMode::Server,
            StdoutTarget::Client => StdioMode::Client,
            StdoutTarget::Neither => StdioMode::None,
        }
    }
}

impl Cli {
    fn options(&self) -> PipelineOptions {
        PipelineOptions {
            release: !self.debug,
            skip_build: self.no_build,
            engine: self.engine.clone(),
            stdio_mode: self.stdout.into(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    debug!("parsed cli arguments: {:?}", cli);

    // Nothing else may run on a host we can't name libraries for.
    let profile = PlatformProfile::resolve().context("this tool does not support your OS")?;

    let cfg = StageConfig::load_from_file(&cli.config)
        .with_context(|| format!("unable to load config '{}'", cli.config.display()))?;

    execute(&cli, &cfg, &profile)
}

/// Runs the pipeline for a loaded config.
fn execute(cli: &Cli, cfg: &StageConfig, profile: &PlatformProfile) -> Result<()> {
    let root = std::path::absolute(cfg.base_dir()).unwrap_or_else(|_| cfg.base_dir().to_path_buf());
    let reporter = ConsoleReporter::new(root);

    let outcome = Pipeline::new(cfg, &reporter)
        .run_with(profile, &cli.options())
        .with_context(|| format!("stagecraft run for '{}' aborted", cfg.project.name))?;

    info!(target: "stagecraft", "staged {} file(s)", outcome.deployed.len());
    if let Some(run) = outcome.run {
        info!(target: "stagecraft",
            "session finished: client {}, server {}",
            run.client.status,
            run.server.status
        );
    }
    Ok(())
}
