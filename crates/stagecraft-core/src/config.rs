use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::constants::{BUILD_ARGS, BUILD_PROGRAM, BUILD_RELEASE_ARGS};

/// Project configuration, usually read from `stagecraft.toml`.
///
/// Relative paths are interpreted against the directory holding the file,
/// so the tool behaves the same from any working directory.
#[derive(Debug, Deserialize)]
pub struct StageConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub deploy: Vec<DeployGroup>,
    pub run: Option<RunConfig>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl StageConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::from_toml_str(&text, base_dir)
            .with_context(|| format!("invalid config: {}", path.display()))
    }

    /// Parses a config whose relative paths are anchored at `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut cfg = toml::from_str::<Self>(text).context("failed to parse TOML config")?;
        cfg.base_dir = base_dir.into();
        cfg.validate()?;
        debug!(
            "loaded config for project '{}' with {} deploy group(s)",
            cfg.project.name,
            cfg.deploy.len()
        );
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.build.program.trim().is_empty() {
            bail!("build.program must not be empty");
        }
        for (index, group) in self.deploy.iter().enumerate() {
            if group.artifacts.is_empty() {
                bail!("deploy group #{} lists no artifacts", index + 1);
            }
            if group.destinations.is_empty() {
                bail!("deploy group #{} lists no destinations", index + 1);
            }
            if let Some(name) = group.artifacts.iter().find(|name| name.trim().is_empty()) {
                bail!("deploy group #{} has an empty artifact name '{}'", index + 1, name);
            }
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Anchors `path` at the config directory unless it is already absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Working directory for the toolchain.
    pub fn crate_root(&self) -> PathBuf {
        self.resolve(&self.project.crate_root)
    }

    /// Directory the toolchain writes its profiles into.
    pub fn target_dir(&self) -> PathBuf {
        match &self.project.target_dir {
            Some(dir) => self.resolve(dir),
            None => self.crate_root().join("target"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_crate_root")]
    pub crate_root: PathBuf,
    pub target_dir: Option<PathBuf>,
}

fn default_crate_root() -> PathBuf {
    PathBuf::from(".")
}

/// How to invoke the toolchain.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Appended to `args` for release builds.
    #[serde(default = "default_release_args")]
    pub release_args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            release_args: default_release_args(),
            env: HashMap::new(),
        }
    }
}

fn default_program() -> String {
    BUILD_PROGRAM.to_string()
}

fn default_args() -> Vec<String> {
    BUILD_ARGS.iter().map(|s| (*s).to_string()).collect()
}

fn default_release_args() -> Vec<String> {
    BUILD_RELEASE_ARGS.iter().map(|s| (*s).to_string()).collect()
}

/// Every artifact in the group is copied into every destination.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployGroup {
    pub artifacts: Vec<String>,
    pub destinations: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub server: RoleConfig,
    pub client: RoleConfig,
}

/// Launch settings for one engine role.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    /// Engine project directory, passed as `--path <project>`.
    pub project: PathBuf,
    /// Extra engine arguments placed before `--path`.
    #[serde(default)]
    pub args: Vec<String>,
}
