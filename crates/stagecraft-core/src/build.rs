use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info, instrument};

use crate::config::BuildConfig;
use crate::constants::{PROFILE_DIR_DEBUG, PROFILE_DIR_RELEASE};
use crate::deploy::BuildArtifact;
use crate::error::{BuildError, Error, Result};
use crate::platform::PlatformProfile;

/// Runs the external toolchain that produces the shared libraries.
#[derive(Debug)]
pub struct Builder<'a> {
    profile: &'a PlatformProfile,
    toolchain: &'a BuildConfig,
    crate_root: PathBuf,
    target_dir: PathBuf,
}

impl<'a> Builder<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        toolchain: &'a BuildConfig,
        crate_root: impl Into<PathBuf>,
        target_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profile,
            toolchain,
            crate_root: crate_root.into(),
            target_dir: target_dir.into(),
        }
    }

    /// Runs the toolchain to completion.
    ///
    /// Stdout is discarded and stderr is buffered in full, so nothing is
    /// shown while the build runs.
    ///
    /// # Errors
    /// [`Error::ProcessSpawn`] if the toolchain cannot be started and
    /// [`Error::Build`] if it exits unsuccessfully.
    #[instrument(skip(self), fields(program = %self.toolchain.program))]
    pub fn build(&self, release: bool) -> Result<()> {
        let argv = self.argv(release);
        info!(target: "stagecraft", "build {} on {}", argv.join(" "), self.profile.family());

        let output = Command::new(&self.toolchain.program)
            .args(&argv)
            .envs(&self.toolchain.env)
            .current_dir(&self.crate_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| Error::ProcessSpawn {
                program: self.toolchain.program.clone(),
                source,
            })?;

        if !output.status.success() {
            debug!("toolchain exited with {}", output.status);
            return Err(BuildError {
                status: output.status,
                stderr_text: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }

        Ok(())
    }

    /// Arguments passed to the toolchain program.
    pub fn argv(&self, release: bool) -> Vec<String> {
        let mut argv = self.toolchain.args.clone();
        if release {
            argv.extend(self.toolchain.release_args.iter().cloned());
        }
        argv
    }

    /// Directory holding the libraries of the selected profile.
    pub fn output_dir(&self, release: bool) -> PathBuf {
        let profile_dir = if release {
            PROFILE_DIR_RELEASE
        } else {
            PROFILE_DIR_DEBUG
        };
        self.target_dir.join(profile_dir)
    }

    /// Describes where the toolchain leaves each named library.
    pub fn artifacts<S: AsRef<str>>(&self, names: &[S], release: bool) -> Vec<BuildArtifact> {
        let source_directory = self.output_dir(release);
        names
            .iter()
            .map(|name| BuildArtifact::new(name.as_ref(), source_directory.clone()))
            .collect()
    }
}
