//! Host platform detection and shared-library naming.

use std::fmt::{Display, Formatter};

use tracing::debug;

use crate::error::{Error, Result};

/// The operating system family of the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Linux,
    Unsupported(String),
}

impl OsFamily {
    /// Classifies an OS identifier as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Self {
        match os.to_ascii_lowercase().as_str() {
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Unsupported(os) => os,
        }
    }
}

impl Display for OsFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Naming conventions for the host, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    family: OsFamily,
    library_prefix: &'static str,
    library_suffix: &'static str,
}

impl PlatformProfile {
    /// Resolves the profile of the running host.
    pub fn resolve() -> Result<Self> {
        Self::resolve_for(std::env::consts::OS)
    }

    /// Resolves the profile for an explicit OS identifier.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedPlatform`] for anything but windows and linux.
    pub fn resolve_for(os: &str) -> Result<Self> {
        let family = OsFamily::from_os(os);
        let (library_prefix, library_suffix) = match family {
            OsFamily::Linux => ("lib", ".so"),
            OsFamily::Windows => ("", ".dll"),
            OsFamily::Unsupported(os) => return Err(Error::UnsupportedPlatform { os }),
        };
        debug!("resolved platform profile for {}", family);
        Ok(Self {
            family,
            library_prefix,
            library_suffix,
        })
    }

    pub fn family(&self) -> &OsFamily {
        &self.family
    }

    pub fn library_prefix(&self) -> &str {
        self.library_prefix
    }

    pub fn library_suffix(&self) -> &str {
        self.library_suffix
    }

    /// File name the toolchain gives the shared library `name` on this platform.
    pub fn library_filename(&self, name: &str) -> String {
        format!("{}{}{}", self.library_prefix, name, self.library_suffix)
    }
}
