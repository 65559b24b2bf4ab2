//! Constants used across the stagecraft workspace.

/// The filename for stagecraft's project configuration.
pub const CONFIG_FILE: &str = "stagecraft.toml";

/// Toolchain invoked when the config does not name one.
pub const BUILD_PROGRAM: &str = "cargo";

/// Color is forced on because stderr is captured and replayed later.
pub const BUILD_ARGS: &[&str] = &["build", "--color", "always"];
pub const BUILD_RELEASE_ARGS: &[&str] = &["--release"];

/// Output directories the toolchain uses for each profile.
pub const PROFILE_DIR_RELEASE: &str = "release";
pub const PROFILE_DIR_DEBUG: &str = "debug";

/// Engine flag that points it at a project directory.
pub const ENGINE_PATH_FLAG: &str = "--path";
