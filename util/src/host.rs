//! Host platform (linux for example) utility functions

use std::{env, path::PathBuf};

/// Environment variable pointing at the root of the rotator software directory.
pub const SW_ROOT_ENV_VAR: &str = "ROTATOR_SW_ROOT";

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the software root directory from the `ROTATOR_SW_ROOT` environment variable.
///
/// Parameter files and session directories are resolved relative to this root.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
