//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the simulator's root directory.
pub const SIM_ROOT_VAR: &str = "DRIVE_SIM_ROOT";

/// Get the root directory of the simulator, which contains the `params` and `sessions`
/// directories.
pub fn get_sim_root() -> Result<PathBuf, env::VarError> {
    env::var(SIM_ROOT_VAR).map(PathBuf::from)
}
