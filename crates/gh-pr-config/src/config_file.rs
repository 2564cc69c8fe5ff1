//! Locating the config file

use std::env;
use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = ".gh-repo-steward.toml";

/// Explicit config path, checked before the usual locations
pub const CONFIG_PATH_ENV: &str = "GH_REPO_STEWARD_CONFIG";

/// Places searched for the config file, in order: `$GH_REPO_STEWARD_CONFIG`,
/// the working directory, the home directory
pub fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV) {
        candidates.push(PathBuf::from(explicit));
    }
    candidates.push(PathBuf::from(CONFIG_FILE_NAME));
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_FILE_NAME));
    }
    candidates
}

/// The first readable config file and its content
pub fn load_config_file() -> Option<(PathBuf, String)> {
    config_candidates().into_iter().find_map(|path| {
        let content = std::fs::read_to_string(&path).ok()?;
        log::debug!("Read config file {}", path.display());
        Some((path, content))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_directory_precedes_home() {
        let candidates = config_candidates();
        let local = candidates
            .iter()
            .position(|p| p == &PathBuf::from(CONFIG_FILE_NAME))
            .unwrap();
        assert!(candidates[local + 1..]
            .iter()
            .all(|p| p.ends_with(CONFIG_FILE_NAME) && p.is_absolute()));
    }
}
