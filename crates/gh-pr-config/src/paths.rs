//! Data directory paths
//!
//! Uses XDG directories via `dirs` crate.
//!
//! Platform-specific locations:
//! - Linux: `~/.cache/gh-repo-steward/`
//! - macOS: `~/Library/Caches/gh-repo-steward/`
//! - Windows: `%LOCALAPPDATA%\gh-repo-steward\`

use crate::APP_NAME;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the application cache directory
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;
    Ok(dir)
}

/// Get path to the key/value document holding cache entries and settings
pub fn storage_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join("storage.json"))
}
