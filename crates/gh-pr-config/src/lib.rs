//! Configuration and persisted settings for gh-repo-steward
//!
//! This crate provides:
//! - Directory paths for config and cache files
//! - Configuration file loading (TOML)
//! - Application configuration (AppConfig)
//! - User settings kept next to the API cache (SettingsStore)

pub mod app_config;
pub mod config_file;
pub mod paths;
pub mod settings;

pub use app_config::AppConfig;
pub use config_file::load_config_file;
pub use settings::{RecentRepository, SettingsStore};

/// Name used for config files and directories
pub const APP_NAME: &str = "gh-repo-steward";
