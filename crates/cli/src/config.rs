//! CLI configuration utilities

use anyhow::{Context, Result};
use haven_core::HavenConfig;
use haven_core::config::default_state_dir;
use std::path::{Path, PathBuf};

/// Configuration file picked up from the state directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    default_state_dir().join(DEFAULT_CONFIG_FILE)
}

/// Load configuration for this invocation
///
/// An explicit `path` must exist. Without one, `config.json` in the state
/// directory is used when present: `state_dir` when given, the default state
/// directory otherwise. `state_dir` also overrides the configured state
/// directory.
pub fn load(path: Option<&Path>, state_dir: Option<PathBuf>) -> Result<HavenConfig> {
    let fallback = state_dir
        .as_ref()
        .map_or_else(default_config_path, |dir| dir.join(DEFAULT_CONFIG_FILE));
    let path = path.or_else(|| fallback.is_file().then_some(fallback.as_path()));

    let mut config = HavenConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    if let Some(state_dir) = state_dir {
        config.session.state_dir = state_dir;
    }
    Ok(config)
}

/// Write the effective configuration to `path`
pub fn write_config(config: &HavenConfig, path: &Path) -> Result<()> {
    config
        .save(path)
        .with_context(|| format!("Failed to write configuration to {}", path.display()))
}
