use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::ScriptProConfig;
use crate::xdg;

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "scriptpro.toml";

/// Discovers ScriptPro configuration by traversing up the directory tree
pub fn discover_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            return Ok(Some(config_path));
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    // Fallback to global config
    if let Some(global_config) = xdg::global_config_file() {
        if global_config.is_file() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Configuration as found on disk, before CLI/env overrides
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed file, if one was found
    pub config: Option<ScriptProConfig>,
    /// Absolute path of the file that was loaded
    pub path: Option<PathBuf>,
    /// Directory relative paths in the config resolve against
    pub base_dir: PathBuf,
    /// Process working directory
    pub working_dir: PathBuf,
}

/// Loads configuration with auto-discovery support
///
/// If `explicit_path` is provided, loads config from that path.
/// Otherwise, auto-discovers config by traversing up directory tree from cwd.
///
/// Without any config file the base directory is the working directory.
pub fn load_config_with_discovery(explicit_path: Option<&str>) -> Result<LoadedConfig> {
    let working_dir =
        std::env::current_dir().context("Failed to get current directory for config discovery")?;

    let path = match explicit_path {
        Some(explicit) => Some(working_dir.join(explicit)),
        None => discover_config(&working_dir)?,
    };

    let Some(path) = path else {
        tracing::debug!(operation = "config.discover", "no config file found, using defaults");
        return Ok(LoadedConfig {
            config: None,
            path: None,
            base_dir: working_dir.clone(),
            working_dir,
        });
    };

    let config = ScriptProConfig::from_file(&path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| working_dir.clone());

    tracing::debug!(operation = "config.discover", path = %path.display(), "loaded config file");

    Ok(LoadedConfig {
        config: Some(config),
        path: Some(path),
        base_dir,
        working_dir,
    })
}
