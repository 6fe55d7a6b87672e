//! XDG Base Directory support for ScriptPro
//!
//! Only the configuration directory is used:
//! `$XDG_CONFIG_HOME/scriptpro/` (default: `~/.config/scriptpro/`).

use std::path::PathBuf;

/// Get the ScriptPro configuration directory
///
/// Respects XDG_CONFIG_HOME. Returns `None` when neither it nor a home
/// directory is available.
pub fn config_dir() -> Option<PathBuf> {
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg_config) if !xdg_config.is_empty() => Some(PathBuf::from(xdg_config).join("scriptpro")),
        _ => dirs::home_dir().map(|home| home.join(".config").join("scriptpro")),
    }
}

/// Path of the global configuration file
pub fn global_config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
