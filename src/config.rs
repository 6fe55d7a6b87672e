use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::script::ResponseConvention;

/// Complete ScriptPro configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScriptProConfig {
    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub response: ResponseConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Script directory configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptsConfig {
    /// Discovery root, relative to the directory holding the config file
    #[serde(default = "default_scripts_dir")]
    pub dir: PathBuf,

    /// Extension (without dot) of discoverable scripts
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Glob patterns, matched against paths relative to `dir`, skipped by discovery
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: default_scripts_dir(),
            extension: default_extension(),
            exclude: Vec::new(),
        }
    }
}

/// Compiled-unit cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Default for requests that don't pass `cache`
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResponseConfig {
    #[serde(default)]
    pub convention: ResponseConvention,
}

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Re-run discovery when scripts change on disk
    #[serde(default)]
    pub watch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            watch: false,
        }
    }
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_extension() -> String {
    "rhai".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:8130".to_string()
}

fn default_true() -> bool {
    true
}

impl ScriptProConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: ScriptProConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Generate example configuration as TOML string
    pub fn example() -> Result<String> {
        let config = ScriptProConfig {
            scripts: ScriptsConfig {
                exclude: vec!["lib/**".to_string()],
                ..Default::default()
            },
            server: ServerConfig {
                watch: true,
                ..Default::default()
            },
            ..Default::default()
        };

        toml::to_string_pretty(&config).context("Failed to serialize example config")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.scripts.dir.as_os_str().is_empty() {
            anyhow::bail!("scripts.dir must be set");
        }

        if self.scripts.extension.is_empty() {
            anyhow::bail!("scripts.extension must be set");
        }

        if self.scripts.extension.starts_with('.') {
            anyhow::bail!(
                "scripts.extension must not start with a dot: {}",
                self.scripts.extension
            );
        }

        for pattern in &self.scripts.exclude {
            glob::Pattern::new(pattern)
                .with_context(|| format!("scripts.exclude has an invalid glob: {}", pattern))?;
        }

        self.server
            .bind
            .parse::<SocketAddr>()
            .with_context(|| format!("server.bind must be host:port: {}", self.server.bind))?;

        Ok(())
    }
}
