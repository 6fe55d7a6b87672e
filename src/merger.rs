/// Configuration merger: CLI args > Env vars > Config file > Defaults
///
/// Environment variables are read by clap into the same argument fields as
/// the flags, so merging only has to layer the arguments over the file.
use anyhow::Result;
use std::path::PathBuf;

use crate::cli::{CommonConfigArgs, ServeArgs};
use crate::config::ScriptProConfig;
use crate::config_discovery::{load_config_with_discovery, LoadedConfig};
use crate::script::Dispatcher;

/// Effective configuration for one command
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub config: ScriptProConfig,
    /// File the configuration was read from, if any
    pub config_path: Option<PathBuf>,
    /// Directory relative script paths resolve against
    pub base_dir: PathBuf,
}

impl MergedConfig {
    /// Discover the config file and apply CLI/env overrides
    pub fn load(args: &CommonConfigArgs) -> Result<Self> {
        let loaded = load_config_with_discovery(args.config.as_deref())?;
        let merged = Self::merge(args, loaded);
        merged.config.validate()?;
        Ok(merged)
    }

    /// Merge configuration from CLI args and the loaded file
    /// Precedence: CLI > env (already handled by clap) > config file > defaults
    pub fn merge(args: &CommonConfigArgs, loaded: LoadedConfig) -> Self {
        let mut config = loaded.config.unwrap_or_default();

        // Paths given on the command line are relative to where it was typed
        if let Some(dir) = &args.config_scripts_dir {
            config.scripts.dir = loaded.working_dir.join(dir);
        }

        if let Some(convention) = args.config_response_convention {
            config.response.convention = convention;
        }

        Self {
            config,
            config_path: loaded.path,
            base_dir: loaded.base_dir,
        }
    }

    /// Apply `serve`-only overrides
    pub fn with_server_args(mut self, args: &ServeArgs) -> Self {
        if let Some(bind) = &args.config_bind {
            self.config.server.bind = bind.clone();
        }
        if args.config_watch {
            self.config.server.watch = true;
        }
        self
    }

    /// Build a dispatcher for this configuration and run the first discovery pass
    pub fn dispatcher(&self) -> Result<Dispatcher> {
        let dispatcher = Dispatcher::new(&self.config, &self.base_dir)?;
        dispatcher.reload()?;
        Ok(dispatcher)
    }
}
