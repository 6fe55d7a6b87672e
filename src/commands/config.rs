use anyhow::Result;
use tracing::info;

use crate::cli::{CommonConfigArgs, ConfigCommands};
use crate::config::ScriptProConfig;
use crate::merger::MergedConfig;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { path } => validate(&path),
        ConfigCommands::Generate => generate(),
        ConfigCommands::Show { common } => show(&common),
    }
}

fn validate(path: &str) -> Result<()> {
    info!("Validating config file: {}", path);

    let config = ScriptProConfig::from_file(path)?;
    config.validate()?;

    println!("✓ Configuration file is valid: {}", path);
    println!("\nSummary:");
    println!("  - Script directory: {}", config.scripts.dir.display());
    println!("  - Script extension: {}", config.scripts.extension);
    println!("  - Excluded patterns: {}", config.scripts.exclude.len());
    println!("  - Cache enabled: {}", config.cache.enabled);
    println!("  - Response convention: {}", config.response.convention);
    println!("  - Server bind: {}", config.server.bind);

    Ok(())
}

fn generate() -> Result<()> {
    println!("{}", ScriptProConfig::example()?);
    Ok(())
}

fn show(common: &CommonConfigArgs) -> Result<()> {
    info!("Showing effective configuration");

    let merged = MergedConfig::load(common)?;

    match &merged.config_path {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found, using defaults"),
    }
    println!("# Base directory: {}\n", merged.base_dir.display());
    println!("{}", toml::to_string_pretty(&merged.config)?);

    Ok(())
}
