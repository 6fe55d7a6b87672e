/// `scriptpro check` command implementation
///
/// Parses a script and prints the metadata discovery would attach to it.
/// The script is never executed.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::CheckArgs;
use crate::cli_utils::scriptpro_prefix;
use crate::merger::MergedConfig;
use crate::script::cache_key::normalize_path;
use crate::script::{capability_id, Dispatcher, MetadataExtractor};

pub fn run(args: CheckArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;
    let dispatcher = Dispatcher::new(&merged.config, &merged.base_dir)?;

    let path = normalize_path(&std::env::current_dir()?.join(&args.file));
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;

    let identifier = capability_id(dispatcher.scripts_root(), &path, dispatcher.extension());
    let default_name = identifier.clone().unwrap_or_else(|| file_stem(&path));

    dispatcher.engine().compile(&contents, &args.file)?;
    let metadata = MetadataExtractor::new().extract(&contents, &args.file, &default_name)?;

    eprintln!("{} ✓ {} is valid", scriptpro_prefix(), args.file);
    match identifier {
        Some(id) => println!("Capability:  {}", id),
        None => println!("Capability:  (outside {})", dispatcher.scripts_root().display()),
    }
    println!("Name:        {}", metadata.name);
    println!("Description: {}", metadata.description);
    println!("Parameters:");
    for (name, spec) in &metadata.parameters {
        let kind = spec.kind.as_deref().unwrap_or("any");
        let required = if spec.required { ", required" } else { "" };
        match &spec.default {
            Some(default) => println!("  - {} ({}{}, default {})", name, kind, required, default),
            None => println!("  - {} ({}{})", name, kind, required),
        }
    }

    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
