/// `scriptpro list` command implementation
use anyhow::Result;

use crate::api::types::ServiceInfo;
use crate::cli::ListArgs;
use crate::cli_utils::scriptpro_prefix;
use crate::merger::MergedConfig;

pub fn run(args: ListArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?;
    let dispatcher = merged.dispatcher()?;

    let services: Vec<ServiceInfo> = dispatcher
        .registry()
        .list()
        .iter()
        .map(|capability| ServiceInfo::from(capability.as_ref()))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&services)?);
        return Ok(());
    }

    eprintln!(
        "{} Scripts from {}",
        scriptpro_prefix(),
        dispatcher.scripts_root().display()
    );

    let width = services
        .iter()
        .map(|s| s.identifier.len())
        .max()
        .unwrap_or(0);

    for service in &services {
        let params: Vec<&str> = service.fields.keys().map(String::as_str).collect();
        println!(
            "{:width$}  {}  [{}]",
            service.identifier,
            service.name,
            params.join(", "),
            width = width
        );
        if !service.description.is_empty() {
            println!("{:width$}  {}", "", service.description, width = width);
        }
    }

    Ok(())
}
