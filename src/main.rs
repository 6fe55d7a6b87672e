use anyhow::Result;
use clap::Parser;

use scriptpro::cli::{Cli, Commands};
use scriptpro::{commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    logging::init()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Exec(args) => commands::exec::run(args),
        Commands::Call(args) => commands::call::run(args),
        Commands::List(args) => commands::list::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Config(args) => commands::config::run(args.command),
    }
}
