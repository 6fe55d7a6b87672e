/// `scriptpro serve` command implementation
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::cli::ServeArgs;
use crate::hot_reload::HotReloadManager;
use crate::http::ScriptServer;
use crate::merger::MergedConfig;

pub async fn run(args: ServeArgs) -> Result<()> {
    let merged = MergedConfig::load(&args.common)?.with_server_args(&args);
    let config = &merged.config;

    let bind: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;

    if let Some(path) = &merged.config_path {
        info!("Using config: {}", path.display());
    }

    let dispatcher = Arc::new(tokio::task::block_in_place(|| merged.dispatcher())?);
    info!(
        root = %dispatcher.scripts_root().display(),
        capabilities = dispatcher.registry().list().len(),
        convention = %dispatcher.convention(),
        "Scripts loaded"
    );

    let hot_reload = HotReloadManager::new(dispatcher.clone(), config.server.watch)?;

    ScriptServer::new(bind, dispatcher)
        .run(shutdown_signal())
        .await?;

    hot_reload.shutdown();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
