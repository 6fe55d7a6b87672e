//! Hot-reload support for the script directory
//!
//! This module provides:
//! - File watching on the script root, triggering a debounced discovery pass
//! - SIGHUP signal handling for manual reload (Unix only)
//! - A broadcast channel announcing each reload outcome
//!
//! A reload rebuilds the capability set and drops every cached compiled unit.
//! Server settings (bind address, response convention) are not reloaded.

use crate::script::Dispatcher;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};

/// Quiet period after a file event before reloading
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Script reload event
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadEvent {
    /// Discovery succeeded with this many capabilities
    Reloaded(usize),
    /// Discovery failed (includes error message)
    Failed(String),
}

/// Hot-reload manager that coordinates file watching and signal handling
pub struct HotReloadManager {
    dispatcher: Arc<Dispatcher>,
    // Held to keep the watcher alive
    _watcher: Option<RecommendedWatcher>,
    reload_tx: broadcast::Sender<ReloadEvent>,
    shutdown_tx: watch::Sender<bool>,
}

impl HotReloadManager {
    /// Create a new hot-reload manager. Must be called inside a tokio runtime.
    ///
    /// With `watch_files`, changes to scripts under the dispatcher's script
    /// root trigger a reload. SIGHUP is handled on Unix either way.
    pub fn new(dispatcher: Arc<Dispatcher>, watch_files: bool) -> Result<Self> {
        let (reload_tx, _) = broadcast::channel(16);
        let (shutdown_tx, _) = watch::channel(false);

        let watcher = if watch_files {
            Self::setup_file_watcher(dispatcher.clone(), reload_tx.clone())?
        } else {
            None
        };

        #[cfg(unix)]
        Self::setup_sighup_handler(
            dispatcher.clone(),
            reload_tx.clone(),
            shutdown_tx.subscribe(),
        );

        Ok(Self {
            dispatcher,
            _watcher: watcher,
            reload_tx,
            shutdown_tx,
        })
    }

    /// Subscribe to reload events
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.reload_tx.subscribe()
    }

    /// Trigger a reload now
    pub async fn reload(&self) -> Result<usize> {
        reload(self.dispatcher.clone(), &self.reload_tx).await
    }

    /// Stop the signal handler
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn setup_file_watcher(
        dispatcher: Arc<Dispatcher>,
        reload_tx: broadcast::Sender<ReloadEvent>,
    ) -> Result<Option<RecommendedWatcher>> {
        let root = dispatcher.scripts_root().to_path_buf();
        if !root.is_dir() {
            warn!(
                root = %root.display(),
                "Script directory does not exist, not watching for changes"
            );
            return Ok(None);
        }

        let (tx, mut rx) = mpsc::channel(64);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch script directory: {}", root.display()))?;

        info!(root = %root.display(), "Watching scripts for changes");

        let extension = dispatcher.extension().to_string();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !is_script_event(&event, &extension) {
                    continue;
                }

                // Let a burst of saves settle, then reload once
                tokio::time::sleep(DEBOUNCE).await;
                while rx.try_recv().is_ok() {}

                info!("Scripts changed, reloading...");
                if let Err(e) = reload(dispatcher.clone(), &reload_tx).await {
                    error!("Failed to reload scripts: {:#}", e);
                }
            }
        });

        Ok(Some(watcher))
    }

    #[cfg(unix)]
    fn setup_sighup_handler(
        dispatcher: Arc<Dispatcher>,
        reload_tx: broadcast::Sender<ReloadEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        use tokio::signal::unix::{signal, SignalKind};

        // Installed before returning: the default SIGHUP action kills the process
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to set up SIGHUP handler: {}", e);
                return;
            }
        };

        info!("SIGHUP handler ready (send SIGHUP to reload scripts)");

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sighup.recv() => {
                        info!("Received SIGHUP, reloading scripts...");
                        if let Err(e) = reload(dispatcher.clone(), &reload_tx).await {
                            error!("Failed to reload scripts on SIGHUP: {:#}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }
}

/// Run a discovery pass off the async workers and announce the outcome
async fn reload(
    dispatcher: Arc<Dispatcher>,
    reload_tx: &broadcast::Sender<ReloadEvent>,
) -> Result<usize> {
    let outcome = tokio::task::spawn_blocking(move || dispatcher.reload())
        .await
        .context("Reload task panicked")
        .and_then(|result| result);

    match outcome {
        Ok(count) => {
            let _ = reload_tx.send(ReloadEvent::Reloaded(count));
            Ok(count)
        }
        Err(e) => {
            let _ = reload_tx.send(ReloadEvent::Failed(format!("{:#}", e)));
            Err(e)
        }
    }
}

/// Whether a filesystem event touches a script file
fn is_script_event(event: &Event, extension: &str) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.extension().and_then(|e| e.to_str()) == Some(extension) || is_dir_event(p))
}

// Removing or renaming a directory reports the directory, not its scripts
fn is_dir_event(path: &Path) -> bool {
    path.extension().is_none()
}
