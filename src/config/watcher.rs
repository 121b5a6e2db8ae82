//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Re-load and validate the file whenever it changes on disk
//! - Drop reloads that parse to the configuration already delivered
//! - Feed accepted configurations into a running client

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::client::MultiClient;
use crate::config::loader::load_config;
use crate::config::schema::MultiClientConfig;
use crate::lifecycle::ShutdownSignal;

/// Watches one configuration file and yields each new valid version.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedReceiver<MultiClientConfig>,
    // Dropping the handle stops notifications.
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start watching `path`. `current` is the configuration already in use.
    pub fn start(path: &Path, current: MultiClientConfig) -> Result<Self, notify::Error> {
        let (tx, updates) = mpsc::unbounded_channel();
        let watched = path.to_path_buf();
        let mut last = current;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    if let Some(config) = reload(&watched, &last) {
                        last = config.clone();
                        let _ = tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(Self {
            path: path.to_path_buf(),
            updates,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next accepted configuration, or `None` once the watcher has stopped.
    pub async fn next(&mut self) -> Option<MultiClientConfig> {
        self.updates.recv().await
    }

    /// Apply every accepted configuration to `client` until shutdown.
    pub async fn drive(mut self, client: &MultiClient, mut shutdown: ShutdownSignal) {
        loop {
            tokio::select! {
                update = self.next() => match update {
                    Some(config) => match client.apply_config(&config) {
                        Ok(()) => tracing::info!(
                            addresses = config.addresses.len(),
                            "Configuration reloaded"
                        ),
                        Err(e) => tracing::error!(error = %e, "Reloaded configuration rejected by client"),
                    },
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!(path = %self.path.display(), "Config watcher stopped");
    }
}

/// Load `path`, returning the config only when it is valid and differs from `last`.
fn reload(path: &Path, last: &MultiClientConfig) -> Option<MultiClientConfig> {
    match load_config(path) {
        Ok(config) if config == *last => {
            tracing::debug!(path = %path.display(), "Config file touched without changes");
            None
        }
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config file change detected");
            Some(config)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}
