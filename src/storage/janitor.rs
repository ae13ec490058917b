//! Periodic reaping of expired scratch files

use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use super::TempStore;
use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct Janitor {
    store: TempStore,
    retention: Duration,
    interval: Duration,
    enabled: bool,
}

impl Janitor {
    pub fn new(store: TempStore, retention: Duration, interval: Duration, enabled: bool) -> Self {
        Self {
            store,
            retention,
            interval,
            enabled,
        }
    }

    pub fn from_settings(store: TempStore, settings: &Settings) -> Self {
        Self::new(
            store,
            settings.retention(),
            settings.cleanup_interval(),
            settings.auto_cleanup,
        )
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(SystemTime::now())
    }

    /// Deletes every regular, non-hidden file whose age at `now` exceeds the retention window.
    /// Returns the number of files deleted; failures are logged and skipped.
    pub fn sweep_at(&self, now: SystemTime) -> usize {
        if !self.enabled {
            return 0;
        }

        let mut deleted = 0;
        let entries = WalkDir::new(self.store.dir())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping unreadable scratch entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| !is_hidden(entry.path()));

        for entry in entries {
            let path = entry.path();
            let modified = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(modified)) => modified,
                Ok(Err(e)) => {
                    log::warn!("No modification time for {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    log::warn!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };

            // mtime in the future means age zero
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.retention {
                continue;
            }

            match std::fs::remove_file(path) {
                Ok(()) => {
                    log::debug!("Reaped {} (age {}s)", path.display(), age.as_secs());
                    deleted += 1;
                }
                Err(e) => log::warn!("Failed to delete expired file {}: {}", path.display(), e),
            }
        }

        deleted
    }

    /// Runs a sweep every interval until `shutdown` flips to true or its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            log::info!(
                "Janitor started: every {}s, retention {}s, enabled={}",
                self.interval.as_secs(),
                self.retention.as_secs(),
                self.enabled
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let janitor = self.clone();
                        match tokio::task::spawn_blocking(move || janitor.sweep()).await {
                            Ok(0) => {}
                            Ok(count) => log::info!("Cleaned up {} old files", count),
                            Err(e) => log::error!("Cleanup sweep failed: {}", e),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            log::info!("Janitor stopped");
        })
    }
}

/// Handle that owns the janitor task and its shutdown signal.
pub struct JanitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    pub fn start(janitor: Janitor) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let task = janitor.spawn(rx);
        Self { shutdown, task }
    }

    /// Signals the loop to stop and waits for it. Stopping is not an error.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                log::error!("Janitor task ended abnormally: {}", e);
            }
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
