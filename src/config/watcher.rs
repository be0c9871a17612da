//! Hot reload of the configuration file
//!
//! The parent directory is watched rather than the file itself so editors
//! that save by writing a temp file and renaming it are still seen. The
//! notify callback only pings a channel; loading happens in
//! [`ConfigWatcher::next_config`] on the caller's task.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Quiet period after the last change before the file is read
const SETTLE: Duration = Duration::from_millis(100);

pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
    changes: mpsc::UnboundedReceiver<()>,
}

impl ConfigWatcher {
    pub fn new(config_path: impl Into<PathBuf>) -> Result<Self> {
        let path = config_path.into();
        let file_name: OsString = path
            .file_name()
            .with_context(|| format!("Config path has no file name: {}", path.display()))?
            .to_os_string();

        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, changes) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event.paths.iter().any(|p| p.file_name() == Some(file_name.as_os_str()));
                if relevant {
                    debug!("Config file changed: {:?}", event.kind);
                    let _ = tx.send(());
                }
            },
            Err(e) => error!("Config watch error: {}", e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", dir.display()))?;

        info!("Watching {} for changes", path.display());

        Ok(Self {
            _watcher: watcher,
            path,
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next valid config
    ///
    /// Bursts of change events collapse into one reload. An edit that fails
    /// to parse or validate is logged and skipped. Returns None once the
    /// watcher stops.
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        loop {
            self.changes.recv().await?;

            // Let the writer finish, folding any further events into this reload
            loop {
                tokio::time::sleep(SETTLE).await;
                let mut more = false;
                while self.changes.try_recv().is_ok() {
                    more = true;
                }
                if !more {
                    break;
                }
            }

            let Some(path) = self.path.to_str() else {
                warn!("Config path is not valid UTF-8: {}", self.path.display());
                continue;
            };

            match AppConfig::load(path).await {
                Ok(config) => {
                    info!("Configuration reloaded");
                    return Some(config);
                },
                Err(e) => warn!("Ignoring config edit (keeping previous settings): {:#}", e),
            }
        }
    }
}
