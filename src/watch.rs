//! Watch mode: live-reload tokens and source change detection.

use async_trait::async_trait;
use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::Result;

/// Issues the token a rendered HTML page uses to subscribe to reloads.
#[async_trait]
pub trait ReloadNotifier: Send + Sync {
    async fn register(&self, path: &Path) -> Result<String>;
}

/// Hands out one stable token per source path.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: Mutex<HashMap<PathBuf, String>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_for(&self, path: &Path) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReloadNotifier for TokenRegistry {
    async fn register(&self, path: &Path) -> Result<String> {
        let mut tokens = self
            .tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let token = tokens
            .entry(path.to_path_buf())
            .or_insert_with(|| Uuid::new_v4().simple().to_string())
            .clone();
        Ok(token)
    }
}

/// Polls inputs and theme stylesheets for modifications.
pub struct SourceWatcher {
    _watcher: PollWatcher,
    events: mpsc::UnboundedReceiver<PathBuf>,
}

impl std::fmt::Debug for SourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWatcher").finish_non_exhaustive()
    }
}

impl SourceWatcher {
    pub fn new(paths: &[PathBuf], interval: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = PollWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| {
                let Ok(event) = result else {
                    return;
                };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                for path in event.paths {
                    trace!(path = %path.display(), "Change detected");
                    let _ = tx.send(path);
                }
            },
            NotifyConfig::default().with_poll_interval(interval),
        )?;

        for path in paths {
            let mode = if path.is_dir() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            watcher.watch(path, mode)?;
            debug!(path = %path.display(), "Watching");
        }

        Ok(Self {
            _watcher: watcher,
            events: rx,
        })
    }

    /// Waits for the next change and gathers everything that follows within
    /// `debounce`. Returns `None` once the watcher has stopped.
    pub async fn changed(&mut self, debounce: Duration) -> Option<Vec<PathBuf>> {
        let first = self.events.recv().await?;
        let mut changed = BTreeSet::from([first]);
        while let Ok(Some(path)) = tokio::time::timeout(debounce, self.events.recv()).await {
            changed.insert(path);
        }
        Some(changed.into_iter().collect())
    }
}
