//! Shared browser session.
//!
//! One session owns at most one browser process. The process is launched on
//! first use, reused for every later page, and dropped from the cache when
//! the connection goes away so the next caller relaunches it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::driver::{BrowserDriver, BrowserHandle, LaunchOptions, PageTask};
use super::guard::{blocked_files_warning, LocalFileAccessGuard};
use crate::file::{SourceFile, TmpFile};
use crate::Result;

/// How rendered HTML reaches the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalFileStrategy {
    /// Self-contained `data:` URI; local files cannot be resolved.
    #[default]
    Embedded,
    /// A temporary file navigated through `file://`, so relative local
    /// resources resolve.
    TempFile,
}

impl LocalFileStrategy {
    pub fn for_policy(allow_local_files: bool) -> Self {
        if allow_local_files {
            LocalFileStrategy::TempFile
        } else {
            LocalFileStrategy::Embedded
        }
    }
}

enum SessionState {
    Idle,
    Launched {
        browser: Arc<dyn BrowserHandle>,
        generation: u64,
    },
}

pub struct BrowserSession {
    driver: Arc<dyn BrowserDriver>,
    options: LaunchOptions,
    state: Arc<Mutex<SessionState>>,
    generation: AtomicU64,
    launches: AtomicUsize,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("options", &self.options)
            .field("launches", &self.launch_count())
            .finish()
    }
}

impl BrowserSession {
    pub fn new(driver: Arc<dyn BrowserDriver>, options: LaunchOptions) -> Self {
        Self {
            driver,
            options,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            generation: AtomicU64::new(0),
            launches: AtomicUsize::new(0),
        }
    }

    /// Number of browser processes this session has launched so far.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub async fn is_running(&self) -> bool {
        matches!(&*self.state.lock().await, SessionState::Launched { .. })
    }

    /// Returns the cached browser, launching it first if needed.
    pub async fn run_browser(&self) -> Result<Arc<dyn BrowserHandle>> {
        let mut state = self.state.lock().await;
        if let SessionState::Launched { browser, .. } = &*state {
            return Ok(Arc::clone(browser));
        }

        debug!(args = ?self.options.args, "Launching headless browser");
        let launched = self.driver.launch(&self.options).await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.launches.fetch_add(1, Ordering::SeqCst);

        let watched = Arc::clone(&self.state);
        let disconnected = launched.disconnected;
        tokio::spawn(async move {
            if disconnected.await.is_err() {
                return;
            }
            let mut state = watched.lock().await;
            let current = matches!(
                &*state,
                SessionState::Launched { generation: g, .. } if *g == generation
            );
            if current {
                warn!("Browser disconnected unexpectedly; it will be relaunched on next use");
                *state = SessionState::Idle;
            }
        });

        *state = SessionState::Launched {
            browser: Arc::clone(&launched.handle),
            generation,
        };
        Ok(launched.handle)
    }

    /// Shuts the browser down. No-op when nothing was launched.
    pub async fn close_browser(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, SessionState::Idle)
        };
        if let SessionState::Launched { browser, .. } = previous {
            debug!("Closing headless browser");
            browser.close().await?;
        }
        Ok(())
    }

    /// Runs `task` against a fresh page showing the HTML held by `file`.
    ///
    /// The page is closed and any temporary file removed on every path.
    pub async fn use_page<T: PageTask>(
        &self,
        file: &SourceFile,
        strategy: LocalFileStrategy,
        task: &T,
    ) -> Result<T::Output> {
        let (uri, tmp) = match strategy {
            LocalFileStrategy::TempFile => {
                warn!(
                    file = %file.relative_path().display(),
                    "Insecure local file access is enabled for this conversion"
                );
                let tmp = file.save_tmp_file("html").await?;
                (tmp.file_uri(), Some(tmp))
            }
            LocalFileStrategy::Embedded => {
                let html = file.buffer.as_deref().unwrap_or_default();
                (format!("data:text/html;base64,{}", STANDARD.encode(html)), None)
            }
        };

        let guard = LocalFileAccessGuard::new();
        let outcome = self.run_on_page(&uri, &guard, task).await;
        remove_tmp(tmp);

        if let Some(message) = blocked_files_warning(guard.blocked().len()) {
            warn!(blocked = ?guard.blocked(), "{}", message);
        }
        outcome
    }

    async fn run_on_page<T: PageTask>(
        &self,
        uri: &str,
        guard: &LocalFileAccessGuard,
        task: &T,
    ) -> Result<T::Output> {
        let browser = self.run_browser().await?;
        let mut page = browser.new_page().await?;

        let outcome = match page.on_request_failed(guard.listener()).await {
            Ok(()) => task.run(page.as_mut(), uri).await,
            Err(err) => Err(err),
        };
        let closed = page.close().await;

        let output = outcome?;
        closed?;
        Ok(output)
    }
}

fn remove_tmp(tmp: Option<TmpFile>) {
    if let Some(tmp) = tmp {
        let path = tmp.path().to_path_buf();
        if let Err(err) = tmp.cleanup() {
            warn!(path = %path.display(), error = %err, "Failed to remove temporary file");
        }
    }
}
