use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use url::Url;

use super::driver::FailureListener;

/// Records `file:` resources a page failed to load.
///
/// Attached to a single page before navigation and inspected once the page
/// work is done. It never changes control flow.
#[derive(Debug, Clone, Default)]
pub struct LocalFileAccessGuard {
    blocked: Arc<Mutex<BTreeSet<String>>>,
}

impl LocalFileAccessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&self, url: &str) {
        let Ok(parsed) = Url::parse(url) else {
            return;
        };
        if parsed.scheme() == "file" {
            self.blocked
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(parsed.to_string());
        }
    }

    /// A listener suitable for [`super::PageHandle::on_request_failed`].
    pub fn listener(&self) -> FailureListener {
        let guard = self.clone();
        Arc::new(move |url: &str| guard.record_failure(url))
    }

    /// Blocked URLs in sorted order.
    pub fn blocked(&self) -> Vec<String> {
        self.blocked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

/// Warning shown when local resources were blocked, or `None` if there were none.
pub fn blocked_files_warning(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some(
            "Detected an attempt to access a local file, which was blocked for security reasons. \
             Host the asset online instead, or pass --allow-local-files if you understand the risk."
                .to_string(),
        ),
        n => Some(format!(
            "Detected attempts to access {n} local files, which were blocked for security reasons. \
             Host the assets online instead, or pass --allow-local-files if you understand the risk."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_only_file_scheme() {
        let guard = LocalFileAccessGuard::new();
        guard.record_failure("file:///home/me/deck/image.png");
        guard.record_failure("https://example.com/logo.png");
        guard.record_failure("data:image/png;base64,AAAA");
        assert_eq!(guard.blocked(), vec!["file:///home/me/deck/image.png"]);
    }

    #[test]
    fn ignores_unparseable_urls() {
        let guard = LocalFileAccessGuard::new();
        guard.record_failure("not a url");
        guard.record_failure("");
        assert!(guard.blocked().is_empty());
    }

    #[test]
    fn listener_feeds_shared_set_and_dedupes() {
        let guard = LocalFileAccessGuard::new();
        let listener = guard.listener();
        listener("file:///tmp/a.png");
        listener("file:///tmp/a.png");
        listener("file:///tmp/b.png");
        assert_eq!(guard.blocked().len(), 2);
    }

    #[test]
    fn warning_wording_depends_on_count() {
        assert!(blocked_files_warning(0).is_none());
        let single = blocked_files_warning(1).unwrap();
        assert!(single.contains("a local file"));
        let plural = blocked_files_warning(3).unwrap();
        assert!(plural.contains("3 local files"));
        assert!(plural.contains("--allow-local-files"));
    }
}
