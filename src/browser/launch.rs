//! Environment-driven launch flags and executable discovery.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that points at a browser executable.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

const CONTAINER_MARKERS: &[&str] = &["/.dockerenv", "/run/.containerenv"];

/// Facts about the execution environment that influence launch flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchEnvironment {
    pub in_container: bool,
    pub in_ci: bool,
}

impl LaunchEnvironment {
    pub fn detect() -> Self {
        Self {
            in_container: detect_container(),
            in_ci: env::var("CI")
                .map(|value| !value.is_empty() && value != "false" && value != "0")
                .unwrap_or(false),
        }
    }

    /// Switches required for a stable launch in this environment.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.in_container {
            args.push("--no-sandbox".to_string());
        }
        if self.in_container || self.in_ci {
            args.push("--disable-features=VizDisplayCompositor".to_string());
        }
        args
    }
}

fn detect_container() -> bool {
    if env::var_os("container").is_some() {
        return true;
    }
    if CONTAINER_MARKERS.iter().any(|marker| Path::new(marker).exists()) {
        return true;
    }
    std::fs::read_to_string("/proc/1/cgroup")
        .map(|cgroup| cgroup.contains("docker") || cgroup.contains("kubepods"))
        .unwrap_or(false)
}

/// Resolves the browser executable.
///
/// Priority: explicit path > `CHROME_PATH` > platform install locations > `PATH`.
pub fn find_executable(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env::var_os(CHROME_PATH_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }

    if let Some(found) = platform_candidates()
        .into_iter()
        .find(|candidate| candidate.is_file())
    {
        return Some(found);
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        path_binary_names()
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

fn path_binary_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["chrome.exe", "msedge.exe"]
    } else {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
            "microsoft-edge",
        ]
    }
}

fn platform_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        let mut candidates = vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
            PathBuf::from("/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"),
        ];
        if let Some(home) = env::var_os("HOME") {
            candidates.push(
                PathBuf::from(home)
                    .join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            );
        }
        candidates
    } else if cfg!(windows) {
        ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|var| env::var_os(var))
            .flat_map(|base| {
                let base = PathBuf::from(base);
                [
                    base.join("Google\\Chrome\\Application\\chrome.exe"),
                    base.join("Microsoft\\Edge\\Application\\msedge.exe"),
                ]
            })
            .collect()
    } else {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_disables_sandbox_and_compositor() {
        let env = LaunchEnvironment {
            in_container: true,
            in_ci: false,
        };
        assert_eq!(
            env.launch_args(),
            vec![
                "--no-sandbox".to_string(),
                "--disable-features=VizDisplayCompositor".to_string()
            ]
        );
    }

    #[test]
    fn ci_only_disables_compositor() {
        let env = LaunchEnvironment {
            in_container: false,
            in_ci: true,
        };
        assert_eq!(
            env.launch_args(),
            vec!["--disable-features=VizDisplayCompositor".to_string()]
        );
    }

    #[test]
    fn plain_environment_has_no_extra_args() {
        assert!(LaunchEnvironment::default().launch_args().is_empty());
    }

    #[test]
    fn configured_executable_wins() {
        let path = Path::new("/opt/custom/chrome");
        assert_eq!(find_executable(Some(path)), Some(path.to_path_buf()));
    }
}
