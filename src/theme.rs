//! Theme stylesheets and the registry that installs them into engines.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::engine::Engine;
use crate::{Result, Viewport};

pub const DEFAULT_THEME: &str = "default";

const DEFAULT_CSS: &str = r#"/* @theme default */
section {
  box-sizing: border-box;
  padding: 64px 72px;
  font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
  font-size: 30px;
  line-height: 1.4;
  color: #24292f;
  background: #ffffff;
}
section h1 { font-size: 1.8em; color: #1f4e8c; }
section h2 { font-size: 1.4em; color: #1f4e8c; }
section code { background: #f1f3f5; padding: 0 .2em; border-radius: 4px; }
section[data-paginate]::after {
  content: attr(data-page);
  position: absolute;
  right: 32px;
  bottom: 24px;
  font-size: 20px;
  color: #777;
}
"#;

const GAIA_CSS: &str = r#"/* @theme gaia */
section {
  box-sizing: border-box;
  padding: 70px;
  font-family: "Lato", "Avenir Next", Avenir, sans-serif;
  font-size: 35px;
  color: #455a64;
  background: #fff8e1;
}
section h1, section h2 { color: #0288d1; }
section.lead { display: flex; flex-direction: column; justify-content: center; text-align: center; }
"#;

/// A named stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub css: String,
    /// Slide size declared with `/* @size WxH */`, if any.
    pub size: Option<Viewport>,
}

impl Theme {
    /// Parses `/* @theme name */` and `/* @size ... */` metadata comments.
    pub fn from_css(css: impl Into<String>) -> Option<Theme> {
        let css = css.into();
        let name = meta_value(&css, "@theme")?;
        let size = meta_value(&css, "@size").and_then(|value| value.parse().ok());
        Some(Theme { name, css, size })
    }
}

fn meta_value(css: &str, key: &str) -> Option<String> {
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        let after = &rest[start + 2..];
        let end = after.find("*/")?;
        let comment = after[..end].trim();
        if let Some(value) = comment.strip_prefix(key) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        rest = &after[end + 2..];
    }
    None
}

/// Themes available to one engine instance.
#[derive(Debug, Clone)]
pub struct ThemeSet {
    themes: BTreeMap<String, Theme>,
    default: String,
}

impl Default for ThemeSet {
    fn default() -> Self {
        let mut set = Self {
            themes: BTreeMap::new(),
            default: DEFAULT_THEME.to_string(),
        };
        for css in [DEFAULT_CSS, GAIA_CSS] {
            if let Some(theme) = Theme::from_css(css) {
                set.add(theme);
            }
        }
        set
    }
}

impl ThemeSet {
    pub fn add(&mut self, theme: Theme) {
        self.themes.insert(theme.name.clone(), theme);
    }

    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    pub fn default_theme(&self) -> Option<&Theme> {
        self.themes.get(&self.default)
    }

    /// Resolves a requested theme, falling back to the default one.
    pub fn resolve(&self, requested: Option<&str>) -> Option<&Theme> {
        requested
            .and_then(|name| self.get(name))
            .or_else(|| self.default_theme())
    }
}

/// Installs themes into engines and tracks which theme each source used.
pub trait ThemeRegistry: Send + Sync {
    fn register_to(&self, engine: &mut dyn Engine);

    /// Records the theme a conversion of `path` used, and the one it asked
    /// for when that differs.
    fn observe(&self, path: &Path, theme: &str, requested: Option<&str>);
}

#[derive(Debug, Clone)]
struct Observation {
    theme: String,
    requested: Option<String>,
}

impl Observation {
    fn depends_on(&self, theme: &str) -> bool {
        self.theme == theme || self.requested.as_deref() == Some(theme)
    }
}

/// Themes loaded from user-supplied stylesheets.
#[derive(Debug, Default)]
pub struct ThemeCatalog {
    themes: RwLock<Vec<Theme>>,
    observed: Mutex<HashMap<PathBuf, Observation>>,
}

impl ThemeCatalog {
    pub fn new(themes: Vec<Theme>) -> Self {
        Self {
            themes: RwLock::new(themes),
            observed: Mutex::new(HashMap::new()),
        }
    }

    /// Loads every `.css` file from the given files or directories.
    pub async fn load(paths: &[PathBuf]) -> Result<Self> {
        Ok(Self::new(read_themes(paths).await?))
    }

    /// Re-reads the stylesheets, keeping the observed theme usage.
    pub async fn reload(&self, paths: &[PathBuf]) -> Result<()> {
        let themes = read_themes(paths).await?;
        *self
            .themes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = themes;
        Ok(())
    }

    pub fn themes(&self) -> Vec<Theme> {
        self.themes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Last theme observed for a source file.
    pub fn observed(&self, path: &Path) -> Option<String> {
        self.observed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .map(|observation| observation.theme.clone())
    }

    /// Source files whose last conversion used or asked for `theme`.
    pub fn sources_using(&self, theme: &str) -> Vec<PathBuf> {
        let mut sources: Vec<PathBuf> = self
            .observed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(_, observation)| observation.depends_on(theme))
            .map(|(path, _)| path.clone())
            .collect();
        sources.sort();
        sources
    }
}

impl ThemeRegistry for ThemeCatalog {
    fn register_to(&self, engine: &mut dyn Engine) {
        let set = engine.themes_mut();
        for theme in self.themes() {
            set.add(theme);
        }
    }

    fn observe(&self, path: &Path, theme: &str, requested: Option<&str>) {
        let observation = Observation {
            theme: theme.to_string(),
            requested: requested.filter(|name| *name != theme).map(str::to_string),
        };
        self.observed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_path_buf(), observation);
    }
}

async fn read_themes(paths: &[PathBuf]) -> Result<Vec<Theme>> {
    let mut themes = Vec::new();
    for path in css_files(paths) {
        let css = tokio::fs::read_to_string(&path).await?;
        match Theme::from_css(css) {
            Some(theme) => {
                debug!(theme = %theme.name, path = %path.display(), "Loaded theme");
                themes.push(theme);
            }
            None => warn!(
                path = %path.display(),
                "Skipping stylesheet without a /* @theme name */ comment"
            ),
        }
    }
    Ok(themes)
}

/// Expands files and directories into the `.css` files they contain.
pub fn css_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "css"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_theme_and_size_metadata() {
        let theme = Theme::from_css("/* @theme forest */\n/* @size 4:3 */\nsection{}").unwrap();
        assert_eq!(theme.name, "forest");
        assert_eq!(theme.size, Some(Viewport::STANDARD));
    }

    #[test]
    fn css_without_theme_comment_is_rejected() {
        assert!(Theme::from_css("/* just a comment */ section{}").is_none());
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let set = ThemeSet::default();
        assert_eq!(set.resolve(Some("gaia")).unwrap().name, "gaia");
        assert_eq!(set.resolve(Some("missing")).unwrap().name, DEFAULT_THEME);
        assert_eq!(set.resolve(None).unwrap().name, DEFAULT_THEME);
        assert!(set.get("gaia").is_some());
        assert!(set.get("forest").is_none());
    }

    #[test]
    fn catalog_tracks_observations() {
        let catalog = ThemeCatalog::default();
        catalog.observe(Path::new("a.md"), "forest", Some("forest"));
        catalog.observe(Path::new("b.md"), "gaia", None);
        catalog.observe(Path::new("c.md"), "forest", None);
        assert_eq!(catalog.observed(Path::new("b.md")).as_deref(), Some("gaia"));
        assert_eq!(
            catalog.sources_using("forest"),
            vec![PathBuf::from("a.md"), PathBuf::from("c.md")]
        );

        // Re-observing replaces the earlier entry.
        catalog.observe(Path::new("c.md"), "gaia", None);
        assert_eq!(catalog.sources_using("forest"), vec![PathBuf::from("a.md")]);
    }

    #[test]
    fn missing_requested_theme_is_tracked_with_fallback() {
        let catalog = ThemeCatalog::default();
        catalog.observe(Path::new("deck.md"), DEFAULT_THEME, Some("forest"));
        assert_eq!(catalog.observed(Path::new("deck.md")).as_deref(), Some(DEFAULT_THEME));
        assert_eq!(catalog.sources_using("forest"), vec![PathBuf::from("deck.md")]);
        assert_eq!(catalog.sources_using(DEFAULT_THEME), vec![PathBuf::from("deck.md")]);
    }

    #[tokio::test]
    async fn load_reads_css_from_directories() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("forest.css"), "/* @theme forest */").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "/* @theme nope */").unwrap();
        std::fs::write(dir.path().join("anon.css"), "section {}").unwrap();

        let catalog = ThemeCatalog::load(&[dir.path().to_path_buf()])
            .await
            .expect("load");
        let names: Vec<_> = catalog.themes().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["forest".to_string()]);

        std::fs::write(dir.path().join("ocean.css"), "/* @theme ocean */").unwrap();
        catalog.observe(Path::new("deck.md"), "forest", None);
        catalog
            .reload(&[dir.path().to_path_buf()])
            .await
            .expect("reload");
        assert_eq!(catalog.themes().len(), 2);
        assert_eq!(catalog.sources_using("forest"), vec![PathBuf::from("deck.md")]);
    }
}
