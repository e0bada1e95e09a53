use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use slidepress_lib::{
    BrowserSession, ChromiumDriver, ConvertError, ConvertFileOptions, Converter, SourceFile,
    SourceWatcher, Theme, ThemeCatalog, TokenRegistry,
};

use super::inputs::collect_inputs;
use crate::cli::Cli;
use crate::formatting::{batch_exit_code, format_summary, render_error};
use crate::settings::{load_config, log_effective_config, resolve_settings, ResolvedSettings};

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);
const WATCH_DEBOUNCE: Duration = Duration::from_millis(150);

/// Run a conversion (and optionally keep watching).
pub async fn run_convert(cli: Cli) -> ExitCode {
    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err),
    };
    let settings = match resolve_settings(&cli, &config) {
        Ok(settings) => settings,
        Err(err) => return render_error(err),
    };
    log_effective_config(cli.config.as_deref(), &settings);

    let themes = match ThemeCatalog::load(&settings.theme_set).await {
        Ok(themes) => Arc::new(themes),
        Err(err) => return render_error(err),
    };
    let session = BrowserSession::new(Arc::new(ChromiumDriver), settings.launch.clone());
    let converter = match Converter::new(settings.converter.clone(), themes.clone(), session) {
        Ok(converter) => converter.with_notifier(Arc::new(TokenRegistry::new())),
        Err(err) => return render_error(err),
    };

    let code = run_with(&converter, &themes, &settings).await;
    if let Err(err) = converter.close().await {
        warn!(error = %err, "Failed to close browser");
    }
    code
}

async fn run_with(
    converter: &Converter,
    themes: &ThemeCatalog,
    settings: &ResolvedSettings,
) -> ExitCode {
    let files = match collect_inputs(&settings.inputs, settings.converter.input_dir.as_deref()) {
        Ok(files) => files,
        Err(err) => return render_error(err),
    };
    if files.is_empty() {
        warn!("No markdown files found");
        return ExitCode::SUCCESS;
    }

    let watched: Vec<PathBuf> = files
        .iter()
        .filter(|file| file.is_file())
        .map(SourceFile::absolute_path)
        .collect();

    let failed = match convert_batch(converter, files).await {
        Ok(failed) => failed,
        Err(err) => return render_error(err),
    };
    if !settings.converter.watch {
        return batch_exit_code(failed);
    }

    match watch(converter, themes, settings, watched).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => render_error(err),
    }
}

/// Converts a batch and returns how many files failed.
async fn convert_batch(converter: &Converter, files: Vec<SourceFile>) -> Result<usize, ConvertError> {
    let total = files.len();
    let results = converter
        .convert_files(files, &ConvertFileOptions::default())
        .await?;
    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        error!("{}", format_summary(total, failed));
    }
    Ok(failed)
}

async fn watch(
    converter: &Converter,
    themes: &ThemeCatalog,
    settings: &ResolvedSettings,
    sources: Vec<PathBuf>,
) -> Result<(), ConvertError> {
    let mut paths = sources.clone();
    paths.extend(settings.theme_set.iter().cloned());
    let mut watcher = SourceWatcher::new(&paths, WATCH_POLL_INTERVAL)?;
    info!("Watching {} file(s) for changes; press Ctrl+C to stop", sources.len());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
            changed = watcher.changed(WATCH_DEBOUNCE) => {
                let Some(changed) = changed else {
                    return Ok(());
                };
                let targets = affected_sources(&changed, &sources, themes, settings).await?;
                if targets.is_empty() {
                    continue;
                }
                let files = targets.into_iter().map(SourceFile::new).collect();
                convert_batch(converter, files).await?;
            }
        }
    }
}

/// Sources to re-convert for a set of changed paths.
///
/// A changed stylesheet reloads the theme set and selects every source whose
/// last conversion used that theme.
async fn affected_sources(
    changed: &[PathBuf],
    sources: &[PathBuf],
    themes: &ThemeCatalog,
    settings: &ResolvedSettings,
) -> Result<Vec<PathBuf>, ConvertError> {
    let mut targets = BTreeSet::new();
    let mut reloaded = false;

    for path in changed {
        let is_css = path.extension().is_some_and(|ext| ext == "css");
        if !is_css {
            if sources.contains(path) {
                targets.insert(path.clone());
            }
            continue;
        }

        if !reloaded {
            themes.reload(&settings.theme_set).await?;
            reloaded = true;
        }
        let css = tokio::fs::read_to_string(path).await?;
        if let Some(theme) = Theme::from_css(css) {
            info!(theme = %theme.name, "Theme changed");
            targets.extend(themes.sources_using(&theme.name));
        }
    }

    // Keep the original input order.
    Ok(sources
        .iter()
        .filter(|source| targets.contains(*source))
        .cloned()
        .collect())
}
