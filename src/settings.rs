use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use slidepress_lib::browser::{LaunchEnvironment, LaunchOptions};
use slidepress_lib::{
    Config, ConvertError, ConvertType, ConverterOptions, EngineOptions, GlobalDirectives,
    OutputTarget, Timeouts,
};

use crate::cli::Cli;

/// Resolved settings after merging CLI args and config file.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub converter: ConverterOptions,
    pub launch: LaunchOptions,
    pub theme_set: Vec<PathBuf>,
    pub inputs: Vec<PathBuf>,
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/slidepress/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, ConvertError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        ConvertError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        ConvertError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Merge CLI arguments with config file, preferring CLI when flags are present.
pub fn resolve_settings(cli: &Cli, config: &Config) -> Result<ResolvedSettings, ConvertError> {
    let output = cli
        .output
        .as_deref()
        .map(OutputTarget::parse)
        .or_else(|| config.output.clone().map(OutputTarget::Path))
        .unwrap_or_default();
    let input_dir = cli.input_dir.clone().or_else(|| config.input_dir.clone());

    let convert_type = cli
        .requested_type()
        .or_else(|| type_from_output(&output, input_dir.is_some()))
        .or(config.convert_type)
        .unwrap_or_default();

    let jpeg_quality = cli.jpeg_quality.unwrap_or(config.jpeg_quality);
    if !(1..=100).contains(&jpeg_quality) {
        return Err(ConvertError::Config(format!(
            "--jpeg-quality must be between 1 and 100 (got {jpeg_quality})"
        )));
    }

    let timeouts = Timeouts {
        navigation: seconds_or(cli.nav_timeout, config.timeouts.navigation, "--nav-timeout")?,
        network_idle: seconds_or(
            cli.network_idle_timeout,
            config.timeouts.network_idle,
            "--network-idle-timeout",
        )?,
    };

    let lang = cli.lang.clone().or_else(|| config.lang.clone());
    let converter = ConverterOptions {
        engine_options: EngineOptions {
            lang: lang.clone(),
            ..EngineOptions::default()
        },
        html: cli.html_flag().or(config.html),
        globals: global_directives(cli)?,
        convert_type,
        template: cli
            .template
            .clone()
            .unwrap_or_else(|| config.template.clone()),
        lang,
        output,
        input_dir,
        jpeg_quality,
        allow_local_files: cli.allow_local_files || config.allow_local_files,
        watch: cli.watch,
        timeouts,
        ..ConverterOptions::default()
    };

    let launch = LaunchOptions {
        executable: cli
            .browser_path
            .clone()
            .or_else(|| config.browser.executable.clone()),
        args: LaunchEnvironment::detect().launch_args(),
        headful: config.browser.headful,
    };

    let mut theme_set = config.theme_set.clone();
    theme_set.extend(cli.theme_set.iter().cloned());

    Ok(ResolvedSettings {
        converter,
        launch,
        theme_set,
        inputs: cli.inputs.clone(),
    })
}

/// Output type implied by a named output file's extension.
fn type_from_output(output: &OutputTarget, has_input_dir: bool) -> Option<ConvertType> {
    match output {
        OutputTarget::Path(path) if !has_input_dir => path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ConvertType::from_extension),
        _ => None,
    }
}

fn seconds_or(cli: Option<u64>, config: Duration, flag: &str) -> Result<Duration, ConvertError> {
    match cli {
        Some(0) => Err(ConvertError::Config(format!(
            "{flag} must be greater than zero"
        ))),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(config),
    }
}

/// Directive overrides given on the command line.
fn global_directives(cli: &Cli) -> Result<GlobalDirectives, ConvertError> {
    GlobalDirectives::new()
        .with("theme", cli.theme.as_deref())?
        .with("size", cli.size.map(|size| size.to_string()))?
        .with("title", cli.title.as_deref())?
        .with("description", cli.description.as_deref())?
        .with("author", cli.author.as_deref())?
        .with("url", cli.url.as_deref())?
        .with("image", cli.og_image.as_deref())?
        .with("keywords", cli.keywords.as_ref())
}

/// Log effective settings (visible with --verbose).
pub fn log_effective_config(config_path: Option<&Path>, settings: &ResolvedSettings) {
    let source = config_path
        .map(|p| p.display().to_string())
        .or_else(|| {
            Config::central_config_path()
                .filter(|p| p.is_file())
                .map(|p| p.display().to_string())
        })
        .unwrap_or_else(|| "defaults".to_string());
    let options = &settings.converter;
    debug!(
        source = %source,
        convert_type = %options.convert_type,
        template = %options.template,
        jpeg_quality = options.jpeg_quality,
        allow_local_files = options.allow_local_files,
        nav_timeout = ?options.timeouts.navigation,
        network_idle_timeout = ?options.timeouts.network_idle,
        directives = options.globals.len(),
        "Effective config"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["slidepress"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn config_is_used_when_flags_absent() {
        let config = Config::from_toml_str(
            r#"
            type = "pdf"
            template = "bare"
            jpeg_quality = 60
            allow_local_files = true
            [timeouts]
            navigation = "5s"
            network_idle = "2s"
            "#,
        )
        .unwrap();
        let resolved = resolve_settings(&cli(&["deck.md"]), &config).unwrap();
        let options = &resolved.converter;

        assert_eq!(options.convert_type, ConvertType::Pdf);
        assert_eq!(options.template, "bare");
        assert_eq!(options.jpeg_quality, 60);
        assert!(options.allow_local_files);
        assert_eq!(options.timeouts.navigation, Duration::from_secs(5));
        assert_eq!(options.timeouts.network_idle, Duration::from_secs(2));
    }

    #[test]
    fn cli_flags_override_config() {
        let config = Config::from_toml_str("type = \"pdf\"\ntemplate = \"bare\"").unwrap();
        let resolved = resolve_settings(
            &cli(&["deck.md", "--image", "jpeg", "--template", "bespoke", "--nav-timeout", "3"]),
            &config,
        )
        .unwrap();

        assert_eq!(resolved.converter.convert_type, ConvertType::Jpeg);
        assert_eq!(resolved.converter.template, "bespoke");
        assert_eq!(resolved.converter.timeouts.navigation, Duration::from_secs(3));
    }

    #[test]
    fn type_is_inferred_from_output_extension() {
        let resolved =
            resolve_settings(&cli(&["deck.md", "-o", "slides.png"]), &Config::default()).unwrap();
        assert_eq!(resolved.converter.convert_type, ConvertType::Png);

        let resolved =
            resolve_settings(&cli(&["deck.md", "-o", "-"]), &Config::default()).unwrap();
        assert_eq!(resolved.converter.convert_type, ConvertType::Html);
        assert_eq!(resolved.converter.output, OutputTarget::Stdout);
    }

    #[test]
    fn directive_flags_become_global_overrides() {
        let resolved = resolve_settings(
            &cli(&["deck.md", "--theme", "forest", "--size", "4:3", "--keywords", "a,b"]),
            &Config::default(),
        )
        .unwrap();
        let globals = &resolved.converter.globals;

        assert_eq!(globals.len(), 3);
        assert_eq!(globals.get("theme"), Some(&serde_json::json!("forest")));
        assert_eq!(globals.get("size"), Some(&serde_json::json!("960x720")));
        assert_eq!(globals.get("keywords"), Some(&serde_json::json!(["a", "b"])));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = resolve_settings(&cli(&["deck.md", "--jpeg-quality", "0"]), &Config::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));

        let err = resolve_settings(&cli(&["deck.md", "--nav-timeout", "0"]), &Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("--nav-timeout"));
    }

    #[test]
    fn load_config_reports_path_on_parse_errors() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "unknown_key = 1").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
