//! Conversion orchestrator.
//!
//! A [`Converter`] renders decks through the configured engine, wraps them in
//! a template, and hands PDF and image output to the shared
//! [`BrowserSession`]. Batches run strictly one file after another so the
//! browser is used by a single page at a time and results keep input order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, LocalFileStrategy};
use crate::config::Timeouts;
use crate::engine::{build_engine, BuiltEngine, EngineDescriptor, EngineOptions, SlideEngine};
use crate::file::{OutputTarget, SourceFile};
use crate::pipeline::CaptureTask;
use crate::template::{Template, TemplateOptions, TemplateResult};
use crate::theme::ThemeRegistry;
use crate::types::{ConvertType, GlobalDirectives};
use crate::watch::ReloadNotifier;
use crate::{ConvertError, Result};

#[derive(Debug, Clone)]
pub struct ConverterOptions {
    pub engine: EngineDescriptor,
    pub engine_options: EngineOptions,
    /// Overrides the engine's raw-HTML setting when set.
    pub html: Option<bool>,
    /// Directive overrides appended to every document.
    pub globals: GlobalDirectives,
    pub convert_type: ConvertType,
    pub template: String,
    pub lang: Option<String>,
    pub output: OutputTarget,
    pub input_dir: Option<PathBuf>,
    pub jpeg_quality: u8,
    pub allow_local_files: bool,
    pub watch: bool,
    pub timeouts: Timeouts,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            engine: EngineDescriptor::constructible::<SlideEngine>(),
            engine_options: EngineOptions::default(),
            html: None,
            globals: GlobalDirectives::new(),
            convert_type: ConvertType::Html,
            template: Template::default().name().to_string(),
            lang: None,
            output: OutputTarget::Auto,
            input_dir: None,
            jpeg_quality: 85,
            allow_local_files: false,
            watch: false,
            timeouts: Timeouts::default(),
        }
    }
}

pub type ConvertedCallback = Arc<dyn Fn(&ConvertResult) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ConvertFileOptions {
    /// Called after each artifact is persisted.
    pub on_converted: Option<ConvertedCallback>,
    /// Render only; no artifact is captured or written.
    pub scanning_only: bool,
}

impl std::fmt::Debug for ConvertFileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertFileOptions")
            .field("on_converted", &self.on_converted.is_some())
            .field("scanning_only", &self.scanning_only)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ConvertResult {
    pub file: SourceFile,
    pub new_file: SourceFile,
    pub template: TemplateResult,
}

/// Steps a single file goes through; logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Loaded,
    Rendered,
    BrowserAcquired,
    CaptureComplete,
    Done,
}

pub struct Converter {
    options: ConverterOptions,
    template: Template,
    themes: Arc<dyn ThemeRegistry>,
    browser: BrowserSession,
    notifier: Option<Arc<dyn ReloadNotifier>>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .field("template", &self.template)
            .field("browser", &self.browser)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Fails with [`ConvertError::UnknownTemplate`] before anything renders.
    pub fn new(
        options: ConverterOptions,
        themes: Arc<dyn ThemeRegistry>,
        browser: BrowserSession,
    ) -> Result<Self> {
        let template = Template::by_name(&options.template)?;
        Ok(Self {
            options,
            template,
            themes,
            browser,
            notifier: None,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReloadNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    pub fn browser(&self) -> &BrowserSession {
        &self.browser
    }

    /// Shuts down the browser if one was launched.
    pub async fn close(&self) -> Result<()> {
        self.browser.close_browser().await
    }

    /// Renders `markdown` into a complete HTML document.
    pub async fn convert(&self, markdown: &str, file: Option<&SourceFile>) -> Result<TemplateResult> {
        let source = format!("{}{}", markdown, self.options.globals.to_appended_block()?);

        let (rendered, info) = {
            let BuiltEngine { mut engine, info } = build_engine(
                &self.options.engine,
                &self.options.engine_options,
                self.options.html,
                self.themes.as_ref(),
            )?;
            let rendered = engine.render(&source)?;
            let info = info.take().ok_or(ConvertError::MissingEngineInfo)?;
            (rendered, info)
        };

        let real_file = file.filter(|f| f.is_file());
        if let (Some(file), Some(theme)) = (real_file, info.theme.as_deref()) {
            self.themes
                .observe(&file.absolute_path(), theme, info.requested_theme.as_deref());
        }

        let mut template_options = TemplateOptions {
            lang: self.options.lang.clone(),
            ..TemplateOptions::default()
        };
        if self.options.watch && self.options.convert_type == ConvertType::Html {
            if let (Some(notifier), Some(file)) = (&self.notifier, real_file) {
                template_options.reload_token = Some(notifier.register(&file.absolute_path()).await?);
            }
        }
        if self.options.allow_local_files && self.options.convert_type.needs_browser() {
            template_options.base_url = real_file.map(SourceFile::absolute_file_scheme);
        }

        let result = self.template.render(&rendered, &info, &template_options);
        Ok(TemplateResult {
            result,
            rendered,
            info,
        })
    }

    /// Converts one file and persists the artifact.
    pub async fn convert_file(
        &self,
        mut file: SourceFile,
        options: &ConvertFileOptions,
    ) -> Result<ConvertResult> {
        let started = Instant::now();
        let shown = file.relative_path();
        let convert_type = self.options.convert_type;

        let markdown = String::from_utf8_lossy(file.load().await?).into_owned();
        debug!(file = %shown.display(), stage = ?Stage::Loaded);

        let template = self.convert(&markdown, Some(&file)).await?;
        debug!(file = %shown.display(), stage = ?Stage::Rendered);

        let mut new_file = file.convert(
            &self.options.output,
            self.options.input_dir.as_deref(),
            convert_type,
        );
        if options.scanning_only {
            return Ok(ConvertResult {
                file,
                new_file,
                template,
            });
        }

        if convert_type.needs_browser() {
            let page_source =
                SourceFile::with_content(file.path(), template.result.as_bytes().to_vec());
            let task = CaptureTask {
                format: convert_type,
                size: template.info.size,
                jpeg_quality: self.options.jpeg_quality,
                timeouts: self.options.timeouts,
            };
            let strategy = LocalFileStrategy::for_policy(self.options.allow_local_files);
            debug!(file = %shown.display(), stage = ?Stage::BrowserAcquired, ?strategy);
            let artifact = self.browser.use_page(&page_source, strategy, &task).await?;
            debug!(file = %shown.display(), stage = ?Stage::CaptureComplete, bytes = artifact.len());
            new_file.buffer = Some(artifact);
        } else {
            new_file.buffer = Some(template.result.as_bytes().to_vec());
        }

        new_file.save().await?;
        debug!(file = %shown.display(), stage = ?Stage::Done);
        info!(
            "{} => {} ({} ms)",
            shown.display(),
            new_file.relative_path().display(),
            started.elapsed().as_millis()
        );

        let result = ConvertResult {
            file,
            new_file,
            template,
        };
        if let Some(callback) = &options.on_converted {
            callback(&result);
        }
        Ok(result)
    }

    /// Converts files one after another.
    ///
    /// Per-file failures are returned in their slot and do not stop the
    /// batch. Fatal errors abort it.
    pub async fn convert_files(
        &self,
        files: Vec<SourceFile>,
        options: &ConvertFileOptions,
    ) -> Result<Vec<Result<ConvertResult>>> {
        let named_output = matches!(self.options.output, OutputTarget::Path(_));
        if files.len() > 1 && named_output && self.options.input_dir.is_none() {
            return Err(ConvertError::OutputConflict);
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let shown = file.relative_path();
            match self.convert_file(file, options).await {
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(file = %shown.display(), error = %err, "Failed converting");
                    results.push(Err(err));
                }
                Ok(result) => results.push(Ok(result)),
            }
        }
        Ok(results)
    }
}
