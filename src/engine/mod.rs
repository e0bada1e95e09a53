//! Rendering engine contract and the adapter that prepares engines for use.
//!
//! - [`Engine`] - Turns deck markdown into [`RenderOutput`]
//! - [`EnginePlugin`] - Composition hooks run by the engine
//! - [`EngineDescriptor`] - How to obtain an engine (constructible type or factory)
//! - [`SlideEngine`] - Built-in comrak-based engine

mod adapter;
mod plugins;
mod slides;

use std::collections::BTreeMap;

use crate::theme::ThemeSet;
use crate::types::RenderOutput;
use crate::{Result, Viewport};

pub use adapter::{build_engine, BuiltEngine, ConstructibleEngine, EngineDescriptor, EngineFactory};
pub use plugins::{InfoPlugin, InfoSlot, MetaPlugin, META_DIRECTIVES};
pub use slides::SlideEngine;

/// Markdown processing switches an engine exposes for reconfiguration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Allow raw HTML in the source.
    pub html: bool,
    /// Render soft line breaks as `<br>`.
    pub breaks: bool,
}

/// Options handed to an engine at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub markdown: MarkdownOptions,
    /// Fallback `lang` when the deck does not declare one.
    pub lang: Option<String>,
}

/// What the engine resolved while rendering, handed to every plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPass<'a> {
    pub theme: Option<&'a str>,
    pub size: Viewport,
    /// Resolved global directives, values as written in the source.
    pub directives: &'a BTreeMap<String, String>,
}

pub trait EnginePlugin: Send {
    fn name(&self) -> &'static str;

    /// Extra global directive names the engine should accept.
    fn global_directives(&self) -> &[&'static str] {
        &[]
    }

    fn on_rendered(&mut self, _pass: &RenderPass<'_>) {}
}

pub trait Engine: Send {
    fn name(&self) -> &str;

    /// Whether [`Engine::render`] is usable on this instance.
    fn supports_render(&self) -> bool {
        true
    }

    fn render(&mut self, markdown: &str) -> Result<RenderOutput>;

    fn markdown_options_mut(&mut self) -> &mut MarkdownOptions;

    fn use_plugin(&mut self, plugin: Box<dyn EnginePlugin>);

    fn themes_mut(&mut self) -> &mut ThemeSet;
}
