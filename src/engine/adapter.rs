use std::fmt;
use std::sync::Arc;

use super::plugins::{InfoPlugin, InfoSlot, MetaPlugin};
use super::{Engine, EngineOptions};
use crate::theme::ThemeRegistry;
use crate::{ConvertError, Result};

/// An engine type that can be constructed directly from options.
pub trait ConstructibleEngine: Engine + Sized + 'static {
    fn construct(options: &EngineOptions) -> Self;
}

pub type EngineFactory = Arc<dyn Fn(&EngineOptions) -> Result<Box<dyn Engine>> + Send + Sync>;

/// How the converter obtains an engine instance, chosen at configuration time.
#[derive(Clone)]
pub enum EngineDescriptor {
    Constructible(fn(&EngineOptions) -> Box<dyn Engine>),
    Factory(EngineFactory),
}

fn construct_boxed<E: ConstructibleEngine>(options: &EngineOptions) -> Box<dyn Engine> {
    Box::new(E::construct(options))
}

impl EngineDescriptor {
    pub fn constructible<E: ConstructibleEngine>() -> Self {
        EngineDescriptor::Constructible(construct_boxed::<E>)
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&EngineOptions) -> Result<Box<dyn Engine>> + Send + Sync + 'static,
    {
        EngineDescriptor::Factory(Arc::new(factory))
    }

    fn instantiate(&self, options: &EngineOptions) -> Result<Box<dyn Engine>> {
        match self {
            EngineDescriptor::Constructible(construct) => Ok(construct(options)),
            EngineDescriptor::Factory(factory) => factory(options),
        }
    }
}

impl fmt::Debug for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineDescriptor::Constructible(_) => f.write_str("EngineDescriptor::Constructible"),
            EngineDescriptor::Factory(_) => f.write_str("EngineDescriptor::Factory"),
        }
    }
}

/// An engine with the converter's plugins wired in.
pub struct BuiltEngine {
    pub engine: Box<dyn Engine>,
    /// Filled by the info plugin after each render.
    pub info: InfoSlot,
}

/// Instantiates an engine and prepares it for a conversion.
///
/// `html` overrides the engine's raw-HTML setting when set.
pub fn build_engine(
    descriptor: &EngineDescriptor,
    options: &EngineOptions,
    html: Option<bool>,
    themes: &dyn ThemeRegistry,
) -> Result<BuiltEngine> {
    let mut engine = descriptor.instantiate(options)?;
    if !engine.supports_render() {
        return Err(ConvertError::EngineNotRenderable(engine.name().to_string()));
    }

    if let Some(html) = html {
        engine.markdown_options_mut().html = html;
    }

    let info = InfoSlot::default();
    engine.use_plugin(Box::new(MetaPlugin));
    engine.use_plugin(Box::new(InfoPlugin::new(info.clone())));
    themes.register_to(engine.as_mut());

    Ok(BuiltEngine { engine, info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EnginePlugin, MarkdownOptions, SlideEngine};
    use crate::theme::{Theme, ThemeCatalog, ThemeSet};
    use crate::types::RenderOutput;

    struct PluginOnly {
        markdown: MarkdownOptions,
        themes: ThemeSet,
    }

    impl Engine for PluginOnly {
        fn name(&self) -> &str {
            "plugin-only"
        }

        fn supports_render(&self) -> bool {
            false
        }

        fn render(&mut self, _markdown: &str) -> Result<RenderOutput> {
            Err(ConvertError::engine("unreachable"))
        }

        fn markdown_options_mut(&mut self) -> &mut MarkdownOptions {
            &mut self.markdown
        }

        fn use_plugin(&mut self, _plugin: Box<dyn EnginePlugin>) {}

        fn themes_mut(&mut self) -> &mut ThemeSet {
            &mut self.themes
        }
    }

    #[test]
    fn factory_without_render_fails_fast() {
        let descriptor = EngineDescriptor::factory(|_| {
            Ok(Box::new(PluginOnly {
                markdown: MarkdownOptions::default(),
                themes: ThemeSet::default(),
            }) as Box<dyn Engine>)
        });
        let err = build_engine(
            &descriptor,
            &EngineOptions::default(),
            None,
            &ThemeCatalog::default(),
        )
        .err()
        .expect("should fail");
        assert!(matches!(err, ConvertError::EngineNotRenderable(name) if name == "plugin-only"));
    }

    #[test]
    fn factory_errors_propagate() {
        let descriptor = EngineDescriptor::factory(|_| Err(ConvertError::engine("boom")));
        let result = build_engine(
            &descriptor,
            &EngineOptions::default(),
            None,
            &ThemeCatalog::default(),
        );
        assert!(matches!(result, Err(ConvertError::Engine(msg)) if msg == "boom"));
    }

    #[test]
    fn constructible_engine_gets_html_override_and_themes() {
        let descriptor = EngineDescriptor::constructible::<SlideEngine>();
        let catalog = ThemeCatalog::new(vec![Theme::from_css("/* @theme forest */").unwrap()]);
        let mut built =
            build_engine(&descriptor, &EngineOptions::default(), Some(true), &catalog).unwrap();

        assert!(built.engine.markdown_options_mut().html);
        assert!(built.engine.themes_mut().get("forest").is_some());
    }

    #[test]
    fn descriptor_debug_names_variant() {
        let descriptor = EngineDescriptor::constructible::<SlideEngine>();
        assert_eq!(format!("{:?}", descriptor), "EngineDescriptor::Constructible");
    }
}
