use std::sync::{Arc, Mutex};

use super::{EnginePlugin, RenderPass};
use crate::types::EngineInfo;

/// Metadata directives accepted globally and passed through untouched.
pub const META_DIRECTIVES: &[&str] = &[
    "author",
    "description",
    "image",
    "keywords",
    "lang",
    "title",
    "url",
];

/// Declares the metadata directives so the engine keeps them.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetaPlugin;

impl EnginePlugin for MetaPlugin {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn global_directives(&self) -> &[&'static str] {
        META_DIRECTIVES
    }
}

/// Shared slot the info plugin writes into.
#[derive(Debug, Clone, Default)]
pub struct InfoSlot(Arc<Mutex<Option<EngineInfo>>>);

impl InfoSlot {
    fn put(&self, info: EngineInfo) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(info);
    }

    /// Takes the captured info, leaving the slot empty.
    pub fn take(&self) -> Option<EngineInfo> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Captures theme, size and metadata of every render pass.
#[derive(Debug)]
pub struct InfoPlugin {
    slot: InfoSlot,
}

impl InfoPlugin {
    pub fn new(slot: InfoSlot) -> Self {
        Self { slot }
    }
}

impl EnginePlugin for InfoPlugin {
    fn name(&self) -> &'static str {
        "info"
    }

    fn on_rendered(&mut self, pass: &RenderPass<'_>) {
        let meta = pass
            .directives
            .iter()
            .filter(|(key, _)| META_DIRECTIVES.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.slot.put(EngineInfo {
            theme: pass.theme.map(str::to_string),
            requested_theme: pass.directives.get("theme").cloned(),
            size: pass.size,
            meta,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;
    use std::collections::BTreeMap;

    #[test]
    fn info_plugin_captures_theme_size_and_meta_only() {
        let slot = InfoSlot::default();
        let mut plugin = InfoPlugin::new(slot.clone());
        let mut directives = BTreeMap::new();
        directives.insert("title".to_string(), "Roadmap".to_string());
        directives.insert("style".to_string(), "h1 { color: red }".to_string());
        directives.insert("theme".to_string(), "forest".to_string());

        plugin.on_rendered(&RenderPass {
            theme: Some("forest"),
            size: Viewport::STANDARD,
            directives: &directives,
        });

        let info = slot.take().expect("info captured");
        assert_eq!(info.theme.as_deref(), Some("forest"));
        assert_eq!(info.requested_theme.as_deref(), Some("forest"));
        assert_eq!(info.size, Viewport::STANDARD);
        assert_eq!(info.title(), Some("Roadmap"));
        assert!(!info.meta.contains_key("style"));
        assert!(slot.take().is_none(), "slot is emptied by take");
    }

    #[test]
    fn meta_plugin_declares_metadata_directives() {
        assert!(MetaPlugin.global_directives().contains(&"title"));
        assert!(MetaPlugin.global_directives().contains(&"lang"));
    }
}
