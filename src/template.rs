//! HTML document templates wrapping rendered slides.

use html_escape::{encode_double_quoted_attribute, encode_safe};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{EngineInfo, RenderOutput};
use crate::{ConvertError, Result};

/// Port the live-reload server listens on in watch mode.
pub const RELOAD_PORT: u16 = 37717;

const BESPOKE_STYLE: &str = r#"
html, body { margin: 0; padding: 0; background: #000; }
body > section { display: none; margin: 0 auto; }
body > section.active { display: block; }
@media print {
  html, body { background: transparent; }
  body > section { display: block; page-break-after: always; break-after: page; }
}
"#;

const BESPOKE_SCRIPT: &str = r#"(function () {
  var slides = Array.prototype.slice.call(document.querySelectorAll('body > section'));
  var current = Math.max(0, Math.min(slides.length - 1, parseInt(location.hash.slice(1), 10) - 1 || 0));
  function show(index) {
    if (!slides.length) return;
    current = Math.max(0, Math.min(slides.length - 1, index));
    slides.forEach(function (slide, i) { slide.classList.toggle('active', i === current); });
    history.replaceState(null, '', '#' + (current + 1));
  }
  document.addEventListener('keydown', function (e) {
    if (['ArrowRight', 'PageDown', ' '].indexOf(e.key) >= 0) show(current + 1);
    if (['ArrowLeft', 'PageUp'].indexOf(e.key) >= 0) show(current - 1);
    if (e.key === 'Home') show(0);
    if (e.key === 'End') show(slides.length - 1);
  });
  show(current);
})();"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    /// Slides stacked one after another; suited to PDF and image capture.
    Bare,
    /// One slide at a time with keyboard navigation.
    #[default]
    Bespoke,
}

impl Template {
    pub const NAMES: &'static [&'static str] = &["bare", "bespoke"];

    pub fn by_name(name: &str) -> Result<Template> {
        name.parse()
            .map_err(|_| ConvertError::UnknownTemplate(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Template::Bare => "bare",
            Template::Bespoke => "bespoke",
        }
    }

    /// Wraps rendered slides into a complete HTML document.
    pub fn render(
        self,
        rendered: &RenderOutput,
        info: &EngineInfo,
        options: &TemplateOptions,
    ) -> String {
        let lang = info
            .lang()
            .or(options.lang.as_deref())
            .unwrap_or("en");

        let mut head = String::from("<meta charset=\"UTF-8\">\n");
        head.push_str(
            "<meta name=\"viewport\" content=\"width=device-width,height=device-height,initial-scale=1.0\">\n",
        );
        if let Some(base) = &options.base_url {
            head.push_str(&format!(
                "<base href=\"{}\">\n",
                encode_double_quoted_attribute(base)
            ));
        }
        head.push_str(&format!(
            "<title>{}</title>\n",
            encode_safe(info.title().unwrap_or("Slides"))
        ));
        head.push_str(&meta_tags(info));
        head.push_str(&format!("<style>{}</style>\n", rendered.css));
        if self == Template::Bespoke {
            head.push_str(&format!("<style>{}</style>\n", BESPOKE_STYLE));
        }

        let mut body = rendered.html.clone();
        if self == Template::Bespoke {
            body.push_str(&format!("<script>{}</script>\n", BESPOKE_SCRIPT));
        }
        if let Some(token) = &options.reload_token {
            body.push_str(&reload_script(token));
        }

        format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n{}</head>\n<body>\n{}</body>\n</html>\n",
            encode_double_quoted_attribute(lang),
            head,
            body
        )
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bare" => Ok(Template::Bare),
            "bespoke" => Ok(Template::Bespoke),
            other => Err(format!(
                "Unknown template '{other}'. Available: {}",
                Template::NAMES.join(", ")
            )),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-render template inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOptions {
    /// Fallback document language when the deck does not declare one.
    pub lang: Option<String>,
    /// Base URL for resolving relative resources from a temporary copy.
    pub base_url: Option<String>,
    /// Live-reload token; adds the reload client when set.
    pub reload_token: Option<String>,
}

/// Output of [`crate::Converter::convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResult {
    /// Complete HTML document.
    pub result: String,
    pub rendered: RenderOutput,
    pub info: EngineInfo,
}

fn meta_tags(info: &EngineInfo) -> String {
    let mut tags = String::new();
    let mut push = |attr: &str, key: &str, value: &str| {
        tags.push_str(&format!(
            "<meta {}=\"{}\" content=\"{}\">\n",
            attr,
            key,
            encode_double_quoted_attribute(value)
        ));
    };

    if let Some(description) = info.meta.get("description") {
        push("name", "description", description);
        push("property", "og:description", description);
    }
    if let Some(author) = info.meta.get("author") {
        push("name", "author", author);
    }
    if let Some(keywords) = info.meta.get("keywords") {
        push("name", "keywords", keywords);
    }
    if let Some(title) = info.title() {
        push("property", "og:title", title);
    }
    if let Some(url) = info.meta.get("url") {
        push("property", "og:url", url);
    }
    if let Some(image) = info.meta.get("image") {
        push("property", "og:image", image);
    }
    tags
}

fn reload_script(token: &str) -> String {
    format!(
        "<script data-reload-token=\"{token}\">(function () {{\n  var ws = new WebSocket('ws://localhost:{port}/{token}');\n  ws.addEventListener('message', function (e) {{ if (e.data === 'reload') location.reload(); }});\n}})();</script>\n",
        token = encode_double_quoted_attribute(token),
        port = RELOAD_PORT
    )
}
