//! Built-in slide engine.
//!
//! Slides are separated by `---` lines outside code fences. Directives come
//! from YAML front-matter and from HTML comments holding `key: value` pairs;
//! any other comment is kept as a presenter note.

use comrak::{markdown_to_html, Options};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

use super::adapter::ConstructibleEngine;
use super::{Engine, EngineOptions, EnginePlugin, MarkdownOptions, RenderPass};
use crate::theme::ThemeSet;
use crate::types::RenderOutput;
use crate::{ConvertError, Result, Viewport};

const BUILTIN_GLOBALS: &[&str] = &["theme", "size", "style"];
const LOCAL_DIRECTIVES: &[&str] = &[
    "backgroundColor",
    "class",
    "color",
    "footer",
    "header",
    "paginate",
];

pub struct SlideEngine {
    markdown: MarkdownOptions,
    lang: Option<String>,
    plugins: Vec<Box<dyn EnginePlugin>>,
    themes: ThemeSet,
}

impl ConstructibleEngine for SlideEngine {
    fn construct(options: &EngineOptions) -> Self {
        Self {
            markdown: options.markdown,
            lang: options.lang.clone(),
            plugins: Vec::new(),
            themes: ThemeSet::default(),
        }
    }
}

impl Default for SlideEngine {
    fn default() -> Self {
        Self::construct(&EngineOptions::default())
    }
}

struct ParsedSlide {
    markdown: String,
    attributes: BTreeMap<String, String>,
    notes: Vec<String>,
}

impl SlideEngine {
    fn accepted_globals(&self) -> Vec<&'static str> {
        let mut accepted = BUILTIN_GLOBALS.to_vec();
        for plugin in &self.plugins {
            accepted.extend_from_slice(plugin.global_directives());
        }
        accepted
    }

    fn comrak_options(&self) -> Options<'static> {
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.render.r#unsafe = self.markdown.html;
        options.render.hardbreaks = self.markdown.breaks;
        options
    }

    fn parse(
        &self,
        markdown: &str,
    ) -> Result<(BTreeMap<String, String>, Vec<ParsedSlide>)> {
        let accepted = self.accepted_globals();
        let is_global = |key: &str| accepted.iter().any(|name| *name == key);
        let is_local = |key: &str| LOCAL_DIRECTIVES.iter().any(|name| *name == key);
        let is_spot = |key: &str| key.strip_prefix('_').is_some_and(is_local);
        let is_directive = |key: &str| is_global(key) || is_local(key) || is_spot(key);

        let (front_matter, body) = split_front_matter(markdown)?;
        let mut globals = BTreeMap::new();
        let mut inherited = BTreeMap::new();
        for (key, value) in front_matter {
            if is_global(&key) {
                globals.insert(key, value);
            } else if is_local(&key) {
                inherited.insert(key, value);
            }
        }

        let mut slides = Vec::new();
        for source in split_slides(body) {
            let (markdown, comments) = extract_comments(&source);
            let mut spot = BTreeMap::new();
            let mut notes = Vec::new();

            for comment in comments {
                let Some(entries) = parse_directives(&comment, &is_directive) else {
                    let note = comment.trim();
                    if !note.is_empty() {
                        notes.push(note.to_string());
                    }
                    continue;
                };
                for (key, value) in entries {
                    if let Some(name) = key.strip_prefix('_') {
                        spot.insert(name.to_string(), value);
                    } else if is_local(&key) {
                        inherited.insert(key, value);
                    } else {
                        globals.insert(key, value);
                    }
                }
            }

            let mut attributes = inherited.clone();
            attributes.extend(spot);
            slides.push(ParsedSlide {
                markdown,
                attributes,
                notes,
            });
        }

        Ok((globals, slides))
    }

    fn render_slide(
        &self,
        index: usize,
        slide: &ParsedSlide,
        theme: Option<&str>,
        options: &Options<'static>,
    ) -> String {
        let attrs = &slide.attributes;
        let mut html = format!("<section id=\"{}\"", index + 1);
        if let Some(theme) = theme {
            html.push_str(&format!(
                " data-theme=\"{}\"",
                encode_double_quoted_attribute(theme)
            ));
        }
        if let Some(class) = attrs.get("class") {
            html.push_str(&format!(
                " class=\"{}\"",
                encode_double_quoted_attribute(class)
            ));
        }

        let mut style = String::new();
        if let Some(background) = attrs.get("backgroundColor") {
            style.push_str(&format!("background-color:{};", background));
        }
        if let Some(color) = attrs.get("color") {
            style.push_str(&format!("color:{};", color));
        }
        if !style.is_empty() {
            html.push_str(&format!(
                " style=\"{}\"",
                encode_double_quoted_attribute(&style)
            ));
        }
        if attrs.get("paginate").is_some_and(|v| v == "true") {
            html.push_str(&format!(" data-paginate=\"true\" data-page=\"{}\"", index + 1));
        }
        html.push('>');

        if let Some(header) = attrs.get("header") {
            html.push_str(&format!("<header>{}</header>", encode_text(header)));
        }
        html.push_str(&markdown_to_html(&slide.markdown, options));
        if let Some(footer) = attrs.get("footer") {
            html.push_str(&format!("<footer>{}</footer>", encode_text(footer)));
        }
        html.push_str("</section>\n");
        html
    }
}

impl Engine for SlideEngine {
    fn name(&self) -> &str {
        "slide-engine"
    }

    fn render(&mut self, markdown: &str) -> Result<RenderOutput> {
        let (mut globals, slides) = self.parse(markdown)?;
        if let Some(lang) = &self.lang {
            globals
                .entry("lang".to_string())
                .or_insert_with(|| lang.clone());
        }

        let theme = self
            .themes
            .resolve(globals.get("theme").map(String::as_str))
            .cloned();
        let size = globals
            .get("size")
            .and_then(|value| value.parse::<Viewport>().ok())
            .or_else(|| theme.as_ref().and_then(|t| t.size))
            .unwrap_or_default();
        let theme_name = theme.as_ref().map(|t| t.name.as_str());

        let options = self.comrak_options();
        let mut html = String::new();
        let mut comments = Vec::with_capacity(slides.len());
        for (index, slide) in slides.iter().enumerate() {
            html.push_str(&self.render_slide(index, slide, theme_name, &options));
            comments.push(slide.notes.clone());
        }

        let mut css = theme.as_ref().map(|t| t.css.clone()).unwrap_or_default();
        css.push_str(&format!(
            "\nsection {{ width: {w}px; height: {h}px; position: relative; overflow: hidden; }}\n@page {{ size: {w}px {h}px; margin: 0; }}\n",
            w = size.width,
            h = size.height
        ));
        if let Some(style) = globals.get("style") {
            css.push_str(style);
            css.push('\n');
        }

        let pass = RenderPass {
            theme: theme_name,
            size,
            directives: &globals,
        };
        for plugin in &mut self.plugins {
            plugin.on_rendered(&pass);
        }

        Ok(RenderOutput {
            html,
            css,
            comments,
        })
    }

    fn markdown_options_mut(&mut self) -> &mut MarkdownOptions {
        &mut self.markdown
    }

    fn use_plugin(&mut self, plugin: Box<dyn EnginePlugin>) {
        self.plugins.push(plugin);
    }

    fn themes_mut(&mut self) -> &mut ThemeSet {
        &mut self.themes
    }
}

fn yaml_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => items
            .iter()
            .map(yaml_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn mapping_entries(mapping: &Mapping) -> Option<Vec<(String, String)>> {
    mapping
        .iter()
        .map(|(key, value)| Some((key.as_str()?.to_string(), yaml_to_string(value))))
        .collect()
}

/// Splits leading `---` front-matter from the body.
fn split_front_matter(markdown: &str) -> Result<(Vec<(String, String)>, &str)> {
    let Some(rest) = markdown
        .strip_prefix("---\n")
        .or_else(|| markdown.strip_prefix("---\r\n"))
    else {
        return Ok((Vec::new(), markdown));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            if yaml.trim().is_empty() {
                return Ok((Vec::new(), body));
            }
            let value: Value = serde_yaml::from_str(yaml)
                .map_err(|err| ConvertError::engine(format!("Invalid front-matter: {err}")))?;
            // Only a mapping is front-matter; anything else is deck content.
            let Value::Mapping(mapping) = value else {
                return Ok((Vec::new(), markdown));
            };
            let entries = mapping_entries(&mapping).ok_or_else(|| {
                ConvertError::engine("Front-matter keys must be strings".to_string())
            })?;
            return Ok((entries, body));
        }
        offset += line.len();
    }

    // No closing delimiter: treat the leading rule as a slide separator.
    Ok((Vec::new(), markdown))
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn split_slides(body: &str) -> Vec<String> {
    let mut slides = vec![String::new()];
    let mut in_fence = false;
    for line in body.split_inclusive('\n') {
        if is_fence(line) {
            in_fence = !in_fence;
        }
        if !in_fence && line.trim() == "---" {
            slides.push(String::new());
            continue;
        }
        if let Some(current) = slides.last_mut() {
            current.push_str(line);
        }
    }
    slides
}

/// Removes HTML comments outside code fences, returning their contents.
fn extract_comments(source: &str) -> (String, Vec<String>) {
    let mut markdown = String::with_capacity(source.len());
    let mut comments = Vec::new();
    let mut pending = String::new();
    let mut in_fence = false;

    let flush = |pending: &mut String, markdown: &mut String, comments: &mut Vec<String>| {
        let mut rest = pending.as_str();
        while let Some(start) = rest.find("<!--") {
            let Some(end) = rest[start + 4..].find("-->") else {
                break;
            };
            markdown.push_str(&rest[..start]);
            comments.push(rest[start + 4..start + 4 + end].to_string());
            rest = &rest[start + 4 + end + 3..];
        }
        markdown.push_str(rest);
        pending.clear();
    };

    for line in source.split_inclusive('\n') {
        if is_fence(line) {
            if !in_fence {
                flush(&mut pending, &mut markdown, &mut comments);
            }
            in_fence = !in_fence;
            markdown.push_str(line);
        } else if in_fence {
            markdown.push_str(line);
        } else {
            pending.push_str(line);
        }
    }
    flush(&mut pending, &mut markdown, &mut comments);
    (markdown, comments)
}

/// Parses a comment as a directive block if every key is a known directive.
fn parse_directives(
    comment: &str,
    is_directive: &dyn Fn(&str) -> bool,
) -> Option<Vec<(String, String)>> {
    let mapping: Mapping = serde_yaml::from_str(comment.trim()).ok()?;
    let entries = mapping_entries(&mapping)?;
    if entries.is_empty() || !entries.iter().all(|(key, _)| is_directive(key)) {
        return None;
    }
    Some(entries)
}
