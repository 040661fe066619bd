//! State shared across one compile.
//!
//! The head pass mutates a [`GlobalData`] through `&mut`; the body pass only
//! reads it through a [`RenderContext`], and writes what it discovers
//! (media queries, component head styles, diagnostics) into a [`Collector`].

use indexmap::IndexMap;
use log::warn;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::options::RenderOptions;
use crate::registry::Registry;

pub type AttributeMap = IndexMap<String, String>;

/// Document-level data gathered by head components.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalData {
    pub title: String,
    pub preview: String,
    pub breakpoint: String,
    pub fonts: IndexMap<String, String>,
    /// Per-tag defaults from `mj-attributes`; `mj-all` applies to every tag.
    pub head_attributes: HashMap<String, AttributeMap>,
    /// Named `mj-class` bundles.
    pub classes: HashMap<String, AttributeMap>,
    /// Per-tag overrides nested under a `mj-class`: class -> tag -> attributes.
    pub classes_default: HashMap<String, HashMap<String, AttributeMap>>,
    pub styles: Vec<String>,
    pub inline_styles: Vec<String>,
    /// Selector -> HTML attributes spliced onto matching output elements.
    pub html_attributes: IndexMap<String, AttributeMap>,
    pub head_raw: Vec<String>,
    pub lang: String,
    pub dir: String,
    #[serde(skip)]
    pub options: RenderOptions,
}

impl GlobalData {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            title: String::new(),
            preview: String::new(),
            breakpoint: "480px".to_string(),
            fonts: options.font_table(),
            head_attributes: HashMap::new(),
            classes: HashMap::new(),
            classes_default: HashMap::new(),
            styles: Vec::new(),
            inline_styles: Vec::new(),
            html_attributes: IndexMap::new(),
            head_raw: Vec::new(),
            lang: options.lang.clone(),
            dir: options.dir.clone(),
            options,
        }
    }

    /// Merge attributes into `head_attributes[tag]`, last write wins per key.
    pub fn add_head_attributes(&mut self, tag: &str, attributes: &AttributeMap) {
        let entry = self.head_attributes.entry(tag.to_string()).or_default();
        for (name, value) in attributes {
            entry.insert(name.clone(), value.clone());
        }
    }

    pub fn add_class(&mut self, name: &str, attributes: AttributeMap) {
        let entry = self.classes.entry(name.to_string()).or_default();
        entry.extend(attributes);
    }

    pub fn add_class_default(&mut self, name: &str, tag: &str, attributes: AttributeMap) {
        let entry = self
            .classes_default
            .entry(name.to_string())
            .or_default()
            .entry(tag.to_string())
            .or_default();
        entry.extend(attributes);
    }

    pub fn add_html_attributes(&mut self, path: &str, attributes: AttributeMap) {
        let entry = self.html_attributes.entry(path.to_string()).or_default();
        entry.extend(attributes);
    }
}

impl Default for GlobalData {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

/// Read-only view handed to body components.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub global: &'a GlobalData,
    pub registry: &'a Registry,
    /// Width in pixels available to the component being rendered.
    pub container_width: f64,
}

impl<'a> RenderContext<'a> {
    pub fn new(global: &'a GlobalData, registry: &'a Registry, container_width: f64) -> Self {
        Self {
            global,
            registry,
            container_width,
        }
    }

    /// The same context narrowed to a child's width.
    pub fn with_width(&self, container_width: f64) -> Self {
        Self {
            container_width,
            ..*self
        }
    }

    pub fn options(&self) -> &'a RenderOptions {
        &self.global.options
    }
}

/// A head stylesheet generator, called with the breakpoint.
pub type HeadStyle = fn(&str) -> String;

/// Everything the body pass produces besides markup.
#[derive(Default)]
pub struct Collector {
    /// Column class -> media query body, in first-use order.
    pub media_queries: IndexMap<String, String>,
    /// Component tag -> head stylesheet generator, registered once per tag.
    pub head_styles: IndexMap<String, HeadStyle>,
    /// `mj-body` background, repeated on the document `<body>`.
    pub background_color: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_media_query(&mut self, class_name: &str, width: &str) {
        self.media_queries.insert(
            class_name.to_string(),
            format!("{{ width:{0} !important; max-width: {0}; }}", width),
        );
    }

    pub fn add_head_style(&mut self, tag: &str, style: HeadStyle) {
        self.head_styles.entry(tag.to_string()).or_insert(style);
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn report_kind(&mut self, kind: DiagnosticKind, tag: &str, message: impl Into<String>) {
        self.report(Diagnostic::new(kind, message).with_tag(tag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_attributes_merge_last_wins() {
        let mut global = GlobalData::default();
        let mut first = AttributeMap::new();
        first.insert("color".into(), "red".into());
        first.insert("padding".into(), "0".into());
        let mut second = AttributeMap::new();
        second.insert("color".into(), "blue".into());

        global.add_head_attributes("mj-text", &first);
        global.add_head_attributes("mj-text", &second);

        let text = &global.head_attributes["mj-text"];
        assert_eq!(text["color"], "blue");
        assert_eq!(text["padding"], "0");
    }

    #[test]
    fn defaults_come_from_options() {
        let global = GlobalData::default();
        assert_eq!(global.breakpoint, "480px");
        assert_eq!(global.lang, "und");
        assert!(global.fonts.contains_key("Roboto"));
    }

    #[test]
    fn media_query_format() {
        let mut collector = Collector::new();
        collector.add_media_query("mj-column-per-100", "100%");
        assert_eq!(
            collector.media_queries["mj-column-per-100"],
            "{ width:100% !important; max-width: 100%; }"
        );
    }
}
