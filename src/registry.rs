//! Tag name -> component implementation.
//!
//! A registry is filled once, before any compile, and only read afterwards.
//! A preset is an ordered list of [`ComponentSpec`]s; registering a spec for
//! a tag that is already known replaces the earlier one.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::components::{self, BodyComponent, Element};
use crate::context::AttributeMap;
use crate::error::MjmlResult;
use crate::head::{self, HeadComponent};
use crate::node::Node;
use crate::validator::Schema;

pub type HeadFactory = for<'n> fn(&'n Node, AttributeMap) -> Box<dyn HeadComponent + 'n>;
pub type BodyFactory = for<'n> fn(Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>>;

/// What a tag does once it is instantiated.
#[derive(Clone, Copy)]
pub enum ComponentKind {
    /// Document scaffolding or data carried by a parent (`mjml`, `mj-class`, ...).
    Structural,
    Head(HeadFactory),
    Body(BodyFactory),
}

/// Static description of a component type.
#[derive(Clone, Copy)]
pub struct ComponentSpec {
    pub tag_name: &'static str,
    pub kind: ComponentKind,
    pub allowed_attributes: &'static [(&'static str, &'static str)],
    pub default_attributes: &'static [(&'static str, &'static str)],
    /// Inner content is captured verbatim instead of being parsed as tags.
    pub ending_tag: bool,
    /// Content is passed through and the element is not wrapped by its parent.
    pub raw_element: bool,
}

impl ComponentSpec {
    pub const fn structural(tag_name: &'static str) -> Self {
        Self {
            tag_name,
            kind: ComponentKind::Structural,
            allowed_attributes: &[],
            default_attributes: &[],
            ending_tag: false,
            raw_element: false,
        }
    }

    /// Content must be captured verbatim by the parser.
    pub fn captures_content(&self) -> bool {
        self.ending_tag || self.raw_element
    }

    pub fn is_head(&self) -> bool {
        matches!(self.kind, ComponentKind::Head(_))
    }

    pub fn is_body(&self) -> bool {
        matches!(self.kind, ComponentKind::Body(_))
    }
}

impl std::fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ComponentKind::Structural => "structural",
            ComponentKind::Head(_) => "head",
            ComponentKind::Body(_) => "body",
        };
        f.debug_struct("ComponentSpec")
            .field("tag_name", &self.tag_name)
            .field("kind", &kind)
            .field("ending_tag", &self.ending_tag)
            .field("raw_element", &self.raw_element)
            .finish()
    }
}

#[derive(Debug)]
struct Registered {
    spec: ComponentSpec,
    schema: Schema,
}

#[derive(Debug, Default)]
pub struct Registry {
    components: HashMap<String, Registered>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the core preset.
    pub fn with_core_preset() -> Self {
        let mut registry = Self::new();
        registry.register_many(core_preset());
        registry
    }

    /// The process-wide core registry, built on first use.
    pub fn core() -> &'static Registry {
        static CORE: OnceLock<Registry> = OnceLock::new();
        CORE.get_or_init(Registry::with_core_preset)
    }

    pub fn register(&mut self, spec: ComponentSpec) {
        let schema = Schema::build(spec.tag_name, spec.allowed_attributes, spec.default_attributes);
        self.components
            .insert(spec.tag_name.to_string(), Registered { spec, schema });
    }

    pub fn register_many(&mut self, specs: impl IntoIterator<Item = ComponentSpec>) {
        for spec in specs {
            self.register(spec);
        }
    }

    pub fn get(&self, tag_name: &str) -> Option<&ComponentSpec> {
        self.components.get(tag_name).map(|r| &r.spec)
    }

    pub fn schema(&self, tag_name: &str) -> Option<&Schema> {
        self.components.get(tag_name).map(|r| &r.schema)
    }

    pub fn has(&self, tag_name: &str) -> bool {
        self.components.contains_key(tag_name)
    }

    /// Registered tag names, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.components.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

/// The curated component list every compile starts from.
pub fn core_preset() -> Vec<ComponentSpec> {
    vec![
        ComponentSpec::structural("mjml"),
        ComponentSpec::structural("mj-head"),
        ComponentSpec::structural("mj-all"),
        ComponentSpec::structural("mj-class"),
        ComponentSpec::structural("mj-selector"),
        ComponentSpec {
            ending_tag: true,
            ..ComponentSpec::structural("mj-html-attribute")
        },
        head::TITLE,
        head::PREVIEW,
        head::BREAKPOINT,
        head::FONT,
        head::STYLE,
        head::ATTRIBUTES,
        head::HTML_ATTRIBUTES,
        components::body::SPEC,
        components::section::SPEC,
        components::column::SPEC,
        components::text::SPEC,
        components::image::SPEC,
        components::button::SPEC,
        components::raw::SPEC,
    ]
}
