//! Head components: they prepare [`GlobalData`] for the body pass and never
//! produce markup themselves.

use log::debug;

use crate::context::{AttributeMap, GlobalData};
use crate::node::Node;
use crate::registry::{ComponentKind, ComponentSpec};

/// A component of `mj-head`.
pub trait HeadComponent {
    /// Apply this element to the compile state. Called once, in document order.
    fn handle(&self, global: &mut GlobalData);
}

pub const TITLE: ComponentSpec = ComponentSpec {
    tag_name: "mj-title",
    kind: ComponentKind::Head(build_title),
    allowed_attributes: &[],
    default_attributes: &[],
    ending_tag: true,
    raw_element: false,
};

pub const PREVIEW: ComponentSpec = ComponentSpec {
    tag_name: "mj-preview",
    kind: ComponentKind::Head(build_preview),
    allowed_attributes: &[],
    default_attributes: &[],
    ending_tag: true,
    raw_element: false,
};

pub const BREAKPOINT: ComponentSpec = ComponentSpec {
    tag_name: "mj-breakpoint",
    kind: ComponentKind::Head(build_breakpoint),
    allowed_attributes: &[("width", "unit(px)")],
    default_attributes: &[],
    ending_tag: false,
    raw_element: false,
};

pub const FONT: ComponentSpec = ComponentSpec {
    tag_name: "mj-font",
    kind: ComponentKind::Head(build_font),
    allowed_attributes: &[("name", "string"), ("href", "string")],
    default_attributes: &[],
    ending_tag: false,
    raw_element: false,
};

pub const STYLE: ComponentSpec = ComponentSpec {
    tag_name: "mj-style",
    kind: ComponentKind::Head(build_style),
    allowed_attributes: &[("inline", "enum(inline)")],
    default_attributes: &[],
    ending_tag: true,
    raw_element: false,
};

pub const ATTRIBUTES: ComponentSpec = ComponentSpec {
    tag_name: "mj-attributes",
    kind: ComponentKind::Head(build_attributes),
    allowed_attributes: &[],
    default_attributes: &[],
    ending_tag: false,
    raw_element: false,
};

pub const HTML_ATTRIBUTES: ComponentSpec = ComponentSpec {
    tag_name: "mj-html-attributes",
    kind: ComponentKind::Head(build_html_attributes),
    allowed_attributes: &[],
    default_attributes: &[],
    ending_tag: false,
    raw_element: false,
};

// ─── mj-title / mj-preview ───────────────────────────────────────────────────

pub struct Title<'n> {
    node: &'n Node,
}

impl HeadComponent for Title<'_> {
    fn handle(&self, global: &mut GlobalData) {
        global.title = self.node.content.trim().to_string();
    }
}

fn build_title<'n>(node: &'n Node, _attributes: AttributeMap) -> Box<dyn HeadComponent + 'n> {
    Box::new(Title { node })
}

pub struct Preview<'n> {
    node: &'n Node,
}

impl HeadComponent for Preview<'_> {
    fn handle(&self, global: &mut GlobalData) {
        global.preview = self.node.content.trim().to_string();
    }
}

fn build_preview<'n>(node: &'n Node, _attributes: AttributeMap) -> Box<dyn HeadComponent + 'n> {
    Box::new(Preview { node })
}

// ─── mj-breakpoint ───────────────────────────────────────────────────────────

pub struct Breakpoint {
    width: Option<String>,
}

impl HeadComponent for Breakpoint {
    fn handle(&self, global: &mut GlobalData) {
        if let Some(width) = &self.width {
            global.breakpoint = width.clone();
        }
    }
}

fn build_breakpoint<'n>(_node: &'n Node, attributes: AttributeMap) -> Box<dyn HeadComponent + 'n> {
    Box::new(Breakpoint {
        width: attributes.get("width").filter(|w| !w.is_empty()).cloned(),
    })
}

// ─── mj-font ─────────────────────────────────────────────────────────────────

pub struct Font {
    name: Option<String>,
    href: Option<String>,
}

impl HeadComponent for Font {
    fn handle(&self, global: &mut GlobalData) {
        if let (Some(name), Some(href)) = (&self.name, &self.href) {
            global.fonts.insert(name.clone(), href.clone());
        }
    }
}

fn build_font<'n>(_node: &'n Node, attributes: AttributeMap) -> Box<dyn HeadComponent + 'n> {
    Box::new(Font {
        name: attributes.get("name").filter(|v| !v.is_empty()).cloned(),
        href: attributes.get("href").filter(|v| !v.is_empty()).cloned(),
    })
}

// ─── mj-style ────────────────────────────────────────────────────────────────

pub struct Style<'n> {
    node: &'n Node,
    inline: bool,
}

impl HeadComponent for Style<'_> {
    fn handle(&self, global: &mut GlobalData) {
        let css = self.node.content.trim();
        if css.is_empty() {
            return;
        }
        if self.inline {
            global.inline_styles.push(css.to_string());
        } else {
            global.styles.push(css.to_string());
        }
    }
}

fn build_style<'n>(node: &'n Node, attributes: AttributeMap) -> Box<dyn HeadComponent + 'n> {
    Box::new(Style {
        node,
        inline: attributes.get("inline").map(String::as_str) == Some("inline"),
    })
}

// ─── mj-attributes ───────────────────────────────────────────────────────────

pub struct Attributes<'n> {
    node: &'n Node,
}

impl HeadComponent for Attributes<'_> {
    fn handle(&self, global: &mut GlobalData) {
        for child in &self.node.children {
            if child.tag_name == "mj-class" {
                let Some(name) = child.attribute("name").filter(|n| !n.is_empty()) else {
                    debug!("mj-class without a name at line {}", child.line);
                    continue;
                };
                let mut attributes = child.attributes.clone();
                attributes.shift_remove("name");
                global.add_class(name, attributes);

                for per_tag in &child.children {
                    global.add_class_default(name, &per_tag.tag_name, per_tag.attributes.clone());
                }
            } else {
                global.add_head_attributes(&child.tag_name, &child.attributes);
            }
        }
    }
}

fn build_attributes<'n>(node: &'n Node, _attributes: AttributeMap) -> Box<dyn HeadComponent + 'n> {
    Box::new(Attributes { node })
}

// ─── mj-html-attributes ──────────────────────────────────────────────────────

pub struct HtmlAttributes<'n> {
    node: &'n Node,
}

impl HeadComponent for HtmlAttributes<'_> {
    fn handle(&self, global: &mut GlobalData) {
        for selector in self.node.children_named("mj-selector") {
            let path = selector.attribute("path").unwrap_or("").trim();
            if path.is_empty() {
                continue;
            }

            let custom: AttributeMap = selector
                .children_named("mj-html-attribute")
                .filter_map(|attr| {
                    attr.attribute("name")
                        .filter(|n| !n.is_empty())
                        .map(|name| (name.to_string(), attr.content.clone()))
                })
                .collect();

            if custom.is_empty() {
                continue;
            }
            global.add_html_attributes(path, custom);
        }
    }
}

fn build_html_attributes<'n>(node: &'n Node, _attributes: AttributeMap) -> Box<dyn HeadComponent + 'n> {
    Box::new(HtmlAttributes { node })
}
