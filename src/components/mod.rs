//! Body components and the element base they share.
//!
//! A body component is built from a parsed [`Node`] plus its resolved
//! attributes. It renders itself (and its children) to an HTML string with a
//! read-only [`RenderContext`] and reports side outputs into a [`Collector`].

pub mod body;
pub mod button;
pub mod column;
pub mod image;
pub mod raw;
pub mod section;
pub mod text;

use log::debug;
use std::borrow::Cow;
use std::str::FromStr;

use crate::context::{AttributeMap, Collector, HeadStyle, RenderContext};
use crate::error::{DiagnosticKind, MjmlResult};
use crate::html::escape_attribute;
use crate::node::Node;
use crate::registry::ComponentKind;
use crate::security::{Sanitizer, UrlValidator};
use crate::shorthand::{parse_border, parse_int, parse_shorthand, Direction};
use crate::style::{serialize_style, StyleMap, Styles};

/// Position of a component among its siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Props {
    pub index: usize,
    pub siblings: usize,
    /// Siblings that are raw elements (never wrapped, never sized).
    pub raw_siblings: usize,
}

impl Props {
    pub fn single() -> Self {
        Self {
            index: 0,
            siblings: 1,
            raw_siblings: 0,
        }
    }

    pub fn non_raw_siblings(&self) -> usize {
        self.siblings.saturating_sub(self.raw_siblings).max(1)
    }
}

/// Horizontal box of a component inside its container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxWidths {
    pub total: f64,
    pub paddings: f64,
    pub borders: f64,
    /// `total - paddings - borders`, never negative.
    pub inner: f64,
    /// Paddings and borders did not fit and `inner` was clamped.
    pub overflow: bool,
}

/// One value of an output HTML attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Omitted.
    None,
    /// `true` writes the bare name, `false` omits it.
    Flag(bool),
    Text(String),
    /// A named style slot of the component, serialized inline.
    Slot(&'static str),
    Style(StyleMap),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<Option<&str>> for AttrValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(AttrValue::None, AttrValue::from)
    }
}

impl From<Option<String>> for AttrValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(AttrValue::None, AttrValue::Text)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Flag(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<StyleMap> for AttrValue {
    fn from(value: StyleMap) -> Self {
        AttrValue::Style(value)
    }
}

/// The data every body component is built from.
#[derive(Debug, Clone)]
pub struct Element<'n> {
    pub node: &'n Node,
    pub attributes: AttributeMap,
    pub props: Props,
    /// Output is passed through and never wrapped by the parent.
    pub raw: bool,
}

impl<'n> Element<'n> {
    pub fn new(node: &'n Node, attributes: AttributeMap, props: Props, raw: bool) -> Self {
        Self {
            node,
            attributes,
            props,
            raw,
        }
    }

    pub fn tag(&self) -> &'n str {
        &self.node.tag_name
    }

    /// A resolved attribute; empty values count as absent.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn content(&self) -> &'n str {
        &self.node.content
    }

    /// Inner HTML, passed through the sanitizer when the options ask for it.
    pub fn content_html(&self, ctx: &RenderContext) -> Cow<'n, str> {
        match ctx.options().sanitize {
            Some(profile) => Cow::Owned(Sanitizer::new(profile).sanitize(self.content())),
            None => Cow::Borrowed(self.content()),
        }
    }

    /// An enum-valued attribute parsed into its Rust type.
    ///
    /// Values that got past a soft validation level fall back to `fallback`.
    pub fn typed_attr<T: FromStr<Err = String>>(&self, name: &str, fallback: T) -> T {
        match self.attr(name) {
            None => fallback,
            Some(value) => value.parse().unwrap_or_else(|expected| {
                debug!(
                    "<{}> {}='{}' is not one of {}, using the default",
                    self.tag(),
                    name,
                    value,
                    expected
                );
                fallback
            }),
        }
    }

    pub fn children(&self) -> &'n [Node] {
        &self.node.children
    }

    /// One edge of a shorthand attribute; `padding-left` beats `padding`.
    pub fn shorthand_attr_value(&self, attribute: &str, direction: Direction) -> i64 {
        let specific = format!("{}-{}", attribute, direction.as_str());
        if let Some(value) = self.attr(&specific) {
            return parse_int(value).unwrap_or(0);
        }
        self.attr(attribute)
            .map(|v| parse_shorthand(v, direction))
            .unwrap_or(0)
    }

    /// Border width of one edge; `border-left` beats `border`.
    pub fn shorthand_border_value(&self, direction: Direction) -> i64 {
        let specific = format!("border-{}", direction.as_str());
        let value = self.attr(&specific).or_else(|| self.attr("border"));
        value.map(parse_border).unwrap_or(0)
    }

    pub fn box_widths(&self, total: f64) -> BoxWidths {
        let total = total.trunc();
        let paddings = (self.shorthand_attr_value("padding", Direction::Right)
            + self.shorthand_attr_value("padding", Direction::Left)) as f64;
        let borders = (self.shorthand_border_value(Direction::Right)
            + self.shorthand_border_value(Direction::Left)) as f64;
        let inner = total - paddings - borders;
        BoxWidths {
            total,
            paddings,
            borders,
            inner: inner.max(0.0),
            overflow: inner < 0.0,
        }
    }

    /// Report a clamped width for this element.
    pub fn report_overflow(&self, wanted: f64, out: &mut Collector) {
        out.report_kind(
            DiagnosticKind::NegativeWidth,
            self.tag(),
            format!(
                "paddings and borders exceed the available width ({}px), clamped to 0 (line {})",
                wanted, self.node.line
            ),
        );
    }

    /// A URL attribute that passes the allowed schemes. Rejected values are
    /// skipped without a report.
    pub fn allowed_url(&self, name: &str, ctx: &RenderContext) -> Option<String> {
        let url = self.attr(name)?;
        let cleaned = UrlValidator::with_schemes(&ctx.options().allowed_url_schemes).sanitize(url);
        (!cleaned.is_empty()).then_some(cleaned)
    }

    /// A URL attribute checked against the allowed schemes; rejected values
    /// are reported and emptied.
    pub fn safe_url(&self, name: &str, ctx: &RenderContext, out: &mut Collector) -> Option<String> {
        let url = self.attr(name)?;
        let validator = UrlValidator::with_schemes(&ctx.options().allowed_url_schemes);
        let cleaned = validator.sanitize(url);
        if cleaned.is_empty() {
            out.report_kind(
                DiagnosticKind::UnsafeUrl,
                self.tag(),
                format!("'{}' in '{}' is not an allowed URL", url, name),
            );
        }
        Some(cleaned)
    }

    /// Render ` name="value"` pairs in the given order.
    pub fn html_attributes(&self, attributes: &[(&str, AttrValue)], styles: &Styles) -> String {
        let mut output = String::new();
        for (name, value) in attributes {
            let text = match value {
                AttrValue::None | AttrValue::Flag(false) => continue,
                AttrValue::Flag(true) => {
                    output.push(' ');
                    output.push_str(name);
                    continue;
                }
                AttrValue::Text(text) => text.clone(),
                AttrValue::Slot(slot) => match styles.get(slot) {
                    Some(style) => serialize_style(style),
                    None => continue,
                },
                AttrValue::Style(style) => serialize_style(style),
            };
            if text.is_empty() && matches!(value, AttrValue::Slot(_) | AttrValue::Style(_)) {
                continue;
            }
            output.push_str(&format!(" {}=\"{}\"", name, escape_attribute(&text)));
        }
        output
    }
}

/// A renderable body element.
pub trait BodyComponent<'n> {
    fn element(&self) -> &Element<'n>;

    /// Named inline style slots, computed for the current container width.
    fn styles(&self, _ctx: &RenderContext) -> Styles {
        Styles::new()
    }

    fn render(&self, ctx: &RenderContext, out: &mut Collector) -> MjmlResult<String>;

    /// Width handed to children as their container width.
    fn child_container_width(&self, ctx: &RenderContext) -> f64 {
        ctx.container_width
    }

    /// Stylesheet emitted once in the document head for this component type.
    fn head_style(&self) -> Option<HeadStyle> {
        None
    }
}

/// Build the component for `node`, resolving its attributes.
///
/// Returns `None` (with a diagnostic) for tags that cannot render in a body.
pub fn instantiate<'n>(
    node: &'n Node,
    props: Props,
    ctx: &RenderContext,
    out: &mut Collector,
) -> MjmlResult<Option<Box<dyn BodyComponent<'n> + 'n>>> {
    let (spec, schema) = match (ctx.registry.get(&node.tag_name), ctx.registry.schema(&node.tag_name)) {
        (Some(spec), Some(schema)) => (spec, schema),
        _ => {
            out.report_kind(
                DiagnosticKind::MisplacedElement,
                &node.tag_name,
                format!("unknown element at line {}", node.line),
            );
            return Ok(None);
        }
    };

    let ComponentKind::Body(factory) = spec.kind else {
        out.report_kind(
            DiagnosticKind::MisplacedElement,
            &node.tag_name,
            format!("cannot be used inside the body (line {})", node.line),
        );
        return Ok(None);
    };

    let mut diagnostics = Vec::new();
    let attributes = schema.resolve(
        node,
        Some(ctx.global),
        ctx.options().validation_level,
        &mut diagnostics,
    )?;
    for diagnostic in diagnostics {
        out.report(diagnostic);
    }

    let component = factory(Element::new(node, attributes, props, spec.raw_element))?;
    if let Some(style) = component.head_style() {
        out.add_head_style(spec.tag_name, style);
    }
    Ok(Some(component))
}

/// Build the components for every child of `parent`, with sibling counts.
pub fn build_children<'n>(
    parent: &'n Node,
    ctx: &RenderContext,
    out: &mut Collector,
) -> MjmlResult<Vec<Box<dyn BodyComponent<'n> + 'n>>> {
    let siblings = parent.children.len();
    let raw_siblings = parent
        .children
        .iter()
        .filter(|c| ctx.registry.get(&c.tag_name).is_some_and(|s| s.raw_element))
        .count();

    let mut components = Vec::with_capacity(siblings);
    for (index, child) in parent.children.iter().enumerate() {
        let props = Props {
            index,
            siblings,
            raw_siblings,
        };
        if let Some(component) = instantiate(child, props, ctx, out)? {
            components.push(component);
        }
    }
    Ok(components)
}

/// Append a suffix to every class of a space-separated list: `a b` -> `a-outlook b-outlook`.
pub fn suffix_css_classes(classes: Option<&str>, suffix: &str) -> Option<String> {
    let classes = classes?;
    let suffixed: Vec<String> = classes
        .split_whitespace()
        .map(|c| format!("{}-{}", c, suffix))
        .collect();
    if suffixed.is_empty() {
        None
    } else {
        Some(suffixed.join(" "))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::context::GlobalData;
    use crate::registry::Registry;

    /// Render `node` as a body component inside a container of `width` px.
    pub fn render_with(node: &Node, global: &GlobalData, width: f64) -> (String, Collector) {
        let ctx = RenderContext::new(global, Registry::core(), width);
        let mut out = Collector::new();
        let component = instantiate(node, Props::single(), &ctx, &mut out)
            .unwrap()
            .expect("body component");
        let html = component.render(&ctx, &mut out).unwrap();
        (html, out)
    }

    pub fn render(node: &Node, width: f64) -> (String, Collector) {
        render_with(node, &GlobalData::default(), width)
    }
}
