//! `mj-section`: a horizontal row of columns.
//!
//! Desktop Outlook gets a fixed-width table with one cell per column; every
//! other client gets a centred `<div>` with a `max-width` the columns flow in.

use crate::components::{build_children, suffix_css_classes, AttrValue, BodyComponent, Element};
use crate::conditional::wrap;
use crate::context::{Collector, RenderContext};
use crate::error::MjmlResult;
use crate::registry::{ComponentKind, ComponentSpec};
use crate::shorthand::px;
use crate::style::{opt, val, StyleMap, Styles};
use crate::validator::TextDirection;

pub const SPEC: ComponentSpec = ComponentSpec {
    tag_name: "mj-section",
    kind: ComponentKind::Body(build),
    allowed_attributes: &[
        ("background-color", "color"),
        ("background-url", "string"),
        ("background-repeat", "enum(repeat,no-repeat)"),
        ("background-size", "string"),
        ("background-position", "string"),
        ("border", "string"),
        ("border-bottom", "string"),
        ("border-left", "string"),
        ("border-radius", "string"),
        ("border-right", "string"),
        ("border-top", "string"),
        ("direction", "enum(ltr,rtl)"),
        ("full-width", "enum(full-width,false,)"),
        ("padding", "unit(px,%){1,4}"),
        ("padding-top", "unit(px,%)"),
        ("padding-bottom", "unit(px,%)"),
        ("padding-left", "unit(px,%)"),
        ("padding-right", "unit(px,%)"),
        ("text-align", "enum(left,center,right)"),
    ],
    default_attributes: &[
        ("background-repeat", "repeat"),
        ("background-size", "auto"),
        ("background-position", "top center"),
        ("direction", "ltr"),
        ("padding", "20px 0"),
        ("text-align", "center"),
    ],
    ending_tag: false,
    raw_element: false,
};

pub struct Section<'n> {
    element: Element<'n>,
    direction: TextDirection,
}

fn build<'n>(element: Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>> {
    let direction = element.typed_attr("direction", TextDirection::Ltr);
    Ok(Box::new(Section { element, direction }))
}

impl<'n> Section<'n> {
    fn attr(&self, name: &str) -> Option<String> {
        opt(self.element.attr(name))
    }

    fn is_full_width(&self) -> bool {
        self.element.attr("full-width") == Some("full-width")
    }

    /// `background-position` as `x y`, accepting either keyword order.
    fn background_position(&self) -> String {
        let position = self.element.attr("background-position").unwrap_or("top center");
        let tokens: Vec<&str> = position.split_whitespace().collect();
        let is_vertical = |t: &str| matches!(t, "top" | "bottom");
        let is_horizontal = |t: &str| matches!(t, "left" | "right");
        match tokens.as_slice() {
            [one] if is_vertical(*one) => format!("center {}", one),
            [one] => format!("{} center", one),
            [a, b] if is_vertical(*a) || is_horizontal(*b) => format!("{} {}", b, a),
            [a, b] => format!("{} {}", a, b),
            _ => position.to_string(),
        }
    }

    fn background(&self, ctx: &RenderContext) -> StyleMap {
        let color = self.element.attr("background-color");
        match self.element.allowed_url("background-url", ctx) {
            Some(url) => {
                let size = self.element.attr("background-size").unwrap_or("auto");
                let repeat = self.element.attr("background-repeat").unwrap_or("repeat");
                let shorthand: Vec<String> = color
                    .map(str::to_string)
                    .into_iter()
                    .chain([
                        format!("url('{}')", url),
                        self.background_position(),
                        format!("/ {}", size),
                        repeat.to_string(),
                    ])
                    .collect();
                vec![
                    ("background", val(shorthand.join(" "))),
                    ("background-position", val(self.background_position())),
                    ("background-repeat", val(repeat)),
                    ("background-size", val(size)),
                ]
            }
            None => vec![("background", opt(color)), ("background-color", opt(color))],
        }
    }

    fn render_before(&self, ctx: &RenderContext, styles: &Styles) -> String {
        let width = ctx.container_width;
        let table = self.element.html_attributes(
            &[
                ("align", "center".into()),
                ("border", "0".into()),
                ("cellpadding", "0".into()),
                ("cellspacing", "0".into()),
                (
                    "class",
                    suffix_css_classes(self.element.attr("css-class"), "outlook").into(),
                ),
                ("role", "presentation".into()),
                ("style", AttrValue::Style(vec![("width", val(px(width)))])),
                ("width", (width.trunc() as i64).into()),
                ("bgcolor", self.attr("background-color").into()),
            ],
            styles,
        );
        wrap(
            &format!(
                "<table{}><tr><td style=\"line-height:0px;font-size:0px;mso-line-height-rule:exactly;\">",
                table
            ),
            false,
        )
    }

    fn render_wrapped_children(&self, ctx: &RenderContext, out: &mut Collector) -> MjmlResult<String> {
        let child_ctx = ctx.with_width(self.child_container_width(ctx));
        let mut html = wrap("<tr>", false);

        for child in build_children(self.element.node, &child_ctx, out)? {
            let rendered = child.render(&child_ctx, out)?;
            let el = child.element();
            if el.raw {
                html.push_str(&rendered);
                continue;
            }
            let td = el.html_attributes(
                &[
                    ("align", el.attr("align").into()),
                    ("class", suffix_css_classes(el.attr("css-class"), "outlook").into()),
                    ("style", AttrValue::Slot("tdOutlook")),
                ],
                &child.styles(&child_ctx),
            );
            html.push_str(&wrap(&format!("<td{}>", td), false));
            html.push_str(&rendered);
            html.push_str(&wrap("</td>", false));
        }

        html.push_str(&wrap("</tr>", false));
        Ok(html)
    }

    fn render_section(&self, ctx: &RenderContext, out: &mut Collector, styles: &Styles) -> MjmlResult<String> {
        let full_width = self.is_full_width();
        let background_url = self.element.allowed_url("background-url", ctx);
        let has_background = background_url.is_some();

        let div = self.element.html_attributes(
            &[
                (
                    "class",
                    if full_width { AttrValue::None } else { self.element.attr("css-class").into() },
                ),
                ("style", AttrValue::Slot("div")),
            ],
            styles,
        );
        let table = self.element.html_attributes(
            &[
                ("align", "center".into()),
                (
                    "background",
                    if full_width { AttrValue::None } else { background_url.into() },
                ),
                ("border", "0".into()),
                ("cellpadding", "0".into()),
                ("cellspacing", "0".into()),
                ("role", "presentation".into()),
                ("style", AttrValue::Slot("table")),
            ],
            styles,
        );
        let td = self
            .element
            .html_attributes(&[("style", AttrValue::Slot("td"))], styles);

        let mut html = format!("<div{}>", div);
        if has_background {
            let inner = self
                .element
                .html_attributes(&[("style", AttrValue::Slot("innerDiv"))], styles);
            html.push_str(&format!("<div{}>", inner));
        }
        html.push_str(&format!("<table{}><tbody><tr><td{}>", table, td));
        html.push_str(&wrap(
            "<table role=\"presentation\" border=\"0\" cellpadding=\"0\" cellspacing=\"0\">",
            false,
        ));
        html.push_str(&self.render_wrapped_children(ctx, out)?);
        html.push_str(&wrap("</table>", false));
        html.push_str("</td></tr></tbody></table>");
        if has_background {
            html.push_str("</div>");
        }
        html.push_str("</div>");
        Ok(html)
    }

    fn render_after(&self) -> String {
        wrap("</td></tr></table>", false)
    }

    fn render_full_width(&self, ctx: &RenderContext, content: String, styles: &Styles) -> String {
        let table = self.element.html_attributes(
            &[
                ("align", "center".into()),
                ("class", self.element.attr("css-class").into()),
                ("background", self.element.allowed_url("background-url", ctx).into()),
                ("border", "0".into()),
                ("cellpadding", "0".into()),
                ("cellspacing", "0".into()),
                ("role", "presentation".into()),
                ("style", AttrValue::Slot("tableFullwidth")),
            ],
            styles,
        );
        format!("<table{}><tbody><tr><td>{}</td></tr></tbody></table>", table, content)
    }
}

impl<'n> BodyComponent<'n> for Section<'n> {
    fn element(&self) -> &Element<'n> {
        &self.element
    }

    fn styles(&self, ctx: &RenderContext) -> Styles {
        let full_width = self.is_full_width();
        let background = self.background(ctx);
        let radius = self.attr("border-radius");

        let mut table_full_width = if full_width { background.clone() } else { Vec::new() };
        table_full_width.push(("width", val("100%")));
        table_full_width.push(("border-radius", radius.clone()));

        let mut table = if full_width { Vec::new() } else { background.clone() };
        table.push(("width", val("100%")));
        table.push(("border-radius", radius.clone()));

        let mut div = if full_width { Vec::new() } else { background };
        div.push(("margin", val("0px auto")));
        div.push(("border-radius", radius));
        div.push(("max-width", val(px(ctx.container_width))));

        Styles::new()
            .slot("tableFullwidth", table_full_width)
            .slot("table", table)
            .slot(
                "td",
                vec![
                    ("border", self.attr("border")),
                    ("border-bottom", self.attr("border-bottom")),
                    ("border-left", self.attr("border-left")),
                    ("border-right", self.attr("border-right")),
                    ("border-top", self.attr("border-top")),
                    ("direction", val(self.direction.as_str())),
                    ("font-size", val("0px")),
                    ("padding", self.attr("padding")),
                    ("padding-bottom", self.attr("padding-bottom")),
                    ("padding-left", self.attr("padding-left")),
                    ("padding-right", self.attr("padding-right")),
                    ("padding-top", self.attr("padding-top")),
                    ("text-align", self.attr("text-align")),
                ],
            )
            .slot("div", div)
            .slot(
                "innerDiv",
                vec![("line-height", val("0")), ("font-size", val("0"))],
            )
    }

    fn child_container_width(&self, ctx: &RenderContext) -> f64 {
        self.element.box_widths(ctx.container_width).inner
    }

    fn render(&self, ctx: &RenderContext, out: &mut Collector) -> MjmlResult<String> {
        let widths = self.element.box_widths(ctx.container_width);
        if widths.overflow {
            self.element
                .report_overflow(widths.total - widths.paddings - widths.borders, out);
        }

        // Reported once here; the style and markup helpers skip a rejected URL.
        self.element.safe_url("background-url", ctx, out);

        let styles = self.styles(ctx);
        let content = format!(
            "{}{}{}",
            self.render_before(ctx, &styles),
            self.render_section(ctx, out, &styles)?,
            self.render_after()
        );

        if self.is_full_width() {
            Ok(self.render_full_width(ctx, content, &styles))
        } else {
            Ok(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::components::test_support::render;
    use crate::error::DiagnosticKind;
    use crate::node::Node;

    #[test]
    fn section_wraps_columns_for_outlook() {
        let node = Node::new("mj-section")
            .with_attribute("css-class", "hero")
            .with_child(Node::new("mj-column"));
        let (html, out) = render(&node, 600.0);

        assert!(html.starts_with("<!--[if mso | IE]><table align=\"center\""));
        assert!(html.contains("class=\"hero-outlook\""));
        assert!(html.contains("style=\"width:600px;\" width=\"600\""));
        assert!(html.contains("<div class=\"hero\" style=\"margin:0px auto;max-width:600px;\">"));
        assert!(html.contains("<!--[if mso | IE]><td style=\"vertical-align:top;width:600px;\"><![endif]-->"));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn section_td_carries_padding_and_alignment() {
        let node = Node::new("mj-section").with_attribute("padding", "10px 30px");
        let (html, _) = render(&node, 600.0);
        assert!(html.contains("direction:ltr;font-size:0px;padding:10px 30px;text-align:center;"));
    }

    #[test]
    fn children_get_the_section_box() {
        let node = Node::new("mj-section")
            .with_attribute("padding", "0 50px")
            .with_attribute("border", "5px solid red")
            .with_child(Node::new("mj-column"));
        let (html, _) = render(&node, 600.0);
        // 600 - 100 padding - 10 border
        assert!(html.contains("width:490px;"));
    }

    #[test]
    fn full_width_moves_background_to_outer_table() {
        let node = Node::new("mj-section")
            .with_attribute("full-width", "full-width")
            .with_attribute("background-color", "#ff0000");
        let (html, _) = render(&node, 600.0);
        assert!(html.starts_with(
            "<table align=\"center\" border=\"0\" cellpadding=\"0\" cellspacing=\"0\" role=\"presentation\" style=\"background:#ff0000;background-color:#ff0000;width:100%;\">"
        ));
        assert!(html.contains("<div style=\"margin:0px auto;max-width:600px;\">"));
    }

    #[test]
    fn background_url_builds_shorthand() {
        let node = Node::new("mj-section")
            .with_attribute("background-url", "https://x.test/bg.png")
            .with_attribute("background-color", "#000");
        let (html, _) = render(&node, 600.0);
        assert!(html.contains("background:#000 url('https://x.test/bg.png') center top / auto repeat;"));
        assert!(html.contains("<div style=\"line-height:0;font-size:0;\">"));
    }

    #[test]
    fn unsafe_background_url_is_dropped() {
        let node = Node::new("mj-section")
            .with_attribute("background-url", "javascript:alert(1)")
            .with_attribute("background-color", "#000");
        let (html, out) = render(&node, 600.0);
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("background=\""));
        assert!(!html.contains("line-height:0;font-size:0;"));
        assert!(html.contains("background:#000;background-color:#000;"));
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnsafeUrl);
        assert_eq!(out.diagnostics[0].tag.as_deref(), Some("mj-section"));
    }

    #[test]
    fn oversized_padding_is_clamped_and_reported() {
        let node = Node::new("mj-section")
            .with_attribute("padding", "0 400px")
            .with_child(Node::new("mj-column"));
        let (html, out) = render(&node, 600.0);
        assert!(html.contains("width:0px;"));
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::NegativeWidth));
    }
}
