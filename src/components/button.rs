use crate::components::{AttrValue, BodyComponent, Element};
use crate::context::{Collector, RenderContext};
use crate::error::MjmlResult;
use crate::registry::{ComponentKind, ComponentSpec};
use crate::shorthand::{parse_width, px, Direction};
use crate::style::{opt, val, Styles};
use crate::validator::VerticalAlign;

pub const SPEC: ComponentSpec = ComponentSpec {
    tag_name: "mj-button",
    kind: ComponentKind::Body(build),
    allowed_attributes: &[
        ("align", "enum(left,center,right)"),
        ("background-color", "color"),
        ("border-bottom", "string"),
        ("border-left", "string"),
        ("border-radius", "string"),
        ("border-right", "string"),
        ("border-top", "string"),
        ("border", "string"),
        ("color", "color"),
        ("container-background-color", "color"),
        ("font-family", "string"),
        ("font-size", "unit(px)"),
        ("font-style", "string"),
        ("font-weight", "string"),
        ("height", "unit(px,%)"),
        ("href", "string"),
        ("name", "string"),
        ("title", "string"),
        ("inner-padding", "unit(px,%){1,4}"),
        ("letter-spacing", "unitWithNegative(px,em)"),
        ("line-height", "unit(px,%,)"),
        ("padding-bottom", "unit(px,%)"),
        ("padding-left", "unit(px,%)"),
        ("padding-right", "unit(px,%)"),
        ("padding-top", "unit(px,%)"),
        ("padding", "unit(px,%){1,4}"),
        ("rel", "string"),
        ("target", "string"),
        ("text-decoration", "string"),
        ("text-transform", "string"),
        ("vertical-align", "enum(top,bottom,middle)"),
        ("text-align", "enum(left,right,center)"),
        ("width", "unit(px,%)"),
    ],
    default_attributes: &[
        ("align", "center"),
        ("background-color", "#414141"),
        ("border", "none"),
        ("border-radius", "3px"),
        ("color", "#ffffff"),
        ("font-family", "Ubuntu, Helvetica, Arial, sans-serif"),
        ("font-size", "13px"),
        ("font-weight", "normal"),
        ("inner-padding", "10px 25px"),
        ("line-height", "120%"),
        ("padding", "10px 25px"),
        ("target", "_blank"),
        ("text-decoration", "none"),
        ("text-transform", "none"),
        ("vertical-align", "middle"),
    ],
    ending_tag: true,
    raw_element: false,
};

/// A call-to-action link drawn as a padded, rounded box.
pub struct Button<'n> {
    element: Element<'n>,
    vertical_align: VerticalAlign,
}

fn build<'n>(element: Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>> {
    let vertical_align = element.typed_attr("vertical-align", VerticalAlign::Middle);
    Ok(Box::new(Button {
        element,
        vertical_align,
    }))
}

impl<'n> Button<'n> {
    fn attr(&self, name: &str) -> Option<String> {
        opt(self.element.attr(name))
    }

    /// Width of the link itself: a pixel `width` minus inner paddings and borders.
    fn link_width(&self, ctx: &RenderContext) -> Option<String> {
        let width = parse_width(self.element.attr("width")?, true);
        if width.unit != "px" {
            return None;
        }
        let borders = self.element.box_widths(ctx.container_width).borders;
        let inner_paddings = (self.element.shorthand_attr_value("inner-padding", Direction::Left)
            + self.element.shorthand_attr_value("inner-padding", Direction::Right))
            as f64;
        Some(px(width.value - inner_paddings - borders))
    }
}

impl<'n> BodyComponent<'n> for Button<'n> {
    fn element(&self) -> &Element<'n> {
        &self.element
    }

    fn styles(&self, ctx: &RenderContext) -> Styles {
        Styles::new()
            .slot(
                "table",
                vec![
                    ("border-collapse", val("separate")),
                    ("width", self.attr("width")),
                    ("line-height", val("100%")),
                ],
            )
            .slot(
                "td",
                vec![
                    ("border", self.attr("border")),
                    ("border-bottom", self.attr("border-bottom")),
                    ("border-left", self.attr("border-left")),
                    ("border-radius", self.attr("border-radius")),
                    ("border-right", self.attr("border-right")),
                    ("border-top", self.attr("border-top")),
                    ("cursor", val("auto")),
                    ("font-style", self.attr("font-style")),
                    ("height", self.attr("height")),
                    ("mso-padding-alt", self.attr("inner-padding")),
                    ("text-align", self.attr("text-align")),
                    ("background", self.attr("background-color")),
                ],
            )
            .slot(
                "content",
                vec![
                    ("display", val("inline-block")),
                    ("width", self.link_width(ctx)),
                    ("background", self.attr("background-color")),
                    ("color", self.attr("color")),
                    ("font-family", self.attr("font-family")),
                    ("font-size", self.attr("font-size")),
                    ("font-style", self.attr("font-style")),
                    ("font-weight", self.attr("font-weight")),
                    ("line-height", self.attr("line-height")),
                    ("letter-spacing", self.attr("letter-spacing")),
                    ("margin", val("0")),
                    ("text-decoration", self.attr("text-decoration")),
                    ("text-transform", self.attr("text-transform")),
                    ("padding", self.attr("inner-padding")),
                    ("mso-padding-alt", val("0px")),
                    ("border-radius", self.attr("border-radius")),
                ],
            )
    }

    fn render(&self, ctx: &RenderContext, out: &mut Collector) -> MjmlResult<String> {
        let styles = self.styles(ctx);
        let href = self
            .element
            .safe_url("href", ctx, out)
            .filter(|h| !h.is_empty());
        let tag = if href.is_some() { "a" } else { "p" };

        let table = self.element.html_attributes(
            &[
                ("border", "0".into()),
                ("cellpadding", "0".into()),
                ("cellspacing", "0".into()),
                ("role", "presentation".into()),
                ("style", AttrValue::Slot("table")),
            ],
            &styles,
        );
        let bgcolor = self.element.attr("background-color").filter(|c| *c != "none");
        let td = self.element.html_attributes(
            &[
                ("align", "center".into()),
                ("bgcolor", bgcolor.into()),
                ("role", "presentation".into()),
                ("style", AttrValue::Slot("td")),
                ("valign", self.vertical_align.as_str().into()),
            ],
            &styles,
        );
        let target = if href.is_some() { self.attr("target") } else { None };
        let link = self.element.html_attributes(
            &[
                ("href", href.into()),
                ("name", self.attr("name").into()),
                ("rel", self.attr("rel").into()),
                ("title", self.attr("title").into()),
                ("style", AttrValue::Slot("content")),
                ("target", target.into()),
            ],
            &styles,
        );

        Ok(format!(
            "<table{}><tbody><tr><td{}><{tag}{}>{}</{tag}></td></tr></tbody></table>",
            table,
            td,
            link,
            self.element.content_html(ctx),
            tag = tag
        ))
    }
}
