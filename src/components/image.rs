use crate::components::{AttrValue, BodyComponent, Element};
use crate::context::{Collector, HeadStyle, RenderContext};
use crate::error::MjmlResult;
use crate::registry::{ComponentKind, ComponentSpec};
use crate::shorthand::{parse_int, px};
use crate::style::{opt, val, Styles};

pub const SPEC: ComponentSpec = ComponentSpec {
    tag_name: "mj-image",
    kind: ComponentKind::Body(build),
    allowed_attributes: &[
        ("alt", "string"),
        ("href", "string"),
        ("name", "string"),
        ("src", "string"),
        ("srcset", "string"),
        ("sizes", "string"),
        ("title", "string"),
        ("rel", "string"),
        ("align", "enum(left,center,right)"),
        ("border", "string"),
        ("border-bottom", "string"),
        ("border-left", "string"),
        ("border-right", "string"),
        ("border-top", "string"),
        ("border-radius", "unit(px,%){1,4}"),
        ("container-background-color", "color"),
        ("fluid-on-mobile", "boolean"),
        ("full-width", "enum(full-width,false,)"),
        ("padding", "unit(px,%){1,4}"),
        ("padding-bottom", "unit(px,%)"),
        ("padding-left", "unit(px,%)"),
        ("padding-right", "unit(px,%)"),
        ("padding-top", "unit(px,%)"),
        ("target", "string"),
        ("width", "unit(px)"),
        ("height", "unit(px,auto)"),
        ("max-height", "unit(px,%)"),
        ("font-size", "unit(px)"),
        ("usemap", "string"),
    ],
    default_attributes: &[
        ("alt", ""),
        ("align", "center"),
        ("border", "0"),
        ("height", "auto"),
        ("padding", "10px 25px"),
        ("target", "_blank"),
        ("font-size", "13px"),
    ],
    ending_tag: false,
    raw_element: false,
};

/// Lets `fluid-on-mobile` images span the full width below the breakpoint.
fn full_width_mobile_style(breakpoint: &str) -> String {
    let lower = parse_int(breakpoint).unwrap_or(480) - 1;
    format!(
        "@media only screen and (max-width:{}px) {{\n  table.mj-full-width-mobile {{ width: 100% !important; }}\n  td.mj-full-width-mobile {{ width: auto !important; }}\n}}",
        lower
    )
}

pub struct Image<'n> {
    element: Element<'n>,
}

fn build<'n>(element: Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>> {
    Ok(Box::new(Image { element }))
}

impl<'n> Image<'n> {
    fn attr(&self, name: &str) -> Option<String> {
        opt(self.element.attr(name))
    }

    fn is_full_width(&self) -> bool {
        self.element.attr("full-width") == Some("full-width")
    }

    fn is_fluid_on_mobile(&self) -> bool {
        self.element.attr("fluid-on-mobile") == Some("true")
    }

    /// `min(box, width)`; the image never overflows its column.
    fn content_width(&self, ctx: &RenderContext) -> f64 {
        let inner = self.element.box_widths(ctx.container_width).inner;
        match self.element.attr("width").and_then(parse_int) {
            Some(width) => inner.min(width as f64),
            None => inner,
        }
    }

    fn render_image(&self, ctx: &RenderContext, out: &mut Collector, styles: &Styles) -> String {
        let height = self.element.attr("height").map(|h| {
            if h == "auto" {
                h.to_string()
            } else {
                parse_int(h).unwrap_or(0).to_string()
            }
        });

        let img = self.element.html_attributes(
            &[
                (
                    "alt",
                    AttrValue::Text(self.element.attributes.get("alt").cloned().unwrap_or_default()),
                ),
                ("src", self.element.safe_url("src", ctx, out).into()),
                ("srcset", self.attr("srcset").into()),
                ("sizes", self.attr("sizes").into()),
                ("style", AttrValue::Slot("img")),
                ("title", self.attr("title").into()),
                ("width", self.content_width(ctx).into()),
                ("height", height.into()),
                ("usemap", self.attr("usemap").into()),
            ],
            styles,
        );
        let img = format!("<img{} />", img);

        let href = match self.element.safe_url("href", ctx, out) {
            Some(href) if !href.is_empty() => href,
            _ => return img,
        };
        let link = self.element.html_attributes(
            &[
                ("href", href.into()),
                ("target", self.attr("target").into()),
                ("rel", self.attr("rel").into()),
                ("name", self.attr("name").into()),
                ("title", self.attr("title").into()),
            ],
            styles,
        );
        format!("<a{}>{}</a>", link, img)
    }
}

impl<'n> BodyComponent<'n> for Image<'n> {
    fn element(&self) -> &Element<'n> {
        &self.element
    }

    fn styles(&self, ctx: &RenderContext) -> Styles {
        let width = px(self.content_width(ctx));
        let full_width = self.is_full_width();
        let when_full = |value: &str| if full_width { val(value) } else { None };

        Styles::new()
            .slot(
                "img",
                vec![
                    ("border", self.attr("border")),
                    ("border-left", self.attr("border-left")),
                    ("border-right", self.attr("border-right")),
                    ("border-top", self.attr("border-top")),
                    ("border-bottom", self.attr("border-bottom")),
                    ("border-radius", self.attr("border-radius")),
                    ("display", val("block")),
                    ("outline", val("none")),
                    ("text-decoration", val("none")),
                    ("height", self.attr("height")),
                    ("max-height", self.attr("max-height")),
                    ("min-width", when_full("100%")),
                    ("width", val("100%")),
                    ("max-width", when_full("100%")),
                    ("font-size", self.attr("font-size")),
                ],
            )
            .slot(
                "td",
                vec![("width", if full_width { None } else { val(width.clone()) })],
            )
            .slot(
                "table",
                vec![
                    ("min-width", when_full("100%")),
                    ("max-width", when_full("100%")),
                    ("width", if full_width { val(width) } else { None }),
                    ("border-collapse", val("collapse")),
                    ("border-spacing", val("0px")),
                ],
            )
    }

    fn render(&self, ctx: &RenderContext, out: &mut Collector) -> MjmlResult<String> {
        let widths = self.element.box_widths(ctx.container_width);
        if widths.overflow {
            self.element
                .report_overflow(widths.total - widths.paddings - widths.borders, out);
        }

        let styles = self.styles(ctx);
        let fluid_class: AttrValue = if self.is_fluid_on_mobile() {
            "mj-full-width-mobile".into()
        } else {
            AttrValue::None
        };

        let table = self.element.html_attributes(
            &[
                ("border", "0".into()),
                ("cellpadding", "0".into()),
                ("cellspacing", "0".into()),
                ("role", "presentation".into()),
                ("style", AttrValue::Slot("table")),
                ("class", fluid_class.clone()),
            ],
            &styles,
        );
        let td = self.element.html_attributes(
            &[("style", AttrValue::Slot("td")), ("class", fluid_class)],
            &styles,
        );

        Ok(format!(
            "<table{}><tbody><tr><td{}>{}</td></tr></tbody></table>",
            table,
            td,
            self.render_image(ctx, out, &styles)
        ))
    }

    fn head_style(&self) -> Option<HeadStyle> {
        Some(full_width_mobile_style)
    }
}
