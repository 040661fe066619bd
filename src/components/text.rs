use crate::components::{AttrValue, BodyComponent, Element};
use crate::conditional::wrap;
use crate::context::{Collector, RenderContext};
use crate::error::MjmlResult;
use crate::registry::{ComponentKind, ComponentSpec};
use crate::style::{opt, val, Styles};
use crate::validator::Align;

pub const SPEC: ComponentSpec = ComponentSpec {
    tag_name: "mj-text",
    kind: ComponentKind::Body(build),
    allowed_attributes: &[
        ("align", "enum(left,right,center,justify)"),
        ("background-color", "color"),
        ("color", "color"),
        ("container-background-color", "color"),
        ("font-family", "string"),
        ("font-size", "unit(px)"),
        ("font-style", "string"),
        ("font-weight", "string"),
        ("height", "unit(px,%)"),
        ("letter-spacing", "unitWithNegative(px,em)"),
        ("line-height", "unit(px,%,)"),
        ("padding-bottom", "unit(px,%)"),
        ("padding-left", "unit(px,%)"),
        ("padding-right", "unit(px,%)"),
        ("padding-top", "unit(px,%)"),
        ("padding", "unit(px,%){1,4}"),
        ("text-decoration", "string"),
        ("text-transform", "string"),
        ("vertical-align", "enum(top,bottom,middle)"),
    ],
    default_attributes: &[
        ("align", "left"),
        ("color", "#000000"),
        ("font-family", "Ubuntu, Helvetica, Arial, sans-serif"),
        ("font-size", "13px"),
        ("line-height", "1"),
        ("padding", "10px 25px"),
    ],
    ending_tag: true,
    raw_element: false,
};

/// A block of rich text; its content is emitted as written.
pub struct Text<'n> {
    element: Element<'n>,
    align: Align,
}

fn build<'n>(element: Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>> {
    let align = element.typed_attr("align", Align::Left);
    Ok(Box::new(Text { element, align }))
}

impl<'n> BodyComponent<'n> for Text<'n> {
    fn element(&self) -> &Element<'n> {
        &self.element
    }

    fn styles(&self, _ctx: &RenderContext) -> Styles {
        let a = |name: &str| opt(self.element.attr(name));
        Styles::new().slot(
            "text",
            vec![
                ("font-family", a("font-family")),
                ("font-size", a("font-size")),
                ("font-style", a("font-style")),
                ("font-weight", a("font-weight")),
                ("letter-spacing", a("letter-spacing")),
                ("line-height", a("line-height")),
                ("text-align", val(self.align.as_str())),
                ("text-decoration", a("text-decoration")),
                ("text-transform", a("text-transform")),
                ("color", a("color")),
                ("height", a("height")),
            ],
        )
    }

    fn render(&self, ctx: &RenderContext, _out: &mut Collector) -> MjmlResult<String> {
        let styles = self.styles(ctx);
        let div = format!(
            "<div{}>{}</div>",
            self.element
                .html_attributes(&[("style", AttrValue::Slot("text"))], &styles),
            self.element.content_html(ctx)
        );

        let Some(height) = self.element.attr("height") else {
            return Ok(div);
        };
        Ok(format!(
            "{}{}{}",
            wrap(
                &format!(
                    "<table role=\"presentation\" border=\"0\" cellpadding=\"0\" cellspacing=\"0\"><tr><td height=\"{0}\" style=\"vertical-align:top;height:{0};\">",
                    height
                ),
                false
            ),
            div,
            wrap("</td></tr></table>", false)
        ))
    }
}
