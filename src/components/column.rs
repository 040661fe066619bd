//! `mj-column`: a vertical stack inside a section, sized as a share of it.

use crate::components::{build_children, AttrValue, BodyComponent, Element};
use crate::context::{Collector, RenderContext};
use crate::error::MjmlResult;
use crate::registry::{ComponentKind, ComponentSpec};
use crate::shorthand::{parse_border, parse_width, px, Direction, Width};
use crate::style::{opt, val, StyleMap, Styles};
use crate::validator::{TextDirection, VerticalAlign};

pub const SPEC: ComponentSpec = ComponentSpec {
    tag_name: "mj-column",
    kind: ComponentKind::Body(build),
    allowed_attributes: &[
        ("background-color", "color"),
        ("border", "string"),
        ("border-bottom", "string"),
        ("border-left", "string"),
        ("border-radius", "unit(px,%){1,4}"),
        ("border-right", "string"),
        ("border-top", "string"),
        ("direction", "enum(ltr,rtl)"),
        ("inner-background-color", "color"),
        ("inner-border", "string"),
        ("inner-border-bottom", "string"),
        ("inner-border-left", "string"),
        ("inner-border-radius", "unit(px,%){1,4}"),
        ("inner-border-right", "string"),
        ("inner-border-top", "string"),
        ("padding", "unit(px,%){1,4}"),
        ("padding-bottom", "unit(px,%)"),
        ("padding-left", "unit(px,%)"),
        ("padding-right", "unit(px,%)"),
        ("padding-top", "unit(px,%)"),
        ("vertical-align", "enum(top,bottom,middle)"),
        ("width", "unit(px,%)"),
    ],
    default_attributes: &[("direction", "ltr"), ("vertical-align", "top")],
    ending_tag: false,
    raw_element: false,
};

const PADDING_ATTRIBUTES: &[&str] = &[
    "padding",
    "padding-bottom",
    "padding-left",
    "padding-right",
    "padding-top",
];

pub struct Column<'n> {
    element: Element<'n>,
    direction: TextDirection,
    vertical_align: VerticalAlign,
}

fn build<'n>(element: Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>> {
    let direction = element.typed_attr("direction", TextDirection::Ltr);
    let vertical_align = element.typed_attr("vertical-align", VerticalAlign::Top);
    Ok(Box::new(Column {
        element,
        direction,
        vertical_align,
    }))
}

impl<'n> Column<'n> {
    fn attr(&self, name: &str) -> Option<String> {
        opt(self.element.attr(name))
    }

    /// Declared width, or an equal share of the section.
    fn parsed_width(&self) -> Width {
        match self.element.attr("width") {
            Some(width) => parse_width(width, false),
            None => Width {
                value: 100.0 / self.element.props.non_raw_siblings() as f64,
                unit: "%".to_string(),
            },
        }
    }

    fn width_as_pixel(&self, ctx: &RenderContext) -> String {
        let width = self.parsed_width();
        if width.is_percent() {
            px(ctx.container_width * width.value / 100.0)
        } else {
            px(width.value)
        }
    }

    fn column_class(&self) -> (String, Width) {
        let width = self.parsed_width();
        let number = width.value.to_string().replacen('.', "-", 1);
        let class = if width.is_percent() {
            format!("mj-column-per-{}", number)
        } else {
            format!("mj-column-px-{}", number)
        };
        (class, width)
    }

    fn has_gutter(&self) -> bool {
        PADDING_ATTRIBUTES.iter().any(|a| self.element.has_attr(a))
    }

    fn inner_border(&self, direction: Direction) -> i64 {
        let specific = format!("inner-border-{}", direction.as_str());
        self.element
            .attr(&specific)
            .or_else(|| self.element.attr("inner-border"))
            .map(parse_border)
            .unwrap_or(0)
    }

    /// Child width before clamping; negative when paddings do not fit.
    fn raw_child_width(&self, ctx: &RenderContext) -> f64 {
        let widths = self.element.box_widths(ctx.container_width);
        let inner_borders = (self.inner_border(Direction::Left) + self.inner_border(Direction::Right)) as f64;
        let all_paddings = widths.paddings + widths.borders + inner_borders;

        let width = match self.element.attr("width") {
            Some(width) => parse_width(width, false),
            None => Width {
                value: (ctx.container_width / self.element.props.non_raw_siblings() as f64).trunc(),
                unit: "px".to_string(),
            },
        };

        if width.is_percent() {
            ctx.container_width * width.value / 100.0 - all_paddings
        } else {
            width.value - all_paddings
        }
    }

    fn table_style(&self) -> StyleMap {
        vec![
            ("background-color", self.attr("background-color")),
            ("border", self.attr("border")),
            ("border-bottom", self.attr("border-bottom")),
            ("border-left", self.attr("border-left")),
            ("border-radius", self.attr("border-radius")),
            ("border-right", self.attr("border-right")),
            ("border-top", self.attr("border-top")),
            ("vertical-align", val(self.vertical_align.as_str())),
        ]
    }

    fn render_column(&self, ctx: &RenderContext, out: &mut Collector, styles: &Styles) -> MjmlResult<String> {
        let table = self.element.html_attributes(
            &[
                ("border", "0".into()),
                ("cellpadding", "0".into()),
                ("cellspacing", "0".into()),
                ("role", "presentation".into()),
                ("style", AttrValue::Slot("table")),
                ("width", "100%".into()),
            ],
            styles,
        );

        let child_ctx = ctx.with_width(self.child_container_width(ctx));
        let mut html = format!("<table{}><tbody>", table);
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
                    ("vertical-align", el.attr("vertical-align").into()),
                    ("class", el.attr("css-class").into()),
                    (
                        "style",
                        AttrValue::Style(vec![
                            ("background", opt(el.attr("container-background-color"))),
                            ("font-size", val("0px")),
                            ("padding", opt(el.attr("padding"))),
                            ("padding-top", opt(el.attr("padding-top"))),
                            ("padding-right", opt(el.attr("padding-right"))),
                            ("padding-bottom", opt(el.attr("padding-bottom"))),
                            ("padding-left", opt(el.attr("padding-left"))),
                            ("word-break", val("break-word")),
                        ]),
                    ),
                ],
                &child.styles(&child_ctx),
            );
            html.push_str(&format!("<tr><td{}>{}</td></tr>", td, rendered));
        }
        html.push_str("</tbody></table>");
        Ok(html)
    }

    fn render_gutter(&self, ctx: &RenderContext, out: &mut Collector, styles: &Styles) -> MjmlResult<String> {
        let table = self.element.html_attributes(
            &[
                ("border", "0".into()),
                ("cellpadding", "0".into()),
                ("cellspacing", "0".into()),
                ("role", "presentation".into()),
                ("width", "100%".into()),
            ],
            styles,
        );
        let td = self
            .element
            .html_attributes(&[("style", AttrValue::Slot("gutter"))], styles);
        Ok(format!(
            "<table{}><tbody><tr><td{}>{}</td></tr></tbody></table>",
            table,
            td,
            self.render_column(ctx, out, styles)?
        ))
    }
}

impl<'n> BodyComponent<'n> for Column<'n> {
    fn element(&self) -> &Element<'n> {
        &self.element
    }

    fn styles(&self, ctx: &RenderContext) -> Styles {
        let table = if self.has_gutter() {
            vec![
                ("background-color", self.attr("inner-background-color")),
                ("border", self.attr("inner-border")),
                ("border-bottom", self.attr("inner-border-bottom")),
                ("border-left", self.attr("inner-border-left")),
                ("border-radius", self.attr("inner-border-radius")),
                ("border-right", self.attr("inner-border-right")),
                ("border-top", self.attr("inner-border-top")),
            ]
        } else {
            self.table_style()
        };

        let mut gutter = self.table_style();
        gutter.extend([
            ("padding", self.attr("padding")),
            ("padding-top", self.attr("padding-top")),
            ("padding-right", self.attr("padding-right")),
            ("padding-bottom", self.attr("padding-bottom")),
            ("padding-left", self.attr("padding-left")),
        ]);

        Styles::new()
            .slot(
                "div",
                vec![
                    ("font-size", val("0px")),
                    ("text-align", val("left")),
                    ("direction", val(self.direction.as_str())),
                    ("display", val("inline-block")),
                    ("vertical-align", val(self.vertical_align.as_str())),
                    ("width", val("100%")),
                ],
            )
            .slot("table", table)
            .slot(
                "tdOutlook",
                vec![
                    ("vertical-align", val(self.vertical_align.as_str())),
                    ("width", val(self.width_as_pixel(ctx))),
                ],
            )
            .slot("gutter", gutter)
    }

    fn child_container_width(&self, ctx: &RenderContext) -> f64 {
        self.raw_child_width(ctx).max(0.0)
    }

    fn render(&self, ctx: &RenderContext, out: &mut Collector) -> MjmlResult<String> {
        let wanted = self.raw_child_width(ctx);
        if wanted < 0.0 {
            self.element.report_overflow(wanted, out);
        }

        let (class_name, width) = self.column_class();
        out.add_media_query(&class_name, &width.to_string());

        let mut classes = format!("{} mj-outlook-group-fix", class_name);
        if let Some(css_class) = self.element.attr("css-class") {
            classes.push(' ');
            classes.push_str(css_class);
        }

        let styles = self.styles(ctx);
        let div = self.element.html_attributes(
            &[("class", classes.into()), ("style", AttrValue::Slot("div"))],
            &styles,
        );
        let inner = if self.has_gutter() {
            self.render_gutter(ctx, out, &styles)?
        } else {
            self.render_column(ctx, out, &styles)?
        };
        Ok(format!("<div{}>{}</div>", div, inner))
    }
}
