use crate::components::{build_children, AttrValue, BodyComponent, Element};
use crate::context::{Collector, RenderContext};
use crate::error::MjmlResult;
use crate::registry::{ComponentKind, ComponentSpec};
use crate::shorthand::parse_width;
use crate::style::{opt, Styles};

pub const SPEC: ComponentSpec = ComponentSpec {
    tag_name: "mj-body",
    kind: ComponentKind::Body(build),
    allowed_attributes: &[("width", "unit(px)"), ("background-color", "color")],
    default_attributes: &[("width", "600px")],
    ending_tag: false,
    raw_element: false,
};

/// The email body: sets the content width every section is laid out in.
pub struct Body<'n> {
    element: Element<'n>,
}

fn build<'n>(element: Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>> {
    Ok(Box::new(Body { element }))
}

impl<'n> BodyComponent<'n> for Body<'n> {
    fn element(&self) -> &Element<'n> {
        &self.element
    }

    fn styles(&self, _ctx: &RenderContext) -> Styles {
        Styles::new().slot(
            "div",
            vec![("background-color", opt(self.element.attr("background-color")))],
        )
    }

    fn child_container_width(&self, _ctx: &RenderContext) -> f64 {
        parse_width(self.element.attr("width").unwrap_or("600px"), true).value
    }

    fn render(&self, ctx: &RenderContext, out: &mut Collector) -> MjmlResult<String> {
        out.background_color = self.element.attr("background-color").map(str::to_string);

        let child_ctx = ctx.with_width(self.child_container_width(ctx));
        let mut children = String::new();
        for child in build_children(self.element.node, &child_ctx, out)? {
            children.push_str(&child.render(&child_ctx, out)?);
        }

        let styles = self.styles(ctx);
        let attributes = self.element.html_attributes(
            &[
                ("class", self.element.attr("css-class").into()),
                ("style", AttrValue::Slot("div")),
                ("lang", ctx.global.lang.as_str().into()),
                ("dir", ctx.global.dir.as_str().into()),
            ],
            &styles,
        );
        Ok(format!("<div{}>{}</div>", attributes, children))
    }
}

#[cfg(test)]
mod tests {
    use crate::components::test_support::render;
    use crate::node::Node;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_body_is_a_bare_div() {
        let (html, out) = render(&Node::new("mj-body"), 0.0);
        assert_eq!(html, "<div lang=\"und\" dir=\"auto\"></div>");
        assert_eq!(out.background_color, None);
    }

    #[test]
    fn background_is_exported_for_the_document_body() {
        let node = Node::new("mj-body")
            .with_attribute("background-color", "#eeeeee")
            .with_attribute("css-class", "wrapper");
        let (html, out) = render(&node, 0.0);
        assert!(html.starts_with("<div class=\"wrapper\" style=\"background-color:#eeeeee;\""));
        assert_eq!(out.background_color.as_deref(), Some("#eeeeee"));
    }

    #[test]
    fn width_drives_section_layout() {
        let node = Node::new("mj-body")
            .with_attribute("width", "500px")
            .with_child(Node::new("mj-section"));
        let (html, _) = render(&node, 0.0);
        assert!(html.contains("max-width:500px;"));
    }
}
