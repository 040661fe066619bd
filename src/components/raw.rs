use crate::components::{BodyComponent, Element};
use crate::context::{Collector, RenderContext};
use crate::error::MjmlResult;
use crate::registry::{ComponentKind, ComponentSpec};

pub const SPEC: ComponentSpec = ComponentSpec {
    tag_name: "mj-raw",
    kind: ComponentKind::Body(build),
    allowed_attributes: &[],
    default_attributes: &[],
    ending_tag: true,
    raw_element: true,
};

/// Markup passed through untouched. Parents neither wrap nor size it.
pub struct Raw<'n> {
    element: Element<'n>,
}

fn build<'n>(element: Element<'n>) -> MjmlResult<Box<dyn BodyComponent<'n> + 'n>> {
    Ok(Box::new(Raw { element }))
}

impl<'n> BodyComponent<'n> for Raw<'n> {
    fn element(&self) -> &Element<'n> {
        &self.element
    }

    fn render(&self, _ctx: &RenderContext, _out: &mut Collector) -> MjmlResult<String> {
        Ok(self.element.content().to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::components::test_support::render;
    use crate::node::Node;
    use pretty_assertions::assert_eq;

    #[test]
    fn raw_content_is_verbatim() {
        let node = Node::new("mj-raw").with_content("<!-- keep --><p class=\"x\">&nbsp;</p>");
        let (html, out) = render(&node, 600.0);
        assert_eq!(html, "<!-- keep --><p class=\"x\">&nbsp;</p>");
        assert!(out.diagnostics.is_empty());
    }
}
