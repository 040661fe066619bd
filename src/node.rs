use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A parsed markup element.
///
/// Nodes are produced once by the parser and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// 1-based source position of the opening tag.
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub column: usize,
}

impl Node {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First direct child with the given tag name.
    pub fn child(&self, tag_name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.tag_name == tag_name)
    }

    /// All direct children with the given tag name, in document order.
    pub fn children_named<'a>(&'a self, tag_name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.tag_name == tag_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let node = Node::new("mj-section")
            .with_attribute("padding", "0")
            .with_child(Node::new("mj-column"))
            .with_child(Node::new("mj-raw").with_content("<p>hi</p>"))
            .with_child(Node::new("mj-column"));

        assert_eq!(node.attribute("padding"), Some("0"));
        assert_eq!(node.attribute("border"), None);
        assert_eq!(node.child("mj-raw").map(|n| n.content.as_str()), Some("<p>hi</p>"));
        assert_eq!(node.children_named("mj-column").count(), 2);
    }

    #[test]
    fn yaml_dump_skips_empty_fields() {
        let node = Node::new("mj-text").with_content("Hello");
        let yaml = serde_yaml::to_string(&node).unwrap();
        assert!(yaml.contains("tag_name: mj-text"));
        assert!(yaml.contains("content: Hello"));
        assert!(!yaml.contains("children"));
    }
}
