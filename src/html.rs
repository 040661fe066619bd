//! A small, lenient HTML tree for post-render passes.
//!
//! The tree keeps source text as written (entities are not decoded) so that
//! serializing an untouched document gives back the same markup. Conditional
//! comments stay opaque comment nodes.

use std::borrow::Cow;

pub type NodeId = usize;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "title", "textarea"];

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlAttribute {
    pub name: String,
    /// Source text of the value; `None` for a bare attribute.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HtmlNodeData {
    Document,
    Element {
        name: String,
        attributes: Vec<HtmlAttribute>,
        self_closing: bool,
        /// An explicit end tag closed this element.
        closed: bool,
    },
    Text(String),
    Comment(String),
    /// `<!doctype ...>` or `<?...?>`, kept verbatim.
    Declaration(String),
}

#[derive(Debug, Clone)]
pub struct HtmlNode {
    pub data: HtmlNodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// An arena-backed HTML tree; node 0 is the document.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    nodes: Vec<HtmlNode>,
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let mut doc = HtmlDocument {
            nodes: vec![HtmlNode {
                data: HtmlNodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        };
        TreeBuilder::new(html, &mut doc).run();
        doc
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &HtmlNode {
        &self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].data, HtmlNodeData::Element { .. })
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].data {
            HtmlNodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, attribute: &str) -> Option<&str> {
        match &self.nodes[id].data {
            HtmlNodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(attribute))
                .map(|a| a.value.as_deref().unwrap_or("")),
            _ => None,
        }
    }

    /// Set an attribute to an already escaped value, replacing any earlier one.
    pub fn set_attribute(&mut self, id: NodeId, attribute: &str, value: String) {
        if let HtmlNodeData::Element { attributes, .. } = &mut self.nodes[id].data {
            match attributes
                .iter_mut()
                .find(|a| a.name.eq_ignore_ascii_case(attribute))
            {
                Some(existing) => existing.value = Some(value),
                None => attributes.push(HtmlAttribute {
                    name: attribute.to_string(),
                    value: Some(value),
                }),
            }
        }
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
    }

    /// Element siblings of `id` (itself included), in document order.
    pub fn element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self.element_children(parent).collect(),
            None => vec![id],
        }
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.element_siblings(id);
        let position = siblings.iter().position(|s| *s == id)?;
        position.checked_sub(1).map(|p| siblings[p])
    }

    /// Every element, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if self.is_element(id) {
                found.push(id);
            }
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        found
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for child in &self.nodes[self.root()].children {
            self.serialize_node(*child, &mut out);
        }
        out
    }

    fn serialize_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id];
        match &node.data {
            HtmlNodeData::Document => {
                for child in &node.children {
                    self.serialize_node(*child, out);
                }
            }
            HtmlNodeData::Text(text) => out.push_str(text),
            HtmlNodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            HtmlNodeData::Declaration(text) => out.push_str(text),
            HtmlNodeData::Element {
                name,
                attributes,
                self_closing,
                closed,
            } => {
                out.push('<');
                out.push_str(name);
                for attribute in attributes {
                    out.push(' ');
                    out.push_str(&attribute.name);
                    if let Some(value) = &attribute.value {
                        if value.contains('"') && !value.contains('\'') {
                            out.push_str(&format!("='{}'", value));
                        } else {
                            out.push_str(&format!("=\"{}\"", value));
                        }
                    }
                }
                if *self_closing {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.serialize_node(*child, out);
                }
                if *closed {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }

    fn push(&mut self, parent: NodeId, data: HtmlNodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(HtmlNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn mark_closed(&mut self, id: NodeId) {
        if let HtmlNodeData::Element { closed, .. } = &mut self.nodes[id].data {
            *closed = true;
        }
    }
}

struct TreeBuilder<'a> {
    input: &'a str,
    pos: usize,
    doc: &'a mut HtmlDocument,
    open: Vec<NodeId>,
}

impl<'a> TreeBuilder<'a> {
    fn new(input: &'a str, doc: &'a mut HtmlDocument) -> Self {
        Self {
            input,
            pos: 0,
            doc,
            open: vec![0],
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(0)
    }

    fn run(mut self) {
        while self.pos < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("</") && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.end_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.declaration();
            } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.start_tag();
            } else {
                self.text();
            }
        }
    }

    fn text(&mut self) {
        // A lone '<' that opens no tag is text.
        let rest = self.rest();
        let skip = if rest.starts_with('<') { 1 } else { 0 };
        let end = rest[skip..].find('<').map(|i| i + skip).unwrap_or(rest.len());
        let text = rest[..end].to_string();
        self.pos += end;
        let parent = self.current();
        // Merge with a preceding text node so stray '<' do not split text.
        if let Some(last) = self.doc.nodes[parent].children.last().copied() {
            if let HtmlNodeData::Text(existing) = &mut self.doc.nodes[last].data {
                existing.push_str(&text);
                return;
            }
        }
        self.doc.push(parent, HtmlNodeData::Text(text));
    }

    fn comment(&mut self) {
        let body_start = self.pos + 4;
        let (text, next) = match self.input[body_start..].find("-->") {
            Some(i) => (&self.input[body_start..body_start + i], body_start + i + 3),
            None => (&self.input[body_start..], self.input.len()),
        };
        let parent = self.current();
        self.doc.push(parent, HtmlNodeData::Comment(text.to_string()));
        self.pos = next;
    }

    fn declaration(&mut self) {
        let rest = self.rest();
        let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        let parent = self.current();
        self.doc
            .push(parent, HtmlNodeData::Declaration(rest[..end].to_string()));
        self.pos += end;
    }

    fn end_tag(&mut self) {
        let rest = self.rest();
        let close = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        let name = rest[2..close]
            .trim_end_matches('>')
            .trim()
            .to_string();
        self.pos += close;

        if let Some(depth) = self
            .open
            .iter()
            .rposition(|id| *id != 0 && self.doc.tag_name(*id).is_some_and(|n| n.eq_ignore_ascii_case(&name)))
        {
            let id = self.open[depth];
            self.doc.mark_closed(id);
            self.open.truncate(depth);
        }
    }

    fn start_tag(&mut self) {
        let bytes = self.input.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
            i += 1;
        }
        let name = self.input[self.pos + 1..i].to_string();

        let mut attributes = Vec::new();
        let mut self_closing = false;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    i += 1;
                    if i < bytes.len() && bytes[i] == b'>' {
                        self_closing = true;
                        i += 1;
                        break;
                    }
                    continue;
                }
                _ => {}
            }

            let name_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>' | b'/')
            {
                i += 1;
            }
            let attr_name = self.input[name_start..i].to_string();
            if attr_name.is_empty() {
                i += 1;
                continue;
            }

            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'=' {
                j += 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                let value = if j < bytes.len() && (bytes[j] == b'"' || bytes[j] == b'\'') {
                    let quote = bytes[j];
                    let start = j + 1;
                    let end = bytes[start..]
                        .iter()
                        .position(|b| *b == quote)
                        .map(|p| start + p)
                        .unwrap_or(bytes.len());
                    i = (end + 1).min(bytes.len());
                    self.input[start..end].to_string()
                } else {
                    let start = j;
                    while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                        j += 1;
                    }
                    i = j;
                    self.input[start..j].to_string()
                };
                attributes.push(HtmlAttribute {
                    name: attr_name,
                    value: Some(value),
                });
            } else {
                attributes.push(HtmlAttribute {
                    name: attr_name,
                    value: None,
                });
            }
        }
        self.pos = i;

        let parent = self.current();
        let void = is_void(&name);
        let id = self.doc.push(
            parent,
            HtmlNodeData::Element {
                name: name.clone(),
                attributes,
                self_closing,
                closed: false,
            },
        );
        if self_closing || void {
            return;
        }

        if is_raw_text(&name) {
            let rest = self.rest();
            let needle = format!("</{}", name.to_ascii_lowercase());
            let end = rest.to_ascii_lowercase().find(&needle).unwrap_or(rest.len());
            if end > 0 {
                self.doc.push(id, HtmlNodeData::Text(rest[..end].to_string()));
            }
            self.pos += end;
            if self.pos < self.input.len() {
                let close = self.rest().find('>').map(|p| p + 1).unwrap_or(self.rest().len());
                self.pos += close;
                self.doc.mark_closed(id);
            }
            return;
        }

        self.open.push(id);
    }
}

/// Escape a value for a double-quoted attribute.
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Escape text content. An `&` that already starts a character reference is kept.
pub fn escape_text(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for (i, c) in value.char_indices() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' if !starts_reference(&value[i..]) => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn starts_reference(text: &str) -> bool {
    let Some(end) = text.find(';').filter(|end| *end <= 10) else {
        return false;
    };
    let name = &text[1..end];
    match name.strip_prefix('#') {
        Some(number) => match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        },
        None => {
            name.starts_with(|c: char| c.is_ascii_alphabetic()) && name.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}

/// Decode the XML entities and numeric character references in `value`.
///
/// Unknown or malformed references are kept as written.
pub fn unescape_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_keeps_markup() {
        let html = "<!doctype html><html><head><style>td > p { color: red; }</style></head><body><!--[if mso | IE]><table><tr><td><![endif]--><div class=\"a\" hidden><img src=\"x.png\" /><br><p>a &amp; b &lt; c</p></div><!--[if !mso | IE]><!--><p>x</p><!--<![endif]--></body></html>";
        assert_eq!(HtmlDocument::parse(html).serialize(), html);
    }

    #[test]
    fn conditional_comments_are_opaque() {
        let doc = HtmlDocument::parse("<!--[if mso | IE]><table class=\"x\"><![endif]--><div class=\"x\"></div>");
        let elements = doc.elements();
        assert_eq!(elements.len(), 1);
        assert_eq!(doc.tag_name(elements[0]), Some("div"));
    }

    #[test]
    fn stray_end_tags_are_dropped() {
        let doc = HtmlDocument::parse("<div>a</span></div>");
        assert_eq!(doc.serialize(), "<div>a</div>");
    }

    #[test]
    fn unclosed_elements_get_no_end_tag() {
        let doc = HtmlDocument::parse("<div><p>one<p>two</div>");
        assert_eq!(doc.serialize(), "<div><p>one<p>two</div>");
    }

    #[test]
    fn style_content_is_raw_text() {
        let doc = HtmlDocument::parse("<style>a < b { }</style><p>x</p>");
        assert_eq!(doc.elements().len(), 2);
        assert_eq!(doc.serialize(), "<style>a < b { }</style><p>x</p>");
    }

    #[test]
    fn attributes_and_siblings() {
        let mut doc = HtmlDocument::parse("<ul><li id=a></li><li class='b c'></li></ul>");
        let items: Vec<NodeId> = doc.elements().into_iter().skip(1).collect();
        assert_eq!(doc.attribute(items[0], "id"), Some("a"));
        assert_eq!(doc.attribute(items[1], "class"), Some("b c"));
        assert_eq!(doc.previous_element_sibling(items[1]), Some(items[0]));
        assert_eq!(doc.previous_element_sibling(items[0]), None);

        doc.set_attribute(items[0], "data-x", "1".to_string());
        assert_eq!(doc.serialize(), "<ul><li id=\"a\" data-x=\"1\"></li><li class=\"b c\"></li></ul>");
    }

    #[test]
    fn entities() {
        assert_eq!(unescape_entities("a &amp; b &lt;c&gt; &#39;&#x41;"), "a & b <c> 'A");
        assert_eq!(unescape_entities("AT&T &bogus; &"), "AT&T &bogus; &");
        assert_eq!(escape_attribute("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go&gt;");
    }

    #[test]
    fn text_escaping_keeps_references() {
        assert_eq!(escape_text("Tom &amp; Jerry"), "Tom &amp; Jerry");
        assert_eq!(escape_text("AT&T &#169; &#xA9;"), "AT&amp;T &#169; &#xA9;");
        assert_eq!(escape_text("</title><script>"), "&lt;/title&gt;&lt;script&gt;");
        assert_eq!(escape_text("& ;"), "&amp; ;");
    }
}
