use log::warn;
use serde::{Deserialize, Serialize};

use super::UrlValidator;
use crate::html::{escape_attribute, escape_text, unescape_entities, HtmlDocument, HtmlNodeData, NodeId};

pub const DEFAULT_MAX_INPUT_LEN: usize = 1024 * 1024;

/// Elements removed together with everything inside them.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "noscript", "template",
];

const STRICT_ELEMENTS: &[&str] = &[
    "a", "b", "strong", "i", "em", "u", "s", "strike", "sub", "sup", "small", "br", "p", "h1", "h2", "h3",
    "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "code", "pre", "hr",
];
const DEFAULT_ELEMENTS: &[&str] = &["table", "thead", "tbody", "tfoot", "tr", "th", "td", "img"];
const PERMISSIVE_ELEMENTS: &[&str] = &[
    "div", "span", "center", "font", "caption", "col", "colgroup", "figure", "figcaption", "picture",
    "source", "video", "audio",
];

const STRICT_ATTRIBUTES: &[&str] = &["href", "title", "target", "rel", "name"];
const DEFAULT_ATTRIBUTES: &[&str] = &[
    "style", "class", "align", "valign", "width", "height", "alt", "src", "border", "cellpadding",
    "cellspacing", "bgcolor", "colspan", "rowspan", "dir", "lang",
];
const PERMISSIVE_ATTRIBUTES: &[&str] = &[
    "id", "role", "color", "face", "size", "background", "hspace", "vspace", "nowrap", "span", "poster",
    "controls", "srcset", "type", "media",
];

const LINK_SCHEMES: &[&str] = &["https", "http", "mailto"];
const MEDIA_SCHEMES: &[&str] = &["https", "http"];

/// How much markup survives sanitization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizerProfile {
    /// Text formatting, headings, lists and links.
    Strict,
    /// Adds tables, images and presentational attributes.
    #[default]
    Default,
    /// Adds generic containers, media and layout attributes.
    Permissive,
}

impl SanitizerProfile {
    fn allows_element(self, name: &str) -> bool {
        let tiers: &[&[&str]] = match self {
            SanitizerProfile::Strict => &[STRICT_ELEMENTS],
            SanitizerProfile::Default => &[STRICT_ELEMENTS, DEFAULT_ELEMENTS],
            SanitizerProfile::Permissive => &[STRICT_ELEMENTS, DEFAULT_ELEMENTS, PERMISSIVE_ELEMENTS],
        };
        tiers.iter().any(|tier| tier.contains(&name))
    }

    fn allows_attribute(self, name: &str) -> bool {
        let tiers: &[&[&str]] = match self {
            SanitizerProfile::Strict => &[STRICT_ATTRIBUTES],
            SanitizerProfile::Default => &[STRICT_ATTRIBUTES, DEFAULT_ATTRIBUTES],
            SanitizerProfile::Permissive => &[STRICT_ATTRIBUTES, DEFAULT_ATTRIBUTES, PERMISSIVE_ATTRIBUTES],
        };
        tiers.iter().any(|tier| tier.contains(&name))
    }
}

/// Restricts untrusted HTML to an email-safe allow-list.
///
/// Dangerous containers (`script`, `iframe`, ...) vanish with their content;
/// any other element outside the allow-list is unwrapped so its text stays.
/// Comments and declarations are dropped.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    profile: SanitizerProfile,
    max_input_len: usize,
    links: UrlValidator,
    media: UrlValidator,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SanitizerProfile::Default)
    }
}

impl Sanitizer {
    pub fn new(profile: SanitizerProfile) -> Self {
        Self {
            profile,
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            links: UrlValidator::with_schemes(LINK_SCHEMES),
            media: UrlValidator::with_schemes(MEDIA_SCHEMES),
        }
    }

    pub fn with_max_input_len(mut self, max_input_len: usize) -> Self {
        self.max_input_len = max_input_len;
        self
    }

    pub fn profile(&self) -> SanitizerProfile {
        self.profile
    }

    pub fn sanitize(&self, html: &str) -> String {
        let input = if html.len() > self.max_input_len {
            warn!(
                "sanitizer input of {} bytes truncated to {} bytes",
                html.len(),
                self.max_input_len
            );
            let mut end = self.max_input_len;
            while !html.is_char_boundary(end) {
                end -= 1;
            }
            &html[..end]
        } else {
            html
        };

        let doc = HtmlDocument::parse(input);
        let mut out = String::with_capacity(input.len());
        for child in &doc.node(doc.root()).children {
            self.write_node(&doc, *child, &mut out);
        }
        out
    }

    fn write_children(&self, doc: &HtmlDocument, id: NodeId, out: &mut String) {
        for child in &doc.node(id).children {
            self.write_node(doc, *child, out);
        }
    }

    fn write_node(&self, doc: &HtmlDocument, id: NodeId, out: &mut String) {
        let (name, attributes, self_closing) = match &doc.node(id).data {
            HtmlNodeData::Text(text) => {
                out.push_str(&escape_text(text));
                return;
            }
            HtmlNodeData::Element {
                name,
                attributes,
                self_closing,
                ..
            } => (name.to_ascii_lowercase(), attributes, *self_closing),
            HtmlNodeData::Document => return self.write_children(doc, id, out),
            HtmlNodeData::Comment(_) | HtmlNodeData::Declaration(_) => return,
        };

        if DROPPED_ELEMENTS.contains(&name.as_str()) {
            return;
        }
        if !self.profile.allows_element(&name) {
            return self.write_children(doc, id, out);
        }

        out.push('<');
        out.push_str(&name);
        for attribute in attributes {
            let attribute_name = attribute.name.to_ascii_lowercase();
            if attribute_name.starts_with("on") || !self.profile.allows_attribute(&attribute_name) {
                continue;
            }
            let value = unescape_entities(attribute.value.as_deref().unwrap_or(""));
            if !self.attribute_value_is_safe(&attribute_name, &value) {
                continue;
            }
            out.push_str(&format!(" {}=\"{}\"", attribute_name, escape_attribute(&value)));
        }

        let void = self_closing || matches!(name.as_str(), "br" | "hr" | "img" | "col" | "source");
        if void {
            out.push_str(" />");
            return;
        }
        out.push('>');
        self.write_children(doc, id, out);
        out.push_str(&format!("</{}>", name));
    }

    fn attribute_value_is_safe(&self, name: &str, value: &str) -> bool {
        match name {
            "href" | "background" => self.links.is_valid(value),
            "src" | "poster" => self.media.is_valid(value),
            "srcset" => value
                .split(',')
                .filter_map(|candidate| candidate.split_whitespace().next())
                .all(|url| self.media.is_valid(url)),
            "style" => {
                let lower = value.to_ascii_lowercase();
                !lower.contains("expression(") && !lower.contains("javascript:") && !lower.contains("behavior:")
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scripts_and_frames_vanish_with_content() {
        let sanitizer = Sanitizer::default();
        assert_eq!(
            sanitizer.sanitize("<p>a</p><script>alert(1)</script><iframe src=\"https://x\">b</iframe><p>c</p>"),
            "<p>a</p><p>c</p>"
        );
    }

    #[test]
    fn forms_are_unwrapped() {
        let sanitizer = Sanitizer::new(SanitizerProfile::Strict);
        assert_eq!(
            sanitizer.sanitize("<form action=\"/x\"><p>Name<input name=\"n\"></p></form>"),
            "<p>Name</p>"
        );
    }

    #[test]
    fn event_handlers_and_unsafe_links_are_dropped() {
        let sanitizer = Sanitizer::new(SanitizerProfile::Strict);
        assert_eq!(
            sanitizer.sanitize("<a href=\"javascript:alert(1)\" onclick=\"x()\" title=\"t\">go</a>"),
            "<a title=\"t\">go</a>"
        );
        assert_eq!(
            sanitizer.sanitize("<a href=\"mailto:a@b.c\">mail</a><a href=\"tel:1\">call</a>"),
            "<a href=\"mailto:a@b.c\">mail</a><a>call</a>"
        );
    }

    #[test]
    fn profiles_widen_the_allow_list() {
        let html = "<div style=\"color:red\"><table><tr><td class=\"c\">x</td></tr></table></div>";
        assert_eq!(Sanitizer::new(SanitizerProfile::Strict).sanitize(html), "x");
        assert_eq!(
            Sanitizer::new(SanitizerProfile::Default).sanitize(html),
            "<table><tr><td class=\"c\">x</td></tr></table>"
        );
        assert_eq!(
            Sanitizer::new(SanitizerProfile::Permissive).sanitize(html),
            "<div style=\"color:red\"><table><tr><td class=\"c\">x</td></tr></table></div>"
        );
    }

    #[test]
    fn images_need_a_web_scheme() {
        let sanitizer = Sanitizer::default();
        assert_eq!(
            sanitizer.sanitize("<img src=\"data:image/png;base64,AA\" alt=\"a\"><img src=\"https://x/y.png\">"),
            "<img alt=\"a\" /><img src=\"https://x/y.png\" />"
        );
    }

    #[test]
    fn style_expressions_are_dropped() {
        let sanitizer = Sanitizer::default();
        assert_eq!(
            sanitizer.sanitize("<td style=\"width: expression(alert(1))\">x</td>"),
            "<td>x</td>"
        );
    }

    #[test]
    fn text_is_escaped_and_comments_dropped() {
        let sanitizer = Sanitizer::default();
        assert_eq!(sanitizer.sanitize("1 < 2 <!-- hidden --> &amp; 3"), "1 &lt; 2  &amp; 3");
    }

    #[test]
    fn input_is_capped() {
        let sanitizer = Sanitizer::default().with_max_input_len(5);
        assert_eq!(sanitizer.sanitize("<b>abcdef</b>"), "<b>ab</b>");
        let sanitizer = Sanitizer::default().with_max_input_len(2);
        assert_eq!(sanitizer.sanitize("aé"), "a");
    }
}
