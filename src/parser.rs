use log::debug;

use crate::error::{MjmlError, MjmlResult};
use crate::html::unescape_entities;
use crate::node::Node;
use crate::registry::Registry;

/// Knobs for turning markup into a [`Node`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Turn comments inside body containers into `mj-raw` children.
    pub keep_comments: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { keep_comments: true }
    }
}

// ─── Public parse functions ──────────────────────────────────────────────────

/// Parse markup with the core component registry.
pub fn parse(markup: &str) -> MjmlResult<Node> {
    parse_with_registry(markup, Registry::core(), &ParserOptions::default())
}

/// Parse markup, accepting only tags known to `registry`.
pub fn parse_with_registry(markup: &str, registry: &Registry, options: &ParserOptions) -> MjmlResult<Node> {
    let root = Parser {
        input: markup,
        pos: 0,
        registry,
        options,
    }
    .parse_document()?;
    debug!("parsed <{}> with {} children", root.tag_name, root.children.len());
    Ok(root)
}

// ─── Parser ──────────────────────────────────────────────────────────────────

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    registry: &'a Registry,
    options: &'a ParserOptions,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// 1-based line and column of a byte offset.
    fn position(&self, offset: usize) -> (usize, usize) {
        let before = &self.input[..offset];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> MjmlError {
        let (line, column) = self.position(offset);
        MjmlError::ParseError {
            line,
            column,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn parse_document(mut self) -> MjmlResult<Node> {
        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;

        while self.pos < self.input.len() {
            let rest = self.rest();
            let Some(lt) = rest.find('<') else {
                self.text(rest, &mut stack, root.is_some())?;
                self.pos = self.input.len();
                break;
            };
            if lt > 0 {
                self.text(&rest[..lt], &mut stack, root.is_some())?;
                self.pos += lt;
            }

            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment(&mut stack)?;
            } else if rest.starts_with("<?") {
                let end = rest
                    .find("?>")
                    .ok_or_else(|| self.error_at(self.pos, "unterminated declaration"))?;
                self.pos += end + 2;
            } else if rest.starts_with("<!") {
                let end = rest
                    .find('>')
                    .ok_or_else(|| self.error_at(self.pos, "unterminated declaration"))?;
                self.pos += end + 1;
            } else if rest.starts_with("</") {
                let node = self.end_tag(&mut stack)?;
                attach(node, &mut stack, &mut root);
            } else {
                let start = self.pos;
                let (node, open) = self.start_tag()?;
                if stack.is_empty() && root.is_some() {
                    return Err(self.error_at(start, format!("<{}> after the root element", node.tag_name)));
                }
                if open {
                    stack.push(node);
                } else {
                    attach(node, &mut stack, &mut root);
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(MjmlError::ParseError {
                line: open.line,
                column: open.column,
                message: format!("<{}> is never closed", open.tag_name),
            });
        }
        root.ok_or_else(|| self.error_at(0, "missing root element"))
    }

    fn text(&self, text: &str, stack: &mut [Node], after_root: bool) -> MjmlResult<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        match stack.last_mut() {
            Some(parent) => {
                parent.content.push_str(text);
                Ok(())
            }
            None => Err(self.error_at(
                self.pos + (text.len() - text.trim_start().len()),
                if after_root {
                    "text after the root element"
                } else {
                    "text before the root element"
                },
            )),
        }
    }

    fn comment(&mut self, stack: &mut [Node]) -> MjmlResult<()> {
        let start = self.pos;
        let end = self.rest()[4..]
            .find("-->")
            .map(|i| start + 4 + i + 3)
            .ok_or_else(|| self.error_at(start, "unterminated comment"))?;
        self.pos = end;

        let in_head = stack.iter().any(|n| n.tag_name == "mj-head");
        let keep = self.options.keep_comments && self.registry.has("mj-raw") && !in_head;
        if let Some(parent) = stack.last_mut().filter(|p| keep && p.tag_name != "mjml") {
            let (line, column) = self.position(start);
            parent.children.push(Node {
                tag_name: "mj-raw".to_string(),
                content: self.input[start..end].to_string(),
                line,
                column,
                ..Node::default()
            });
        }
        Ok(())
    }

    fn tag_name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn end_tag(&mut self, stack: &mut Vec<Node>) -> MjmlResult<Node> {
        let start = self.pos;
        self.pos += 2;
        let name = self.tag_name();
        self.skip_whitespace();
        if !self.rest().starts_with('>') {
            return Err(self.error_at(start, format!("unterminated closing tag </{}>", name)));
        }
        self.pos += 1;

        match stack.last() {
            None => Err(self.error_at(start, format!("stray closing tag </{}>", name))),
            Some(open) if open.tag_name != name => Err(self.error_at(
                start,
                format!("mismatched closing tag </{}>, expected </{}>", name, open.tag_name),
            )),
            Some(_) => {
                let mut node = stack.pop().unwrap_or_default();
                node.content = node.content.trim().to_string();
                Ok(node)
            }
        }
    }

    /// Parse a start tag. Returns the node and whether it stays open.
    fn start_tag(&mut self) -> MjmlResult<(Node, bool)> {
        let start = self.pos;
        let (line, column) = self.position(start);
        self.pos += 1;
        let name = self.tag_name();
        if name.is_empty() {
            return Err(self.error_at(start, "expected a tag name after '<'"));
        }

        let mut node = Node {
            tag_name: name.to_string(),
            line,
            column,
            ..Node::default()
        };

        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error_at(start, format!("unterminated tag <{}>", name)));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }

            let attribute = self.tag_name();
            if attribute.is_empty() {
                return Err(self.error_at(self.pos, format!("unexpected character in <{}>", name)));
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attribute_value(name, attribute)?
            } else {
                attribute.to_string()
            };
            node.attributes.insert(attribute.to_string(), value);
        };

        let captures = self
            .registry
            .get(name)
            .ok_or(MjmlError::UnknownTag {
                tag: name.to_string(),
                line,
                column,
            })?
            .captures_content();

        if self_closing {
            return Ok((node, false));
        }
        if captures {
            node.content = self.capture_content(name, start)?.trim().to_string();
            return Ok((node, false));
        }
        Ok((node, true))
    }

    fn attribute_value(&mut self, tag: &str, attribute: &str) -> MjmlResult<String> {
        let start = self.pos;
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let end = rest[1..].find(quote).ok_or_else(|| {
                    self.error_at(start, format!("unterminated value for '{}' in <{}>", attribute, tag))
                })?;
                self.pos += end + 2;
                Ok(unescape_entities(&rest[1..end + 1]).into_owned())
            }
            _ => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                    .unwrap_or(rest.len());
                self.pos += len;
                Ok(unescape_entities(&rest[..len]).into_owned())
            }
        }
    }

    /// Everything up to the `</name>` matching an already consumed `<name ...>`.
    fn capture_content(&mut self, name: &str, start: usize) -> MjmlResult<&'a str> {
        let content_start = self.pos;
        let open = format!("<{}", name);
        let close = format!("</{}", name);
        let mut depth = 1usize;
        let mut cursor = content_start;

        while let Some(lt) = self.input[cursor..].find('<') {
            let at = cursor + lt;
            let rest = &self.input[at..];
            let boundary = |s: &str, prefix: &str| {
                s.starts_with(prefix)
                    && s[prefix.len()..]
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_whitespace() || c == '>' || c == '/')
            };

            if boundary(rest, &close) {
                depth -= 1;
                let gt = rest.find('>').ok_or_else(|| {
                    self.error_at(at, format!("unterminated closing tag </{}>", name))
                })?;
                if depth == 0 {
                    self.pos = at + gt + 1;
                    return Ok(&self.input[content_start..at]);
                }
                cursor = at + gt + 1;
            } else if boundary(rest, &open) {
                let gt = rest.find('>').unwrap_or(rest.len() - 1);
                if !rest[..gt].ends_with('/') {
                    depth += 1;
                }
                cursor = at + gt + 1;
            } else {
                cursor = at + 1;
            }
        }

        Err(self.error_at(start, format!("<{}> is never closed", name)))
    }
}

fn attach(node: Node, stack: &mut [Node], root: &mut Option<Node>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}
