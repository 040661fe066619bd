//! The compile pipeline: parse, head pass, body pass, post-processing.

use log::debug;
use serde::Serialize;

use crate::components::{instantiate, Props};
use crate::conditional::{merge_outlook_conditionals, minify_outlook_conditionals};
use crate::context::{Collector, GlobalData, RenderContext};
use crate::error::{Diagnostic, DiagnosticKind, MjmlError, MjmlResult};
use crate::inliner::{apply_html_attributes, inline_css};
use crate::node::Node;
use crate::options::RenderOptions;
use crate::parser::{parse_with_registry, ParserOptions};
use crate::registry::{ComponentKind, Registry};
use crate::skeleton::build_skeleton;

/// Container width before `mj-body` sets its own.
const DEFAULT_WIDTH: f64 = 600.0;

/// A compiled document and everything that degraded on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub html: String,
    pub errors: Vec<Diagnostic>,
}

/// Compiles markup against a component registry.
///
/// ```
/// use mjml_email::{Registry, RenderOptions, Renderer};
///
/// let renderer = Renderer::new(Registry::core(), RenderOptions::default());
/// let output = renderer
///     .render("<mjml><mj-body><mj-section><mj-column><mj-text>Hi</mj-text></mj-column></mj-section></mj-body></mjml>")
///     .unwrap();
/// assert!(output.html.starts_with("<!doctype html>"));
/// assert!(output.errors.is_empty());
/// ```
pub struct Renderer<'r> {
    registry: &'r Registry,
    options: RenderOptions,
}

impl<'r> Renderer<'r> {
    pub fn new(registry: &'r Registry, options: RenderOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, markup: &str) -> MjmlResult<RenderOutput> {
        let parser_options = ParserOptions {
            keep_comments: self.options.keep_comments,
        };
        let root = parse_with_registry(markup, self.registry, &parser_options)?;
        self.render_node(&root)
    }

    pub fn render_node(&self, root: &Node) -> MjmlResult<RenderOutput> {
        if root.tag_name != "mjml" {
            return Err(MjmlError::ParseError {
                line: root.line,
                column: root.column,
                message: format!("root element must be <mjml>, found <{}>", root.tag_name),
            });
        }

        let mut global = GlobalData::new(self.options.clone());
        if let Some(lang) = root.attribute("lang") {
            global.lang = lang.to_string();
        }
        if let Some(dir) = root.attribute("dir") {
            global.dir = dir.to_string();
        }
        let mut out = Collector::new();

        for child in &root.children {
            if !matches!(child.tag_name.as_str(), "mj-head" | "mj-body") {
                out.report_kind(
                    DiagnosticKind::MisplacedElement,
                    &child.tag_name,
                    format!("only mj-head and mj-body may appear in mjml (line {})", child.line),
                );
            }
        }

        if let Some(head) = root.child("mj-head") {
            self.process_head(head, &mut global, &mut out)?;
        }
        debug!(
            "head pass done: breakpoint {}, {} fonts, {} inline stylesheets",
            global.breakpoint,
            global.fonts.len(),
            global.inline_styles.len()
        );

        let empty_body;
        let body = match root.child("mj-body") {
            Some(body) => body,
            None => {
                out.report_kind(
                    DiagnosticKind::MissingElement,
                    "mj-body",
                    "document has no mj-body, rendering an empty one",
                );
                empty_body = Node::new("mj-body");
                &empty_body
            }
        };
        let ctx = RenderContext::new(&global, self.registry, DEFAULT_WIDTH);
        let mut content = match instantiate(body, Props::single(), &ctx, &mut out)? {
            Some(component) => component.render(&ctx, &mut out)?,
            None => String::new(),
        };
        debug!("body pass done: {} bytes", content.len());

        if self.options.minify_outlook {
            content = minify_outlook_conditionals(&content);
        }

        let (content, errors) = apply_html_attributes(&content, &global.html_attributes);
        errors.into_iter().for_each(|e| out.report(e));

        let mut html = build_skeleton(&content, &global, &mut out);
        if !global.inline_styles.is_empty() {
            let (inlined, errors) = inline_css(&html, &global.inline_styles);
            errors.into_iter().for_each(|e| out.report(e));
            html = inlined;
        }
        let html = merge_outlook_conditionals(&html);

        debug!("compiled {} bytes with {} diagnostics", html.len(), out.diagnostics.len());
        Ok(RenderOutput {
            html,
            errors: out.diagnostics,
        })
    }

    fn process_head(&self, head: &Node, global: &mut GlobalData, out: &mut Collector) -> MjmlResult<()> {
        for child in &head.children {
            let Some(spec) = self.registry.get(&child.tag_name) else {
                out.report_kind(DiagnosticKind::MisplacedElement, &child.tag_name, "unknown head element");
                continue;
            };

            match spec.kind {
                ComponentKind::Head(factory) => {
                    let mut diagnostics = Vec::new();
                    let attributes = match self.registry.schema(spec.tag_name) {
                        Some(schema) => schema.resolve(child, None, self.options.validation_level, &mut diagnostics)?,
                        None => child.attributes.clone(),
                    };
                    diagnostics.into_iter().for_each(|d| out.report(d));
                    factory(child, attributes).handle(global);
                }
                _ if spec.raw_element => global.head_raw.push(child.content.clone()),
                _ => out.report_kind(
                    DiagnosticKind::MisplacedElement,
                    &child.tag_name,
                    format!("cannot be used inside mj-head (line {})", child.line),
                ),
            }
        }
        Ok(())
    }
}
