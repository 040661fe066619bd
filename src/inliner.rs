//! Stylesheet inlining and selector-targeted attribute injection.
//!
//! Both passes work on the lenient [`HtmlDocument`] tree so that Outlook
//! conditional comments and unknown markup survive untouched.

use cssparser::{AtRuleParser, ParseError, Parser, ParserInput, ParserState, QualifiedRuleParser, StyleSheetParser};
use indexmap::IndexMap;
use log::{debug, trace};
use regex::Regex;
use std::sync::OnceLock;

use crate::context::AttributeMap;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::html::{escape_attribute, unescape_entities, HtmlDocument};
use crate::selector::{split_selector_list, ComplexSelector, SelectorError, Specificity};
use crate::style::{parse_declaration_list, parse_declarations, serialize_declarations, Declaration};

/// Elements that never carry a rendered style.
const NON_VISUAL_ELEMENTS: &[&str] = &["html", "head", "title", "meta", "link", "style", "script", "base"];

/// One selector of a stylesheet rule, with the rule's declarations.
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: ComplexSelector,
    pub specificity: Specificity,
    pub order: usize,
    pub declarations: Vec<Declaration>,
}

fn strip_comments(css: &str) -> std::borrow::Cow<'_, str> {
    static COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = COMMENT_REGEX.get_or_init(|| Regex::new(r"/\*[\s\S]*?\*/").unwrap());
    re.replace_all(css, "")
}

/// Collects `(selector list, declarations)` pairs. At-rules are rejected and skipped.
struct RuleCollector;

impl<'i> QualifiedRuleParser<'i> for RuleCollector {
    type Prelude = String;
    type QualifiedRule = (String, Vec<Declaration>);
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next().is_ok() {}
        Ok(strip_comments(input.slice_from(start)).trim().to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Ok((prelude, parse_declaration_list(input)))
    }
}

impl<'i> AtRuleParser<'i> for RuleCollector {
    type Prelude = ();
    type AtRule = (String, Vec<Declaration>);
    type Error = ();
}

/// Parse stylesheets into rules, one per selector of each selector list.
///
/// Selectors depending on runtime state skip silently; the rest of their
/// list still applies. Malformed selectors are reported.
pub fn parse_stylesheet(css: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<StyleRule> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut collector = RuleCollector;
    let parsed: Vec<(String, Vec<Declaration>)> = StyleSheetParser::new(&mut parser, &mut collector)
        .filter_map(|result| match result {
            Ok(rule) => Some(rule),
            Err((_, source)) => {
                trace!("skipping '{}'", source.trim());
                None
            }
        })
        .collect();

    let mut rules = Vec::new();
    for (prelude, declarations) in parsed {
        if declarations.is_empty() {
            continue;
        }
        for text in split_selector_list(&prelude) {
            match ComplexSelector::parse(text) {
                Ok(selector) => rules.push(StyleRule {
                    specificity: selector.specificity(),
                    selector,
                    order: rules.len(),
                    declarations: declarations.clone(),
                }),
                Err(SelectorError::Unsupported(selector)) => {
                    trace!("skipping runtime-only selector '{}'", selector);
                }
                Err(err) => diagnostics.push(
                    Diagnostic::new(DiagnosticKind::InvalidSelector, err.to_string()).with_tag("mj-style"),
                ),
            }
        }
    }
    rules
}

struct Merged {
    declaration: Declaration,
    from_stylesheet: bool,
}

fn merge_rule_declarations(merged: &mut IndexMap<String, Merged>, declarations: &[Declaration]) {
    for declaration in declarations {
        if let Some(existing) = merged.get(&declaration.property) {
            if existing.declaration.important && !declaration.important {
                continue;
            }
        }
        merged.insert(
            declaration.property.clone(),
            Merged {
                declaration: declaration.clone(),
                from_stylesheet: true,
            },
        );
    }
}

fn merge_inline_declarations(merged: &mut IndexMap<String, Merged>, declarations: Vec<Declaration>) {
    for declaration in declarations {
        if let Some(existing) = merged.get(&declaration.property) {
            if existing.from_stylesheet && existing.declaration.important && !declaration.important {
                continue;
            }
        }
        merged.shift_remove(&declaration.property);
        merged.insert(
            declaration.property.clone(),
            Merged {
                declaration,
                from_stylesheet: false,
            },
        );
    }
}

/// Merge every rule of `stylesheets` into the `style` attribute of the
/// elements it matches.
pub fn inline_css(html: &str, stylesheets: &[String]) -> (String, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut rules = parse_stylesheet(&stylesheets.join("\n"), &mut diagnostics);
    if rules.is_empty() {
        return (html.to_string(), diagnostics);
    }
    rules.sort_by_key(|rule| (rule.specificity, rule.order));

    let mut doc = HtmlDocument::parse(html);
    let mut touched = 0usize;
    for id in doc.elements() {
        let visual = doc
            .tag_name(id)
            .is_some_and(|t| !NON_VISUAL_ELEMENTS.contains(&t.to_ascii_lowercase().as_str()));
        if !visual {
            continue;
        }

        let mut merged: IndexMap<String, Merged> = IndexMap::new();
        for rule in rules.iter().filter(|rule| rule.selector.matches(&doc, id)) {
            trace!("rule #{} matches <{}>", rule.order, doc.tag_name(id).unwrap_or(""));
            merge_rule_declarations(&mut merged, &rule.declarations);
        }
        if merged.is_empty() {
            continue;
        }

        let inline = doc
            .attribute(id, "style")
            .map(|style| parse_declarations(&unescape_entities(style)))
            .unwrap_or_default();
        merge_inline_declarations(&mut merged, inline);

        let declarations: Vec<Declaration> = merged
            .into_values()
            .map(|m| Declaration {
                important: m.declaration.important && !m.from_stylesheet,
                ..m.declaration
            })
            .collect();
        let style = serialize_declarations(&declarations);
        doc.set_attribute(id, "style", escape_attribute(&style).into_owned());
        touched += 1;
    }

    debug!("inlined {} rules into {} elements", rules.len(), touched);
    (doc.serialize(), diagnostics)
}

/// Set the attributes collected from `mj-html-attributes` on every element
/// matching their selector.
pub fn apply_html_attributes(
    html: &str,
    html_attributes: &IndexMap<String, AttributeMap>,
) -> (String, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    if html_attributes.is_empty() {
        return (html.to_string(), diagnostics);
    }

    let mut doc = HtmlDocument::parse(html);
    let elements = doc.elements();
    for (path, attributes) in html_attributes {
        let mut selectors = Vec::new();
        for text in split_selector_list(path) {
            match ComplexSelector::parse(text) {
                Ok(selector) => selectors.push(selector),
                Err(err) => diagnostics.push(
                    Diagnostic::new(DiagnosticKind::InvalidSelector, err.to_string()).with_tag("mj-selector"),
                ),
            }
        }

        let targets: Vec<_> = elements
            .iter()
            .copied()
            .filter(|id| selectors.iter().any(|s| s.matches(&doc, *id)))
            .collect();
        debug!("html attributes for '{}' hit {} elements", path, targets.len());
        for id in targets {
            for (name, value) in attributes {
                doc.set_attribute(id, name, escape_attribute(value).into_owned());
            }
        }
    }
    (doc.serialize(), diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inline(html: &str, css: &str) -> (String, Vec<Diagnostic>) {
        inline_css(html, &[css.to_string()])
    }

    #[test]
    fn inline_declarations_win_over_rules() {
        let (html, errors) = inline("<p style=\"color:red\">x</p>", "p { color: blue; margin: 0 }");
        assert_eq!(html, "<p style=\"margin:0;color:red;\">x</p>");
        assert!(errors.is_empty());
    }

    #[test]
    fn important_rule_beats_plain_inline_value() {
        let (html, _) = inline("<p style=\"color:red\">x</p>", "p { color: blue !important }");
        assert_eq!(html, "<p style=\"color:blue;\">x</p>");

        let (html, _) = inline("<p style=\"color:red !important\">x</p>", "p { color: blue !important }");
        assert_eq!(html, "<p style=\"color:red !important;\">x</p>");
    }

    #[test]
    fn specificity_orders_rules() {
        let css = "#a { color: green } .c { color: blue } p { color: red; }";
        let (html, _) = inline("<p id=\"a\" class=\"c\">x</p><p class=\"c\">y</p>", css);
        assert_eq!(html, "<p id=\"a\" class=\"c\" style=\"color:green;\">x</p><p class=\"c\" style=\"color:blue;\">y</p>");
    }

    #[test]
    fn later_rule_wins_on_equal_specificity() {
        let (html, _) = inline("<p class=\"a b\">x</p>", ".a { color: red } .b { color: blue }");
        assert_eq!(html, "<p class=\"a b\" style=\"color:blue;\">x</p>");
    }

    #[test]
    fn at_rules_comments_and_dynamic_selectors_are_skipped() {
        let css = "/* p { color: red } */ @media (max-width: 480px) { p { color: pink } } @import url(x.css); a:hover, a { color: blue }";
        let (html, errors) = inline("<p>x</p><a href=\"#\">y</a>", css);
        assert_eq!(html, "<p>x</p><a href=\"#\" style=\"color:blue;\">y</a>");
        assert!(errors.is_empty());
    }

    #[test]
    fn braces_and_semicolons_inside_strings_do_not_split() {
        let css = ".x { background: url(\"a;b.png\"); } .y { content: \"}\"; color: red } .z { content: \"{\" } p { color: blue }";
        let mut errors = Vec::new();
        let rules = parse_stylesheet(css, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0].declarations[0].value, "url(\"a;b.png\")");
        assert_eq!(rules[1].declarations.len(), 2);
        assert_eq!(rules[1].declarations[0].value, "\"}\"");
        assert_eq!(rules[1].declarations[1].value, "red");
        assert_eq!(rules[2].declarations[0].value, "\"{\"");
        assert_eq!(rules[3].declarations[0].value, "blue");
    }

    #[test]
    fn invalid_selectors_are_reported() {
        let (html, errors) = inline("<p>x</p>", "p:bogus { color: red } p { font-weight: bold }");
        assert_eq!(html, "<p style=\"font-weight:bold;\">x</p>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, DiagnosticKind::InvalidSelector);
    }

    #[test]
    fn head_elements_and_conditionals_are_left_alone() {
        let html = "<html><head><title>t</title></head><body><!--[if mso | IE]><table><![endif]--><div>x</div></body></html>";
        let (out, _) = inline(html, "* { color: red }");
        assert_eq!(
            out,
            "<html><head><title>t</title></head><body style=\"color:red;\"><!--[if mso | IE]><table><![endif]--><div style=\"color:red;\">x</div></body></html>"
        );
    }

    #[test]
    fn font_family_quotes_are_escaped() {
        let (html, _) = inline("<p>x</p>", "p { font-family: \"Open Sans\", sans-serif }");
        assert_eq!(html, "<p style=\"font-family:&quot;Open Sans&quot;, sans-serif;\">x</p>");
    }

    #[test]
    fn html_attributes_target_selectors() {
        let mut attributes = IndexMap::new();
        let mut set = AttributeMap::new();
        set.insert("data-id".to_string(), "42".to_string());
        set.insert("title".to_string(), "a \"b\"".to_string());
        attributes.insert(".custom div".to_string(), set);

        let html = "<div class=\"custom\"><div>x</div></div><div>y</div>";
        let (out, errors) = apply_html_attributes(html, &attributes);
        assert_eq!(
            out,
            "<div class=\"custom\"><div data-id=\"42\" title=\"a &quot;b&quot;\">x</div></div><div>y</div>"
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn html_attributes_with_bad_selector_report() {
        let mut attributes = IndexMap::new();
        attributes.insert("div[".to_string(), AttributeMap::from([("x".to_string(), "1".to_string())]));
        let (out, errors) = apply_html_attributes("<div></div>", &attributes);
        assert_eq!(out, "<div></div>");
        assert_eq!(errors[0].kind, DiagnosticKind::InvalidSelector);
        assert_eq!(errors[0].tag.as_deref(), Some("mj-selector"));
    }
}
