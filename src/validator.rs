//! Attribute schemas: declared types, defaults and the resolution order of
//! attribute values.

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::context::{AttributeMap, GlobalData};
use crate::error::{Diagnostic, DiagnosticKind, MjmlError, MjmlResult};
use crate::node::Node;

/// Attributes every component accepts without declaring them.
pub const PASSTHROUGH_ATTRIBUTES: &[&str] = &["css-class", "mj-class"];

/// How strictly explicit markup attributes are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Schema violations abort the compile.
    #[default]
    Strict,
    /// Schema violations are reported and the value is kept.
    Soft,
    /// No checks.
    Skip,
}

/// A declared attribute type such as `enum(left,right)` or `unit(px,%){1,4}`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    String,
    Integer,
    Boolean,
    Color,
    Unit {
        units: Vec<String>,
        allow_negative: bool,
        /// Accepted token count for shorthand values, e.g. `{1,4}`.
        count: (usize, usize),
    },
    Enum(Vec<String>),
}

impl TypeSpec {
    /// Parse a type specifier; unrecognised specifiers fall back to `String`.
    pub fn parse(spec: &str) -> TypeSpec {
        static SPEC_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = SPEC_REGEX.get_or_init(|| {
            Regex::new(r"^(unitWithNegative|unit|enum)\(([^)]*)\)(?:\{(\d+),(\d+)\})?$").unwrap()
        });

        let spec = spec.trim();
        match spec {
            "string" => return TypeSpec::String,
            "integer" => return TypeSpec::Integer,
            "boolean" => return TypeSpec::Boolean,
            "color" => return TypeSpec::Color,
            _ => {}
        }

        let Some(caps) = re.captures(spec) else {
            debug!("unrecognised attribute type '{}', treating as string", spec);
            return TypeSpec::String;
        };

        let list: Vec<String> = caps[2].split(',').map(|s| s.trim().to_string()).collect();
        match &caps[1] {
            "enum" => TypeSpec::Enum(list),
            kind => {
                let min = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
                let max = caps.get(4).and_then(|m| m.as_str().parse().ok()).unwrap_or(1);
                TypeSpec::Unit {
                    units: list,
                    allow_negative: kind == "unitWithNegative",
                    count: (min, max),
                }
            }
        }
    }

    /// Check a value, returning a description of what was expected on failure.
    ///
    /// Unit values are accepted as-is; their numeric meaning is resolved at
    /// render time by the shorthand helpers.
    pub fn check(&self, value: &str) -> Result<(), String> {
        match self {
            TypeSpec::String | TypeSpec::Color | TypeSpec::Unit { .. } => Ok(()),
            TypeSpec::Integer => value
                .trim()
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| "an integer".to_string()),
            TypeSpec::Boolean => match value {
                "true" | "false" => Ok(()),
                _ => Err("'true' or 'false'".to_string()),
            },
            TypeSpec::Enum(allowed) => {
                if allowed.iter().any(|a| a == value) {
                    Ok(())
                } else {
                    Err(format!("one of: {}", allowed.join(", ")))
                }
            }
        }
    }
}

/// Outcome of checking one explicit attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeCheck {
    Valid,
    Unknown,
    Invalid { expected: String },
}

/// Declared attributes and defaults of one component.
#[derive(Debug, Clone)]
pub struct Schema {
    tag: String,
    types: IndexMap<String, TypeSpec>,
    defaults: AttributeMap,
}

impl Schema {
    pub fn build(tag: &str, allowed: &[(&str, &str)], defaults: &[(&str, &str)]) -> Schema {
        Schema {
            tag: tag.to_string(),
            types: allowed
                .iter()
                .map(|(name, spec)| (name.to_string(), TypeSpec::parse(spec)))
                .collect(),
            defaults: defaults
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn type_of(&self, name: &str) -> Option<&TypeSpec> {
        self.types.get(name)
    }

    pub fn defaults(&self) -> &AttributeMap {
        &self.defaults
    }

    pub fn check(&self, name: &str, value: &str) -> AttributeCheck {
        if PASSTHROUGH_ATTRIBUTES.contains(&name) {
            return AttributeCheck::Valid;
        }
        match self.types.get(name) {
            None => AttributeCheck::Unknown,
            Some(spec) => match spec.check(value) {
                Ok(()) => AttributeCheck::Valid,
                Err(expected) => AttributeCheck::Invalid { expected },
            },
        }
    }

    /// Merge the final attribute map for `node`.
    ///
    /// Priority, highest first: explicit markup, `mj-class` per-tag
    /// overrides, `mj-class` bundles, per-tag head defaults, `mj-all`,
    /// built-in defaults. Head defaults are skipped when `global` is `None`.
    pub fn resolve(
        &self,
        node: &Node,
        global: Option<&GlobalData>,
        level: ValidationLevel,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> MjmlResult<AttributeMap> {
        let mut attributes = self.defaults.clone();

        if let Some(global) = global {
            if let Some(all) = global.head_attributes.get("mj-all") {
                self.inherit_all(&mut attributes, all, "mj-all", level, diagnostics);
            }
            if let Some(own) = global.head_attributes.get(&self.tag) {
                self.inherit_all(&mut attributes, own, "mj-attributes", level, diagnostics);
            }

            let classes: Vec<&str> = node
                .attribute("mj-class")
                .map(|c| c.split_whitespace().collect())
                .unwrap_or_default();

            let mut css_classes: Vec<&str> = Vec::new();
            for class in &classes {
                if let Some(bundle) = global.classes.get(*class) {
                    for (name, value) in bundle {
                        if name == "css-class" {
                            css_classes.push(value.as_str());
                        } else {
                            self.inherit(&mut attributes, name, value, class, level, diagnostics);
                        }
                    }
                }
            }
            for class in &classes {
                if let Some(per_tag) = global
                    .classes_default
                    .get(*class)
                    .and_then(|tags| tags.get(&self.tag))
                {
                    self.inherit_all(&mut attributes, per_tag, class, level, diagnostics);
                }
            }
            if !css_classes.is_empty() {
                attributes.insert("css-class".to_string(), css_classes.join(" "));
            }
        }

        for (name, value) in &node.attributes {
            if name == "mj-class" {
                continue;
            }
            if level == ValidationLevel::Skip {
                attributes.insert(name.clone(), value.clone());
                continue;
            }
            match self.check(name, value) {
                AttributeCheck::Valid => {
                    attributes.insert(name.clone(), value.clone());
                }
                AttributeCheck::Unknown => {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::UnknownAttribute,
                            format!(
                                "attribute '{}' is not declared (line {})",
                                name, node.line
                            ),
                        )
                        .with_tag(&self.tag),
                    );
                }
                AttributeCheck::Invalid { expected } => {
                    if level == ValidationLevel::Strict {
                        return Err(MjmlError::InvalidAttributeValue {
                            tag: self.tag.clone(),
                            attribute: name.clone(),
                            value: value.clone(),
                            expected,
                        });
                    }
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::InvalidAttribute,
                            format!("'{}' is not a valid '{}', expected {}", value, name, expected),
                        )
                        .with_tag(&self.tag),
                    );
                    attributes.insert(name.clone(), value.clone());
                }
            }
        }

        Ok(attributes)
    }

    fn inherit_all(
        &self,
        attributes: &mut AttributeMap,
        inherited: &AttributeMap,
        source: &str,
        level: ValidationLevel,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for (name, value) in inherited {
            self.inherit(attributes, name, value, source, level, diagnostics);
        }
    }

    /// Merge a value set in `mj-head`. Values the schema rejects are
    /// reported and dropped; names the component does not declare pass.
    fn inherit(
        &self,
        attributes: &mut AttributeMap,
        name: &str,
        value: &str,
        source: &str,
        level: ValidationLevel,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if level != ValidationLevel::Skip {
            if let AttributeCheck::Invalid { expected } = self.check(name, value) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::InvalidAttribute,
                        format!(
                            "'{}' from {} is not a valid '{}', expected {}",
                            value, source, name, expected
                        ),
                    )
                    .with_tag(&self.tag),
                );
                return;
            }
        }
        attributes.insert(name.to_string(), value.to_string());
    }
}

fn invalid_enum(tag: &str, attribute: &str, value: &str, expected: &str) -> MjmlError {
    MjmlError::InvalidAttributeValue {
        tag: tag.to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
        expected: format!("one of: {}", expected),
    }
}

/// Parse an enum-valued attribute into its Rust type, attributing errors to `tag`.
pub fn parse_enum<T: FromStr<Err = String>>(tag: &str, attribute: &str, value: &str) -> MjmlResult<T> {
    value
        .parse::<T>()
        .map_err(|expected| invalid_enum(tag, attribute, value, &expected))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }
}

impl FromStr for Align {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Align::Left),
            "center" => Ok(Align::Center),
            "right" => Ok(Align::Right),
            "justify" => Ok(Align::Justify),
            _ => Err("left, center, right, justify".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            VerticalAlign::Top => "top",
            VerticalAlign::Middle => "middle",
            VerticalAlign::Bottom => "bottom",
        }
    }
}

impl FromStr for VerticalAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(VerticalAlign::Top),
            "middle" => Ok(VerticalAlign::Middle),
            "bottom" => Ok(VerticalAlign::Bottom),
            _ => Err("top, middle, bottom".to_string()),
        }
    }
}

/// Text direction of a section or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

impl FromStr for TextDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ltr" => Ok(TextDirection::Ltr),
            "rtl" => Ok(TextDirection::Rtl),
            _ => Err("ltr, rtl".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_schema() -> Schema {
        Schema::build(
            "mj-text",
            &[
                ("align", "enum(left,right,center,justify)"),
                ("color", "color"),
                ("padding", "unit(px,%){1,4}"),
                ("letter-spacing", "unitWithNegative(px,em)"),
                ("rows", "integer"),
            ],
            &[("align", "left"), ("color", "#000000")],
        )
    }

    #[test]
    fn type_spec_parsing() {
        assert_eq!(TypeSpec::parse("color"), TypeSpec::Color);
        assert_eq!(
            TypeSpec::parse("enum(left,right)"),
            TypeSpec::Enum(vec!["left".into(), "right".into()])
        );
        assert_eq!(
            TypeSpec::parse("unit(px,%){1,4}"),
            TypeSpec::Unit {
                units: vec!["px".into(), "%".into()],
                allow_negative: false,
                count: (1, 4)
            }
        );
        assert!(matches!(
            TypeSpec::parse("unitWithNegative(px)"),
            TypeSpec::Unit { allow_negative: true, .. }
        ));
        assert_eq!(TypeSpec::parse("something-else"), TypeSpec::String);
    }

    #[test]
    fn checks_by_type() {
        let schema = text_schema();
        assert_eq!(schema.check("align", "center"), AttributeCheck::Valid);
        assert!(matches!(schema.check("align", "middle"), AttributeCheck::Invalid { .. }));
        assert_eq!(schema.check("padding", "whatever"), AttributeCheck::Valid);
        assert_eq!(schema.check("rows", "3"), AttributeCheck::Valid);
        assert!(matches!(schema.check("rows", "three"), AttributeCheck::Invalid { .. }));
        assert_eq!(schema.check("css-class", "x"), AttributeCheck::Valid);
        assert_eq!(schema.check("href", "x"), AttributeCheck::Unknown);
    }

    #[test]
    fn strict_level_rejects_bad_enum() {
        let node = Node::new("mj-text").with_attribute("align", "middle");
        let result = text_schema().resolve(&node, None, ValidationLevel::Strict, &mut Vec::new());
        assert!(matches!(
            result,
            Err(MjmlError::InvalidAttributeValue { ref attribute, .. }) if attribute == "align"
        ));
    }

    #[test]
    fn soft_level_reports_and_keeps_value() {
        let node = Node::new("mj-text").with_attribute("align", "middle");
        let mut diagnostics = Vec::new();
        let attrs = text_schema()
            .resolve(&node, None, ValidationLevel::Soft, &mut diagnostics)
            .unwrap();
        assert_eq!(attrs["align"], "middle");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidAttribute);
    }

    #[test]
    fn unknown_attributes_are_dropped_and_reported() {
        let node = Node::new("mj-text").with_attribute("onclick", "x");
        let mut diagnostics = Vec::new();
        let attrs = text_schema()
            .resolve(&node, None, ValidationLevel::Strict, &mut diagnostics)
            .unwrap();
        assert!(!attrs.contains_key("onclick"));
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownAttribute);
    }

    #[test]
    fn resolution_priority() {
        let mut global = GlobalData::default();
        let mut all = AttributeMap::new();
        all.insert("color".into(), "#aaaaaa".into());
        all.insert("padding".into(), "1px".into());
        global.add_head_attributes("mj-all", &all);

        let mut class = AttributeMap::new();
        class.insert("color".into(), "#bbbbbb".into());
        global.add_class("brand", class);

        let schema = text_schema();

        let explicit = Node::new("mj-text")
            .with_attribute("mj-class", "brand")
            .with_attribute("color", "#cccccc");
        let attrs = schema
            .resolve(&explicit, Some(&global), ValidationLevel::Strict, &mut Vec::new())
            .unwrap();
        assert_eq!(attrs["color"], "#cccccc");

        let classed = Node::new("mj-text").with_attribute("mj-class", "brand");
        let attrs = schema
            .resolve(&classed, Some(&global), ValidationLevel::Strict, &mut Vec::new())
            .unwrap();
        assert_eq!(attrs["color"], "#bbbbbb");
        assert_eq!(attrs["padding"], "1px");
        assert_eq!(attrs["align"], "left");
        assert!(!attrs.contains_key("mj-class"));
    }

    #[test]
    fn per_tag_head_default_beats_mj_all() {
        let mut global = GlobalData::default();
        let mut all = AttributeMap::new();
        all.insert("color".into(), "red".into());
        global.add_head_attributes("mj-all", &all);
        let mut own = AttributeMap::new();
        own.insert("color".into(), "green".into());
        global.add_head_attributes("mj-text", &own);

        let attrs = text_schema()
            .resolve(&Node::new("mj-text"), Some(&global), ValidationLevel::Strict, &mut Vec::new())
            .unwrap();
        assert_eq!(attrs["color"], "green");
    }

    #[test]
    fn class_css_classes_accumulate() {
        let mut global = GlobalData::default();
        let mut a = AttributeMap::new();
        a.insert("css-class".into(), "one".into());
        global.add_class("a", a);
        let mut b = AttributeMap::new();
        b.insert("css-class".into(), "two".into());
        global.add_class("b", b);

        let node = Node::new("mj-text").with_attribute("mj-class", "a b");
        let attrs = text_schema()
            .resolve(&node, Some(&global), ValidationLevel::Strict, &mut Vec::new())
            .unwrap();
        assert_eq!(attrs["css-class"], "one two");
    }

    #[test]
    fn invalid_head_values_are_reported_and_dropped() {
        let mut global = GlobalData::default();
        let mut all = AttributeMap::new();
        all.insert("align".into(), "sideways".into());
        all.insert("font-family".into(), "Inter".into());
        global.add_head_attributes("mj-all", &all);
        let mut class = AttributeMap::new();
        class.insert("rows".into(), "many".into());
        global.add_class("dense", class);

        let node = Node::new("mj-text").with_attribute("mj-class", "dense");
        let mut diagnostics = Vec::new();
        let attrs = text_schema()
            .resolve(&node, Some(&global), ValidationLevel::Strict, &mut diagnostics)
            .unwrap();
        assert_eq!(attrs["align"], "left");
        assert!(!attrs.contains_key("rows"));
        assert_eq!(attrs["font-family"], "Inter");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.kind == DiagnosticKind::InvalidAttribute));
        assert!(diagnostics[0].message.contains("from mj-all"));
        assert!(diagnostics[1].message.contains("from dense"));

        let mut diagnostics = Vec::new();
        let attrs = text_schema()
            .resolve(&node, Some(&global), ValidationLevel::Skip, &mut diagnostics)
            .unwrap();
        assert_eq!(attrs["align"], "sideways");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn typed_enums() {
        assert_eq!("center".parse::<Align>(), Ok(Align::Center));
        assert!("middle".parse::<Align>().is_err());
        assert_eq!("rtl".parse::<TextDirection>(), Ok(TextDirection::Rtl));
        let err = parse_enum::<VerticalAlign>("mj-column", "vertical-align", "centre").unwrap_err();
        assert!(err.to_string().contains("vertical-align"));
    }
}
