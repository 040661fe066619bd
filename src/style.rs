//! Inline style maps produced by components and CSS declaration lists
//! consumed by the inliner.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, QualifiedRuleParser,
    RuleBodyItemParser, RuleBodyParser, Token,
};

/// Ordered `property -> value` pairs; `None` and empty values are skipped on output.
pub type StyleMap = Vec<(&'static str, Option<String>)>;

/// Named style slots of a component, e.g. `"table"` or `"td"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Styles {
    slots: Vec<(&'static str, StyleMap)>,
}

impl Styles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(mut self, name: &'static str, style: StyleMap) -> Self {
        self.slots.push((name, style));
        self
    }

    pub fn get(&self, name: &str) -> Option<&StyleMap> {
        self.slots.iter().find(|(n, _)| *n == name).map(|(_, s)| s)
    }
}

/// Serialize a style map as `prop:value;prop:value;`.
pub fn serialize_style(style: &StyleMap) -> String {
    style
        .iter()
        .filter_map(|(prop, value)| match value {
            Some(v) if !v.is_empty() => Some(format!("{}:{};", prop, v)),
            _ => None,
        })
        .collect()
}

/// Shorthand for a style entry from an optional attribute value.
pub fn opt(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Shorthand for a style entry with a fixed value.
pub fn val(value: impl Into<String>) -> Option<String> {
    Some(value.into())
}

/// One `property: value` pair of a CSS declaration block.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// Parse a declaration block (`color:red; font-size: 12px !important`).
///
/// Fragments without a colon or with an empty side are dropped. Strings,
/// escapes and `url(...)` are tokenized, so `;` inside them does not split.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_declaration_list(&mut parser)
}

/// Collect the declarations of a block the caller is positioned in.
pub(crate) fn parse_declaration_list<'i>(input: &mut Parser<'i, '_>) -> Vec<Declaration> {
    let mut declarations = DeclarationListParser;
    RuleBodyParser::new(input, &mut declarations)
        .flatten()
        .collect()
}

struct DeclarationListParser;

impl<'i> DeclarationParser<'i> for DeclarationListParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        let mut end = start;
        let mut important = false;
        while let Ok(token) = input.next().cloned() {
            match token {
                Token::Delim('!') => {
                    if input
                        .try_parse(|i| i.expect_ident_matching("important"))
                        .is_ok()
                    {
                        important = true;
                    }
                }
                // Consume the block now so the position lands after its close.
                Token::Function(_)
                | Token::ParenthesisBlock
                | Token::SquareBracketBlock
                | Token::CurlyBracketBlock => {
                    input.parse_nested_block(|block| {
                        while block.next().is_ok() {}
                        Ok::<_, ParseError<'i, ()>>(())
                    })?;
                }
                _ => {}
            }
            if !important {
                end = input.position();
            }
        }

        let value = input.slice(start..end).trim();
        if value.is_empty() {
            return Err(input.new_custom_error::<(), ()>(()));
        }
        Ok(Declaration {
            property: name.to_ascii_lowercase(),
            value: value.to_string(),
            important,
        })
    }
}

impl<'i> AtRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, Declaration, ()> for DeclarationListParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Serialize declarations back into an inline `style` value.
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| {
            if d.important {
                format!("{}:{} !important;", d.property, d.value)
            } else {
                format!("{}:{};", d.property, d.value)
            }
        })
        .collect()
}
