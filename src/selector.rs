//! CSS selectors: parsing, specificity and matching against an [`HtmlDocument`].
//!
//! Complex selectors are stored and matched right-to-left: `parts[0]` is the
//! subject compound, each later part is reached through the combinator stored
//! with the part before it.

use thiserror::Error;

use crate::html::{HtmlDocument, NodeId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("invalid selector '{selector}': {reason}")]
    Invalid { selector: String, reason: String },

    /// Valid CSS that cannot apply to a static document (`:hover`, `::before`).
    #[error("selector '{0}' depends on runtime state")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Eq,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    Root,
    Empty,
    /// `an+b`
    NthChild(i32, i32),
    Not(Box<CompoundSelector>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute {
        name: String,
        op: AttrOp,
        value: Option<String>,
    },
    PseudoClass(PseudoClass),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<(CompoundSelector, Option<Combinator>)>,
}

/// `(ids, classes/attributes/pseudo-classes, types)`, compared lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    fn add(self, other: Specificity) -> Specificity {
        Specificity(self.0 + other.0, self.1 + other.1, self.2 + other.2)
    }
}

const DYNAMIC_PSEUDO_CLASSES: &[&str] = &[
    "hover",
    "active",
    "focus",
    "focus-within",
    "focus-visible",
    "visited",
    "link",
    "any-link",
    "target",
    "checked",
    "disabled",
    "enabled",
    "placeholder-shown",
];

impl ComplexSelector {
    pub fn parse(input: &str) -> Result<ComplexSelector, SelectorError> {
        SelectorParser::new(input).parse_complex()
    }

    pub fn specificity(&self) -> Specificity {
        self.parts
            .iter()
            .fold(Specificity::default(), |acc, (compound, _)| acc.add(compound.specificity()))
    }

    pub fn matches(&self, doc: &HtmlDocument, id: NodeId) -> bool {
        let Some((subject, first_combinator)) = self.parts.first() else {
            return false;
        };
        let mut combinator = *first_combinator;
        if !subject.matches(doc, id) {
            return false;
        }

        let mut current = id;
        for (compound, next_combinator) in &self.parts[1..] {
            let found = match combinator {
                Some(Combinator::Descendant) => {
                    let mut ancestor = doc.parent_element(current);
                    loop {
                        match ancestor {
                            Some(a) if compound.matches(doc, a) => break Some(a),
                            Some(a) => ancestor = doc.parent_element(a),
                            None => break None,
                        }
                    }
                }
                Some(Combinator::Child) => doc
                    .parent_element(current)
                    .filter(|p| compound.matches(doc, *p)),
                Some(Combinator::NextSibling) => doc
                    .previous_element_sibling(current)
                    .filter(|s| compound.matches(doc, *s)),
                Some(Combinator::SubsequentSibling) => {
                    let mut sibling = doc.previous_element_sibling(current);
                    loop {
                        match sibling {
                            Some(s) if compound.matches(doc, s) => break Some(s),
                            Some(s) => sibling = doc.previous_element_sibling(s),
                            None => break None,
                        }
                    }
                }
                None => None,
            };
            match found {
                Some(node) => current = node,
                None => return false,
            }
            combinator = *next_combinator;
        }
        true
    }
}

impl CompoundSelector {
    fn specificity(&self) -> Specificity {
        self.simples.iter().fold(Specificity::default(), |acc, simple| {
            acc.add(match simple {
                SimpleSelector::Id(_) => Specificity(1, 0, 0),
                SimpleSelector::Class(_) | SimpleSelector::Attribute { .. } => Specificity(0, 1, 0),
                SimpleSelector::PseudoClass(PseudoClass::Not(inner)) => inner.specificity(),
                SimpleSelector::PseudoClass(_) => Specificity(0, 1, 0),
                SimpleSelector::Type(_) => Specificity(0, 0, 1),
                SimpleSelector::Universal => Specificity::default(),
            })
        })
    }

    pub fn matches(&self, doc: &HtmlDocument, id: NodeId) -> bool {
        doc.is_element(id) && self.simples.iter().all(|s| matches_simple(doc, id, s))
    }
}

fn matches_simple(doc: &HtmlDocument, id: NodeId, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(name) => doc.tag_name(id).is_some_and(|t| t.eq_ignore_ascii_case(name)),
        SimpleSelector::Id(expected) => doc.attribute(id, "id") == Some(expected.as_str()),
        SimpleSelector::Class(class) => doc
            .attribute(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class)),
        SimpleSelector::Attribute { name, op, value } => {
            let Some(actual) = doc.attribute(id, name) else {
                return false;
            };
            let expected = value.as_deref().unwrap_or("");
            match op {
                AttrOp::Exists => true,
                AttrOp::Eq => actual == expected,
                AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
                AttrOp::DashMatch => actual == expected || actual.starts_with(&format!("{}-", expected)),
                AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
                AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
                AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
            }
        }
        SimpleSelector::PseudoClass(pseudo) => matches_pseudo_class(doc, id, pseudo),
    }
}

fn matches_pseudo_class(doc: &HtmlDocument, id: NodeId, pseudo: &PseudoClass) -> bool {
    let siblings = doc.element_siblings(id);
    let position = siblings.iter().position(|s| *s == id).unwrap_or(0);
    let same_type = || -> Vec<NodeId> {
        let name = doc.tag_name(id).unwrap_or("");
        siblings
            .iter()
            .copied()
            .filter(|s| doc.tag_name(*s).is_some_and(|t| t.eq_ignore_ascii_case(name)))
            .collect()
    };

    match pseudo {
        PseudoClass::FirstChild => position == 0,
        PseudoClass::LastChild => position + 1 == siblings.len(),
        PseudoClass::OnlyChild => siblings.len() == 1,
        PseudoClass::FirstOfType => same_type().first() == Some(&id),
        PseudoClass::LastOfType => same_type().last() == Some(&id),
        PseudoClass::OnlyOfType => same_type().len() == 1,
        PseudoClass::Root => doc.parent_element(id).is_none(),
        PseudoClass::Empty => doc.node(id).children.is_empty(),
        PseudoClass::NthChild(a, b) => {
            // i64 keeps `n - b` in range for any i32 pair.
            let (a, b) = (i64::from(*a), i64::from(*b));
            let n = position as i64 + 1;
            if a == 0 {
                n == b
            } else {
                let diff = n - b;
                diff % a == 0 && diff / a >= 0
            }
        }
        PseudoClass::Not(inner) => !inner.matches(doc, id),
    }
}

struct SelectorParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> SelectorError {
        SelectorError::Invalid {
            selector: self.source.trim().to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii())
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        // Parsed left-to-right, stored right-to-left.
        let mut left_to_right: Vec<(CompoundSelector, Option<Combinator>)> = Vec::new();
        let mut pending: Option<Combinator> = None;

        loop {
            let compound = self.parse_compound()?;
            if compound.simples.is_empty() {
                return Err(self.invalid(match self.peek() {
                    Some(c) => format!("unexpected '{}'", c),
                    None => "expected a selector".to_string(),
                }));
            }
            left_to_right.push((compound, pending.take()));

            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None => break,
                Some('>') => Some(Combinator::Child),
                Some('+') => Some(Combinator::NextSibling),
                Some('~') => Some(Combinator::SubsequentSibling),
                Some(_) if had_space => {
                    pending = Some(Combinator::Descendant);
                    continue;
                }
                Some(c) => return Err(self.invalid(format!("unexpected '{}'", c))),
            };
            self.pos += 1;
            self.skip_whitespace();
            pending = combinator;
        }

        // Each part keeps the combinator linking it to the part on its left.
        let parts = left_to_right.into_iter().rev().collect();
        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                compound.simples.push(SimpleSelector::Universal);
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let name = self.identifier();
                compound.simples.push(SimpleSelector::Type(name.to_ascii_lowercase()));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    let id = self.identifier();
                    if id.is_empty() {
                        return Err(self.invalid("empty id"));
                    }
                    compound.simples.push(SimpleSelector::Id(id));
                }
                Some('.') => {
                    self.pos += 1;
                    let class = self.identifier();
                    if class.is_empty() {
                        return Err(self.invalid("empty class"));
                    }
                    compound.simples.push(SimpleSelector::Class(class));
                }
                Some('[') => {
                    self.pos += 1;
                    compound.simples.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.simples.push(self.parse_pseudo()?);
                }
                _ => break,
            }
        }
        Ok(compound)
    }

    fn parse_attribute(&mut self) -> Result<SimpleSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.identifier();
        if name.is_empty() {
            return Err(self.invalid("empty attribute name"));
        }
        self.skip_whitespace();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(SimpleSelector::Attribute {
                    name,
                    op: AttrOp::Exists,
                    value: None,
                });
            }
            Some('=') => AttrOp::Eq,
            Some('~') => AttrOp::Includes,
            Some('|') => AttrOp::DashMatch,
            Some('^') => AttrOp::Prefix,
            Some('$') => AttrOp::Suffix,
            Some('*') => AttrOp::Substring,
            _ => return Err(self.invalid("malformed attribute selector")),
        };
        self.pos += 1;
        if op != AttrOp::Eq {
            if self.peek() != Some('=') {
                return Err(self.invalid("malformed attribute operator"));
            }
            self.pos += 1;
        }
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(self.invalid("unterminated string"));
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                value
            }
            _ => self.identifier(),
        };
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.invalid("expected ']'"));
        }
        self.pos += 1;
        Ok(SimpleSelector::Attribute {
            name,
            op,
            value: Some(value),
        })
    }

    fn parse_pseudo(&mut self) -> Result<SimpleSelector, SelectorError> {
        if self.peek() == Some(':') {
            return Err(SelectorError::Unsupported(self.source.trim().to_string()));
        }
        let name = self.identifier().to_ascii_lowercase();
        let pseudo = match name.as_str() {
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            "root" => PseudoClass::Root,
            "empty" => PseudoClass::Empty,
            "nth-child" => {
                let argument = self.parenthesized()?;
                let (a, b) = parse_nth(&argument).ok_or_else(|| self.invalid("bad nth-child argument"))?;
                PseudoClass::NthChild(a, b)
            }
            "not" => {
                let argument = self.parenthesized()?;
                let mut inner = SelectorParser::new(&argument);
                let compound = inner.parse_compound()?;
                if compound.simples.is_empty() || inner.peek().is_some() {
                    return Err(self.invalid(":not() takes a compound selector"));
                }
                PseudoClass::Not(Box::new(compound))
            }
            // Pseudo-elements written with a single colon.
            "before" | "after" | "first-line" | "first-letter" => {
                return Err(SelectorError::Unsupported(self.source.trim().to_string()))
            }
            dynamic if DYNAMIC_PSEUDO_CLASSES.contains(&dynamic) => {
                return Err(SelectorError::Unsupported(self.source.trim().to_string()))
            }
            other => return Err(self.invalid(format!("unknown pseudo-class ':{}'", other))),
        };
        Ok(SimpleSelector::PseudoClass(pseudo))
    }

    fn parenthesized(&mut self) -> Result<String, SelectorError> {
        if self.peek() != Some('(') {
            return Err(self.invalid("expected '('"));
        }
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ')') {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.invalid("expected ')'"));
        }
        let argument: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Ok(argument.trim().to_string())
    }
}

/// Parse an `an+b` expression (`odd`, `even`, `3`, `2n+1`, `-n+3`).
fn parse_nth(argument: &str) -> Option<(i32, i32)> {
    let argument: String = argument.chars().filter(|c| !c.is_whitespace()).collect();
    match argument.to_ascii_lowercase().as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }
    let lower = argument.to_ascii_lowercase();
    match lower.split_once('n') {
        None => lower.parse().ok().map(|b| (0, b)),
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                a => a.parse().ok()?,
            };
            let b = if b.is_empty() { 0 } else { b.parse().ok()? };
            Some((a, b))
        }
    }
}

/// Split a selector list on top-level commas.
pub fn split_selector_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn select(html: &str, selector: &str) -> Vec<String> {
        let doc = HtmlDocument::parse(html);
        let selector = ComplexSelector::parse(selector).unwrap();
        doc.elements()
            .into_iter()
            .filter(|id| selector.matches(&doc, *id))
            .map(|id| doc.attribute(id, "id").unwrap_or("?").to_string())
            .collect()
    }

    const TREE: &str = "<div id=\"root\" class=\"box\"><p id=\"p1\" class=\"a b\">x</p><span id=\"s1\"></span><p id=\"p2\" data-kind=\"lead-in\"><em id=\"e1\"></em></p></div>";

    #[test]
    fn simple_selectors() {
        assert_eq!(select(TREE, "p"), vec!["p1", "p2"]);
        assert_eq!(select(TREE, ".b"), vec!["p1"]);
        assert_eq!(select(TREE, "#s1"), vec!["s1"]);
        assert_eq!(select(TREE, "p.a.b"), vec!["p1"]);
        assert_eq!(select(TREE, "[data-kind|=lead]"), vec!["p2"]);
        assert_eq!(select(TREE, "[data-kind^='lead']"), vec!["p2"]);
        assert_eq!(select(TREE, "*"), vec!["root", "p1", "s1", "p2", "e1"]);
    }

    #[test]
    fn combinators() {
        assert_eq!(select(TREE, ".box em"), vec!["e1"]);
        assert_eq!(select(TREE, "div > em"), Vec::<String>::new());
        assert_eq!(select(TREE, "p > em"), vec!["e1"]);
        assert_eq!(select(TREE, "p + span"), vec!["s1"]);
        assert_eq!(select(TREE, "p ~ p"), vec!["p2"]);
        assert_eq!(select(TREE, "div  >  p + span"), vec!["s1"]);
    }

    #[test]
    fn structural_pseudo_classes() {
        assert_eq!(select(TREE, "p:first-child"), vec!["p1"]);
        assert_eq!(select(TREE, "div > :last-child"), vec!["p2"]);
        assert_eq!(select(TREE, "p:last-of-type"), vec!["p2"]);
        assert_eq!(select(TREE, "div > :nth-child(2n+1)"), vec!["p1", "p2"]);
        assert_eq!(select(TREE, "p:not(.a)"), vec!["p2"]);
        assert_eq!(select(TREE, ":empty"), vec!["s1", "e1"]);
        assert_eq!(select(TREE, ":root"), vec!["root"]);
    }

    #[test]
    fn specificity_ordering() {
        let spec = |s: &str| ComplexSelector::parse(s).unwrap().specificity();
        assert_eq!(spec("#a .b p"), Specificity(1, 1, 1));
        assert_eq!(spec("p:not(.x)"), Specificity(0, 1, 1));
        assert!(spec("#a") > spec(".a.b.c"));
        assert!(spec(".a") > spec("div p span"));
    }

    #[test]
    fn dynamic_and_invalid_selectors() {
        assert!(matches!(ComplexSelector::parse("a:hover"), Err(SelectorError::Unsupported(_))));
        assert!(matches!(ComplexSelector::parse("p::before"), Err(SelectorError::Unsupported(_))));
        assert!(matches!(ComplexSelector::parse("p:bogus"), Err(SelectorError::Invalid { .. })));
        assert!(matches!(ComplexSelector::parse("> p"), Err(SelectorError::Invalid { .. })));
        assert!(matches!(ComplexSelector::parse("[x"), Err(SelectorError::Invalid { .. })));
    }

    #[test]
    fn selector_lists_split_at_top_level() {
        assert_eq!(split_selector_list("a, b > c ,[x=\"1,2\"], :not(.a)"), vec!["a", "b > c", "[x=\"1,2\"]", ":not(.a)"]);
        assert_eq!(parse_nth("odd"), Some((2, 1)));
        assert_eq!(parse_nth("-n+3"), Some((-1, 3)));
        assert_eq!(parse_nth("4"), Some((0, 4)));
    }

    #[test]
    fn extreme_nth_arguments_do_not_overflow() {
        assert_eq!(select(TREE, "p:nth-child(n-2147483648)"), vec!["p1", "p2"]);
        assert_eq!(select(TREE, "p:nth-child(-2147483648n+2147483647)"), Vec::<String>::new());
        assert_eq!(select(TREE, ":nth-child(2147483647n)"), Vec::<String>::new());
        assert!(matches!(
            ComplexSelector::parse("p:nth-child(n-99999999999)"),
            Err(SelectorError::Invalid { .. })
        ));
    }
}
