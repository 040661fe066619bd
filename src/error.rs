use serde::Serialize;
use thiserror::Error;

pub type MjmlResult<T> = Result<T, MjmlError>;

/// Conditions that abort a compile (or an explicit validity assertion).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MjmlError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unknown tag <{tag}> at line {line}, column {column}")]
    UnknownTag {
        tag: String,
        line: usize,
        column: usize,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{tag}>. Expected {expected}")]
    InvalidAttributeValue {
        tag: String,
        attribute: String,
        value: String,
        expected: String,
    },

    #[error("Unsafe URL '{url}'")]
    InvalidUrl { url: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for MjmlError {
    fn from(err: serde_yaml::Error) -> Self {
        MjmlError::Config(err.to_string())
    }
}

/// Category of a non-fatal problem found while compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// An attribute the component does not declare.
    UnknownAttribute,
    /// A schema violation tolerated by a soft validation level.
    InvalidAttribute,
    /// Paddings and borders exceed the available width.
    NegativeWidth,
    /// A stylesheet selector that could not be parsed.
    InvalidSelector,
    /// A head or body element used outside its section.
    MisplacedElement,
    /// A required element that is absent; an empty one is rendered instead.
    MissingElement,
    /// A link or image URL rejected by the URL policy and emptied.
    UnsafeUrl,
}

/// A degradable error reported alongside the compiled output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "<{}>: {}", tag, self.message),
            None => f.write_str(&self.message),
        }
    }
}
