use regex::Regex;
use std::sync::OnceLock;

use crate::error::{MjmlError, MjmlResult};

/// Schemes that are never safe, whatever the allow-list says.
const DENIED_SCHEMES: &[&str] = &["javascript", "vbscript", "data", "file", "mhtml", "x-javascript"];

const DEFAULT_SCHEMES: &[&str] = &["https", "http", "mailto", "tel"];

/// Classifies URLs as safe or unsafe by scheme.
///
/// Relative and schemeless URLs are always safe. Absolute URLs must use an
/// allowed scheme that is not on the deny-list.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlValidator {
    allowed_schemes: Vec<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::with_schemes(DEFAULT_SCHEMES)
    }
}

impl UrlValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_schemes: schemes
                .into_iter()
                .map(|s| s.as_ref().trim().trim_end_matches(':').to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn https_only() -> Self {
        Self::with_schemes(["https"])
    }

    pub fn allowed_schemes(&self) -> &[String] {
        &self.allowed_schemes
    }

    pub fn is_valid(&self, url: &str) -> bool {
        match scheme(url) {
            None => true,
            Some(scheme) => {
                !DENIED_SCHEMES.contains(&scheme.as_str()) && self.allowed_schemes.iter().any(|s| *s == scheme)
            }
        }
    }

    pub fn assert_valid(&self, url: &str) -> MjmlResult<()> {
        if self.is_valid(url) {
            Ok(())
        } else {
            Err(MjmlError::InvalidUrl { url: url.to_string() })
        }
    }

    /// The URL unchanged when safe, otherwise an empty string.
    pub fn sanitize(&self, url: &str) -> String {
        if self.is_valid(url) {
            url.to_string()
        } else {
            String::new()
        }
    }
}

/// The lowercase scheme of an absolute URL, `None` for relative ones.
///
/// Whitespace and control characters are ignored, as browsers do when they
/// resolve `java\tscript:` style URLs.
fn scheme(url: &str) -> Option<String> {
    static SCHEME_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = SCHEME_REGEX.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").unwrap());

    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    if cleaned.starts_with(['/', '.', '#', '?']) {
        return None;
    }
    re.captures(&cleaned).map(|caps| caps[1].to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_policy() {
        let validator = UrlValidator::default();
        assert!(!validator.is_valid("javascript:alert(1)"));
        assert!(validator.is_valid("/relative/path"));
        assert!(validator.is_valid("https://example.com"));
        assert!(validator.is_valid("mailto:someone@example.com"));
        assert!(validator.is_valid("tel:+15551234"));
        assert!(validator.is_valid("#top"));
        assert!(validator.is_valid("?a=1"));
        assert!(validator.is_valid("./img.png"));
        assert!(validator.is_valid("example.com/path"));
        assert!(!validator.is_valid("ftp://example.com"));
    }

    #[test]
    fn https_only() {
        let validator = UrlValidator::https_only();
        assert!(!validator.is_valid("http://x"));
        assert!(validator.is_valid("https://x"));
        assert!(validator.is_valid("/still/relative"));
    }

    #[test]
    fn denied_schemes_ignore_case_and_hidden_whitespace() {
        let validator = UrlValidator::with_schemes(["javascript", "data", "https"]);
        assert!(!validator.is_valid("JavaScript:alert(1)"));
        assert!(!validator.is_valid(" java\tscript:alert(1)"));
        assert!(!validator.is_valid("java\u{0}script:alert(1)"));
        assert!(!validator.is_valid("data:text/html;base64,AAAA"));
        assert!(!validator.is_valid("VBScript:msgbox"));
    }

    #[test]
    fn custom_schemes_are_normalized() {
        let validator = UrlValidator::with_schemes(vec!["HTTPS:".to_string(), " cid ".to_string()]);
        assert_eq!(validator.allowed_schemes(), &["https".to_string(), "cid".to_string()]);
        assert!(validator.is_valid("cid:logo@mail"));
    }

    #[test]
    fn sanitize_and_assert() {
        let validator = UrlValidator::default();
        assert_eq!(validator.sanitize("javascript:void(0)"), "");
        assert_eq!(validator.sanitize("https://a.b/c?d"), "https://a.b/c?d");
        assert!(matches!(
            validator.assert_valid("vbscript:x"),
            Err(MjmlError::InvalidUrl { url }) if url == "vbscript:x"
        ));
        assert!(validator.assert_valid("/ok").is_ok());
    }
}
