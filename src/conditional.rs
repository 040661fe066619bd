//! Outlook conditional comments.
//!
//! Desktop Outlook renders with Word and needs table scaffolding every other
//! client must ignore. That scaffolding lives in `<!--[if mso | IE]>` blocks.

use regex::Regex;
use std::sync::OnceLock;

pub const START_CONDITIONAL: &str = "<!--[if mso | IE]>";
pub const START_NEGATION_CONDITIONAL: &str = "<!--[if !mso | IE]><!-->";
pub const END_CONDITIONAL: &str = "<![endif]-->";
pub const END_NEGATION_CONDITIONAL: &str = "<!--<![endif]-->";

pub const START_MSO_CONDITIONAL: &str = "<!--[if mso]>";
pub const START_MSO_NEGATION_CONDITIONAL: &str = "<!--[if !mso]><!-->";

/// Show `content` only to Outlook/IE, or only to everything else when `negation` is set.
pub fn wrap(content: &str, negation: bool) -> String {
    if negation {
        format!("{}{}{}", START_NEGATION_CONDITIONAL, content, END_NEGATION_CONDITIONAL)
    } else {
        format!("{}{}{}", START_CONDITIONAL, content, END_CONDITIONAL)
    }
}

/// Like [`wrap`], but targets Outlook only (not IE).
pub fn wrap_mso(content: &str, negation: bool) -> String {
    if negation {
        format!("{}{}{}", START_MSO_NEGATION_CONDITIONAL, content, END_NEGATION_CONDITIONAL)
    } else {
        format!("{}{}{}", START_MSO_CONDITIONAL, content, END_CONDITIONAL)
    }
}

/// Join adjacent Outlook blocks: `<![endif]--><!--[if mso | IE]>` disappears.
pub fn merge_outlook_conditionals(html: &str) -> String {
    static MERGE_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = MERGE_REGEX
        .get_or_init(|| Regex::new(r"(<!\[endif\]-->\s*?<!--\[if mso \| IE\]>)").unwrap());
    re.replace_all(html, "").into_owned()
}

/// Drop whitespace between tags inside conditional blocks and squeeze runs of spaces.
pub fn minify_outlook_conditionals(html: &str) -> String {
    static BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
    static BETWEEN_TAGS_REGEX: OnceLock<Regex> = OnceLock::new();
    static SPACES_REGEX: OnceLock<Regex> = OnceLock::new();

    let block = BLOCK_REGEX
        .get_or_init(|| Regex::new(r"(<!--\[if\s[^\]]+\]>)([\s\S]*?)(<!\[endif\]-->)").unwrap());
    let between_tags = BETWEEN_TAGS_REGEX.get_or_init(|| Regex::new(r"(^|>)(\s+)(<|$)").unwrap());
    let spaces = SPACES_REGEX.get_or_init(|| Regex::new(r"\s{2,}").unwrap());

    block
        .replace_all(html, |caps: &regex::Captures| {
            let inner = between_tags.replace_all(&caps[2], "$1$3");
            let inner = spaces.replace_all(&inner, " ");
            format!("{}{}{}", &caps[1], inner, &caps[3])
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrap_variants() {
        assert_eq!(wrap("<td>", false), "<!--[if mso | IE]><td><![endif]-->");
        assert_eq!(wrap("<div>", true), "<!--[if !mso | IE]><!--><div><!--<![endif]-->");
        assert_eq!(wrap_mso("<xml>", false), "<!--[if mso]><xml><![endif]-->");
        assert_eq!(wrap_mso("<link>", true), "<!--[if !mso]><!--><link><!--<![endif]-->");
    }

    #[test]
    fn adjacent_blocks_merge() {
        let html = format!("{}\n  {}", wrap("<tr>", false), wrap("<td>", false));
        assert_eq!(merge_outlook_conditionals(&html), "<!--[if mso | IE]><tr><td><![endif]-->");
    }

    #[test]
    fn negated_blocks_do_not_merge() {
        let html = format!("{}{}", wrap("<tr>", false), wrap("<div>", true));
        assert_eq!(merge_outlook_conditionals(&html), html);
    }

    #[test]
    fn minify_only_touches_conditional_blocks() {
        let html = "<p>  a  </p><!--[if mso | IE]>\n  <table>\n    <tr>   <td  class=\"x\">\n<![endif]-->";
        assert_eq!(
            minify_outlook_conditionals(html),
            "<p>  a  </p><!--[if mso | IE]><table><tr><td class=\"x\"><![endif]-->"
        );
    }
}
