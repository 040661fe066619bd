use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MjmlError, MjmlResult};
use crate::security::SanitizerProfile;
use crate::validator::ValidationLevel;

/// Web fonts every compile knows about; `mj-font` and `fonts` add to or replace them.
pub const DEFAULT_FONTS: &[(&str, &str)] = &[
    ("Open Sans", "https://fonts.googleapis.com/css?family=Open+Sans:300,400,500,700"),
    ("Droid Sans", "https://fonts.googleapis.com/css?family=Droid+Sans:300,400,500,700"),
    ("Lato", "https://fonts.googleapis.com/css?family=Lato:300,400,500,700"),
    ("Roboto", "https://fonts.googleapis.com/css?family=Roboto:300,400,500,700"),
    ("Ubuntu", "https://fonts.googleapis.com/css?family=Ubuntu:300,400,500,700"),
];

/// Compile options, loadable from YAML.
///
/// ```yaml
/// validation-level: soft
/// keep-comments: false
/// fonts:
///   Inter: https://fonts.googleapis.com/css?family=Inter
/// sanitize: strict
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderOptions {
    /// Keep markup comments in the body as raw output.
    pub keep_comments: bool,
    pub validation_level: ValidationLevel,
    /// Extra or replacement web fonts, keyed by family name.
    pub fonts: IndexMap<String, String>,
    pub lang: String,
    pub dir: String,
    /// Schemes accepted in `href`/`src` attributes.
    pub allowed_url_schemes: Vec<String>,
    /// Sanitize text and button content with this profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<SanitizerProfile>,
    /// Collapse whitespace inside Outlook conditional blocks.
    pub minify_outlook: bool,
    /// Duplicate column media queries under `[owa]` for Outlook Web App.
    pub force_owa_desktop: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            keep_comments: true,
            validation_level: ValidationLevel::Strict,
            fonts: IndexMap::new(),
            lang: "und".to_string(),
            dir: "auto".to_string(),
            allowed_url_schemes: ["https", "http", "mailto", "tel"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sanitize: None,
            minify_outlook: true,
            force_owa_desktop: false,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> MjmlResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> MjmlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MjmlError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Default fonts overlaid with the configured ones.
    pub fn font_table(&self) -> IndexMap<String, String> {
        let mut fonts: IndexMap<String, String> = DEFAULT_FONTS
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect();
        for (name, url) in &self.fonts {
            fonts.insert(name.clone(), url.clone());
        }
        fonts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(RenderOptions::from_yaml_str("").unwrap(), RenderOptions::default());
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let yaml = r#"
validation-level: soft
keep-comments: false
fonts:
  Inter: https://fonts.example.com/inter.css
sanitize: strict
"#;
        let options = RenderOptions::from_yaml_str(yaml).unwrap();
        assert_eq!(options.validation_level, ValidationLevel::Soft);
        assert!(!options.keep_comments);
        assert_eq!(options.sanitize, Some(SanitizerProfile::Strict));
        assert_eq!(options.lang, "und");
        assert!(options.minify_outlook);

        let fonts = options.font_table();
        assert_eq!(fonts.get("Inter").map(String::as_str), Some("https://fonts.example.com/inter.css"));
        assert!(fonts.contains_key("Ubuntu"));
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let result = RenderOptions::from_yaml_str("validation-level: [");
        assert!(matches!(result, Err(MjmlError::Config(_))));
    }

    #[test]
    fn unknown_level_is_config_error() {
        let result = RenderOptions::from_yaml_str("validation-level: lenient");
        assert!(matches!(result, Err(MjmlError::Config(_))));
    }
}
