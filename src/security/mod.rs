//! Hardening for externally supplied HTML and URLs.
//!
//! Components call into this module; nothing here knows about components.

mod sanitizer;
mod url;

pub use sanitizer::{Sanitizer, SanitizerProfile, DEFAULT_MAX_INPUT_LEN};
pub use url::UrlValidator;
