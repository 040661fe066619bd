//! # mjml-email
//!
//! Compiles MJML, a component markup for responsive email, into standalone
//! HTML that survives Outlook, Gmail and the other inbox renderers.
//!
//! ## Features
//! - Registry-driven parsing with line/column errors
//! - Attribute resolution from `mj-attributes`, `mj-class` and built-in defaults
//! - Section/column/text/image/button/raw body components with Outlook fallbacks
//! - Responsive column media queries and web-font detection
//! - CSS inlining of `<mj-style inline="inline">` with specificity ordering
//! - Optional HTML sanitizer and URL scheme policy
//!
//! ## Example
//! ```
//! use mjml_email::render;
//!
//! let markup = r#"
//! <mjml>
//!   <mj-body>
//!     <mj-section>
//!       <mj-column>
//!         <mj-text>Hello World</mj-text>
//!       </mj-column>
//!     </mj-section>
//!   </mj-body>
//! </mjml>
//! "#;
//!
//! let output = render(markup).expect("valid markup");
//! assert!(output.html.contains("Hello World"));
//! ```

pub mod components;
pub mod conditional;
pub mod context;
pub mod error;
pub mod head;
pub mod html;
pub mod inliner;
pub mod node;
pub mod options;
pub mod parser;
pub mod registry;
pub mod renderer;
pub mod security;
pub mod selector;
pub mod shorthand;
pub mod skeleton;
pub mod style;
pub mod validator;

// --- Core types ---
pub use context::{Collector, GlobalData, RenderContext};
pub use error::{Diagnostic, DiagnosticKind, MjmlError, MjmlResult};
pub use node::Node;
pub use options::RenderOptions;
pub use registry::{ComponentKind, ComponentSpec, Registry};
pub use renderer::{RenderOutput, Renderer};
pub use validator::ValidationLevel;

// --- Parsing ---
pub use parser::{parse, parse_with_registry, ParserOptions};

// --- Security ---
pub use security::{Sanitizer, SanitizerProfile, UrlValidator};

/// Compile markup with the core components and default options.
pub fn render(markup: &str) -> MjmlResult<RenderOutput> {
    render_with_options(markup, &RenderOptions::default())
}

/// Compile markup with the core components.
pub fn render_with_options(markup: &str, options: &RenderOptions) -> MjmlResult<RenderOutput> {
    Renderer::new(Registry::core(), options.clone()).render(markup)
}
