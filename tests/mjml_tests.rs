use mjml_email::{
    parse, render, render_with_options, DiagnosticKind, MjmlError, Registry, RenderOptions, Renderer,
    ValidationLevel,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

fn get_fixture_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(filename);
    path
}

fn fixture(filename: &str) -> String {
    fs::read_to_string(get_fixture_path(filename)).unwrap()
}

fn wrap_body(body: &str) -> String {
    format!("<mjml><mj-body>{}</mj-body></mjml>", body)
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[test]
fn test_basic_document() {
    let output = render(&fixture("basic.mjml")).unwrap();
    let html = &output.html;

    assert!(output.errors.is_empty(), "unexpected diagnostics: {:?}", output.errors);
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("<style type=\"text/css\">"));
    assert!(html.contains("<title>Welcome</title>"));
    assert!(html.contains(">Your account is ready</div>"));
    assert!(html.contains("@media only screen and (min-width:480px)"));
    assert!(html.contains(".mj-column-per-100 { width:100% !important; max-width: 100%; }"));
    assert_eq!(html.matches("Hello from the basic fixture").count(), 1);
}

#[test]
fn test_outlook_blocks_are_merged() {
    let output = render(&fixture("basic.mjml")).unwrap();
    assert!(!output.html.contains("<![endif]--><!--[if mso | IE]>"));
    assert!(output.html.contains("<!--[if mso | IE]><table"));
}

#[test]
fn test_newsletter_document() {
    let output = render(&fixture("newsletter.mjml")).unwrap();
    let html = &output.html;

    assert!(output.errors.is_empty(), "unexpected diagnostics: {:?}", output.errors);
    assert!(html.contains("<html lang=\"en\""));
    assert!(html.contains("<body style=\"word-spacing:normal;background-color:#f4f4f4;\">"));
    assert!(html.contains("<!-- hero -->"));
    assert!(html.contains(".mj-column-per-50 { width:50% !important; max-width: 50%; }"));
    assert!(html.contains("<link href=\"https://fonts.example.com/inter.css\""));
    assert!(html.contains("src=\"https://cdn.example.com/logo.png\""));
    assert!(html.contains("<a href=\"https://example.com\""));
    assert!(html.contains("<a href=\"https://example.com/read\""));
    assert!(html.contains("<p class=\"footer\">Unsubscribe</p>"));
    assert!(html.contains(".footer { font-size: 10px; }"));
}

#[test]
fn test_inline_stylesheet_precedence() {
    let output = render(&fixture("newsletter.mjml")).unwrap();
    let html = &output.html;

    // `!important` in the stylesheet beats the component's own color
    assert!(html.contains("letter-spacing:1px;color:#111111;font-family:Inter, sans-serif;"));
    assert!(!html.contains("color:#111111 !important"));
    assert!(!html.contains(".headline div"));
}

#[test]
fn test_inline_declarations_survive_plain_rules() {
    let markup = r#"<mjml>
  <mj-head><mj-style inline="inline">.x div { color: blue; }</mj-style></mj-head>
  <mj-body><mj-section><mj-column><mj-text css-class="x" color="red">t</mj-text></mj-column></mj-section></mj-body>
</mjml>"#;
    let output = render(markup).unwrap();
    assert!(output.html.contains("color:red;"));
    assert!(!output.html.contains("color:blue"));
}

// ─── Attributes ──────────────────────────────────────────────────────────────

#[test]
fn test_attribute_priority() {
    let output = render(&fixture("attributes.mjml")).unwrap();
    let html = &output.html;
    assert!(output.errors.is_empty(), "unexpected diagnostics: {:?}", output.errors);

    let style = |color: &str| {
        format!(
            "style=\"font-family:Lato, Arial;font-size:15px;line-height:1;text-align:left;color:{};\"",
            color
        )
    };
    assert!(html.contains(&format!("{}>class only</div>", style("#0000ff"))));
    assert!(html.contains(&format!("{}>explicit wins</div>", style("#ff0000"))));
    assert!(html.contains(&format!("{}>defaults</div>", style("#000000"))));
    assert!(html.contains("https://fonts.googleapis.com/css?family=Lato"));
}

#[test]
fn test_invalid_enum_is_fatal_when_strict() {
    let markup = wrap_body("<mj-section><mj-column><mj-text align=\"sideways\">x</mj-text></mj-column></mj-section>");
    let err = render(&markup).unwrap_err();
    assert_eq!(
        err,
        MjmlError::InvalidAttributeValue {
            tag: "mj-text".to_string(),
            attribute: "align".to_string(),
            value: "sideways".to_string(),
            expected: "one of: left, right, center, justify".to_string(),
        }
    );
}

#[test]
fn test_unknown_attribute_is_a_diagnostic() {
    let markup = wrap_body("<mj-section><mj-column><mj-text sparkle=\"yes\">x</mj-text></mj-column></mj-section>");
    let output = render(&markup).unwrap();
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].kind, DiagnosticKind::UnknownAttribute);
    assert_eq!(output.errors[0].tag.as_deref(), Some("mj-text"));
    assert!(!output.html.contains("sparkle"));
}

// ─── Options ─────────────────────────────────────────────────────────────────

#[test]
fn test_options_from_yaml() {
    let options = RenderOptions::from_path(get_fixture_path("options.yaml")).unwrap();
    assert_eq!(options.validation_level, ValidationLevel::Soft);
    assert!(!options.keep_comments);

    let output = render_with_options(&fixture("newsletter.mjml"), &options).unwrap();
    assert!(!output.html.contains("<!-- hero -->"));
    assert!(output.html.contains("[owa] .mj-column-per-50"));

    let markup = wrap_body("<mj-section><mj-column><mj-text align=\"sideways\">x</mj-text></mj-column></mj-section>");
    let output = render_with_options(&markup, &options).unwrap();
    assert_eq!(output.errors[0].kind, DiagnosticKind::InvalidAttribute);
    // the typed attribute falls back to its default
    assert!(output.html.contains("text-align:left;"));
}

#[test]
fn test_missing_config_file() {
    let err = RenderOptions::from_path(get_fixture_path("nope.yaml")).unwrap_err();
    assert!(matches!(err, MjmlError::Config(_)));
}

// ─── URLs and sanitizing ─────────────────────────────────────────────────────

#[test]
fn test_unsafe_button_link_is_dropped() {
    let markup = wrap_body(
        "<mj-section><mj-column><mj-button href=\"javascript:alert(1)\">Click</mj-button></mj-column></mj-section>",
    );
    let output = render(&markup).unwrap();
    assert!(!output.html.contains("javascript:"));
    assert!(output.html.contains(">Click</p>"));
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].kind, DiagnosticKind::UnsafeUrl);
}

#[test]
fn test_custom_url_schemes() {
    let options = RenderOptions {
        allowed_url_schemes: vec!["https".to_string(), "cid".to_string()],
        ..RenderOptions::default()
    };
    let markup = wrap_body(
        "<mj-section><mj-column><mj-image src=\"cid:logo\" href=\"http://plain.example.com\" /></mj-column></mj-section>",
    );
    let output = render_with_options(&markup, &options).unwrap();
    assert!(output.html.contains("src=\"cid:logo\""));
    assert!(!output.html.contains("plain.example.com"));
    assert_eq!(output.errors.len(), 1);
}

#[test]
fn test_document_attributes_are_escaped() {
    let markup = r#"<mjml lang="en&quot; onload=&quot;alert(1)">
  <mj-head>
    <mj-title>&lt;/title&gt;</mj-title>
    <mj-font name="Evil" href="x&quot;&gt;&lt;script&gt;alert(1)&lt;/script&gt;" />
  </mj-head>
  <mj-body>
    <mj-section><mj-column><mj-text font-family="Evil">x</mj-text></mj-column></mj-section>
  </mj-body>
</mjml>"#;
    let output = render(markup).unwrap();
    assert!(output.html.contains("<html lang=\"en&quot; onload=&quot;alert(1)\""));
    assert!(!output.html.contains("onload=\"alert"));
    assert!(!output.html.contains("<script>"));
    assert!(output.html.contains("<link href=\"x&quot;&gt;&lt;script&gt;alert(1)&lt;/script&gt;\""));
}

#[test]
fn test_unsafe_section_background_is_dropped() {
    let markup = wrap_body("<mj-section background-url=\"javascript:alert(1)\"><mj-column /></mj-section>");
    let output = render(&markup).unwrap();
    assert!(!output.html.contains("javascript:"));
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].kind, DiagnosticKind::UnsafeUrl);
}

// ─── Inlining ────────────────────────────────────────────────────────────────

#[test]
fn test_extreme_nth_child_does_not_abort() {
    let markup = r#"<mjml>
  <mj-head><mj-style inline="inline">div:nth-child(n-2147483648) { color: red }</mj-style></mj-head>
  <mj-body><mj-section><mj-column><mj-text>x</mj-text></mj-column></mj-section></mj-body>
</mjml>"#;
    let output = render(markup).unwrap();
    assert!(output.errors.is_empty(), "unexpected diagnostics: {:?}", output.errors);
    assert!(output.html.contains("color:red;"));
}

#[test]
fn test_missing_body_is_a_diagnostic() {
    let output = render("<mjml><mj-head><mj-title>x</mj-title></mj-head></mjml>").unwrap();
    assert!(output.html.contains("<title>x</title>"));
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].kind, DiagnosticKind::MissingElement);
}

#[test]
fn test_invalid_head_default_is_reported() {
    let markup = r#"<mjml>
  <mj-head><mj-attributes><mj-text align="sideways" /></mj-attributes></mj-head>
  <mj-body><mj-section><mj-column><mj-text>x</mj-text></mj-column></mj-section></mj-body>
</mjml>"#;
    let output = render(markup).unwrap();
    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].kind, DiagnosticKind::InvalidAttribute);
    assert!(output.html.contains("text-align:left;"));
}

// ─── Box model ───────────────────────────────────────────────────────────────

#[test]
fn test_overflowing_paddings_are_reported() {
    let markup = wrap_body(
        "<mj-section><mj-column padding-left=\"400px\" padding-right=\"400px\"><mj-text>x</mj-text></mj-column></mj-section>",
    );
    let output = render(&markup).unwrap();
    assert!(output
        .errors
        .iter()
        .any(|e| e.kind == DiagnosticKind::NegativeWidth));
}

#[test]
fn test_two_columns_share_the_section() {
    let markup = wrap_body(
        "<mj-section><mj-column><mj-text>a</mj-text></mj-column><mj-column><mj-text>b</mj-text></mj-column></mj-section>",
    );
    let output = render(&markup).unwrap();
    assert!(output.html.contains("mj-column-per-50 mj-outlook-group-fix"));
    assert_eq!(output.html.matches("mj-column-per-50 mj-outlook-group-fix").count(), 2);
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn test_parse_error_positions() {
    let err = render("<mjml>\n  <mj-body>\n    <mj-section>\n  </mj-body>\n</mjml>").unwrap_err();
    match err {
        MjmlError::ParseError { line, column, message } => {
            assert_eq!((line, column), (4, 3));
            assert_eq!(message, "mismatched closing tag </mj-body>, expected </mj-section>");
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_unknown_tag() {
    let err = render(&wrap_body("<mj-hero />")).unwrap_err();
    assert!(matches!(err, MjmlError::UnknownTag { ref tag, .. } if tag == "mj-hero"));
}

#[test]
fn test_custom_registry() {
    let mut registry = Registry::new();
    registry.register_many(mjml_email::registry::core_preset());
    registry.register(mjml_email::ComponentSpec {
        default_attributes: &[("color", "#123456"), ("padding", "0px")],
        ..mjml_email::components::text::SPEC
    });
    let output = Renderer::new(&registry, RenderOptions::default())
        .render(&wrap_body("<mj-section><mj-column><mj-text>x</mj-text></mj-column></mj-section>"))
        .unwrap();
    assert!(output.html.contains("color:#123456;"));
}

#[test]
fn test_parse_tree_serializes() {
    let root = parse(&fixture("basic.mjml")).unwrap();
    let yaml = serde_yaml::to_string(&root).unwrap();
    assert!(yaml.contains("tag_name: mj-breakpoint"));
    assert!(yaml.contains("width: 480px"));
}
