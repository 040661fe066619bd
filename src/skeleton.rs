//! The HTML document wrapped around the rendered body.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

use crate::conditional::wrap_mso;
use crate::context::{Collector, GlobalData};
use crate::error::DiagnosticKind;
use crate::html::{escape_attribute, escape_text};
use crate::security::UrlValidator;

const RESET_STYLE: &str = "<style type=\"text/css\">\
#outlook a { padding:0; }\
body { margin:0;padding:0;-webkit-text-size-adjust:100%;-ms-text-size-adjust:100%; }\
table, td { border-collapse:collapse;mso-table-lspace:0pt;mso-table-rspace:0pt; }\
img { border:0;height:auto;line-height:100%; outline:none;text-decoration:none;-ms-interpolation-mode:bicubic; }\
p { display:block;margin:13px 0; }\
</style>";

const OFFICE_SETTINGS: &str = "<noscript><xml><o:OfficeDocumentSettings>\
<o:AllowPNG/><o:PixelsPerInch>96</o:PixelsPerInch>\
</o:OfficeDocumentSettings></xml></noscript>";

const OUTLOOK_GROUP_FIX: &str = "<!--[if lte mso 11]><style type=\"text/css\">\
.mj-outlook-group-fix { width:100% !important; }\
</style><![endif]-->";

/// `<link>` + `@import` for each font whose family appears in a `font-family`
/// declaration of the content. Hidden from Outlook, which would hang on them.
pub fn build_font_tags(content: &str, fonts: &IndexMap<String, String>) -> String {
    static FONT_FAMILY_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = FONT_FAMILY_REGEX.get_or_init(|| Regex::new(r#"(?i)font-family:([^"]*)"#).unwrap());
    let families: Vec<String> = re
        .captures_iter(content)
        .map(|caps| caps[1].to_lowercase())
        .collect();

    let used: Vec<&String> = fonts
        .iter()
        .filter(|(name, _)| {
            let name = name.to_lowercase();
            families.iter().any(|family| family.contains(&name))
        })
        .map(|(_, url)| url)
        .collect();

    if used.is_empty() {
        return String::new();
    }

    let links: String = used
        .iter()
        .map(|url| format!("<link href=\"{}\" rel=\"stylesheet\" type=\"text/css\">", escape_attribute(url)))
        .collect();
    let imports: String = used
        .iter()
        .map(|url| format!("@import url({});", css_url(url)))
        .collect();
    wrap_mso(&format!("{}<style type=\"text/css\">{}</style>", links, imports), true)
}

/// Percent-encode the characters that would end a `url(...)` token or the `<style>` element.
fn css_url(url: &str) -> String {
    url.replace('<', "%3C")
        .replace('>', "%3E")
        .replace('(', "%28")
        .replace(')', "%29")
        .replace('"', "%22")
        .replace('\'', "%27")
}

/// Fonts whose URL passes the scheme policy; the rest are reported and dropped.
fn allowed_fonts(global: &GlobalData, collector: &mut Collector) -> IndexMap<String, String> {
    let validator = UrlValidator::with_schemes(&global.options.allowed_url_schemes);
    let mut fonts = IndexMap::new();
    for (name, href) in &global.fonts {
        if validator.is_valid(href) {
            fonts.insert(name.clone(), href.clone());
        } else {
            collector.report_kind(
                DiagnosticKind::UnsafeUrl,
                "mj-font",
                format!("'{}' for font '{}' is not an allowed URL", href, name),
            );
        }
    }
    fonts
}

/// Column widths above the breakpoint, plus the Thunderbird and OWA variants.
pub fn build_media_queries(breakpoint: &str, media_queries: &IndexMap<String, String>, force_owa: bool) -> String {
    if media_queries.is_empty() {
        return String::new();
    }

    let rules: String = media_queries
        .iter()
        .map(|(class, query)| format!(".{} {}", class, query))
        .collect();
    let thunderbird: String = media_queries
        .iter()
        .map(|(class, query)| format!(".moz-text-html .{} {}", class, query))
        .collect();

    let mut tags = format!(
        "<style type=\"text/css\">@media only screen and (min-width:{bp}) {{ {rules} }}</style>\
<style media=\"screen and (min-width:{bp})\">{thunderbird}</style>",
        bp = breakpoint,
        rules = rules,
        thunderbird = thunderbird
    );
    if force_owa {
        let owa: String = media_queries
            .iter()
            .map(|(class, query)| format!("[owa] .{} {}", class, query))
            .collect();
        tags.push_str(&format!("<style type=\"text/css\">{}</style>", owa));
    }
    tags
}

/// Hidden inbox preview text.
pub fn build_preview(preview: &str) -> String {
    if preview.is_empty() {
        return String::new();
    }
    format!(
        "<div style=\"display:none;font-size:1px;color:#ffffff;line-height:1px;max-height:0px;max-width:0px;opacity:0;overflow:hidden;\">{}</div>",
        escape_text(preview)
    )
}

fn style_tag(css: &str) -> String {
    if css.trim().is_empty() {
        String::new()
    } else {
        format!("<style type=\"text/css\">{}</style>", css)
    }
}

/// Assemble the full document around rendered body `content`.
pub fn build_skeleton(content: &str, global: &GlobalData, collector: &mut Collector) -> String {
    let fonts = allowed_fonts(global, collector);
    let breakpoint = escape_attribute(&global.breakpoint);
    let head_styles: String = collector
        .head_styles
        .values()
        .map(|style| style(&breakpoint))
        .collect();
    let body_style = match &collector.background_color {
        Some(color) => format!("word-spacing:normal;background-color:{};", color),
        None => "word-spacing:normal;".to_string(),
    };

    let mut html = String::with_capacity(content.len() + 2048);
    html.push_str("<!doctype html>");
    html.push_str(&format!(
        "<html lang=\"{}\" dir=\"{}\" xmlns=\"http://www.w3.org/1999/xhtml\" \
xmlns:v=\"urn:schemas-microsoft-com:vml\" xmlns:o=\"urn:schemas-microsoft-com:office:office\">",
        escape_attribute(&global.lang),
        escape_attribute(&global.dir)
    ));
    html.push_str("<head>");
    html.push_str(&format!("<title>{}</title>", escape_text(&global.title)));
    html.push_str(&wrap_mso("<meta http-equiv=\"X-UA-Compatible\" content=\"IE=edge\">", true));
    html.push_str("<meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\">");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    html.push_str(RESET_STYLE);
    html.push_str(&wrap_mso(OFFICE_SETTINGS, false));
    html.push_str(OUTLOOK_GROUP_FIX);
    html.push_str(&build_font_tags(content, &fonts));
    html.push_str(&build_media_queries(
        &breakpoint,
        &collector.media_queries,
        global.options.force_owa_desktop,
    ));
    html.push_str(&style_tag(&head_styles));
    html.push_str(&style_tag(&global.styles.join("")));
    for raw in &global.head_raw {
        html.push_str(raw);
    }
    html.push_str("</head>");
    html.push_str(&format!("<body style=\"{}\">", escape_attribute(&body_style)));
    html.push_str(&build_preview(&global.preview));
    html.push_str(content);
    html.push_str("</body></html>");
    html
}
