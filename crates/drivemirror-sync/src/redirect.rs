//! Redirect marker pages
//!
//! Every exported document gets a small `<name>.html` page that forwards the
//! browser to the document's web view. The page doubles as the freshness
//! marker: it records the remote modification time the exports were taken
//! at, and the decision engine reads it back on the next run.

use std::sync::OnceLock;

use drivemirror_core::domain::VariantSource;
use regex::Regex;

/// Renders the redirect page for a document
#[must_use]
pub fn render(source: &VariantSource) -> String {
    let name = escape(&source.name);
    let link = escape(source.link.as_deref().unwrap_or_default());
    let md5 = source.md5.as_ref().map_or("", |m| m.as_str());
    let modified = source
        .modified_time
        .map(|t| t.to_string())
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE HTML>
<html lang="en-US">
    <head>
        <title>{name}</title>
        <meta charset="UTF-8">
        <meta http-equiv="refresh" content="0; url={link}">
        <script type="text/javascript">
            window.location.href = "{link}"
        </script>
    </head>
    <body>
        <!-- modifiedTime: {modified} -->
        <!-- md5: {md5} -->
        If you are not redirected automatically, follow this <a href='{link}'>link to {name}</a>.
    </body>
</html>
"#
    )
}

/// Reads the modification time recorded in a redirect page
///
/// Returns `None` if the page carries no (or an unparsable) marker.
#[must_use]
pub fn recorded_modified_time(html: &str) -> Option<i64> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let re = MARKER
        .get_or_init(|| Regex::new(r"modifiedTime\s*[:=]\s*(\d+)").expect("valid regex"));
    re.captures(html)?.get(1)?.as_str().parse().ok()
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
