// Markdown transformation pipeline.
// Front matter, emoji shortcodes, GFM rendering with highlighting, then sanitization.

pub mod emoji;
pub mod frontmatter;
pub mod highlight;
pub mod render;
pub mod sanitize;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A rendered markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Parsed front matter, passed through uninterpreted.
    pub attributes: Value,
    /// Sanitized HTML body.
    pub html: String,
}

/// Transform raw markdown into attributes and sanitized HTML.
///
/// Pure and deterministic. Fails only on malformed front matter.
pub fn transform(raw: &str) -> Result<Document> {
    let (yaml, body) = frontmatter::split(raw);
    let attributes = frontmatter::parse_attributes(yaml)?;

    let body = emoji::replace_shortcodes(body);
    let rendered = render::render(&body);
    let html = sanitize::sanitize(&rendered);

    Ok(Document { attributes, html })
}

/// Escape text for inclusion in HTML element content or attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}
