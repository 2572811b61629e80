// HTML sanitization.
// Fixed allow-list of tags, attributes, and URL schemes applied to rendered output.

use std::collections::HashSet;
use std::sync::LazyLock;

use ammonia::{Builder, UrlRelative};

/// Tags that survive sanitization. `img` is intentionally absent.
pub const ALLOWED_TAGS: &[&str] = &[
    // Sections and blocks
    "address", "article", "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6",
    "hgroup", "main", "nav", "section", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "hr", "li", "ol", "p", "pre", "ul",
    // Inline
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "i",
    "kbd", "mark", "q", "rb", "rp", "rt", "rtc", "ruby", "s", "samp", "small", "span", "strong",
    "sub", "sup", "time", "u", "var", "wbr",
    // Tables
    "caption", "col", "colgroup", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
];

pub const GENERIC_ATTRIBUTES: &[&str] = &["class", "id", "style"];

pub const LINK_ATTRIBUTES: &[&str] = &["href", "name", "target"];

/// Only used if `img` is added to the allowed tags.
pub const IMAGE_ATTRIBUTES: &[&str] = &[
    "src", "srcset", "alt", "title", "width", "height", "loading",
];

pub const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto", "tel"];

static SANITIZER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::empty();
    builder
        .add_tags(ALLOWED_TAGS)
        .add_generic_attributes(GENERIC_ATTRIBUTES)
        .add_tag_attributes("a", LINK_ATTRIBUTES)
        .add_tag_attributes("img", IMAGE_ATTRIBUTES)
        .url_schemes(URL_SCHEMES.iter().copied().collect::<HashSet<_>>())
        .url_relative(UrlRelative::PassThrough)
        .add_clean_content_tags(["script", "style"])
        .link_rel(None)
        .strip_comments(true);
    builder
});

/// Drop every tag, attribute, and URL outside the allow-list.
pub fn sanitize(html: &str) -> String {
    SANITIZER.clean(html).to_string()
}
