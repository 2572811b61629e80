// Emoji shortcode substitution.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([a-zA-Z0-9_+\-]+):").expect("valid shortcode pattern"));

/// Replace `:name:` shortcodes with their glyphs. Unknown names are kept verbatim.
pub fn replace_shortcodes(text: &str) -> Cow<'_, str> {
    SHORTCODE.replace_all(text, |caps: &Captures| match emojis::get_by_shortcode(&caps[1]) {
        Some(emoji) => emoji.as_str().to_string(),
        None => caps[0].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_shortcode() {
        assert_eq!(replace_shortcodes("Hello :+1: world"), "Hello 👍 world");
        assert_eq!(replace_shortcodes(":tada::rocket:"), "🎉🚀");
    }

    #[test]
    fn test_unknown_shortcode_kept() {
        assert_eq!(
            replace_shortcodes("Hello :not_a_real_emoji: world"),
            "Hello :not_a_real_emoji: world"
        );
    }

    #[test]
    fn test_no_shortcodes_borrows() {
        assert!(matches!(replace_shortcodes("plain 10:30 text"), Cow::Borrowed(_)));
    }
}
