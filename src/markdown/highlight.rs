// Syntax highlighting for fenced code blocks.
// Emits class-annotated spans; unknown languages and highlighter errors fall back to plain code.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use super::escape_html;

/// Prefix on every generated highlight class, e.g. `syntax-keyword`.
pub const CLASS_PREFIX: &str = "syntax-";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Render a code block, highlighted when `lang` names a known syntax.
pub fn code_block(code: &str, lang: Option<&str>) -> String {
    let lang = lang.map(str::trim).filter(|l| !l.is_empty());

    let highlighted = lang.and_then(detect_syntax).and_then(|syntax| {
        highlight(code, syntax)
            .map_err(|e| tracing::debug!(error = %e, syntax = %syntax.name, "highlighting failed"))
            .ok()
    });

    let body = highlighted.unwrap_or_else(|| escape_html(code));
    match lang {
        Some(lang) => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            escape_html(lang),
            body
        ),
        None => format!("<pre><code>{}</code></pre>\n", body),
    }
}

/// Resolve a fence info token to a syntax (extension, name, or common alias).
fn detect_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    let lang = lang.to_lowercase();
    let token = match lang.as_str() {
        "shell" | "console" | "zsh" | "sh" => "bash",
        "golang" => "go",
        "c++" => "cpp",
        "objc" | "objective-c" => "m",
        "yml" => "yaml",
        "jsonc" => "json",
        other => other,
    };

    SYNTAXES
        .find_syntax_by_token(token)
        .filter(|syntax| syntax.name != "Plain Text")
}

fn highlight(code: &str, syntax: &SyntaxReference) -> Result<String, syntect::Error> {
    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        &SYNTAXES,
        ClassStyle::SpacedPrefixed {
            prefix: CLASS_PREFIX,
        },
    );

    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }

    // Syntaxes are loaded for newline-terminated lines
    if !code.is_empty() && !code.ends_with('\n') {
        generator.parse_html_for_line_which_includes_newline("\n")?;
    }

    Ok(generator.finalize())
}
