//! Server-side syntax highlighting for code blocks.

use std::fmt::Write;
use std::sync::LazyLock;

use la_renderer::{escape_html, write_plain_code_block};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Language name that turns highlighting off for a block.
pub const DISABLED: &str = "disabled";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Write a code block for `language`.
///
/// With `highlight` set and a known syntax, the code is tokenized into
/// `<span class="...">` elements. Otherwise it is escaped verbatim with a
/// `language-*` class for client-side highlighting. The `disabled` language
/// is never highlighted.
pub fn write_code_block(language: &str, source: &str, highlight: bool, out: &mut String) {
    let highlighted = if highlight && language != DISABLED {
        highlight_html(language, source)
    } else {
        None
    };

    match highlighted {
        Some(html) => write!(
            out,
            r#"<pre><code class="language-{}">{html}</code></pre>"#,
            escape_html(language)
        )
        .unwrap(),
        None => write_plain_code_block(Some(language), source, out),
    }
}

/// Classed HTML for `source`, or `None` for an unknown language.
fn highlight_html(language: &str, source: &str) -> Option<String> {
    let syntax = SYNTAXES.find_syntax_by_token(language)?;
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, ClassStyle::Spaced);
    for line in LinesWithEndings::from(source) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            tracing::warn!(language, error = %e, "Syntax highlighting failed");
            return None;
        }
    }
    Some(generator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(language: &str, source: &str, highlight: bool) -> String {
        let mut out = String::new();
        write_code_block(language, source, highlight, &mut out);
        out
    }

    #[test]
    fn test_unhighlighted_is_escaped() {
        assert_eq!(
            render("html", "<p>x</p>\n", false),
            "<pre><code class=\"language-html\">&lt;p&gt;x&lt;/p&gt;\n</code></pre>"
        );
    }

    #[test]
    fn test_disabled_is_escaped_with_class() {
        assert_eq!(
            render(DISABLED, "a < b", true),
            "<pre><code class=\"language-disabled\">a &lt; b</code></pre>"
        );
    }

    #[test]
    fn test_highlighted_has_spans() {
        let html = render("rust", "fn main() {}\n", true);
        assert!(html.starts_with("<pre><code class=\"language-rust\">"));
        assert!(html.contains("<span class=\""));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_highlighted_html_escapes_markup() {
        let html = render("html", "<p>x</p>\n", true);
        assert!(html.contains("&lt;"));
        assert!(!html.contains("<p>"));
    }

    #[test]
    fn test_unknown_language_falls_back() {
        assert_eq!(
            render("no-such-lang", "x\n", true),
            "<pre><code class=\"language-no-such-lang\">x\n</code></pre>"
        );
    }
}
