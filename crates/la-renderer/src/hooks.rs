//! Render hooks supplied by the caller.
//!
//! The renderer calls these synchronously while walking markdown events.
//! Implementations carry whatever per-document context they need (content
//! root, source file, language defaults), so one render never observes
//! another's state.

use std::fmt::Write;

use crate::state::escape_html;

/// Logical image dimensions in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Callbacks invoked by [`MarkdownRenderer`](crate::MarkdownRenderer).
pub trait RenderHooks {
    /// Look up the size of an image referenced from markdown.
    ///
    /// Returning `None` omits the `width`/`height` attributes.
    ///
    /// # Arguments
    ///
    /// * `src` - Image source exactly as written in the markdown
    fn image_size(&self, _src: &str) -> Option<ImageSize> {
        None
    }

    /// Format a code block.
    ///
    /// The source is passed unescaped; implementations are responsible for
    /// HTML-escaping anything they do not transform.
    ///
    /// # Arguments
    ///
    /// * `language` - Language hint from the fence info string, if any
    /// * `source` - Raw code block content
    /// * `out` - Output buffer to write to
    fn code_block(&self, language: Option<&str>, source: &str, out: &mut String) {
        write_plain_code_block(language, source, out);
    }
}

/// Hooks with no image lookup and plain escaped code blocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl RenderHooks for DefaultHooks {}

/// Write an escaped `<pre><code>` block with an optional `language-*` class.
pub fn write_plain_code_block(language: Option<&str>, source: &str, out: &mut String) {
    match language {
        Some(lang) => write!(
            out,
            r#"<pre><code class="language-{}">{}</code></pre>"#,
            escape_html(lang),
            escape_html(source)
        ),
        None => write!(out, "<pre><code>{}</code></pre>", escape_html(source)),
    }
    .unwrap();
}
