//! Markdown to HTML rendering for losangeles content documents.
//!
//! This crate provides [`MarkdownRenderer`], a pulldown-cmark event walker that
//! produces HTML the way the content engine expects it:
//!
//! - Headings get automatic `id` attributes (`# Heading 1` → `id="heading-1"`)
//! - Single line breaks inside a paragraph become `<br />`
//! - A paragraph holding only a titled image becomes a `figure` block
//! - Code blocks are emitted verbatim to a hook, which does its own escaping
//!
//! # Hooks
//!
//! Rendering context is never global. Everything the renderer needs from the
//! outside world is supplied through a [`RenderHooks`] value passed to each
//! render call:
//!
//! - [`RenderHooks::image_size`]: dimensions for an image source, used to emit
//!   `width`/`height` attributes
//! - [`RenderHooks::code_block`]: formats a fenced or indented code block
//!
//! # Example
//!
//! ```
//! use la_renderer::{DefaultHooks, MarkdownRenderer};
//!
//! let html = MarkdownRenderer::new(&DefaultHooks).render("# Heading 1");
//! assert_eq!(html, "<h1 id=\"heading-1\">Heading 1</h1>\n");
//! ```

mod hooks;
mod renderer;
mod state;

pub use hooks::{DefaultHooks, ImageSize, RenderHooks, write_plain_code_block};
pub use renderer::{MarkdownRenderer, parser_options};
pub use state::{escape_html, slugify};
