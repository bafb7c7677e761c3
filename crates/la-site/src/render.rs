//! Markdown rendering with per-document hooks.

use std::path::Path;

use la_renderer::{ImageSize, MarkdownRenderer, RenderHooks};
use serde_json::{Map, Value};

use crate::document::ContentDocument;
use crate::highlight::write_code_block;
use crate::image_size::ImageSizeCache;
use crate::url_map::{normalize, resolve};
use crate::urls::split_path;

/// Language used when neither the block nor the document names one.
const PLAIN_TEXT: &str = "txt";

/// Render the raw body of `doc` to HTML.
pub(crate) fn render_markdown(doc: &ContentDocument) -> String {
    let hooks = DocumentHooks::new(doc);
    MarkdownRenderer::new(&hooks).render(doc.raw_body())
}

/// Render context for one document.
struct DocumentHooks<'a> {
    content_root: &'a Path,
    source_dir: &'a Path,
    images: &'a ImageSizeCache,
    default_syntax: Option<&'a str>,
    remap: Option<&'a Map<String, Value>>,
    highlight: bool,
}

impl<'a> DocumentHooks<'a> {
    fn new(doc: &'a ContentDocument) -> Self {
        let shared = doc.shared();
        Self {
            content_root: doc.content_root(),
            source_dir: doc.source_path().parent().unwrap_or(doc.content_root()),
            images: &shared.images,
            default_syntax: doc.default_syntax(),
            remap: doc.remap_languages(),
            highlight: !(shared.config.no_highlight || doc.no_highlight()),
        }
    }
}

impl RenderHooks for DocumentHooks<'_> {
    fn image_size(&self, src: &str) -> Option<ImageSize> {
        if src.contains("://") {
            return None;
        }

        let path = split_path(src).0;
        let file = if path.starts_with('/') {
            resolve(self.content_root, path)
        } else {
            self.source_dir.join(path)
        };
        let dimensions = self.images.lookup(&normalize(&file))?;
        Some(ImageSize {
            width: dimensions.width,
            height: dimensions.height,
        })
    }

    fn code_block(&self, language: Option<&str>, source: &str, out: &mut String) {
        let language = language.or(self.default_syntax).unwrap_or(PLAIN_TEXT);
        let language = self
            .remap
            .and_then(|remap| remap.get(language))
            .and_then(Value::as_str)
            .unwrap_or(language);
        write_code_block(language, source, self.highlight, out);
    }
}
