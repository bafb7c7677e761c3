//! Memoized image dimension lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Filename suffix marking a double-resolution image.
const RETINA_SUFFIX: &str = "@2x";

/// Logical dimensions and format of an image file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
    /// Lowercase format name, e.g. `png`.
    pub format: &'static str,
}

/// Process-wide cache of image dimensions keyed by file path.
///
/// Failed lookups are cached as `None` and never retried until [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct ImageSizeCache {
    entries: RwLock<HashMap<PathBuf, Option<ImageDimensions>>>,
}

impl ImageSizeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimensions of the image at `path`, halved for `@2x` files.
    pub fn lookup(&self, path: &Path) -> Option<ImageDimensions> {
        if let Some(cached) = self.entries.read().unwrap().get(path) {
            return *cached;
        }

        let dimensions = read_dimensions(path);
        if dimensions.is_none() {
            tracing::debug!(path = %path.display(), "Image size unavailable");
        }

        // Concurrent first lookups compute the same value; keep whichever landed first.
        *self
            .entries
            .write()
            .unwrap()
            .entry(path.to_path_buf())
            .or_insert(dimensions)
    }

    /// Forget every cached lookup.
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    /// Number of cached paths, including misses.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_dimensions(path: &Path) -> Option<ImageDimensions> {
    let reader = image::ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?;
    let format = reader.format()?;
    let (mut width, mut height) = reader.into_dimensions().ok()?;

    if is_retina(path) {
        width /= 2;
        height /= 2;
    }

    Some(ImageDimensions {
        width,
        height,
        format: format.extensions_str().first().copied().unwrap_or("unknown"),
    })
}

/// Whether the file stem ends with `@2x`, ignoring case.
fn is_retina(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.to_ascii_lowercase().ends_with(RETINA_SUFFIX))
}
