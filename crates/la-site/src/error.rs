//! Errors produced while resolving content documents.

use std::path::{Path, PathBuf};

/// Error returned when a content document cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Backing content file does not exist.
    #[error("Content file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Frontmatter delimiter was opened but never closed.
    #[error("Misformed attribute delimiters in {}", .0.display())]
    MalformedDelimiters(PathBuf),
    /// Frontmatter block failed to parse.
    #[error("Error parsing page header of file {} ({format}): {message}", .filename.display())]
    Metadata {
        filename: PathBuf,
        format: MetadataFormat,
        message: String,
    },
    /// I/O error other than not-found.
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A file imports itself, directly or through other imports.
    #[error("Import cycle detected at {}", .0.display())]
    ImportCycle(PathBuf),
    /// Fetching `externalBody` failed.
    #[error("Failed to fetch external body {url}: {source}")]
    ExternalFetch {
        url: String,
        #[source]
        source: ureq::Error,
    },
    /// The site or reference cache a document was loaded from is gone.
    #[error("Document {0} is no longer attached to a site")]
    Detached(String),
}

impl LoadError {
    /// Map an I/O error, turning `ErrorKind::NotFound` into [`LoadError::NotFound`].
    pub(crate) fn io(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Whether the error means "no such content" (a 404 for HTTP callers).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Flavor of a frontmatter block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataFormat {
    Json,
    Yaml,
}

impl std::fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        })
    }
}
