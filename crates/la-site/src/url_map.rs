//! Mapping of request URLs to content files.

use std::path::{Component, Path, PathBuf};

use crate::error::LoadError;

/// Extension preferred when both files exist for a stem.
const MARKDOWN_EXT: &str = ".md";
const PAGE_EXT: &str = ".page";

/// Result of mapping a URL onto the content directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedUrl {
    /// Absolute path of the backing file (which may not exist).
    pub path: PathBuf,
    /// Content-root-relative file name, e.g. `/subdir/index.page`.
    pub filename: String,
    /// Canonical URL, with a trailing slash for directories.
    pub url: String,
}

/// Map a URL path to its content file.
///
/// Directories map to their `index` file and gain a trailing slash. A `.md`
/// file wins over a `.page` file with the same stem. A missing path is not
/// an error here; the read step reports it.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] for URLs containing `..` segments.
pub async fn map_url(content_root: &Path, url: &str) -> Result<MappedUrl, LoadError> {
    let mut url = if url.starts_with('/') {
        url.to_owned()
    } else {
        format!("/{url}")
    };

    if url.split('/').any(|segment| segment == "..") {
        return Err(LoadError::NotFound(content_root.join(url.trim_start_matches('/'))));
    }

    let is_directory = tokio::fs::metadata(resolve(content_root, &url))
        .await
        .is_ok_and(|meta| meta.is_dir());

    let mut stem = url.clone();
    if is_directory {
        if !url.ends_with('/') {
            url.push('/');
            stem.push('/');
        }
        stem.push_str("index");
    }

    let markdown = format!("{stem}{MARKDOWN_EXT}");
    let filename = if tokio::fs::try_exists(resolve(content_root, &markdown))
        .await
        .unwrap_or(false)
    {
        markdown
    } else {
        format!("{stem}{PAGE_EXT}")
    };

    Ok(MappedUrl {
        path: resolve(content_root, &filename),
        filename,
        url,
    })
}

/// Join a rooted content path onto the content directory.
pub(crate) fn resolve(content_root: &Path, rooted: &str) -> PathBuf {
    content_root.join(rooted.trim_start_matches('/'))
}

/// Lexically resolve `.` and `..` components.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component);
                }
            }
            other => result.push(other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn content_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("index.page"), "home").unwrap();
        fs::write(root.join("basic.page"), "basic").unwrap();
        fs::write(root.join("markdown.page"), "page").unwrap();
        fs::write(root.join("markdown.md"), "md").unwrap();
        fs::create_dir(root.join("subdir")).unwrap();
        fs::write(root.join("subdir/index.page"), "sub").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_map_file() {
        let dir = content_tree();
        let mapped = map_url(dir.path(), "/basic").await.unwrap();
        assert_eq!(mapped.filename, "/basic.page");
        assert_eq!(mapped.url, "/basic");
        assert_eq!(mapped.path, dir.path().join("basic.page"));
    }

    #[tokio::test]
    async fn test_markdown_preferred() {
        let dir = content_tree();
        let mapped = map_url(dir.path(), "/markdown").await.unwrap();
        assert_eq!(mapped.filename, "/markdown.md");
    }

    #[tokio::test]
    async fn test_root_directory() {
        let dir = content_tree();
        let mapped = map_url(dir.path(), "/").await.unwrap();
        assert_eq!(mapped.filename, "/index.page");
        assert_eq!(mapped.url, "/");
    }

    #[tokio::test]
    async fn test_subdirectory_gets_trailing_slash() {
        let dir = content_tree();
        let mapped = map_url(dir.path(), "/subdir").await.unwrap();
        assert_eq!(mapped.filename, "/subdir/index.page");
        assert_eq!(mapped.url, "/subdir/");

        let mapped = map_url(dir.path(), "/subdir/").await.unwrap();
        assert_eq!(mapped.url, "/subdir/");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let dir = content_tree();
        let mapped = map_url(dir.path(), "/nope").await.unwrap();
        assert_eq!(mapped.filename, "/nope.page");
        assert!(!mapped.path.exists());
    }

    #[tokio::test]
    async fn test_parent_segments_rejected() {
        let dir = content_tree();
        let err = map_url(dir.path(), "/../etc/passwd").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/a/b/./../c/d.page")),
            PathBuf::from("/a/c/d.page")
        );
    }
}
