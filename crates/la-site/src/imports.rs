//! Content file loading with import inheritance.
//!
//! A file inherits fields from its import chain: the sibling `.common.page`
//! (unless the file is that fragment) followed by its own `import` entries.
//! Chain entries are loaded recursively and merged left to right, then the
//! file's own fields are applied last. The raw body always comes from the
//! file itself.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::frontmatter::{self, Frontmatter};
use crate::url_map::{normalize, resolve};

/// Name of the fragment implicitly imported by every file in a directory.
pub const COMMON_FRAGMENT: &str = ".common.page";

/// Metadata key listing explicit imports.
const IMPORT_KEY: &str = "import";

/// Merged fields and raw body of a content file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageSource {
    pub fields: Map<String, Value>,
    pub raw_body: String,
}

type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<PageSource, LoadError>> + Send + 'a>>;

/// Load a content file and merge its import chain.
///
/// # Errors
///
/// Returns the first error hit while reading or parsing the file or any of
/// its imports, or [`LoadError::ImportCycle`] when a file imports itself.
pub async fn load_page_file(content_root: &Path, path: &Path) -> Result<PageSource, LoadError> {
    let mut chain = Vec::new();
    load_recursive(content_root, normalize(path), &mut chain).await
}

fn load_recursive<'a>(
    content_root: &'a Path,
    path: PathBuf,
    chain: &'a mut Vec<PathBuf>,
) -> LoadFuture<'a> {
    Box::pin(async move {
        if chain.contains(&path) {
            return Err(LoadError::ImportCycle(path));
        }

        tracing::debug!(path = %path.display(), "Loading file");
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LoadError::io(e, &path))?;
        let Frontmatter {
            mut fields,
            raw_body,
        } = frontmatter::parse(&text, &path)?;

        let dir = path.parent().unwrap_or(content_root).to_path_buf();
        let mut imports = Vec::new();
        if !path.ends_with(COMMON_FRAGMENT) && is_file(&dir.join(COMMON_FRAGMENT)).await {
            imports.push(COMMON_FRAGMENT.to_owned());
        }
        imports.extend(import_names(fields.remove(IMPORT_KEY), &path));

        if imports.is_empty() {
            return Ok(PageSource { fields, raw_body });
        }

        chain.push(path.clone());
        let mut merged = Map::new();
        for name in imports {
            let import_path = if name.starts_with('/') {
                resolve(content_root, &name)
            } else {
                dir.join(&name)
            };
            let imported = load_recursive(content_root, normalize(&import_path), chain).await?;
            merged.extend(imported.fields);
        }
        chain.pop();

        merged.extend(fields);
        Ok(PageSource {
            fields: merged,
            raw_body,
        })
    })
}

/// Explicit imports declared by a file, as a string or list of strings.
fn import_names(value: Option<Value>, path: &Path) -> Vec<String> {
    let values = match value {
        None => return Vec::new(),
        Some(Value::Array(values)) => values,
        Some(value) => vec![value],
    };
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(name) => Some(name),
            other => {
                tracing::warn!(path = %path.display(), import = %other, "Ignoring non-string import");
                None
            }
        })
        .collect()
}

/// Regular file check that does not follow symlinks.
async fn is_file(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}
