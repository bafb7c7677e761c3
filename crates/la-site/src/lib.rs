//! URL to content document resolution for losangeles.
//!
//! This crate provides:
//! - [`Site`]: loads the [`ContentDocument`] behind a URL, with page caching
//! - [`UrlRules`]: redirect/rewrite/proxy rules evaluated before loading
//! - [`Site::handle`]: the request filter combining both for an HTTP layer
//!
//! Content files live under a content root. A URL maps to `<url>.md` or
//! `<url>.page`, or to `<url>/index.md` / `<url>/index.page` for directories.
//! Each file may start with a YAML or JSON frontmatter block, import other
//! files (a sibling `.common.page` is imported implicitly) and declare
//! references to other documents.
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn run() -> Result<(), la_site::LoadError> {
//! use std::path::PathBuf;
//! use la_site::{Site, SiteConfig};
//!
//! let site = Site::new(SiteConfig {
//!     content_root: PathBuf::from("public"),
//!     cache_enabled: true,
//!     ..SiteConfig::default()
//! });
//!
//! let doc = site.load("/basic").await?;
//! println!("{}: {}", doc.url(), doc.body());
//! # Ok(())
//! # }
//! ```

mod document;
mod error;
mod external;
pub mod frontmatter;
mod highlight;
mod image_size;
mod imports;
mod page_cache;
mod references;
mod render;
mod site;
mod url_map;
mod url_rules;
mod urls;

pub use document::{ContentDocument, DEFAULT_VIEW};
pub use error::{LoadError, MetadataFormat};
pub use image_size::{ImageDimensions, ImageSizeCache};
pub use imports::{COMMON_FRAGMENT, PageSource, load_page_file};
pub use page_cache::{LruPageCache, NullPageCache, PageCache};
pub use references::{Reference, ReferenceSpec, SEQUENCE_KEY};
pub use site::{DEFAULT_CACHE_MAX_PAGES, DEFAULT_FETCH_TIMEOUT, Dispatch, Site, SiteConfig};
pub use url_map::{MappedUrl, map_url};
pub use url_rules::{RequestTarget, RuleError, RuleKind, RuleOutcome, UrlRule, UrlRules};
pub use urls::{collapse_slashes, resolve_relative_url, split_path};
