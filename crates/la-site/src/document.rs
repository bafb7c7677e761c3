//! Resolved content documents.
//!
//! A [`ContentDocument`] is the merged result of a content file and its
//! imports. Metadata stays available as JSON values; the fields the engine
//! understands get typed accessors. The HTML body is rendered on first
//! access and kept for the lifetime of the document.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, OnceLock, Weak};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::frontmatter;
use crate::image_size::ImageDimensions;
use crate::imports::PageSource;
use crate::references::{Reference, ReferenceCache, ReferenceScope, ReferenceSpec, SEQUENCE_KEY};
use crate::render::render_markdown;
use crate::site::{Site, SiteInner, SiteShared};
use crate::url_map::{MappedUrl, map_url, normalize, resolve};
use crate::urls::{collapse_slashes, resolve_relative_url, split_path};

/// View used when a document does not name one.
pub const DEFAULT_VIEW: &str = "page";

const TITLE_KEY: &str = "title";
const VIEW_KEY: &str = "view";
const REDIRECT_KEY: &str = "redirect";
const REWRITE_KEY: &str = "rewrite";
const REFERENCES_KEY: &str = "references";
pub(crate) const EXTERNAL_BODY_KEY: &str = "externalBody";
const DEFAULT_SYNTAX_KEY: &str = "defaultSyntax";
const REMAP_LANGUAGES_KEY: &str = "remapLanguages";
const NO_HIGHLIGHT_KEY: &str = "noHighlight";
const IS_MARKDOWN_KEY: &str = "isMarkdown";

/// Keys produced by the engine when serializing; metadata under these names is shadowed.
const ENGINE_KEYS: [&str; 5] = ["url", "filename", "rawBody", "summary", "body"];

type ReferenceFuture<'a> = Pin<Box<dyn Future<Output = Result<Reference, LoadError>> + Send + 'a>>;

/// A content document resolved from a URL.
pub struct ContentDocument {
    url: String,
    filename: String,
    source_path: PathBuf,
    raw_body: String,
    fields: Map<String, Value>,
    body: OnceLock<String>,
    references: ReferenceSpec,
    scope: ReferenceScope,
    shared: Arc<SiteShared>,
    site: Weak<SiteInner>,
}

impl ContentDocument {
    pub(crate) fn new(
        mapped: MappedUrl,
        page: PageSource,
        shared: Arc<SiteShared>,
        site: Weak<SiteInner>,
        scope: ReferenceScope,
    ) -> Self {
        let PageSource {
            mut fields,
            raw_body,
        } = page;
        fields
            .entry(VIEW_KEY)
            .or_insert_with(|| Value::from(DEFAULT_VIEW));
        let references = declared_references(&fields, &mapped.url);

        Self {
            url: mapped.url,
            filename: mapped.filename,
            source_path: mapped.path,
            raw_body,
            fields,
            body: OnceLock::new(),
            references,
            scope,
            shared,
            site,
        }
    }

    /// Canonical URL, e.g. `/subdir/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Content-root-relative file name, e.g. `/subdir/index.page`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Absolute path of the backing file.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Body text before rendering, with any external body appended.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Merged metadata, including the default `view`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field(TITLE_KEY)
    }

    pub fn view(&self) -> &str {
        self.str_field(VIEW_KEY).unwrap_or(DEFAULT_VIEW)
    }

    pub fn redirect(&self) -> Option<&str> {
        self.str_field(REDIRECT_KEY)
    }

    pub fn rewrite(&self) -> Option<&str> {
        self.str_field(REWRITE_KEY)
    }

    pub fn external_body(&self) -> Option<&str> {
        self.str_field(EXTERNAL_BODY_KEY)
    }

    /// Language for code blocks without an explicit hint.
    pub fn default_syntax(&self) -> Option<&str> {
        self.str_field(DEFAULT_SYNTAX_KEY)
    }

    /// Language alias table, e.g. `{"c#": "csharp"}`.
    pub fn remap_languages(&self) -> Option<&Map<String, Value>> {
        self.fields.get(REMAP_LANGUAGES_KEY).and_then(Value::as_object)
    }

    pub fn no_highlight(&self) -> bool {
        self.fields.get(NO_HIGHLIGHT_KEY).and_then(Value::as_bool) == Some(true)
    }

    /// Whether the body is markdown. Only an explicit `isMarkdown: false` turns it off.
    pub fn is_markdown(&self) -> bool {
        !matches!(self.fields.get(IS_MARKDOWN_KEY), Some(Value::Bool(false)))
    }

    /// Rendered body, computed once on first access.
    pub fn body(&self) -> &str {
        self.body.get_or_init(|| {
            if !self.is_markdown() {
                self.raw_body.clone()
            } else if self.raw_body.is_empty() {
                String::new()
            } else {
                tracing::debug!(url = %self.url, "Rendering body");
                render_markdown(self)
            }
        })
    }

    /// Raw body up to a `***` line, or the whole raw body.
    pub fn summary(&self) -> &str {
        frontmatter::summary(&self.raw_body)
    }

    /// Resolve a link relative to this document's URL.
    pub fn qualify_url(&self, url: &str) -> String {
        resolve_relative_url(&self.url, url)
    }

    /// Load another document relative to this one through the owning site.
    ///
    /// # Errors
    ///
    /// Returns the load error of the target, or [`LoadError::Detached`] when
    /// the site has been dropped.
    pub async fn load_relative(&self, url: &str) -> Result<Arc<ContentDocument>, LoadError> {
        self.site()?.load(&self.qualify_url(url)).await
    }

    /// Dimensions of an image addressed relative to this document's URL.
    pub fn image_size(&self, url: &str) -> Option<ImageDimensions> {
        let qualified = self.qualify_url(url);
        let path = resolve(self.content_root(), split_path(&qualified).0);
        self.shared.images.lookup(&normalize(&path))
    }

    /// Every declared reference URL, depth first, as written in metadata.
    pub fn reference_urls(&self) -> Vec<&str> {
        self.references.urls()
    }

    /// Declared reference tree.
    pub fn references(&self) -> &ReferenceSpec {
        &self.references
    }

    /// Reference at a dotted key path, from documents already loaded for the root.
    ///
    /// First-hop references of a root document are always loaded. Returns
    /// `None` when the path is not declared or a target has not been loaded;
    /// use [`resolve_reference`](Self::resolve_reference) to load on demand.
    pub fn reference(&self, path: &str) -> Option<Reference> {
        let spec = self.references.lookup(path)?;
        let cache = self.scope.cache()?;
        self.cached_reference(spec, &cache)
    }

    fn cached_reference(&self, spec: &ReferenceSpec, cache: &ReferenceCache) -> Option<Reference> {
        Some(match spec {
            ReferenceSpec::Single(url) => Reference::Single(cache.get(&self.reference_key(url))?),
            ReferenceSpec::List(urls) => Reference::List(
                urls.iter()
                    .map(|url| cache.get(&self.reference_key(url)))
                    .collect::<Option<_>>()?,
            ),
            ReferenceSpec::Nested(entries) => Reference::Nested(
                entries
                    .iter()
                    .map(|(key, spec)| Some((key.clone(), self.cached_reference(spec, cache)?)))
                    .collect::<Option<_>>()?,
            ),
        })
    }

    /// Reference at a dotted key path, loading targets that are not cached yet.
    ///
    /// # Errors
    ///
    /// Returns the load error of the first target that fails.
    pub async fn resolve_reference(&self, path: &str) -> Result<Option<Reference>, LoadError> {
        match self.references.lookup(path) {
            Some(spec) => self.resolve_spec(spec).await.map(Some),
            None => Ok(None),
        }
    }

    fn resolve_spec<'a>(&'a self, spec: &'a ReferenceSpec) -> ReferenceFuture<'a> {
        Box::pin(async move {
            Ok(match spec {
                ReferenceSpec::Single(url) => Reference::Single(self.resolve_url(url).await?),
                ReferenceSpec::List(urls) => {
                    let mut docs = Vec::with_capacity(urls.len());
                    for url in urls {
                        docs.push(self.resolve_url(url).await?);
                    }
                    Reference::List(docs)
                }
                ReferenceSpec::Nested(entries) => {
                    let mut resolved = Vec::with_capacity(entries.len());
                    for (key, spec) in entries {
                        resolved.push((key.clone(), self.resolve_spec(spec).await?));
                    }
                    Reference::Nested(resolved)
                }
            })
        })
    }

    /// Load every first-hop reference into the reference cache.
    pub(crate) async fn prefetch_references(&self) -> Result<(), LoadError> {
        for url in self.references.urls() {
            self.resolve_url(url).await?;
        }
        Ok(())
    }

    async fn resolve_url(&self, url: &str) -> Result<Arc<ContentDocument>, LoadError> {
        let key = self.reference_key(url);
        let cache = self.scope.cache().ok_or_else(|| self.detached())?;
        if let Some(doc) = cache.get(&key) {
            return Ok(doc);
        }

        let mapped = map_url(self.content_root(), &key).await?;
        if let Some(doc) = cache.get(&mapped.url) {
            cache.alias(&key, &mapped.url);
            return Ok(doc);
        }

        let doc = self.site()?.load_reference(mapped, self.scope.downgrade()).await?;
        Ok(cache.insert(&key, doc))
    }

    fn reference_key(&self, url: &str) -> String {
        let qualified = self.qualify_url(url);
        collapse_slashes(split_path(&qualified).0)
    }

    /// Next entry of the `sequence` list.
    pub fn next_page(&self) -> Option<Arc<ContentDocument>> {
        self.sequence_neighbor(1)
    }

    /// Previous entry of the `sequence` list.
    pub fn previous_page(&self) -> Option<Arc<ContentDocument>> {
        self.sequence_neighbor(-1)
    }

    fn sequence_neighbor(&self, offset: isize) -> Option<Arc<ContentDocument>> {
        let sequence = self.reference(SEQUENCE_KEY)?;
        let docs = sequence.as_list()?;
        let index = docs.iter().position(|doc| doc.url == self.url)?;
        docs.get(index.checked_add_signed(offset)?).map(Arc::clone)
    }

    fn site(&self) -> Result<Site, LoadError> {
        self.site
            .upgrade()
            .map(Site::from_inner)
            .ok_or_else(|| self.detached())
    }

    fn detached(&self) -> LoadError {
        LoadError::Detached(self.url.clone())
    }

    pub(crate) fn content_root(&self) -> &Path {
        &self.shared.config.content_root
    }

    pub(crate) fn shared(&self) -> &SiteShared {
        &self.shared
    }
}

/// Reference tree declared by `references`, plus an implicit `sequence` entry.
fn declared_references(fields: &Map<String, Value>, url: &str) -> ReferenceSpec {
    let mut references = match fields.get(REFERENCES_KEY).map(ReferenceSpec::from_value) {
        None => ReferenceSpec::default(),
        Some(Some(spec @ ReferenceSpec::Nested(_))) => spec,
        Some(_) => {
            tracing::warn!(url, "Ignoring references that are not a mapping");
            ReferenceSpec::default()
        }
    };

    if let Some(sequence @ ReferenceSpec::List(_)) =
        fields.get(SEQUENCE_KEY).and_then(ReferenceSpec::from_value)
    {
        references.insert_default(SEQUENCE_KEY, sequence);
    }
    references
}

impl Serialize for ContentDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.fields {
            if !ENGINE_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("url", &self.url)?;
        map.serialize_entry("filename", &self.filename)?;
        map.serialize_entry("rawBody", &self.raw_body)?;
        map.serialize_entry("summary", self.summary())?;
        map.serialize_entry("body", self.body())?;
        map.end()
    }
}

impl fmt::Debug for ContentDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentDocument")
            .field("url", &self.url)
            .field("filename", &self.filename)
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}
