//! Root loader and request dispatch.
//!
//! [`Site`] ties the pieces together: URL rules, URL mapping, import
//! resolution, external bodies, reference prefetch and the page cache.
//!
//! # Load pipeline
//!
//! 1. Look up the page cache by the requested URL (slashes collapsed)
//! 2. Map the URL to a content file and look up the canonical URL
//! 3. Load the file with its import chain
//! 4. Append the `externalBody` if one is declared
//! 5. Prefetch every first-hop reference into the root's reference cache
//! 6. Store the document in the page cache

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use ureq::Agent;

use crate::document::{ContentDocument, EXTERNAL_BODY_KEY};
use crate::error::LoadError;
use crate::external::{append_body, create_agent, fetch_external_body};
use crate::image_size::ImageSizeCache;
use crate::imports::load_page_file;
use crate::page_cache::{LruPageCache, NullPageCache, PageCache};
use crate::references::{ReferenceCache, ReferenceScope};
use crate::url_map::{MappedUrl, map_url};
use crate::url_rules::{RequestTarget, RuleOutcome, UrlRules};
use crate::urls::{collapse_slashes, split_path};

/// Default maximum number of cached pages.
pub const DEFAULT_CACHE_MAX_PAGES: NonZeroUsize = NonZeroUsize::new(50).unwrap();

/// Default timeout for `externalBody` requests.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`Site`].
#[derive(Clone, Debug)]
pub struct SiteConfig {
    /// Directory holding the content files.
    pub content_root: PathBuf,
    /// Keep loaded documents in an LRU page cache.
    pub cache_enabled: bool,
    /// Page cache capacity.
    pub cache_max_pages: NonZeroUsize,
    /// Disable server-side syntax highlighting for every document.
    pub no_highlight: bool,
    /// Timeout for fetching `externalBody` content.
    pub fetch_timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("public"),
            cache_enabled: false,
            cache_max_pages: DEFAULT_CACHE_MAX_PAGES,
            no_highlight: false,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// State documents need after loading: config, image sizes, HTTP agent.
pub(crate) struct SiteShared {
    pub config: SiteConfig,
    pub images: ImageSizeCache,
    pub agent: Agent,
}

impl SiteShared {
    pub fn new(config: SiteConfig) -> Self {
        let agent = create_agent(config.fetch_timeout);
        Self {
            config,
            images: ImageSizeCache::new(),
            agent,
        }
    }
}

pub(crate) struct SiteInner {
    shared: Arc<SiteShared>,
    pages: Box<dyn PageCache>,
    rules: UrlRules,
}

/// Outcome of [`Site::handle`] for the HTTP layer.
#[derive(Clone, Debug)]
pub enum Dispatch {
    /// Not a content request (method other than GET/HEAD); hand it on.
    Pass,
    /// Redirect the client to this URL.
    Redirect(String),
    /// Stream the response of this absolute URL.
    Proxy(String),
    /// Respond with not found.
    NotFound,
    /// Render this document with its `view`.
    Render(Arc<ContentDocument>),
}

/// Content site rooted at a directory.
///
/// Cheap to clone; clones share caches.
#[derive(Clone)]
pub struct Site {
    inner: Arc<SiteInner>,
}

impl Site {
    /// Create a site without URL rules.
    #[must_use]
    pub fn new(config: SiteConfig) -> Self {
        Self::with_rules(config, UrlRules::default())
    }

    /// Create a site that applies `rules` in [`handle`](Self::handle).
    #[must_use]
    pub fn with_rules(config: SiteConfig, rules: UrlRules) -> Self {
        let pages: Box<dyn PageCache> = if config.cache_enabled {
            tracing::debug!(max_pages = config.cache_max_pages.get(), "Cache enabled");
            Box::new(LruPageCache::new(config.cache_max_pages))
        } else {
            tracing::debug!("Cache disabled");
            Box::new(NullPageCache)
        };

        Self {
            inner: Arc::new(SiteInner {
                shared: Arc::new(SiteShared::new(config)),
                pages,
                rules,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SiteInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.inner.shared.config
    }

    pub fn url_rules(&self) -> &UrlRules {
        &self.inner.rules
    }

    /// Process-wide image size cache used by this site.
    pub fn image_sizes(&self) -> &ImageSizeCache {
        &self.inner.shared.images
    }

    /// Load the document for `url`.
    ///
    /// The query string and fragment are ignored. With caching enabled, two
    /// loads of the same URL return the same instance.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] when no content file backs the URL,
    /// and any error raised while parsing, importing, fetching the external
    /// body or resolving references.
    pub async fn load(&self, url: &str) -> Result<Arc<ContentDocument>, LoadError> {
        let key = collapse_slashes(split_path(url).0);
        if let Some(doc) = self.cached(&key) {
            return Ok(doc);
        }

        let mapped = map_url(&self.inner.shared.config.content_root, &key).await?;
        if mapped.url != key
            && let Some(doc) = self.cached(&mapped.url)
        {
            return Ok(doc);
        }

        let cache = Arc::new(ReferenceCache::default());
        let doc = Arc::new(
            self.build(mapped, ReferenceScope::Root(Arc::clone(&cache)))
                .await?,
        );
        cache.set_root(&doc);
        doc.prefetch_references().await?;

        self.inner.pages.put(doc.url(), Arc::clone(&doc));
        tracing::debug!(url = %doc.url(), filename = %doc.filename(), "Loaded page");
        Ok(doc)
    }

    fn cached(&self, url: &str) -> Option<Arc<ContentDocument>> {
        let doc = self.inner.pages.get(url)?;
        tracing::debug!(url = %doc.url(), "Page found in cache");
        Some(doc)
    }

    /// Load a mapped reference target on behalf of a root load.
    ///
    /// Bypasses the page cache.
    pub(crate) async fn load_reference(
        &self,
        mapped: MappedUrl,
        cache: Weak<ReferenceCache>,
    ) -> Result<Arc<ContentDocument>, LoadError> {
        tracing::debug!(url = %mapped.url, "Loading reference");
        Ok(Arc::new(
            self.build(mapped, ReferenceScope::Member(cache)).await?,
        ))
    }

    async fn build(
        &self,
        mapped: MappedUrl,
        scope: ReferenceScope,
    ) -> Result<ContentDocument, LoadError> {
        let shared = &self.inner.shared;
        let mut page = load_page_file(&shared.config.content_root, &mapped.path).await?;

        let external = page
            .fields
            .get(EXTERNAL_BODY_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned);
        if let Some(external_url) = external {
            let body = fetch_external_body(&shared.agent, &external_url).await?;
            append_body(&mut page.raw_body, &body);
        }

        Ok(ContentDocument::new(
            mapped,
            page,
            Arc::clone(shared),
            Arc::downgrade(&self.inner),
            scope,
        ))
    }

    /// Clear the page cache and the image size cache.
    pub fn clear_cache(&self) {
        self.inner.pages.clear();
        self.inner.shared.images.clear();
        tracing::info!("Cache cleared");
    }

    /// Decide how to answer a request.
    ///
    /// Runs the URL rules, loads the content and follows a document-level
    /// `redirect` field. A missing content file becomes
    /// [`Dispatch::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns load errors other than not-found.
    pub async fn handle(
        &self,
        method: &str,
        target: &RequestTarget,
    ) -> Result<Dispatch, LoadError> {
        if !method.eq_ignore_ascii_case("GET") && !method.eq_ignore_ascii_case("HEAD") {
            return Ok(Dispatch::Pass);
        }

        let url = match self.inner.rules.apply(target) {
            RuleOutcome::Continue(url) => url,
            RuleOutcome::Redirect(url) => return Ok(Dispatch::Redirect(url)),
            RuleOutcome::Proxy(url) => return Ok(Dispatch::Proxy(url)),
            RuleOutcome::NotFound => return Ok(Dispatch::NotFound),
        };

        let doc = match self.load(&url).await {
            Ok(doc) => doc,
            Err(e) if e.is_not_found() => return Ok(Dispatch::NotFound),
            Err(e) => return Err(e),
        };
        match doc.redirect() {
            Some(redirect) => Ok(Dispatch::Redirect(redirect.to_owned())),
            None => Ok(Dispatch::Render(doc)),
        }
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("config", self.config())
            .field("rules", &self.inner.rules.len())
            .finish_non_exhaustive()
    }
}
