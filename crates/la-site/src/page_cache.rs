//! Page caching infrastructure.
//!
//! Provides a trait for page caching and implementations:
//! - [`PageCache`]: Trait for cache implementations
//! - [`NullPageCache`]: No-op cache (disabled caching)
//! - [`LruPageCache`]: In-memory cache bounded by page count

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::document::ContentDocument;

/// Trait for page caching implementations.
///
/// Keys are canonical URLs. Entries are fully resolved documents shared by
/// reference, so a hit returns the same instance that was stored.
pub trait PageCache: Send + Sync {
    /// Retrieve a cached document.
    fn get(&self, url: &str) -> Option<Arc<ContentDocument>>;

    /// Store a document under `url`.
    fn put(&self, url: &str, doc: Arc<ContentDocument>);

    /// Drop every entry.
    fn clear(&self);
}

/// No-op cache implementation.
///
/// Always returns cache misses and discards stored content.
/// Use when caching is disabled.
#[derive(Debug, Default)]
pub struct NullPageCache;

impl PageCache for NullPageCache {
    fn get(&self, _url: &str) -> Option<Arc<ContentDocument>> {
        None
    }

    fn put(&self, _url: &str, _doc: Arc<ContentDocument>) {}

    fn clear(&self) {}
}

/// In-memory cache evicting the least recently used page.
pub struct LruPageCache {
    pages: Mutex<LruCache<String, Arc<ContentDocument>>>,
}

impl LruPageCache {
    /// Create a cache holding at most `capacity` pages.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            pages: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageCache for LruPageCache {
    fn get(&self, url: &str) -> Option<Arc<ContentDocument>> {
        self.pages.lock().unwrap().get(url).map(Arc::clone)
    }

    fn put(&self, url: &str, doc: Arc<ContentDocument>) {
        self.pages.lock().unwrap().put(url.to_owned(), doc);
    }

    fn clear(&self) {
        self.pages.lock().unwrap().clear();
    }
}

impl std::fmt::Debug for LruPageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruPageCache")
            .field("len", &self.len())
            .finish()
    }
}
