//! Declarative references between content documents.
//!
//! A document's `references` field maps keys to URLs:
//!
//! ```yaml
//! references:
//!   other: /other
//!   related: [a, b]
//!   nav:
//!     up: ../
//! ```
//!
//! A string leaf is a single reference, a list is an ordered sequence of
//! references and an object nests further keys. Nested keys are addressed
//! with dotted paths such as `nav.up`.
//!
//! Referenced documents are loaded through a cache that belongs to the root
//! load, keyed by canonical URL. Every document reached from one root shares
//! that cache, so a document is loaded once per root however its URL is
//! spelled, and reference cycles end at an already cached instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use serde_json::Value;

use crate::document::ContentDocument;

/// Key under which `sequence` entries are exposed as references.
pub const SEQUENCE_KEY: &str = "sequence";

/// Declared reference tree, with URLs as written in metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceSpec {
    Single(String),
    List(Vec<String>),
    Nested(Vec<(String, ReferenceSpec)>),
}

impl Default for ReferenceSpec {
    fn default() -> Self {
        Self::Nested(Vec::new())
    }
}

impl ReferenceSpec {
    /// Build a spec from metadata, ignoring values that are not references.
    ///
    /// List entries may be URL strings or objects with a `url` field.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) => Some(Self::Single(url.clone())),
            Value::Array(items) => Some(Self::List(items.iter().filter_map(entry_url).collect())),
            Value::Object(fields) => Some(Self::Nested(
                fields
                    .iter()
                    .filter_map(|(key, value)| Some((key.clone(), Self::from_value(value)?)))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Find the declaration at a dotted key path. The empty path is `self`.
    pub fn lookup(&self, path: &str) -> Option<&Self> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.').try_fold(self, |spec, key| match spec {
            Self::Nested(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, s)| s),
            Self::Single(_) | Self::List(_) => None,
        })
    }

    /// Every URL in the tree, depth first, in declaration order.
    pub fn urls(&self) -> Vec<&str> {
        let mut urls = Vec::new();
        self.collect_urls(&mut urls);
        urls
    }

    fn collect_urls<'a>(&'a self, urls: &mut Vec<&'a str>) {
        match self {
            Self::Single(url) => urls.push(url),
            Self::List(list) => urls.extend(list.iter().map(String::as_str)),
            Self::Nested(entries) => {
                for (_, spec) in entries {
                    spec.collect_urls(urls);
                }
            }
        }
    }

    /// Add `spec` under `key` unless the key is already declared.
    pub(crate) fn insert_default(&mut self, key: &str, spec: Self) {
        if let Self::Nested(entries) = self
            && !entries.iter().any(|(k, _)| k == key)
        {
            entries.push((key.to_owned(), spec));
        }
    }
}

fn entry_url(item: &Value) -> Option<String> {
    match item {
        Value::String(url) => Some(url.clone()),
        Value::Object(fields) => fields.get("url")?.as_str().map(str::to_owned),
        _ => None,
    }
}

/// A resolved reference.
#[derive(Clone, Debug)]
pub enum Reference {
    Single(Arc<ContentDocument>),
    List(Vec<Arc<ContentDocument>>),
    Nested(Vec<(String, Reference)>),
}

impl Reference {
    pub fn as_single(&self) -> Option<&Arc<ContentDocument>> {
        match self {
            Self::Single(doc) => Some(doc),
            Self::List(_) | Self::Nested(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Arc<ContentDocument>]> {
        match self {
            Self::List(docs) => Some(docs),
            Self::Single(_) | Self::Nested(_) => None,
        }
    }

    /// Child of a nested reference.
    pub fn get(&self, key: &str) -> Option<&Reference> {
        match self {
            Self::Nested(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, r)| r),
            Self::Single(_) | Self::List(_) => None,
        }
    }
}

/// Documents loaded on behalf of one root document.
///
/// Documents are stored under their canonical URL. Requested URLs that map
/// to a different canonical URL (`/subdir` for `/subdir/`) are kept as
/// aliases, so later lookups need no filesystem access.
#[derive(Default)]
pub(crate) struct ReferenceCache {
    root: OnceLock<Weak<ContentDocument>>,
    entries: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    docs: HashMap<String, Arc<ContentDocument>>,
    aliases: HashMap<String, String>,
}

impl ReferenceCache {
    /// Register the root so references back to it return the root instance.
    pub fn set_root(&self, root: &Arc<ContentDocument>) {
        let _ = self.root.set(Arc::downgrade(root));
    }

    /// Look up a document by requested or canonical URL.
    pub fn get(&self, url: &str) -> Option<Arc<ContentDocument>> {
        let entries = self.entries.lock().unwrap();
        let canonical = entries.aliases.get(url).map_or(url, String::as_str);
        if let Some(root) = self.root.get().and_then(Weak::upgrade)
            && root.url() == canonical
        {
            return Some(root);
        }
        entries.docs.get(canonical).map(Arc::clone)
    }

    /// Remember that `url` resolves to the document at `canonical`.
    pub fn alias(&self, url: &str, canonical: &str) {
        if url != canonical {
            self.entries
                .lock()
                .unwrap()
                .aliases
                .insert(url.to_owned(), canonical.to_owned());
        }
    }

    /// Store a loaded document under its canonical URL, aliased from `url`.
    ///
    /// A document already stored under that canonical URL wins and is
    /// returned instead.
    pub fn insert(&self, url: &str, doc: Arc<ContentDocument>) -> Arc<ContentDocument> {
        self.alias(url, doc.url());
        let mut entries = self.entries.lock().unwrap();
        Arc::clone(entries.docs.entry(doc.url().to_owned()).or_insert(doc))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().docs.len()
    }
}

/// How a document reaches the reference cache of its load.
///
/// The root owns the cache. Documents inside the cache only hold a weak
/// handle, so the cache never keeps itself alive.
pub(crate) enum ReferenceScope {
    Root(Arc<ReferenceCache>),
    Member(Weak<ReferenceCache>),
}

impl ReferenceScope {
    pub fn cache(&self) -> Option<Arc<ReferenceCache>> {
        match self {
            Self::Root(cache) => Some(Arc::clone(cache)),
            Self::Member(cache) => cache.upgrade(),
        }
    }

    pub fn downgrade(&self) -> Weak<ReferenceCache> {
        match self {
            Self::Root(cache) => Arc::downgrade(cache),
            Self::Member(cache) => Weak::clone(cache),
        }
    }
}
