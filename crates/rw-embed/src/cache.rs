//! Memo of fully resolved documents.
//!
//! Keys are the exact raw markdown text. Entries are written once and never
//! evicted by [`DocumentCache`]; supply a custom [`DocumentStore`] for
//! bounded or disabled caching.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, LazyLock, RwLock};

use crate::token::TokenList;

static GLOBAL: LazyLock<Arc<DocumentCache>> = LazyLock::new(|| Arc::new(DocumentCache::new()));

/// Storage for resolved token lists keyed by raw text.
pub trait DocumentStore: Send + Sync {
    /// Copy of the list stored for `raw`, sharing its link table.
    fn get(&self, raw: &str) -> Option<TokenList>;

    /// Store `tokens` for `raw` unless an entry already exists.
    fn insert(&self, raw: &str, tokens: TokenList);
}

/// In-memory insert-only store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rw_embed::{DocumentCache, DocumentStore, Token, TokenList};
///
/// let cache = DocumentCache::new();
/// cache.insert("# A", TokenList::new(vec![Token::html("<h1>A</h1>")]));
///
/// let first = cache.get("# A").unwrap();
/// let second = cache.get("# A").unwrap();
/// assert!(Arc::ptr_eq(&first.links, &second.links));
/// assert!(cache.get("# B").is_none());
/// ```
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: RwLock<HashMap<String, TokenList>>,
}

impl DocumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache shared by splicers that were not given a store.
    #[must_use]
    pub fn global() -> Arc<DocumentCache> {
        Arc::clone(&GLOBAL)
    }

    /// Number of cached documents.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for DocumentCache {
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    fn get(&self, raw: &str) -> Option<TokenList> {
        self.entries.read().unwrap().get(raw).cloned()
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    fn insert(&self, raw: &str, tokens: TokenList) {
        let mut entries = self.entries.write().unwrap();
        if let Entry::Vacant(entry) = entries.entry(raw.to_owned()) {
            entry.insert(tokens);
        }
    }
}

/// Store that never retains anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl DocumentStore for NullStore {
    fn get(&self, _raw: &str) -> Option<TokenList> {
        None
    }

    fn insert(&self, _raw: &str, _tokens: TokenList) {}
}
