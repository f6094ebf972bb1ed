//! Mock fetcher for testing.
//!
//! Provides [`MockFetcher`] for exercising resolution without network or
//! filesystem access.

use std::collections::HashMap;
use std::sync::RwLock;
use std::thread;
use std::time::Duration;

use crate::fetch::Fetch;

/// In-memory fetcher with per-URL bodies, delays and call counting.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use rw_embed::{Fetch, MockFetcher};
///
/// let fetcher = MockFetcher::new()
///     .with_body("a.md", "# A")
///     .with_delay("a.md", Duration::from_millis(20));
///
/// assert_eq!(fetcher.fetch("a.md").as_deref(), Some("# A"));
/// assert_eq!(fetcher.calls("a.md"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockFetcher {
    bodies: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: RwLock<HashMap<String, usize>>,
}

impl MockFetcher {
    /// Create a fetcher that knows no URLs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Sleep for `delay` before answering `url`.
    #[must_use]
    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    /// Number of times `url` was fetched.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self, url: &str) -> usize {
        self.calls.read().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Total number of fetches across all URLs.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.read().unwrap().values().sum()
    }
}

impl Fetch for MockFetcher {
    fn fetch(&self, url: &str) -> Option<String> {
        *self
            .calls
            .write()
            .unwrap()
            .entry(url.to_owned())
            .or_default() += 1;

        if let Some(delay) = self.delays.get(url) {
            thread::sleep(*delay);
        }
        self.bodies.get(url).cloned()
    }
}
