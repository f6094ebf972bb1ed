//! Fetching embedded content.
//!
//! [`Fetch`] is the seam the resolver pulls bodies through. Fetch failures
//! never surface as errors: implementations log them and return `None`, which
//! leaves the embed's host link in place.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use ureq::Agent;

use crate::consts::DEFAULT_TIMEOUT;
use crate::util::{has_scheme, join_path};

/// Retrieves the body behind an embed URL.
pub trait Fetch: Send + Sync {
    /// Fetch `url`, returning `None` on any failure.
    fn fetch(&self, url: &str) -> Option<String>;
}

/// Single fetch failure, logged by the fetchers before degrading to `None`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("path escapes source directory: {0}")]
    OutsideRoot(String),
}

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// HTTP fetcher backed by a pooled `ureq` agent.
///
/// URLs without a scheme are joined onto `origin` when one is configured.
pub struct HttpFetcher {
    agent: Agent,
    origin: Option<String>,
}

impl HttpFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: create_agent(DEFAULT_TIMEOUT),
            origin: None,
        }
    }

    /// Set the origin relative URLs are fetched from (e.g. `https://docs.example.com`).
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Set the HTTP timeout for each request.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    fn absolute_url(&self, url: &str) -> String {
        match &self.origin {
            Some(origin) if !has_scheme(url) => join_path(origin, url),
            _ => url.to_owned(),
        }
    }

    fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::Http(e.to_string()))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Option<String> {
        let url = self.absolute_url(url);
        match self.try_fetch(&url) {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to fetch embed");
                None
            }
        }
    }
}

/// Filesystem fetcher: URLs are paths relative to a source directory.
///
/// Leading slashes are ignored, so `/guide/a.md` and `guide/a.md` name the
/// same file. Paths climbing out of the root are rejected.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(url.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(FetchError::OutsideRoot(url.to_owned()));
        }
        Ok(self.root.join(relative))
    }

    fn try_fetch(&self, url: &str) -> Result<String, FetchError> {
        let path = self.resolve(url)?;
        Ok(std::fs::read_to_string(path)?)
    }
}

impl Fetch for FsFetcher {
    fn fetch(&self, url: &str) -> Option<String> {
        match self.try_fetch(url) {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to read embed");
                None
            }
        }
    }
}
