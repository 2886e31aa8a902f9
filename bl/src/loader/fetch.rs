//! Fetchers: where loaders get resource bodies from

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::LoadError;
use crate::resource::Resource;

/// Source of resource bodies
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Resource, LoadError>;
}

/// Fetches resources from files below a root directory
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL onto a path below the root
    ///
    /// Only relative paths without `..` are accepted; `file://` and leading
    /// slashes are stripped.
    fn resolve(&self, url: &str) -> Result<PathBuf, LoadError> {
        let relative = url.strip_prefix("file://").unwrap_or(url).trim_start_matches('/');
        if relative.is_empty() || relative.contains("://") {
            return Err(LoadError::Fetch {
                url: url.to_string(),
                reason: "unsupported location".to_string(),
            });
        }

        let relative = Path::new(relative);
        if relative.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            return Err(LoadError::Fetch {
                url: url.to_string(),
                reason: format!("path escapes fetch root {}", self.root.display()),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<Resource, LoadError> {
        let path = self.resolve(url)?;
        debug!(%url, path = %path.display(), "FileFetcher::fetch: called");

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Resource::from_bytes(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LoadError::NotFound { url: url.to_string() }),
            Err(e) => Err(LoadError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct StaticEntry {
    body: Result<Resource, String>,
    latency: Duration,
}

/// Serves fixed bodies from memory after a configurable latency
///
/// Useful for demos and tests that need to control fetch completion order.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    entries: HashMap<String, StaticEntry>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url` after `latency`
    pub fn with(mut self, url: impl Into<String>, body: impl Into<Resource>, latency: Duration) -> Self {
        self.entries.insert(
            url.into(),
            StaticEntry {
                body: Ok(body.into()),
                latency,
            },
        );
        self
    }

    /// Fail `url` with `reason` after `latency`
    pub fn with_failure(mut self, url: impl Into<String>, reason: impl Into<String>, latency: Duration) -> Self {
        self.entries.insert(
            url.into(),
            StaticEntry {
                body: Err(reason.into()),
                latency,
            },
        );
        self
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Resource, LoadError> {
        debug!(%url, "StaticFetcher::fetch: called");
        let Some(entry) = self.entries.get(url) else {
            return Err(LoadError::NotFound { url: url.to_string() });
        };

        if !entry.latency.is_zero() {
            tokio::time::sleep(entry.latency).await;
        }

        entry.body.clone().map_err(|reason| LoadError::Fetch {
            url: url.to_string(),
            reason,
        })
    }
}
