//! Loader capability and the built-in loader kinds
//!
//! A loader fetches one resource and, where the resource type has one,
//! commits its document side effect. The queue only relies on the two
//! operations of the [`Loader`] trait; everything else lives in the
//! concrete kinds.

mod context;
mod document;
mod fetch;
mod image;
mod script;
mod style;

pub use context::LoadContext;
pub use document::DocumentLoader;
pub use fetch::{FileFetcher, Fetcher, StaticFetcher};
pub use image::ImageLoader;
pub use script::ScriptLoader;
pub use style::StyleLoader;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigurationError, LoadError};
use crate::options::Options;
use crate::resource::Resource;

/// Fetch-and-commit capability for one resource type
#[async_trait]
pub trait Loader: Send + Sync {
    /// Short name of the resource type
    fn kind(&self) -> &'static str;

    /// Fetch and commit before returning
    ///
    /// By the time this returns, any document-order-dependent effect of the
    /// resource is visible.
    async fn load_sync(&self, ctx: &LoadContext) -> Result<Resource, LoadError>;

    /// Fetch without blocking later queue items
    ///
    /// Commit timing is up to the loader. Loaders that need document order
    /// despite fetching concurrently commit through
    /// [`LoadContext::commit_ordered`].
    async fn load_async(&self, ctx: &LoadContext) -> Result<Resource, LoadError>;

    /// Whether `load_async` commits through [`LoadContext::commit_ordered`]
    ///
    /// Async items whose loader answers `true` join the queue's ordered commit
    /// lane, so later ordered and sync commits wait for them.
    fn commits_in_order(&self) -> bool {
        false
    }
}

/// Built-in loader kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Script,
    Style,
    Image,
    Document,
}

impl LoaderKind {
    /// Build a loader of this kind for `item` from its resolved options
    pub fn build(self, item: &str, options: &Options) -> Result<Arc<dyn Loader>, ConfigurationError> {
        debug!(%item, kind = %self, "LoaderKind::build: called");
        let loader: Arc<dyn Loader> = match self {
            Self::Script => Arc::new(ScriptLoader::new(item, options)?),
            Self::Style => Arc::new(StyleLoader::new(item, options)?),
            Self::Image => Arc::new(ImageLoader::new(item, options)?),
            Self::Document => Arc::new(DocumentLoader::new(item, options)?),
        };
        Ok(loader)
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Style => write!(f, "style"),
            Self::Image => write!(f, "image"),
            Self::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for LoaderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "script" | "js" => Ok(Self::Script),
            "style" | "css" | "stylesheet" => Ok(Self::Style),
            "image" | "img" => Ok(Self::Image),
            "document" | "doc" => Ok(Self::Document),
            _ => Err(ConfigurationError::UnknownLoader(s.to_string())),
        }
    }
}

/// Read the required `url` option
pub(crate) fn required_url(item: &str, options: &Options) -> Result<String, ConfigurationError> {
    options
        .get_str("url")
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigurationError::MissingOption {
            item: item.to_string(),
            option: "url".to_string(),
        })
}
