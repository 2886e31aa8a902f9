//! Document loader: fetch-only resources (HTML fragments, JSON, text)

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ConfigurationError, LoadError};
use crate::options::Options;
use crate::resource::Resource;

use super::{LoadContext, Loader, required_url};

/// Expected body format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

/// Fetches a text document without touching the host document
///
/// Options: `url` (required), `format` (`text` default, or `json`).
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    url: String,
    format: Format,
}

impl DocumentLoader {
    pub fn new(item: &str, options: &Options) -> Result<Self, ConfigurationError> {
        let format = match options.get_str("format").unwrap_or("text") {
            "text" | "html" => Format::Text,
            "json" => Format::Json,
            other => {
                return Err(ConfigurationError::InvalidOptions(format!(
                    "item '{}': unknown document format '{}'",
                    item, other
                )));
            }
        };

        Ok(Self {
            url: required_url(item, options)?,
            format,
        })
    }

    async fn load(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        let resource = ctx.fetch(&self.url).await?;
        let body = resource.as_text().ok_or_else(|| LoadError::Decode {
            url: self.url.clone(),
            reason: "document is not UTF-8 text".to_string(),
        })?;

        if self.format == Format::Json {
            serde_json::from_str::<serde_json::Value>(body).map_err(|e| LoadError::Decode {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(resource)
    }
}

#[async_trait]
impl Loader for DocumentLoader {
    fn kind(&self) -> &'static str {
        "document"
    }

    async fn load_sync(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, "DocumentLoader::load_sync: called");
        self.load(ctx).await
    }

    async fn load_async(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, "DocumentLoader::load_async: called");
        self.load(ctx).await
    }
}
