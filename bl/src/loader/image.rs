//! Image loader

use async_trait::async_trait;
use tracing::debug;

use crate::dom::Node;
use crate::error::{ConfigurationError, LoadError};
use crate::options::Options;
use crate::resource::Resource;

use super::{LoadContext, Loader, required_url};

/// Loads images, optionally attaching an `<img>` node
///
/// Options: `url` (required), `attach` (default `true`), `attributes.*`.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    url: String,
    attach: bool,
}

impl ImageLoader {
    pub fn new(item: &str, options: &Options) -> Result<Self, ConfigurationError> {
        Ok(Self {
            url: required_url(item, options)?,
            attach: options.get_bool("attach").unwrap_or(true),
        })
    }

    async fn load(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        let resource = ctx.fetch(&self.url).await?;
        if self.attach {
            let mut node = Node::new("img").with_attribute("src", self.url.clone());
            node.apply_attributes(ctx.options());
            ctx.commit(node).await?;
        }
        Ok(resource)
    }
}

#[async_trait]
impl Loader for ImageLoader {
    fn kind(&self) -> &'static str {
        "image"
    }

    async fn load_sync(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, "ImageLoader::load_sync: called");
        self.load(ctx).await
    }

    // Images carry no ordering requirement, so async is the same operation
    async fn load_async(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, "ImageLoader::load_async: called");
        self.load(ctx).await
    }
}
