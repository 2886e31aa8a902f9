//! Stylesheet loader

use async_trait::async_trait;
use tracing::debug;

use crate::dom::Node;
use crate::error::{ConfigurationError, LoadError};
use crate::options::Options;
use crate::resource::Resource;

use super::{LoadContext, Loader, required_url};

/// Loads stylesheets as `<link>` or inline `<style>` nodes
///
/// Options: `url` (required), `inline` (default `false`), `attributes.*`.
#[derive(Debug, Clone)]
pub struct StyleLoader {
    url: String,
    inline: bool,
}

impl StyleLoader {
    pub fn new(item: &str, options: &Options) -> Result<Self, ConfigurationError> {
        Ok(Self {
            url: required_url(item, options)?,
            inline: options.get_bool("inline").unwrap_or(false),
        })
    }

    fn link(&self, options: &Options) -> Node {
        let mut node = Node::new("link")
            .with_attribute("rel", "stylesheet")
            .with_attribute("href", self.url.clone());
        node.apply_attributes(options);
        node
    }

    fn style(&self, options: &Options, resource: &Resource) -> Result<Node, LoadError> {
        let body = resource.as_text().ok_or_else(|| LoadError::Decode {
            url: self.url.clone(),
            reason: "stylesheet is not UTF-8 text".to_string(),
        })?;
        let mut node = Node::new("style").with_content(body);
        node.apply_attributes(options);
        Ok(node)
    }

    fn node(&self, options: &Options, resource: &Resource) -> Result<Node, LoadError> {
        if self.inline {
            self.style(options, resource)
        } else {
            Ok(self.link(options))
        }
    }
}

#[async_trait]
impl Loader for StyleLoader {
    fn kind(&self) -> &'static str {
        "style"
    }

    /// Inline rules keep cascade order; linked sheets commit when ready
    fn commits_in_order(&self) -> bool {
        self.inline
    }

    async fn load_sync(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, inline = self.inline, "StyleLoader::load_sync: called");
        let resource = ctx.fetch(&self.url).await?;
        ctx.commit(self.node(ctx.options(), &resource)?).await?;
        Ok(resource)
    }

    async fn load_async(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, inline = self.inline, "StyleLoader::load_async: called");
        let resource = ctx.fetch(&self.url).await?;
        let node = self.node(ctx.options(), &resource)?;

        // Inline rules depend on cascade order; linked sheets are left to the host
        if self.inline {
            ctx.commit_ordered(node).await?;
        } else {
            ctx.commit(node).await?;
        }
        Ok(resource)
    }
}
