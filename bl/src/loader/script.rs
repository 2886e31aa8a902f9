//! Script loader

use async_trait::async_trait;
use tracing::debug;

use crate::dom::Node;
use crate::error::{ConfigurationError, LoadError};
use crate::options::Options;
use crate::resource::Resource;

use super::{LoadContext, Loader, required_url};

/// Loads external scripts into `<script>` nodes
///
/// Options:
/// - `url` (required): location of the script
/// - `inline` (default `false`): when loaded async, embed the fetched body
///   instead of referencing `url`
/// - `attributes.*`: extra attributes for the node
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    url: String,
    inline: bool,
}

impl ScriptLoader {
    pub fn new(item: &str, options: &Options) -> Result<Self, ConfigurationError> {
        Ok(Self {
            url: required_url(item, options)?,
            inline: options.get_bool("inline").unwrap_or(false),
        })
    }

    fn node(&self, options: &Options) -> Node {
        let mut node = Node::new("script").with_attribute("type", "text/javascript");
        node.apply_attributes(options);
        node
    }
}

#[async_trait]
impl Loader for ScriptLoader {
    fn kind(&self) -> &'static str {
        "script"
    }

    /// Referenced scripts keep their declared position; inline ones run when ready
    fn commits_in_order(&self) -> bool {
        !self.inline
    }

    async fn load_sync(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, "ScriptLoader::load_sync: called");
        let resource = ctx.fetch(&self.url).await?;
        let mut node = self.node(ctx.options());
        node.set_attribute("src", self.url.clone());
        ctx.commit(node).await?;
        Ok(resource)
    }

    async fn load_async(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        debug!(item = %ctx.item_id(), url = %self.url, inline = self.inline, "ScriptLoader::load_async: called");
        let resource = ctx.fetch(&self.url).await?;

        if self.inline {
            let Some(body) = resource.as_text() else {
                return Err(LoadError::Decode {
                    url: self.url.clone(),
                    reason: "inline script is not UTF-8 text".to_string(),
                });
            };
            // An empty body has nothing to execute
            if !body.is_empty() {
                ctx.commit(self.node(ctx.options()).with_content(body)).await?;
            }
            return Ok(resource);
        }

        // Referenced async scripts keep their declared position in the document
        let mut node = self.node(ctx.options());
        node.set_attribute("src", self.url.clone());
        node.set_attribute("async", "");
        ctx.commit_ordered(node).await?;
        Ok(resource)
    }
}
