//! Per-call environment handed to loaders

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::dom::{Document, Node};
use crate::error::{ConfigurationError, LoadError};
use crate::item::Completion;
use crate::options::Options;
use crate::precedence::Precedence;
use crate::resource::Resource;

use super::fetch::Fetcher;

/// Everything a loader may touch while loading one item
///
/// Commits always go through [`LoadContext::commit`] or
/// [`LoadContext::commit_ordered`], never to the document directly, so that
/// precedence directives hold for every loader.
pub struct LoadContext {
    item: String,
    options: Arc<Options>,
    document: Document,
    fetcher: Arc<dyn Fetcher>,
    /// Settlements gating this item's commit (`loader.async` directive)
    commit_gates: Vec<Completion>,
    /// Earlier members of the ordered commit lane, in declaration order
    lane: Vec<Completion>,
    /// Whether plain commits also wait for the lane (sync items)
    ordered: bool,
    precedence: Option<Arc<Mutex<Precedence>>>,
}

impl LoadContext {
    /// Create a context outside of a queue: no gates, no ordered predecessors
    pub fn new(item: impl Into<String>, options: Arc<Options>, document: Document, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            item: item.into(),
            options,
            document,
            fetcher,
            commit_gates: Vec::new(),
            lane: Vec::new(),
            ordered: false,
            precedence: None,
        }
    }

    pub(crate) fn with_commit_gates(mut self, gates: Vec<Completion>) -> Self {
        self.commit_gates = gates;
        self
    }

    pub(crate) fn with_lane(mut self, lane: Vec<Completion>, ordered: bool) -> Self {
        self.lane = lane;
        self.ordered = ordered;
        self
    }

    pub(crate) fn with_precedence(mut self, precedence: Arc<Mutex<Precedence>>) -> Self {
        self.precedence = Some(precedence);
        self
    }

    /// Id of the item being loaded
    pub fn item_id(&self) -> &str {
        &self.item
    }

    /// Resolved options of the item being loaded
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Fetch a resource through the queue's fetcher
    pub async fn fetch(&self, url: &str) -> Result<Resource, LoadError> {
        debug!(item = %self.item, %url, "LoadContext::fetch: called");
        self.fetcher.fetch(url).await
    }

    /// Commit a node once every commit gate has settled successfully
    ///
    /// A failed gate fails this commit with the gate's own error and the node
    /// is not inserted. Sync items also wait for earlier lane members, so they
    /// never overtake an earlier ordered async commit.
    pub async fn commit(&self, node: Node) -> Result<(), LoadError> {
        debug!(item = %self.item, gates = self.commit_gates.len(), ordered = self.ordered, "LoadContext::commit: called");
        if self.ordered {
            self.wait_lane().await;
        }
        self.commit_gated(node).await
    }

    /// Commit a node in declaration order on the ordered commit lane
    ///
    /// Waits for every earlier lane member (sync items and ordered async items)
    /// to settle, successfully or not, before taking the gated commit path.
    pub async fn commit_ordered(&self, node: Node) -> Result<(), LoadError> {
        debug!(item = %self.item, earlier = self.lane.len(), "LoadContext::commit_ordered: called");
        self.wait_lane().await;
        self.commit_gated(node).await
    }

    async fn wait_lane(&self) {
        for earlier in &self.lane {
            let _ = earlier.wait().await;
        }
    }

    async fn commit_gated(&self, node: Node) -> Result<(), LoadError> {
        for gate in &self.commit_gates {
            if let Err(e) = gate.wait().await {
                debug!(item = %self.item, gate = %gate.id(), "LoadContext::commit: gate failed");
                return Err(e);
            }
        }
        self.document.append(&self.item, node).await;
        Ok(())
    }

    /// Declare this item as the load predecessor of `sibling`
    ///
    /// Fails with `DirectiveTooLate` once the sibling has been dispatched.
    pub async fn precede(&self, sibling: &str) -> Result<(), ConfigurationError> {
        debug!(item = %self.item, %sibling, "LoadContext::precede: called");
        match &self.precedence {
            Some(precedence) => precedence.lock().await.transfer(&self.item, sibling),
            None => Err(ConfigurationError::UnknownItem {
                item: self.item.clone(),
                reference: sibling.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("item", &self.item)
            .field("commit_gates", &self.commit_gates.len())
            .field("lane", &self.lane.len())
            .finish_non_exhaustive()
    }
}
