//! In-memory host document
//!
//! The `Document` is the attachment point loaders commit into. It is passed
//! explicitly to each queue, so independent queues never share one unless the
//! caller hands them the same handle.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::options::Options;

/// An element ready to be inserted into the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub content: Option<String>,
}

impl Node {
    /// Create an empty element
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            content: None,
        }
    }

    /// Builder-style `set_attribute`
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style content setter
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Project the `attributes` sub-tree of `options` onto this node
    ///
    /// `true` and `null` become empty (boolean) attributes, `false` is skipped,
    /// numbers and strings are rendered as text.
    pub fn apply_attributes(&mut self, options: &Options) {
        for (name, value) in options.iter("attributes") {
            match value {
                Value::Bool(false) => {}
                Value::Bool(true) | Value::Null => self.set_attribute(name, ""),
                Value::String(s) => self.set_attribute(name, s.clone()),
                other => self.set_attribute(name, other.to_string()),
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attributes {
            if value.is_empty() {
                write!(f, " {}", name)?;
            } else {
                write!(f, " {}=\"{}\"", name, value)?;
            }
        }
        match &self.content {
            Some(content) => write!(f, ">{}</{}>", content, self.tag),
            None if self.tag == "img" || self.tag == "link" => write!(f, ">"),
            None => write!(f, "></{}>", self.tag),
        }
    }
}

/// A node committed to the document, tagged with the item that committed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedNode {
    /// Id of the queue item that committed the node
    pub item: String,
    /// Zero-based position in commit order
    pub sequence: usize,
    pub node: Node,
}

/// Shared handle to the document attachment point
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Arc<Mutex<Vec<CommittedNode>>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its commit sequence number
    pub async fn append(&self, item: &str, node: Node) -> usize {
        let mut nodes = self.nodes.lock().await;
        let sequence = nodes.len();
        debug!(%item, sequence, tag = %node.tag, "Document::append: called");
        nodes.push(CommittedNode {
            item: item.to_string(),
            sequence,
            node,
        });
        sequence
    }

    /// Snapshot of committed nodes in commit order
    pub async fn nodes(&self) -> Vec<CommittedNode> {
        self.nodes.lock().await.clone()
    }

    /// Item ids in the order their nodes were committed
    pub async fn commit_order(&self) -> Vec<String> {
        self.nodes.lock().await.iter().map(|n| n.item.clone()).collect()
    }

    /// Commit position of the first node committed by `item`
    pub async fn position_of(&self, item: &str) -> Option<usize> {
        self.nodes
            .lock()
            .await
            .iter()
            .find(|n| n.item == item)
            .map(|n| n.sequence)
    }

    /// Render the document as markup, one node per line
    pub async fn render(&self) -> String {
        self.nodes
            .lock()
            .await
            .iter()
            .map(|n| n.node.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn len(&self) -> usize {
        self.nodes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.lock().await.is_empty()
    }
}
