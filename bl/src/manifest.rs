//! Manifest files: a declared list of load requests
//!
//! ```yaml
//! items:
//!   - id: vendor
//!     kind: script
//!     options:
//!       url: js/vendor.js
//!   - id: app
//!     kind: script
//!     options:
//!       url: js/app.js
//!       async: true
//!       loader:
//!         sync: vendor
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::Document;
use crate::error::ConfigurationError;
use crate::item::LoadRequest;
use crate::loader::{Fetcher, LoaderKind};
use crate::options::Options;
use crate::queue::{Queue, QueueConfig};

/// One declared item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    /// Item id; generated when absent
    #[serde(default)]
    pub id: Option<String>,

    /// Built-in loader kind
    pub kind: LoaderKind,

    /// Item-local options
    #[serde(default)]
    pub options: Options,
}

impl ManifestItem {
    pub fn to_request(&self) -> LoadRequest {
        let request = LoadRequest::new(self.kind).with_options(self.options.clone());
        match &self.id {
            Some(id) => request.with_id(id.clone()),
            None => request,
        }
    }
}

/// Declared items in queue order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub items: Vec<ManifestItem>,
}

impl Manifest {
    /// Load a manifest from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Manifest::load: called");
        let content = fs::read_to_string(path).context(format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content).context(format!("Failed to parse manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(content)?;
        debug!(items = manifest.items.len(), "Manifest::parse: parsed");
        Ok(manifest)
    }

    /// Enqueue every item, stopping at the first configuration error
    pub fn build_queue(
        &self,
        config: QueueConfig,
        document: Document,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Queue, ConfigurationError> {
        debug!(items = self.items.len(), "Manifest::build_queue: called");
        let mut queue = Queue::new(config, document, fetcher);
        for item in &self.items {
            queue.enqueue(item.to_request())?;
        }
        Ok(queue)
    }
}
