//! Beloader - ordered resource loading queue
//!
//! A queue of load requests, each handled by a [`Loader`] that fetches one
//! resource and commits its effect into a [`Document`]. Sync items are loaded
//! one after another in declaration order; async items fetch in the
//! background and commit whenever they are ready, unless a precedence
//! directive says otherwise.
//!
//! # Core Concepts
//!
//! - **Declaration order**: sync items always commit in the order they were enqueued
//! - **Precedence directives**: `loader.sync` gates an item's load on another
//!   item, `loader.async` gates only its commit
//! - **Settlement**: every item ends `Committed` or `Failed`, exactly once
//! - **Joint completion**: fail-soft reports every outcome, fail-fast rejects
//!   on the first failure
//!
//! # Modules
//!
//! - [`queue`] - Queue, run loop and joint completion
//! - [`item`] - Queue items, load requests and completions
//! - [`loader`] - Loader trait, built-in loaders and fetchers
//! - [`precedence`] - Precedence graph and cycle detection
//! - [`options`] - Hierarchical item options
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod dom;
pub mod error;
pub mod item;
pub mod loader;
pub mod manifest;
pub mod options;
pub mod precedence;
pub mod queue;
pub mod resource;

// Re-export commonly used types
pub use config::{Config, FetchConfig};
pub use dom::{CommittedNode, Document, Node};
pub use error::{ConfigurationError, LoadError, QueueError};
pub use item::{Completion, Directives, ItemState, LoadRequest, QueueItem};
pub use loader::{
    DocumentLoader, FileFetcher, Fetcher, ImageLoader, LoadContext, Loader, LoaderKind, ScriptLoader, StaticFetcher,
    StyleLoader,
};
pub use manifest::{Manifest, ManifestItem};
pub use options::Options;
pub use precedence::{Edge, Precedence};
pub use queue::{FailMode, ItemOutcome, JointCompletion, Queue, QueueConfig, QueueReport};
pub use resource::Resource;
