//! Error types for queue setup and resource loading

use thiserror::Error;

/// Errors raised synchronously while configuring or starting a queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Item id '{id}' is already used in this queue")]
    DuplicateId { id: String },

    #[error("Item '{item}' is missing required option '{option}'")]
    MissingOption { item: String, option: String },

    #[error("Item '{item}' has an invalid '{directive}' directive: {reason}")]
    InvalidDirective {
        item: String,
        directive: String,
        reason: String,
    },

    #[error("Item '{item}' references unknown item '{reference}'")]
    UnknownItem { item: String, reference: String },

    #[error("Precedence cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Directive on '{target}' installed after it was dispatched")]
    DirectiveTooLate { target: String },

    #[error("Queue has already been started")]
    AlreadyStarted,

    #[error("Unknown loader kind: {0}")]
    UnknownLoader(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Errors raised asynchronously through an item's completion
///
/// Cloneable because every observer of a settled item receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Failed to commit item '{item}': {reason}")]
    Commit { item: String, reason: String },

    #[error("Item '{item}' aborted after '{failed}' failed")]
    Aborted { item: String, failed: String },

    #[error("Item '{item}' was dropped before settling")]
    Abandoned { item: String },
}

impl LoadError {
    /// Check if this error was caused by another item failing first
    pub fn is_aborted(&self) -> bool {
        matches!(self, LoadError::Aborted { .. })
    }

    /// Get the URL involved in the failure, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            LoadError::Fetch { url, .. } | LoadError::NotFound { url } | LoadError::Decode { url, .. } => {
                Some(url.as_str())
            }
            _ => None,
        }
    }
}

/// Errors surfaced by a queue's joint completion
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    #[error("Item '{item}' failed: {source}")]
    Load {
        item: String,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl QueueError {
    /// Id of the item whose failure rejected the queue
    pub fn item(&self) -> Option<&str> {
        match self {
            QueueError::Load { item, .. } => Some(item.as_str()),
            QueueError::Configuration(_) => None,
        }
    }
}
