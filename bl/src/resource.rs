//! Loaded resource payloads

/// Payload produced by a loader
///
/// Payloads are opaque to the queue; loaders decide whether a body is text
/// or binary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Resource {
    /// Loaded without a payload (e.g. nothing to return)
    #[default]
    Empty,
    /// UTF-8 text body
    Text(String),
    /// Raw bytes
    Binary(Vec<u8>),
}

impl Resource {
    /// Classify raw bytes: valid UTF-8 becomes `Text`, anything else `Binary`
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Resource::Text(text),
            Err(e) => Resource::Binary(e.into_bytes()),
        }
    }

    /// Get the text body, if this is a text payload
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Resource::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Resource::Empty => 0,
            Resource::Text(text) => text.len(),
            Resource::Binary(bytes) => bytes.len(),
        }
    }

    /// Check if the payload carries no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Resource {
    fn from(text: &str) -> Self {
        Resource::Text(text.to_string())
    }
}

impl From<String> for Resource {
    fn from(text: String) -> Self {
        Resource::Text(text)
    }
}

impl From<Vec<u8>> for Resource {
    fn from(bytes: Vec<u8>) -> Self {
        Resource::Binary(bytes)
    }
}
