//! Queue configuration

use serde::{Deserialize, Serialize};

use crate::options::Options;

/// How a queue's joint completion reacts to item failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// Wait for every item and report successes and failures together
    #[default]
    Soft,
    /// Reject on the first failure and stop dispatching new items
    Fast,
}

impl std::fmt::Display for FailMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Soft => write!(f, "soft"),
            Self::Fast => write!(f, "fast"),
        }
    }
}

impl std::str::FromStr for FailMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "soft" => Ok(Self::Soft),
            "fast" => Ok(Self::Fast),
            _ => Err(format!("Unknown fail mode: {}", s)),
        }
    }
}

/// Queue configuration, fixed at construction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Failure policy for the joint completion
    #[serde(rename = "fail-mode")]
    pub fail_mode: FailMode,

    /// Options every item inherits unless it overrides them
    pub defaults: Options,
}

impl QueueConfig {
    /// Fail-fast configuration with no defaults
    pub fn fail_fast() -> Self {
        Self {
            fail_mode: FailMode::Fast,
            ..Default::default()
        }
    }

    /// Builder-style defaults setter
    pub fn with_defaults(mut self, defaults: Options) -> Self {
        self.defaults = defaults;
        self
    }
}
