//! Queue item lifecycle states

use serde::{Deserialize, Serialize};

/// Lifecycle state of a queue item
///
/// States only advance: `Pending → Loading → Committed | Failed`. An item
/// may also fail straight from `Pending` when a predecessor fails or the
/// queue aborts before dispatching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Created, load not yet invoked
    #[default]
    Pending,
    /// Loader invoked, not settled
    Loading,
    /// Fetched and, where applicable, inserted into the document
    Committed,
    /// Unrecoverable error
    Failed,
}

impl ItemState {
    /// Check if this is a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Check whether moving to `next` is a forward transition
    pub fn can_advance_to(self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Loading)
                | (Self::Pending, Self::Failed)
                | (Self::Loading, Self::Committed)
                | (Self::Loading, Self::Failed)
        )
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Loading => write!(f, "loading"),
            Self::Committed => write!(f, "committed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
