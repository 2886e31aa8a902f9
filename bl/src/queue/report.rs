//! Joint outcome of a queue run

use crate::error::LoadError;
use crate::item::ItemState;
use crate::resource::Resource;

/// Settled outcome of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub id: String,
    pub result: Result<Resource, LoadError>,
}

impl ItemOutcome {
    pub fn state(&self) -> ItemState {
        if self.result.is_ok() {
            ItemState::Committed
        } else {
            ItemState::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.result.as_ref().err()
    }
}

/// Outcomes of every item, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl QueueReport {
    /// Item ids in declaration order
    pub fn ids(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.id.as_str()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Check whether every item committed
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::is_success)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
