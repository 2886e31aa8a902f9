//! Single-producer, multi-consumer settle point for a queue item

use tokio::sync::watch;
use tracing::debug;

use crate::error::LoadError;
use crate::resource::Resource;

use super::state::ItemState;

/// Current status, including the settled value once terminal
#[derive(Debug, Clone)]
pub(crate) enum Status {
    Pending,
    Loading,
    Committed(Resource),
    Failed(LoadError),
}

impl Status {
    fn state(&self) -> ItemState {
        match self {
            Status::Pending => ItemState::Pending,
            Status::Loading => ItemState::Loading,
            Status::Committed(_) => ItemState::Committed,
            Status::Failed(_) => ItemState::Failed,
        }
    }

    fn outcome(&self) -> Option<Result<Resource, LoadError>> {
        match self {
            Status::Committed(resource) => Some(Ok(resource.clone())),
            Status::Failed(err) => Some(Err(err.clone())),
            _ => None,
        }
    }
}

/// Producer side, owned by the item
#[derive(Debug)]
pub(crate) struct Signal {
    id: String,
    tx: watch::Sender<Status>,
}

impl Signal {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(Status::Pending);
        Self { id: id.into(), tx }
    }

    pub(crate) fn state(&self) -> ItemState {
        self.tx.borrow().state()
    }

    /// Move `Pending → Loading`; false if the item already left `Pending`
    pub(crate) fn begin(&self) -> bool {
        self.transition(Status::Loading)
    }

    /// Settle with the load result; false if already settled
    pub(crate) fn settle(&self, result: Result<Resource, LoadError>) -> bool {
        let next = match result {
            Ok(resource) => Status::Committed(resource),
            Err(err) => Status::Failed(err),
        };
        self.transition(next)
    }

    pub(crate) fn completion(&self) -> Completion {
        Completion {
            id: self.id.clone(),
            rx: self.tx.subscribe(),
        }
    }

    fn transition(&self, next: Status) -> bool {
        let id = &self.id;
        self.tx.send_if_modified(|current| {
            let from = current.state();
            let to = next.state();
            if from.can_advance_to(to) {
                debug!(item = %id, %from, %to, "Signal::transition: advancing");
                *current = next;
                true
            } else {
                debug!(item = %id, %from, %to, "Signal::transition: rejected");
                false
            }
        })
    }
}

/// Observer side of an item's settlement
///
/// Cheap to clone; every clone sees the same settlement.
#[derive(Debug, Clone)]
pub struct Completion {
    id: String,
    rx: watch::Receiver<Status>,
}

impl Completion {
    /// Id of the observed item
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ItemState {
        self.rx.borrow().state()
    }

    /// Settled outcome without waiting, `None` while not terminal
    pub fn outcome(&self) -> Option<Result<Resource, LoadError>> {
        self.rx.borrow().outcome()
    }

    /// Wait until the item settles
    pub async fn wait(&self) -> Result<Resource, LoadError> {
        let mut rx = self.rx.clone();
        let settled = match rx.wait_for(|status| status.state().is_terminal()).await {
            Ok(status) => status.outcome(),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| Err(LoadError::Abandoned { item: self.id.clone() }))
    }
}
