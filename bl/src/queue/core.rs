//! Queue implementation

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dom::Document;
use crate::error::{ConfigurationError, LoadError, QueueError};
use crate::item::{Completion, LoadRequest, QueueItem};
use crate::loader::{Fetcher, LoadContext};
use crate::precedence::Precedence;

use super::config::{FailMode, QueueConfig};
use super::report::{ItemOutcome, QueueReport};

/// Precedence registry, owned while building and shared once running
enum Phase {
    Building(Precedence),
    Started(Arc<Mutex<Precedence>>),
}

/// An ordered set of load requests with a joint completion
///
/// Items are dispatched in declaration order. Sync items are awaited before
/// the next item is dispatched; async items load in the background. Every
/// item exposes its own [`Completion`], and [`Queue::completion`] joins them
/// all in declaration order.
pub struct Queue {
    config: QueueConfig,
    items: Vec<QueueItem>,
    index: HashMap<String, usize>,
    phase: Phase,
    document: Document,
    fetcher: Arc<dyn Fetcher>,
}

impl Queue {
    /// Create an empty queue committing into `document` and fetching through `fetcher`
    pub fn new(config: QueueConfig, document: Document, fetcher: Arc<dyn Fetcher>) -> Self {
        debug!(fail_mode = %config.fail_mode, "Queue::new: called");
        Self {
            config,
            items: Vec::new(),
            index: HashMap::new(),
            phase: Phase::Building(Precedence::new()),
            document,
            fetcher,
        }
    }

    /// Append a request, resolving its options and directives
    ///
    /// Returns the new item's completion.
    pub fn enqueue(&mut self, request: LoadRequest) -> Result<Completion, ConfigurationError> {
        debug!(id = ?request.id(), "Queue::enqueue: called");
        let Phase::Building(precedence) = &mut self.phase else {
            debug!("Queue::enqueue: queue already started");
            return Err(ConfigurationError::AlreadyStarted);
        };

        if let Some(id) = request.id()
            && self.index.contains_key(id)
        {
            debug!(%id, "Queue::enqueue: duplicate id");
            return Err(ConfigurationError::DuplicateId { id: id.to_string() });
        }

        let item = QueueItem::resolve(request, &self.config.defaults)?;
        if self.index.contains_key(item.id()) {
            return Err(ConfigurationError::DuplicateId {
                id: item.id().to_string(),
            });
        }
        precedence.register(item.id(), item.is_async(), item.is_ordered(), item.directives())?;

        debug!(id = %item.id(), kind = item.loader_kind(), is_async = item.is_async(), "Queue::enqueue: registered");
        let completion = item.completion();
        self.index.insert(item.id().to_string(), self.items.len());
        self.items.push(item);
        Ok(completion)
    }

    /// Check the queue's configuration without running it
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        debug!(items = self.items.len(), "Queue::validate: called");
        match &self.phase {
            Phase::Building(precedence) => precedence.validate_references(),
            Phase::Started(_) => Err(ConfigurationError::AlreadyStarted),
        }
    }

    /// Start processing; a queue runs exactly once
    ///
    /// Configuration problems are reported here, before any item is
    /// dispatched. Must be called from within a tokio runtime.
    pub fn run(&mut self) -> Result<JointCompletion, ConfigurationError> {
        debug!(items = self.items.len(), "Queue::run: called");
        let precedence = match &mut self.phase {
            Phase::Building(precedence) => {
                precedence.validate_references()?;
                std::mem::take(precedence)
            }
            Phase::Started(_) => {
                warn!("Queue::run called on a queue that already started");
                return Err(ConfigurationError::AlreadyStarted);
            }
        };

        let precedence = Arc::new(Mutex::new(precedence));
        self.phase = Phase::Started(Arc::clone(&precedence));

        info!(items = self.items.len(), fail_mode = %self.config.fail_mode, "Queue starting");
        let driver = Driver {
            items: self.items.clone(),
            precedence,
            document: self.document.clone(),
            fetcher: Arc::clone(&self.fetcher),
            fail_mode: self.config.fail_mode,
        };
        tokio::spawn(driver.run());

        Ok(self.completion())
    }

    /// Joint completion over every item, in declaration order
    pub fn completion(&self) -> JointCompletion {
        JointCompletion {
            items: self.items.iter().map(QueueItem::completion).collect(),
            fail_mode: self.config.fail_mode,
        }
    }

    /// Look up one item's completion by id
    pub fn item(&self, id: &str) -> Option<Completion> {
        self.index.get(id).map(|&i| self.items[i].completion())
    }

    /// Item ids in declaration order
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(QueueItem::id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_started(&self) -> bool {
        matches!(self.phase, Phase::Started(_))
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("config", &self.config)
            .field("items", &self.items)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

/// The run loop of one started queue
struct Driver {
    items: Vec<QueueItem>,
    precedence: Arc<Mutex<Precedence>>,
    document: Document,
    fetcher: Arc<dyn Fetcher>,
    fail_mode: FailMode,
}

impl Driver {
    async fn run(self) {
        let completions: HashMap<&str, Completion> = self.items.iter().map(|i| (i.id(), i.completion())).collect();

        // Ordered commit lane: sync items and in-order async items, in declaration order
        let mut lane: Vec<Completion> = Vec::new();
        let mut dispatched: Vec<Completion> = Vec::new();

        for item in &self.items {
            if self.fail_mode == FailMode::Fast
                && let Some(failed) = first_failure(&dispatched)
            {
                item.fail(LoadError::Aborted {
                    item: item.id().to_string(),
                    failed,
                });
                continue;
            }

            let (load_after, commit_after) = self.precedence.lock().await.dispatch(item.id());
            let load_gates = lookup(&completions, &load_after);
            let ctx = LoadContext::new(
                item.id(),
                item.shared_options(),
                self.document.clone(),
                Arc::clone(&self.fetcher),
            )
            .with_commit_gates(lookup(&completions, &commit_after))
            .with_lane(lane.clone(), !item.is_async())
            .with_precedence(Arc::clone(&self.precedence));

            dispatched.push(item.completion());
            if item.is_ordered() {
                lane.push(item.completion());
            }
            if item.is_async() {
                debug!(id = %item.id(), "Driver::run: async item, continuing");
                tokio::spawn(dispatch(item.clone(), ctx, load_gates));
            } else {
                debug!(id = %item.id(), "Driver::run: sync item, waiting");
                dispatch(item.clone(), ctx, load_gates).await;
            }
        }

        debug!(items = self.items.len(), "Driver::run: all items dispatched");
    }
}

/// Wait for load predecessors, then load the item
///
/// A failed predecessor fails the item with the same error and its loader is
/// never invoked.
async fn dispatch(item: QueueItem, ctx: LoadContext, load_gates: Vec<Completion>) {
    for gate in &load_gates {
        if let Err(e) = gate.wait().await {
            debug!(id = %item.id(), predecessor = %gate.id(), "dispatch: predecessor failed");
            item.fail(e);
            return;
        }
    }
    item.load(&ctx).await;
}

fn lookup(completions: &HashMap<&str, Completion>, ids: &[String]) -> Vec<Completion> {
    ids.iter()
        .filter_map(|id| completions.get(id.as_str()).cloned())
        .collect()
}

fn first_failure(dispatched: &[Completion]) -> Option<String> {
    dispatched
        .iter()
        .find(|c| matches!(c.outcome(), Some(Err(_))))
        .map(|c| c.id().to_string())
}

/// Joint completion of a queue
///
/// In fail-soft mode it resolves once every item settled, with a report of
/// every outcome. In fail-fast mode it rejects as soon as any item fails.
#[derive(Debug, Clone)]
pub struct JointCompletion {
    items: Vec<Completion>,
    fail_mode: FailMode,
}

impl JointCompletion {
    pub async fn wait(&self) -> Result<QueueReport, QueueError> {
        debug!(items = self.items.len(), fail_mode = %self.fail_mode, "JointCompletion::wait: called");
        match self.fail_mode {
            FailMode::Soft => Ok(self.collect().await),
            FailMode::Fast => self.wait_fail_fast().await,
        }
    }

    async fn collect(&self) -> QueueReport {
        let mut outcomes = Vec::with_capacity(self.items.len());
        for completion in &self.items {
            outcomes.push(ItemOutcome {
                id: completion.id().to_string(),
                result: completion.wait().await,
            });
        }
        QueueReport { outcomes }
    }

    async fn wait_fail_fast(&self) -> Result<QueueReport, QueueError> {
        let mut pending: FuturesUnordered<_> = self
            .items
            .iter()
            .map(|c| async move { (c.id(), c.wait().await) })
            .collect();

        while let Some((id, result)) = pending.next().await {
            if let Err(source) = result {
                return Err(self.root_failure(id, source));
            }
        }

        Ok(self.collect().await)
    }

    /// Report the failure that started an abort rather than the abort itself
    fn root_failure(&self, id: &str, source: LoadError) -> QueueError {
        if let LoadError::Aborted { failed, .. } = &source
            && let Some(Some(Err(root))) = self.items.iter().find(|c| c.id() == failed).map(Completion::outcome)
        {
            return QueueError::Load {
                item: failed.clone(),
                source: root,
            };
        }
        QueueError::Load {
            item: id.to_string(),
            source,
        }
    }
}
