//! Shared helpers for queue integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beloader::{
    ConfigurationError, Document, LoadContext, LoadError, LoadRequest, Loader, Node, Queue, QueueConfig, Resource,
    StaticFetcher,
};

/// Event log shared between timed loaders
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Index of an event in the log; panics when absent
pub fn position(log: &Log, event: &str) -> usize {
    events(log)
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("event {event} not in {:?}", events(log)))
}

pub fn contains(log: &Log, event: &str) -> bool {
    events(log).iter().any(|e| e == event)
}

/// Loader that sleeps for its latency, then commits a `<timed>` node
///
/// Options:
/// - `fail`: fail after the latency instead of committing
/// - `ordered`: join the ordered commit lane when loaded async
/// - `precede`: declare itself load predecessor of this sibling on start
pub struct Timed {
    latency: Duration,
    fail: bool,
    ordered: bool,
    precede: Option<String>,
    log: Log,
}

impl Timed {
    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }

    async fn run(&self, ctx: &LoadContext, ordered: bool) -> Result<Resource, LoadError> {
        let id = ctx.item_id().to_string();
        self.record(format!("start:{id}"));

        if let Some(sibling) = &self.precede {
            let outcome = match ctx.precede(sibling).await {
                Ok(()) => "ok",
                Err(ConfigurationError::DirectiveTooLate { .. }) => "too-late",
                Err(ConfigurationError::UnknownItem { .. }) => "unknown",
                Err(_) => "error",
            };
            self.record(format!("precede:{sibling}:{outcome}"));
        }

        tokio::time::sleep(self.latency).await;
        self.record(format!("fetched:{id}"));

        if self.fail {
            return Err(LoadError::Fetch {
                url: format!("{id}.timed"),
                reason: "timed failure".to_string(),
            });
        }

        let node = Node::new("timed").with_attribute("id", id.clone());
        if ordered {
            ctx.commit_ordered(node).await?;
        } else {
            ctx.commit(node).await?;
        }
        self.record(format!("committed:{id}"));
        Ok(Resource::from(id))
    }
}

#[async_trait]
impl Loader for Timed {
    fn kind(&self) -> &'static str {
        "timed"
    }

    fn commits_in_order(&self) -> bool {
        self.ordered
    }

    async fn load_sync(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        self.run(ctx, false).await
    }

    async fn load_async(&self, ctx: &LoadContext) -> Result<Resource, LoadError> {
        self.run(ctx, self.ordered).await
    }
}

/// Request a timed item with the given latency in milliseconds
pub fn timed(log: &Log, id: &str, latency_ms: u64) -> LoadRequest {
    let log = Arc::clone(log);
    LoadRequest::custom(move |_, options| {
        Ok(Timed {
            latency: Duration::from_millis(latency_ms),
            fail: options.get_bool("fail").unwrap_or(false),
            ordered: options.get_bool("ordered").unwrap_or(false),
            precede: options.get_str("precede").map(str::to_string),
            log,
        })
    })
    .with_id(id)
}

pub fn failing(log: &Log, id: &str, latency_ms: u64) -> LoadRequest {
    timed(log, id, latency_ms).with_option("fail", true)
}

pub fn queue(config: QueueConfig) -> Queue {
    Queue::new(config, Document::new(), Arc::new(StaticFetcher::new()))
}
