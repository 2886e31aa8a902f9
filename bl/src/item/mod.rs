//! Queue items: one loader, its resolved options and a settle point

mod completion;
mod state;

pub use completion::Completion;
pub use state::ItemState;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ConfigurationError, LoadError};
use crate::loader::{LoadContext, Loader, LoaderKind};
use crate::options::Options;

use completion::Signal;

/// Option path of the async flag
pub const ASYNC_OPTION: &str = "async";

/// Option path of the load precedence directive
pub const LOAD_DIRECTIVE: &str = "loader.sync";

/// Option path of the commit precedence directive
pub const COMMIT_DIRECTIVE: &str = "loader.async";

type LoaderFactory = Box<dyn FnOnce(&str, &Options) -> Result<Arc<dyn Loader>, ConfigurationError> + Send>;

/// Cross-item synchronization declared in an item's options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Items that must settle before this item's load is invoked
    pub load_after: Vec<String>,
    /// Items that must settle before this item commits
    pub commit_after: Vec<String>,
}

impl Directives {
    /// Read directives from resolved options
    pub fn from_options(item: &str, options: &Options) -> Result<Self, ConfigurationError> {
        Ok(Self {
            load_after: read_ids(item, options, LOAD_DIRECTIVE)?,
            commit_after: read_ids(item, options, COMMIT_DIRECTIVE)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.load_after.is_empty() && self.commit_after.is_empty()
    }
}

fn read_ids(item: &str, options: &Options, path: &str) -> Result<Vec<String>, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidDirective {
        item: item.to_string(),
        directive: path.to_string(),
        reason: reason.to_string(),
    };

    match options.get(path) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(id)) if id.is_empty() => Err(invalid("empty item id")),
        Some(Value::String(id)) => Ok(vec![id.clone()]),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| match v.as_str() {
                Some(id) if !id.is_empty() => Ok(id.to_string()),
                _ => Err(invalid("expected a list of item ids")),
            })
            .collect(),
        Some(_) => Err(invalid("expected an item id or a list of item ids")),
    }
}

/// A caller's request to load one resource, before the queue resolves it
pub struct LoadRequest {
    id: Option<String>,
    options: Options,
    factory: LoaderFactory,
}

impl LoadRequest {
    /// Request a built-in loader kind
    pub fn new(kind: LoaderKind) -> Self {
        Self {
            id: None,
            options: Options::new(),
            factory: Box::new(move |item: &str, options: &Options| kind.build(item, options)),
        }
    }

    /// Request a caller-supplied loader, built from the resolved options
    pub fn custom<F, L>(build: F) -> Self
    where
        F: FnOnce(&str, &Options) -> Result<L, ConfigurationError> + Send + 'static,
        L: Loader + 'static,
    {
        Self {
            id: None,
            options: Options::new(),
            factory: Box::new(move |item: &str, options: &Options| {
                let loader: Arc<dyn Loader> = Arc::new(build(item, options)?);
                Ok(loader)
            }),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replace the item-local options
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Set one item-local option
    pub fn with_option(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.options.set(path, value);
        self
    }

    /// Set the async flag
    pub fn asynchronous(self, flag: bool) -> Self {
        self.with_option(ASYNC_OPTION, flag)
    }

    /// Add a load precedence directive on `id`
    pub fn load_after(mut self, id: impl Into<String>) -> Self {
        self.options.push(LOAD_DIRECTIVE, id.into());
        self
    }

    /// Add a commit precedence directive on `id`
    pub fn commit_after(mut self, id: impl Into<String>) -> Self {
        self.options.push(COMMIT_DIRECTIVE, id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl std::fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadRequest")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// One resolved load request owned by a queue
///
/// Clones share the same loader and settle point.
#[derive(Clone)]
pub struct QueueItem {
    id: String,
    options: Arc<Options>,
    loader: Arc<dyn Loader>,
    directives: Directives,
    is_async: bool,
    signal: Arc<Signal>,
}

impl QueueItem {
    /// Resolve a request against queue defaults and build its loader
    pub fn resolve(request: LoadRequest, defaults: &Options) -> Result<Self, ConfigurationError> {
        let LoadRequest { id, options, factory } = request;
        let id = id.unwrap_or_else(|| format!("item-{}", Uuid::now_v7()));
        debug!(%id, "QueueItem::resolve: called");

        let mut options = Options::resolve(defaults, &options);
        options.define(ASYNC_OPTION, false);

        let is_async = options
            .get_bool(ASYNC_OPTION)
            .ok_or_else(|| ConfigurationError::InvalidDirective {
                item: id.clone(),
                directive: ASYNC_OPTION.to_string(),
                reason: "expected a boolean".to_string(),
            })?;
        let directives = Directives::from_options(&id, &options)?;
        let loader = factory(&id, &options)?;

        Ok(Self {
            signal: Arc::new(Signal::new(id.clone())),
            id,
            options: Arc::new(options),
            loader,
            directives,
            is_async,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Effective options, read-only once resolved
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn shared_options(&self) -> Arc<Options> {
        Arc::clone(&self.options)
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Whether this item commits on the ordered lane
    ///
    /// Sync items always do; async items do when their loader commits in order.
    pub fn is_ordered(&self) -> bool {
        !self.is_async || self.loader.commits_in_order()
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn loader_kind(&self) -> &'static str {
        self.loader.kind()
    }

    pub fn state(&self) -> ItemState {
        self.signal.state()
    }

    pub fn completion(&self) -> Completion {
        self.signal.completion()
    }

    /// Invoke the loader and settle the item
    ///
    /// Dispatches to the loader's sync or async operation according to the
    /// resolved `async` flag. Calling this again once the item has left
    /// `Pending` does not touch the loader; it returns the existing completion.
    pub async fn load(&self, ctx: &LoadContext) -> Completion {
        if !self.signal.begin() {
            debug!(id = %self.id, state = %self.state(), "QueueItem::load: already started");
            return self.completion();
        }

        debug!(id = %self.id, is_async = self.is_async, kind = self.loader.kind(), "QueueItem::load: dispatching");
        let result = if self.is_async {
            self.loader.load_async(ctx).await
        } else {
            self.loader.load_sync(ctx).await
        };

        match &result {
            Ok(resource) => info!(id = %self.id, bytes = resource.len(), "Item committed"),
            Err(e) => warn!(id = %self.id, error = %e, "Item failed"),
        }
        self.signal.settle(result);
        self.completion()
    }

    /// Fail the item without invoking its loader
    pub(crate) fn fail(&self, err: LoadError) -> bool {
        warn!(id = %self.id, error = %err, "Item failed before loading");
        self.signal.settle(Err(err))
    }
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueItem")
            .field("id", &self.id)
            .field("kind", &self.loader.kind())
            .field("is_async", &self.is_async)
            .field("directives", &self.directives)
            .field("state", &self.state())
            .finish()
    }
}
