//! Precedence registry: which items must settle before others
//!
//! Every edge points from an item to a predecessor it waits on. Four kinds
//! exist:
//! - `Load`: from `loader.sync` or a directive transfer; the item's load is
//!   not invoked until the predecessor settles
//! - `Commit`: from `loader.async`; the item's commit waits
//! - `Sequence`: implicit; the run loop does not dispatch an item until the
//!   nearest earlier sync-path item settles
//! - `Ordered`: implicit; commits on the ordered lane (sync items and async
//!   items whose loader commits in order) wait for every earlier lane member
//!   to settle. Only the nearest earlier member gets an edge, which gives the
//!   same reachability.
//!
//! The graph is kept acyclic: every install is checked and rolled back on a
//! cycle, so a queue can never suspend forever on its own configuration.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::ConfigurationError;
use crate::item::Directives;

/// Kind of precedence edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Load,
    Commit,
    Sequence,
    Ordered,
}

/// Precedence graph of one queue
#[derive(Debug, Default)]
pub struct Precedence {
    /// Registered items in declaration order
    order: Vec<String>,

    /// Item -> predecessors it waits on
    deps: HashMap<String, Vec<(String, Edge)>>,

    /// Items the run loop has already dispatched
    dispatched: HashSet<String>,

    /// Most recently registered sync-path item
    last_sync: Option<String>,

    /// Most recently registered member of the ordered commit lane
    last_ordered: Option<String>,
}

impl Precedence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item with its directives
    ///
    /// `ordered` puts the item on the ordered commit lane. References to items
    /// not registered yet are accepted here and checked by
    /// [`Precedence::validate_references`] before the queue runs.
    pub fn register(
        &mut self,
        id: &str,
        is_async: bool,
        ordered: bool,
        directives: &Directives,
    ) -> Result<(), ConfigurationError> {
        debug!(%id, is_async, ordered, ?directives, "Precedence::register: called");

        let mut edges = Vec::new();
        if let Some(previous) = &self.last_sync {
            edges.push((previous.clone(), Edge::Sequence));
        }
        if ordered
            && let Some(previous) = &self.last_ordered
            && self.last_sync.as_ref() != Some(previous)
        {
            edges.push((previous.clone(), Edge::Ordered));
        }
        edges.extend(directives.load_after.iter().map(|p| (p.clone(), Edge::Load)));
        edges.extend(directives.commit_after.iter().map(|p| (p.clone(), Edge::Commit)));

        self.order.push(id.to_string());
        self.deps.insert(id.to_string(), edges);

        if let Some(path) = self.find_cycle() {
            warn!(%id, ?path, "Precedence cycle rejected");
            self.order.pop();
            self.deps.remove(id);
            return Err(ConfigurationError::Cycle { path });
        }

        if !is_async {
            self.last_sync = Some(id.to_string());
        }
        if ordered {
            self.last_ordered = Some(id.to_string());
        }
        Ok(())
    }

    /// Make `to` wait for `from` before loading (directive transfer)
    pub fn transfer(&mut self, from: &str, to: &str) -> Result<(), ConfigurationError> {
        debug!(%from, %to, "Precedence::transfer: called");

        if !self.deps.contains_key(to) {
            return Err(ConfigurationError::UnknownItem {
                item: from.to_string(),
                reference: to.to_string(),
            });
        }
        if self.dispatched.contains(to) {
            warn!(%from, %to, "Directive arrived after target was dispatched");
            return Err(ConfigurationError::DirectiveTooLate { target: to.to_string() });
        }

        self.add_edge(to, from, Edge::Load)
    }

    /// Add a single edge `item -> predecessor`, rejecting cycles
    pub fn add_edge(&mut self, item: &str, predecessor: &str, edge: Edge) -> Result<(), ConfigurationError> {
        let Some(edges) = self.deps.get_mut(item) else {
            return Err(ConfigurationError::UnknownItem {
                item: predecessor.to_string(),
                reference: item.to_string(),
            });
        };
        edges.push((predecessor.to_string(), edge));

        if let Some(path) = self.find_cycle() {
            warn!(%item, %predecessor, ?path, "Precedence cycle rejected");
            if let Some(edges) = self.deps.get_mut(item) {
                edges.pop();
            }
            return Err(ConfigurationError::Cycle { path });
        }
        Ok(())
    }

    /// Check that every directive names a registered item
    pub fn validate_references(&self) -> Result<(), ConfigurationError> {
        for id in &self.order {
            for (predecessor, _) in self.deps.get(id).into_iter().flatten() {
                if !self.deps.contains_key(predecessor) {
                    return Err(ConfigurationError::UnknownItem {
                        item: id.clone(),
                        reference: predecessor.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Mark an item dispatched, freezing its load predecessors
    ///
    /// Returns `(load predecessors, commit predecessors)`.
    pub fn dispatch(&mut self, id: &str) -> (Vec<String>, Vec<String>) {
        debug!(%id, "Precedence::dispatch: called");
        self.dispatched.insert(id.to_string());
        (self.predecessors(id, Edge::Load), self.predecessors(id, Edge::Commit))
    }

    /// Predecessors of `id` over edges of one kind, deduplicated
    pub fn predecessors(&self, id: &str, edge: Edge) -> Vec<String> {
        let mut seen = HashSet::new();
        self.deps
            .get(id)
            .into_iter()
            .flatten()
            .filter(|(_, e)| *e == edge)
            .filter(|(p, _)| seen.insert(p.clone()))
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn is_dispatched(&self, id: &str) -> bool {
        self.dispatched.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Find a cycle, returning the path that closes it
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut cycle_path = Vec::new();

        for id in &self.order {
            if !visited.contains(id.as_str())
                && self.has_cycle_dfs(id, &mut visited, &mut rec_stack, &mut cycle_path)
            {
                return Some(cycle_path);
            }
        }
        None
    }

    /// DFS helper for cycle detection
    fn has_cycle_dfs<'a>(
        &'a self,
        node: &'a str,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
        cycle_path: &mut Vec<String>,
    ) -> bool {
        visited.insert(node);
        rec_stack.insert(node);
        cycle_path.push(node.to_string());

        if let Some(edges) = self.deps.get(node) {
            for (dep_id, _) in edges {
                if !visited.contains(dep_id.as_str()) {
                    if self.deps.contains_key(dep_id)
                        && self.has_cycle_dfs(dep_id.as_str(), visited, rec_stack, cycle_path)
                    {
                        return true;
                    }
                } else if rec_stack.contains(dep_id.as_str()) {
                    cycle_path.push(dep_id.clone());
                    return true;
                }
            }
        }

        rec_stack.remove(node);
        cycle_path.pop();
        false
    }
}
