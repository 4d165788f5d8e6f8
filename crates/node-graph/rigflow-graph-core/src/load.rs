//! Asynchronous loads.
//!
//! Wiring that depends on an asset (a node hierarchy, a track document) is
//! registered up front as a one-shot callback keyed by a [`LoadTicket`]. When
//! the host's loader finishes it hands the payload to [`LoadQueue::complete`],
//! which runs the callback inside a graph edit between frames: the wiring is
//! applied completely or not at all.

use std::fmt;

use hashbrown::HashMap;
use log::{debug, warn};
use rigflow_api_core::Xfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GraphError;
use crate::graph::Graph;
use crate::types::NodeId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadTicket(pub u64);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    #[error("resource '{url}' unavailable: {reason}")]
    ResourceUnavailable { url: String, reason: String },
    #[error("no pending load for ticket {0:?}")]
    UnknownTicket(LoadTicket),
    #[error("applying '{url}' failed: {source}")]
    Apply { url: String, source: GraphError },
}

/// Host-side collaborator that fetches resources. It reports back through
/// [`LoadQueue::complete`] with the ticket it was given.
pub trait AssetLoader {
    fn start(&mut self, ticket: LoadTicket, url: &str);
}

type OnReady<T> = Box<dyn FnOnce(&mut Graph, T) -> Result<(), GraphError>>;

pub struct LoadQueue<T> {
    next: u64,
    pending: HashMap<LoadTicket, (String, OnReady<T>)>,
}

impl<T> Default for LoadQueue<T> {
    fn default() -> Self {
        Self {
            next: 0,
            pending: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for LoadQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadQueue")
            .field("next", &self.next)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<T> LoadQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `on_ready` to run once `url` has loaded.
    pub fn request(
        &mut self,
        url: impl Into<String>,
        on_ready: impl FnOnce(&mut Graph, T) -> Result<(), GraphError> + 'static,
    ) -> LoadTicket {
        let ticket = LoadTicket(self.next);
        self.next += 1;
        self.pending.insert(ticket, (url.into(), Box::new(on_ready)));
        ticket
    }

    /// [`LoadQueue::request`] and tell `loader` to start fetching.
    pub fn request_from(
        &mut self,
        loader: &mut dyn AssetLoader,
        url: impl Into<String>,
        on_ready: impl FnOnce(&mut Graph, T) -> Result<(), GraphError> + 'static,
    ) -> LoadTicket {
        let url = url.into();
        let ticket = self.request(url.clone(), on_ready);
        loader.start(ticket, &url);
        ticket
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn url(&self, ticket: LoadTicket) -> Option<&str> {
        self.pending.get(&ticket).map(|(url, _)| url.as_str())
    }

    /// Deliver a finished load. Failed fetches and failing callbacks both
    /// leave `graph` untouched.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<T, String>,
        graph: &mut Graph,
    ) -> Result<(), LoadError> {
        let (url, on_ready) = self
            .pending
            .remove(&ticket)
            .ok_or(LoadError::UnknownTicket(ticket))?;
        let payload = match result {
            Ok(payload) => payload,
            Err(reason) => {
                warn!("load of '{url}' failed: {reason}");
                return Err(LoadError::ResourceUnavailable { url, reason });
            }
        };
        match graph.edit(|g| on_ready(g, payload)) {
            Ok(()) => {
                debug!("applied '{url}'");
                Ok(())
            }
            Err(source) => {
                warn!("wiring for '{url}' rolled back: {source}");
                Err(LoadError::Apply { url, source })
            }
        }
    }

    /// Drop a pending request; its callback never runs.
    pub fn cancel(&mut self, ticket: LoadTicket) -> bool {
        self.pending.remove(&ticket).is_some()
    }
}

/// Payload of a hierarchy load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeHierarchy {
    pub name: String,
    #[serde(default)]
    pub local: Xfo,
    #[serde(default)]
    pub children: Vec<NodeHierarchy>,
}

impl NodeHierarchy {
    pub fn new(name: impl Into<String>, local: Xfo) -> Self {
        Self {
            name: name.into(),
            local,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: NodeHierarchy) -> Self {
        self.children.push(child);
        self
    }
}

impl Graph {
    /// Create nodes for `hierarchy` below `parent`; returns its root node.
    pub fn instantiate_hierarchy(
        &mut self,
        parent: Option<NodeId>,
        hierarchy: &NodeHierarchy,
    ) -> Result<NodeId, GraphError> {
        let root = self.add_node(parent, hierarchy.name.clone(), hierarchy.local)?;
        let mut stack: Vec<(NodeId, &NodeHierarchy)> =
            hierarchy.children.iter().rev().map(|c| (root, c)).collect();
        while let Some((parent, node)) = stack.pop() {
            let id = self.add_node(Some(parent), node.name.clone(), node.local)?;
            stack.extend(node.children.iter().rev().map(|c| (id, c)));
        }
        Ok(root)
    }
}
