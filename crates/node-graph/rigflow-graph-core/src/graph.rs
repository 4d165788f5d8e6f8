//! The graph arena: parameter storage, bindings, dirty propagation and
//! pull-based recomputation.
//!
//! Three kinds of edges make up the dataflow graph:
//! - a binding copies its source parameter into its sink;
//! - an operator reads its input parameters and writes its output parameters;
//! - a scene node's `GlobalXfo` is composed from its `LocalXfo` and its
//!   parent's `GlobalXfo` as long as nothing else writes it.
//!
//! Every vertex keeps a dirty bit. A dirty vertex always has dirty dependents,
//! so propagation stops at the first vertex that is already dirty.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use log::{debug, warn};
use rigflow_api_core::{coercion, Value, Xfo};

use crate::binding::{Binding, ValueMap};
use crate::config::{GraphConfig, WritePolicy};
use crate::error::GraphError;
use crate::operators::{self, OperatorEntry};
use crate::param::{ParamOwner, ParamRole, Parameter, Reader, Writer};
use crate::scene::SceneNode;
use crate::topo::topo_order;
use crate::tracks::TrackSlot;
use crate::types::{BindingId, NodeId, OperatorId, ParamId, Vertex};

type Observer = Box<dyn FnMut(ParamId)>;

/// Outcome of evaluating a single vertex.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Already clean; nothing to do.
    Clean,
    Param,
    OperatorProduced,
    OperatorHeld,
}

/// Cloned state restored when an edit rolls back. Observers are not part of it.
#[derive(Clone)]
pub(crate) struct GraphSnapshot {
    params: Vec<Parameter>,
    bindings: Vec<Option<Binding>>,
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
    free_params: IndexMap<String, ParamId>,
    operators: Vec<OperatorEntry>,
    tracks: Vec<TrackSlot>,
}

pub struct Graph {
    pub(crate) config: GraphConfig,
    pub(crate) params: Vec<Parameter>,
    pub(crate) bindings: Vec<Option<Binding>>,
    pub(crate) nodes: Vec<SceneNode>,
    pub(crate) roots: Vec<NodeId>,
    pub(crate) free_params: IndexMap<String, ParamId>,
    pub(crate) operators: Vec<OperatorEntry>,
    pub(crate) tracks: Vec<TrackSlot>,
    observers: HashMap<ParamId, Vec<Observer>>,
    pub(crate) edit_depth: u32,
    pub(crate) deferred: Vec<ParamId>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("params", &self.params.len())
            .field("bindings", &self.bindings.iter().flatten().count())
            .field("nodes", &self.nodes.len())
            .field("operators", &self.operators.len())
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            params: Vec::new(),
            bindings: Vec::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
            free_params: IndexMap::new(),
            operators: Vec::new(),
            tracks: Vec::new(),
            observers: HashMap::new(),
            edit_depth: 0,
            deferred: Vec::new(),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn set_write_policy(&mut self, policy: WritePolicy) {
        self.config.write_policy = policy;
    }

    // ----- parameters -----

    pub fn param(&self, id: ParamId) -> Result<&Parameter, GraphError> {
        self.params
            .get(id.index())
            .ok_or(GraphError::UnknownParameter(id))
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn push_param(
        &mut self,
        name: String,
        owner: ParamOwner,
        role: ParamRole,
        value: Value,
    ) -> ParamId {
        let id = ParamId::from_index(self.params.len());
        self.params.push(Parameter::new(name, owner, role, value));
        id
    }

    /// Add a free parameter owned by the graph (e.g. the time source).
    pub fn add_param(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<ParamId, GraphError> {
        let name = name.into();
        if self.free_params.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        let id = self.push_param(name.clone(), ParamOwner::Graph, ParamRole::Plain, value.into());
        self.free_params.insert(name, id);
        Ok(id)
    }

    /// Add a free float parameter whose writes are clamped into `[min, max]`.
    pub fn add_ranged_param(
        &mut self,
        name: impl Into<String>,
        value: f32,
        min: f32,
        max: f32,
    ) -> Result<ParamId, GraphError> {
        let id = self.add_param(name, Value::Float(value))?;
        self.set_param_range(id, min, max)?;
        Ok(id)
    }

    pub fn set_param_range(&mut self, id: ParamId, min: f32, max: f32) -> Result<(), GraphError> {
        self.param(id)?;
        let param = &mut self.params[id.index()];
        param.range = Some((min.min(max), min.max(max)));
        let value = std::mem::take(&mut param.value);
        param.value = param.clamp(value);
        Ok(())
    }

    pub fn find_param(&self, name: &str) -> Option<ParamId> {
        self.free_params.get(name).copied()
    }

    pub fn free_params(&self) -> impl Iterator<Item = (&str, ParamId)> + '_ {
        self.free_params.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Clean read: recomputes the dirty upstream path first.
    pub fn get_value(&mut self, id: ParamId) -> Result<Value, GraphError> {
        self.param(id)?;
        self.pull(Vertex::Param(id));
        Ok(self.params[id.index()].value.clone())
    }

    pub fn get_transform(&mut self, id: ParamId) -> Result<Xfo, GraphError> {
        self.get_value(id).map(|v| coercion::as_xfo(&v))
    }

    pub fn get_float(&mut self, id: ParamId) -> Result<f32, GraphError> {
        self.get_value(id).map(|v| coercion::as_float(&v))
    }

    /// Store a value and flag everything downstream of it.
    ///
    /// Writing a composed `GlobalXfo` rewrites the node's `LocalXfo` so that
    /// the composition yields `value`.
    pub fn set_value(&mut self, id: ParamId, value: impl Into<Value>) -> Result<(), GraphError> {
        let value = value.into();
        let param = self.param(id)?;
        if param.writer.is_some() {
            match self.config.write_policy {
                WritePolicy::Reject => return Err(GraphError::BoundParameter(self.param_label(id))),
                WritePolicy::Override => {
                    warn!("write to driven parameter '{}' will be overridden", self.param_label(id));
                }
            }
        } else if let (ParamRole::GlobalXfo, ParamOwner::Node(node)) = (param.role, param.owner) {
            return self.set_global_transform(node, coercion::as_xfo(&value));
        }
        let param = &mut self.params[id.index()];
        param.value = param.clamp(value);
        // an overridden operator output is replaced when the operator reruns
        let start = match param.writer {
            Some(Writer::Operator(op)) => Vertex::Operator(op),
            _ => Vertex::Param(id),
        };
        self.mark_dirty(start);
        Ok(())
    }

    /// Register a callback fired each time `id` goes from clean to dirty.
    /// Callbacks registered inside an edit survive a rollback.
    pub fn observe(
        &mut self,
        id: ParamId,
        callback: impl FnMut(ParamId) + 'static,
    ) -> Result<(), GraphError> {
        self.param(id)?;
        self.observers.entry(id).or_default().push(Box::new(callback));
        Ok(())
    }

    pub fn is_dirty(&self, vertex: Vertex) -> bool {
        match vertex {
            Vertex::Param(p) => self.params.get(p.index()).is_some_and(|p| p.dirty),
            Vertex::Operator(o) => self.operators.get(o.index()).is_some_and(|o| o.dirty),
        }
    }

    // ----- bindings -----

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.index()).and_then(Option::as_ref)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|b| (BindingId::from_index(i), b)))
    }

    /// Connect `source` to `sink`. The sink must not already have a writer.
    pub fn bind(
        &mut self,
        source: ParamId,
        sink: ParamId,
        map: ValueMap,
    ) -> Result<BindingId, GraphError> {
        self.param(source)?;
        if self.param(sink)?.writer.is_some() {
            return Err(GraphError::AlreadyBound(self.param_label(sink)));
        }
        self.ensure_acyclic(Vertex::Param(source), Vertex::Param(sink))?;
        Ok(self.attach_binding(source, sink, map))
    }

    /// Replace the binding currently writing `sink`, if any.
    /// Operator-driven sinks are never rebound.
    pub fn rebind(
        &mut self,
        source: ParamId,
        sink: ParamId,
        map: ValueMap,
    ) -> Result<BindingId, GraphError> {
        self.param(source)?;
        let writer = self.param(sink)?.writer;
        if let Some(Writer::Operator(_)) = writer {
            return Err(GraphError::AlreadyBound(self.param_label(sink)));
        }
        // Paths leaving the sink never cross the binding that feeds it, so the
        // check is valid before that binding is removed.
        self.ensure_acyclic(Vertex::Param(source), Vertex::Param(sink))?;
        if let Some(Writer::Binding(old)) = writer {
            self.detach_binding(old);
        }
        Ok(self.attach_binding(source, sink, map))
    }

    /// Remove the binding writing `sink`. The sink keeps its last value
    /// (a node's `GlobalXfo` goes back to composing from its parent).
    pub fn unbind(&mut self, sink: ParamId) -> Result<Option<Binding>, GraphError> {
        match self.param(sink)?.writer {
            None => Ok(None),
            Some(Writer::Operator(_)) => Err(GraphError::BoundParameter(self.param_label(sink))),
            Some(Writer::Binding(id)) => {
                let binding = self.detach_binding(id);
                self.mark_dirty(Vertex::Param(sink));
                Ok(binding)
            }
        }
    }

    fn attach_binding(&mut self, source: ParamId, sink: ParamId, map: ValueMap) -> BindingId {
        let id = BindingId::from_index(self.bindings.len());
        self.bindings.push(Some(Binding { source, sink, map }));
        self.params[sink.index()].writer = Some(Writer::Binding(id));
        self.params[source.index()].add_reader(Reader::Binding(id));
        self.mark_dirty(Vertex::Param(sink));
        id
    }

    fn detach_binding(&mut self, id: BindingId) -> Option<Binding> {
        let binding = self.bindings.get_mut(id.index())?.take()?;
        self.params[binding.source.index()].remove_reader(Reader::Binding(id));
        self.params[binding.sink.index()].writer = None;
        Some(binding)
    }

    // ----- structure -----

    /// Vertices whose values are read to compute `vertex`.
    pub(crate) fn upstream(&self, vertex: Vertex) -> Vec<Vertex> {
        match vertex {
            Vertex::Param(p) => {
                let param = &self.params[p.index()];
                match param.writer {
                    Some(Writer::Binding(b)) => self
                        .binding(b)
                        .map(|b| vec![Vertex::Param(b.source)])
                        .unwrap_or_default(),
                    Some(Writer::Operator(o)) => vec![Vertex::Operator(o)],
                    None => match (param.role, param.owner) {
                        (ParamRole::GlobalXfo, ParamOwner::Node(n)) => {
                            let node = &self.nodes[n.index()];
                            let mut out = vec![Vertex::Param(node.local)];
                            if let Some(parent) = node.parent {
                                out.push(Vertex::Param(self.nodes[parent.index()].global));
                            }
                            out
                        }
                        _ => Vec::new(),
                    },
                }
            }
            Vertex::Operator(o) => self.operators[o.index()]
                .inputs
                .iter()
                .filter_map(|slot| slot.source.map(Vertex::Param))
                .collect(),
        }
    }

    /// Vertices that read `vertex`.
    pub(crate) fn downstream(&self, vertex: Vertex) -> Vec<Vertex> {
        match vertex {
            Vertex::Param(p) => {
                let param = &self.params[p.index()];
                let mut out: Vec<Vertex> = param
                    .readers
                    .iter()
                    .filter_map(|r| match r {
                        Reader::Binding(b) => self.binding(*b).map(|b| Vertex::Param(b.sink)),
                        Reader::Operator(o) => Some(Vertex::Operator(*o)),
                    })
                    .collect();
                match (param.role, param.owner) {
                    (ParamRole::LocalXfo, ParamOwner::Node(n)) => {
                        let global = self.nodes[n.index()].global;
                        if self.params[global.index()].writer.is_none() {
                            out.push(Vertex::Param(global));
                        }
                    }
                    (ParamRole::GlobalXfo, ParamOwner::Node(n)) => {
                        for child in &self.nodes[n.index()].children {
                            let global = self.nodes[child.index()].global;
                            if self.params[global.index()].writer.is_none() {
                                out.push(Vertex::Param(global));
                            }
                        }
                    }
                    _ => {}
                }
                out
            }
            Vertex::Operator(o) => self.operators[o.index()]
                .outputs
                .iter()
                .map(|slot| Vertex::Param(slot.param))
                .collect(),
        }
    }

    /// True when a directed path leads from `from` to `to`.
    pub(crate) fn reaches(&self, from: Vertex, to: Vertex) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(v) = stack.pop() {
            if v == to {
                return true;
            }
            if seen.insert(v) {
                stack.extend(self.downstream(v));
            }
        }
        false
    }

    /// Fails with [`GraphError::Cycle`] if adding the edge `from -> to` would
    /// close a cycle.
    pub(crate) fn ensure_acyclic(&self, from: Vertex, to: Vertex) -> Result<(), GraphError> {
        if from == to || self.reaches(to, from) {
            return Err(GraphError::Cycle {
                from: self.vertex_label(from),
                to: self.vertex_label(to),
            });
        }
        Ok(())
    }

    pub(crate) fn param_label(&self, id: ParamId) -> String {
        let Some(param) = self.params.get(id.index()) else {
            return id.to_string();
        };
        match param.owner {
            ParamOwner::Graph => param.name.clone(),
            ParamOwner::Node(n) => format!("{}.{}", self.nodes[n.index()].name, param.name),
            ParamOwner::Operator(o) => format!("{}.{}", self.operators[o.index()].name, param.name),
        }
    }

    pub(crate) fn vertex_label(&self, vertex: Vertex) -> String {
        match vertex {
            Vertex::Param(p) => self.param_label(p),
            Vertex::Operator(o) => self
                .operators
                .get(o.index())
                .map(|op| op.name.clone())
                .unwrap_or_else(|| o.to_string()),
        }
    }

    // ----- dirty state -----

    fn set_dirty_flag(&mut self, vertex: Vertex) -> bool {
        let flag = match vertex {
            Vertex::Param(p) => &mut self.params[p.index()].dirty,
            Vertex::Operator(o) => &mut self.operators[o.index()].dirty,
        };
        !std::mem::replace(flag, true)
    }

    /// Flag `start` and everything downstream of it, notifying observers of
    /// each parameter that was clean.
    pub(crate) fn mark_dirty(&mut self, start: Vertex) {
        let mut stack = vec![start];
        let mut transitioned = Vec::new();
        while let Some(v) = stack.pop() {
            if !self.set_dirty_flag(v) {
                continue;
            }
            if let Vertex::Param(p) = v {
                transitioned.push(p);
            }
            stack.extend(self.downstream(v));
        }
        self.notify(transitioned);
    }

    pub(crate) fn dirty_vertices(&self) -> Vec<Vertex> {
        let params = self
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.dirty)
            .map(|(i, _)| Vertex::Param(ParamId::from_index(i)));
        let ops = self
            .operators
            .iter()
            .enumerate()
            .filter(|(_, o)| o.dirty)
            .map(|(i, _)| Vertex::Operator(OperatorId::from_index(i)));
        params.chain(ops).collect()
    }

    fn notify(&mut self, ids: Vec<ParamId>) {
        if ids.is_empty() {
            return;
        }
        if self.edit_depth > 0 {
            self.deferred.extend(ids);
            return;
        }
        for id in ids {
            if let Some(callbacks) = self.observers.get_mut(&id) {
                for callback in callbacks.iter_mut() {
                    callback(id);
                }
            }
        }
    }

    pub(crate) fn flush_notifications(&mut self) {
        let pending = std::mem::take(&mut self.deferred);
        self.notify(pending);
    }

    // ----- evaluation -----

    /// Recompute the dirty upstream closure of `target`, dependencies first.
    pub(crate) fn pull(&mut self, target: Vertex) {
        if !self.is_dirty(target) {
            return;
        }
        let mut closure = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![target];
        while let Some(v) = stack.pop() {
            if !seen.insert(v) {
                continue;
            }
            closure.push(v);
            stack.extend(self.upstream(v).into_iter().filter(|u| self.is_dirty(*u)));
        }
        let order = topo_order(&closure, |v| self.upstream(v));
        for v in order {
            self.evaluate_vertex(v);
        }
    }

    pub(crate) fn evaluate_vertex(&mut self, vertex: Vertex) -> Step {
        match vertex {
            Vertex::Param(p) => {
                if !self.params[p.index()].dirty {
                    return Step::Clean;
                }
                let param = &self.params[p.index()];
                let computed = match (param.writer, param.role, param.owner) {
                    (Some(Writer::Binding(b)), _, _) => self
                        .binding(b)
                        .map(|b| b.map.apply(&self.params[b.source.index()].value)),
                    (None, ParamRole::GlobalXfo, ParamOwner::Node(n)) => {
                        Some(Value::Transform(self.composed_global(n)))
                    }
                    _ => None,
                };
                let param = &mut self.params[p.index()];
                if let Some(value) = computed {
                    param.value = param.clamp(value);
                }
                param.dirty = false;
                Step::Param
            }
            Vertex::Operator(o) => {
                if !self.operators[o.index()].dirty {
                    return Step::Clean;
                }
                if operators::run_operator(self, o) {
                    Step::OperatorProduced
                } else {
                    Step::OperatorHeld
                }
            }
        }
    }

    fn composed_global(&self, node: NodeId) -> Xfo {
        let node = &self.nodes[node.index()];
        let local = coercion::as_xfo(&self.params[node.local.index()].value);
        match node.parent {
            Some(parent) => {
                let parent_global = self.nodes[parent.index()].global;
                coercion::as_xfo(&self.params[parent_global.index()].value) * local
            }
            None => local,
        }
    }

    // ----- snapshots -----

    pub(crate) fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            params: self.params.clone(),
            bindings: self.bindings.clone(),
            nodes: self.nodes.clone(),
            roots: self.roots.clone(),
            free_params: self.free_params.clone(),
            operators: self.operators.clone(),
            tracks: self.tracks.clone(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: GraphSnapshot) {
        debug!(
            "restoring graph snapshot ({} params, {} nodes)",
            snapshot.params.len(),
            snapshot.nodes.len()
        );
        self.params = snapshot.params;
        self.bindings = snapshot.bindings;
        self.nodes = snapshot.nodes;
        self.roots = snapshot.roots;
        self.free_params = snapshot.free_params;
        self.operators = snapshot.operators;
        self.tracks = snapshot.tracks;
        let params = self.params.len();
        self.observers.retain(|id, _| id.index() < params);
    }
}
