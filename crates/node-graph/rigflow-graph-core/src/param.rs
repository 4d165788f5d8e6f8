use log::debug;
use rigflow_api_core::Value;

use crate::types::{BindingId, NodeId, OperatorId};

/// Who a parameter belongs to. Names are unique per owner.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamOwner {
    Graph,
    Node(NodeId),
    Operator(OperatorId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ParamRole {
    Plain,
    LocalXfo,
    /// Composed from parent and local transforms unless something writes it.
    GlobalXfo,
}

/// The single upstream writer of a parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Writer {
    Binding(BindingId),
    Operator(OperatorId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Reader {
    Binding(BindingId),
    Operator(OperatorId),
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) owner: ParamOwner,
    pub(crate) role: ParamRole,
    pub(crate) value: Value,
    pub(crate) dirty: bool,
    pub(crate) writer: Option<Writer>,
    pub(crate) readers: Vec<Reader>,
    pub(crate) range: Option<(f32, f32)>,
}

impl Parameter {
    pub(crate) fn new(name: String, owner: ParamOwner, role: ParamRole, value: Value) -> Self {
        Self {
            name,
            owner,
            role,
            value,
            dirty: false,
            writer: None,
            readers: Vec::new(),
            range: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> ParamOwner {
        self.owner
    }

    /// The cached value. May be stale while [`Parameter::is_dirty`] is set;
    /// use `Graph::get_value` for a clean read.
    pub fn cached_value(&self) -> &Value {
        &self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn writer(&self) -> Option<Writer> {
        self.writer
    }

    pub fn range(&self) -> Option<(f32, f32)> {
        self.range
    }

    pub(crate) fn add_reader(&mut self, reader: Reader) {
        if !self.readers.contains(&reader) {
            self.readers.push(reader);
        }
    }

    pub(crate) fn remove_reader(&mut self, reader: Reader) {
        self.readers.retain(|r| *r != reader);
    }

    /// Floats are clamped into the range; other kinds pass through.
    pub(crate) fn clamp(&self, value: Value) -> Value {
        match (self.range, value) {
            (Some((lo, hi)), Value::Float(f)) => {
                let clamped = f.clamp(lo, hi);
                if clamped != f {
                    debug!("'{}' clamped {} to {}", self.name, f, clamped);
                }
                Value::Float(clamped)
            }
            (_, value) => value,
        }
    }
}
