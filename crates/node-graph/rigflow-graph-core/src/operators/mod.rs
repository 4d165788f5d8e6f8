//! Operators: graph vertices that read input parameters and write output
//! parameters once per evaluation.
//!
//! An operator produces output only when it is enabled and all of its
//! required inputs are bound. Otherwise its outputs keep their last values.

pub mod attachment;
pub mod ik;
pub mod ram_piston;
pub mod track_sampler;
pub mod triangle_ik;

use log::debug;
use rigflow_api_core::{coercion, Value, Xfo};

use crate::binding::ValueMap;
use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::param::{ParamOwner, ParamRole, Reader, Writer};
use crate::tracks::TrackSlot;
use crate::types::{BindingId, OperatorId, ParamId, Vertex};

pub use attachment::{AttachTarget, AttachmentConstraint};
pub use ik::{IkJoint, IkSolver, JointAxis};
pub use ram_piston::RamAndPiston;
pub use track_sampler::TrackSampler;
pub use triangle_ik::TriangleIkSolver;

#[derive(Clone, Debug)]
pub struct InputSlot {
    pub(crate) name: String,
    pub(crate) required: bool,
    pub(crate) source: Option<ParamId>,
}

impl InputSlot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn source(&self) -> Option<ParamId> {
        self.source
    }
}

#[derive(Clone, Debug)]
pub struct OutputSlot {
    pub(crate) name: String,
    pub(crate) param: ParamId,
    /// Set once the operator has written this output.
    pub(crate) produced: bool,
}

impl OutputSlot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param(&self) -> ParamId {
        self.param
    }
}

#[derive(Clone, Debug)]
pub enum OperatorKind {
    Ik(IkSolver),
    TriangleIk(TriangleIkSolver),
    RamAndPiston(RamAndPiston),
    Attachment(AttachmentConstraint),
    TrackSampler(TrackSampler),
}

/// Read-only state operators may consult while evaluating.
pub struct EvalContext<'a> {
    pub tracks: &'a [TrackSlot],
    pub config: &'a GraphConfig,
}

impl OperatorKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            OperatorKind::Ik(_) => "IkSolver",
            OperatorKind::TriangleIk(_) => "TriangleIkSolver",
            OperatorKind::RamAndPiston(_) => "RamAndPiston",
            OperatorKind::Attachment(_) => "AttachmentConstraint",
            OperatorKind::TrackSampler(_) => "TrackSampler",
        }
    }

    /// Fixed input slots as `(name, required)`. Some kinds add more later.
    fn declared_inputs(&self) -> &'static [(&'static str, bool)] {
        match self {
            OperatorKind::Ik(_) => &[("Target", true), ("Base", false)],
            OperatorKind::TriangleIk(_) => &[("Target", true), ("Base", false)],
            OperatorKind::RamAndPiston(_) => &[
                ("Ram", true),
                ("Piston", true),
                ("RamLocal", false),
                ("PistonLocal", false),
            ],
            OperatorKind::Attachment(_) => &[("Time", true)],
            OperatorKind::TrackSampler(_) => &[("Time", true)],
        }
    }

    fn declared_outputs(&self) -> &'static [&'static str] {
        match self {
            OperatorKind::Ik(_) => &[],
            OperatorKind::TriangleIk(_) => &["Joint0", "Joint1"],
            OperatorKind::RamAndPiston(_) => &["Ram", "Piston"],
            OperatorKind::Attachment(_) => &["Attached"],
            OperatorKind::TrackSampler(_) => &["Output"],
        }
    }

    /// Compute outputs from inputs. `outputs` holds the current output values
    /// on entry; returning `false` means they were left as they were.
    fn evaluate(&mut self, inputs: &[Option<Value>], outputs: &mut [Value], ctx: &EvalContext) -> bool {
        match self {
            OperatorKind::Ik(op) => op.evaluate(inputs, outputs),
            OperatorKind::TriangleIk(op) => op.evaluate(inputs, outputs),
            OperatorKind::RamAndPiston(op) => op.evaluate(inputs, outputs),
            OperatorKind::Attachment(op) => op.evaluate(inputs, outputs),
            OperatorKind::TrackSampler(op) => op.evaluate(inputs, outputs, ctx),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OperatorEntry {
    pub(crate) name: String,
    pub(crate) enabled: bool,
    pub(crate) dirty: bool,
    pub(crate) inputs: Vec<InputSlot>,
    pub(crate) outputs: Vec<OutputSlot>,
    pub(crate) kind: OperatorKind,
}

impl OperatorEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputSlot] {
        &self.outputs
    }

    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    /// Enabled and every required input bound.
    pub fn is_ready(&self) -> bool {
        self.enabled && self.inputs.iter().all(|s| !s.required || s.source.is_some())
    }

    fn input_index(&self, slot: &str) -> Result<usize, GraphError> {
        self.inputs
            .iter()
            .position(|s| s.name == slot)
            .ok_or_else(|| GraphError::UnknownSlot {
                operator: self.name.clone(),
                slot: slot.to_string(),
            })
    }

    fn output_index(&self, slot: &str) -> Result<usize, GraphError> {
        self.outputs
            .iter()
            .position(|s| s.name == slot)
            .ok_or_else(|| GraphError::UnknownSlot {
                operator: self.name.clone(),
                slot: slot.to_string(),
            })
    }
}

/// Evaluate one dirty operator and clean it and its outputs.
pub(crate) fn run_operator(graph: &mut Graph, id: OperatorId) -> bool {
    let entry = &graph.operators[id.index()];
    let mut produced = false;
    if entry.is_ready() {
        let inputs: Vec<Option<Value>> = entry
            .inputs
            .iter()
            .map(|slot| slot.source.map(|p| graph.params[p.index()].value.clone()))
            .collect();
        let mut outputs: Vec<Value> = entry
            .outputs
            .iter()
            .map(|slot| graph.params[slot.param.index()].value.clone())
            .collect();
        let ctx = EvalContext {
            tracks: &graph.tracks,
            config: &graph.config,
        };
        let entry = &mut graph.operators[id.index()];
        produced = entry.kind.evaluate(&inputs, &mut outputs, &ctx);
        if produced {
            for (slot, value) in entry.outputs.iter_mut().zip(outputs) {
                slot.produced = true;
                graph.params[slot.param.index()].value = value;
            }
        }
    } else {
        debug!("operator '{}' not ready; holding outputs", entry.name);
    }

    let entry = &mut graph.operators[id.index()];
    entry.dirty = false;
    for slot in &entry.outputs {
        graph.params[slot.param.index()].dirty = false;
    }
    produced
}

/// Frame of a chain root relative to where it was when the chain was
/// captured. `rest` is filled on first sight of a base.
pub(crate) fn base_delta(base: Option<&Value>, rest: &mut Option<Xfo>) -> Xfo {
    match base {
        Some(value) => {
            let base = coercion::as_xfo(value);
            let rest = *rest.get_or_insert(base);
            base * rest.inverse()
        }
        None => Xfo::IDENTITY,
    }
}

impl Graph {
    pub fn operator(&self, id: OperatorId) -> Result<&OperatorEntry, GraphError> {
        self.operators
            .get(id.index())
            .ok_or(GraphError::UnknownOperator(id))
    }

    pub fn operators(&self) -> impl Iterator<Item = (OperatorId, &OperatorEntry)> + '_ {
        self.operators
            .iter()
            .enumerate()
            .map(|(i, o)| (OperatorId::from_index(i), o))
    }

    /// Add an operator with its fixed slots. Outputs start as identity
    /// transforms until the operator first produces.
    pub fn add_operator(&mut self, name: impl Into<String>, kind: OperatorKind) -> OperatorId {
        let id = OperatorId::from_index(self.operators.len());
        let inputs = kind
            .declared_inputs()
            .iter()
            .map(|(name, required)| InputSlot {
                name: (*name).to_string(),
                required: *required,
                source: None,
            })
            .collect();
        let outputs = kind.declared_outputs();
        self.operators.push(OperatorEntry {
            name: name.into(),
            enabled: true,
            dirty: true,
            inputs,
            outputs: Vec::new(),
            kind,
        });
        for output in outputs {
            self.add_output_slot(id, output.to_string(), Value::Transform(Xfo::IDENTITY));
        }
        id
    }

    pub(crate) fn add_input_slot(&mut self, op: OperatorId, name: String, required: bool) -> usize {
        let entry = &mut self.operators[op.index()];
        entry.inputs.push(InputSlot {
            name,
            required,
            source: None,
        });
        entry.inputs.len() - 1
    }

    pub(crate) fn add_output_slot(&mut self, op: OperatorId, name: String, initial: Value) -> ParamId {
        let param = self.push_param(name.clone(), ParamOwner::Operator(op), ParamRole::Plain, initial);
        self.params[param.index()].writer = Some(Writer::Operator(op));
        self.params[param.index()].dirty = self.operators[op.index()].dirty;
        self.operators[op.index()].outputs.push(OutputSlot {
            name,
            param,
            produced: false,
        });
        param
    }

    /// Feed `source` into an input slot.
    pub fn connect_input(&mut self, op: OperatorId, slot: &str, source: ParamId) -> Result<(), GraphError> {
        let index = self.operator(op)?.input_index(slot)?;
        self.param(source)?;
        match self.operators[op.index()].inputs[index].source {
            Some(existing) if existing == source => return Ok(()),
            Some(_) => {
                let entry = &self.operators[op.index()];
                return Err(GraphError::AlreadyBound(format!("{}.{}", entry.name, slot)));
            }
            None => {}
        }
        self.ensure_acyclic(Vertex::Param(source), Vertex::Operator(op))?;
        self.operators[op.index()].inputs[index].source = Some(source);
        self.params[source.index()].add_reader(Reader::Operator(op));
        self.mark_dirty(Vertex::Operator(op));
        Ok(())
    }

    pub fn disconnect_input(&mut self, op: OperatorId, slot: &str) -> Result<Option<ParamId>, GraphError> {
        let index = self.operator(op)?.input_index(slot)?;
        let Some(source) = self.operators[op.index()].inputs[index].source.take() else {
            return Ok(None);
        };
        let still_read = self.operators[op.index()]
            .inputs
            .iter()
            .any(|s| s.source == Some(source));
        if !still_read {
            self.params[source.index()].remove_reader(Reader::Operator(op));
        }
        self.mark_dirty(Vertex::Operator(op));
        Ok(Some(source))
    }

    pub fn output_param(&self, op: OperatorId, slot: &str) -> Result<ParamId, GraphError> {
        let entry = self.operator(op)?;
        Ok(entry.outputs[entry.output_index(slot)?].param)
    }

    /// Bind an output slot to `sink`. Until the operator first produces, the
    /// output holds the sink's current value so wiring never moves the sink.
    pub fn bind_output(&mut self, op: OperatorId, slot: &str, sink: ParamId) -> Result<BindingId, GraphError> {
        let entry = self.operator(op)?;
        let index = entry.output_index(slot)?;
        let output = entry.outputs[index].param;
        let produced = entry.outputs[index].produced;
        if self.param(sink)?.writer.is_some() {
            return Err(GraphError::AlreadyBound(self.param_label(sink)));
        }
        self.ensure_acyclic(Vertex::Param(output), Vertex::Param(sink))?;
        if !produced {
            let current = self.get_value(sink)?;
            self.params[output.index()].value = current;
        }
        self.bind(output, sink, ValueMap::Identity)
    }

    pub fn set_operator_enabled(&mut self, op: OperatorId, enabled: bool) -> Result<(), GraphError> {
        let entry = self.operator(op)?;
        if entry.enabled == enabled {
            return Ok(());
        }
        self.operators[op.index()].enabled = enabled;
        if enabled {
            self.mark_dirty(Vertex::Operator(op));
        }
        Ok(())
    }

    /// Mutate an operator's configuration; it is re-evaluated on the next pass.
    pub fn modify_operator<R>(
        &mut self,
        op: OperatorId,
        f: impl FnOnce(&mut OperatorKind) -> R,
    ) -> Result<R, GraphError> {
        self.operator(op)?;
        let out = f(&mut self.operators[op.index()].kind);
        self.mark_dirty(Vertex::Operator(op));
        Ok(out)
    }

    pub(crate) fn wrong_kind(&self, op: OperatorId, expected: &'static str) -> GraphError {
        GraphError::WrongOperatorKind {
            operator: self.vertex_label(Vertex::Operator(op)),
            expected,
        }
    }
}
