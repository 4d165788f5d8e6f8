//! Evaluation scheduler.
//!
//! A pass collects every dirty vertex, orders the set with
//! [`topo_order`](crate::topo::topo_order) and evaluates each vertex once.
//! Operators therefore run only after all of their inputs are clean, and a
//! value shared by several dependents is computed a single time.
//!
//! Pulling a single parameter through [`Graph::get_value`] uses the same
//! machinery restricted to that parameter's dirty upstream closure.

use log::debug;

use crate::graph::{Graph, Step};
use crate::topo::topo_order;
use crate::types::Vertex;


/// What a scheduler pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalReport {
    /// Dirty vertices in the order they were visited.
    pub order: Vec<Vertex>,
    /// Operators that wrote their outputs.
    pub operators_evaluated: usize,
    /// Operators that were disabled or missing inputs and kept their outputs.
    pub operators_held: usize,
}

impl EvalReport {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Bring every dirty vertex of `graph` up to date.
pub fn evaluate_all(graph: &mut Graph) -> EvalReport {
    let dirty = graph.dirty_vertices();
    if dirty.is_empty() {
        return EvalReport::default();
    }
    let order = topo_order(&dirty, |v| graph.upstream(v));

    let mut report = EvalReport::default();
    for &vertex in &order {
        match graph.evaluate_vertex(vertex) {
            Step::OperatorProduced => report.operators_evaluated += 1,
            Step::OperatorHeld => report.operators_held += 1,
            Step::Param | Step::Clean => {}
        }
    }
    debug!(
        "evaluated {} dirty vertices ({} operators run, {} held)",
        order.len(),
        report.operators_evaluated,
        report.operators_held
    );
    report.order = order;
    report
}

impl Graph {
    /// Run one scheduler pass. See [`evaluate_all`].
    pub fn evaluate(&mut self) -> EvalReport {
        evaluate_all(self)
    }
}
