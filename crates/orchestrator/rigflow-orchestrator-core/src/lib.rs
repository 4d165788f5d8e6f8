//! rigflow orchestrator
//!
//! Drives a [`Graph`] one frame at a time: the playback clock writes the time
//! parameter, a scheduler pass brings every dirty value up to date, and the
//! global transforms of visible nodes are captured in a [`Frame`] for the
//! renderer. Asset loads are applied between frames through [`Orchestrator::complete_load`].

pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod render;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use rigflow_api_core::json::parse_value;
use rigflow_api_core::Xfo;
use rigflow_graph_core::{Graph, LoadQueue, LoadTicket, NodeHierarchy, NodeId, ParamId};

pub use crate::clock::{LoopMode, PlaybackClock};
pub use crate::config::OrchestratorConfig;
pub use crate::diagnostics::FrameRateMeter;
pub use crate::render::{RecordedView, RenderView};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFrame {
    pub name: String,
    pub global: Xfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub epoch: u64,
    pub dt: f32,
    /// Value of the time parameter after this frame.
    pub time: f32,
    /// Visible nodes in creation order.
    pub nodes: Vec<NodeFrame>,
    pub vertices_evaluated: usize,
    pub operators_evaluated: usize,
    pub operators_held: usize,
    pub fps: Option<f32>,
}

impl Frame {
    pub fn node(&self, name: &str) -> Option<&Xfo> {
        self.nodes.iter().find(|n| n.name == name).map(|n| &n.global)
    }

    /// Hand every visible node to `view`.
    pub fn present(&self, view: &mut dyn RenderView) {
        view.begin_frame(self.epoch);
        for node in &self.nodes {
            view.draw(&node.name, &node.global);
        }
        view.end_frame();
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    pub graph: Graph,
    pub clock: PlaybackClock,
    /// Pending hierarchy loads, applied by [`Orchestrator::complete_load`].
    pub loads: LoadQueue<NodeHierarchy>,
    pub epoch: u64,
    time: ParamId,
    meter: FrameRateMeter,
}

impl Orchestrator {
    /// Start from an empty graph built with `config.graph`.
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let config = config.validated()?;
        let graph = Graph::with_config(config.graph.clone());
        Self::with_graph(graph, config)
    }

    /// Drive an existing graph. The time parameter named in `config` is
    /// created if missing and range-limited either way.
    pub fn with_graph(mut graph: Graph, config: OrchestratorConfig) -> Result<Self> {
        let config = config.validated()?;
        let [start, end] = config.time_range;
        let time = match graph.find_param(&config.time_param) {
            Some(id) => {
                graph.set_param_range(id, start, end)?;
                id
            }
            None => graph.add_ranged_param(config.time_param.clone(), start, start, end)?,
        };

        let mut clock = PlaybackClock::new(config.time_range, config.loop_mode);
        clock.set_speed(config.speed);
        clock.seek(graph.get_float(time)?);
        if config.autoplay {
            clock.play();
        }
        Ok(Self {
            graph,
            clock,
            loads: LoadQueue::new(),
            epoch: 0,
            time,
            meter: FrameRateMeter::default(),
        })
    }

    pub fn time_param(&self) -> ParamId {
        self.time
    }

    /// Write a free parameter from host JSON (shorthand forms accepted).
    /// Writing the time parameter also moves the clock.
    pub fn set_input(&mut self, name: &str, value: serde_json::Value) -> Result<()> {
        let id = self
            .graph
            .find_param(name)
            .ok_or_else(|| anyhow!("no parameter named '{name}'"))?;
        let value = parse_value(value).with_context(|| format!("input '{name}'"))?;
        self.graph
            .set_value(id, value)
            .with_context(|| format!("writing input '{name}'"))?;
        if id == self.time {
            self.clock.seek(self.graph.get_float(id)?);
        }
        Ok(())
    }

    pub fn seek(&mut self, time: f32) -> Result<()> {
        self.clock.seek(time);
        self.graph.set_value(self.time, self.clock.time())?;
        Ok(())
    }

    /// Apply a finished hierarchy load between frames.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<NodeHierarchy, String>,
    ) -> Result<()> {
        self.loads.complete(ticket, result, &mut self.graph)?;
        Ok(())
    }

    /// Advance by `dt` seconds and return the new frame. A time parameter
    /// the clock may not write (one driven from inside the graph) keeps its
    /// driven value; the frame still runs.
    pub fn step(&mut self, dt: f32) -> Result<Frame> {
        self.epoch = self.epoch.wrapping_add(1);
        if self.clock.is_playing() {
            let t = self.clock.advance(dt);
            if let Err(err) = self.graph.set_value(self.time, t) {
                warn!("frame {}: clock did not write the time parameter: {err}", self.epoch);
            }
        }

        let report = self.graph.evaluate();

        let visible: Vec<(NodeId, String)> = self
            .graph
            .nodes()
            .filter(|(_, node)| node.is_visible())
            .map(|(id, node)| (id, node.name().to_string()))
            .collect();
        let mut nodes = Vec::with_capacity(visible.len());
        for (id, name) in visible {
            let global = self.graph.global_transform(id)?;
            nodes.push(NodeFrame { name, global });
        }

        self.meter.tick(dt);
        let time = self.graph.get_float(self.time)?;
        debug!(
            "frame {} at t={time}: {} vertices, {} operators",
            self.epoch,
            report.order.len(),
            report.operators_evaluated
        );
        Ok(Frame {
            epoch: self.epoch,
            dt,
            time,
            nodes,
            vertices_evaluated: report.order.len(),
            operators_evaluated: report.operators_evaluated,
            operators_held: report.operators_held,
            fps: self.meter.fps(),
        })
    }

    /// [`Orchestrator::step`] and present the frame to `view`.
    pub fn step_and_present(&mut self, dt: f32, view: &mut dyn RenderView) -> Result<Frame> {
        let frame = self.step(dt)?;
        frame.present(view);
        Ok(frame)
    }
}
