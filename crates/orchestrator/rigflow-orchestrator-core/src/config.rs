use anyhow::{ensure, Context, Result};
use rigflow_graph_core::GraphConfig;
use serde::{Deserialize, Serialize};

use crate::clock::LoopMode;

/// Host configuration for an [`Orchestrator`](crate::Orchestrator).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Name of the free parameter the clock writes.
    pub time_param: String,
    pub time_range: [f32; 2],
    pub speed: f32,
    pub loop_mode: LoopMode,
    /// Start playing on the first frame.
    pub autoplay: bool,
    pub graph: GraphConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            time_param: "time".into(),
            time_range: [0.0, 7000.0],
            speed: 1.0,
            loop_mode: LoopMode::Once,
            autoplay: false,
            graph: GraphConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: OrchestratorConfig =
            serde_json::from_str(s).context("parsing orchestrator config")?;
        cfg.validated()
    }

    pub fn validated(mut self) -> Result<Self> {
        let [start, end] = self.time_range;
        ensure!(
            start.is_finite() && end.is_finite() && start <= end,
            "time_range must be an ordered finite interval, got [{start}, {end}]"
        );
        ensure!(self.speed.is_finite(), "speed must be finite");
        ensure!(!self.time_param.is_empty(), "time_param must be named");
        self.graph = self.graph.validated()?;
        Ok(self)
    }
}
