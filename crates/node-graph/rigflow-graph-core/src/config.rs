//! Graph configuration.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// What happens when the host writes a parameter that already has a writer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Fail with [`GraphError::BoundParameter`].
    #[default]
    Reject,
    /// Store the value; the next recomputation replaces it.
    Override,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub write_policy: WritePolicy,
    /// Default iteration budget for new IK solvers.
    pub ik_iterations: u32,
    /// Positional tolerance at which IK solvers stop early.
    pub ik_epsilon: f32,
    /// Fraction of each corrective joint rotation applied per step, in (0, 1].
    pub ik_damping: f32,
    /// Smallest base-to-target distance the triangle solver will solve for.
    pub triangle_min_reach: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::Reject,
            ik_iterations: 20,
            ik_epsilon: 1e-4,
            ik_damping: 1.0,
            triangle_min_reach: 1e-4,
        }
    }
}

impl GraphConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self, GraphError> {
        let cfg: GraphConfig =
            serde_json::from_str(s).map_err(|e| GraphError::Config(e.to_string()))?;
        cfg.validated()
    }

    pub fn validated(self) -> Result<Self, GraphError> {
        if !(self.ik_damping > 0.0 && self.ik_damping <= 1.0) {
            return Err(GraphError::Config(format!(
                "ik_damping must be in (0, 1], got {}",
                self.ik_damping
            )));
        }
        if !(self.ik_epsilon >= 0.0) {
            return Err(GraphError::Config("ik_epsilon must be non-negative".into()));
        }
        if !(self.triangle_min_reach > 0.0) {
            return Err(GraphError::Config(format!(
                "triangle_min_reach must be positive, got {}",
                self.triangle_min_reach
            )));
        }
        Ok(self)
    }
}
