use rigflow_api_core::transform::unit_or;
use rigflow_api_core::{coercion, Value, Vec3};
use serde::{Deserialize, Serialize};

use crate::types::ParamId;

/// Conversion applied when a binding copies its source into its sink.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ValueMap {
    #[default]
    Identity,
    /// Project a vector, or a transform's translation, onto an axis.
    AxisProjection(Vec3),
    /// Translation part of a transform.
    Translation,
    Scale(f32),
}

impl ValueMap {
    pub fn apply(&self, value: &Value) -> Value {
        match self {
            ValueMap::Identity => value.clone(),
            ValueMap::AxisProjection(axis) => {
                let axis = unit_or(*axis, Vec3::X);
                Value::Float(coercion::as_vec3(value).dot(axis))
            }
            ValueMap::Translation => Value::Vec3(coercion::as_vec3(value)),
            ValueMap::Scale(k) => match value {
                Value::Float(f) => Value::Float(f * k),
                Value::Vec3(v) => Value::Vec3(*v * *k),
                other => other.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub source: ParamId,
    pub sink: ParamId,
    pub map: ValueMap,
}
