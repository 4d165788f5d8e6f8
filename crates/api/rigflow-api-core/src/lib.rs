//! rigflow-api-core: value and transform types shared by every rigflow crate.

pub mod blend;
pub mod coercion;
pub mod json;
pub mod transform;
pub mod value;

pub use transform::{Quat, Vec3, Xfo};
pub use value::{Value, ValueKind};
