//! Editing model: edit steps and position mapping

mod mapping;
mod operation;

pub use mapping::{Bias, MapResult, Mapping, StepMap};
pub use operation::Step;
