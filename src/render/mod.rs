//! Render output: suggestion decorations and their diff protocol

mod decoration;
mod diff;

pub use decoration::{edit_type_color, project_decorations, Decoration, DecorationKind};
pub use diff::{DecorationDiff, DecorationPatch, DiffEngine};
