//! Position mapping between the suggestion source's char offsets and
//! document positions

mod cache;
mod mapper;

pub use cache::{CacheKey, CacheStats, MappingCache};
pub use mapper::{length_confidence, PositionMapper, RangeValidation, TextMatch};
