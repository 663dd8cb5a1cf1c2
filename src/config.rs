//! Engine configuration
//!
//! Every tunable threshold lives here so hosts can override it from JSON.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// Default bound on the position mapper's memo.
pub const DEFAULT_MAPPER_CACHE_SIZE: usize = 1000;

/// Characters added on each side of a viewport query.
pub const DEFAULT_VIEWPORT_BUFFER: usize = 500;

/// Maximum gap between members that may still be merged.
pub const DEFAULT_MERGE_GAP_THRESHOLD: usize = 50;

/// Shift magnitude above which a shifted suggestion is re-anchored.
pub const DEFAULT_REVALIDATION_SHIFT_THRESHOLD: usize = 10;

/// Severity above which a conflict group is left to the user.
pub const DEFAULT_USER_CHOICE_SEVERITY: f64 = 5.0;

/// Depth of the undo ring.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Confidence below which a suggestion is flagged for review.
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.7;

/// Interval between persisted snapshots.
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 30_000;

/// Tunables for the whole engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub mapper_cache_size: usize,
    pub viewport_buffer: usize,
    pub index_cache_size: usize,
    pub merge_gap_threshold: usize,
    pub revalidation_shift_threshold: usize,
    pub user_choice_severity: f64,
    pub history_depth: usize,
    pub review_threshold: f64,
    pub autosave_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mapper_cache_size: DEFAULT_MAPPER_CACHE_SIZE,
            viewport_buffer: DEFAULT_VIEWPORT_BUFFER,
            index_cache_size: 64,
            merge_gap_threshold: DEFAULT_MERGE_GAP_THRESHOLD,
            revalidation_shift_threshold: DEFAULT_REVALIDATION_SHIFT_THRESHOLD,
            user_choice_severity: DEFAULT_USER_CHOICE_SEVERITY,
            history_depth: DEFAULT_HISTORY_DEPTH,
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
            autosave_interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolver thresholds derived from this configuration
    pub fn resolver(&self) -> crate::conflict::ResolverConfig {
        crate::conflict::ResolverConfig {
            merge_gap_threshold: self.merge_gap_threshold,
            revalidation_shift_threshold: self.revalidation_shift_threshold,
            user_choice_severity: self.user_choice_severity,
        }
    }
}
