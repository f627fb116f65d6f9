//! Device options - mutable, queryable device state.

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Well-known option identifiers, hash-map keys for the options watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionId {
    Exposure,
    Gain,
    LaserPower,
    DepthUnits,
    /// Occlusion-removal mode of the point-cloud stage
    OcclusionRemoval,
}

/// Valid value range of an option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl OptionRange {
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A single mutable device option.
///
/// `query` may fail transiently (e.g. an option only readable while the
/// sensor streams); callers treat such failures as "skip for now", never
/// as fatal.
pub trait DeviceOption: Send + Sync {
    fn query(&self) -> Result<f32, PipelineError>;

    fn set(&self, value: f32) -> Result<(), PipelineError>;

    fn range(&self) -> OptionRange;

    fn description(&self) -> &str;
}
