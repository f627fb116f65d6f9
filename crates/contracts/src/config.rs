//! PipelineConfig - Config Loader output
//!
//! Describes a complete pipeline setup: synthetic source shape, point-cloud
//! stage settings, options-watcher polling.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::StreamKind;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Frame source settings
    #[serde(default)]
    #[validate(nested)]
    pub source: SourceConfig,

    /// Point-cloud stage settings
    #[serde(default)]
    pub pointcloud: PointCloudConfig,

    /// Options watcher settings
    #[serde(default)]
    #[validate(nested)]
    pub watcher: WatcherConfig,
}

/// Synthetic frame source settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SourceConfig {
    /// Image width in pixels
    #[serde(default = "default_width")]
    #[validate(range(min = 16, max = 4096))]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_height")]
    #[validate(range(min = 16, max = 4096))]
    pub height: u32,

    /// Frame rate
    #[serde(default = "default_fps")]
    #[validate(range(min = 1, max = 300))]
    pub fps: u32,

    /// Meters per raw depth unit
    #[serde(default = "default_depth_units")]
    pub depth_units: f32,

    /// Distance of the synthetic flat plane, meters
    #[serde(default = "default_plane_depth")]
    pub plane_depth_m: f32,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_fps() -> u32 {
    30
}

fn default_depth_units() -> f32 {
    0.001
}

fn default_plane_depth() -> f32 {
    1.0
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            depth_units: default_depth_units(),
            plane_depth_m: default_plane_depth(),
        }
    }
}

/// Occlusion-removal mode selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcclusionModeConfig {
    #[default]
    Off,
    Monotonic,
}

/// Point-cloud stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloudConfig {
    /// Occlusion-removal mode
    #[serde(default)]
    pub occlusion: OcclusionModeConfig,

    /// Stream kind used as texture source
    #[serde(default = "default_texture_kind")]
    pub texture_kind: StreamKind,

    /// Texture stream index
    #[serde(default)]
    pub texture_index: i32,
}

fn default_texture_kind() -> StreamKind {
    StreamKind::Color
}

impl Default for PointCloudConfig {
    fn default() -> Self {
        Self {
            occlusion: OcclusionModeConfig::Off,
            texture_kind: default_texture_kind(),
            texture_index: 0,
        }
    }
}

/// Options watcher settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WatcherConfig {
    /// Polling interval, milliseconds
    #[serde(default = "default_interval_ms")]
    #[validate(range(min = 10, max = 60_000))]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}
