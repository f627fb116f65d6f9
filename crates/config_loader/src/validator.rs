//! Configuration validation.
//!
//! Checks:
//! - declared numeric ranges (via `validator` derives on the structs)
//! - depth_units / plane_depth_m positive and consistent
//! - plane distance representable in 16-bit raw units
//! - texture target is not a wildcard kind the stage cannot map to

use contracts::{PipelineConfig, PipelineError, StreamKind};
use validator::Validate;

/// Validate a parsed [`PipelineConfig`].
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &PipelineConfig) -> Result<(), PipelineError> {
    validate_declared_ranges(config)?;
    validate_source(config)?;
    validate_pointcloud(config)?;
    Ok(())
}

/// Run the derive-level range checks
fn validate_declared_ranges(config: &PipelineConfig) -> Result<(), PipelineError> {
    config.validate().map_err(|e| {
        let field = e
            .field_errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "config".to_string());
        PipelineError::config_validation(field, e.to_string())
    })
}

/// Check source scale consistency
fn validate_source(config: &PipelineConfig) -> Result<(), PipelineError> {
    let source = &config.source;

    if source.depth_units <= 0.0 {
        return Err(PipelineError::config_validation(
            "source.depth_units",
            format!("depth_units must be > 0, got {}", source.depth_units),
        ));
    }

    if source.plane_depth_m <= 0.0 {
        return Err(PipelineError::config_validation(
            "source.plane_depth_m",
            format!("plane_depth_m must be > 0, got {}", source.plane_depth_m),
        ));
    }

    // The synthetic plane must fit the 16-bit raw depth range.
    let raw = source.plane_depth_m / source.depth_units;
    if raw > u16::MAX as f32 {
        return Err(PipelineError::config_validation(
            "source.plane_depth_m",
            format!(
                "plane at {}m needs raw value {} which exceeds 16-bit depth",
                source.plane_depth_m, raw as u64
            ),
        ));
    }

    Ok(())
}

/// Check the texture target is mappable
fn validate_pointcloud(config: &PipelineConfig) -> Result<(), PipelineError> {
    match config.pointcloud.texture_kind {
        StreamKind::Any => Err(PipelineError::config_validation(
            "pointcloud.texture_kind",
            "texture target must name a concrete stream kind",
        )),
        StreamKind::Depth | StreamKind::Motion => Err(PipelineError::config_validation(
            "pointcloud.texture_kind",
            format!(
                "{:?} streams cannot serve as texture source",
                config.pointcloud.texture_kind
            ),
        )),
        StreamKind::Color | StreamKind::Infrared => Ok(()),
    }
}
