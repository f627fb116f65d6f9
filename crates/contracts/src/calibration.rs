//! Camera calibration data: intrinsics, extrinsics, calibration graph.

use serde::{Deserialize, Serialize};

use crate::StreamProfile;

/// Lens distortion model attached to [`Intrinsics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionModel {
    /// Ideal pinhole, coefficients ignored
    #[default]
    None,

    /// Brown-Conrady: coefficients distort when projecting
    BrownConrady,

    /// Inverse Brown-Conrady: coefficients undistort when deprojecting
    InverseBrownConrady,
}

/// Per-stream camera model, valid for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,

    /// Principal point
    pub ppx: f32,
    pub ppy: f32,

    /// Focal length in pixels
    pub fx: f32,
    pub fy: f32,

    pub model: DistortionModel,
    pub coeffs: [f32; 5],
}

impl Intrinsics {
    /// Undistorted pinhole model.
    pub fn pinhole(width: u32, height: u32, fx: f32, fy: f32, ppx: f32, ppy: f32) -> Self {
        Self {
            width,
            height,
            ppx,
            ppy,
            fx,
            fy,
            model: DistortionModel::None,
            coeffs: [0.0; 5],
        }
    }
}

/// Rigid transform between two streams' coordinate frames.
///
/// `rotation` is a column-major 3x3 matrix; applying the transform maps a
/// point from the source stream's space into the target stream's space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrinsics {
    pub rotation: [f32; 9],
    pub translation: [f32; 3],
}

impl Extrinsics {
    pub const IDENTITY: Extrinsics = Extrinsics {
        rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        translation: [0.0, 0.0, 0.0],
    };

    /// True when the transform is the identity within `epsilon`, i.e. both
    /// streams originate from the same physical sensor.
    pub fn is_identity(&self, epsilon: f32) -> bool {
        self.rotation
            .iter()
            .zip(Self::IDENTITY.rotation.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
            && self.translation.iter().all(|t| t.abs() <= epsilon)
    }
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Process-wide calibration graph, synchronized internally by its
/// implementation. The pipeline only performs lookups, never mutation.
pub trait ExtrinsicsGraph: Send + Sync {
    /// Rigid transform from `from`'s space to `to`'s space, if the pair is
    /// linked in the graph.
    fn try_fetch_extrinsics(&self, from: &StreamProfile, to: &StreamProfile) -> Option<Extrinsics>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_detection() {
        assert!(Extrinsics::IDENTITY.is_identity(1e-6));

        let shifted = Extrinsics {
            rotation: Extrinsics::IDENTITY.rotation,
            translation: [0.015, 0.0, 0.0],
        };
        assert!(!shifted.is_identity(1e-6));
    }
}
