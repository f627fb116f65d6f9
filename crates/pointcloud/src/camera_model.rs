//! Camera model math.
//!
//! Coefficient layout follows the usual Brown-Conrady ordering
//! `[k1, k2, p1, p2, k3]` (radial, radial, tangential, tangential,
//! radial). For `BrownConrady` the coefficients describe the forward
//! (projecting) distortion; for `InverseBrownConrady` they describe the
//! undistortion applied when deprojecting. The opposite direction is
//! solved by fixed-point iteration in both cases.

use contracts::{DistortionModel, Extrinsics, Intrinsics};
use nalgebra::{Matrix3, Vector3};

const UNDISTORT_ITERATIONS: usize = 10;

/// Apply Brown-Conrady distortion to normalized coordinates.
fn distort(coeffs: &[f32; 5], x: f32, y: f32) -> (f32, f32) {
    let [k1, k2, p1, p2, k3] = *coeffs;
    let r2 = x * x + y * y;
    let f = 1.0 + r2 * (k1 + r2 * (k2 + r2 * k3));
    let dx = x * f + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
    let dy = y * f + 2.0 * p2 * x * y + p1 * (r2 + 2.0 * y * y);
    (dx, dy)
}

/// Invert Brown-Conrady distortion by fixed-point iteration.
fn undistort(coeffs: &[f32; 5], xd: f32, yd: f32) -> (f32, f32) {
    let [k1, k2, p1, p2, k3] = *coeffs;
    let mut x = xd;
    let mut y = yd;
    for _ in 0..UNDISTORT_ITERATIONS {
        let r2 = x * x + y * y;
        let f = 1.0 + r2 * (k1 + r2 * (k2 + r2 * k3));
        let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let dy = 2.0 * p2 * x * y + p1 * (r2 + 2.0 * y * y);
        x = (xd - dx) / f;
        y = (yd - dy) / f;
    }
    (x, y)
}

/// Map a pixel plus metric depth back into a 3-D point in camera space.
///
/// Zero depth yields the zero point.
pub fn deproject_pixel_to_point(intrinsics: &Intrinsics, pixel: [f32; 2], depth: f32) -> [f32; 3] {
    let mut x = (pixel[0] - intrinsics.ppx) / intrinsics.fx;
    let mut y = (pixel[1] - intrinsics.ppy) / intrinsics.fy;

    match intrinsics.model {
        DistortionModel::None => {}
        // Inverse model: coefficients undistort directly.
        DistortionModel::InverseBrownConrady => {
            let (ux, uy) = distort(&intrinsics.coeffs, x, y);
            x = ux;
            y = uy;
        }
        // Forward model: invert it iteratively.
        DistortionModel::BrownConrady => {
            let (ux, uy) = undistort(&intrinsics.coeffs, x, y);
            x = ux;
            y = uy;
        }
    }

    [depth * x, depth * y, depth]
}

/// Project a 3-D camera-space point to a pixel.
pub fn project_point_to_pixel(intrinsics: &Intrinsics, point: [f32; 3]) -> [f32; 2] {
    let mut x = point[0] / point[2];
    let mut y = point[1] / point[2];

    match intrinsics.model {
        DistortionModel::None => {}
        DistortionModel::BrownConrady => {
            let (dx, dy) = distort(&intrinsics.coeffs, x, y);
            x = dx;
            y = dy;
        }
        // Inverse model distorts on deprojection; projecting must undo it.
        DistortionModel::InverseBrownConrady => {
            let (dx, dy) = undistort(&intrinsics.coeffs, x, y);
            x = dx;
            y = dy;
        }
    }

    [x * intrinsics.fx + intrinsics.ppx, y * intrinsics.fy + intrinsics.ppy]
}

/// Apply a rigid transform to a point.
pub fn transform_point_to_point(extrinsics: &Extrinsics, point: [f32; 3]) -> [f32; 3] {
    let rotation = Matrix3::from_column_slice(&extrinsics.rotation);
    let translation = Vector3::from_column_slice(&extrinsics.translation);
    let transformed = rotation * Vector3::new(point[0], point[1], point[2]) + translation;
    [transformed.x, transformed.y, transformed.z]
}

/// Normalize a pixel to a [0,1] texture coordinate.
pub fn pixel_to_texcoord(intrinsics: &Intrinsics, pixel: [f32; 2]) -> [f32; 2] {
    [
        pixel[0] / intrinsics.width as f32,
        pixel[1] / intrinsics.height as f32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinhole() -> Intrinsics {
        Intrinsics::pinhole(640, 480, 600.0, 600.0, 320.0, 240.0)
    }

    fn brown_conrady() -> Intrinsics {
        Intrinsics {
            model: DistortionModel::BrownConrady,
            coeffs: [0.05, -0.02, 0.001, -0.0005, 0.01],
            ..pinhole()
        }
    }

    #[test]
    fn test_round_trip_pinhole() {
        let intrinsics = pinhole();
        for &(px, py) in &[(0.0, 0.0), (320.0, 240.0), (639.0, 479.0), (100.5, 400.25)] {
            for &depth in &[0.001, 0.5, 1.0, 8.0, 65.535] {
                let point = deproject_pixel_to_point(&intrinsics, [px, py], depth);
                let pixel = project_point_to_pixel(&intrinsics, point);
                assert!((pixel[0] - px).abs() < 1e-3, "x: {} vs {}", pixel[0], px);
                assert!((pixel[1] - py).abs() < 1e-3, "y: {} vs {}", pixel[1], py);
            }
        }
    }

    #[test]
    fn test_round_trip_brown_conrady() {
        let intrinsics = brown_conrady();
        for &(px, py) in &[(320.0, 240.0), (200.0, 300.0), (500.0, 120.0)] {
            let point = deproject_pixel_to_point(&intrinsics, [px, py], 2.0);
            let pixel = project_point_to_pixel(&intrinsics, point);
            assert!((pixel[0] - px).abs() < 1e-2);
            assert!((pixel[1] - py).abs() < 1e-2);
        }
    }

    #[test]
    fn test_zero_depth_maps_to_zero_point() {
        let point = deproject_pixel_to_point(&pinhole(), [100.0, 100.0], 0.0);
        assert_eq!(point, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_center_pixel_is_on_axis() {
        let point = deproject_pixel_to_point(&pinhole(), [320.0, 240.0], 1.5);
        assert_eq!(point, [0.0, 0.0, 1.5]);
    }

    #[test]
    fn test_identity_transform() {
        let point = [0.1, -0.2, 1.0];
        assert_eq!(transform_point_to_point(&Extrinsics::IDENTITY, point), point);
    }

    #[test]
    fn test_translation_only_transform() {
        let extrinsics = Extrinsics {
            rotation: Extrinsics::IDENTITY.rotation,
            translation: [0.05, 0.0, 0.0],
        };
        let out = transform_point_to_point(&extrinsics, [0.0, 0.0, 1.0]);
        assert!((out[0] - 0.05).abs() < 1e-6);
        assert!((out[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_transform() {
        // 90° about z, column-major: maps +x to +y.
        let extrinsics = Extrinsics {
            rotation: [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
        };
        let out = transform_point_to_point(&extrinsics, [1.0, 0.0, 0.0]);
        assert!((out[0]).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pixel_to_texcoord_normalization() {
        let intrinsics = pinhole();
        let uv = pixel_to_texcoord(&intrinsics, [320.0, 240.0]);
        assert_eq!(uv, [0.5, 0.5]);
        let uv = pixel_to_texcoord(&intrinsics, [0.0, 0.0]);
        assert_eq!(uv, [0.0, 0.0]);
    }
}
