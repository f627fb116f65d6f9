//! Stream identification: kind, pixel format, profile.

use serde::{Deserialize, Serialize};

use crate::Intrinsics;

/// Stream kind
///
/// `Any` is the wildcard used by [`crate::StreamFilter`]; a real stream
/// profile never carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    #[default]
    Any,
    Depth,
    Color,
    Infrared,
    Motion,
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Wildcard, only meaningful inside a filter
    #[default]
    Any,

    /// 16-bit raw depth
    Z16,

    /// 16-bit luminance
    Y16,

    /// Interleaved left/right luminance, 10 significant bits per sample
    Y16I,

    /// 8-bit RGB
    Rgb8,

    /// 3x f32 vertex stream (point cloud output)
    Xyz32,

    /// 3x f32 motion sample
    MotionXyz32,
}

impl PixelFormat {
    /// Bytes per pixel for buffer sizing; 0 for the wildcard.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Any => 0,
            PixelFormat::Z16 | PixelFormat::Y16 => 2,
            PixelFormat::Y16I => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Xyz32 | PixelFormat::MotionXyz32 => 12,
        }
    }
}

/// Stream profile
///
/// Identifies one stream of frames. Immutable once created; a frame's
/// profile never changes after production.
///
/// Equality compares the identity fields only (kind / format / index /
/// resolution / fps). The attached intrinsics are a calibration payload,
/// not part of the stream's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamProfile {
    /// Stream kind (never `Any` on a real profile)
    pub kind: StreamKind,

    /// Pixel format (never `Any` on a real profile)
    pub format: PixelFormat,

    /// Stream index, distinguishes e.g. left/right infrared
    pub index: i32,

    /// Image width in pixels (0 for non-video streams)
    pub width: u32,

    /// Image height in pixels (0 for non-video streams)
    pub height: u32,

    /// Nominal frame rate
    pub fps: u32,

    /// Camera model for this stream, when calibrated
    #[serde(default)]
    pub intrinsics: Option<Intrinsics>,
}

impl StreamProfile {
    /// Create a video stream profile without intrinsics.
    pub fn video(kind: StreamKind, format: PixelFormat, index: i32, width: u32, height: u32, fps: u32) -> Self {
        Self {
            kind,
            format,
            index,
            width,
            height,
            fps,
            intrinsics: None,
        }
    }

    /// Attach intrinsics (builder style).
    pub fn with_intrinsics(mut self, intrinsics: Intrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    /// Clone this profile into a derived output profile with a new kind and
    /// format, keeping index / resolution / fps.
    pub fn derive(&self, kind: StreamKind, format: PixelFormat) -> Self {
        Self {
            kind,
            format,
            index: self.index,
            width: self.width,
            height: self.height,
            fps: self.fps,
            intrinsics: self.intrinsics,
        }
    }

    /// Pixel count, for buffer sizing.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl PartialEq for StreamProfile {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.format == other.format
            && self.index == other.index
            && self.width == other.width
            && self.height == other.height
            && self.fps == other.fps
    }
}

impl Eq for StreamProfile {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DistortionModel, Intrinsics};

    fn depth_profile() -> StreamProfile {
        StreamProfile::video(StreamKind::Depth, PixelFormat::Z16, 0, 640, 480, 30)
    }

    #[test]
    fn test_profile_equality_ignores_intrinsics() {
        let plain = depth_profile();
        let calibrated = depth_profile().with_intrinsics(Intrinsics {
            width: 640,
            height: 480,
            ppx: 320.0,
            ppy: 240.0,
            fx: 600.0,
            fy: 600.0,
            model: DistortionModel::None,
            coeffs: [0.0; 5],
        });

        assert_eq!(plain, calibrated);
    }

    #[test]
    fn test_derive_keeps_shape() {
        let out = depth_profile().derive(StreamKind::Depth, PixelFormat::Xyz32);
        assert_eq!(out.width, 640);
        assert_eq!(out.height, 480);
        assert_eq!(out.format, PixelFormat::Xyz32);
        assert_ne!(out, depth_profile());
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::Z16.bytes_per_pixel(), 2);
        assert_eq!(PixelFormat::Y16I.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Xyz32.bytes_per_pixel(), 12);
    }
}
