//! Occlusion filter.
//!
//! After texture mapping, points hidden behind foreground geometry from
//! the texture sensor's viewpoint still receive a (wrong) texture
//! coordinate. Along the scan direction implied by the sensor baseline,
//! the projected texture pixel of an unoccluded surface advances
//! monotonically; a texel that falls behind the running maximum belongs
//! to an occluded point and is invalidated in place.

use contracts::{Extrinsics, Intrinsics, TexCoord, Vertex};

/// Filtering mode. Numeric option values: 0 = off, 1 = monotonic scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcclusionMode {
    #[default]
    Off,
    MonotonicScan,
}

/// Scanline walk direction, derived from the extrinsics baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    #[default]
    Horizontal,
    Vertical,
}

/// Occlusion state for one point-cloud stage instance.
///
/// Mutated only while no processing call is in flight for that stage.
#[derive(Debug, Default)]
pub struct OcclusionFilter {
    mode: OcclusionMode,
    scanning: ScanDirection,
    depth_units: f32,
    depth_intrinsics: Option<Intrinsics>,
    texel_intrinsics: Option<Intrinsics>,
    last_extrinsics: Option<Extrinsics>,
}

impl OcclusionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&mut self, mode: OcclusionMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> OcclusionMode {
        self.mode
    }

    pub fn active(&self) -> bool {
        self.mode != OcclusionMode::Off
    }

    pub fn set_scanning(&mut self, scanning: ScanDirection) {
        self.scanning = scanning;
    }

    pub fn scanning(&self) -> ScanDirection {
        self.scanning
    }

    pub fn set_depth_units(&mut self, depth_units: f32) {
        self.depth_units = depth_units;
    }

    pub fn set_depth_intrinsics(&mut self, intrinsics: Intrinsics) {
        self.depth_intrinsics = Some(intrinsics);
    }

    pub fn set_texel_intrinsics(&mut self, intrinsics: Intrinsics) {
        self.texel_intrinsics = Some(intrinsics);
    }

    /// Identity extrinsics mean depth and texture share one physical
    /// sensor; no parallax, no occlusion, the pass can be skipped.
    pub fn is_same_sensor(&self, extrinsics: &Extrinsics) -> bool {
        extrinsics.is_identity(1e-6)
    }

    /// The dominant baseline axis decides how the surface is scanned.
    pub fn find_scanning_direction(&self, extrinsics: &Extrinsics) -> ScanDirection {
        if extrinsics.translation[1].abs() > extrinsics.translation[0].abs() {
            ScanDirection::Vertical
        } else {
            ScanDirection::Horizontal
        }
    }

    /// Extrinsics used on the last pass.
    pub fn last_extrinsics(&self) -> Option<Extrinsics> {
        self.last_extrinsics
    }

    pub fn record_extrinsics(&mut self, extrinsics: Extrinsics) {
        self.last_extrinsics = Some(extrinsics);
    }

    /// Invalidate occluded texels in place. `pixels` holds the raw
    /// projected texture pixels recorded during mapping. Returns the
    /// number of invalidated texels.
    pub fn process(
        &mut self,
        vertices: &[Vertex],
        texcoords: &mut [TexCoord],
        pixels: &[TexCoord],
    ) -> usize {
        match self.mode {
            OcclusionMode::Off => 0,
            OcclusionMode::MonotonicScan => self.monotonic_scan(vertices, texcoords, pixels),
        }
    }

    /// Classic z-buffer-style consistency check along scanlines.
    fn monotonic_scan(
        &self,
        vertices: &[Vertex],
        texcoords: &mut [TexCoord],
        pixels: &[TexCoord],
    ) -> usize {
        let Some(intrinsics) = self.depth_intrinsics else {
            return 0;
        };
        let width = intrinsics.width as usize;
        let height = intrinsics.height as usize;
        if vertices.len() < width * height {
            return 0;
        }

        // A point within one raw unit of the sensor is effectively empty.
        let min_depth = self.depth_units;
        let mut occluded = 0;

        match self.scanning {
            ScanDirection::Horizontal => {
                for y in 0..height {
                    let mut max_along_line = f32::MIN;
                    for x in 0..width {
                        let i = y * width + x;
                        if !vertices[i].is_valid() || vertices[i].z <= min_depth {
                            continue;
                        }
                        if pixels[i].u < max_along_line {
                            texcoords[i] = TexCoord::ZERO;
                            occluded += 1;
                        } else {
                            max_along_line = pixels[i].u;
                        }
                    }
                }
            }
            ScanDirection::Vertical => {
                for x in 0..width {
                    let mut max_along_line = f32::MIN;
                    for y in 0..height {
                        let i = y * width + x;
                        if !vertices[i].is_valid() || vertices[i].z <= min_depth {
                            continue;
                        }
                        if pixels[i].v < max_along_line {
                            texcoords[i] = TexCoord::ZERO;
                            occluded += 1;
                        } else {
                            max_along_line = pixels[i].v;
                        }
                    }
                }
            }
        }

        occluded
    }
}
