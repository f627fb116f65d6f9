//! Point-cloud stage.
//!
//! Deprojects depth frames into 3-D points, maps them into a texture
//! sensor's frame, projects texture coordinates and runs occlusion
//! correction. Reacts to live calibration-change notifications from the
//! owning device.
//!
//! Per-instance lifecycle: uninitialized → depth-profile-known →
//! fully-calibrated (depth + texture intrinsics and extrinsics resolved);
//! any source-profile change or a successful on-device calibration drops
//! the affected cached state and re-resolves it.

use std::sync::Arc;

use contracts::{
    CalibrationStatus, DeviceHandle, DeviceOption, Extrinsics, ExtrinsicsGraph, Frame,
    FrameAllocator, FrameCallback, FrameRef, Intrinsics, OptionRange, PipelineError, PixelFormat,
    StreamFilter, StreamKind, StreamProfile, TexCoord, Vertex,
};
use parking_lot::Mutex;
use processing::{FrameProcessor, ProcessingBlock};
use tracing::{debug, error, trace, warn};

use crate::camera_model::{
    deproject_pixel_to_point, pixel_to_texcoord, project_point_to_pixel, transform_point_to_point,
};
use crate::occlusion::{OcclusionFilter, OcclusionMode};

/// Fallback when the depth frame carries no sensor handle.
const DEFAULT_DEPTH_UNITS: f32 = 0.001;

/// Calibration-dependent state, reset on profile changes.
#[derive(Default)]
struct CalibrationState {
    output_profile: Option<StreamProfile>,
    depth_profile: Option<StreamProfile>,
    texture_profile: Option<StreamProfile>,
    depth_intrinsics: Option<Intrinsics>,
    texture_intrinsics: Option<Intrinsics>,
    extrinsics: Option<Extrinsics>,
    depth_units: f32,
}

/// State shared between the processor, the occlusion option adapter and
/// the device's calibration-change listener (which holds only a weak
/// reference, so a dead stage makes the listener a no-op).
struct Shared {
    filter: Mutex<StreamFilter>,
    calibration: Mutex<CalibrationState>,
    occlusion: Mutex<OcclusionFilter>,
}

impl Shared {
    /// Retry the extrinsics lookup once both stream profiles are known.
    fn resolve_extrinsics(&self, graph: &dyn ExtrinsicsGraph, calibration: &mut CalibrationState) {
        if calibration.extrinsics.is_some() {
            return;
        }
        let (Some(depth), Some(texture)) =
            (&calibration.depth_profile, &calibration.texture_profile)
        else {
            return;
        };
        match graph.try_fetch_extrinsics(depth, texture) {
            Some(extrinsics) => {
                debug!("extrinsics resolved for texture mapping");
                calibration.extrinsics = Some(extrinsics);
            }
            None => {
                // Mapping stays disabled until the pair appears in the graph.
                debug!("extrinsics not yet available, texture mapping disabled");
            }
        }
    }
}

/// Re-scan a device's active streams after a successful on-device
/// calibration and refresh texture intrinsics + extrinsics.
fn refresh_after_calibration(
    shared: &Shared,
    graph: &dyn ExtrinsicsGraph,
    device: &dyn DeviceHandle,
) {
    let filter = *shared.filter.lock();

    let mut depth_profile: Option<StreamProfile> = None;
    let mut texture_profile: Option<StreamProfile> = None;
    for sensor in device.sensors() {
        for profile in sensor.active_streams() {
            if profile.kind == StreamKind::Depth && profile.format == PixelFormat::Z16 {
                depth_profile = Some(profile);
            } else if filter.matches(&profile) {
                texture_profile = Some(profile);
            }
        }
    }

    let (Some(depth), Some(texture)) = (depth_profile, texture_profile) else {
        warn!("calibration changed but active depth/texture streams not found");
        return;
    };

    let mut calibration = shared.calibration.lock();
    if let Some(intrinsics) = texture.intrinsics {
        calibration.texture_intrinsics = Some(intrinsics);
        shared.occlusion.lock().set_texel_intrinsics(intrinsics);
    }
    match graph.try_fetch_extrinsics(&depth, &texture) {
        Some(extrinsics) => {
            debug!("extrinsics refreshed after calibration change");
            calibration.extrinsics = Some(extrinsics);
        }
        None => {
            error!("failed to refresh extrinsics after calibration change");
        }
    }
}

/// The stage hooks driven by [`ProcessingBlock`].
struct PointCloudProcessor {
    graph: Arc<dyn ExtrinsicsGraph>,
    shared: Arc<Shared>,
    /// Raw projected texture pixels, kept for the occlusion pass.
    pixels: Vec<TexCoord>,
    listener_registered: bool,
}

impl PointCloudProcessor {
    /// Depth-side state machine step: profile change resets the cached
    /// output profile, intrinsics, units and extrinsics.
    fn inspect_depth_frame(&mut self, depth: &FrameRef) {
        let mut calibration = self.shared.calibration.lock();

        if calibration.output_profile.is_none()
            || calibration.depth_profile.as_ref() != Some(depth.profile())
        {
            calibration.output_profile =
                Some(depth.profile().derive(StreamKind::Depth, PixelFormat::Xyz32));
            calibration.depth_profile = Some(depth.profile().clone());
            calibration.depth_intrinsics = None;
            calibration.depth_units = depth.depth_units().unwrap_or(DEFAULT_DEPTH_UNITS);
            calibration.extrinsics = None;
            trace!(profile = ?depth.profile(), "depth profile changed, caches reset");
        }

        if calibration.depth_intrinsics.is_none() {
            if let Some(intrinsics) = depth.profile().intrinsics {
                calibration.depth_intrinsics = Some(intrinsics);
                self.pixels.resize(
                    intrinsics.width as usize * intrinsics.height as usize,
                    TexCoord::ZERO,
                );
                self.shared.occlusion.lock().set_depth_intrinsics(intrinsics);
            }
        }

        self.shared.resolve_extrinsics(self.graph.as_ref(), &mut calibration);
    }

    /// Texture-side state machine step.
    fn inspect_texture_frame(&mut self, texture: &FrameRef) {
        if !self.listener_registered {
            self.register_calibration_listener(texture);
        }

        let mut calibration = self.shared.calibration.lock();

        // Unchanged profile with resolved extrinsics: nothing to re-derive.
        if calibration.extrinsics.is_some()
            && calibration.texture_profile.as_ref() == Some(texture.profile())
        {
            return;
        }

        calibration.texture_profile = Some(texture.profile().clone());
        calibration.texture_intrinsics = None;
        calibration.extrinsics = None;

        if let Some(intrinsics) = texture.profile().intrinsics {
            calibration.texture_intrinsics = Some(intrinsics);
            self.shared.occlusion.lock().set_texel_intrinsics(intrinsics);
        }

        self.shared.resolve_extrinsics(self.graph.as_ref(), &mut calibration);
    }

    /// One-time, weak self-registration on the texture frame's device. The
    /// device must not keep the stage alive, and the callback no-ops once
    /// the stage is gone.
    fn register_calibration_listener(&mut self, texture: &FrameRef) {
        let Some(sensor) = texture.sensor() else {
            return;
        };
        let Some(device) = sensor.device() else {
            return;
        };

        // One attempt per stage instance, whether or not the device
        // supports notification.
        self.listener_registered = true;

        let weak_shared = Arc::downgrade(&self.shared);
        let weak_device = Arc::downgrade(&device);
        let graph = self.graph.clone();

        let registered = device.register_calibration_listener(Arc::new(move |status| {
            if status != CalibrationStatus::Successful {
                return;
            }
            let Some(shared) = weak_shared.upgrade() else {
                // Stage is gone; nobody to refresh.
                return;
            };
            let Some(device) = weak_device.upgrade() else {
                return;
            };
            refresh_after_calibration(&shared, graph.as_ref(), device.as_ref());
        }));

        if registered {
            debug!("registered calibration-change listener");
        } else {
            trace!("device does not support calibration-change notification");
        }
    }

    /// Deproject, texture-map and occlusion-correct one depth frame.
    fn process_depth_frame(
        &mut self,
        allocator: &dyn FrameAllocator,
        depth: &FrameRef,
    ) -> Result<Frame, PipelineError> {
        let (output_profile, depth_intrinsics, texture_intrinsics, extrinsics, depth_units) = {
            let calibration = self.shared.calibration.lock();
            (
                calibration.output_profile.clone(),
                calibration.depth_intrinsics,
                calibration.texture_intrinsics,
                calibration.extrinsics,
                calibration.depth_units,
            )
        };

        let output_profile = output_profile
            .ok_or_else(|| PipelineError::frame_mismatch("depth frame not inspected"))?;
        let depth_intrinsics = depth_intrinsics.ok_or(PipelineError::CalibrationUnavailable {
            from: "depth stream".into(),
            to: "camera model".into(),
        })?;

        let width = depth_intrinsics.width as usize;
        let height = depth_intrinsics.height as usize;
        let count = width * height;

        let data = depth
            .video_data()
            .ok_or_else(|| PipelineError::frame_mismatch("depth frame has no pixel data"))?;
        if data.len() < count * 2 {
            return Err(PipelineError::frame_mismatch(
                "depth buffer smaller than its profile",
            ));
        }
        if self.pixels.len() < count {
            self.pixels.resize(count, TexCoord::ZERO);
        }

        let mut output = allocator.allocate_points(output_profile, depth)?;
        {
            let (vertices, texcoords) = output
                .points_data_mut()
                .ok_or_else(|| PipelineError::frame_mismatch("allocated frame is not points"))?;

            let mut index = 0;
            for y in 0..height {
                for x in 0..width {
                    let raw = u16::from_le_bytes([data[2 * index], data[2 * index + 1]]);
                    vertices[index] = if raw == 0 {
                        Vertex::ZERO
                    } else {
                        let point = deproject_pixel_to_point(
                            &depth_intrinsics,
                            [x as f32, y as f32],
                            depth_units * raw as f32,
                        );
                        Vertex::new(point[0], point[1], point[2])
                    };
                    index += 1;
                }
            }

            if let (Some(extrinsics), Some(texture_intrinsics)) = (extrinsics, texture_intrinsics) {
                for i in 0..count {
                    let vertex = vertices[i];
                    if vertex.is_valid() {
                        let transformed =
                            transform_point_to_point(&extrinsics, [vertex.x, vertex.y, vertex.z]);
                        let pixel = project_point_to_pixel(&texture_intrinsics, transformed);
                        self.pixels[i] = TexCoord::new(pixel[0], pixel[1]);
                        let uv = pixel_to_texcoord(&texture_intrinsics, pixel);
                        texcoords[i] = TexCoord::new(uv[0], uv[1]);
                    } else {
                        self.pixels[i] = TexCoord::ZERO;
                        texcoords[i] = TexCoord::ZERO;
                    }
                }

                let mut occlusion = self.shared.occlusion.lock();
                if occlusion.active() && !occlusion.is_same_sensor(&extrinsics) {
                    let direction = occlusion.find_scanning_direction(&extrinsics);
                    occlusion.set_scanning(direction);
                    occlusion.set_depth_units(depth_units);
                    let removed = occlusion.process(vertices, texcoords, &self.pixels);
                    occlusion.record_extrinsics(extrinsics);
                    if removed > 0 {
                        trace!(removed, "occluded texels invalidated");
                        metrics::counter!("depthflow_occluded_texels_total")
                            .increment(removed as u64);
                    }
                }
            }
        }

        metrics::counter!("depthflow_points_produced_total").increment(count as u64);
        Ok(output)
    }
}

impl FrameProcessor for PointCloudProcessor {
    fn should_process(&self, frame: &FrameRef) -> bool {
        if frame.is_composite() {
            let filter = *self.shared.filter.lock();
            // Composites are useful only with a concrete texture target.
            if filter.kind == StreamKind::Any {
                return false;
            }
            let has_texture = frame.frames().iter().any(|f| filter.matches_frame(f));
            has_texture && frame.first(StreamKind::Depth, PixelFormat::Z16).is_some()
        } else if frame.is_depth() {
            true
        } else {
            self.shared.filter.lock().matches_frame(frame)
        }
    }

    fn process_frame(
        &mut self,
        allocator: &dyn FrameAllocator,
        frame: &FrameRef,
    ) -> Result<Vec<Frame>, PipelineError> {
        if frame.is_composite() {
            let filter = *self.shared.filter.lock();
            let texture = frame
                .frames()
                .iter()
                .find(|f| filter.matches_frame(f))
                .cloned();
            if let Some(texture) = texture {
                self.inspect_texture_frame(&texture);
            }

            let depth = frame
                .first(StreamKind::Depth, PixelFormat::Z16)
                .cloned()
                .ok_or_else(|| PipelineError::frame_mismatch("composite without depth frame"))?;
            self.inspect_depth_frame(&depth);
            Ok(vec![self.process_depth_frame(allocator, &depth)?])
        } else if frame.is_depth() {
            self.inspect_depth_frame(frame);
            Ok(vec![self.process_depth_frame(allocator, frame)?])
        } else {
            // Bare texture frame: refresh calibration, nothing to deliver
            // until the next depth frame arrives.
            self.inspect_texture_frame(frame);
            Ok(Vec::new())
        }
    }
}

/// The public point-cloud stage.
pub struct PointCloud {
    block: ProcessingBlock,
    shared: Arc<Shared>,
}

impl PointCloud {
    pub fn new(allocator: Arc<dyn FrameAllocator>, graph: Arc<dyn ExtrinsicsGraph>) -> Self {
        let shared = Arc::new(Shared {
            filter: Mutex::new(StreamFilter::any()),
            calibration: Mutex::new(CalibrationState {
                depth_units: DEFAULT_DEPTH_UNITS,
                ..Default::default()
            }),
            occlusion: Mutex::new(OcclusionFilter::new()),
        });

        let processor = PointCloudProcessor {
            graph,
            shared: shared.clone(),
            pixels: Vec::new(),
            listener_registered: false,
        };

        Self {
            block: ProcessingBlock::new("Pointcloud", allocator, Box::new(processor)),
            shared,
        }
    }

    /// Select the texture stream to map points onto.
    pub fn map_to(&self, filter: StreamFilter) {
        *self.shared.filter.lock() = filter;
    }

    /// Feed a frame (depth, texture, or depth+texture composite).
    pub fn invoke(&self, frame: FrameRef) {
        self.block.invoke(frame);
    }

    pub fn set_output_callback(&self, callback: FrameCallback) {
        self.block.set_output_callback(callback);
    }

    /// Underlying block (name, metrics).
    pub fn block(&self) -> &ProcessingBlock {
        &self.block
    }

    /// Numeric occlusion-mode entry point: 0 = off, 1 = monotonic scan.
    /// Out-of-range selections are rejected.
    pub fn set_occlusion_option(&self, value: f32) -> Result<(), PipelineError> {
        set_occlusion_value(&self.shared, value)
    }

    pub fn occlusion_mode(&self) -> OcclusionMode {
        self.shared.occlusion.lock().mode()
    }

    /// The occlusion mode as a [`DeviceOption`], registrable with the
    /// options watcher.
    pub fn occlusion_option(&self) -> Arc<dyn DeviceOption> {
        Arc::new(OcclusionOption {
            shared: self.shared.clone(),
        })
    }
}

fn set_occlusion_value(shared: &Shared, value: f32) -> Result<(), PipelineError> {
    let mode = if value == 0.0 {
        OcclusionMode::Off
    } else if value == 1.0 {
        OcclusionMode::MonotonicScan
    } else {
        return Err(PipelineError::invalid_value("occlusion removal mode", value));
    };
    shared.occlusion.lock().set_mode(mode);
    Ok(())
}

/// Occlusion mode exposed through the option surface.
struct OcclusionOption {
    shared: Arc<Shared>,
}

impl DeviceOption for OcclusionOption {
    fn query(&self) -> Result<f32, PipelineError> {
        Ok(match self.shared.occlusion.lock().mode() {
            OcclusionMode::Off => 0.0,
            OcclusionMode::MonotonicScan => 1.0,
        })
    }

    fn set(&self, value: f32) -> Result<(), PipelineError> {
        set_occlusion_value(&self.shared, value)
    }

    fn range(&self) -> OptionRange {
        OptionRange {
            min: 0.0,
            max: 1.0,
            step: 1.0,
            default: 0.0,
        }
    }

    fn description(&self) -> &str {
        "Occlusion removal"
    }
}
