//! Synthetic depth camera.
//!
//! Generates depth + color composites of a flat plane at a fixed distance
//! on a background thread, delivering them through a [`FrameCallback`].
//! Start is idempotent; stop flips the shared flag and the thread winds
//! down on its next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use contracts::{
    Extrinsics, Frame, FrameCallback, Intrinsics, PixelFormat, SensorHandle, SourceConfig,
    StreamKind, StreamProfile,
};
use tracing::{debug, trace};

use crate::device::{SyntheticDevice, SyntheticSensor};
use crate::graph::StaticExtrinsicsGraph;

/// Synthetic camera configuration
#[derive(Debug, Clone)]
pub struct SyntheticCameraConfig {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Frame rate (Hz)
    pub fps: u32,
    /// Meters per raw depth unit
    pub depth_units: f32,
    /// Distance of the synthetic plane, meters
    pub plane_depth_m: f32,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            depth_units: 0.001,
            plane_depth_m: 1.0,
        }
    }
}

impl From<SourceConfig> for SyntheticCameraConfig {
    fn from(config: SourceConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            fps: config.fps,
            depth_units: config.depth_units,
            plane_depth_m: config.plane_depth_m,
        }
    }
}

/// Background-thread frame source producing depth + color composites.
///
/// Depth and color sensors are coincident (identity extrinsics, same
/// intrinsics), so a correct pipeline maps every valid point's texture
/// coordinate to its own normalized pixel coordinate.
pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
    device: Arc<SyntheticDevice>,
    depth_sensor: Arc<SyntheticSensor>,
    color_sensor: Arc<SyntheticSensor>,
    depth_profile: StreamProfile,
    color_profile: StreamProfile,
    running: Arc<AtomicBool>,
}

impl SyntheticCamera {
    /// Build a camera and register its depth→color extrinsics in `graph`.
    pub fn new(config: SyntheticCameraConfig, graph: &StaticExtrinsicsGraph) -> Self {
        let intrinsics = Intrinsics::pinhole(
            config.width,
            config.height,
            config.width as f32 * 0.92,
            config.width as f32 * 0.92,
            config.width as f32 / 2.0,
            config.height as f32 / 2.0,
        );

        let depth_profile = StreamProfile::video(
            StreamKind::Depth,
            PixelFormat::Z16,
            0,
            config.width,
            config.height,
            config.fps,
        )
        .with_intrinsics(intrinsics);

        let color_profile = StreamProfile::video(
            StreamKind::Color,
            PixelFormat::Rgb8,
            0,
            config.width,
            config.height,
            config.fps,
        )
        .with_intrinsics(intrinsics);

        graph.register(&depth_profile, &color_profile, Extrinsics::IDENTITY);

        let device = SyntheticDevice::new();
        let depth_sensor = device.add_sensor("Synthetic Depth Sensor", Some(config.depth_units));
        let color_sensor = device.add_sensor("Synthetic RGB Sensor", None);
        depth_sensor.set_active_streams(vec![depth_profile.clone()]);
        color_sensor.set_active_streams(vec![color_profile.clone()]);

        Self {
            config,
            device,
            depth_sensor,
            color_sensor,
            depth_profile,
            color_profile,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Owning device, e.g. to trigger calibration notifications in tests.
    pub fn device(&self) -> Arc<SyntheticDevice> {
        self.device.clone()
    }

    pub fn depth_profile(&self) -> &StreamProfile {
        &self.depth_profile
    }

    pub fn color_profile(&self) -> &StreamProfile {
        &self.color_profile
    }

    /// Build one depth+color composite without the background thread.
    pub fn capture_frame(&self, frame_number: u64) -> Frame {
        let timestamp = frame_number as f64 / self.config.fps as f64;
        let raw_depth = (self.config.plane_depth_m / self.config.depth_units).round() as u16;

        let pixel_count = self.depth_profile.pixel_count();
        let mut depth_data = BytesMut::with_capacity(pixel_count * 2);
        for _ in 0..pixel_count {
            depth_data.extend_from_slice(&raw_depth.to_le_bytes());
        }
        let depth = Frame::video(
            self.depth_profile.clone(),
            timestamp,
            frame_number,
            Some(self.depth_sensor.clone() as Arc<dyn SensorHandle>),
            2,
            depth_data,
        );

        let mut color_data = BytesMut::with_capacity(pixel_count * 3);
        for y in 0..self.config.height {
            for x in 0..self.config.width {
                // Horizontal/vertical gradients make mapping errors visible.
                color_data.extend_from_slice(&[
                    (x * 255 / self.config.width.max(1)) as u8,
                    (y * 255 / self.config.height.max(1)) as u8,
                    128,
                ]);
            }
        }
        let color = Frame::video(
            self.color_profile.clone(),
            timestamp,
            frame_number,
            Some(self.color_sensor.clone() as Arc<dyn SensorHandle>),
            3,
            color_data,
        );

        Frame::composite(vec![Arc::new(depth), Arc::new(color)])
    }

    /// Start producing frames. Idempotent: a second call while running is
    /// ignored.
    pub fn start(&self, callback: FrameCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let running = self.running.clone();
        let interval = Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64);
        let camera = self.clone_for_thread();

        thread::spawn(move || {
            let mut frame_number: u64 = 0;
            debug!(
                width = camera.config.width,
                height = camera.config.height,
                fps = camera.config.fps,
                "synthetic camera started"
            );

            while running.load(Ordering::Relaxed) {
                frame_number += 1;
                let frame = camera.capture_frame(frame_number);
                callback(Arc::new(frame));
                trace!(frame_number, "synthetic composite delivered");
                thread::sleep(interval);
            }

            debug!("synthetic camera stopped");
        });
    }

    /// Stop the background thread.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn clone_for_thread(&self) -> Self {
        Self {
            config: self.config.clone(),
            device: self.device.clone(),
            depth_sensor: self.depth_sensor.clone(),
            color_sensor: self.color_sensor.clone(),
            depth_profile: self.depth_profile.clone(),
            color_profile: self.color_profile.clone(),
            running: self.running.clone(),
        }
    }
}
