//! Sensor and device handles - the hardware-facing boundary.
//!
//! The pipeline never talks to a transport; it only consumes these traits.
//! Real devices and the synthetic test devices implement the same API.

use std::sync::Arc;

use crate::StreamProfile;

/// On-sensor calibration outcome reported to registered listeners.
///
/// Only `Successful` is acted on by the pipeline; other statuses are left
/// to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    Started,
    Successful,
    Failed,
}

/// Calibration-change callback.
pub type CalibrationListener = Arc<dyn Fn(CalibrationStatus) + Send + Sync>;

/// Handle to the sensor that produced a frame.
pub trait SensorHandle: Send + Sync {
    /// Sensor display name
    fn name(&self) -> &str;

    /// Meters per raw depth unit, for depth-capable sensors
    fn depth_units(&self) -> Option<f32>;

    /// Profiles currently streaming on this sensor
    fn active_streams(&self) -> Vec<StreamProfile>;

    /// Owning device, when still alive
    fn device(&self) -> Option<Arc<dyn DeviceHandle>>;
}

/// Handle to a device owning one or more sensors.
pub trait DeviceHandle: Send + Sync {
    /// All sensors of this device
    fn sensors(&self) -> Vec<Arc<dyn SensorHandle>>;

    /// Register a calibration-change listener.
    ///
    /// Returns false when the device does not support calibration-change
    /// notification; the listener is dropped in that case.
    fn register_calibration_listener(&self, listener: CalibrationListener) -> bool;
}
