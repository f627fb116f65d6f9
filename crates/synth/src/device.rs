//! Synthetic device and sensor handles.
//!
//! A device owns its sensors; sensors hold only a weak back-reference so
//! frames keeping a sensor alive never keep the whole device alive.

use std::sync::{Arc, Weak};

use contracts::{CalibrationListener, CalibrationStatus, DeviceHandle, SensorHandle, StreamProfile};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// In-memory device with calibration-change fan-out.
pub struct SyntheticDevice {
    sensors: RwLock<Vec<Arc<SyntheticSensor>>>,
    listeners: Mutex<Vec<CalibrationListener>>,
    supports_calibration: bool,
}

impl SyntheticDevice {
    /// Device that accepts calibration-change listeners.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sensors: RwLock::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            supports_calibration: true,
        })
    }

    /// Device without calibration-change support; registration returns false.
    pub fn without_calibration_support() -> Arc<Self> {
        Arc::new(Self {
            sensors: RwLock::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            supports_calibration: false,
        })
    }

    /// Create and attach a sensor.
    pub fn add_sensor(
        self: &Arc<Self>,
        name: impl Into<String>,
        depth_units: Option<f32>,
    ) -> Arc<SyntheticSensor> {
        let sensor = Arc::new(SyntheticSensor {
            name: name.into(),
            depth_units,
            active: RwLock::new(Vec::new()),
            device: Arc::downgrade(self),
        });
        self.sensors.write().push(sensor.clone());
        sensor
    }

    /// Fan a calibration status out to every registered listener.
    pub fn notify_calibration(&self, status: CalibrationStatus) {
        let listeners: Vec<CalibrationListener> = self.listeners.lock().clone();
        debug!(?status, count = listeners.len(), "notifying calibration listeners");
        for listener in listeners {
            listener(status);
        }
    }

    /// Registered listener count, for tests.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl DeviceHandle for SyntheticDevice {
    fn sensors(&self) -> Vec<Arc<dyn SensorHandle>> {
        self.sensors
            .read()
            .iter()
            .map(|s| s.clone() as Arc<dyn SensorHandle>)
            .collect()
    }

    fn register_calibration_listener(&self, listener: CalibrationListener) -> bool {
        if !self.supports_calibration {
            return false;
        }
        self.listeners.lock().push(listener);
        true
    }
}

/// In-memory sensor handle.
pub struct SyntheticSensor {
    name: String,
    depth_units: Option<f32>,
    active: RwLock<Vec<StreamProfile>>,
    device: Weak<SyntheticDevice>,
}

impl SyntheticSensor {
    /// Replace the active-stream list (what `active_streams` reports).
    pub fn set_active_streams(&self, profiles: Vec<StreamProfile>) {
        *self.active.write() = profiles;
    }
}

impl SensorHandle for SyntheticSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn depth_units(&self) -> Option<f32> {
        self.depth_units
    }

    fn active_streams(&self) -> Vec<StreamProfile> {
        self.active.read().clone()
    }

    fn device(&self) -> Option<Arc<dyn DeviceHandle>> {
        self.device
            .upgrade()
            .map(|device| device as Arc<dyn DeviceHandle>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{PixelFormat, StreamKind};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_sensor_device_backref() {
        let device = SyntheticDevice::new();
        let sensor = device.add_sensor("depth", Some(0.001));

        assert_eq!(sensor.name(), "depth");
        assert_eq!(sensor.depth_units(), Some(0.001));
        assert!(sensor.device().is_some());
        assert_eq!(device.sensors().len(), 1);

        drop(device);
        // Only the weak backref remains.
        assert!(sensor.device().is_none());
    }

    #[test]
    fn test_calibration_fan_out() {
        let device = SyntheticDevice::new();
        let hits = Arc::new(AtomicU64::new(0));

        let hits_clone = hits.clone();
        let registered = device.register_calibration_listener(Arc::new(move |status| {
            assert_eq!(status, CalibrationStatus::Successful);
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(registered);

        device.notify_calibration(CalibrationStatus::Successful);
        device.notify_calibration(CalibrationStatus::Successful);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsupported_device_rejects_listener() {
        let device = SyntheticDevice::without_calibration_support();
        let registered = device.register_calibration_listener(Arc::new(|_| {}));
        assert!(!registered);
        assert_eq!(device.listener_count(), 0);
    }

    #[test]
    fn test_active_streams() {
        let device = SyntheticDevice::new();
        let sensor = device.add_sensor("depth", Some(0.001));
        assert!(sensor.active_streams().is_empty());

        let profile = StreamProfile::video(StreamKind::Depth, PixelFormat::Z16, 0, 640, 480, 30);
        sensor.set_active_streams(vec![profile.clone()]);
        assert_eq!(sensor.active_streams(), vec![profile]);
    }
}
