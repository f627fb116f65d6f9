//! Scripted device options.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{DeviceOption, OptionRange, PipelineError};
use parking_lot::Mutex;

/// A [`DeviceOption`] over an in-memory value.
///
/// The failure switch simulates options that refuse queries while the
/// sensor is not streaming.
pub struct ScriptedOption {
    description: String,
    range: OptionRange,
    value: Mutex<f32>,
    failing: AtomicBool,
}

impl ScriptedOption {
    pub fn new(description: impl Into<String>, initial: f32, range: OptionRange) -> Self {
        Self {
            description: description.into(),
            range,
            value: Mutex::new(initial),
            failing: AtomicBool::new(false),
        }
    }

    /// Option spanning [0, 100] starting at `initial`.
    pub fn percentage(description: impl Into<String>, initial: f32) -> Self {
        Self::new(
            description,
            initial,
            OptionRange {
                min: 0.0,
                max: 100.0,
                step: 1.0,
                default: initial,
            },
        )
    }

    /// Change the value directly, bypassing range checks (scripting hook).
    pub fn set_value(&self, value: f32) {
        *self.value.lock() = value;
    }

    /// Make every `query` fail until turned off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DeviceOption for ScriptedOption {
    fn query(&self) -> Result<f32, PipelineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PipelineError::option_query("option not readable while idle"));
        }
        Ok(*self.value.lock())
    }

    fn set(&self, value: f32) -> Result<(), PipelineError> {
        if !self.range.contains(value) {
            return Err(PipelineError::invalid_value(self.description.clone(), value));
        }
        *self.value.lock() = value;
        Ok(())
    }

    fn range(&self) -> OptionRange {
        self.range
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_and_set() {
        let option = ScriptedOption::percentage("exposure", 50.0);
        assert_eq!(option.query().unwrap(), 50.0);

        option.set(75.0).unwrap();
        assert_eq!(option.query().unwrap(), 75.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let option = ScriptedOption::percentage("gain", 10.0);
        assert!(matches!(
            option.set(150.0),
            Err(PipelineError::InvalidValue { .. })
        ));
        assert_eq!(option.query().unwrap(), 10.0);
    }

    #[test]
    fn test_failure_switch() {
        let option = ScriptedOption::percentage("laser power", 1.0);
        option.set_failing(true);
        assert!(option.query().is_err());
        option.set_failing(false);
        assert_eq!(option.query().unwrap(), 1.0);
    }
}
