//! Layered error definitions
//!
//! Categorized by source: config / value / option / allocation / calibration

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum PipelineError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Value Errors =====
    /// A supplied value is outside its accepted range
    #[error("invalid value for {what}: {value}")]
    InvalidValue { what: String, value: f32 },

    // ===== Option Errors =====
    /// An option could not be queried right now (e.g. requires streaming)
    #[error("option query failed: {message}")]
    OptionQuery { message: String },

    /// An option could not be written
    #[error("option set failed: {message}")]
    OptionSet { message: String },

    // ===== Frame / Allocation Errors =====
    /// The allocator refused or failed an allocation
    #[error("frame allocation failed: {message}")]
    Allocation { message: String },

    /// A frame did not carry the payload a stage expected
    #[error("unexpected frame payload: {message}")]
    FrameMismatch { message: String },

    // ===== Calibration Errors =====
    /// Extrinsics/intrinsics unavailable for a stream pair
    #[error("calibration unavailable between '{from}' and '{to}'")]
    CalibrationUnavailable { from: String, to: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create value error
    pub fn invalid_value(what: impl Into<String>, value: f32) -> Self {
        Self::InvalidValue {
            what: what.into(),
            value,
        }
    }

    /// Create transient option query error
    pub fn option_query(message: impl Into<String>) -> Self {
        Self::OptionQuery {
            message: message.into(),
        }
    }

    /// Create allocation error
    pub fn allocation(message: impl Into<String>) -> Self {
        Self::Allocation {
            message: message.into(),
        }
    }

    /// Create frame mismatch error
    pub fn frame_mismatch(message: impl Into<String>) -> Self {
        Self::FrameMismatch {
            message: message.into(),
        }
    }
}
