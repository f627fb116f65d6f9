//! Processing error types

use thiserror::Error;

/// Processing-stage error
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// A transform failed mid-frame
    #[error("transform failed in block '{block}': {message}")]
    TransformFailed {
        /// Block name
        block: String,
        /// Error message
        message: String,
    },

    /// The frame queue is closed and drained
    #[error("frame queue closed")]
    QueueClosed,

    /// Contract-level failure (allocation, frame shape, calibration)
    #[error(transparent)]
    Contract(#[from] contracts::PipelineError),
}

/// Processing Result type alias
pub type Result<T> = std::result::Result<T, ProcessingError>;
