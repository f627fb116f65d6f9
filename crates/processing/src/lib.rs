//! # Processing
//!
//! Frame processing-block execution model.
//!
//! Responsibilities:
//! - Drive frames through a stage: gate (`should_process`), transform
//!   (`process_frame`), shape output (`prepare_output`), deliver
//! - Format-conversion stages (unpack / de-interleave pixel data)
//! - Frame queue adapter for pull-based consumers
//!
//! ## Usage Example
//!
//! ```ignore
//! use processing::blocks::y16i_to_y16y16;
//!
//! let block = y16i_to_y16y16(allocator, 1, 2);
//! block.set_output_callback(Arc::new(|frame| {
//!     // left/right composite arrives here
//! }));
//! block.invoke(raw_frame);
//! ```

mod block;
mod error;
mod functional;
mod metrics;
mod queue;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports
pub use block::{FrameProcessor, ProcessingBlock};
pub use error::{ProcessingError, Result};
pub use functional::{
    expand_10msb, split_y16y16_from_y16i, unpack_y16_from_y16_10msb, y16_10msb_to_y16,
    y16i_to_y16y16, FunctionalProcessor, InterleavedProcessor, InterleavedTarget, PixelKernel,
    SplitKernel,
};
pub use metrics::{MetricsSnapshot, ProcessingMetrics};
pub use queue::FrameQueue;
