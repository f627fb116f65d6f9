//! # Contracts
//!
//! Frozen interface contracts (ICD), defining the data structures and traits
//! shared by the pipeline crates. All business crates can only depend on this
//! crate, reverse dependencies are prohibited.
//!
//! ## Frame Model
//! - Frames are immutable once produced: a stage fills an owned [`Frame`],
//!   then wraps it in an `Arc` ([`FrameRef`]) for delivery
//! - Timestamps are sensor clock seconds (f64); `frame_number` is used for
//!   ordering/diagnostics

mod calibration;
mod config;
mod device;
mod error;
mod filter;
mod frame;
mod option;
mod source;
mod stream;

pub use calibration::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use filter::StreamFilter;
pub use frame::*;
pub use option::*;
pub use source::FrameAllocator;
pub use stream::*;
