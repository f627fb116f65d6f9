//! Software frame allocator.
//!
//! Backs the [`FrameAllocator`] boundary with plain heap buffers. No
//! pooling; the contract only requires that allocation succeeds or signals
//! a resource error, and that `flush` stops further grants.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::BytesMut;
use contracts::{Frame, FrameAllocator, FrameRef, PipelineError, StreamProfile};
use tracing::debug;

/// Heap-backed allocator with flush semantics.
#[derive(Debug, Default)]
pub struct SoftwareAllocator {
    flushed: AtomicBool,
    allocations: AtomicU64,
}

impl SoftwareAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total successful allocations, for diagnostics and tests.
    pub fn allocation_count(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Whether `flush` has been called.
    pub fn is_flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }

    fn grant(&self) -> Result<(), PipelineError> {
        if self.is_flushed() {
            return Err(PipelineError::allocation("allocator flushed, no further frames granted"));
        }
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl FrameAllocator for SoftwareAllocator {
    fn allocate_video_frame(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
        bpp_override: Option<usize>,
    ) -> Result<Frame, PipelineError> {
        self.grant()?;
        let bpp = bpp_override.unwrap_or_else(|| profile.format.bytes_per_pixel());
        let size = profile.pixel_count() * bpp;
        Ok(Frame::video(
            profile,
            original.timestamp(),
            original.frame_number(),
            original.sensor().cloned(),
            bpp,
            BytesMut::zeroed(size),
        ))
    }

    fn allocate_motion_frame(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
    ) -> Result<Frame, PipelineError> {
        self.grant()?;
        Ok(Frame::motion(
            profile,
            original.timestamp(),
            original.frame_number(),
            original.sensor().cloned(),
            [0.0; 3],
        ))
    }

    fn allocate_points(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
    ) -> Result<Frame, PipelineError> {
        self.grant()?;
        Ok(Frame::points(
            profile,
            original.timestamp(),
            original.frame_number(),
            original.sensor().cloned(),
        ))
    }

    fn allocate_composite(&self, frames: Vec<FrameRef>) -> Result<Frame, PipelineError> {
        self.grant()?;
        Ok(Frame::composite(frames))
    }

    fn flush(&self) {
        if !self.flushed.swap(true, Ordering::SeqCst) {
            debug!(
                allocations = self.allocation_count(),
                "software allocator flushed"
            );
        }
    }
}
