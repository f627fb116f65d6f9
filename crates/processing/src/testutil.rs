//! Shared test fixtures for this crate's unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use contracts::{Frame, FrameAllocator, FrameRef, PipelineError, PixelFormat, StreamKind, StreamProfile};

/// Allocator stub handing out plain frames and recording flush.
pub(crate) struct TestAllocator {
    flushed: AtomicBool,
    allocations: AtomicU64,
}

impl TestAllocator {
    pub(crate) fn new() -> Self {
        Self {
            flushed: AtomicBool::new(false),
            allocations: AtomicU64::new(0),
        }
    }

    pub(crate) fn flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }

    pub(crate) fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.flushed() {
            return Err(PipelineError::allocation("allocator flushed"));
        }
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl FrameAllocator for TestAllocator {
    fn allocate_video_frame(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
        bpp_override: Option<usize>,
    ) -> Result<Frame, PipelineError> {
        self.check()?;
        let bpp = bpp_override.unwrap_or_else(|| profile.format.bytes_per_pixel());
        let size = profile.pixel_count() * bpp;
        Ok(Frame::video(
            profile,
            original.timestamp(),
            original.frame_number(),
            None,
            bpp,
            BytesMut::zeroed(size),
        ))
    }

    fn allocate_motion_frame(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
    ) -> Result<Frame, PipelineError> {
        self.check()?;
        Ok(Frame::motion(
            profile,
            original.timestamp(),
            original.frame_number(),
            None,
            [0.0; 3],
        ))
    }

    fn allocate_points(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
    ) -> Result<Frame, PipelineError> {
        self.check()?;
        Ok(Frame::points(
            profile,
            original.timestamp(),
            original.frame_number(),
            None,
        ))
    }

    fn allocate_composite(&self, frames: Vec<FrameRef>) -> Result<Frame, PipelineError> {
        self.check()?;
        Ok(Frame::composite(frames))
    }

    fn flush(&self) {
        self.flushed.store(true, Ordering::SeqCst);
    }
}

/// Zeroed video frame with the given shape.
pub(crate) fn video_frame(kind: StreamKind, format: PixelFormat, index: i32, width: u32, height: u32) -> FrameRef {
    let bpp = format.bytes_per_pixel();
    let profile = StreamProfile::video(kind, format, index, width, height, 30);
    let size = profile.pixel_count() * bpp;
    Arc::new(Frame::video(profile, 0.0, 1, None, bpp, BytesMut::zeroed(size)))
}

/// Video frame with caller-supplied pixel bytes.
pub(crate) fn video_frame_with_data(
    kind: StreamKind,
    format: PixelFormat,
    width: u32,
    height: u32,
    data: &[u8],
) -> FrameRef {
    let bpp = format.bytes_per_pixel();
    let profile = StreamProfile::video(kind, format, 0, width, height, 30);
    Arc::new(Frame::video(
        profile,
        0.0,
        1,
        None,
        bpp,
        BytesMut::from(data),
    ))
}
