//! FrameAllocator - the frame memory pool boundary.
//!
//! Processing stages never construct output frames directly; they request
//! them here. The pooling strategy behind an implementation is opaque:
//! allocation either succeeds or signals a resource error.

use crate::{Frame, FrameRef, PipelineError, StreamProfile};

/// Supplies output frames to processing stages.
pub trait FrameAllocator: Send + Sync {
    /// New video frame sized per `profile`, carrying over timestamp,
    /// frame number and sensor from `original`. `bpp_override` replaces
    /// the profile format's natural bytes-per-pixel when given.
    fn allocate_video_frame(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
        bpp_override: Option<usize>,
    ) -> Result<Frame, PipelineError>;

    /// New motion frame carrying over metadata from `original`.
    fn allocate_motion_frame(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
    ) -> Result<Frame, PipelineError>;

    /// New point-cloud frame with zeroed vertex/texcoord buffers sized per
    /// `profile`.
    fn allocate_points(
        &self,
        profile: StreamProfile,
        original: &FrameRef,
    ) -> Result<Frame, PipelineError>;

    /// Bundle already-produced frames into one composite.
    fn allocate_composite(&self, frames: Vec<FrameRef>) -> Result<Frame, PipelineError>;

    /// Stop granting allocations so in-flight frames can drain. Called on
    /// stage destruction; must not block on in-progress transforms.
    fn flush(&self);
}
