//! Format-conversion stages.
//!
//! A functional stage unpacks pixel data into one destination stream; an
//! interleaved-functional stage splits one source buffer into two
//! destination streams (e.g. left/right infrared). Destination profiles
//! are derived from the source profile once and cached until the source
//! profile changes.

use std::sync::Arc;

use contracts::{
    Frame, FrameAllocator, FrameRef, PipelineError, PixelFormat, StreamFilter, StreamKind,
    StreamProfile,
};

use crate::block::{FrameProcessor, ProcessingBlock};

/// Pixel kernel of a functional stage: (dest, source, width, height).
pub type PixelKernel = fn(&mut [u8], &[u8], usize, usize);

/// Pixel kernel of an interleaved stage: (left, right, source, width, height).
pub type SplitKernel = fn(&mut [u8], &mut [u8], &[u8], usize, usize);

/// Expand a 10-bit sample to 16 bits.
///
/// The range moves from [0 : 2^10-1] to [0 : 2^16-1], i.e. a multiply by
/// 65535/1023 ≈ 64 + 1/16, done as `x << 6 | x >> 4` to avoid a division
/// at a bounded quantization cost.
#[inline]
pub fn expand_10msb(sample: u16) -> u16 {
    sample << 6 | sample >> 4
}

/// Unpack 10-bit-in-16 luminance into full-scale Y16.
pub fn unpack_y16_from_y16_10msb(dest: &mut [u8], source: &[u8], width: usize, height: usize) {
    let count = width * height;
    for i in 0..count {
        let raw = u16::from_le_bytes([source[2 * i], source[2 * i + 1]]);
        let expanded = expand_10msb(raw);
        dest[2 * i..2 * i + 2].copy_from_slice(&expanded.to_le_bytes());
    }
}

/// De-interleave Y16I stereo pixels into two full-scale Y16 planes.
pub fn split_y16y16_from_y16i(
    left: &mut [u8],
    right: &mut [u8],
    source: &[u8],
    width: usize,
    height: usize,
) {
    let count = width * height;
    for i in 0..count {
        let l = u16::from_le_bytes([source[4 * i], source[4 * i + 1]]);
        let r = u16::from_le_bytes([source[4 * i + 2], source[4 * i + 3]]);
        left[2 * i..2 * i + 2].copy_from_slice(&expand_10msb(l).to_le_bytes());
        right[2 * i..2 * i + 2].copy_from_slice(&expand_10msb(r).to_le_bytes());
    }
}

/// Single-destination format conversion.
pub struct FunctionalProcessor {
    filter: StreamFilter,
    target_kind: StreamKind,
    target_format: PixelFormat,
    kernel: PixelKernel,
    source_profile: Option<StreamProfile>,
    target_profile: Option<StreamProfile>,
}

impl FunctionalProcessor {
    pub fn new(
        filter: StreamFilter,
        target_kind: StreamKind,
        target_format: PixelFormat,
        kernel: PixelKernel,
    ) -> Self {
        Self {
            filter,
            target_kind,
            target_format,
            kernel,
            source_profile: None,
            target_profile: None,
        }
    }

    /// Recompute the cached destination profile when the source changes.
    fn target_profile(&mut self, frame: &FrameRef) -> StreamProfile {
        match &self.target_profile {
            Some(target) if self.source_profile.as_ref() == Some(frame.profile()) => target.clone(),
            _ => {
                let source = frame.profile().clone();
                let kind = match self.target_kind {
                    StreamKind::Any => source.kind,
                    kind => kind,
                };
                let target = source.derive(kind, self.target_format);
                self.target_profile = Some(target.clone());
                self.source_profile = Some(source);
                target
            }
        }
    }
}

impl FrameProcessor for FunctionalProcessor {
    fn should_process(&self, frame: &FrameRef) -> bool {
        !frame.is_composite() && self.filter.matches_frame(frame)
    }

    fn process_frame(
        &mut self,
        allocator: &dyn FrameAllocator,
        frame: &FrameRef,
    ) -> Result<Vec<Frame>, PipelineError> {
        let target = self.target_profile(frame);
        let width = target.width as usize;
        let height = target.height as usize;

        let source = frame
            .video_data()
            .ok_or_else(|| PipelineError::frame_mismatch("functional stage expects video data"))?;

        let mut out = allocator.allocate_video_frame(target, frame, None)?;
        {
            let dest = out
                .video_data_mut()
                .ok_or_else(|| PipelineError::frame_mismatch("allocated frame is not video"))?;
            (self.kernel)(dest, source, width, height);
        }
        Ok(vec![out])
    }
}

/// Destination of one plane of an interleaved conversion.
#[derive(Debug, Clone, Copy)]
pub struct InterleavedTarget {
    pub kind: StreamKind,
    pub format: PixelFormat,
    pub index: i32,
}

/// Two-destination de-interleaving conversion.
///
/// Produces two result frames per input; the default `prepare_output`
/// bundles them into a composite.
pub struct InterleavedProcessor {
    source_format: PixelFormat,
    left: InterleavedTarget,
    right: InterleavedTarget,
    kernel: SplitKernel,
    source_profile: Option<StreamProfile>,
    left_profile: Option<StreamProfile>,
    right_profile: Option<StreamProfile>,
}

impl InterleavedProcessor {
    pub fn new(
        source_format: PixelFormat,
        left: InterleavedTarget,
        right: InterleavedTarget,
        kernel: SplitKernel,
    ) -> Self {
        Self {
            source_format,
            left,
            right,
            kernel,
            source_profile: None,
            left_profile: None,
            right_profile: None,
        }
    }

    fn ensure_profiles(&mut self, frame: &FrameRef) -> (StreamProfile, StreamProfile) {
        match (&self.left_profile, &self.right_profile) {
            (Some(left), Some(right)) if self.source_profile.as_ref() == Some(frame.profile()) => {
                (left.clone(), right.clone())
            }
            _ => {
                let source = frame.profile().clone();
                let mut left = source.derive(self.left.kind, self.left.format);
                left.index = self.left.index;
                let mut right = source.derive(self.right.kind, self.right.format);
                right.index = self.right.index;
                self.left_profile = Some(left.clone());
                self.right_profile = Some(right.clone());
                self.source_profile = Some(source);
                (left, right)
            }
        }
    }
}

impl FrameProcessor for InterleavedProcessor {
    fn should_process(&self, frame: &FrameRef) -> bool {
        !frame.is_composite() && frame.profile().format == self.source_format
    }

    fn process_frame(
        &mut self,
        allocator: &dyn FrameAllocator,
        frame: &FrameRef,
    ) -> Result<Vec<Frame>, PipelineError> {
        let (left_profile, right_profile) = self.ensure_profiles(frame);
        let width = left_profile.width as usize;
        let height = left_profile.height as usize;

        let source = frame
            .video_data()
            .ok_or_else(|| PipelineError::frame_mismatch("interleaved stage expects video data"))?;

        let mut left = allocator.allocate_video_frame(left_profile, frame, None)?;
        let mut right = allocator.allocate_video_frame(right_profile, frame, None)?;
        {
            let left_dest = left
                .video_data_mut()
                .ok_or_else(|| PipelineError::frame_mismatch("allocated frame is not video"))?;
            let right_dest = right
                .video_data_mut()
                .ok_or_else(|| PipelineError::frame_mismatch("allocated frame is not video"))?;
            (self.kernel)(left_dest, right_dest, source, width, height);
        }
        Ok(vec![left, right])
    }
}

/// "Y16 10msb to Y16" stage: full-scale expansion of 10-bit infrared.
pub fn y16_10msb_to_y16(allocator: Arc<dyn FrameAllocator>) -> ProcessingBlock {
    ProcessingBlock::new(
        "Y16 10msb to Y16 Converter",
        allocator,
        Box::new(FunctionalProcessor::new(
            StreamFilter::new(StreamKind::Infrared, PixelFormat::Y16, None),
            StreamKind::Infrared,
            PixelFormat::Y16,
            unpack_y16_from_y16_10msb,
        )),
    )
}

/// "Y16I to Y16L Y16R" stage: stereo de-interleave with 10-bit expansion.
pub fn y16i_to_y16y16(
    allocator: Arc<dyn FrameAllocator>,
    left_index: i32,
    right_index: i32,
) -> ProcessingBlock {
    ProcessingBlock::new(
        "Y16I to Y16L Y16R Transform",
        allocator,
        Box::new(InterleavedProcessor::new(
            PixelFormat::Y16I,
            InterleavedTarget {
                kind: StreamKind::Infrared,
                format: PixelFormat::Y16,
                index: left_index,
            },
            InterleavedTarget {
                kind: StreamKind::Infrared,
                format: PixelFormat::Y16,
                index: right_index,
            },
            split_y16y16_from_y16i,
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{video_frame_with_data, TestAllocator};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_expand_10msb_documented_value() {
        // (512 << 6) | (512 >> 4) = 32768 | 32
        assert_eq!(expand_10msb(512), 32800);
        assert_eq!(expand_10msb(0), 0);
        assert_eq!(expand_10msb(1023), 0xFFFF);
    }

    #[test]
    fn test_unpack_kernel() {
        let source: Vec<u8> = [512u16, 0, 1023]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let mut dest = vec![0u8; 6];
        unpack_y16_from_y16_10msb(&mut dest, &source, 3, 1);

        let out: Vec<u16> = dest
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(out, vec![32800, 0, 0xFFFF]);
    }

    #[test]
    fn test_split_kernel() {
        // One pixel: left = 512, right = 1023
        let mut source = Vec::new();
        source.extend_from_slice(&512u16.to_le_bytes());
        source.extend_from_slice(&1023u16.to_le_bytes());

        let mut left = vec![0u8; 2];
        let mut right = vec![0u8; 2];
        split_y16y16_from_y16i(&mut left, &mut right, &source, 1, 1);

        assert_eq!(u16::from_le_bytes([left[0], left[1]]), 32800);
        assert_eq!(u16::from_le_bytes([right[0], right[1]]), 0xFFFF);
    }

    #[test]
    fn test_functional_block_end_to_end() {
        let allocator = Arc::new(TestAllocator::new());
        let block = y16_10msb_to_y16(allocator);

        let delivered = Arc::new(AtomicU64::new(0));
        let delivered_clone = delivered.clone();
        block.set_output_callback(Arc::new(move |frame| {
            let data = frame.video_data().unwrap();
            let first = u16::from_le_bytes([data[0], data[1]]);
            assert_eq!(first, 32800);
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let source: Vec<u8> = std::iter::repeat(512u16)
            .take(4)
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let frame = video_frame_with_data(StreamKind::Infrared, PixelFormat::Y16, 2, 2, &source);
        block.invoke(frame);

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interleaved_block_produces_composite() {
        let allocator = Arc::new(TestAllocator::new());
        let block = y16i_to_y16y16(allocator, 1, 2);

        let delivered = Arc::new(AtomicU64::new(0));
        let delivered_clone = delivered.clone();
        block.set_output_callback(Arc::new(move |frame| {
            assert!(frame.is_composite());
            let frames = frame.frames();
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[0].profile().index, 1);
            assert_eq!(frames[1].profile().index, 2);
            assert_eq!(frames[0].profile().format, PixelFormat::Y16);
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let mut source = Vec::new();
        for _ in 0..4 {
            source.extend_from_slice(&512u16.to_le_bytes());
            source.extend_from_slice(&100u16.to_le_bytes());
        }
        let frame = video_frame_with_data(StreamKind::Infrared, PixelFormat::Y16I, 2, 2, &source);
        block.invoke(frame);

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_profile_cache_reused_across_frames() {
        let mut processor = FunctionalProcessor::new(
            StreamFilter::new(StreamKind::Infrared, PixelFormat::Y16, None),
            StreamKind::Infrared,
            PixelFormat::Y16,
            unpack_y16_from_y16_10msb,
        );

        let frame = video_frame_with_data(StreamKind::Infrared, PixelFormat::Y16, 2, 2, &[0u8; 8]);
        let first = processor.target_profile(&frame);
        let second = processor.target_profile(&frame);
        assert_eq!(first, second);
        assert_eq!(first.width, 2);
    }
}
