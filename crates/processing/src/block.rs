//! ProcessingBlock - the stage execution model.
//!
//! A block owns an output callback slot and a reference to the frame
//! allocator. `invoke` is the single entry point: it runs the decide /
//! transform / finalize skeleton synchronously on the caller's thread and
//! delivers at most one output frame per call.

use std::sync::Arc;

use contracts::{FrameAllocator, FrameCallback, FrameRef, PipelineError};
use parking_lot::Mutex;
use tracing::{error, trace};

use crate::metrics::ProcessingMetrics;

/// Stage-specific hooks driven by [`ProcessingBlock::invoke`].
///
/// The skeleton stays fixed; concrete stages override only the hooks
/// relevant to their behavior:
/// - `should_process` isolates gating policy; streams unrelated to the
///   stage cost only this predicate
/// - `process_frame` is the numerically heavy transform; an empty result
///   means "nothing to deliver yet" (used by stages that buffer until a
///   depth+texture pair is available)
/// - `prepare_output` shapes delivery; the default bundles multiple
///   results into one composite and passes a single result through
pub trait FrameProcessor: Send {
    /// Stateless-per-call gate; false drops the frame silently.
    fn should_process(&self, frame: &FrameRef) -> bool;

    /// Transform an accepted frame into zero or more output frames.
    fn process_frame(
        &mut self,
        allocator: &dyn FrameAllocator,
        frame: &FrameRef,
    ) -> Result<Vec<contracts::Frame>, PipelineError>;

    /// Shape the results for delivery.
    fn prepare_output(
        &mut self,
        allocator: &dyn FrameAllocator,
        _input: &FrameRef,
        results: Vec<FrameRef>,
    ) -> Result<Option<FrameRef>, PipelineError> {
        match results.len() {
            0 => Ok(None),
            1 => Ok(results.into_iter().next()),
            _ => Ok(Some(Arc::new(allocator.allocate_composite(results)?))),
        }
    }
}

/// A single processing stage.
///
/// `invoke` serializes transforms internally, so one block instance runs
/// at most one transformation at a time; independent instances run
/// independently. The output callback is guarded by its own lock and can
/// be swapped at any time without affecting frames already in flight.
pub struct ProcessingBlock {
    name: String,
    allocator: Arc<dyn FrameAllocator>,
    callback: Mutex<Option<FrameCallback>>,
    processor: Mutex<Box<dyn FrameProcessor>>,
    metrics: Arc<ProcessingMetrics>,
}

impl ProcessingBlock {
    /// Create a block around a processor implementation.
    pub fn new(
        name: impl Into<String>,
        allocator: Arc<dyn FrameAllocator>,
        processor: Box<dyn FrameProcessor>,
    ) -> Self {
        Self {
            name: name.into(),
            allocator,
            callback: Mutex::new(None),
            processor: Mutex::new(processor),
            metrics: Arc::new(ProcessingMetrics::new()),
        }
    }

    /// Block display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocator backing this block.
    pub fn allocator(&self) -> &Arc<dyn FrameAllocator> {
        &self.allocator
    }

    /// Per-block counters.
    pub fn metrics(&self) -> Arc<ProcessingMetrics> {
        self.metrics.clone()
    }

    /// Replace the delivery callback. Frames already in flight keep the
    /// callback they were delivered with.
    pub fn set_output_callback(&self, callback: FrameCallback) {
        *self.callback.lock() = Some(callback);
    }

    /// Remove the delivery callback; subsequent results are discarded.
    pub fn clear_output_callback(&self) {
        *self.callback.lock() = None;
    }

    /// Feed one frame into the stage.
    ///
    /// Runs to completion synchronously. A failed transform is reported and
    /// counted but never fatal to the block; the next `invoke` proceeds
    /// normally.
    pub fn invoke(&self, frame: FrameRef) {
        self.metrics.record_in();
        metrics::counter!("depthflow_frames_in_total", "block" => self.name.clone()).increment(1);

        let output = {
            let mut processor = self.processor.lock();

            if !processor.should_process(&frame) {
                trace!(block = %self.name, profile = ?frame.profile(), "frame rejected by gate");
                self.metrics.record_dropped();
                return;
            }

            let results = match processor.process_frame(self.allocator.as_ref(), &frame) {
                Ok(results) => results,
                Err(e) => {
                    self.metrics.record_error();
                    metrics::counter!("depthflow_transform_errors_total", "block" => self.name.clone())
                        .increment(1);
                    error!(block = %self.name, error = %e, "transform failed, no output delivered");
                    return;
                }
            };

            let results: Vec<FrameRef> = results.into_iter().map(Arc::new).collect();

            match processor.prepare_output(self.allocator.as_ref(), &frame, results) {
                Ok(output) => output,
                Err(e) => {
                    self.metrics.record_error();
                    error!(block = %self.name, error = %e, "output preparation failed");
                    return;
                }
            }
        };
        // Transform lock released: delivery may re-enter a downstream
        // block without holding this stage's serialization lock.

        let Some(output) = output else {
            trace!(block = %self.name, "no output this invocation");
            self.metrics.record_dropped();
            return;
        };

        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => {
                self.metrics.record_out();
                metrics::counter!("depthflow_frames_out_total", "block" => self.name.clone())
                    .increment(1);
                callback(output);
            }
            None => {
                trace!(block = %self.name, "no output callback set, frame discarded");
                self.metrics.record_dropped();
            }
        }
    }
}

impl Drop for ProcessingBlock {
    fn drop(&mut self) {
        // Stop granting allocations so mid-flight frames can drain.
        self.allocator.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{video_frame, TestAllocator};
    use contracts::{Frame, PixelFormat, StreamKind};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Passthrough processor copying the input buffer.
    struct Passthrough {
        fail: bool,
    }

    impl FrameProcessor for Passthrough {
        fn should_process(&self, frame: &FrameRef) -> bool {
            frame.is_depth()
        }

        fn process_frame(
            &mut self,
            allocator: &dyn FrameAllocator,
            frame: &FrameRef,
        ) -> Result<Vec<Frame>, PipelineError> {
            if self.fail {
                return Err(PipelineError::frame_mismatch("induced failure"));
            }
            let out = allocator.allocate_video_frame(frame.profile().clone(), frame, None)?;
            Ok(vec![out])
        }
    }

    fn depth_frame() -> FrameRef {
        video_frame(StreamKind::Depth, PixelFormat::Z16, 0, 8, 8)
    }

    fn color_frame() -> FrameRef {
        video_frame(StreamKind::Color, PixelFormat::Rgb8, 0, 8, 8)
    }

    #[test]
    fn test_invoke_delivers_to_callback() {
        let block = ProcessingBlock::new(
            "passthrough",
            Arc::new(TestAllocator::new()),
            Box::new(Passthrough { fail: false }),
        );

        let delivered = Arc::new(AtomicU64::new(0));
        let delivered_clone = delivered.clone();
        block.set_output_callback(Arc::new(move |frame| {
            assert!(frame.is_depth());
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        }));

        block.invoke(depth_frame());
        block.invoke(depth_frame());

        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        assert_eq!(block.metrics().snapshot().frames_out, 2);
    }

    #[test]
    fn test_gate_rejects_silently() {
        let block = ProcessingBlock::new(
            "passthrough",
            Arc::new(TestAllocator::new()),
            Box::new(Passthrough { fail: false }),
        );

        let delivered = Arc::new(AtomicU64::new(0));
        let delivered_clone = delivered.clone();
        block.set_output_callback(Arc::new(move |_| {
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        }));

        block.invoke(color_frame());

        assert_eq!(delivered.load(Ordering::SeqCst), 0);
        let snapshot = block.metrics().snapshot();
        assert_eq!(snapshot.frames_dropped, 1);
        assert_eq!(snapshot.transform_errors, 0);
    }

    #[test]
    fn test_no_callback_discards_output() {
        let block = ProcessingBlock::new(
            "passthrough",
            Arc::new(TestAllocator::new()),
            Box::new(Passthrough { fail: false }),
        );

        // No callback set; invoke must not panic and must count a drop.
        block.invoke(depth_frame());
        assert_eq!(block.metrics().snapshot().frames_dropped, 1);
    }

    #[test]
    fn test_transform_failure_is_not_fatal() {
        let allocator = Arc::new(TestAllocator::new());
        let block = ProcessingBlock::new(
            "failing",
            allocator.clone(),
            Box::new(Passthrough { fail: true }),
        );

        let delivered = Arc::new(AtomicU64::new(0));
        let delivered_clone = delivered.clone();
        block.set_output_callback(Arc::new(move |_| {
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        }));

        block.invoke(depth_frame());
        block.invoke(depth_frame());

        assert_eq!(delivered.load(Ordering::SeqCst), 0);
        assert_eq!(block.metrics().snapshot().transform_errors, 2);
    }

    #[test]
    fn test_drop_flushes_allocator() {
        let allocator = Arc::new(TestAllocator::new());
        {
            let _block = ProcessingBlock::new(
                "short-lived",
                allocator.clone(),
                Box::new(Passthrough { fail: false }),
            );
        }
        assert!(allocator.flushed());
    }

    #[test]
    fn test_callback_swap_during_stream() {
        let block = ProcessingBlock::new(
            "passthrough",
            Arc::new(TestAllocator::new()),
            Box::new(Passthrough { fail: false }),
        );

        let first = Arc::new(AtomicU64::new(0));
        let second = Arc::new(AtomicU64::new(0));

        let first_clone = first.clone();
        block.set_output_callback(Arc::new(move |_| {
            first_clone.fetch_add(1, Ordering::SeqCst);
        }));
        block.invoke(depth_frame());

        let second_clone = second.clone();
        block.set_output_callback(Arc::new(move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        }));
        block.invoke(depth_frame());

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
