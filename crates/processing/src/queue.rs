//! FrameQueue - pull-based consumer adapter.
//!
//! Bridges the push-style output callback of a [`crate::ProcessingBlock`]
//! to consumers that want to poll or block for frames. Bounded; when the
//! queue is full the incoming frame is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use contracts::{FrameCallback, FrameRef};
use tracing::trace;

use crate::error::{ProcessingError, Result};

/// Bounded frame queue.
pub struct FrameQueue {
    tx: Sender<FrameRef>,
    rx: Receiver<FrameRef>,
    dropped: Arc<AtomicU64>,
}

impl FrameQueue {
    /// Create a queue holding up to `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Produce a callback that enqueues delivered frames.
    ///
    /// Suitable for [`crate::ProcessingBlock::set_output_callback`]. A full
    /// queue drops the newest frame (backpressure without blocking the
    /// producer thread).
    pub fn make_callback(&self) -> FrameCallback {
        let tx = self.tx.clone();
        let dropped = self.dropped.clone();
        Arc::new(move |frame: FrameRef| match tx.try_send(frame) {
            Ok(()) => {
                trace!("frame enqueued");
            }
            Err(TrySendError::Full(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                trace!("frame queue full, frame dropped");
            }
            Err(TrySendError::Closed(_)) => {
                trace!("frame queue closed, frame dropped");
            }
        })
    }

    /// Block until a frame arrives.
    pub fn wait_for_frame(&self) -> Result<FrameRef> {
        self.rx.recv_blocking().map_err(|_| ProcessingError::QueueClosed)
    }

    /// Non-blocking poll.
    pub fn poll_for_frame(&self) -> Option<FrameRef> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Frames currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Frames dropped because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::video_frame;
    use contracts::{PixelFormat, StreamKind};

    fn frame() -> FrameRef {
        video_frame(StreamKind::Depth, PixelFormat::Z16, 0, 4, 4)
    }

    #[test]
    fn test_enqueue_and_poll() {
        let queue = FrameQueue::new(4);
        let callback = queue.make_callback();

        callback(frame());
        callback(frame());

        assert_eq!(queue.len(), 2);
        assert!(queue.poll_for_frame().is_some());
        assert!(queue.poll_for_frame().is_some());
        assert!(queue.poll_for_frame().is_none());
    }

    #[test]
    fn test_overflow_drops_and_counts() {
        let queue = FrameQueue::new(2);
        let callback = queue.make_callback();

        for _ in 0..5 {
            callback(frame());
        }

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped_count(), 3);
    }

    #[test]
    fn test_wait_for_frame_across_threads() {
        let queue = FrameQueue::new(4);
        let callback = queue.make_callback();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            callback(frame());
        });

        let received = queue.wait_for_frame().unwrap();
        assert!(received.is_depth());
        handle.join().unwrap();
    }
}
