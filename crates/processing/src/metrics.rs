//! Per-block counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Processing metrics
#[derive(Debug, Default)]
pub struct ProcessingMetrics {
    /// Frames fed into the block
    pub frames_in: AtomicU64,

    /// Frames delivered to the output callback
    pub frames_out: AtomicU64,

    /// Frames rejected by the gate or producing no output
    pub frames_dropped: AtomicU64,

    /// Failed transforms
    pub transform_errors: AtomicU64,
}

impl ProcessingMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record frame received
    pub fn record_in(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame delivered
    pub fn record_out(&self) {
        self.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame dropped
    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record transform error
    pub fn record_error(&self) {
        self.transform_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            frames_out: self.frames_out.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            transform_errors: self.transform_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Frames fed into the block
    pub frames_in: u64,

    /// Frames delivered to the output callback
    pub frames_out: u64,

    /// Frames rejected by the gate or producing no output
    pub frames_dropped: u64,

    /// Failed transforms
    pub transform_errors: u64,
}
