//! Pipeline metric collection.
//!
//! Thin wrappers over the `metrics` macros plus an in-memory aggregator
//! for end-of-run summaries.

use contracts::OptionId;
use metrics::{counter, gauge};

/// Record a frame delivered by a block
pub fn record_frame_processed(block: &str) {
    counter!("depthflow_frames_processed_total", "block" => block.to_string()).increment(1);
}

/// Record a frame dropped by a block (gate rejection or missing callback)
pub fn record_frame_dropped(block: &str) {
    counter!("depthflow_frames_dropped_total", "block" => block.to_string()).increment(1);
}

/// Record vertices produced by the point-cloud stage
pub fn record_points_produced(count: u64) {
    counter!("depthflow_points_produced_total").increment(count);
}

/// Record texels invalidated by the occlusion filter
pub fn record_occluded_texels(count: u64) {
    counter!("depthflow_occluded_texels_total").increment(count);
}

/// Record an option change notification
pub fn record_option_change(id: OptionId) {
    counter!("depthflow_option_changes_total", "option" => format!("{id:?}")).increment(1);
}

/// Record frame queue depth
pub fn record_queue_depth(depth: usize) {
    gauge!("depthflow_frame_queue_depth").set(depth as f64);
}

/// Run aggregator
///
/// Aggregates per-block counters and stage statistics in memory for a
/// printable end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct PipelineAggregator {
    /// Frames fed into blocks
    pub frames_in: u64,

    /// Frames delivered by blocks
    pub frames_out: u64,

    /// Frames dropped (gate or missing callback)
    pub frames_dropped: u64,

    /// Failed transforms
    pub transform_errors: u64,

    /// Total vertices produced
    pub points_total: u64,

    /// Option change notifications observed
    pub option_changes: u64,

    /// Per-invocation latency statistics (milliseconds)
    pub invoke_latency_ms: RunningStats,
}

impl PipelineAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one block's counters into the totals
    pub fn update_block(&mut self, frames_in: u64, frames_out: u64, dropped: u64, errors: u64) {
        self.frames_in += frames_in;
        self.frames_out += frames_out;
        self.frames_dropped += dropped;
        self.transform_errors += errors;
    }

    /// Record vertices produced by one output frame
    pub fn record_points(&mut self, count: u64) {
        self.points_total += count;
    }

    /// Record one option change notification
    pub fn record_option_change(&mut self) {
        self.option_changes += 1;
    }

    /// Record one invocation's latency
    pub fn record_invoke_latency_ms(&mut self, latency_ms: f64) {
        self.invoke_latency_ms.push(latency_ms);
    }

    /// Produce a summary report
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            frames_in: self.frames_in,
            frames_out: self.frames_out,
            frames_dropped: self.frames_dropped,
            transform_errors: self.transform_errors,
            points_total: self.points_total,
            option_changes: self.option_changes,
            drop_rate: if self.frames_in > 0 {
                self.frames_dropped as f64 / self.frames_in as f64 * 100.0
            } else {
                0.0
            },
            invoke_latency_ms: StatsSummary::from(&self.invoke_latency_ms),
        }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub frames_in: u64,
    pub frames_out: u64,
    pub frames_dropped: u64,
    pub transform_errors: u64,
    pub points_total: u64,
    pub option_changes: u64,
    pub drop_rate: f64,
    pub invoke_latency_ms: StatsSummary,
}

impl std::fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pipeline Summary ===")?;
        writeln!(f, "Frames in: {}", self.frames_in)?;
        writeln!(f, "Frames out: {}", self.frames_out)?;
        writeln!(
            f,
            "Frames dropped: {} ({:.2}%)",
            self.frames_dropped, self.drop_rate
        )?;
        writeln!(f, "Transform errors: {}", self.transform_errors)?;
        writeln!(f, "Points produced: {}", self.points_total)?;
        writeln!(f, "Option changes: {}", self.option_changes)?;
        writeln!(f, "Invoke latency (ms): {}", self.invoke_latency_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}
