//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::PipelineAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Point-cloud frames received by the consumer
    pub frames_received: u64,

    /// Total vertices produced
    pub points_total: u64,

    /// Frames dropped by the frame queue (consumer too slow)
    pub queue_dropped: u64,

    /// Option change notifications observed
    pub option_changes: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Block counter aggregation
    pub aggregator: PipelineAggregator,
}

impl PipelineStats {
    /// Calculate frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate queue drop rate as percentage
    pub fn drop_rate(&self) -> f64 {
        let total = self.frames_received + self.queue_dropped;
        if total > 0 {
            (self.queue_dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== depthflow run ===");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Point-cloud frames: {}", self.frames_received);
        println!("  Vertices: {}", self.points_total);
        println!("  Throughput: {:.2} fps", self.fps());
        println!(
            "  Queue drops: {} ({:.2}%)",
            self.queue_dropped,
            self.drop_rate()
        );
        println!("  Option changes: {}", self.option_changes);
        println!();
        println!("{}", self.aggregator.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_and_drop_rate() {
        let stats = PipelineStats {
            frames_received: 90,
            queue_dropped: 10,
            duration: Duration::from_secs(3),
            ..Default::default()
        };
        assert!((stats.fps() - 30.0).abs() < 1e-9);
        assert!((stats.drop_rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_run_is_finite() {
        let stats = PipelineStats::default();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.drop_rate(), 0.0);
    }
}
