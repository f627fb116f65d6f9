//! Pipeline orchestrator - coordinates all components.
//!
//! Wires a synthetic depth camera into the point-cloud stage, drains the
//! stage output through a frame queue and runs an options watcher over a
//! pair of device options for the duration of the run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{OptionId, PipelineConfig, PixelFormat, StreamFilter};
use observability::{record_option_change, record_queue_depth, PipelineAggregator};
use options_watcher::OptionsWatcher;
use pointcloud::PointCloud;
use processing::FrameQueue;
use synth::{ScriptedOption, SoftwareAllocator, StaticExtrinsicsGraph, SyntheticCamera};
use tracing::{debug, info};

use super::PipelineStats;

/// Orchestration options
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Parsed pipeline configuration
    pub config: PipelineConfig,

    /// Maximum point-cloud frames to consume (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Frame queue capacity
    pub queue_capacity: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a new pipeline with the given options
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Run the pipeline to completion
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let config = &self.options.config;

        // Metrics endpoint (optional)
        if let Some(port) = self.options.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Calibration graph + synthetic camera
        let graph = Arc::new(StaticExtrinsicsGraph::new());
        let camera = SyntheticCamera::new(config.source.clone().into(), &graph);

        // Point-cloud stage
        let allocator = Arc::new(SoftwareAllocator::new());
        let stage = Arc::new(PointCloud::new(allocator, graph));
        stage.map_to(StreamFilter::new(
            config.pointcloud.texture_kind,
            PixelFormat::Any,
            Some(config.pointcloud.texture_index),
        ));
        if config.pointcloud.occlusion == contracts::OcclusionModeConfig::Monotonic {
            stage.set_occlusion_option(1.0)?;
        }

        // Stage output drains into a queue the main thread consumes.
        let queue = FrameQueue::new(self.options.queue_capacity);
        stage.set_output_callback(queue.make_callback());

        // Options watcher over a scripted exposure option and the stage's
        // own occlusion-mode option.
        let watcher = OptionsWatcher::new(Duration::from_millis(config.watcher.interval_ms));
        let exposure = Arc::new(ScriptedOption::percentage("Exposure", 50.0));
        watcher.register_option(OptionId::Exposure, exposure.clone());
        watcher.register_option(OptionId::OcclusionRemoval, stage.occlusion_option());

        let option_changes = Arc::new(AtomicU64::new(0));
        let option_changes_watcher = option_changes.clone();
        let _subscription = watcher.subscribe(move |changed| {
            for (id, option) in changed {
                let value = option.query().ok();
                debug!(option = ?id, ?value, "option changed");
                record_option_change(*id);
            }
            option_changes_watcher.fetch_add(changed.len() as u64, Ordering::Relaxed);
        });

        // Feed every captured composite straight into the stage.
        let stage_for_camera = stage.clone();
        camera.start(Arc::new(move |frame| stage_for_camera.invoke(frame)));

        // Consume point-cloud frames until done.
        let mut frames_received: u64 = 0;
        let mut points_total: u64 = 0;
        let mut tick: u64 = 0;
        loop {
            if let Some(max) = self.options.max_frames {
                if frames_received >= max {
                    break;
                }
            }
            if let Some(timeout) = self.options.timeout {
                if start_time.elapsed() >= timeout {
                    info!("Pipeline timeout reached");
                    break;
                }
            }

            match queue.poll_for_frame() {
                Some(frame) => {
                    frames_received += 1;
                    if let Some((vertices, _)) = frame.points_data() {
                        points_total += vertices.len() as u64;
                    }
                    record_queue_depth(queue.len());

                    // Nudge the exposure now and then so the watcher has
                    // something to report.
                    tick += 1;
                    if tick % 30 == 0 {
                        exposure.set_value(50.0 + (tick % 120) as f32);
                    }
                }
                None => {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }

        camera.stop();

        let snapshot = stage.block().metrics().snapshot();
        let mut aggregator = PipelineAggregator::new();
        aggregator.update_block(
            snapshot.frames_in,
            snapshot.frames_out,
            snapshot.frames_dropped,
            snapshot.transform_errors,
        );
        aggregator.record_points(points_total);

        Ok(PipelineStats {
            frames_received,
            points_total,
            queue_dropped: queue.dropped_count(),
            option_changes: option_changes.load(Ordering::Relaxed),
            duration: start_time.elapsed(),
            aggregator,
        })
    }
}
