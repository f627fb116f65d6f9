//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineOptions};

/// Execute the `run` command
pub fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        width = config.source.width,
        height = config.source.height,
        fps = config.source.fps,
        occlusion = ?config.pointcloud.occlusion,
        watcher_interval_ms = config.watcher.interval_ms,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let options = PipelineOptions {
        config,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        queue_capacity: args.queue_capacity,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting pipeline...");
    let pipeline = Pipeline::new(options);
    let stats = pipeline.run().context("Pipeline execution failed")?;

    info!(
        frames_received = stats.frames_received,
        points_total = stats.points_total,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed successfully"
    );
    stats.print_summary();

    info!("depthflow finished");
    Ok(())
}

/// Print a short configuration overview for dry runs
fn print_config_summary(config: &contracts::PipelineConfig) {
    println!("Configuration summary:");
    println!(
        "  Source: {}x{} @ {} fps, plane at {}m",
        config.source.width, config.source.height, config.source.fps, config.source.plane_depth_m
    );
    println!(
        "  Pointcloud: occlusion {:?}, texture {:?}[{}]",
        config.pointcloud.occlusion, config.pointcloud.texture_kind, config.pointcloud.texture_index
    );
    println!("  Watcher: polling every {}ms", config.watcher.interval_ms);
}
