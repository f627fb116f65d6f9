//! # Integration Tests
//!
//! End-to-end tests across the pipeline crates.
//!
//! Covers:
//! - Synthetic camera → point-cloud stage → frame queue data flow
//! - Live calibration-change refresh through the device boundary
//! - Options watcher lifecycle against scripted device options
//! - Format-conversion chains

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        let _ = contracts::StreamFilter::any();
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use synth::SyntheticCameraConfig;

    /// Config flows into the synthetic source without loss.
    #[test]
    fn test_config_drives_camera_shape() {
        let config = ConfigLoader::load_from_str(
            r#"
[source]
width = 128
height = 96
fps = 15
depth_units = 0.0005
plane_depth_m = 2.0
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let camera_config = SyntheticCameraConfig::from(config.source);
        assert_eq!(camera_config.width, 128);
        assert_eq!(camera_config.height, 96);
        assert_eq!(camera_config.fps, 15);
        // 2m plane at 0.5mm units: raw 4000, inside 16-bit range.
        assert_eq!(
            (camera_config.plane_depth_m / camera_config.depth_units).round() as u32,
            4000
        );
    }

    /// Block counters fold into the run summary.
    #[test]
    fn test_block_counters_fold_into_summary() {
        let mut aggregator = observability::PipelineAggregator::new();
        aggregator.update_block(10, 9, 1, 0);
        aggregator.record_points(9 * 64);

        let summary = aggregator.summary();
        assert_eq!(summary.frames_out, 9);
        assert_eq!(summary.points_total, 576);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        CalibrationStatus, Extrinsics, OptionId, PixelFormat, StreamFilter, StreamKind,
    };
    use options_watcher::OptionsWatcher;
    use pointcloud::PointCloud;
    use processing::FrameQueue;
    use synth::{
        ScriptedOption, SoftwareAllocator, StaticExtrinsicsGraph, SyntheticCamera,
        SyntheticCameraConfig,
    };

    fn small_camera(graph: &StaticExtrinsicsGraph) -> SyntheticCamera {
        SyntheticCamera::new(
            SyntheticCameraConfig {
                width: 32,
                height: 24,
                fps: 120,
                depth_units: 0.001,
                plane_depth_m: 1.0,
            },
            graph,
        )
    }

    fn color_filter() -> StreamFilter {
        StreamFilter::new(StreamKind::Color, PixelFormat::Rgb8, Some(0))
    }

    /// End-to-end: SyntheticCamera -> PointCloud -> FrameQueue
    ///
    /// Verifies the complete data flow:
    /// 1. Camera produces depth+color composites on its own thread
    /// 2. The stage deprojects and texture-maps them
    /// 3. The consumer drains textured point clouds from the queue
    #[test]
    fn test_e2e_synthetic_pipeline() {
        let graph = Arc::new(StaticExtrinsicsGraph::new());
        let camera = small_camera(&graph);
        let allocator = Arc::new(SoftwareAllocator::new());

        let stage = Arc::new(PointCloud::new(allocator, graph));
        stage.map_to(color_filter());

        let queue = FrameQueue::new(8);
        stage.set_output_callback(queue.make_callback());

        let stage_for_camera = stage.clone();
        camera.start(Arc::new(move |frame| stage_for_camera.invoke(frame)));

        // Drain a handful of frames.
        for _ in 0..3 {
            let frame = queue.wait_for_frame().expect("pipeline produced no frame");
            assert_eq!(frame.profile().format, PixelFormat::Xyz32);

            let (vertices, texcoords) = frame.points_data().unwrap();
            assert_eq!(vertices.len(), 32 * 24);

            // Flat plane at 1m, coincident sensors.
            for (i, vertex) in vertices.iter().enumerate() {
                assert!((vertex.z - 1.0).abs() < 1e-4);
                let x = (i % 32) as f32;
                let y = (i / 32) as f32;
                assert!((texcoords[i].u - x / 32.0).abs() < 1e-4);
                assert!((texcoords[i].v - y / 24.0).abs() < 1e-4);
            }
        }

        camera.stop();
    }

    /// Occlusion enabled end-to-end; a lateral baseline means the pass
    /// actually runs (non-identity extrinsics).
    #[test]
    fn test_e2e_with_occlusion_enabled() {
        let graph = Arc::new(StaticExtrinsicsGraph::new());
        let camera = small_camera(&graph);
        // Shift the color sensor so the occlusion pass is not skipped.
        graph.register(
            camera.depth_profile(),
            camera.color_profile(),
            Extrinsics {
                rotation: Extrinsics::IDENTITY.rotation,
                translation: [0.025, 0.0, 0.0],
            },
        );

        let allocator = Arc::new(SoftwareAllocator::new());
        let stage = Arc::new(PointCloud::new(allocator, graph));
        stage.map_to(color_filter());
        stage.set_occlusion_option(1.0).unwrap();

        let queue = FrameQueue::new(8);
        stage.set_output_callback(queue.make_callback());

        let stage_for_camera = stage.clone();
        camera.start(Arc::new(move |frame| stage_for_camera.invoke(frame)));

        let frame = queue.wait_for_frame().expect("no frame");
        camera.stop();

        // A flat plane seen from a shifted sensor projects monotonically:
        // everything stays textured, nothing crashes.
        let (vertices, texcoords) = frame.points_data().unwrap();
        assert!(vertices.iter().all(|v| v.is_valid()));
        assert!(texcoords.iter().any(|t| t.u > 0.0));
    }

    /// A successful on-device calibration re-resolves extrinsics without
    /// restarting the stage.
    #[test]
    fn test_e2e_calibration_change() {
        let graph = Arc::new(StaticExtrinsicsGraph::new());
        let camera = small_camera(&graph);
        let allocator = Arc::new(SoftwareAllocator::new());

        let stage = Arc::new(PointCloud::new(allocator, graph.clone()));
        stage.map_to(color_filter());

        let queue = FrameQueue::new(8);
        stage.set_output_callback(queue.make_callback());

        stage.invoke(Arc::new(camera.capture_frame(1)));
        let before = queue.wait_for_frame().unwrap();

        graph.register(
            camera.depth_profile(),
            camera.color_profile(),
            Extrinsics {
                rotation: Extrinsics::IDENTITY.rotation,
                translation: [0.05, 0.0, 0.0],
            },
        );
        camera.device().notify_calibration(CalibrationStatus::Successful);

        stage.invoke(Arc::new(camera.capture_frame(2)));
        let after = queue.wait_for_frame().unwrap();

        let (_, uv_before) = before.points_data().unwrap();
        let (_, uv_after) = after.points_data().unwrap();
        let mid = 12 * 32 + 16;
        assert!(
            uv_after[mid].u > uv_before[mid].u + 1e-3,
            "texture mapping did not pick up the new extrinsics"
        );
    }

    /// Watcher lifecycle against scripted options.
    #[test]
    fn test_e2e_options_watcher() {
        let tick = Duration::from_millis(15);
        let watcher = OptionsWatcher::new(tick);

        let exposure = Arc::new(ScriptedOption::percentage("Exposure", 50.0));
        let gain = Arc::new(ScriptedOption::percentage("Gain", 10.0));
        watcher.register_option(OptionId::Exposure, exposure.clone());
        watcher.register_option(OptionId::Gain, gain);

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let subscription = watcher.subscribe(move |changed| {
            let mut ids: Vec<OptionId> = changed.keys().copied().collect();
            ids.sort_by_key(|id| format!("{id:?}"));
            seen_clone.lock().push(ids);
        });
        assert!(watcher.is_running());

        std::thread::sleep(tick * 3);
        exposure.set_value(80.0);
        std::thread::sleep(tick * 6);

        {
            let deliveries = seen.lock();
            assert!(!deliveries.is_empty(), "no change notification arrived");
            for ids in deliveries.iter() {
                assert_eq!(ids.as_slice(), &[OptionId::Exposure]);
            }
        }

        subscription.cancel();
        watcher.unregister_option(OptionId::Exposure);
        watcher.unregister_option(OptionId::Gain);
        assert!(!watcher.is_running());
    }

    /// Watching the point-cloud stage's own occlusion option.
    #[test]
    fn test_e2e_watcher_observes_stage_option() {
        let graph = Arc::new(StaticExtrinsicsGraph::new());
        let allocator = Arc::new(SoftwareAllocator::new());
        let stage = PointCloud::new(allocator, graph);

        let tick = Duration::from_millis(15);
        let watcher = OptionsWatcher::new(tick);
        watcher.register_option(OptionId::OcclusionRemoval, stage.occlusion_option());

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _subscription = watcher.subscribe(move |changed| {
            if let Some(option) = changed.get(&OptionId::OcclusionRemoval) {
                seen_clone.lock().push(option.query().unwrap());
            }
        });

        std::thread::sleep(tick * 3);
        stage.set_occlusion_option(1.0).unwrap();
        std::thread::sleep(tick * 6);

        let values = seen.lock().clone();
        assert_eq!(values, vec![1.0]);
    }

    /// Interleaved format conversion feeding a queue.
    #[test]
    fn test_e2e_format_conversion_chain() {
        use bytes_frame::y16i_frame;

        let allocator = Arc::new(SoftwareAllocator::new());
        let block = processing::y16i_to_y16y16(allocator, 1, 2);

        let queue = FrameQueue::new(4);
        block.set_output_callback(queue.make_callback());

        block.invoke(y16i_frame(4, 2, 512, 100));

        let composite = queue.poll_for_frame().expect("no composite delivered");
        assert!(composite.is_composite());

        let left = composite
            .first(StreamKind::Infrared, PixelFormat::Y16)
            .unwrap();
        let data = left.video_data().unwrap();
        assert_eq!(u16::from_le_bytes([data[0], data[1]]), 32800);
    }

    /// Frame construction helpers for the conversion tests.
    mod bytes_frame {
        use super::*;
        use contracts::{Frame, FrameRef, StreamProfile};

        pub fn y16i_frame(width: u32, height: u32, left: u16, right: u16) -> FrameRef {
            let profile = StreamProfile::video(
                StreamKind::Infrared,
                PixelFormat::Y16I,
                0,
                width,
                height,
                30,
            );
            let mut data = bytes::BytesMut::new();
            for _ in 0..(width * height) {
                data.extend_from_slice(&left.to_le_bytes());
                data.extend_from_slice(&right.to_le_bytes());
            }
            Arc::new(Frame::video(profile, 0.0, 1, None, 4, data))
        }
    }
}
