/// Integration tests for the complete classification pipeline
/// Drives realistic activity profiles through window, features, classifier
/// and gate, and checks the resulting segment timeline.

#[cfg(test)]
mod integration_tests {
    use std::f64::consts::PI;

    use crate::clock::*;
    use crate::export::*;
    use crate::packet::*;
    use crate::pipeline::*;
    use crate::types::*;

    /// Helper: Generate `duration` seconds of accel-only samples from `start`
    fn profile(
        start: f64,
        duration: f64,
        sample_rate_hz: f64,
        accel: impl Fn(f64) -> [f64; 3],
    ) -> Vec<Sample> {
        let num_samples = (duration * sample_rate_hz).round() as usize;
        (0..num_samples)
            .map(|i| {
                let t = start + i as f64 / sample_rate_hz;
                Sample::accel_only(t, accel(t))
            })
            .collect()
    }

    /// Helper: Device at rest (gravity-compensated, so no signal)
    fn idle(_t: f64) -> [f64; 3] {
        [0.0, 0.0, 0.0]
    }

    /// Helper: Moderate vertical bounce at step cadence
    fn walking(t: f64) -> [f64; 3] {
        [0.0, 0.0, 2.0 + 0.5 * (2.0 * PI * 1.8 * t).sin()]
    }

    /// Helper: Strong upright vibration, no tilt
    fn scooter(t: f64) -> [f64; 3] {
        [0.0, 0.0, 20.0 + 3.0 * (2.0 * PI * 7.0 * t).sin()]
    }

    /// Helper: Strong vibration with the device leaning forward
    fn bike(t: f64) -> [f64; 3] {
        [12.0, 0.0, 16.0 + 2.0 * (2.0 * PI * 5.0 * t).sin()]
    }

    fn replay_config() -> PipelineConfig {
        PipelineConfig {
            dwell_time_base: DwellTimeBase::SampleTimestamp,
            ..Default::default()
        }
    }

    /// Helper: Run samples and collect closed segments, including the flushed tail
    fn run_to_segments<C: Clock>(
        pipeline: &mut MotionPipeline<C>,
        samples: &[Sample],
    ) -> Vec<ActivitySegment> {
        let mut segments: Vec<ActivitySegment> = samples
            .iter()
            .filter_map(|&s| pipeline.on_sample(s).completed_segment)
            .collect();
        segments.extend(pipeline.flush());
        segments
    }

    fn assert_contiguous(segments: &[ActivitySegment]) {
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time, "gap between {pair:?}");
            assert_ne!(pair[0].label, pair[1].label, "repeated label in {pair:?}");
        }
    }

    #[test]
    fn test_idle_then_walking_with_arrival_clock() {
        let clock = ManualClock::new(0.0);
        let mut pipeline = MotionPipeline::with_clock(PipelineConfig::default(), clock.clone());

        let mut samples = profile(0.0, 2.0, 50.0, idle);
        samples.extend(profile(2.0, 3.0, 50.0, walking));

        let mut closed = Vec::new();
        for sample in samples {
            clock.set(sample.timestamp);
            closed.extend(pipeline.on_sample(sample).completed_segment);
        }

        assert_eq!(closed, vec![ActivitySegment::new(0.0, 2.0, Label::Idle)]);
        assert_eq!(pipeline.current_label(), Label::Walking);
        let open = pipeline.open_segment().unwrap();
        assert_eq!(open.label, Label::Walking);
        assert_eq!(open.start_time, 2.0);
    }

    #[test]
    fn test_full_commute_timeline() {
        let mut samples = profile(0.0, 4.0, 50.0, idle);
        samples.extend(profile(4.0, 6.0, 50.0, walking));
        samples.extend(profile(10.0, 6.0, 50.0, scooter));
        samples.extend(profile(16.0, 6.0, 50.0, bike));

        let mut pipeline = MotionPipeline::new(replay_config());
        let segments = run_to_segments(&mut pipeline, &samples);

        let labels: Vec<Label> = segments.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![Label::Idle, Label::Walking, Label::Scooter, Label::Bike]);
        assert_contiguous(&segments);

        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[1].start_time, 4.0);
        assert_eq!(segments[2].start_time, 10.0);

        // Tilt is a window mean, so bike only wins once most of the window leans.
        let bike_start = segments[3].start_time;
        assert!(bike_start > 16.5 && bike_start < 17.6, "bike committed at {bike_start}");
        assert_eq!(segments[3].end_time, samples.last().unwrap().timestamp);
    }

    #[test]
    fn test_walking_features() {
        let mut pipeline = MotionPipeline::new(replay_config());
        let samples = profile(0.0, 4.0, 50.0, walking);

        let mut last = None;
        for sample in samples {
            last = Some(pipeline.on_sample(sample));
        }
        let output = last.unwrap();

        assert_eq!(output.current_label, Label::Walking);
        assert!((output.features.accel_mean - 2.0).abs() < 0.1);
        assert!(output.features.accel_peak <= 2.5 + 1e-9);
        assert!(
            (output.features.dominant_freq - 1.8).abs() <= 0.5,
            "dominant {}",
            output.features.dominant_freq
        );
        assert!(output.features.pitch_mean.abs() < 1e-9);
        let rate = output.features.sample_rate_estimate.unwrap();
        assert!((rate - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_short_burst_is_held_for_dwell() {
        let config = PipelineConfig {
            window_sec: 0.1,
            ..replay_config()
        };
        let mut samples = profile(0.0, 2.0, 50.0, idle);
        samples.extend(profile(2.0, 0.5, 50.0, walking));
        samples.extend(profile(2.5, 3.5, 50.0, idle));

        let mut pipeline = MotionPipeline::new(config);
        let segments = run_to_segments(&mut pipeline, &samples);

        let labels: Vec<Label> = segments.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![Label::Idle, Label::Walking, Label::Idle]);
        // Half a second of motion, but the label could not flip back sooner.
        assert_eq!(segments[1].start_time, 2.0);
        assert!((segments[1].duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flicker_never_yields_short_segments() {
        let config = PipelineConfig {
            window_sec: 0.1,
            ..replay_config()
        };
        let min_duration = config.stability.min_duration_sec;

        let mut samples = profile(0.0, 2.0, 50.0, idle);
        // Alternate every 0.2 s for four seconds.
        samples.extend(profile(2.0, 4.0, 50.0, |t| {
            if (((t - 2.0) / 0.2) as usize) % 2 == 0 {
                walking(t)
            } else {
                idle(t)
            }
        }));
        samples.extend(profile(6.0, 3.0, 50.0, idle));

        let mut pipeline = MotionPipeline::new(config);
        let mut closed = Vec::new();
        for &sample in &samples {
            closed.extend(pipeline.on_sample(sample).completed_segment);
        }

        assert!(!closed.is_empty());
        assert_contiguous(&closed);
        for segment in &closed {
            assert!(
                segment.duration() >= min_duration - 1e-9,
                "segment shorter than dwell: {segment:?}"
            );
        }
        assert!(pipeline.gate().suppressed_count() > 0);
        assert_eq!(pipeline.current_label(), Label::Idle);
    }

    #[test]
    fn test_frozen_arrival_clock_never_commits() {
        // Every sample "arrives" at the same instant as the pipeline start.
        let mut pipeline = MotionPipeline::with_clock(PipelineConfig::default(), ManualClock::new(5.0));
        for sample in profile(0.0, 3.0, 50.0, scooter) {
            let output = pipeline.on_sample(sample);
            assert_eq!(output.current_label, Label::Idle);
            assert_eq!(output.completed_segment, None);
        }
        assert_eq!(pipeline.gate().transition_count(), 0);
    }

    #[test]
    fn test_replay_speed_changes_arrival_timeline() {
        let mut samples = profile(0.0, 2.0, 50.0, idle);
        samples.extend(profile(2.0, 0.6, 50.0, walking));
        samples.extend(profile(2.6, 2.0, 50.0, idle));

        let run_at = |speedup: f64| {
            let clock = ManualClock::new(0.0);
            let config = PipelineConfig {
                window_sec: 0.1,
                ..Default::default()
            };
            let mut pipeline = MotionPipeline::with_clock(config, clock.clone());
            let mut closed = Vec::new();
            for &sample in &samples {
                clock.set(sample.timestamp / speedup);
                closed.extend(pipeline.on_sample(sample).completed_segment);
            }
            closed
        };

        // Real time: the walk is picked up after two seconds of rest.
        let real_time = run_at(1.0);
        assert_eq!(real_time[0], ActivitySegment::new(0.0, 2.0, Label::Idle));

        // Four times faster: the walk starts 0.5 s of arrival time in, inside
        // the dwell window, so it is never accepted.
        let fast = run_at(4.0);
        assert!(fast.is_empty());
    }

    #[test]
    fn test_long_gap_empties_window() {
        let mut pipeline = MotionPipeline::new(replay_config());
        for sample in profile(0.0, 2.0, 50.0, idle) {
            pipeline.on_sample(sample);
        }
        assert!(pipeline.window().len() > 90);

        let output = pipeline.on_sample(Sample::accel_only(30.0, walking(30.0)));
        assert_eq!(pipeline.window().len(), 1);
        assert_eq!(output.features.sample_count, 1);
        assert_eq!(output.current_label, Label::Walking);
        assert_eq!(
            output.completed_segment,
            Some(ActivitySegment::new(0.0, 30.0, Label::Idle))
        );
    }

    #[test]
    fn test_packets_to_segment_log() {
        let mut lines: Vec<String> = profile(0.0, 2.0, 50.0, idle)
            .iter()
            .map(|s| format!("{},{},{},{}\r\n", s.timestamp, s.accel[0], s.accel[1], s.accel[2]))
            .collect();
        lines.extend(
            profile(2.0, 2.0, 50.0, scooter)
                .iter()
                .map(|s| format!("{},{},,{},{},0,0,0", s.timestamp, s.accel[0], s.accel[1], s.accel[2])),
        );
        lines.insert(10, "1.0,not-a-number".to_string());

        let mut pipeline = MotionPipeline::new(replay_config());
        let mut log = SegmentLog::new();
        let mut rejected = 0;
        for line in &lines {
            match parse_timestamped_reading(line) {
                Ok(sample) => {
                    if let Some(segment) = pipeline.on_sample(sample).completed_segment {
                        log.append(&segment).unwrap();
                    }
                }
                Err(_) => rejected += 1,
            }
        }
        if let Some(segment) = pipeline.flush() {
            log.append(&segment).unwrap();
        }

        assert_eq!(rejected, 1);
        let labels: Vec<Label> = log.segments().iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![Label::Idle, Label::Scooter]);
        let summary = log.summary();
        assert!((summary.per_label[&Label::Idle] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_streaming_updates_follow_pipeline() {
        let mut samples = profile(0.0, 2.0, 50.0, idle);
        samples.extend(profile(2.0, 2.0, 50.0, walking));

        let mut pipeline = MotionPipeline::new(replay_config());
        let mut exporter = StreamingExporter::new();
        let mut updates = Vec::new();
        for sample in samples {
            let output = pipeline.on_sample(sample);
            updates.extend(exporter.updates(sample.timestamp, &output));
        }

        assert_eq!(updates.len(), 2);
        assert!(matches!(
            updates[0].update_type,
            StreamingUpdateType::SegmentComplete(ActivitySegment { label: Label::Idle, .. })
        ));
        assert!(matches!(
            updates[1].update_type,
            StreamingUpdateType::LabelChange { to: Label::Walking, .. }
        ));
        assert_eq!(updates[1].timestamp, 2.0);
    }

    #[test]
    fn test_current_state_matches_last_output() {
        let mut pipeline = MotionPipeline::new(replay_config());
        let mut last = None;
        for sample in profile(0.0, 3.0, 50.0, scooter) {
            last = Some(pipeline.on_sample(sample));
        }
        let last = last.unwrap();
        let state = pipeline.current_state();
        assert_eq!(state.current_label, last.current_label);
        assert_eq!(state.features, last.features);
        assert_eq!(state.current_label, Label::Scooter);
        assert_eq!(pipeline.total_samples(), 150);
    }
}
