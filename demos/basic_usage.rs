/// Basic usage example: Feed IMU samples, get activity segments
use std::f64::consts::PI;

use trace_activity::export::{SegmentLog, SegmentSink, StreamingExporter};
use trace_activity::{
    ActivitySegment, DwellTimeBase, Label, MotionPipeline, PipelineConfig, Sample,
};

fn main() {
    println!("=== Trace Activity Classifier: Basic Example ===\n");

    // Replay recorded timestamps, so debounce runs on sample time.
    let config = PipelineConfig {
        dwell_time_base: DwellTimeBase::SampleTimestamp,
        ..Default::default()
    };
    let mut pipeline = MotionPipeline::new(config);
    let mut exporter = StreamingExporter::new();
    let mut log = SegmentLog::new();

    // Simulated commute at 50Hz: rest, walk to the scooter, ride, lean into a bike.
    let phases: [(&str, f64, fn(f64) -> [f64; 3]); 4] = [
        ("rest", 3.0, |_| [0.0, 0.0, 0.0]),
        ("walk", 5.0, |t| [0.0, 0.0, 2.0 + 0.5 * (2.0 * PI * 1.8 * t).sin()]),
        ("scooter", 5.0, |t| [0.0, 0.0, 20.0 + 3.0 * (2.0 * PI * 7.0 * t).sin()]),
        ("bike", 5.0, |t| [12.0, 0.0, 16.0 + 2.0 * (2.0 * PI * 5.0 * t).sin()]),
    ];

    let mut t = 0.0;
    for (name, duration, accel) in phases {
        println!("Simulating {:.0}s of {}...", duration, name);
        let n = (duration * 50.0) as usize;
        for _ in 0..n {
            let output = pipeline.on_sample(Sample::accel_only(t, accel(t)));

            for update in exporter.updates(t, &output) {
                match update.to_json() {
                    Ok(json) => println!("  update: {}", json),
                    Err(e) => eprintln!("  failed to serialize update: {}", e),
                }
            }
            if let Some(segment) = output.completed_segment {
                record(&mut log, &segment);
            }
            t += 0.02;
        }
    }

    // Flush the segment still open at end of input
    if let Some(segment) = pipeline.flush() {
        record(&mut log, &segment);
    }

    println!("\n=== Summary ===");
    println!("Samples processed: {}", pipeline.total_samples());
    let summary = log.summary();
    for label in Label::ALL {
        println!(
            "{:<8} {:>5.1}s ({:>3.0}%)",
            label.as_str(),
            summary.per_label.get(&label).copied().unwrap_or(0.0),
            summary.fraction(label) * 100.0
        );
    }
}

fn record(log: &mut SegmentLog, segment: &ActivitySegment) {
    println!(
        "  segment: {:<8} {:>6.2}s -> {:>6.2}s ({:.2}s)",
        segment.label.as_str(),
        segment.start_time,
        segment.end_time,
        segment.duration()
    );
    if let Err(e) = log.append(segment) {
        eprintln!("  failed to record segment: {}", e);
    }
}
