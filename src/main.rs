//! `trace-activity` binary: classify a live or recorded stream of readings.
//!
//! # Usage
//!
//! ```bash
//! # Listen for phone sensor packets on the default UDP port
//! trace-activity --udp
//!
//! # Replay a recording with a leading timestamp column
//! trace-activity --input ride.csv --timestamped --segments-out segments.jsonl
//! ```
//!
//! Completed segments are written as JSON lines; logs go to stderr.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::UdpSocket;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use trace_activity::export::{JsonLinesSink, SegmentLog, SegmentSink};
use trace_activity::packet::{parse_reading, parse_timestamped_reading};
use trace_activity::{Clock, DwellTimeBase, MotionPipeline, PipelineConfig, SystemClock};

/// Port the phone sensor bridge sends to by default.
const DEFAULT_UDP_PORT: u16 = 2055;
/// Largest datagram read in one piece; longer ones are truncated by the OS.
const BUFFER_SIZE: usize = 8192;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "trace-activity",
    version,
    about = "Real-time IMU activity classifier (idle / walking / scooter / bike)",
    long_about = None
)]
struct Args {
    /// Path to a JSON `PipelineConfig`. Defaults are used otherwise.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read readings from this file instead of stdin.
    #[arg(short, long, value_name = "FILE", conflicts_with = "udp")]
    input: Option<PathBuf>,

    /// Listen for UDP packets, one reading per datagram.
    #[arg(long, value_name = "PORT", num_args = 0..=1, default_missing_value = "2055")]
    udp: Option<u16>,

    /// Readings carry a leading timestamp (seconds). Implies sample-time debouncing.
    #[arg(long, default_value_t = false)]
    timestamped: bool,

    /// Write completed segments here instead of stdout.
    #[arg(long, value_name = "FILE")]
    segments_out: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    info!("Trace Activity Classifier v{}", trace_activity::VERSION);

    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            match PipelineConfig::from_json_file(path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    error!("Failed to load configuration: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => PipelineConfig::default(),
    };

    if args.timestamped {
        config.dwell_time_base = DwellTimeBase::SampleTimestamp;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(&args, config) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args, config: PipelineConfig) -> trace_activity::Result<()> {
    if stamps_file_on_arrival(args) {
        warn!(
            "Reading a file without --timestamped: every line is stamped with the time it is read, \
             so the whole file lands inside one window and no transition passes the dwell time"
        );
    }

    let writer: Box<dyn Write> = match &args.segments_out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };

    let mut session = Session {
        pipeline: MotionPipeline::new(config),
        clock: SystemClock,
        timestamped: args.timestamped,
        sink: JsonLinesSink::new(writer),
        history: SegmentLog::new(),
        rejected: 0,
    };

    if let Some(port) = args.udp {
        run_udp(&mut session, port)?;
    } else {
        let reader: Box<dyn BufRead> = match &args.input {
            Some(path) => Box::new(BufReader::new(File::open(path)?)),
            None => Box::new(io::stdin().lock()),
        };
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            session.handle(&line)?;
        }
    }

    session.finish()
}

/// A recorded file read at disk speed has no meaningful arrival time.
fn stamps_file_on_arrival(args: &Args) -> bool {
    args.input.is_some() && !args.timestamped
}

fn run_udp(session: &mut Session<impl Write>, port: u16) -> trace_activity::Result<()> {
    let socket = UdpSocket::bind(("0.0.0.0", port))?;
    info!(
        "UDP listener started on port {port} (default {DEFAULT_UDP_PORT}). Waiting for IMU data..."
    );

    let mut buf = [0u8; BUFFER_SIZE];
    loop {
        let (len, _addr) = socket.recv_from(&mut buf)?;
        let text = String::from_utf8_lossy(&buf[..len]);
        session.handle(&text)?;
    }
}

/// One classification run: pipeline plus where its segments go.
struct Session<W: Write> {
    pipeline: MotionPipeline,
    clock: SystemClock,
    timestamped: bool,
    sink: JsonLinesSink<W>,
    history: SegmentLog,
    rejected: u64,
}

impl<W: Write> Session<W> {
    fn handle(&mut self, raw: &str) -> trace_activity::Result<()> {
        let parsed = if self.timestamped {
            parse_timestamped_reading(raw)
        } else {
            parse_reading(raw, self.clock.now())
        };

        let sample = match parsed {
            Ok(sample) => sample,
            Err(e) => {
                self.rejected += 1;
                warn!("Failed to process packet: {e}");
                return Ok(());
            }
        };

        let output = self.pipeline.on_sample(sample);
        if let Some(segment) = output.completed_segment {
            self.record(&segment)?;
        }
        Ok(())
    }

    fn record(&mut self, segment: &trace_activity::ActivitySegment) -> trace_activity::Result<()> {
        // A lost segment line should not stop classification.
        if let Err(e) = self.sink.append(segment).and_then(|()| self.sink.flush()) {
            warn!("Failed to write segment: {e}");
        }
        self.history.append(segment)?;
        Ok(())
    }

    fn finish(mut self) -> trace_activity::Result<()> {
        if let Some(segment) = self.pipeline.flush() {
            self.record(&segment)?;
        }

        let summary = self.history.summary();
        info!(
            "Processed {} samples ({} rejected), {} segments over {:.1}s",
            self.pipeline.total_samples(),
            self.rejected,
            summary.segment_count,
            summary.total_duration
        );
        for (label, seconds) in &summary.per_label {
            info!("  {label:<8}: {seconds:>8.1}s ({:.0}%)", summary.fraction(*label) * 100.0);
        }
        Ok(())
    }
}
