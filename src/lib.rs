//! Trace Activity Classifier Library
//!
//! Turns a stream of 3-axis accelerometer and gyroscope readings into a
//! debounced motion label (idle, walking, scooter, bike) and a sequence of
//! closed activity segments.
//!
//! # Design Philosophy
//!
//! - **Recompute, don't accumulate**: features are derived from the current
//!   sliding window on every sample, so state never drifts.
//! - **Pure classification**: thresholds and features in, one label out.
//!   All mutable state lives in the stability gate.
//! - **Stable over fast**: a label change is accepted only after a minimum
//!   dwell, which keeps one noisy window from splitting a segment.
//!
//! # Example
//!
//! ```no_run
//! use trace_activity::{MotionPipeline, PipelineConfig, Sample};
//!
//! let mut pipeline = MotionPipeline::new(PipelineConfig::default());
//! let output = pipeline.on_sample(Sample::accel_only(0.0, [0.0, 0.0, 9.81]));
//! if let Some(segment) = output.completed_segment {
//!     println!("{} for {:.1}s", segment.label, segment.duration());
//! }
//! println!("now: {}", pipeline.current_state().current_label);
//! ```

pub mod classifier;
pub mod clock;
pub mod error;
pub mod export;
pub mod features;
pub mod packet;
pub mod pipeline;
pub mod stability;
pub mod types;
pub mod window;

#[cfg(test)]
mod integration_tests;

// Re-export commonly used types
pub use classifier::{Classifier, ClassifierConfig};
pub use clock::{Clock, DwellTimeBase, ManualClock, SystemClock};
pub use error::{ConfigError, Error, ExportError, PacketError, Result};
pub use export::{JsonLinesSink, SegmentLog, SegmentSink, StreamingExporter, StreamingUpdate};
pub use features::{FeatureConfig, FeatureExtractor};
pub use pipeline::{MotionPipeline, PipelineConfig, SharedPipeline};
pub use stability::{StabilityConfig, StabilityGate};
pub use types::{ActivitySegment, CurrentState, FeatureSet, Label, PipelineOutput, Sample};
pub use window::WindowBuffer;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
