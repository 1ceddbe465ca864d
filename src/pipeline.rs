//! Complete classification pipeline from raw samples to activity segments.
//!
//! # Architecture
//!
//! Each sample runs to completion through four stages before the next one is
//! admitted:
//! 1. **Window**: append to the time-bounded buffer, evict stale samples
//! 2. **Features**: recompute the feature set from the window snapshot
//! 3. **Classify**: map features to a candidate label
//! 4. **Gate**: debounce the candidate into a stable label, closing segments
//!
//! The pipeline owns all mutable state. `on_sample` is the only mutation
//! entry point and `current_state` the only read entry point; both need
//! exclusive or shared access to the pipeline respectively, so concurrent
//! producers go through `SharedPipeline`.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::{Classifier, ClassifierConfig};
use crate::clock::{Clock, DwellTimeBase, SystemClock};
use crate::error::ConfigError;
use crate::features::{FeatureConfig, FeatureExtractor};
use crate::stability::{GateDecision, OpenSegment, StabilityConfig, StabilityGate};
use crate::types::*;
use crate::window::{WindowBuffer, DEFAULT_WINDOW_SEC};

/// Configuration for the complete pipeline.
///
/// Bundles the per-stage configurations. Every field has a default, so a
/// JSON file only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window horizon in seconds.
    pub window_sec: f64,

    /// Clock the dwell timer and segment boundaries use.
    pub dwell_time_base: DwellTimeBase,

    /// Feature extraction parameters.
    pub features: FeatureConfig,

    /// Classification thresholds.
    pub classifier: ClassifierConfig,

    /// Debounce parameters.
    pub stability: StabilityConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_sec: DEFAULT_WINDOW_SEC,
            dwell_time_base: DwellTimeBase::Arrival,
            features: FeatureConfig::default(),
            classifier: ClassifierConfig::default(),
            stability: StabilityConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every stage's parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.window_sec.is_finite() || self.window_sec <= 0.0 {
            return Err(ConfigError::invalid(
                "window_sec",
                "must be a positive finite number",
            ));
        }
        self.features.validate()?;
        self.classifier.validate()?;
        self.stability.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// Single-threaded classification pipeline.
pub struct MotionPipeline<C: Clock = SystemClock> {
    config: PipelineConfig,

    // Processing stages
    window: WindowBuffer,
    extractor: FeatureExtractor,
    classifier: Classifier,
    gate: StabilityGate,

    clock: C,
    latest_features: FeatureSet,

    // Dwell time bookkeeping
    anchored: bool,
    last_gate_time: f64,

    total_samples: u64,
}

impl MotionPipeline<SystemClock> {
    /// Create a pipeline reading wall-clock time.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> MotionPipeline<C> {
    /// Create a pipeline with an explicit clock. The gate's dwell timer starts now.
    pub fn with_clock(config: PipelineConfig, clock: C) -> Self {
        let start = clock.now();
        let anchored = config.dwell_time_base == DwellTimeBase::Arrival;

        Self {
            window: WindowBuffer::new(config.window_sec),
            extractor: FeatureExtractor::new(config.features.clone()),
            classifier: Classifier::new(config.classifier.clone()),
            gate: StabilityGate::new(config.stability.clone(), start),
            config,
            clock,
            latest_features: FeatureSet::default(),
            anchored,
            last_gate_time: start,
            total_samples: 0,
        }
    }

    /// Process one sample through every stage.
    pub fn on_sample(&mut self, sample: Sample) -> PipelineOutput {
        self.window.insert(sample);
        self.total_samples += 1;

        let snapshot = self.window.snapshot();
        let features = self.extractor.extract(&snapshot);
        let candidate = self.classifier.classify(&features);

        let t = self.gate_time(&sample);
        let decision = self.gate.update(candidate, t);

        let completed_segment = match decision {
            GateDecision::Committed { from, to, closed } => {
                info!(%from, %to, at = t, "activity changed");
                if let Some(segment) = &closed {
                    debug!(
                        label = %segment.label,
                        start = segment.start_time,
                        end = segment.end_time,
                        duration = segment.duration(),
                        "segment closed"
                    );
                }
                closed
            }
            GateDecision::Suppressed => {
                debug!(%candidate, current = %self.gate.current_label(), at = t, "candidate inside dwell window");
                None
            }
            GateDecision::Hold | GateDecision::Opened => None,
        };

        self.latest_features = features;

        PipelineOutput {
            current_label: self.gate.current_label(),
            features,
            completed_segment,
        }
    }

    /// Latest stable label and features, for passive pollers.
    pub fn current_state(&self) -> CurrentState {
        CurrentState {
            current_label: self.gate.current_label(),
            features: self.latest_features,
        }
    }

    /// Close the open segment at the current dwell time.
    ///
    /// Call this when input ends to persist the final segment.
    pub fn flush(&mut self) -> Option<ActivitySegment> {
        let t = match self.config.dwell_time_base {
            DwellTimeBase::Arrival => self.clock.now(),
            DwellTimeBase::SampleTimestamp => self.last_gate_time,
        };
        let segment = self.gate.flush(t);
        if let Some(segment) = &segment {
            debug!(label = %segment.label, end = segment.end_time, "segment flushed");
        }
        segment
    }

    fn gate_time(&mut self, sample: &Sample) -> f64 {
        let t = match self.config.dwell_time_base {
            DwellTimeBase::Arrival => self.clock.now(),
            DwellTimeBase::SampleTimestamp => {
                if !self.anchored {
                    self.gate.anchor(sample.timestamp);
                    self.anchored = true;
                }
                sample.timestamp
            }
        };
        self.last_gate_time = t;
        t
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn current_label(&self) -> Label {
        self.gate.current_label()
    }

    /// The segment still being accumulated, if any.
    pub fn open_segment(&self) -> Option<OpenSegment> {
        self.gate.open_segment()
    }

    pub fn gate(&self) -> &StabilityGate {
        &self.gate
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    /// Total samples processed so far.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }
}

/// Mutex-guarded pipeline handle for multiple producers and pollers.
///
/// Every `on_sample` holds the lock for the whole window → features →
/// classify → gate cycle, so the gate's label and timer are updated
/// atomically per sample.
pub struct SharedPipeline<C: Clock = SystemClock> {
    inner: Arc<Mutex<MotionPipeline<C>>>,
}

impl<C: Clock> SharedPipeline<C> {
    pub fn new(pipeline: MotionPipeline<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    pub fn on_sample(&self, sample: Sample) -> PipelineOutput {
        self.inner.lock().on_sample(sample)
    }

    pub fn current_state(&self) -> CurrentState {
        self.inner.lock().current_state()
    }

    pub fn flush(&self) -> Option<ActivitySegment> {
        self.inner.lock().flush()
    }

    pub fn total_samples(&self) -> u64 {
        self.inner.lock().total_samples()
    }
}

impl<C: Clock> Clone for SharedPipeline<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
