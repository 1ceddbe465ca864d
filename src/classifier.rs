//! Rule-based activity classification.
//!
//! Two-stage decision over a `FeatureSet`:
//! 1. A coarse bucket from peak acceleration (idle / walking / ride candidate).
//! 2. Ride candidates are disambiguated: periodic low-energy motion falls
//!    back to walking, everything else resolves to a ride mode by tilt.
//!
//! The classifier is a pure function of its configuration and the features.
//! It never returns anything outside `Label`, and it is total over any
//! feature set, including NaN fields.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{FeatureSet, Label};

/// Decision thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Peak magnitude at or below this is idle (m/s²).
    pub idle_max: f64,
    /// Walking band lower bound, exclusive (m/s²).
    pub walk_min: f64,
    /// Walking band upper bound, inclusive (m/s²).
    pub walk_max: f64,
    /// Peak magnitude at or above this confirms a ride (m/s²).
    pub ride_min: f64,
    /// Peak jerk at or above this confirms a ride (m/s³).
    pub jerk_threshold: f64,
    /// Human step cadence band (Hz), inclusive.
    pub periodic_freq_min: f64,
    pub periodic_freq_max: f64,
    /// Mean tilt at or above this is a bike posture (degrees).
    pub pitch_bike_deg: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            idle_max: 0.1,
            walk_min: 0.1,
            walk_max: 15.0,
            ride_min: 5.0,
            jerk_threshold: 50.0,
            periodic_freq_min: 0.7,
            periodic_freq_max: 4.0,
            pitch_bike_deg: 25.0,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("classifier.idle_max", self.idle_max),
            ("classifier.walk_min", self.walk_min),
            ("classifier.walk_max", self.walk_max),
            ("classifier.ride_min", self.ride_min),
            ("classifier.jerk_threshold", self.jerk_threshold),
            ("classifier.periodic_freq_min", self.periodic_freq_min),
            ("classifier.periodic_freq_max", self.periodic_freq_max),
            ("classifier.pitch_bike_deg", self.pitch_bike_deg),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be a non-negative finite number, got {value}"),
                ));
            }
        }

        if self.walk_min > self.walk_max {
            return Err(ConfigError::invalid(
                "classifier.walk_min",
                format!("exceeds walk_max ({} > {})", self.walk_min, self.walk_max),
            ));
        }
        if self.periodic_freq_min > self.periodic_freq_max {
            return Err(ConfigError::invalid(
                "classifier.periodic_freq_min",
                format!(
                    "exceeds periodic_freq_max ({} > {})",
                    self.periodic_freq_min, self.periodic_freq_max
                ),
            ));
        }
        if self.pitch_bike_deg > 90.0 {
            return Err(ConfigError::invalid(
                "classifier.pitch_bike_deg",
                "tilt is at most 90 degrees",
            ));
        }
        Ok(())
    }
}

/// First-stage result. `RideCandidate` is internal and never leaves the
/// classifier as a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarseBucket {
    Idle,
    Walking,
    RideCandidate,
}

/// Maps feature sets to candidate labels.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a feature set into a candidate label.
    pub fn classify(&self, features: &FeatureSet) -> Label {
        match self.coarse_bucket(features.accel_peak) {
            CoarseBucket::Idle => Label::Idle,
            CoarseBucket::Walking => Label::Walking,
            CoarseBucket::RideCandidate => self.resolve_ride_candidate(features),
        }
    }

    /// Stage 1: bucket by peak acceleration.
    ///
    /// Anything not idle and not in the walking band is a ride candidate,
    /// including values that used to be treated as running.
    pub fn coarse_bucket(&self, accel_peak: f64) -> CoarseBucket {
        if accel_peak.abs() <= self.config.idle_max {
            CoarseBucket::Idle
        } else if accel_peak > self.config.walk_min && accel_peak <= self.config.walk_max {
            CoarseBucket::Walking
        } else {
            CoarseBucket::RideCandidate
        }
    }

    /// Stage 2: disambiguate a ride candidate.
    pub fn resolve_ride_candidate(&self, features: &FeatureSet) -> Label {
        let c = &self.config;
        let periodic = features.dominant_freq >= c.periodic_freq_min
            && features.dominant_freq <= c.periodic_freq_max;

        // Stepping cadence without ride-level energy.
        if periodic && features.accel_peak < c.ride_min {
            return Label::Walking;
        }

        if features.jerk_peak >= c.jerk_threshold || features.accel_peak >= c.ride_min {
            return self.ride_by_tilt(features.pitch_mean);
        }

        // No separate ambiguous output: unconfirmed candidates still resolve by tilt.
        self.ride_by_tilt(features.pitch_mean)
    }

    /// Bike vs scooter from mean tilt.
    pub fn ride_by_tilt(&self, pitch_mean: f64) -> Label {
        if pitch_mean >= self.config.pitch_bike_deg {
            Label::Bike
        } else {
            Label::Scooter
        }
    }
}
