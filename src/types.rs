//! Core data types for the activity classifier.
//!
//! This module defines the values that flow through the classification
//! pipeline: raw samples in, feature sets and labels in the middle, and
//! closed activity segments out.
//!
//! Design principle: Types should make intent obvious. If a concept exists,
//! it gets a type. Never pass raw tuples or untyped collections across boundaries.

use serde::{Deserialize, Serialize};

/// A single raw inertial measurement unit sample.
///
/// This is the input contract: three-axis accelerometer, three-axis
/// gyroscope and a timestamp. The transport that produced it is responsible
/// for defaulting missing fields to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp in seconds. Expected to be non-decreasing within a stream.
    pub timestamp: f64,

    /// Accelerometer reading [x, y, z] in m/s².
    pub accel: [f64; 3],

    /// Gyroscope reading [x, y, z] in rad/s.
    pub gyro: [f64; 3],
}

impl Sample {
    /// Creates a new sample.
    pub fn new(timestamp: f64, accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self {
            timestamp,
            accel,
            gyro,
        }
    }

    /// Creates a sample with only accelerometer data (gyro zeroed).
    pub fn accel_only(timestamp: f64, accel: [f64; 3]) -> Self {
        Self::new(timestamp, accel, [0.0; 3])
    }

    /// Euclidean norm of the acceleration vector, in m/s².
    pub fn accel_magnitude(&self) -> f64 {
        let x2 = self.accel[0] * self.accel[0];
        let y2 = self.accel[1] * self.accel[1];
        let z2 = self.accel[2] * self.accel[2];
        (x2 + y2 + z2).sqrt()
    }

    /// Euclidean norm of the angular rate vector, in rad/s.
    pub fn gyro_magnitude(&self) -> f64 {
        let x2 = self.gyro[0] * self.gyro[0];
        let y2 = self.gyro[1] * self.gyro[1];
        let z2 = self.gyro[2] * self.gyro[2];
        (x2 + y2 + z2).sqrt()
    }
}

// ============================================================================
// LABELS
// ============================================================================

/// Externally visible motion state.
///
/// There is deliberately no running label: high-energy motion that is not
/// periodic stepping is resolved to one of the two ride modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Device is at rest.
    #[default]
    Idle,
    /// Periodic, moderate-energy human stepping.
    Walking,
    /// Powered ride with an upright posture.
    Scooter,
    /// Powered ride with a forward-leaning posture.
    Bike,
}

impl Label {
    /// All labels, in declaration order.
    pub const ALL: [Label; 4] = [Label::Idle, Label::Walking, Label::Scooter, Label::Bike];

    /// Lowercase name, as written to segment logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Idle => "idle",
            Label::Walking => "walking",
            Label::Scooter => "scooter",
            Label::Bike => "bike",
        }
    }

    /// Returns true for the two powered-ride labels.
    pub fn is_ride(&self) -> bool {
        matches!(self, Label::Scooter | Label::Bike)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FEATURES
// ============================================================================

/// Features computed over one window snapshot.
///
/// Recomputed from scratch on every sample. Degenerate windows produce the
/// zero defaults rather than failing, so the classifier always receives a
/// complete set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Mean acceleration magnitude (m/s²).
    pub accel_mean: f64,
    /// Peak acceleration magnitude (m/s²).
    pub accel_peak: f64,
    /// Frequency bin with the most power in the magnitude series (Hz).
    pub dominant_freq: f64,
    /// Largest absolute rate of change of magnitude (m/s³).
    pub jerk_peak: f64,
    /// Mean absolute tilt (degrees).
    pub pitch_mean: f64,
    /// Effective sample rate used for the spectrum (Hz).
    /// `None` when the window was too short for spectral analysis.
    pub sample_rate_estimate: Option<f64>,
    /// Number of samples the features were computed from.
    pub sample_count: usize,
}

// ============================================================================
// SEGMENTS AND PIPELINE OUTPUT
// ============================================================================

/// A closed interval during which the classifier held one stable label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivitySegment {
    /// Time the label was accepted (seconds, dwell time base).
    pub start_time: f64,
    /// Time the next label was accepted (seconds, dwell time base).
    pub end_time: f64,
    /// The label held throughout.
    pub label: Label,
}

impl ActivitySegment {
    pub fn new(start_time: f64, end_time: f64, label: Label) -> Self {
        Self {
            start_time,
            end_time,
            label,
        }
    }

    /// Length of the segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Result of feeding one sample through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Stable label after this sample.
    pub current_label: Label,
    /// Features computed for the window ending at this sample.
    pub features: FeatureSet,
    /// Segment closed by this sample, if the stable label changed.
    pub completed_segment: Option<ActivitySegment>,
}

/// Snapshot for passive pollers that do not need per-sample notification.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentState {
    pub current_label: Label,
    pub features: FeatureSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_magnitudes() {
        let sample = Sample::new(0.0, [3.0, 4.0, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(sample.accel_magnitude(), 5.0);
        assert_eq!(sample.gyro_magnitude(), 1.0);
    }

    #[test]
    fn test_accel_only_zeroes_gyro() {
        let sample = Sample::accel_only(1.5, [0.0, 0.0, 9.81]);
        assert_eq!(sample.gyro, [0.0; 3]);
        assert_eq!(sample.timestamp, 1.5);
    }

    #[test]
    fn test_label_names() {
        assert_eq!(Label::Idle.to_string(), "idle");
        assert_eq!(Label::Bike.as_str(), "bike");
        assert_eq!(Label::default(), Label::Idle);
        assert!(Label::Scooter.is_ride());
        assert!(!Label::Walking.is_ride());
    }

    #[test]
    fn test_label_serializes_lowercase() {
        let json = serde_json::to_string(&Label::Scooter).unwrap();
        assert_eq!(json, "\"scooter\"");
    }

    #[test]
    fn test_segment_duration() {
        let segment = ActivitySegment::new(10.0, 12.5, Label::Walking);
        assert_eq!(segment.duration(), 2.5);
    }

    #[test]
    fn test_feature_set_default_is_zeroed() {
        let features = FeatureSet::default();
        assert_eq!(features.accel_peak, 0.0);
        assert_eq!(features.sample_rate_estimate, None);
        assert_eq!(features.sample_count, 0);
    }
}
