//! Feature extraction over a window snapshot.
//!
//! Computes the `FeatureSet` the classifier consumes:
//! - Magnitude statistics (mean and peak of |a|)
//! - Dominant frequency of the magnitude series (Hann-tapered real FFT)
//! - Peak jerk (finite-difference derivative of |a| under irregular sampling)
//! - Mean absolute tilt from the acceleration vector
//!
//! Nothing here fails. Windows that are too short for a sub-computation
//! produce that feature's default (`0.0`), and non-positive sample intervals
//! are replaced with a nominal or median interval rather than rejected.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{FeatureSet, Sample};

/// Parameters for feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Sample rate assumed when timestamps are unusable (Hz).
    /// Also sets the fallback interval for jerk estimation.
    pub nominal_sample_rate_hz: f64,

    /// Lowest frequency considered when picking the dominant bin (Hz).
    /// Excludes the residual DC and very slow drift.
    pub min_frequency_hz: f64,

    /// Fewest samples for spectral analysis. Shorter windows report 0 Hz.
    pub min_spectral_samples: usize,

    /// Fewest samples for jerk estimation. Shorter windows report 0.
    pub min_jerk_samples: usize,

    /// Floor for the squared tilt denominator, avoids division by zero.
    pub tilt_epsilon: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            nominal_sample_rate_hz: 50.0,
            min_frequency_hz: 0.3,
            min_spectral_samples: 6,
            min_jerk_samples: 3,
            tilt_epsilon: 1e-9,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.nominal_sample_rate_hz.is_finite() && self.nominal_sample_rate_hz > 0.0) {
            return Err(ConfigError::invalid(
                "features.nominal_sample_rate_hz",
                "must be a positive finite number",
            ));
        }
        if !(self.min_frequency_hz.is_finite() && self.min_frequency_hz >= 0.0) {
            return Err(ConfigError::invalid(
                "features.min_frequency_hz",
                "must be a non-negative finite number",
            ));
        }
        if self.min_spectral_samples < 2 {
            return Err(ConfigError::invalid(
                "features.min_spectral_samples",
                "need at least 2 samples for a spectrum",
            ));
        }
        if self.min_jerk_samples < 2 {
            return Err(ConfigError::invalid(
                "features.min_jerk_samples",
                "need at least 2 samples for a derivative",
            ));
        }
        if !(self.tilt_epsilon.is_finite() && self.tilt_epsilon > 0.0) {
            return Err(ConfigError::invalid(
                "features.tilt_epsilon",
                "must be a small positive number",
            ));
        }
        Ok(())
    }

    /// Interval implied by the nominal sample rate (seconds).
    pub fn nominal_interval(&self) -> f64 {
        1.0 / self.nominal_sample_rate_hz
    }
}

/// Result of the dominant-frequency search.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralPeak {
    /// Frequency of the strongest bin in band (Hz), 0.0 if none.
    pub frequency_hz: f64,
    /// Sample rate the spectrum was computed at. `None` if the window was
    /// too short to attempt it.
    pub sample_rate_hz: Option<f64>,
}

/// Plan cache entries kept before the cache is reset.
const MAX_CACHED_PLANS: usize = 16;

/// Forward FFT plans keyed by length. Clones share the same plans.
///
/// Window lengths only wobble by a sample or two under jitter, so a handful
/// of plans covers a steady stream.
#[derive(Clone, Default)]
pub struct FftCache {
    plans: Arc<Mutex<HashMap<usize, Arc<dyn Fft<f64>>>>>,
}

impl FftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan for `len`, built on first use.
    pub fn plan(&self, len: usize) -> Arc<dyn Fft<f64>> {
        let mut plans = self.plans.lock();
        if let Some(fft) = plans.get(&len) {
            return Arc::clone(fft);
        }
        if plans.len() >= MAX_CACHED_PLANS {
            plans.clear();
        }
        let fft = FftPlanner::new().plan_fft_forward(len);
        plans.insert(len, Arc::clone(&fft));
        fft
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FftCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftCache").field("plans", &self.len()).finish()
    }
}

/// Feature extractor. Holds no per-window state, only cached FFT plans.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    fft_cache: FftCache,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            fft_cache: FftCache::new(),
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn fft_cache(&self) -> &FftCache {
        &self.fft_cache
    }

    /// Compute the full feature set for a window snapshot.
    pub fn extract(&self, window: &[Sample]) -> FeatureSet {
        if window.is_empty() {
            return FeatureSet::default();
        }

        let n = window.len() as f64;
        let magnitudes: Vec<f64> = window.iter().map(Sample::accel_magnitude).collect();
        let timestamps: Vec<f64> = window.iter().map(|s| s.timestamp).collect();

        let accel_mean = magnitudes.iter().sum::<f64>() / n;
        let accel_peak = magnitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let spectral =
            dominant_frequency_cached(&magnitudes, &timestamps, &self.config, &self.fft_cache);
        let jerk_peak = peak_jerk(&magnitudes, &timestamps, &self.config);

        let pitch_mean = window
            .iter()
            .map(|s| pitch_deg(s.accel, self.config.tilt_epsilon))
            .sum::<f64>()
            / n;

        FeatureSet {
            accel_mean,
            accel_peak,
            dominant_freq: spectral.frequency_hz,
            jerk_peak,
            pitch_mean,
            sample_rate_estimate: spectral.sample_rate_hz,
            sample_count: window.len(),
        }
    }
}

// ============================================================================
// SPECTRAL ANALYSIS
// ============================================================================

/// Find the dominant frequency of a magnitude series.
///
/// The series is de-meaned and Hann-tapered before a real FFT. Only bins in
/// `[min_frequency_hz, fs / 2]` are candidates; the first bin with maximum
/// power wins. An empty band yields 0 Hz with the rate still reported.
///
/// Plans a fresh FFT; streaming callers should go through a `FeatureExtractor`.
pub fn dominant_frequency(
    magnitudes: &[f64],
    timestamps: &[f64],
    config: &FeatureConfig,
) -> SpectralPeak {
    dominant_frequency_cached(magnitudes, timestamps, config, &FftCache::new())
}

/// `dominant_frequency` with plans taken from `cache`.
pub fn dominant_frequency_cached(
    magnitudes: &[f64],
    timestamps: &[f64],
    config: &FeatureConfig,
    cache: &FftCache,
) -> SpectralPeak {
    let n = magnitudes.len();
    if n == 0 || n < config.min_spectral_samples {
        return SpectralPeak::default();
    }

    let sample_rate = estimate_sample_rate(timestamps, config.nominal_sample_rate_hz);

    let mean = magnitudes.iter().sum::<f64>() / n as f64;
    let window = hann_window(n);
    let mut buffer: Vec<Complex<f64>> = magnitudes
        .iter()
        .zip(window.iter())
        .map(|(&m, &w)| Complex::new((m - mean) * w, 0.0))
        .collect();

    cache.plan(n).process(&mut buffer);

    let nyquist = sample_rate / 2.0;
    let bin_width = sample_rate / n as f64;
    let mut best: Option<(f64, f64)> = None;

    // Positive-frequency half only: bins 0..=n/2.
    for (k, value) in buffer.iter().take(n / 2 + 1).enumerate() {
        let freq = k as f64 * bin_width;
        if freq < config.min_frequency_hz || freq > nyquist {
            continue;
        }
        let power = value.norm_sqr();
        match best {
            Some((_, best_power)) if power <= best_power => {}
            _ => best = Some((freq, power)),
        }
    }

    SpectralPeak {
        frequency_hz: best.map(|(freq, _)| freq).unwrap_or(0.0),
        sample_rate_hz: Some(sample_rate),
    }
}

/// Effective sample rate as the reciprocal of the median interval.
///
/// Falls back to `nominal_hz` if any interval is non-positive (duplicate or
/// out-of-order timestamps), or if there are fewer than two timestamps.
pub fn estimate_sample_rate(timestamps: &[f64], nominal_hz: f64) -> f64 {
    if timestamps.len() < 2 {
        return nominal_hz;
    }

    let mut intervals: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    if intervals.iter().any(|&dt| dt <= 0.0) {
        tracing::debug!(
            samples = timestamps.len(),
            nominal_hz,
            "non-positive sample interval, using nominal rate"
        );
        return nominal_hz;
    }

    1.0 / median(&mut intervals)
}

/// Symmetric Hann window of length `n`.
fn hann_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

// ============================================================================
// JERK
// ============================================================================

/// Largest absolute derivative of the magnitude series with respect to time.
///
/// Zero intervals are replaced with the median of the nonzero intervals, or
/// the nominal interval when every interval is zero.
pub fn peak_jerk(magnitudes: &[f64], timestamps: &[f64], config: &FeatureConfig) -> f64 {
    let n = magnitudes.len().min(timestamps.len());
    if n < config.min_jerk_samples || n < 2 {
        return 0.0;
    }

    let mut intervals: Vec<f64> = timestamps[..n].windows(2).map(|w| w[1] - w[0]).collect();

    if intervals.iter().any(|&dt| dt == 0.0) {
        let mut nonzero: Vec<f64> = intervals.iter().copied().filter(|&dt| dt != 0.0).collect();
        let substitute = if nonzero.is_empty() {
            config.nominal_interval()
        } else {
            median(&mut nonzero)
        };
        tracing::debug!(substitute, "duplicate timestamps in window, substituting interval");
        for dt in intervals.iter_mut().filter(|dt| **dt == 0.0) {
            *dt = substitute;
        }
    }

    magnitudes[..n]
        .windows(2)
        .zip(intervals.iter())
        .map(|(pair, &dt)| ((pair[1] - pair[0]) / dt).abs())
        .fold(0.0, f64::max)
}

// ============================================================================
// TILT
// ============================================================================

/// Absolute tilt of the acceleration vector in degrees.
///
/// `atan2(ax, sqrt(ay² + az²))`, with the squared denominator floored at
/// `epsilon`.
pub fn pitch_deg(accel: [f64; 3], epsilon: f64) -> f64 {
    let denom = (accel[1] * accel[1] + accel[2] * accel[2]).max(epsilon).sqrt();
    accel[0].atan2(denom).to_degrees().abs()
}

/// Median of a slice (mean of the two middle values for even lengths).
/// Reorders the slice. Returns 0.0 for an empty slice.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
