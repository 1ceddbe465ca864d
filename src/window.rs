//! Time-bounded sliding window of recent samples.
//!
//! The window is bounded by duration, not by count: every insert evicts
//! samples older than `newest - window_sec`, so the number of retained
//! samples follows the instantaneous sample rate.

use std::collections::VecDeque;

use crate::types::Sample;

/// Default window horizon in seconds.
pub const DEFAULT_WINDOW_SEC: f64 = 2.0;

/// Ordered buffer of the most recent samples.
///
/// Insertion order is assumed to be timestamp order. Out-of-order samples
/// are stored as given; eviction only looks at the front.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    samples: VecDeque<Sample>,
    window_sec: f64,
}

impl WindowBuffer {
    /// Create an empty window spanning `window_sec` seconds.
    pub fn new(window_sec: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            window_sec,
        }
    }

    /// Append a sample and evict everything older than the horizon.
    pub fn insert(&mut self, sample: Sample) {
        let cutoff = sample.timestamp - self.window_sec;
        self.samples.push_back(sample);

        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Current contents in insertion order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Iterate the current contents without copying.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Window horizon in seconds.
    pub fn window_sec(&self) -> f64 {
        self.window_sec
    }

    /// Timestamp of the most recently inserted sample.
    pub fn newest_timestamp(&self) -> Option<f64> {
        self.samples.back().map(|s| s.timestamp)
    }

    /// Time covered by the retained samples (0.0 when fewer than two).
    pub fn span(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SEC)
    }
}
