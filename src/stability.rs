//! Debounce state machine turning candidate labels into stable segments.
//!
//! The gate holds one settled label. A different candidate is only accepted
//! once `min_duration_sec` has passed since the last accepted change; until
//! then it is ignored. Accepting a change closes the open segment and opens
//! a new one at the same instant.
//!
//! This trades at least `min_duration_sec` of latency on every transition
//! for immunity to single-sample spikes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ActivitySegment, Label};

/// Configuration for the stability gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Minimum time between accepted label changes (seconds).
    pub min_duration_sec: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            min_duration_sec: 1.0,
        }
    }
}

impl StabilityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_duration_sec.is_finite() || self.min_duration_sec < 0.0 {
            return Err(ConfigError::invalid(
                "stability.min_duration_sec",
                "must be a non-negative finite number",
            ));
        }
        Ok(())
    }
}

/// Mutable state owned by the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierState {
    /// Settled, externally visible label.
    pub current_label: Label,
    /// Time the current label was accepted (or the gate started).
    pub last_change_time: f64,
    /// Start of the open segment, if any.
    pub segment_start_time: Option<f64>,
}

impl ClassifierState {
    pub fn new(start_time: f64) -> Self {
        Self {
            current_label: Label::Idle,
            last_change_time: start_time,
            segment_start_time: None,
        }
    }
}

/// The segment currently being accumulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenSegment {
    pub label: Label,
    pub start_time: f64,
}

/// What a single candidate did to the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Candidate matched the settled label.
    Hold,
    /// Candidate matched and no segment was open, so one was opened.
    Opened,
    /// Candidate differed but arrived inside the dwell window.
    Suppressed,
    /// Candidate accepted. `closed` is the segment it ended, if one was open.
    Committed {
        from: Label,
        to: Label,
        closed: Option<ActivitySegment>,
    },
}

impl GateDecision {
    /// The segment closed by this decision, if any.
    pub fn closed_segment(&self) -> Option<ActivitySegment> {
        match self {
            GateDecision::Committed { closed, .. } => *closed,
            _ => None,
        }
    }
}

/// Hysteresis gate over candidate labels.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    config: StabilityConfig,
    state: ClassifierState,

    // Diagnostics
    transition_count: u64,
    suppressed_count: u64,
}

impl StabilityGate {
    /// Create a gate that considers `start_time` the last change.
    pub fn new(config: StabilityConfig, start_time: f64) -> Self {
        Self {
            config,
            state: ClassifierState::new(start_time),
            transition_count: 0,
            suppressed_count: 0,
        }
    }

    /// Feed one candidate label observed at time `t`.
    pub fn update(&mut self, candidate: Label, t: f64) -> GateDecision {
        let state = &mut self.state;

        if candidate == state.current_label {
            if state.segment_start_time.is_none() {
                state.segment_start_time = Some(t);
                return GateDecision::Opened;
            }
            return GateDecision::Hold;
        }

        if t - state.last_change_time < self.config.min_duration_sec {
            self.suppressed_count += 1;
            return GateDecision::Suppressed;
        }

        let from = state.current_label;
        let closed = state
            .segment_start_time
            .map(|start| ActivitySegment::new(start, t, from));

        state.current_label = candidate;
        state.segment_start_time = Some(t);
        state.last_change_time = t;
        self.transition_count += 1;

        GateDecision::Committed {
            from,
            to: candidate,
            closed,
        }
    }

    /// Close the open segment at `t` without changing the label.
    ///
    /// Used at shutdown so the final segment can be persisted. The next
    /// matching candidate reopens a segment.
    pub fn flush(&mut self, t: f64) -> Option<ActivitySegment> {
        self.state
            .segment_start_time
            .take()
            .map(|start| ActivitySegment::new(start, t, self.state.current_label))
    }

    /// Reset the dwell timer's origin. Only meaningful before the first update.
    pub fn anchor(&mut self, t: f64) {
        self.state.last_change_time = t;
    }

    pub fn current_label(&self) -> Label {
        self.state.current_label
    }

    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    pub fn open_segment(&self) -> Option<OpenSegment> {
        self.state.segment_start_time.map(|start_time| OpenSegment {
            label: self.state.current_label,
            start_time,
        })
    }

    /// Number of accepted label changes.
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Number of candidates ignored by the dwell timer.
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> StabilityGate {
        StabilityGate::new(StabilityConfig::default(), 0.0)
    }

    #[test]
    fn test_initial_state() {
        let gate = gate();
        assert_eq!(gate.current_label(), Label::Idle);
        assert_eq!(gate.open_segment(), None);
        assert_eq!(gate.state().last_change_time, 0.0);
    }

    #[test]
    fn test_first_matching_candidate_opens_segment() {
        let mut gate = gate();
        assert_eq!(gate.update(Label::Idle, 0.1), GateDecision::Opened);
        assert_eq!(gate.update(Label::Idle, 0.2), GateDecision::Hold);
        assert_eq!(
            gate.open_segment(),
            Some(OpenSegment {
                label: Label::Idle,
                start_time: 0.1
            })
        );
    }

    #[test]
    fn test_flicker_inside_dwell_never_commits() {
        let mut gate = gate();
        let sequence = [Label::Idle, Label::Walking, Label::Idle, Label::Walking];
        let mut closed = Vec::new();
        for (i, &label) in sequence.iter().enumerate() {
            let decision = gate.update(label, i as f64 * 0.2);
            closed.extend(decision.closed_segment());
        }
        assert_eq!(gate.current_label(), Label::Idle);
        assert!(closed.is_empty());
        assert_eq!(gate.suppressed_count(), 2);
        assert_eq!(gate.transition_count(), 0);
    }

    #[test]
    fn test_flicker_after_ride_commit() {
        let mut gate = gate();
        // Commit straight into a ride with nothing open to close.
        let decision = gate.update(Label::Scooter, 1.0);
        assert_eq!(
            decision,
            GateDecision::Committed {
                from: Label::Idle,
                to: Label::Scooter,
                closed: None
            }
        );

        let sequence = [Label::Bike, Label::Scooter, Label::Bike];
        for (i, &label) in sequence.iter().enumerate() {
            let decision = gate.update(label, 1.2 + i as f64 * 0.2);
            assert_eq!(decision.closed_segment(), None);
        }
        assert_eq!(gate.current_label(), Label::Scooter);
    }

    #[test]
    fn test_commit_closes_open_segment() {
        let mut gate = gate();
        gate.update(Label::Idle, 0.0);
        gate.update(Label::Idle, 1.0);

        let decision = gate.update(Label::Walking, 2.0);
        let closed = decision.closed_segment().unwrap();
        assert_eq!(closed, ActivitySegment::new(0.0, 2.0, Label::Idle));
        assert_eq!(gate.current_label(), Label::Walking);
        assert_eq!(gate.state().last_change_time, 2.0);
        assert_eq!(gate.open_segment().unwrap().start_time, 2.0);
    }

    #[test]
    fn test_dwell_boundary_is_inclusive() {
        let mut gate = gate();
        gate.update(Label::Idle, 0.0);
        assert_eq!(gate.update(Label::Walking, 0.999), GateDecision::Suppressed);
        assert!(matches!(
            gate.update(Label::Walking, 1.0),
            GateDecision::Committed { .. }
        ));
    }

    #[test]
    fn test_dwell_measured_from_last_change() {
        let mut gate = gate();
        gate.update(Label::Idle, 0.0);
        gate.update(Label::Walking, 1.5);
        // 0.5 s after the last change: suppressed even though the segment is 1.5 s old overall.
        assert_eq!(gate.update(Label::Bike, 2.0), GateDecision::Suppressed);
        let decision = gate.update(Label::Bike, 2.5);
        assert_eq!(
            decision.closed_segment(),
            Some(ActivitySegment::new(1.5, 2.5, Label::Walking))
        );
    }

    #[test]
    fn test_flush_closes_and_reopens() {
        let mut gate = gate();
        gate.update(Label::Idle, 0.0);
        let flushed = gate.flush(3.0).unwrap();
        assert_eq!(flushed, ActivitySegment::new(0.0, 3.0, Label::Idle));
        assert_eq!(gate.flush(4.0), None);
        assert_eq!(gate.update(Label::Idle, 5.0), GateDecision::Opened);
    }

    #[test]
    fn test_zero_dwell_accepts_every_change() {
        let mut gate = StabilityGate::new(StabilityConfig { min_duration_sec: 0.0 }, 0.0);
        gate.update(Label::Idle, 0.0);
        assert!(matches!(gate.update(Label::Walking, 0.0), GateDecision::Committed { .. }));
        assert!(matches!(gate.update(Label::Bike, 0.01), GateDecision::Committed { .. }));
        assert_eq!(gate.transition_count(), 2);
    }
}
