//! Capture-state gate deciding whether a detected rotation counts.
//!
//! Right after power-up the wheel is usually given a few test spins while the
//! device is positioned; those must not be recorded as the start of the
//! night's run. The gate holds new sessions in [`CaptureState::Warmup`] until
//! a configured number of consecutive countable-window rotations has been
//! observed, then promotes to [`CaptureState::Active`]. Daytime rotations
//! (cage cleaning, curious children) are ignored outright regardless of
//! state.

use crate::schedule::is_night_hour;

/// Number of warm-up rotations discarded by default before tracking engages.
pub const DEFAULT_WARMUP_THRESHOLD: u16 = 10;

/// Tunable parameters for the gate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CaptureConfig {
    /// Consecutive night-window rotations required to leave warm-up.
    pub warmup_threshold: u16,
}

impl CaptureConfig {
    #[must_use]
    pub const fn new(warmup_threshold: u16) -> Self {
        Self { warmup_threshold }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WARMUP_THRESHOLD)
    }
}

/// Whether rotations are currently being discarded or recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CaptureState {
    /// Discarding test spins; `spins` counts the night-window rotations seen.
    Warmup { spins: u16 },
    /// Rotations are forwarded to the statistics aggregator.
    Active,
}

impl CaptureState {
    /// Fresh warm-up state with a zeroed counter.
    #[must_use]
    pub const fn warmup() -> Self {
        CaptureState::Warmup { spins: 0 }
    }

    /// Returns `true` once warm-up has completed.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, CaptureState::Active)
    }

    /// Gates one rotation event against the current (validated) hour.
    ///
    /// Pure state transition: the caller applies the rotation to the
    /// aggregator only when the decision is [`GateDecision::Counted`].
    #[must_use]
    pub fn admit(self, hour: u8, config: &CaptureConfig) -> (Self, GateDecision) {
        if !is_night_hour(hour) {
            return (self, GateDecision::OutsideNightWindow);
        }

        match self {
            CaptureState::Warmup { spins } => {
                let spins = spins.saturating_add(1);
                if spins >= config.warmup_threshold {
                    // The promoting rotation itself is still discarded.
                    (CaptureState::Active, GateDecision::Promoted)
                } else {
                    (CaptureState::Warmup { spins }, GateDecision::WarmupDiscarded)
                }
            }
            CaptureState::Active => (CaptureState::Active, GateDecision::Counted),
        }
    }
}

/// Outcome of gating a single rotation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GateDecision {
    /// Daytime rotation; ignored entirely.
    OutsideNightWindow,
    /// Warm-up spin; counter advanced, event discarded.
    WarmupDiscarded,
    /// This spin completed warm-up; the event itself is discarded.
    Promoted,
    /// Countable nocturnal revolution; forward to the aggregator.
    Counted,
}

impl GateDecision {
    /// Returns `true` when the rotation should reach the aggregator.
    #[must_use]
    pub const fn counts(self) -> bool {
        matches!(self, GateDecision::Counted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daytime_rotations_are_ignored_in_any_state() {
        let config = CaptureConfig::default();

        let (state, decision) = CaptureState::warmup().admit(12, &config);
        assert_eq!(state, CaptureState::warmup());
        assert_eq!(decision, GateDecision::OutsideNightWindow);

        let (state, decision) = CaptureState::Active.admit(7, &config);
        assert_eq!(state, CaptureState::Active);
        assert_eq!(decision, GateDecision::OutsideNightWindow);
        assert!(!decision.counts());
    }

    #[test]
    fn warmup_promotes_after_threshold_spins() {
        let config = CaptureConfig::new(3);
        let mut state = CaptureState::warmup();

        let (next, decision) = state.admit(23, &config);
        assert_eq!(decision, GateDecision::WarmupDiscarded);
        state = next;

        let (next, decision) = state.admit(23, &config);
        assert_eq!(decision, GateDecision::WarmupDiscarded);
        state = next;

        // Third spin promotes but is itself discarded.
        let (next, decision) = state.admit(23, &config);
        assert_eq!(decision, GateDecision::Promoted);
        assert!(next.is_active());
        assert!(!decision.counts());

        // Fourth spin is the first countable one.
        let (_, decision) = next.admit(23, &config);
        assert_eq!(decision, GateDecision::Counted);
    }

    #[test]
    fn active_state_counts_every_night_rotation() {
        let config = CaptureConfig::default();
        let (state, decision) = CaptureState::Active.admit(0, &config);
        assert_eq!(state, CaptureState::Active);
        assert!(decision.counts());
    }

    #[test]
    fn default_threshold_matches_device_setting() {
        assert_eq!(CaptureConfig::default().warmup_threshold, 10);
    }
}
