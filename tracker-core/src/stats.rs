//! Night statistics aggregation and the per-interval distance counter.
//!
//! [`NightStats`] is the session's cumulative record: total distance plus the
//! timestamps of the first and last countable rotations. One live instance is
//! owned by the session context; a durable copy lives in the store (see
//! `store`) and the two are reconciled at every recovery or session boundary.

use serde::{Deserialize, Serialize};

use crate::clock::ClockReading;

/// Distance credited per confirmed revolution, in centimetres.
pub const WHEEL_CIRCUMFERENCE_CM: u32 = 85;

/// Cumulative statistics for one overnight session.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NightStats {
    /// Monotonic non-decreasing within a session.
    #[serde(with = "postcard::fixint::le")]
    pub total_distance_cm: u32,
    /// Set exactly once per session, on the rotation that takes the total
    /// from zero to nonzero.
    pub first_rotation: ClockReading,
    /// Updated on every countable rotation after the first.
    pub last_rotation: ClockReading,
}

impl NightStats {
    /// Resets the record for a new session.
    ///
    /// Both timestamps are placeholders until real rotations occur. A session
    /// that ends with exactly one countable rotation keeps this placeholder
    /// as its `last_rotation` — longstanding device behavior that the nightly
    /// summary depends on, so it is preserved rather than corrected.
    pub fn begin_new_session(&mut self, now: ClockReading) {
        self.total_distance_cm = 0;
        self.first_rotation = now;
        self.last_rotation = now;
    }

    /// Applies one countable rotation observed at `now`.
    pub fn apply_rotation(&mut self, now: ClockReading) {
        if self.total_distance_cm == 0 {
            self.first_rotation = now;
        } else {
            self.last_rotation = now;
        }
        self.total_distance_cm = self.total_distance_cm.saturating_add(WHEEL_CIRCUMFERENCE_CM);
    }

    /// Returns `true` when no rotation has been recorded this session.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_distance_cm == 0
    }

    /// Total distance in whole metres, as pushed to the distance feed.
    #[must_use]
    pub const fn distance_m(&self) -> u32 {
        self.total_distance_cm / 100
    }

    /// Total distance as whole kilometres plus a tenths digit, the format
    /// used by the display and the nightly summary.
    #[must_use]
    pub const fn distance_km(&self) -> (u32, u32) {
        let km = self.total_distance_cm / 100_000;
        let tenths = (self.total_distance_cm % 100_000) / 10_000;
        (km, tenths)
    }
}

/// Distance accumulated since the last 5-minute report.
///
/// Distinct from the session total: this counter is handed to the interval
/// telemetry sink and zeroed at every interval-report tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct IntervalAccumulator {
    distance_cm: u32,
}

impl IntervalAccumulator {
    /// Empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self { distance_cm: 0 }
    }

    /// Credits one revolution to the current interval.
    pub fn add_rotation(&mut self) {
        self.distance_cm = self.distance_cm.saturating_add(WHEEL_CIRCUMFERENCE_CM);
    }

    /// Current interval distance in centimetres.
    #[must_use]
    pub const fn distance_cm(&self) -> u32 {
        self.distance_cm
    }

    /// Returns the accumulated distance and resets the counter.
    pub fn take(&mut self) -> u32 {
        core::mem::take(&mut self.distance_cm)
    }
}
