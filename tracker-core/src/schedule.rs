//! Wall-clock boundary tracking and the periodic-action predicates.
//!
//! All periodic behavior in the tracker hangs off two edge signals: "this is
//! the first cycle of a new hour" and "this is the first cycle of a new
//! minute". [`BoundaryTracker`] derives both by comparing each validated
//! reading against the previously observed one. Invalid readings must never
//! reach [`BoundaryTracker::observe`]; the session layer enforces that, so a
//! single corrupted RTC read can neither fire a false boundary nor swallow a
//! real one.

use crate::clock::ClockReading;

/// First hour of the night window (22:00, inclusive).
pub const NIGHT_START_HOUR: u8 = 22;
/// End of the night window (07:00, exclusive) and the morning report hour.
pub const NIGHT_END_HOUR: u8 = 7;
/// Telemetry fires on minutes divisible by this period.
pub const TELEMETRY_PERIOD_MINUTES: u8 = 5;

/// Returns `true` when the hour falls inside the night window.
#[must_use]
pub const fn is_night_hour(hour: u8) -> bool {
    hour >= NIGHT_START_HOUR || hour < NIGHT_END_HOUR
}

/// Returns `true` when the hour falls inside the day window.
#[must_use]
pub const fn is_day_hour(hour: u8) -> bool {
    !is_night_hour(hour)
}

/// Edge signals produced by one observation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BoundaryReport {
    pub new_hour: bool,
    pub new_minute: bool,
}

impl BoundaryReport {
    /// No boundary crossed; used when scheduling is suppressed for a cycle.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            new_hour: false,
            new_minute: false,
        }
    }

    /// One-time preparation boundary for the upcoming night (22:00).
    #[must_use]
    pub const fn session_start(&self, reading: &ClockReading) -> bool {
        self.new_hour && reading.hour == NIGHT_START_HOUR
    }

    /// Morning summary boundary (07:00).
    #[must_use]
    pub const fn morning_report(&self, reading: &ClockReading) -> bool {
        self.new_hour && reading.hour == NIGHT_END_HOUR
    }

    /// Five-minute telemetry tick. Keyed off the minute edge so the action
    /// fires once per matching minute rather than on every cycle inside it.
    #[must_use]
    pub const fn telemetry_tick(&self, reading: &ClockReading) -> bool {
        self.new_minute && reading.minute % TELEMETRY_PERIOD_MINUTES == 0
    }

    /// Interval persistence/reporting tick: every telemetry tick through the
    /// night, plus exactly one final tick at the 07:00 boundary so the last
    /// partial interval is flushed.
    #[must_use]
    pub const fn interval_report(&self, reading: &ClockReading) -> bool {
        (is_night_hour(reading.hour) || self.morning_report(reading)) && self.telemetry_tick(reading)
    }
}

/// Tracks the previously observed hour and minute.
///
/// Seeded from the first valid reading after boot; in-memory only and
/// re-derived on every restart.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BoundaryTracker {
    previous_hour: u8,
    previous_minute: u8,
}

impl BoundaryTracker {
    /// Creates a tracker seeded from a validated reading. The seeding reading
    /// itself reports no boundary.
    #[must_use]
    pub const fn new(reading: &ClockReading) -> Self {
        Self {
            previous_hour: reading.hour,
            previous_minute: reading.minute,
        }
    }

    /// Compares a validated reading against the previous observation and
    /// updates the tracked values.
    pub fn observe(&mut self, reading: &ClockReading) -> BoundaryReport {
        let new_hour = self.previous_hour != reading.hour;
        let new_minute = self.previous_minute != reading.minute;

        self.previous_hour = reading.hour;
        self.previous_minute = reading.minute;

        BoundaryReport {
            new_hour,
            new_minute,
        }
    }

    /// Hour recorded by the most recent observation.
    #[must_use]
    pub const fn previous_hour(&self) -> u8 {
        self.previous_hour
    }

    /// Minute recorded by the most recent observation.
    #[must_use]
    pub const fn previous_minute(&self) -> u8 {
        self.previous_minute
    }
}
