//! Outbound reporting: sink traits, diagnostic event codes, and summary text.
//!
//! Every external feed sits behind a fire-and-forget trait so the core never
//! blocks on a transport. A failed post is recorded in the diagnostic region
//! by event code and never retried; the next tick carries fresher data
//! anyway.

use core::fmt::Write as _;

use heapless::String;

use crate::clock::{ClockReading, TimeFormat, month_name, time_string};
use crate::stats::NightStats;

/// Failure surfaced by a reporting sink.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SinkError {
    /// Transport could not be reached.
    Unreachable,
    /// Remote end refused the payload.
    Rejected,
}

/// Receives the distance accumulated over one 5-minute interval.
pub trait IntervalSink {
    fn post_interval(&mut self, distance_cm: u32, at: &ClockReading) -> Result<(), SinkError>;
}

/// Receives the running session total, in whole metres.
pub trait DistanceSink {
    fn post_distance(&mut self, total_m: u32) -> Result<(), SinkError>;
}

/// Receives ambient telemetry alongside the uptime counter.
pub trait EnvironmentSink {
    fn post_environment(&mut self, celsius: f32, uptime_minutes: u32) -> Result<(), SinkError>;
}

/// Receives the formatted morning summary.
pub trait SummarySink {
    fn post_summary(&mut self, summary: &str) -> Result<(), SinkError>;
}

/// Two-line text panel. Display updates are best-effort and infallible.
pub trait DisplaySink {
    fn show(&mut self, line1: &str, line2: &str);
}

/// Ambient temperature source, read once per environment tick.
pub trait TemperatureProbe {
    fn read_celsius(&mut self) -> f32;
}

/// Diagnostic event codes, one durable byte slot each.
///
/// `to_raw` doubles as the slot index, so the codes are part of the stored
/// layout and must stay stable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiagEvent {
    StartMarker,
    SummaryPostOk,
    SummaryPostFailed,
    IntervalPushOk,
    IntervalPushFailed,
    FeedPushOk,
    FeedPushFailed,
    EndMarker,
}

impl DiagEvent {
    /// Number of byte slots the diagnostic region occupies.
    pub const SLOT_COUNT: usize = 8;

    /// Compact wire/storage code.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            DiagEvent::StartMarker => 0,
            DiagEvent::SummaryPostOk => 1,
            DiagEvent::SummaryPostFailed => 2,
            DiagEvent::IntervalPushOk => 3,
            DiagEvent::IntervalPushFailed => 4,
            DiagEvent::FeedPushOk => 5,
            DiagEvent::FeedPushFailed => 6,
            DiagEvent::EndMarker => 7,
        }
    }

    /// Decodes a stored code.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(DiagEvent::StartMarker),
            1 => Some(DiagEvent::SummaryPostOk),
            2 => Some(DiagEvent::SummaryPostFailed),
            3 => Some(DiagEvent::IntervalPushOk),
            4 => Some(DiagEvent::IntervalPushFailed),
            5 => Some(DiagEvent::FeedPushOk),
            6 => Some(DiagEvent::FeedPushFailed),
            7 => Some(DiagEvent::EndMarker),
            _ => None,
        }
    }
}

/// Maximum rendered length of a session summary.
pub const SUMMARY_CAPACITY: usize = 160;

/// Renders the morning summary for the night that just ended.
///
/// `today` supplies the calendar date; the rotation timestamps come from the
/// statistics record.
#[must_use]
pub fn render_summary(stats: &NightStats, today: &ClockReading) -> String<SUMMARY_CAPACITY> {
    let (km, tenths) = stats.distance_km();
    let start = time_string(&stats.first_rotation, TimeFormat::Long);
    let finish = time_string(&stats.last_rotation, TimeFormat::Long);

    let mut out = String::new();
    let result = write!(
        out,
        "Night run update for {} {} {} {}: ran {}.{} km, start {}, finish {}",
        today.weekday().name(),
        month_name(today.month),
        today.day,
        today.year,
        km,
        tenths,
        start,
        finish,
    );
    debug_assert!(result.is_ok());
    out
}

/// Sink that accepts and discards everything; default wiring and tests.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl IntervalSink for NullSink {
    fn post_interval(&mut self, _distance_cm: u32, _at: &ClockReading) -> Result<(), SinkError> {
        Ok(())
    }
}

impl DistanceSink for NullSink {
    fn post_distance(&mut self, _total_m: u32) -> Result<(), SinkError> {
        Ok(())
    }
}

impl EnvironmentSink for NullSink {
    fn post_environment(&mut self, _celsius: f32, _uptime_minutes: u32) -> Result<(), SinkError> {
        Ok(())
    }
}

impl SummarySink for NullSink {
    fn post_summary(&mut self, _summary: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

impl DisplaySink for NullSink {
    fn show(&mut self, _line1: &str, _line2: &str) {}
}
