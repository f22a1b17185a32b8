//! Wall-clock readings, validation, and calendar helpers shared by all targets.
//!
//! The external RTC is reached over a marginal I2C run and occasionally
//! returns garbage (an observed failure mode is `HH:MM = 153:165`). Every
//! reading therefore passes through [`ClockReading::is_valid_hour`] before it
//! may influence scheduling or statistics; an implausible reading is simply
//! discarded for that loop cycle.

use core::fmt::{self, Write as _};

use heapless::String;
use serde::{Deserialize, Serialize};

/// Calendar timestamp as reported by the RTC collaborator.
///
/// Fields are stored exactly as read; validation is a separate, explicit
/// step so a corrupted read can be observed and rejected rather than
/// silently wrapped.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClockReading {
    #[serde(with = "postcard::fixint::le")]
    pub year: u16,
    /// 1-based month.
    pub month: u8,
    /// 1-based day of month.
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockReading {
    /// Constructs a reading from calendar components.
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Returns `true` when the hour field is plausible (0..=23).
    ///
    /// This is the only corruption check the hardware failure mode requires;
    /// minutes have never been observed bogus without the hour also being
    /// bogus.
    #[must_use]
    pub const fn is_valid_hour(&self) -> bool {
        self.hour <= 23
    }

    /// Day of week for this reading, derived from the date fields.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        Weekday::from_index(sakamoto_weekday(self.year, self.month, self.day))
    }
}

impl fmt::Display for ClockReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Source of wall-clock readings (the RTC device behind its bus driver).
pub trait WallClock {
    /// Reads the current calendar time. May return an implausible reading;
    /// callers must gate on [`ClockReading::is_valid_hour`].
    fn now(&mut self) -> ClockReading;
}

/// Days of the week, Sunday-first to match the RTC library convention.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Deterministic Sunday-based index.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Weekday::Sunday => 0,
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
        }
    }

    /// Constructs a weekday from a Sunday-based index, wrapping modulo 7.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        match index % 7 {
            0 => Weekday::Sunday,
            1 => Weekday::Monday,
            2 => Weekday::Tuesday,
            3 => Weekday::Wednesday,
            4 => Weekday::Thursday,
            5 => Weekday::Friday,
            _ => Weekday::Saturday,
        }
    }

    /// Full English name, as used by the session summary.
    #[must_use]
    pub const fn name(self) -> &'static str {
        WEEKDAY_NAMES[self.as_index()]
    }
}

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Full English month name for a 1-based month number.
///
/// Out-of-range months clamp to January; the summary string must never index
/// out of bounds on a corrupted date.
#[must_use]
pub fn month_name(month: u8) -> &'static str {
    if (1..=12).contains(&month) {
        MONTH_NAMES[(month - 1) as usize]
    } else {
        MONTH_NAMES[0]
    }
}

/// Rendering style for [`time_string`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimeFormat {
    /// `"9:05"` — used on the compact display.
    Short,
    /// `"9:05 PM"` — used in summaries and diagnostics.
    Long,
}

/// Maximum rendered length of a formatted time (`"12:59 PM"`).
pub const TIME_STRING_CAPACITY: usize = 12;

/// Renders a reading's time-of-day in 12-hour notation.
#[must_use]
pub fn time_string(reading: &ClockReading, format: TimeFormat) -> String<TIME_STRING_CAPACITY> {
    let mut hour = reading.hour;
    let meridiem = if hour == 12 {
        "PM"
    } else if hour < 13 {
        // Midnight through 00:59 reads as 12 AM.
        if hour == 0 {
            hour = 12;
        }
        "AM"
    } else {
        hour -= 12;
        "PM"
    };

    let mut out = String::new();
    let result = match format {
        TimeFormat::Long => write!(out, "{}:{:02} {}", hour, reading.minute, meridiem),
        TimeFormat::Short => write!(out, "{}:{:02}", hour, reading.minute),
    };
    debug_assert!(result.is_ok());
    out
}

/// Number of days in the given month, accounting for leap years.
#[must_use]
pub const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// Gregorian leap-year rule.
#[must_use]
pub const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Sakamoto's method; returns a Sunday-based weekday index.
fn sakamoto_weekday(year: u16, month: u8, day: u8) -> usize {
    const OFFSETS: [u16; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
    let month = month.clamp(1, 12);
    let mut y = year;
    if month < 3 {
        y = y.saturating_sub(1);
    }
    let index =
        (y + y / 4 - y / 100 + y / 400 + OFFSETS[(month - 1) as usize] + u16::from(day)) % 7;
    index as usize
}
