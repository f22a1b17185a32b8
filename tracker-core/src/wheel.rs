//! Debounced rotation detection for the optical wheel sensor.
//!
//! A reflective mark on the wheel passes the sensor once per revolution and
//! produces a run of "mark" samples; the rest of the rim reads as "gap". The
//! detector is a three-state machine that emits exactly one [`Rotation`] per
//! mark-then-sustained-gap cycle. Debouncing happens on the trailing edge: a
//! mark only re-arms the detector after [`GAP_DEBOUNCE_SAMPLES`] consecutive
//! gap samples, so sensor noise or a slowly passing mark cannot be counted as
//! multiple revolutions.

/// Consecutive gap samples required before the detector re-arms.
///
/// At the loop cadence of [`SAMPLE_PERIOD_MS`] this corresponds to roughly
/// 40 ms of confirmed gap.
pub const GAP_DEBOUNCE_SAMPLES: u8 = 21;

/// Nominal delay between sensor samples, in milliseconds.
pub const SAMPLE_PERIOD_MS: u32 = 2;

/// One raw optical sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorSample {
    /// The reflective mark is in front of the sensor.
    Mark,
    /// Plain wheel surface.
    Gap,
}

/// Source of raw optical samples, polled once per loop cycle.
pub trait OpticalSensor {
    fn sample(&mut self) -> SensorSample;
}

/// One confirmed wheel revolution.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rotation;

/// Debounce state for the optical sensor.
///
/// Scoped to the lifetime of the device and never persisted; a restart
/// re-enters [`WheelState::Calibrate`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WheelState {
    /// Startup orientation step: a single sample decides whether the mark is
    /// currently in front of the sensor. Emits no rotation.
    Calibrate,
    /// Armed; the next mark sample is a revolution.
    AwaitMark,
    /// Mark seen; waiting for a sustained gap before re-arming.
    AwaitGap {
        /// Consecutive gap samples observed so far.
        gap_run: u8,
    },
}

impl WheelState {
    /// Initial state, also re-entered at every night-session reset.
    #[must_use]
    pub const fn calibrate() -> Self {
        WheelState::Calibrate
    }

    /// Returns `true` when the detector is armed for the next mark.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        matches!(self, WheelState::AwaitMark)
    }

    /// Advances the machine by one sample.
    ///
    /// Returns the next state and, for a confirmed revolution, one
    /// [`Rotation`] event. Total over all inputs; no sample sequence can
    /// produce more than one event per call.
    #[must_use]
    pub fn step(self, sample: SensorSample) -> (Self, Option<Rotation>) {
        match (self, sample) {
            (WheelState::Calibrate, SensorSample::Mark) => {
                (WheelState::AwaitGap { gap_run: 0 }, None)
            }
            (WheelState::Calibrate, SensorSample::Gap) => (WheelState::AwaitMark, None),
            (WheelState::AwaitMark, SensorSample::Mark) => {
                (WheelState::AwaitGap { gap_run: 0 }, Some(Rotation))
            }
            (WheelState::AwaitMark, SensorSample::Gap) => (WheelState::AwaitMark, None),
            (WheelState::AwaitGap { gap_run }, SensorSample::Gap) => {
                let gap_run = gap_run.saturating_add(1);
                if gap_run >= GAP_DEBOUNCE_SAMPLES {
                    (WheelState::AwaitMark, None)
                } else {
                    (WheelState::AwaitGap { gap_run }, None)
                }
            }
            (WheelState::AwaitGap { .. }, SensorSample::Mark) => {
                (WheelState::AwaitGap { gap_run: 0 }, None)
            }
        }
    }
}
