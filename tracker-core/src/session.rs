//! Control-loop state, startup recovery, and the per-cycle protocol.
//!
//! [`SessionContext`] owns every piece of mutable tracking state. One call to
//! [`SessionContext::cycle`] corresponds to one pass of the device loop: read
//! the clock, sample the sensor, evaluate boundaries, and hand the embedding
//! a [`CycleActions`] describing the outward-facing work it must perform.
//! The core persists what must survive a crash but never touches a transport
//! itself.

use crate::capture::{CaptureConfig, CaptureState};
use crate::clock::ClockReading;
use crate::schedule::{BoundaryTracker, is_day_hour};
use crate::stats::{IntervalAccumulator, NightStats};
use crate::store::{
    DurableStore, RecordError, clear_reset_marker, init_diag_log, load_night_stats,
    save_night_stats, save_reset_marker,
};
use crate::watchdog::CountdownRefresh;
use crate::wheel::{SensorSample, WheelState};

/// How startup classified the boot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StartupOutcome {
    /// Daytime boot: state zeroed, warm-up gate engaged.
    FreshSession,
    /// Night-window boot: durable statistics reloaded so the session
    /// continues where the crash interrupted it.
    ResumedSession,
}

/// Outward-facing work one loop cycle produced.
///
/// The embedding owns all transports; the core reports what is due and has
/// already updated and persisted its own state accordingly.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CycleActions {
    /// The 22:00 boundary fired and a new session was prepared.
    pub session_started: bool,
    /// The 07:00 boundary fired; the morning summary should be posted.
    pub summary_due: bool,
    /// Five-minute tick: temperature and uptime are due on the environment
    /// feed.
    pub environment_tick: bool,
    /// Night-window interval tick: the taken interval distance, due on the
    /// interval sink alongside the session total.
    pub interval_distance_cm: Option<u32>,
    /// Daytime five-minute tick: push an explicit zero to the distance feed.
    pub daytime_zero_report: bool,
    /// A confirmed revolution was counted this cycle.
    pub rotation_counted: bool,
}

/// Result of a manual button press.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonOutcome {
    /// Day window: durable statistics were reloaded into the live copy.
    Reloaded,
    /// Night window: live statistics left untouched, display only.
    DisplayOnly,
}

/// All mutable tracking state for one device lifetime.
#[derive(Copy, Clone, Debug)]
pub struct SessionContext {
    stats: NightStats,
    interval: IntervalAccumulator,
    capture: CaptureState,
    wheel: WheelState,
    boundary: BoundaryTracker,
    uptime_minutes: u32,
    config: CaptureConfig,
}

impl SessionContext {
    /// Builds the context for a boot at `now` and runs the recovery
    /// protocol against the durable store.
    ///
    /// A daytime boot is treated as planned: the session is zeroed and
    /// persisted, and rotations are gated through warm-up. A night-window
    /// boot is treated as an unexpected restart mid-session: the durable
    /// statistics become the live copy, capture goes straight to `Active`,
    /// and the restart time is recorded for morning inspection.
    pub fn startup<S: DurableStore>(
        now: &ClockReading,
        store: &mut S,
        config: CaptureConfig,
    ) -> Result<(Self, StartupOutcome), RecordError<S::Error>> {
        let mut context = Self {
            stats: NightStats::default(),
            interval: IntervalAccumulator::new(),
            capture: CaptureState::warmup(),
            wheel: WheelState::calibrate(),
            boundary: BoundaryTracker::new(now),
            uptime_minutes: 0,
            config,
        };

        if is_day_hour(now.hour) {
            context.stats.begin_new_session(*now);
            save_night_stats(store, &context.stats)?;
            log::info!("daytime boot at {now}, fresh session");
            return Ok((context, StartupOutcome::FreshSession));
        }

        match load_night_stats(store) {
            Ok(stats) => context.stats = stats,
            Err(err) => {
                // Nothing usable in the region; run the remainder of the
                // night from zero rather than refusing to start.
                log::warn!("night stats unreadable at boot ({err:?}), starting empty");
                context.stats.begin_new_session(*now);
            }
        }
        context.capture = CaptureState::Active;
        save_reset_marker(store, now)?;
        log::warn!("night-window boot at {now}, resuming session");
        Ok((context, StartupOutcome::ResumedSession))
    }

    /// Runs one loop cycle.
    ///
    /// The watchdog is refreshed first, unconditionally: a pass that does
    /// nothing else still proves the loop is alive. An implausible clock
    /// reading suppresses all scheduling for the cycle; the wheel machine
    /// still advances so the detector stays oriented, but any rotation it
    /// emits has no trustworthy timestamp and is dropped.
    pub fn cycle<S: DurableStore, W: CountdownRefresh>(
        &mut self,
        reading: &ClockReading,
        sample: SensorSample,
        store: &mut S,
        watchdog: &mut W,
    ) -> Result<CycleActions, RecordError<S::Error>> {
        watchdog.refresh();
        let mut actions = CycleActions::default();

        let (wheel, rotation) = self.wheel.step(sample);
        self.wheel = wheel;

        if !reading.is_valid_hour() {
            log::warn!("implausible clock reading {reading}, cycle suppressed");
            return Ok(actions);
        }

        if rotation.is_some() {
            let (capture, decision) = self.capture.admit(reading.hour, &self.config);
            self.capture = capture;
            if decision.counts() {
                self.stats.apply_rotation(*reading);
                self.interval.add_rotation();
                actions.rotation_counted = true;
            }
        }

        let boundary = self.boundary.observe(reading);

        if boundary.session_start(reading) {
            self.begin_session(reading, store)?;
            actions.session_started = true;
        }

        actions.summary_due = boundary.morning_report(reading);

        if boundary.telemetry_tick(reading) {
            actions.environment_tick = true;
            self.uptime_minutes += 5;

            if boundary.interval_report(reading) {
                save_night_stats(store, &self.stats)?;
                actions.interval_distance_cm = Some(self.interval.take());
            } else {
                actions.daytime_zero_report = true;
            }
        }

        Ok(actions)
    }

    /// One-time preparation for the upcoming night: every piece of session
    /// state is zeroed, the fresh record is persisted, and the diagnostic
    /// and reset-marker regions are cleared so the morning dump only shows
    /// what this night wrote.
    fn begin_session<S: DurableStore>(
        &mut self,
        now: &ClockReading,
        store: &mut S,
    ) -> Result<(), RecordError<S::Error>> {
        self.wheel = WheelState::calibrate();
        self.capture = CaptureState::warmup();
        self.stats.begin_new_session(*now);
        self.interval = IntervalAccumulator::new();
        save_night_stats(store, &self.stats)?;
        init_diag_log(store)?;
        clear_reset_marker(store)?;
        log::info!("session started at {now}");
        Ok(())
    }

    /// Manual recovery trigger.
    ///
    /// Only honoured in the day window: reloading at night would clobber
    /// live statistics that have not been persisted since the last interval
    /// tick.
    pub fn handle_button<S: DurableStore>(
        &mut self,
        reading: &ClockReading,
        store: &mut S,
    ) -> ButtonOutcome {
        if !is_day_hour(reading.hour) {
            return ButtonOutcome::DisplayOnly;
        }
        match load_night_stats(store) {
            Ok(stats) => {
                self.stats = stats;
                log::info!("night stats reloaded on button press");
                ButtonOutcome::Reloaded
            }
            Err(err) => {
                log::warn!("button reload failed ({err:?}), keeping live stats");
                ButtonOutcome::DisplayOnly
            }
        }
    }

    /// Live statistics for the current or most recent session.
    #[must_use]
    pub const fn stats(&self) -> &NightStats {
        &self.stats
    }

    /// Distance accumulated in the current 5-minute interval.
    #[must_use]
    pub const fn interval_distance_cm(&self) -> u32 {
        self.interval.distance_cm()
    }

    /// Current capture gate state.
    #[must_use]
    pub const fn capture(&self) -> CaptureState {
        self.capture
    }

    /// Current wheel detector state.
    #[must_use]
    pub const fn wheel(&self) -> WheelState {
        self.wheel
    }

    /// Minutes of uptime reported so far, advancing in steps of five.
    #[must_use]
    pub const fn uptime_minutes(&self) -> u32 {
        self.uptime_minutes
    }
}
