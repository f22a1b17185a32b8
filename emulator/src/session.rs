//! Interactive simulation session: a simulated clock and sensor driving the
//! real tracking core against an in-memory store.

use tracker_core::capture::CaptureConfig;
use tracker_core::clock::{ClockReading, TimeFormat, WallClock, days_in_month, time_string};
use tracker_core::console::{self, ClockSpec, Command};
use tracker_core::report::{
    DiagEvent, DisplaySink, DistanceSink, EnvironmentSink, IntervalSink, SinkError, SummarySink,
    TemperatureProbe, render_summary,
};
use tracker_core::session::{ButtonOutcome, CycleActions, SessionContext, StartupOutcome};
use tracker_core::stats::NightStats;
use tracker_core::store::{MemoryStore, load_night_stats, load_reset_marker, log_event};
use tracker_core::watchdog::CountdownRefresh;
use tracker_core::wheel::{GAP_DEBOUNCE_SAMPLES, OpticalSensor, SensorSample};

use std::collections::VecDeque;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "status",
        "status                     - show clock, wheel, capture, and uptime",
    ),
    (
        "stats",
        "stats                      - show live and durable night statistics",
    ),
    (
        "button",
        "button                     - press the recovery button",
    ),
    (
        "spin",
        "spin [count]               - feed wheel revolutions through the detector",
    ),
    (
        "clock",
        "clock HH:MM | clock YYYY-MM-DD HH:MM - set the simulated clock",
    ),
    (
        "advance",
        "advance <n>m | advance <n>h - advance the clock, one loop cycle per minute",
    ),
    (
        "reset",
        "reset                      - simulate an unplanned reboot (store survives)",
    ),
    (
        "help",
        "help [topic]               - show help for a command",
    ),
];

pub struct Session {
    context: SessionContext,
    store: MemoryStore,
    clock: SimClock,
    sensor: SimSensor,
    watchdog: SimWatchdog,
    probe: SimProbe,
    sink: RecordingSink,
    panel: Panel,
    banner: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        let mut store = MemoryStore::new();
        let clock = SimClock::new(ClockReading::new(2015, 6, 1, 12, 0, 0));
        let reading = clock.reading();
        let (context, outcome) =
            SessionContext::startup(&reading, &mut store, CaptureConfig::default())
                .expect("memory store startup cannot fail");
        log::info!("emulator session initialised at {reading}");

        let banner = vec![
            format!("simulated clock: {reading} ({})", reading.weekday().name()),
            format!("startup: {}", describe_outcome(outcome)),
        ];

        Self {
            context,
            store,
            clock,
            sensor: SimSensor::default(),
            watchdog: SimWatchdog::default(),
            probe: SimProbe::default(),
            sink: RecordingSink::default(),
            panel: Panel::default(),
            banner,
        }
    }

    pub fn banner(&self) -> &[String] {
        &self.banner
    }

    /// Handles one console line. The second element requests termination.
    pub fn handle_command(&mut self, line: &str) -> (Vec<String>, bool) {
        match console::parse(line) {
            Err(err) => (vec![format!("ERR syntax: {err}")], false),
            Ok(Command::Exit) => (Vec::new(), true),
            Ok(command) => (self.dispatch(command), false),
        }
    }

    fn dispatch(&mut self, command: Command<'_>) -> Vec<String> {
        match command {
            Command::Status => self.handle_status(),
            Command::Stats => self.handle_stats(),
            Command::Button => self.handle_button(),
            Command::Spin { count } => self.handle_spin(count),
            Command::Clock(spec) => self.handle_clock(spec),
            Command::Advance { minutes } => self.handle_advance(minutes),
            Command::Reset => self.handle_reset(),
            Command::Help { topic } => handle_help(topic),
            Command::Exit => Vec::new(),
        }
    }

    fn handle_status(&mut self) -> Vec<String> {
        let reading = self.clock.reading();
        vec![
            format!("clock: {reading} ({})", reading.weekday().name()),
            format!("wheel: {:?}", self.context.wheel()),
            format!("capture: {:?}", self.context.capture()),
            format!("interval: {} cm", self.context.interval_distance_cm()),
            format!("uptime: {} min", self.context.uptime_minutes()),
            format!("watchdog: {} refreshes", self.watchdog.refreshes),
        ]
    }

    fn handle_stats(&mut self) -> Vec<String> {
        let mut lines = vec![describe_stats("live", self.context.stats())];
        match load_night_stats(&mut self.store) {
            Ok(stats) => lines.push(describe_stats("durable", &stats)),
            Err(err) => lines.push(format!("durable: unreadable ({err:?})")),
        }
        if let Ok(at) = load_reset_marker(&mut self.store) {
            lines.push(format!("last unexpected reset: {at}"));
        }
        lines
    }

    fn handle_button(&mut self) -> Vec<String> {
        let reading = self.clock.reading();
        let outcome = self.context.handle_button(&reading, &mut self.store);

        let stats = self.context.stats();
        let (km, tenths) = stats.distance_km();
        let line2 = format!(
            "{km}.{tenths}  {}  {}",
            time_string(&stats.first_rotation, TimeFormat::Short),
            time_string(&stats.last_rotation, TimeFormat::Short),
        );
        self.panel.show("km   start end", &line2);

        let mut lines = vec![match outcome {
            ButtonOutcome::Reloaded => "durable stats reloaded into the live copy".to_string(),
            ButtonOutcome::DisplayOnly => "night window: display only, live stats kept".to_string(),
        }];
        lines.extend(self.panel.lines());
        lines
    }

    fn handle_spin(&mut self, count: u32) -> Vec<String> {
        let mut lines = Vec::new();
        let mut counted = 0u32;
        for _ in 0..count {
            self.sensor.enqueue_revolution();
            for _ in 0..SimSensor::SAMPLES_PER_REVOLUTION {
                if self.run_cycle(&mut lines).rotation_counted {
                    counted += 1;
                }
            }
        }
        lines.push(format!(
            "{count} revolutions fed, {counted} counted, session total {} m",
            self.context.stats().distance_m()
        ));
        lines
    }

    fn handle_clock(&mut self, spec: ClockSpec) -> Vec<String> {
        self.clock.set(spec);
        let reading = self.clock.reading();
        vec![format!("clock set to {reading}")]
    }

    fn handle_advance(&mut self, minutes: u32) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..minutes {
            self.clock.advance_minute();
            let _ = self.run_cycle(&mut lines);
        }
        lines.push(format!(
            "advanced {minutes} min to {}",
            self.clock.reading()
        ));
        lines
    }

    fn handle_reset(&mut self) -> Vec<String> {
        let reading = self.clock.reading();
        let (context, outcome) =
            SessionContext::startup(&reading, &mut self.store, CaptureConfig::default())
                .expect("memory store startup cannot fail");
        self.context = context;
        vec![
            "reset: context dropped, durable store kept".to_string(),
            format!("startup: {}", describe_outcome(outcome)),
        ]
    }

    /// Runs one loop cycle and narrates whatever the core asked for.
    fn run_cycle(&mut self, lines: &mut Vec<String>) -> CycleActions {
        let reading = self.clock.now();
        let sample = self.sensor.sample();
        let actions = self
            .context
            .cycle(&reading, sample, &mut self.store, &mut self.watchdog)
            .expect("memory store cycle cannot fail");
        self.apply_actions(&actions, &reading, lines);
        actions
    }

    fn apply_actions(
        &mut self,
        actions: &CycleActions,
        reading: &ClockReading,
        lines: &mut Vec<String>,
    ) {
        if actions.session_started {
            lines.push(format!(
                "[{reading}] session prepared: stats zeroed, diagnostic and reset regions cleared"
            ));
        }

        if actions.summary_due {
            let summary = render_summary(self.context.stats(), reading);
            let event = match self.sink.post_summary(summary.as_str()) {
                Ok(()) => DiagEvent::SummaryPostOk,
                Err(_) => DiagEvent::SummaryPostFailed,
            };
            let _ = log_event(&mut self.store, event);
        }

        if actions.environment_tick {
            let celsius = self.probe.read_celsius();
            let _ = self
                .sink
                .post_environment(celsius, self.context.uptime_minutes());
        }

        if let Some(distance_cm) = actions.interval_distance_cm {
            let event = match self.sink.post_interval(distance_cm, reading) {
                Ok(()) => DiagEvent::IntervalPushOk,
                Err(_) => DiagEvent::IntervalPushFailed,
            };
            let _ = log_event(&mut self.store, event);

            let event = match self.sink.post_distance(self.context.stats().distance_m()) {
                Ok(()) => DiagEvent::FeedPushOk,
                Err(_) => DiagEvent::FeedPushFailed,
            };
            let _ = log_event(&mut self.store, event);
        }

        if actions.daytime_zero_report {
            let _ = self.sink.post_distance(0);
        }

        lines.extend(self.sink.drain());
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_outcome(outcome: StartupOutcome) -> &'static str {
    match outcome {
        StartupOutcome::FreshSession => "fresh session (warm-up engaged)",
        StartupOutcome::ResumedSession => "resumed night session from the durable store",
    }
}

fn describe_stats(label: &str, stats: &NightStats) -> String {
    let (km, tenths) = stats.distance_km();
    format!(
        "{label}: {km}.{tenths} km, first {}, last {}",
        time_string(&stats.first_rotation, TimeFormat::Long),
        time_string(&stats.last_rotation, TimeFormat::Long),
    )
}

fn handle_help(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    let mut buffer = String::new();
    for (index, (name, _)) in HELP_TOPICS.iter().enumerate() {
        if index > 0 {
            buffer.push_str(", ");
        }
        buffer.push_str(name);
    }
    buffer
}

/// Settable, minute-steppable wall clock.
struct SimClock {
    reading: ClockReading,
}

impl SimClock {
    fn new(reading: ClockReading) -> Self {
        Self { reading }
    }

    fn reading(&self) -> ClockReading {
        self.reading
    }

    fn set(&mut self, spec: ClockSpec) {
        match spec {
            ClockSpec::TimeOfDay { hour, minute } => {
                self.reading.hour = hour;
                self.reading.minute = minute;
                self.reading.second = 0;
            }
            ClockSpec::Full {
                year,
                month,
                day,
                hour,
                minute,
            } => {
                self.reading = ClockReading::new(year, month, day, hour, minute, 0);
            }
        }
    }

    /// Advances one minute with calendar rollover. Out-of-range fields set by
    /// a corruption experiment normalise on the next boundary they cross, so
    /// every step saturates instead of wrapping.
    fn advance_minute(&mut self) {
        let reading = &mut self.reading;
        reading.second = 0;
        reading.minute = reading.minute.saturating_add(1);
        if reading.minute >= 60 {
            reading.minute = 0;
            reading.hour = reading.hour.saturating_add(1);
            if reading.hour >= 24 {
                reading.hour = 0;
                reading.day = reading.day.saturating_add(1);
                if reading.day > days_in_month(reading.year, reading.month) {
                    reading.day = 1;
                    reading.month = reading.month.saturating_add(1);
                    if reading.month > 12 {
                        reading.month = 1;
                        reading.year = reading.year.saturating_add(1);
                    }
                }
            }
        }
    }
}

impl WallClock for SimClock {
    fn now(&mut self) -> ClockReading {
        self.reading
    }
}

/// Scripted optical sensor: `spin` queues sample trains, idle reads as gap.
#[derive(Default)]
struct SimSensor {
    pending: VecDeque<SensorSample>,
}

impl SimSensor {
    const SAMPLES_PER_REVOLUTION: usize = 1 + GAP_DEBOUNCE_SAMPLES as usize;

    /// Queues one mark pulse followed by a full debounce run of gaps.
    fn enqueue_revolution(&mut self) {
        self.pending.push_back(SensorSample::Mark);
        for _ in 0..GAP_DEBOUNCE_SAMPLES {
            self.pending.push_back(SensorSample::Gap);
        }
    }
}

impl OpticalSensor for SimSensor {
    fn sample(&mut self) -> SensorSample {
        self.pending.pop_front().unwrap_or(SensorSample::Gap)
    }
}

/// Watchdog that counts refreshes instead of arming a hardware timer.
#[derive(Default)]
struct SimWatchdog {
    refreshes: u64,
}

impl CountdownRefresh for SimWatchdog {
    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

/// Constant-temperature probe; enough to exercise the environment feed.
struct SimProbe {
    celsius: f32,
}

impl Default for SimProbe {
    fn default() -> Self {
        Self { celsius: 21.5 }
    }
}

impl TemperatureProbe for SimProbe {
    fn read_celsius(&mut self) -> f32 {
        self.celsius
    }
}

/// Sink that records every emission for the command response.
#[derive(Default)]
struct RecordingSink {
    emissions: Vec<String>,
}

impl RecordingSink {
    fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.emissions)
    }
}

impl IntervalSink for RecordingSink {
    fn post_interval(&mut self, distance_cm: u32, at: &ClockReading) -> Result<(), SinkError> {
        self.emissions.push(format!(
            "[interval] {distance_cm} cm at {}",
            time_string(at, TimeFormat::Long)
        ));
        Ok(())
    }
}

impl DistanceSink for RecordingSink {
    fn post_distance(&mut self, total_m: u32) -> Result<(), SinkError> {
        self.emissions.push(format!("[distance-feed] {total_m} m"));
        Ok(())
    }
}

impl EnvironmentSink for RecordingSink {
    fn post_environment(&mut self, celsius: f32, uptime_minutes: u32) -> Result<(), SinkError> {
        self.emissions.push(format!(
            "[environment] {celsius:.1} C, uptime {uptime_minutes} min"
        ));
        Ok(())
    }
}

impl SummarySink for RecordingSink {
    fn post_summary(&mut self, summary: &str) -> Result<(), SinkError> {
        self.emissions.push(format!("[summary] {summary}"));
        Ok(())
    }
}

/// Two-line panel standing in for the character display.
#[derive(Default)]
struct Panel {
    line1: String,
    line2: String,
}

impl Panel {
    fn lines(&self) -> [String; 2] {
        [
            format!("[panel] {}", self.line1),
            format!("[panel] {}", self.line2),
        ]
    }
}

impl DisplaySink for Panel {
    fn show(&mut self, line1: &str, line2: &str) {
        self.line1 = line1.to_string();
        self.line2 = line2.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(session: &mut Session, lines: &[&str]) -> Vec<String> {
        let mut output = Vec::new();
        for line in lines {
            let (responses, _) = session.handle_command(line);
            output.extend(responses);
        }
        output
    }

    #[test]
    fn full_night_produces_interval_and_summary_emissions() {
        let mut session = Session::new();
        let output = commands(
            &mut session,
            &[
                "clock 21:59",
                "advance 2m",
                "spin 15",
                "advance 8m",
                "advance 9h",
            ],
        );

        assert!(output.iter().any(|line| line.starts_with("[interval]")));
        assert!(output.iter().any(|line| line.starts_with("[distance-feed]")));
        assert!(output.iter().any(|line| line.starts_with("[summary]")));
        assert!(
            output
                .iter()
                .any(|line| line.contains("session prepared"))
        );
    }

    #[test]
    fn reset_at_night_resumes_from_the_store() {
        let mut session = Session::new();
        let _ = commands(
            &mut session,
            &["clock 21:59", "advance 2m", "spin 15", "advance 5m"],
        );
        let total_before = session.context.stats().total_distance_cm;
        assert!(total_before > 0);

        let (responses, _) = session.handle_command("reset");
        assert!(responses.iter().any(|line| line.contains("resumed")));
        assert_eq!(session.context.stats().total_distance_cm, total_before);
    }

    #[test]
    fn syntax_errors_are_reported_not_fatal() {
        let mut session = Session::new();
        let (responses, terminate) = session.handle_command("advance");
        assert!(!terminate);
        assert!(responses[0].starts_with("ERR syntax"));
    }

    #[test]
    fn exit_terminates_the_session() {
        let mut session = Session::new();
        let (_, terminate) = session.handle_command("exit");
        assert!(terminate);
    }

    #[test]
    fn daytime_spins_do_not_count() {
        let mut session = Session::new();
        let _ = session.handle_command("spin 30");
        assert!(session.context.stats().is_empty());
    }

    #[test]
    fn implausible_readings_normalise_when_advanced() {
        let mut session = Session::new();
        let _ = commands(&mut session, &["clock 12:255", "advance 1m"]);

        let reading = session.clock.reading();
        assert_eq!((reading.hour, reading.minute), (13, 0));

        // A corrupted hour clears on its own rollover.
        let _ = commands(&mut session, &["clock 153:59", "advance 1m"]);
        assert_eq!(session.clock.reading().hour, 0);
    }

    #[test]
    fn every_loop_cycle_refreshes_the_watchdog() {
        let mut session = Session::new();
        let _ = session.handle_command("advance 3m");
        assert_eq!(session.watchdog.refreshes, 3);

        let _ = session.handle_command("spin 1");
        assert_eq!(
            session.watchdog.refreshes,
            3 + SimSensor::SAMPLES_PER_REVOLUTION as u64
        );
    }
}
