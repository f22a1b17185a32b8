//! Command grammar for the emulator console.
//!
//! Lines are parsed into typed [`Command`] values with `winnow` combinators.
//! The grammar stays deliberately permissive about ranges: `clock 153:165`
//! parses, because feeding an implausible reading through the loop is exactly
//! how the corrupted-RTC path is exercised.

use core::fmt;
use core::str::FromStr;

use winnow::ascii::{Caseless, digit1, space0, space1};
use winnow::combinator::{alt, cut_err, eof, opt, preceded, separated_pair, terminated};
use winnow::error::{AddContext, ErrMode, ModalResult, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;
use winnow::token::{one_of, take_while};

/// One parsed console command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    /// Show loop state: clock, wheel, capture, boundaries.
    Status,
    /// Show live and durable night statistics.
    Stats,
    /// Press the recovery button.
    Button,
    /// Run `count` full wheel revolutions through the detector.
    Spin { count: u32 },
    /// Set the simulated clock.
    Clock(ClockSpec),
    /// Advance the simulated clock, running one cycle per minute.
    Advance { minutes: u32 },
    /// Simulate an unplanned reboot: state dropped, store kept.
    Reset,
    /// Describe the available commands.
    Help { topic: Option<&'a str> },
    /// Leave the console.
    Exit,
}

/// Argument forms accepted by the `clock` command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClockSpec {
    /// `clock HH:MM` — time of day only, date untouched.
    TimeOfDay { hour: u8, minute: u8 },
    /// `clock YYYY-MM-DD HH:MM` — full calendar timestamp.
    Full {
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
    },
}

/// Parse failure carrying a description of what the grammar expected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CommandError {
    pub expected: &'static str,
}

impl CommandError {
    const fn expecting(expected: &'static str) -> Self {
        Self { expected }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}", self.expected)
    }
}

impl<'i> ParserError<&'i str> for CommandError {
    type Inner = Self;

    fn from_input(_input: &&'i str) -> Self {
        Self::expecting("a command keyword")
    }

    fn into_inner(self) -> Result<Self::Inner, Self> {
        Ok(self)
    }

    fn or(self, other: Self) -> Self {
        other
    }
}

impl<'i> AddContext<&'i str, &'static str> for CommandError {
    fn add_context(
        mut self,
        _input: &&'i str,
        _token_start: &<&'i str as Stream>::Checkpoint,
        context: &'static str,
    ) -> Self {
        self.expected = context;
        self
    }
}

type CommandResult<T> = ModalResult<T, CommandError>;

/// Parses one console line.
pub fn parse(line: &str) -> Result<Command<'_>, CommandError> {
    let mut input = line.trim();
    match command.parse_next(&mut input) {
        Ok(command) => Ok(command),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(err),
        Err(ErrMode::Incomplete(_)) => Err(CommandError::expecting("a complete command")),
    }
}

fn command<'a>(input: &mut &'a str) -> CommandResult<Command<'a>> {
    terminated(
        alt((
            Caseless("status").value(Command::Status),
            Caseless("stats").value(Command::Stats),
            Caseless("button").value(Command::Button),
            spin,
            clock,
            advance,
            Caseless("reset").value(Command::Reset),
            help,
            Caseless("exit").value(Command::Exit),
            Caseless("quit").value(Command::Exit),
        )),
        (space0, eof).context("the end of the line"),
    )
    .parse_next(input)
}

fn spin<'a>(input: &mut &'a str) -> CommandResult<Command<'a>> {
    preceded(
        Caseless("spin"),
        opt(preceded(space1, cut_err(number::<u32>).context("a revolution count"))),
    )
    .map(|count| Command::Spin {
        count: count.unwrap_or(1),
    })
    .parse_next(input)
}

fn clock<'a>(input: &mut &'a str) -> CommandResult<Command<'a>> {
    preceded(
        Caseless("clock"),
        cut_err(preceded(space1, clock_spec)).context("HH:MM or YYYY-MM-DD HH:MM"),
    )
    .map(Command::Clock)
    .parse_next(input)
}

fn clock_spec(input: &mut &str) -> CommandResult<ClockSpec> {
    alt((
        (date, space1, time).map(|((year, month, day), _, (hour, minute))| ClockSpec::Full {
            year,
            month,
            day,
            hour,
            minute,
        }),
        time.map(|(hour, minute)| ClockSpec::TimeOfDay { hour, minute }),
    ))
    .parse_next(input)
}

fn date(input: &mut &str) -> CommandResult<(u16, u8, u8)> {
    (number::<u16>, '-', number::<u8>, '-', number::<u8>)
        .map(|(year, _, month, _, day)| (year, month, day))
        .parse_next(input)
}

fn time(input: &mut &str) -> CommandResult<(u8, u8)> {
    separated_pair(number::<u8>, ':', number::<u8>).parse_next(input)
}

fn advance<'a>(input: &mut &'a str) -> CommandResult<Command<'a>> {
    preceded(
        Caseless("advance"),
        cut_err(preceded(space1, advance_span)).context("<n>m or <n>h"),
    )
    .map(|minutes| Command::Advance { minutes })
    .parse_next(input)
}

fn advance_span(input: &mut &str) -> CommandResult<u32> {
    (number::<u32>, one_of(['m', 'h', 'M', 'H']))
        .map(|(count, unit)| {
            if unit.eq_ignore_ascii_case(&'h') {
                count.saturating_mul(60)
            } else {
                count
            }
        })
        .parse_next(input)
}

fn help<'a>(input: &mut &'a str) -> CommandResult<Command<'a>> {
    preceded(Caseless("help"), opt(preceded(space1, topic)))
        .map(|topic| Command::Help { topic })
        .parse_next(input)
}

fn topic<'a>(input: &mut &'a str) -> CommandResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric()).parse_next(input)
}

fn number<T: FromStr>(input: &mut &str) -> CommandResult<T> {
    let digits = digit1.parse_next(input)?;
    digits
        .parse()
        .map_err(|_| ErrMode::Cut(CommandError::expecting("a smaller number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(line: &str) -> Command<'_> {
        parse(line).expect("command should parse")
    }

    #[test]
    fn parses_bare_keywords() {
        assert_eq!(parse_ok("status"), Command::Status);
        assert_eq!(parse_ok("stats"), Command::Stats);
        assert_eq!(parse_ok("button"), Command::Button);
        assert_eq!(parse_ok("reset"), Command::Reset);
        assert_eq!(parse_ok("exit"), Command::Exit);
        assert_eq!(parse_ok("quit"), Command::Exit);
    }

    #[test]
    fn spin_defaults_to_one_revolution() {
        assert_eq!(parse_ok("spin"), Command::Spin { count: 1 });
        assert_eq!(parse_ok("spin 40"), Command::Spin { count: 40 });
    }

    #[test]
    fn clock_accepts_both_argument_forms() {
        assert_eq!(
            parse_ok("clock 22:00"),
            Command::Clock(ClockSpec::TimeOfDay {
                hour: 22,
                minute: 0,
            })
        );
        assert_eq!(
            parse_ok("clock 2015-06-01 21:55"),
            Command::Clock(ClockSpec::Full {
                year: 2015,
                month: 6,
                day: 1,
                hour: 21,
                minute: 55,
            })
        );
    }

    #[test]
    fn clock_allows_implausible_readings() {
        // Deliberately out of range; used to exercise the corrupted-RTC path.
        assert_eq!(
            parse_ok("clock 153:165"),
            Command::Clock(ClockSpec::TimeOfDay {
                hour: 153,
                minute: 165,
            })
        );
    }

    #[test]
    fn advance_converts_hours_to_minutes() {
        assert_eq!(parse_ok("advance 5m"), Command::Advance { minutes: 5 });
        assert_eq!(parse_ok("advance 2h"), Command::Advance { minutes: 120 });
        assert_eq!(parse_ok("advance 2H"), Command::Advance { minutes: 120 });
    }

    #[test]
    fn help_topic_is_optional() {
        assert_eq!(parse_ok("help"), Command::Help { topic: None });
        assert_eq!(
            parse_ok("help spin"),
            Command::Help {
                topic: Some("spin"),
            }
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(parse_ok("StAtUs"), Command::Status);
        assert_eq!(parse_ok("SPIN 3"), Command::Spin { count: 3 });
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse_ok("  status  "), Command::Status);
    }

    #[test]
    fn missing_clock_argument_names_the_expectation() {
        let err = parse("clock").unwrap_err();
        assert_eq!(err.expected, "HH:MM or YYYY-MM-DD HH:MM");
    }

    #[test]
    fn bad_advance_unit_is_rejected() {
        assert!(parse("advance 5x").is_err());
        assert!(parse("advance").is_err());
    }

    #[test]
    fn oversized_numbers_are_rejected_not_wrapped() {
        let err = parse("clock 300:00").unwrap_err();
        // The cut from the number parser surfaces through the clock context.
        assert!(parse("clock 22:00").is_ok());
        assert_eq!(err.expected, "HH:MM or YYYY-MM-DD HH:MM");
    }

    #[test]
    fn unknown_keywords_fall_back_to_the_keyword_expectation() {
        assert_eq!(parse("launch").unwrap_err().expected, "a command keyword");
        assert_eq!(parse("").unwrap_err().expected, "a command keyword");
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let err = parse("status now").unwrap_err();
        assert_eq!(err.expected, "the end of the line");
        assert!(parse("spin 3 4").is_err());
    }
}
