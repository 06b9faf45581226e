//! Operator input: the question/answer dialog that fixes the run parameters.
//!
//! Values given on the command line are taken as they are, everything else is
//! asked for. The dialog is generic over its input and output streams.

use std::io::{BufRead, Write};
use std::ops::RangeInclusive;

use tracing::debug;

use crate::error::{ConfigError, InputError};
use crate::range::{PositionRange, SweepConfig, MAX_POSITION};
use crate::sweep::SweepPlan;

/// Accepted dwell time, in milliseconds.
pub const DWELL_RANGE_MS: RangeInclusive<f64> = 100.0..=60000.0;
/// Accepted lock time, in milliseconds.
pub const LOCK_TIME_RANGE_MS: RangeInclusive<f64> = 100.0..=1500.0;

/// Parses the answers accepted for a yes/no question.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer {
        "y" | "Y" | "j" | "yes" | "Yes" => Some(true),
        "n" | "N" | "no" | "No" | "NO" => Some(false),
        _ => None,
    }
}

/// Converts an operator value in milliseconds to seconds, checking its range.
pub fn millis_to_secs(
    name: &'static str,
    millis: f64,
    range: RangeInclusive<f64>,
) -> Result<f64, ConfigError> {
    if !range.contains(&millis) {
        return Err(ConfigError::OutOfRange {
            name,
            value: millis,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(millis / 1000.0)
}

/// Everything the operator decides before the sweep starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginSettings {
    pub colored: bool,
    /// Full reset including registers before the receiver is configured.
    pub digital_reset: bool,
    pub config: SweepConfig,
    pub strobe_range: PositionRange,
    pub eq_range: PositionRange,
}

impl MarginSettings {
    pub fn plan(&self) -> Result<SweepPlan, ConfigError> {
        SweepPlan::new(self.strobe_range, self.eq_range, self.config)
    }
}

impl Default for MarginSettings {
    fn default() -> Self {
        Self {
            colored: false,
            digital_reset: false,
            config: SweepConfig::default(),
            strobe_range: PositionRange::FULL,
            eq_range: PositionRange::FULL,
        }
    }
}

/// Values fixed on the command line. `None` entries are asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preset {
    pub colored: Option<bool>,
    pub digital_reset: Option<bool>,
    pub dwell_ms: Option<f64>,
    pub lock_runs: Option<u32>,
    pub lock_ms: Option<f64>,
    pub strobe_range: Option<PositionRange>,
    pub eq_range: Option<PositionRange>,
    pub clock_base_delay: Option<bool>,
    pub data_base_delay: Option<bool>,
}

impl Preset {
    /// Fills every missing value with its default, without asking.
    pub fn with_defaults(&self) -> Result<MarginSettings, ConfigError> {
        let defaults = MarginSettings::default();
        let config = SweepConfig {
            dwell_time: self.dwell_secs()?.unwrap_or(defaults.config.dwell_time),
            lock_run_count: self.lock_runs.unwrap_or(defaults.config.lock_run_count),
            lock_time: self.lock_secs()?.unwrap_or(defaults.config.lock_time),
            clock_base_delay: self.clock_base_delay.unwrap_or(false),
            data_base_delay: self.data_base_delay.unwrap_or(false),
        };
        config.validate()?;
        Ok(MarginSettings {
            colored: self.colored.unwrap_or(defaults.colored),
            digital_reset: self.digital_reset.unwrap_or(defaults.digital_reset),
            config,
            strobe_range: self.strobe_range.unwrap_or(defaults.strobe_range),
            eq_range: self.eq_range.unwrap_or(defaults.eq_range),
        })
    }

    /// Asks for every missing value, in the order of the classic dialog.
    pub fn resolve<R: BufRead, W: Write>(
        &self,
        prompter: &mut Prompter<R, W>,
    ) -> Result<MarginSettings, InputError> {
        let digital_reset = match self.digital_reset {
            Some(reset) => reset,
            None => prompter.yes_no(
                "Do you want to do a final digital reset including registers \
                 before starting the test? (y/n)",
            )?,
        };
        let colored = match self.colored {
            Some(colored) => colored,
            None => prompter.yes_no("Do you want a colored map? (y/n)")?,
        };

        let dwell_time = match self.dwell_secs()? {
            Some(secs) => secs,
            None => prompter.float_ms(
                "the",
                "dwell time",
                SweepConfig::DEFAULT_DWELL_TIME,
                DWELL_RANGE_MS,
            )?,
        };
        let lock_run_count = match self.lock_runs {
            Some(runs) => runs,
            None => prompter.int_at_least(
                "number of",
                "lock runs",
                SweepConfig::DEFAULT_LOCK_RUN_COUNT,
            )?,
        };
        let lock_time = match self.lock_secs()? {
            Some(secs) => secs,
            None => prompter.float_ms(
                "a",
                "lock time",
                SweepConfig::DEFAULT_LOCK_TIME,
                LOCK_TIME_RANGE_MS,
            )?,
        };

        let strobe_range = match self.strobe_range {
            Some(range) => range,
            None => prompter.position_range("Strobe Position")?,
        };
        let eq_range = match self.eq_range {
            Some(range) => range,
            None => prompter.position_range("EQ Position")?,
        };

        let clock_base_delay = match self.clock_base_delay {
            Some(delay) => delay,
            None => prompter.yes_no("Do you want a clock base delay? (y/n)")?,
        };
        let data_base_delay = match self.data_base_delay {
            Some(delay) => delay,
            None => prompter.yes_no("Do you want a data base delay? (y/n)")?,
        };

        let config = SweepConfig {
            dwell_time,
            lock_run_count,
            lock_time,
            clock_base_delay,
            data_base_delay,
        };
        config.validate()?;

        let settings = MarginSettings {
            colored,
            digital_reset,
            config,
            strobe_range,
            eq_range,
        };
        debug!("resolved settings: {:?}", settings);
        Ok(settings)
    }

    fn dwell_secs(&self) -> Result<Option<f64>, ConfigError> {
        self.dwell_ms
            .map(|ms| millis_to_secs("dwell time", ms, DWELL_RANGE_MS))
            .transpose()
    }

    fn lock_secs(&self) -> Result<Option<f64>, ConfigError> {
        self.lock_ms
            .map(|ms| millis_to_secs("lock time", ms, LOCK_TIME_RANGE_MS))
            .transpose()
    }
}

/// A line based question/answer dialog.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Prints a line to the operator.
    pub fn say(&mut self, message: &str) -> Result<(), InputError> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// Prints `question` and returns the trimmed answer.
    pub fn ask(&mut self, question: &str) -> Result<String, InputError> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputError::Closed);
        }
        Ok(line.trim().to_string())
    }

    /// Repeats `question` until it is answered with yes or no.
    pub fn yes_no(&mut self, question: &str) -> Result<bool, InputError> {
        loop {
            let answer = self.ask(question)?;
            if let Some(yes) = parse_yes_no(&answer) {
                return Ok(yes);
            }
            self.say("Incorrect input, please try again!")?;
        }
    }

    /// Optionally asks for a time in milliseconds, returned in seconds.
    pub fn float_ms(
        &mut self,
        article: &str,
        what: &str,
        default_secs: f64,
        range: RangeInclusive<f64>,
    ) -> Result<f64, InputError> {
        let secs = if self.yes_no(&format!("Do you want to set {} {}? (y/n)", article, what))? {
            let question = format!(
                "Enter a value between {} and {} (ms):",
                range.start(),
                range.end()
            );
            loop {
                match self.ask(&question)?.parse::<f64>() {
                    Ok(ms) if range.contains(&ms) => break ms / 1000.0,
                    _ => self.say("Please try again!")?,
                }
            }
        } else {
            self.say(&format!("The {} value {} is set by default", what, default_secs))?;
            default_secs
        };
        self.say(&format!("current {}: {} second(s)", what, secs))?;
        Ok(secs)
    }

    /// Optionally asks for an integer no smaller than its default.
    pub fn int_at_least(
        &mut self,
        article: &str,
        what: &str,
        default: u32,
    ) -> Result<u32, InputError> {
        let value = if self.yes_no(&format!("Do you want to set {} {}? (y/n)", article, what))? {
            let question = format!("Enter an integer value of at least {}:", default);
            loop {
                match self.ask(&question)?.parse::<u32>() {
                    Ok(value) if value >= default => break value,
                    _ => self.say("Please try again!")?,
                }
            }
        } else {
            self.say(&format!("The {} value {} is set by default", what, default))?;
            default
        };
        self.say(&format!("current {}: {}", what, value))?;
        Ok(value)
    }

    /// Optionally restricts an axis to a sub-range, the full axis otherwise.
    pub fn position_range(&mut self, what: &str) -> Result<PositionRange, InputError> {
        if !self.yes_no(&format!("Do you want to set {}? (y/n)", what))? {
            let range = PositionRange::FULL;
            self.say(&format!(
                "The {} range {} is set by default.",
                what, range
            ))?;
            return Ok(range);
        }

        loop {
            self.say(&format!("Enter integer values from 0 to {}:", MAX_POSITION))?;
            let begin = self.ask(&format!("{} Begin:", what))?;
            let end = self.ask(&format!("{} End:", what))?;
            match (begin.parse::<u8>(), end.parse::<u8>()) {
                (Ok(begin), Ok(end)) => match PositionRange::new(begin, end) {
                    Ok(range) => {
                        self.say(&format!("current {}: {}", what, range))?;
                        return Ok(range);
                    }
                    Err(err) => self.say(&format!("{}, please try again!", err))?,
                },
                _ => self.say("Please try again!")?,
            }
        }
    }

    /// Asks for the receive port; an empty answer selects port 0.
    pub fn port(&mut self) -> Result<u8, InputError> {
        loop {
            let answer =
                self.ask("Which port is the camera connected to (enter for default)?")?;
            match answer.as_str() {
                "" => return Ok(0),
                "0" => return Ok(0),
                "1" => return Ok(1),
                _ => self.say("Incorrect port input, please try again!")?,
            }
        }
    }
}
