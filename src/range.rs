//! Logical sweep ranges and timing parameters.
//!
//! Both swept axes (strobe position and EQ position) use the same logical
//! coordinate space of 15 positions, `0..=14`.

use std::fmt;
use std::time::Duration;

use crate::error::{ConfigError, RangeError};

/// Highest logical position on either axis.
pub const MAX_POSITION: u8 = 14;

/// Number of logical positions on either axis.
pub const POSITIONS: usize = MAX_POSITION as usize + 1;

/// First logical position served by the second hardware field of an axis.
pub const SPLIT_POSITION: u8 = 8;

/// A closed interval `[begin, end]` of logical positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    begin: u8,
    end: u8,
}

impl PositionRange {
    /// The complete axis, `0..=14`.
    pub const FULL: PositionRange = PositionRange {
        begin: 0,
        end: MAX_POSITION,
    };

    pub fn new(begin: u8, end: u8) -> Result<Self, RangeError> {
        for value in [begin, end] {
            if value > MAX_POSITION {
                return Err(RangeError::OutOfBounds {
                    value,
                    max: MAX_POSITION,
                });
            }
        }
        if begin > end {
            return Err(RangeError::Reversed { begin, end });
        }
        Ok(Self { begin, end })
    }

    pub fn begin(&self) -> u8 {
        self.begin
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    /// Number of positions covered, always at least 1.
    pub fn len(&self) -> usize {
        (self.end - self.begin) as usize + 1
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.begin as usize..=self.end as usize).contains(&position)
    }
}

impl Default for PositionRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for PositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.begin, self.end)
    }
}

/// Timing and bank selection for one margin run.
///
/// Captured once by the input layer and never changed while sweeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepConfig {
    /// Settle time after each register write, in seconds.
    pub dwell_time: f64,
    /// Status samples taken per grid cell.
    pub lock_run_count: u32,
    /// Spacing between consecutive status reads, in seconds.
    pub lock_time: f64,
    /// Use the +8 bank for the clock delay field.
    pub clock_base_delay: bool,
    /// Use the +8 bank for the data delay field.
    pub data_base_delay: bool,
}

impl SweepConfig {
    pub const DEFAULT_DWELL_TIME: f64 = 0.9;
    pub const DEFAULT_LOCK_RUN_COUNT: u32 = 10;
    pub const DEFAULT_LOCK_TIME: f64 = 0.1;

    /// Checks the invariants the sweep engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_run_count == 0 {
            return Err(ConfigError::ZeroLockRuns);
        }
        for (name, value) in [("dwell time", self.dwell_time), ("lock time", self.lock_time)] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::InvalidDuration { name, value });
            }
        }
        Ok(())
    }

    /// Settle time; a value that fails [`SweepConfig::validate`] counts as zero.
    pub fn dwell(&self) -> Duration {
        Duration::try_from_secs_f64(self.dwell_time).unwrap_or_default()
    }

    /// Status read spacing; a value that fails [`SweepConfig::validate`] counts as zero.
    pub fn lock_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.lock_time).unwrap_or_default()
    }

    /// Rough run time in seconds for sweeping `strobe` × `eq`.
    ///
    /// Each sample costs three lock intervals, each cell one dwell.
    pub fn estimated_seconds(&self, strobe: PositionRange, eq: PositionRange) -> f64 {
        let cells = (strobe.len() * eq.len()) as f64;
        cells * (self.lock_run_count as f64 * 3.0 * self.lock_time + self.dwell_time)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            dwell_time: Self::DEFAULT_DWELL_TIME,
            lock_run_count: Self::DEFAULT_LOCK_RUN_COUNT,
            lock_time: Self::DEFAULT_LOCK_TIME,
            clock_base_delay: false,
            data_base_delay: false,
        }
    }
}
