//! Error types shared across the margin analysis library.

use thiserror::Error;

/// Failures of the register transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The requested I2C bus has no device node.
    #[error("I2C bus {bus} not found")]
    NotFound { bus: u8 },

    /// The bus exists but could not be opened.
    #[error("failed to open I2C bus {bus}: {reason}")]
    Open { bus: u8, reason: String },

    /// A single register read or write failed.
    #[error("transfer on register 0x{register:02x} failed: {reason}")]
    Transfer { register: u8, reason: String },
}

/// Failures while talking to the deserializer as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error(transparent)]
    Bus(#[from] BusError),

    /// The ID register does not carry the expected device address.
    #[error("identity check failed: expected 0x{expected:02x}, device reported 0x{found:02x}")]
    IdentityMismatch { expected: u8, found: u8 },

    /// Only receive ports 0 and 1 exist.
    #[error("receive port {0} does not exist")]
    InvalidPort(u8),
}

/// Rejected position ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("position {value} is outside 0..={max}")]
    OutOfBounds { value: u8, max: u8 },

    #[error("begin {begin} is greater than end {end}")]
    Reversed { begin: u8, end: u8 },
}

/// Rejected timing parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("lock run count must be at least 1")]
    ZeroLockRuns,

    #[error("{name} must be a finite, non-negative number of seconds, got {value}")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("{name} of {value} ms is outside {min}..={max} ms")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Failures while collecting parameters from the operator.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("input closed before all parameters were given")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A sweep aborted by a transport failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("sweep aborted while configuring EQ position {eq}: {source}")]
    EqSelect { eq: usize, source: BusError },

    #[error("sweep aborted at EQ position {eq}, strobe position {strobe}: {source}")]
    Cell {
        eq: usize,
        strobe: usize,
        source: BusError,
    },
}
