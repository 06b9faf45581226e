//! # Margin Analysis Library
//!
//! This library measures the receive margin of an FPD-Link III link on a
//! DS90UB954 deserializer. It sweeps the strobe delay against the equalizer
//! setting, samples the lock status at every point, and classifies the
//! resulting lock grid into a recommendation whether the coax cable is fit
//! for use.
//!
//! The register traffic goes through the [`RegisterBus`] trait, implemented
//! for real I2C buses ([`I2cRegisters`]) and for an in-memory device model
//! ([`SimulatedDevice`]).

pub mod device;
pub mod error;
pub mod evaluate;
pub mod grid;
pub mod i2c;
pub mod input;
pub mod mapper;
pub mod range;
pub mod registers;
pub mod render;
pub mod report;
pub mod sim;
pub mod sweep;

pub use device::Deserializer;
pub use error::{BusError, ConfigError, DeviceError, InputError, RangeError, SweepError};
pub use evaluate::{evaluate, Evaluation, Verdict};
pub use grid::LockGrid;
pub use i2c::I2cRegisters;
pub use input::{MarginSettings, Preset, Prompter};
pub use range::{PositionRange, SweepConfig};
pub use registers::RegisterBus;
pub use report::RunReport;
pub use sim::SimulatedDevice;
pub use sweep::{run_sweep, SweepObserver, SweepPlan};
