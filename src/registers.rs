//! DS90UB954 register map and the byte-level access trait.

use std::time::Duration;

use crate::error::BusError;

/// Default 7-bit I2C address of the deserializer (ID pin pulled high).
pub const DEVICE_ADDRESS: u8 = 0x3d;

pub const REG_I2C_DEV_ID: u8 = 0x00;
pub const REG_RESET: u8 = 0x01;
pub const REG_PAR_ERR_THOLD_HI: u8 = 0x05;
pub const REG_PAR_ERR_THOLD_LO: u8 = 0x06;
pub const REG_RX_PORT_CTL: u8 = 0x0c;
pub const REG_AEQ_CTL1: u8 = 0x42;
pub const REG_FPD3_CAP: u8 = 0x4a;
pub const REG_FPD3_PORT_SEL: u8 = 0x4c;
pub const REG_RX_PORT_STS1: u8 = 0x4d;
pub const REG_RX_PORT_STS2: u8 = 0x4e;
pub const REG_RX_PAR_ERR_LO: u8 = 0x56;
pub const REG_IND_ACC_CTL: u8 = 0xb0;
pub const REG_IND_ACC_ADDR: u8 = 0xb1;
pub const REG_IND_ACC_DATA: u8 = 0xb2;
pub const REG_FPD3_ENC_CTL: u8 = 0xba;
pub const REG_ADAPTIVE_EQ_BYPASS: u8 = 0xd4;

/// Offset of STROBE_SET in the RX port test page.
pub const IND_REG_OFF_STROBE_SET: u8 = 0x08;

/// Digital reset that keeps register contents.
pub const RESET_DIGITAL: u8 = 0x01;
/// Digital reset including registers.
pub const RESET_DIGITAL_AND_REGISTERS: u8 = 0x02;

pub const RX_PORT_CTL_RESERVED: u8 = 0x2 << 6;
pub const RX_PORT_CTL_PORT0_EN: u8 = 1 << 0;
pub const RX_PORT_CTL_PORT1_EN: u8 = 1 << 1;
pub const RX_PORT_CTL_LOCK_SEL_SHIFT: u8 = 2;

pub const FPD3_PORT_SEL_RX_READ_PORT_SHIFT: u8 = 4;

/// AEQ error control: clock errors, packet encoding errors, parity errors.
pub const AEQ_CTL1_ERROR_CONTROL: u8 = 0x70;
pub const FPD3_CAP_ENC_CRC: u8 = 0x10;
pub const FPD3_ENC_CTL_DISABLE_CRC: u8 = 0x80;

pub const EQ_BYPASS_ENABLE: u8 = 0x01;
const EQ_SELECTOR1_SHIFT: u8 = 5;
const EQ_SELECTOR2_SHIFT: u8 = 1;
const EQ_SELECTOR2_MASK: u8 = 0x0f;

const STROBE_DATA_SHIFT: u8 = 4;
const STROBE_FIELD_MASK: u8 = 0x0f;

pub const STS1_LOCK: u8 = 1 << 0;
/// Parity error, BCC sequence error, lock status changed, BCC CRC error.
pub const STS1_ERROR_MASK: u8 = 0x3c;
/// FPD3 encoder error.
pub const STS2_ERROR_MASK: u8 = 0x20;

/// Byte-wide access to the deserializer register space.
///
/// Delays go through the bus as well, so a simulated device can run a full
/// sweep without waiting on real time.
pub trait RegisterBus {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError>;

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError>;

    /// Blocks for `duration`.
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
        (**self).read_byte(register)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write_byte(register, value)
    }

    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}

/// Packs both EQ stage selectors into the adaptive EQ bypass register.
pub fn eq_bypass_value(selector1: u8, selector2: u8) -> u8 {
    (selector1 << EQ_SELECTOR1_SHIFT) | ((selector2 & EQ_SELECTOR2_MASK) << EQ_SELECTOR2_SHIFT) | EQ_BYPASS_ENABLE
}

/// Splits an adaptive EQ bypass value into `(selector1, selector2)`.
pub fn eq_selectors(value: u8) -> (u8, u8) {
    (
        value >> EQ_SELECTOR1_SHIFT,
        (value >> EQ_SELECTOR2_SHIFT) & EQ_SELECTOR2_MASK,
    )
}

/// Packs clock and data delay into a STROBE_SET value.
pub fn strobe_value(clock: u8, data: u8) -> u8 {
    ((data & STROBE_FIELD_MASK) << STROBE_DATA_SHIFT) | (clock & STROBE_FIELD_MASK)
}

/// Splits a STROBE_SET value into `(clock, data)`.
pub fn strobe_fields(value: u8) -> (u8, u8) {
    (value & STROBE_FIELD_MASK, value >> STROBE_DATA_SHIFT)
}

/// How one status read pair is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Locked,
    Unlocked,
    /// An error flag was raised; the sample is discarded.
    Error,
}

/// One pair of RX port status reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSample {
    pub status1: u8,
    pub status2: u8,
}

impl LockSample {
    pub fn classify(&self) -> SampleOutcome {
        if self.status1 & STS1_ERROR_MASK != 0 || self.status2 & STS2_ERROR_MASK != 0 {
            SampleOutcome::Error
        } else if self.status1 & STS1_LOCK != 0 {
            SampleOutcome::Locked
        } else {
            SampleOutcome::Unlocked
        }
    }
}
