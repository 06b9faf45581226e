//! Register-level session with the deserializer.

use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::{BusError, DeviceError};
use crate::registers::*;

/// Settle time after each setup write.
const SETUP_SETTLE: Duration = Duration::from_millis(100);

/// A DS90UB954 reached through a [`RegisterBus`].
#[derive(Debug)]
pub struct Deserializer<B> {
    bus: B,
}

impl<B: RegisterBus> Deserializer<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    fn read(&mut self, register: u8) -> Result<u8, BusError> {
        let value = self.bus.read_byte(register)?;
        trace!("RD reg 0x{:02x} = 0x{:02x}", register, value);
        Ok(value)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        trace!("WR reg 0x{:02x} <- 0x{:02x}", register, value);
        self.bus.write_byte(register, value)
    }

    pub fn delay(&mut self, duration: Duration) {
        self.bus.delay(duration);
    }

    /// Confirms the ID register carries the expected device address.
    ///
    /// Bit 0 of the ID register flags an address overridden by register,
    /// which is not supported.
    pub fn identify(&mut self) -> Result<(), DeviceError> {
        let id = self.read(REG_I2C_DEV_ID)?;
        if id >> 1 != DEVICE_ADDRESS {
            return Err(DeviceError::IdentityMismatch {
                expected: DEVICE_ADDRESS,
                found: id >> 1,
            });
        }
        debug!("device identity 0x{:02x} confirmed", id >> 1);
        Ok(())
    }

    /// Routes the receiver and the indirect STROBE_SET access to `port` and
    /// puts the equalizer under manual control.
    pub fn prepare(&mut self, port: u8, full_reset: bool) -> Result<(), DeviceError> {
        if port > 1 {
            return Err(DeviceError::InvalidPort(port));
        }
        info!("preparing receive port {}", port);

        if full_reset {
            self.write(REG_RESET, RESET_DIGITAL_AND_REGISTERS)?;
            self.delay(SETUP_SETTLE);
        }

        let steps = [
            // both receivers on, lock reported for the port under test
            (
                REG_RX_PORT_CTL,
                RX_PORT_CTL_RESERVED
                    | RX_PORT_CTL_PORT0_EN
                    | RX_PORT_CTL_PORT1_EN
                    | (port << RX_PORT_CTL_LOCK_SEL_SHIFT),
            ),
            (
                REG_FPD3_PORT_SEL,
                (1 << port) | (port << FPD3_PORT_SEL_RX_READ_PORT_SHIFT),
            ),
            // RX port test and debug page
            (REG_IND_ACC_CTL, 1 << (2 + port)),
            (REG_IND_ACC_ADDR, IND_REG_OFF_STROBE_SET),
            (REG_AEQ_CTL1, AEQ_CTL1_ERROR_CONTROL),
            (REG_ADAPTIVE_EQ_BYPASS, eq_bypass_value(0, 0)),
            (REG_PAR_ERR_THOLD_HI, 0x00),
            (REG_PAR_ERR_THOLD_LO, 0x01),
        ];
        for (register, value) in steps {
            self.write(register, value)?;
            self.delay(SETUP_SETTLE);
        }

        let cap = self.read(REG_FPD3_CAP)?;
        self.write(REG_FPD3_CAP, cap | FPD3_CAP_ENC_CRC)?;
        let enc = self.read(REG_FPD3_ENC_CTL)?;
        self.write(REG_FPD3_ENC_CTL, enc & !FPD3_ENC_CTL_DISABLE_CRC)?;
        Ok(())
    }

    pub fn set_eq_selectors(&mut self, selector1: u8, selector2: u8) -> Result<(), BusError> {
        self.write(REG_ADAPTIVE_EQ_BYPASS, eq_bypass_value(selector1, selector2))
    }

    pub fn set_strobe(&mut self, clock: u8, data: u8) -> Result<(), BusError> {
        self.write(REG_IND_ACC_DATA, strobe_value(clock, data))
    }

    /// Resets the digital block, keeping registers.
    pub fn soft_reset(&mut self) -> Result<(), BusError> {
        self.write(REG_RESET, RESET_DIGITAL)
    }

    pub fn read_status1(&mut self) -> Result<u8, BusError> {
        self.read(REG_RX_PORT_STS1)
    }

    pub fn read_status2(&mut self) -> Result<u8, BusError> {
        self.read(REG_RX_PORT_STS2)
    }

    /// Reading the parity error counter clears the latched error.
    pub fn clear_parity_errors(&mut self) -> Result<(), BusError> {
        self.read(REG_RX_PAR_ERR_LO).map(|_| ())
    }

    /// Returns STROBE_SET to its default and resets the device.
    pub fn restore(&mut self) -> Result<(), BusError> {
        info!("restoring default strobe setting");
        self.write(REG_IND_ACC_DATA, 0x00)?;
        self.delay(SETUP_SETTLE);
        self.write(REG_RESET, RESET_DIGITAL_AND_REGISTERS)?;
        self.delay(SETUP_SETTLE);
        // clears the lock status changed flag
        self.read_status1()?;
        self.delay(SETUP_SETTLE);
        Ok(())
    }
}
