//! # Simulated DS90UB954
//!
//! An in-memory stand-in for the deserializer. It keeps the register file,
//! the indirect STROBE_SET registers of both receive ports, and answers the
//! status registers from a lock-eye model, so a complete margin run can be
//! exercised without hardware. Randomness comes from a seeded generator:
//! the same seed and the same access sequence always give the same answers.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::BusError;
use crate::registers::*;

const PORTS: usize = 2;

/// Shape of the simulated data eye in logical (strobe, EQ) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeModel {
    pub strobe_center: f64,
    pub eq_center: f64,
    /// Half width of the always-locking region along the strobe axis.
    pub strobe_half_width: f64,
    /// Half height of the always-locking region along the EQ axis.
    pub eq_half_width: f64,
    /// Width of the intermittent band around the eye, relative to its size.
    pub margin: f64,
    /// Chance that a sample in the intermittent band raises a parity error.
    pub error_rate: f64,
}

impl EyeModel {
    /// Probability that a single status read reports lock.
    pub fn lock_probability(&self, strobe: f64, eq: f64) -> f64 {
        let ds = (strobe - self.strobe_center) / self.strobe_half_width;
        let de = (eq - self.eq_center) / self.eq_half_width;
        let distance = (ds * ds + de * de).sqrt();
        if distance <= 1.0 {
            1.0
        } else if self.margin <= 0.0 || distance >= 1.0 + self.margin {
            0.0
        } else {
            1.0 - (distance - 1.0) / self.margin
        }
    }
}

impl Default for EyeModel {
    fn default() -> Self {
        Self {
            strobe_center: 7.0,
            eq_center: 6.0,
            strobe_half_width: 4.0,
            eq_half_width: 5.0,
            margin: 0.4,
            error_rate: 0.1,
        }
    }
}

/// The simulated deserializer, answering on its register interface.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    registers: [u8; 256],
    // STROBE_SET of each receive port, reached through IND_ACC_*.
    strobe_set: [u8; PORTS],
    pub eye: EyeModel,
    rng: StdRng,
    // Sleep for real on delay requests.
    realtime: bool,
    parity_errors: u8,
    last_lock: bool,
    lock_changed: bool,
    accesses: usize,
    fail_after: Option<usize>,
}

impl SimulatedDevice {
    /// Creates a device in its power-on state.
    pub fn new(seed: u64) -> Self {
        let mut device = Self {
            registers: [0; 256],
            strobe_set: [0; PORTS],
            eye: EyeModel::default(),
            rng: StdRng::seed_from_u64(seed),
            realtime: false,
            parity_errors: 0,
            last_lock: false,
            lock_changed: false,
            accesses: 0,
            fail_after: None,
        };
        device.power_on_defaults();
        device
    }

    pub fn with_eye(mut self, eye: EyeModel) -> Self {
        self.eye = eye;
        self
    }

    /// Honour delay requests with real sleeps.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Makes every access after the first `accesses` fail.
    pub fn fail_after(mut self, accesses: usize) -> Self {
        self.fail_after = Some(accesses);
        self
    }

    /// Raw register value, bypassing side effects.
    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    pub fn strobe_set(&self, port: usize) -> u8 {
        self.strobe_set[port]
    }

    fn power_on_defaults(&mut self) {
        self.registers = [0; 256];
        self.registers[REG_I2C_DEV_ID as usize] = DEVICE_ADDRESS << 1;
        self.registers[REG_RX_PORT_CTL as usize] = RX_PORT_CTL_RESERVED | RX_PORT_CTL_PORT0_EN;
        self.registers[REG_FPD3_ENC_CTL as usize] = FPD3_ENC_CTL_DISABLE_CRC;
        self.strobe_set = [0; PORTS];
        self.parity_errors = 0;
        self.last_lock = false;
        self.lock_changed = false;
    }

    fn check_access(&mut self, register: u8) -> Result<(), BusError> {
        self.accesses += 1;
        match self.fail_after {
            Some(limit) if self.accesses > limit => Err(BusError::Transfer {
                register,
                reason: "simulated bus failure".into(),
            }),
            _ => Ok(()),
        }
    }

    /// Port addressed by the indirect access page, if it is an RX test page.
    fn indirect_port(&self) -> Option<usize> {
        let ctl = self.registers[REG_IND_ACC_CTL as usize];
        (0..PORTS).find(|&port| ctl == 1 << (2 + port))
    }

    fn read_port(&self) -> usize {
        ((self.registers[REG_FPD3_PORT_SEL as usize] >> FPD3_PORT_SEL_RX_READ_PORT_SHIFT) & 0x3)
            as usize
            % PORTS
    }

    /// Current logical (strobe, EQ) position of `port`.
    fn position(&self, port: usize) -> (f64, f64) {
        let (clock, data) = strobe_fields(self.strobe_set[port]);
        let strobe = 7.0 - (clock & 0x7) as f64 + (data & 0x7) as f64;

        let eq_reg = self.registers[REG_ADAPTIVE_EQ_BYPASS as usize];
        let eq = if eq_reg & EQ_BYPASS_ENABLE != 0 {
            let (selector1, selector2) = eq_selectors(eq_reg);
            (selector1 + selector2) as f64
        } else {
            // adaptive equalizer settles on the best stage by itself
            self.eye.eq_center
        };
        (strobe, eq)
    }

    fn sample_status1(&mut self) -> u8 {
        let port = self.read_port();
        let enabled = self.registers[REG_RX_PORT_CTL as usize] & (1 << port) != 0;
        let (strobe, eq) = self.position(port);
        let probability = if enabled {
            self.eye.lock_probability(strobe, eq)
        } else {
            0.0
        };

        let locked = self.rng.gen_bool(probability);
        if probability > 0.0 && probability < 1.0 && self.rng.gen_bool(self.eye.error_rate) {
            self.parity_errors = self.parity_errors.saturating_add(1);
        }
        if locked != self.last_lock {
            self.lock_changed = true;
            self.last_lock = locked;
        }

        let mut status = (port as u8) << 6;
        if locked {
            status |= STS1_LOCK | 0x02;
        }
        if self.parity_errors > 0 {
            status |= 0x04;
        }
        if self.lock_changed {
            status |= 0x10;
            self.lock_changed = false;
        }
        status
    }

    fn sample_status2(&self) -> u8 {
        // frequency stable while locked
        if self.last_lock {
            0x04
        } else {
            0x00
        }
    }
}

impl RegisterBus for SimulatedDevice {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
        self.check_access(register)?;
        let value = match register {
            REG_RX_PORT_STS1 => self.sample_status1(),
            REG_RX_PORT_STS2 => self.sample_status2(),
            REG_RX_PAR_ERR_LO => std::mem::take(&mut self.parity_errors),
            REG_IND_ACC_DATA => match self.indirect_port() {
                Some(port) => self.strobe_set[port],
                None => 0,
            },
            _ => self.registers[register as usize],
        };
        Ok(value)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.check_access(register)?;
        match register {
            // read-only
            REG_I2C_DEV_ID | REG_RX_PORT_STS1 | REG_RX_PORT_STS2 | REG_RX_PAR_ERR_LO => {}
            REG_RESET => {
                if value & RESET_DIGITAL_AND_REGISTERS != 0 {
                    self.power_on_defaults();
                } else if value & RESET_DIGITAL != 0 {
                    self.parity_errors = 0;
                    self.lock_changed = false;
                }
            }
            REG_IND_ACC_DATA => {
                if let Some(port) = self.indirect_port() {
                    if self.registers[REG_IND_ACC_ADDR as usize] == IND_REG_OFF_STROBE_SET {
                        self.strobe_set[port] = value;
                    }
                }
            }
            _ => self.registers[register as usize] = value,
        }
        Ok(())
    }

    fn delay(&mut self, duration: Duration) {
        if self.realtime {
            std::thread::sleep(duration);
        }
    }
}
