//! Register access over a real I2C bus.
//!
//! Any `embedded-hal` I2C implementation can carry the register traffic. On
//! Linux, [`open_bus`] opens an `i2c-dev` node through `linux-embedded-hal`.

use std::fmt::Write as _;

use embedded_hal::i2c::I2c;

use crate::error::BusError;
use crate::registers::RegisterBus;

/// Lowest and highest address probed by [`scan`], as `i2cdetect` does.
const SCAN_FIRST: u8 = 0x03;
const SCAN_LAST: u8 = 0x77;

/// Byte register access to one device on an I2C bus.
#[derive(Debug)]
pub struct I2cRegisters<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> I2cRegisters<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }
}

fn transfer_error<E: embedded_hal::i2c::Error>(register: u8, err: E) -> BusError {
    BusError::Transfer {
        register,
        reason: format!("{:?} ({:?})", err.kind(), err),
    }
}

impl<I: I2c> RegisterBus for I2cRegisters<I> {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|e| transfer_error(register, e))?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| transfer_error(register, e))
    }
}

/// Addresses on the bus that acknowledge a one byte read.
pub fn scan<I: I2c>(i2c: &mut I) -> Vec<u8> {
    (SCAN_FIRST..=SCAN_LAST)
        .filter(|&address| {
            let mut buf = [0u8; 1];
            i2c.read(address, &mut buf).is_ok()
        })
        .collect()
}

/// Formats scan results as the familiar 16-column `i2cdetect` table.
pub fn format_scan_table(found: &[u8]) -> String {
    let mut table = String::from("     0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f\n");
    for base in (0u8..0x80).step_by(16) {
        let _ = write!(table, "{:02x}:", base);
        for address in base..base + 16 {
            if !(SCAN_FIRST..=SCAN_LAST).contains(&address) {
                table.push_str("   ");
            } else if found.contains(&address) {
                let _ = write!(table, " {:02x}", address);
            } else {
                table.push_str(" --");
            }
        }
        table.push('\n');
    }
    table
}

/// Numbers of the `/dev/i2c-N` nodes present, sorted.
pub fn available_buses() -> Vec<u8> {
    let mut buses: Vec<u8> = match std::fs::read_dir("/dev") {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix("i2c-"))
                    .and_then(|n| n.parse().ok())
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    buses.sort_unstable();
    buses
}

/// Opens `/dev/i2c-<bus>`.
#[cfg(target_os = "linux")]
pub fn open_bus(bus: u8) -> Result<linux_embedded_hal::I2cdev, BusError> {
    let path = format!("/dev/i2c-{bus}");
    if !std::path::Path::new(&path).exists() {
        return Err(BusError::NotFound { bus });
    }
    linux_embedded_hal::I2cdev::new(&path).map_err(|e| BusError::Open {
        bus,
        reason: e.to_string(),
    })
}
