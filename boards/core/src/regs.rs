//! Register file access over an I2C device.
//!
//! All boards expose a flat 8-bit register space: a write of `[reg, data..]`
//! stores data starting at `reg`, a write of `[reg]` followed by a read
//! returns data starting at `reg`. Multi-byte values are little-endian.

use embedded_hal::i2c::{Error as _, I2c};

use crate::features::{BoardError, Result};

/// Largest payload written in a single transaction
const MAX_WRITE: usize = 8;

pub struct RegisterDevice<I> {
    bus: I,
    address: u8,
}

impl<I: I2c> RegisterDevice<I> {
    pub fn new(bus: I, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn bus_error(&self, err: I::Error) -> BoardError {
        BoardError::Bus {
            address: self.address,
            kind: err.kind(),
        }
    }

    /// Read `N` consecutive registers
    pub fn read<const N: usize>(&mut self, reg: u8) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.bus
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|e| self.bus_error(e))?;
        Ok(buf)
    }

    pub fn read_u8(&mut self, reg: u8) -> Result<u8> {
        self.read::<1>(reg).map(|[b]| b)
    }

    pub fn read_u16(&mut self, reg: u8) -> Result<u16> {
        self.read(reg).map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self, reg: u8) -> Result<u32> {
        self.read(reg).map(u32::from_le_bytes)
    }

    /// Write consecutive registers starting at `reg`
    pub fn write(&mut self, reg: u8, data: &[u8]) -> Result<()> {
        debug_assert!(data.len() <= MAX_WRITE);
        let mut buf = [0u8; MAX_WRITE + 1];
        let len = data.len().min(MAX_WRITE);
        buf[0] = reg;
        buf[1..=len].copy_from_slice(&data[..len]);
        self.bus
            .write(self.address, &buf[..=len])
            .map_err(|e| self.bus_error(e))
    }

    pub fn write_u8(&mut self, reg: u8, value: u8) -> Result<()> {
        self.write(reg, &[value])
    }

    pub fn write_u16(&mut self, reg: u8, value: u16) -> Result<()> {
        self.write(reg, &value.to_le_bytes())
    }

    /// Firmware revision from a major/minor register pair
    pub fn read_revision(&mut self, reg: u8) -> Result<String> {
        let [major, minor] = self.read(reg)?;
        Ok(format!("{major}.{minor:02}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    #[test]
    fn little_endian_words() {
        let mut bus = MockBus::new();
        bus.attach(0x48);
        let mut dev = RegisterDevice::new(&mut bus, 0x48);
        dev.write_u16(0x04, 0x1234).unwrap();
        assert_eq!(dev.read::<2>(0x04).unwrap(), [0x34, 0x12]);
        assert_eq!(dev.read_u16(0x04).unwrap(), 0x1234);
    }

    #[test]
    fn absent_device_maps_to_bus_error() {
        let mut bus = MockBus::new();
        let mut dev = RegisterDevice::new(&mut bus, 0x50);
        match dev.read_u8(0) {
            Err(BoardError::Bus { address, .. }) => assert_eq!(address, 0x50),
            other => panic!("expected bus error, got {other:?}"),
        }
    }

    #[test]
    fn revision_format() {
        let mut bus = MockBus::new();
        bus.attach(0x48).set(0x48, 0x78, &[1, 5]);
        let mut dev = RegisterDevice::new(&mut bus, 0x48);
        assert_eq!(dev.read_revision(0x78).unwrap(), "1.05");
    }
}
