//! Shared I/O expander protocol for Sequent Microsystems relay boards.
//!
//! Both relay boards drive their coils from a PCA953x port expander:
//! - 8 relays: PCA9538, one 8-bit port
//! - 16 relays: PCA9535, two 8-bit ports read as one little-endian word
//!
//! ## Protocol Overview
//!
//! The relay state lives in the output latch, which reads back exactly what
//! was last written. Relays are not wired to the port bits in order, so every
//! board carries a remap table: `remap[i]` is the port bit driving relay `i + 1`.

use embedded_hal::i2c::I2c;
use hatctl_core::{RegisterDevice, Result};

/// Port width of the expander
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// PCA9538
    Eight,
    /// PCA9535
    Sixteen,
}

impl Width {
    const fn output_reg(self) -> u8 {
        match self {
            Width::Eight => 0x01,
            Width::Sixteen => 0x02,
        }
    }

    const fn config_reg(self) -> u8 {
        match self {
            Width::Eight => 0x03,
            Width::Sixteen => 0x06,
        }
    }
}

/// Translate a logical relay mask (bit 0 = relay 1) to port bits
pub fn to_port(logical: u16, remap: &[u16]) -> u16 {
    remap
        .iter()
        .enumerate()
        .filter(|(i, _)| logical & (1 << i) != 0)
        .fold(0, |port, (_, bit)| port | bit)
}

/// Translate port bits back to a logical relay mask
pub fn from_port(port: u16, remap: &[u16]) -> u16 {
    remap
        .iter()
        .enumerate()
        .filter(|(_, bit)| port & **bit != 0)
        .fold(0, |logical, (i, _)| logical | (1 << i))
}

pub struct Expander<I> {
    regs: RegisterDevice<I>,
    width: Width,
    configured: bool,
}

impl<I: I2c> Expander<I> {
    pub fn new(bus: I, address: u8, width: Width) -> Self {
        Self {
            regs: RegisterDevice::new(bus, address),
            width,
            configured: false,
        }
    }

    pub fn address(&self) -> u8 {
        self.regs.address()
    }

    /// Current output latch
    pub fn outputs(&mut self) -> Result<u16> {
        match self.width {
            Width::Eight => self.regs.read_u8(self.width.output_reg()).map(u16::from),
            Width::Sixteen => self.regs.read_u16(self.width.output_reg()),
        }
    }

    /// Write the output latch, switching every pin to output first if the
    /// board came up with inputs configured.
    pub fn set_outputs(&mut self, port: u16) -> Result<()> {
        self.ensure_outputs()?;
        match self.width {
            Width::Eight => self.regs.write_u8(self.width.output_reg(), port as u8),
            Width::Sixteen => self.regs.write_u16(self.width.output_reg(), port),
        }
    }

    fn ensure_outputs(&mut self) -> Result<()> {
        if self.configured {
            return Ok(());
        }
        let reg = self.width.config_reg();
        let config = match self.width {
            Width::Eight => self.regs.read_u8(reg).map(u16::from)?,
            Width::Sixteen => self.regs.read_u16(reg)?,
        };
        if config != 0 {
            match self.width {
                Width::Eight => self.regs.write_u8(reg, 0)?,
                Width::Sixteen => self.regs.write_u16(reg, 0)?,
            }
        }
        self.configured = true;
        Ok(())
    }
}
