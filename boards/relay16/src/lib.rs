//! I2C driver for the Sequent Microsystems 16 industrial relay HAT.
//!
//! Relays are driven by a PCA9535 at `0x20 + stack`; both 8-bit ports are
//! accessed as one little-endian word.

use embedded_hal::i2c::I2c;
use hatctl_core::{Board, BoardInfo, BoardType, HasRelays, Result, StackAddress};
use hatctl_pca953x::{from_port, to_port, Expander, Width};

pub mod consts {
    pub const BASE_ADDRESS: u8 = 0x20;
    /// Port bit driving each relay, relay 1 first. The board wires the
    /// relays to the port in reverse order.
    pub const REMAP: [u16; 16] = [
        0x8000, 0x4000, 0x2000, 0x1000, 0x0800, 0x0400, 0x0200, 0x0100, 0x0080, 0x0040, 0x0020,
        0x0010, 0x0008, 0x0004, 0x0002, 0x0001,
    ];
}

/// Static board info for detection
pub static INFO: BoardInfo = BoardInfo {
    board_type: BoardType::Relay16,
    name: "16-Relay",
    base_address: consts::BASE_ADDRESS,
};

pub struct Relay16<I> {
    port: Expander<I>,
    stack: StackAddress,
}

impl<I: I2c> Relay16<I> {
    pub fn new(bus: I, stack: StackAddress) -> Self {
        Self {
            port: Expander::new(bus, INFO.address(stack), Width::Sixteen),
            stack,
        }
    }
}

impl<I: I2c> Board for Relay16<I> {
    fn info(&self) -> &'static BoardInfo {
        &INFO
    }

    fn stack(&self) -> StackAddress {
        self.stack
    }

    fn probe(&mut self) -> Result<Option<String>> {
        self.port.outputs()?;
        Ok(None)
    }

    fn as_relays(&mut self) -> Option<&mut dyn HasRelays> {
        Some(self)
    }
}

impl<I: I2c> HasRelays for Relay16<I> {
    fn relays(&mut self) -> Result<u16> {
        self.port.outputs().map(|port| from_port(port, &consts::REMAP))
    }

    fn set_relay(&mut self, channel: u8, on: bool) -> Result<()> {
        let bit = 1u16 << (channel - 1);
        let current = self.relays()?;
        let next = if on { current | bit } else { current & !bit };
        self.set_all_relays(next)
    }

    fn set_all_relays(&mut self, mask: u16) -> Result<()> {
        self.port.set_outputs(to_port(mask, &consts::REMAP))
    }
}

#[cfg(test)]
mod tests {
    use hatctl_core::mock::MockBus;

    use super::*;

    #[test]
    fn relays_are_wired_in_reverse() {
        let mut bus = MockBus::new();
        bus.attach(0x21).set_u16(0x21, 0x02, 0x8001);
        let mut board = Relay16::new(&mut bus, StackAddress::new(1).unwrap());
        assert_eq!(board.relays().unwrap(), 0x8001);

        board.set_relay(9, true).unwrap();
        drop(board);
        assert_eq!(bus.get_u16(0x21, 0x02), 0x8081);
    }

    #[test]
    fn all_off() {
        let mut bus = MockBus::new();
        bus.attach(0x20).set_u16(0x20, 0x02, 0xFFFF);
        let mut board = Relay16::new(&mut bus, StackAddress::new(0).unwrap());
        board.set_all_relays(0).unwrap();
        assert_eq!(board.relays().unwrap(), 0);
    }
}
