//! I2C driver for the Sequent Microsystems 8 industrial relay HAT.
//!
//! The relays hang off a PCA9538 at `0x38 + stack`.

use embedded_hal::i2c::I2c;
use hatctl_core::{Board, BoardInfo, BoardType, HasRelays, Result, StackAddress};
use hatctl_pca953x::{from_port, to_port, Expander, Width};

pub mod consts {
    pub const BASE_ADDRESS: u8 = 0x38;
    pub const RELAY_COUNT: u8 = 8;
    /// Port bit driving each relay, relay 1 first
    pub const REMAP: [u16; 8] = [0x01, 0x04, 0x40, 0x10, 0x20, 0x80, 0x08, 0x02];
}

/// Static board info for detection
pub static INFO: BoardInfo = BoardInfo {
    board_type: BoardType::Relay8,
    name: "8-Relay",
    base_address: consts::BASE_ADDRESS,
};

pub struct Relay8<I> {
    port: Expander<I>,
    stack: StackAddress,
}

impl<I: I2c> Relay8<I> {
    pub fn new(bus: I, stack: StackAddress) -> Self {
        Self {
            port: Expander::new(bus, INFO.address(stack), Width::Eight),
            stack,
        }
    }
}

impl<I: I2c> Board for Relay8<I> {
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

impl<I: I2c> HasRelays for Relay8<I> {
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
        let mask = mask & ((1 << consts::RELAY_COUNT) - 1);
        self.port.set_outputs(to_port(mask, &consts::REMAP))
    }
}

#[cfg(test)]
mod tests {
    use hatctl_core::mock::MockBus;

    use super::*;

    fn stack(n: i64) -> StackAddress {
        StackAddress::new(n).unwrap()
    }

    #[test]
    fn relay_mask_is_remapped() {
        let mut bus = MockBus::new();
        bus.attach(0x3A).set(0x3A, 0x01, &[0x01 | 0x40]);
        let mut board = Relay8::new(&mut bus, stack(2));
        // port bits 0x01 and 0x40 drive relays 1 and 3
        assert_eq!(board.relays().unwrap(), 0b0000_0101);
    }

    #[test]
    fn set_relay_touches_only_its_channel() {
        let mut bus = MockBus::new();
        bus.attach(0x38);
        let mut board = Relay8::new(&mut bus, stack(0));
        board.set_relay(2, true).unwrap();
        board.set_relay(8, true).unwrap();
        board.set_relay(2, false).unwrap();
        assert_eq!(board.relays().unwrap(), 0b1000_0000);
        drop(board);
        assert_eq!(bus.get(0x38, 0x01), 0x02);
    }

    #[test]
    fn probe_fails_when_absent() {
        let mut bus = MockBus::new();
        let mut board = Relay8::new(&mut bus, stack(1));
        assert!(board.probe().is_err());
    }
}
