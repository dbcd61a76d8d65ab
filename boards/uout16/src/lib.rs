//! I2C driver for the Sequent Microsystems 16 universal output HAT.

use embedded_hal::i2c::I2c;
use hatctl_core::{
    millivolts_to_volts, volts_to_millivolts, Board, BoardInfo, BoardType, CalibrationStatus,
    HasUniversalOutputs, RegisterDevice, Result, StackAddress,
};

pub mod consts {
    pub const BASE_ADDRESS: u8 = 0x58;

    /// 16 x u16, millivolts
    pub const U_OUT_VAL1: u8 = 0x04;
    pub const CALIB_STATUS: u8 = 0x2A;
    pub const REVISION_MAJOR: u8 = 0x78;
}

/// Static board info for detection
pub static INFO: BoardInfo = BoardInfo {
    board_type: BoardType::UniversalOutput16,
    name: "16-UOut",
    base_address: consts::BASE_ADDRESS,
};

const fn channel_reg(channel: u8) -> u8 {
    consts::U_OUT_VAL1 + (channel - 1) * 2
}

pub struct Uout16<I> {
    regs: RegisterDevice<I>,
    stack: StackAddress,
}

impl<I: I2c> Uout16<I> {
    pub fn new(bus: I, stack: StackAddress) -> Self {
        Self {
            regs: RegisterDevice::new(bus, INFO.address(stack)),
            stack,
        }
    }
}

impl<I: I2c> Board for Uout16<I> {
    fn info(&self) -> &'static BoardInfo {
        &INFO
    }

    fn stack(&self) -> StackAddress {
        self.stack
    }

    fn probe(&mut self) -> Result<Option<String>> {
        self.regs.read_revision(consts::REVISION_MAJOR).map(Some)
    }

    fn as_universal_outputs(&mut self) -> Option<&mut dyn HasUniversalOutputs> {
        Some(self)
    }
}

impl<I: I2c> HasUniversalOutputs for Uout16<I> {
    fn universal_output(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(channel))
            .map(millivolts_to_volts)
    }

    fn set_universal_output(&mut self, channel: u8, volts: f64) -> Result<()> {
        self.regs
            .write_u16(channel_reg(channel), volts_to_millivolts(volts))
    }

    fn calibration_status(&mut self) -> Result<CalibrationStatus> {
        CalibrationStatus::from_register(self.regs.read_u8(consts::CALIB_STATUS)?)
    }
}
