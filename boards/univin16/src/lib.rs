//! I2C driver for the Sequent Microsystems 16 universal input HAT.
//!
//! Every channel is sampled three ways at once (0-10V, 1k and 10k
//! thermistor) and also reported as a digital level.

use embedded_hal::i2c::I2c;
use hatctl_core::{
    millivolts_to_volts, Board, BoardInfo, BoardType, HasRtc, HasUniversalInputs, RegisterDevice,
    Result, RtcReading, StackAddress,
};

pub mod consts {
    pub const BASE_ADDRESS: u8 = 0x58;

    pub const DIGITAL_INPUTS: u8 = 0x00;
    /// 16 x u16, millivolts
    pub const U_IN_VAL1: u8 = 0x02;
    /// 16 x u16, ohms
    pub const R_1K_CH1: u8 = 0x22;
    /// 16 x u16, tens of ohms
    pub const R_10K_CH1: u8 = 0x42;
    pub const RTC_YEAR: u8 = 0x64;
    pub const REVISION_MAJOR: u8 = 0x78;
}

/// Static board info for detection
pub static INFO: BoardInfo = BoardInfo {
    board_type: BoardType::UniversalInput16,
    name: "16-UnivIn",
    base_address: consts::BASE_ADDRESS,
};

const fn channel_reg(base: u8, channel: u8) -> u8 {
    base + (channel - 1) * 2
}

pub struct Univin16<I> {
    regs: RegisterDevice<I>,
    stack: StackAddress,
}

impl<I: I2c> Univin16<I> {
    pub fn new(bus: I, stack: StackAddress) -> Self {
        Self {
            regs: RegisterDevice::new(bus, INFO.address(stack)),
            stack,
        }
    }
}

impl<I: I2c> Board for Univin16<I> {
    fn info(&self) -> &'static BoardInfo {
        &INFO
    }

    fn stack(&self) -> StackAddress {
        self.stack
    }

    fn probe(&mut self) -> Result<Option<String>> {
        self.regs.read_revision(consts::REVISION_MAJOR).map(Some)
    }

    fn as_universal_inputs(&mut self) -> Option<&mut dyn HasUniversalInputs> {
        Some(self)
    }

    fn as_rtc(&mut self) -> Option<&mut dyn HasRtc> {
        Some(self)
    }
}

impl<I: I2c> HasUniversalInputs for Univin16<I> {
    fn universal_voltage(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(consts::U_IN_VAL1, channel))
            .map(millivolts_to_volts)
    }

    fn universal_resistance_1k(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(consts::R_1K_CH1, channel))
            .map(|ohms| f64::from(ohms) / 1000.0)
    }

    fn universal_resistance_10k(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(consts::R_10K_CH1, channel))
            .map(|tens| f64::from(tens) / 100.0)
    }

    fn digital_inputs(&mut self) -> Result<u16> {
        self.regs.read_u16(consts::DIGITAL_INPUTS)
    }
}

impl<I: I2c> HasRtc for Univin16<I> {
    fn rtc(&mut self) -> Result<RtcReading> {
        RtcReading::from_registers(self.regs.read(consts::RTC_YEAR)?)
    }
}
