//! I2C driver for the Sequent Microsystems Building Automation (MegaBAS) HAT.
//!
//! The board answers at `0x48 + stack` and exposes:
//! - 4 triacs for AC loads
//! - 4 0-10V analog outputs
//! - 8 configurable inputs (0-10V, 1k thermistor or dry contact, 10k thermistor)
//! - supply monitoring, an RTC and a hardware watchdog

use embedded_hal::i2c::I2c;
use hatctl_core::{
    millivolts_to_volts, volts_to_millivolts, Board, BoardInfo, BoardType, EdgeMode,
    HasAnalogOutputs, HasConfigurableInputs, HasDryContacts, HasRtc, HasSystemSensors, HasTriacs,
    HasWatchdog, RegisterDevice, Result, RtcReading, StackAddress, SystemSensors, WatchdogStatus,
};
use registers::channel_reg;

pub mod registers;

pub mod consts {
    pub const BASE_ADDRESS: u8 = 0x48;
}

/// Static board info for detection
pub static INFO: BoardInfo = BoardInfo {
    board_type: BoardType::Megabas,
    name: "MegaBAS",
    base_address: consts::BASE_ADDRESS,
};

pub struct Megabas<I> {
    regs: RegisterDevice<I>,
    stack: StackAddress,
}

impl<I: I2c> Megabas<I> {
    pub fn new(bus: I, stack: StackAddress) -> Self {
        Self {
            regs: RegisterDevice::new(bus, INFO.address(stack)),
            stack,
        }
    }

    /// Firmware version as "major.minor"
    pub fn firmware_version(&mut self) -> Result<String> {
        self.regs.read_revision(registers::REVISION_MAJOR)
    }
}

// === Trait Implementations ===

impl<I: I2c> Board for Megabas<I> {
    fn info(&self) -> &'static BoardInfo {
        &INFO
    }

    fn stack(&self) -> StackAddress {
        self.stack
    }

    fn probe(&mut self) -> Result<Option<String>> {
        self.firmware_version().map(Some)
    }

    fn as_triacs(&mut self) -> Option<&mut dyn HasTriacs> {
        Some(self)
    }

    fn as_analog_outputs(&mut self) -> Option<&mut dyn HasAnalogOutputs> {
        Some(self)
    }

    fn as_configurable_inputs(&mut self) -> Option<&mut dyn HasConfigurableInputs> {
        Some(self)
    }

    fn as_dry_contacts(&mut self) -> Option<&mut dyn HasDryContacts> {
        Some(self)
    }

    fn as_system_sensors(&mut self) -> Option<&mut dyn HasSystemSensors> {
        Some(self)
    }

    fn as_rtc(&mut self) -> Option<&mut dyn HasRtc> {
        Some(self)
    }

    fn as_watchdog(&mut self) -> Option<&mut dyn HasWatchdog> {
        Some(self)
    }
}

impl<I: I2c> HasTriacs for Megabas<I> {
    fn triacs(&mut self) -> Result<u16> {
        self.regs.read_u8(registers::TRIACS).map(u16::from)
    }

    fn set_triac(&mut self, channel: u8, on: bool) -> Result<()> {
        // single-channel set/clear registers leave the other triacs alone
        let reg = if on {
            registers::TRIAC_SET
        } else {
            registers::TRIAC_CLR
        };
        self.regs.write_u8(reg, channel)
    }
}

impl<I: I2c> HasAnalogOutputs for Megabas<I> {
    fn analog_output(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(registers::U0_10_OUT_VAL1, channel, 2))
            .map(millivolts_to_volts)
    }

    fn set_analog_output(&mut self, channel: u8, volts: f64) -> Result<()> {
        self.regs.write_u16(
            channel_reg(registers::U0_10_OUT_VAL1, channel, 2),
            volts_to_millivolts(volts),
        )
    }
}

impl<I: I2c> HasConfigurableInputs for Megabas<I> {
    fn input_voltage(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(registers::U0_10_IN_VAL1, channel, 2))
            .map(millivolts_to_volts)
    }

    fn input_resistance_1k(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(registers::R_1K_CH1, channel, 2))
            .map(|ohms| f64::from(ohms) / 1000.0)
    }

    fn input_resistance_10k(&mut self, channel: u8) -> Result<f64> {
        self.regs
            .read_u16(channel_reg(registers::R_10K_CH1, channel, 2))
            .map(|tens| f64::from(tens) / 100.0)
    }
}

impl<I: I2c> HasDryContacts for Megabas<I> {
    fn contacts(&mut self) -> Result<u16> {
        self.regs.read_u8(registers::DRY_CONTACT).map(u16::from)
    }

    fn contact_counter(&mut self, channel: u8) -> Result<u32> {
        self.regs
            .read_u32(channel_reg(registers::DRY_CONTACT_COUNTERS, channel, 4))
    }

    fn contact_edge(&mut self, channel: u8) -> Result<EdgeMode> {
        let bit = 1u8 << (channel - 1);
        let rising = self.regs.read_u8(registers::DRY_CONTACT_RISING_ENABLE)?;
        let falling = self.regs.read_u8(registers::DRY_CONTACT_FALLING_ENABLE)?;
        Ok(EdgeMode::from_flags(rising & bit != 0, falling & bit != 0))
    }
}

impl<I: I2c> HasSystemSensors for Megabas<I> {
    fn system_sensors(&mut self) -> Result<SystemSensors> {
        Ok(SystemSensors {
            power_supply_v: millivolts_to_volts(self.regs.read_u16(registers::DIAG_24V)?),
            raspberry_v: millivolts_to_volts(self.regs.read_u16(registers::DIAG_5V)?),
            cpu_temp_c: f64::from(self.regs.read_u8(registers::DIAG_TEMPERATURE)?),
        })
    }
}

impl<I: I2c> HasRtc for Megabas<I> {
    fn rtc(&mut self) -> Result<RtcReading> {
        RtcReading::from_registers(self.regs.read(registers::RTC_YEAR)?)
    }
}

impl<I: I2c> HasWatchdog for Megabas<I> {
    fn watchdog(&mut self) -> Result<WatchdogStatus> {
        Ok(WatchdogStatus {
            period: self.regs.read_u16(registers::WDT_INTERVAL_GET)?,
            default_period: self.regs.read_u16(registers::WDT_INIT_INTERVAL_GET)?,
            off_interval: self.regs.read_u32(registers::WDT_POWER_OFF_INTERVAL_GET)?,
            reset_count: self.regs.read_u16(registers::WDT_RESET_COUNT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use hatctl_core::mock::MockBus;

    use super::*;

    fn bus_with_board(address: u8) -> MockBus {
        let mut bus = MockBus::new();
        bus.attach(address)
            .on_write(address, registers::TRIAC_SET, |regs, data| {
                regs[usize::from(registers::TRIACS)] |= 1 << (data[0] - 1);
            })
            .on_write(address, registers::TRIAC_CLR, |regs, data| {
                regs[usize::from(registers::TRIACS)] &= !(1 << (data[0] - 1));
            });
        bus
    }

    fn stack(n: i64) -> StackAddress {
        StackAddress::new(n).unwrap()
    }

    #[test]
    fn probe_reports_firmware() {
        let mut bus = bus_with_board(0x49);
        bus.set(0x49, registers::REVISION_MAJOR, &[1, 4]);
        let mut board = Megabas::new(&mut bus, stack(1));
        assert_eq!(board.probe().unwrap().as_deref(), Some("1.04"));
        assert_eq!(board.info().address(board.stack()), 0x49);
    }

    #[test]
    fn triacs_use_set_and_clear_registers() {
        let mut bus = bus_with_board(0x48);
        let mut board = Megabas::new(&mut bus, stack(0));
        board.set_triac(1, true).unwrap();
        board.set_triac(3, true).unwrap();
        board.set_triac(1, false).unwrap();
        assert_eq!(board.triacs().unwrap(), 0b0100);
        drop(board);
        assert_eq!(
            bus.writes(0x48),
            vec![
                (registers::TRIAC_SET, vec![1]),
                (registers::TRIAC_SET, vec![3]),
                (registers::TRIAC_CLR, vec![1]),
            ]
        );
    }

    #[test]
    fn analog_output_round_trip() {
        let mut bus = bus_with_board(0x48);
        let mut board = Megabas::new(&mut bus, stack(0));
        board.set_analog_output(2, 7.5).unwrap();
        assert_eq!(board.analog_output(2).unwrap(), 7.5);
        assert_eq!(board.analog_output(1).unwrap(), 0.0);
        drop(board);
        assert_eq!(bus.get_u16(0x48, 0x06), 7500);
    }

    #[test]
    fn configurable_input_interpretations() {
        let mut bus = bus_with_board(0x48);
        bus.set_u16(0x48, channel_reg(registers::U0_10_IN_VAL1, 8, 2), 4_321)
            .set_u16(0x48, channel_reg(registers::R_1K_CH1, 8, 2), 1_085)
            .set_u16(0x48, channel_reg(registers::R_10K_CH1, 8, 2), 1_250);
        let mut board = Megabas::new(&mut bus, stack(0));
        assert_eq!(board.input_voltage(8).unwrap(), 4.321);
        assert_eq!(board.input_resistance_1k(8).unwrap(), 1.085);
        assert_eq!(board.input_resistance_10k(8).unwrap(), 12.5);
    }

    #[test]
    fn dry_contacts_and_counters() {
        let mut bus = bus_with_board(0x48);
        bus.set(0x48, registers::DRY_CONTACT, &[0b0000_0010])
            .set(0x48, registers::DRY_CONTACT_RISING_ENABLE, &[0b11])
            .set(0x48, registers::DRY_CONTACT_FALLING_ENABLE, &[0b10])
            .set(0x48, channel_reg(registers::DRY_CONTACT_COUNTERS, 2, 4), &70_000u32.to_le_bytes());
        let mut board = Megabas::new(&mut bus, stack(0));
        assert_eq!(board.contacts().unwrap(), 0b10);
        assert_eq!(board.contact_counter(2).unwrap(), 70_000);
        assert_eq!(board.contact_edge(1).unwrap(), EdgeMode::Rising);
        assert_eq!(board.contact_edge(2).unwrap(), EdgeMode::Both);
        assert_eq!(board.contact_edge(3).unwrap(), EdgeMode::None);
    }

    #[test]
    fn system_sensors_and_watchdog() {
        let mut bus = bus_with_board(0x48);
        bus.set_u16(0x48, registers::DIAG_24V, 24_150)
            .set_u16(0x48, registers::DIAG_5V, 5_080)
            .set(0x48, registers::DIAG_TEMPERATURE, &[41])
            .set_u16(0x48, registers::WDT_INTERVAL_GET, 120)
            .set_u16(0x48, registers::WDT_INIT_INTERVAL_GET, 270)
            .set(0x48, registers::WDT_POWER_OFF_INTERVAL_GET, &3600u32.to_le_bytes())
            .set_u16(0x48, registers::WDT_RESET_COUNT, 3);
        let mut board = Megabas::new(&mut bus, stack(0));
        let sensors = board.system_sensors().unwrap();
        assert_eq!(sensors.power_supply_v, 24.15);
        assert_eq!(sensors.raspberry_v, 5.08);
        assert_eq!(sensors.cpu_temp_c, 41.0);
        let wdt = board.watchdog().unwrap();
        assert_eq!((wdt.period, wdt.default_period), (120, 270));
        assert_eq!((wdt.off_interval, wdt.reset_count), (3600, 3));
    }

    #[test]
    fn rtc_read() {
        let mut bus = bus_with_board(0x48);
        bus.set(0x48, registers::RTC_YEAR, &[25, 10, 17, 8, 30, 0]);
        let mut board = Megabas::new(&mut bus, stack(0));
        let rtc = board.rtc().unwrap();
        assert_eq!((rtc.year, rtc.month, rtc.day), (2025, 10, 17));
    }
}
