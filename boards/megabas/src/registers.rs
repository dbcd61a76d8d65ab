//! MegaBAS register map.
//!
//! Layout (little-endian, 8-bit register addresses):
//! - 0x00: triac state mask, 0x01/0x02: set/clear a single triac (write channel number)
//! - 0x03: dry contact mask
//! - 0x04: 4 x u16 analog outputs, millivolts
//! - 0x0C: 8 x u16 0-10V inputs, millivolts
//! - 0x1C: 8 x u16 1k thermistor inputs, ohms
//! - 0x2C: 8 x u16 10k thermistor inputs, tens of ohms
//! - 0x43..0x56: watchdog
//! - 0x57..0x5C: RTC (year offset from 2000, month, day, hour, minute, second)
//! - 0x72..0x76: diagnostics (temperature, 24V rail, 5V rail)
//! - 0x78/0x79: firmware revision
//! - 0x7C..0x9E: dry contact edge configuration and counters

pub const TRIACS: u8 = 0x00;
pub const TRIAC_SET: u8 = 0x01;
pub const TRIAC_CLR: u8 = 0x02;
pub const DRY_CONTACT: u8 = 0x03;

pub const U0_10_OUT_VAL1: u8 = 0x04;
pub const U0_10_IN_VAL1: u8 = 0x0C;
pub const R_1K_CH1: u8 = 0x1C;
pub const R_10K_CH1: u8 = 0x2C;

pub const WDT_INTERVAL_GET: u8 = 0x46;
pub const WDT_INIT_INTERVAL_GET: u8 = 0x4A;
pub const WDT_RESET_COUNT: u8 = 0x4C;
pub const WDT_POWER_OFF_INTERVAL_GET: u8 = 0x53;

pub const RTC_YEAR: u8 = 0x57;

pub const DIAG_TEMPERATURE: u8 = 0x72;
pub const DIAG_24V: u8 = 0x73;
pub const DIAG_5V: u8 = 0x75;

pub const REVISION_MAJOR: u8 = 0x78;

pub const DRY_CONTACT_RISING_ENABLE: u8 = 0x7C;
pub const DRY_CONTACT_FALLING_ENABLE: u8 = 0x7D;
pub const DRY_CONTACT_COUNTERS: u8 = 0x7F;

/// Register of a 1-based channel in a block of `width`-byte values
#[inline]
pub const fn channel_reg(base: u8, channel: u8, width: u8) -> u8 {
    base + (channel - 1) * width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_do_not_overlap() {
        assert_eq!(channel_reg(U0_10_OUT_VAL1, 4, 2) + 2, U0_10_IN_VAL1);
        assert_eq!(channel_reg(U0_10_IN_VAL1, 8, 2) + 2, R_1K_CH1);
        assert_eq!(channel_reg(R_1K_CH1, 8, 2) + 2, R_10K_CH1);
        assert!(channel_reg(DRY_CONTACT_COUNTERS, 8, 4) + 3 < 0xFF);
    }
}
