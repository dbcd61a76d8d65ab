//! Serializable reading types shared by all boards.

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::features::{BoardError, Result};

/// Unpack a channel bitmask, bit 0 = channel 1.
///
/// Bits at or above `count` are ignored.
pub fn unpack_mask(mask: u32, count: u8) -> Vec<bool> {
    (0..u32::from(count))
        .map(|bit| bit < 32 && mask & (1 << bit) != 0)
        .collect()
}

/// Convert a raw millivolt register value to volts
#[inline]
pub fn millivolts_to_volts(raw: u16) -> f64 {
    f64::from(raw) / 1000.0
}

/// Convert volts to the millivolt register value, rounding to the nearest mV
#[inline]
pub fn volts_to_millivolts(volts: f64) -> u16 {
    (volts * 1000.0).round().clamp(0.0, f64::from(u16::MAX)) as u16
}

/// Per-channel values, serialized as `{"ch1": .., "ch2": ..}`
#[derive(Debug, Clone, PartialEq)]
pub struct Channels<T>(pub Vec<T>);

impl<T> Channels<T> {
    /// Collect readings for channels `1..=count`
    pub fn read(count: u8, mut f: impl FnMut(u8) -> Result<T>) -> Result<Self> {
        (1..=count).map(&mut f).collect::<Result<Vec<_>>>().map(Self)
    }

    /// Value of a 1-based channel
    pub fn get(&self, channel: u8) -> Option<&T> {
        usize::from(channel).checked_sub(1).and_then(|i| self.0.get(i))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Channels<bool> {
    pub fn from_mask(mask: u32, count: u8) -> Self {
        Self(unpack_mask(mask, count))
    }
}

impl<T: Serialize> Serialize for Channels<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (i, value) in self.0.iter().enumerate() {
            map.serialize_entry(&format!("ch{}", i + 1), value)?;
        }
        map.end()
    }
}

/// All three interpretations of a configurable input pin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputReading {
    #[serde(rename = "0_10V")]
    pub voltage: f64,
    pub resistance_1k: f64,
    pub resistance_10k: f64,
}

/// Which contact edges increment the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    None,
    Rising,
    Falling,
    Both,
}

impl EdgeMode {
    pub fn from_flags(rising: bool, falling: bool) -> Self {
        match (rising, falling) {
            (false, false) => EdgeMode::None,
            (true, false) => EdgeMode::Rising,
            (false, true) => EdgeMode::Falling,
            (true, true) => EdgeMode::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContactReading {
    pub state: bool,
    pub counter: u32,
    pub edge_mode: EdgeMode,
}

/// Supply rails and board temperature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemSensors {
    pub power_supply_v: f64,
    pub raspberry_v: f64,
    pub cpu_temp_c: f64,
}

/// Calendar time held by an on-board RTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RtcReading {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl RtcReading {
    /// Decode the six RTC registers (year is stored as an offset from 2000)
    pub fn from_registers(raw: [u8; 6]) -> Result<Self> {
        let [year, month, day, hour, minute, second] = raw;
        let year = 2000 + u16::from(year);
        NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            .and_then(|d| d.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
            .ok_or(BoardError::InvalidResponse("rtc holds an invalid date"))?;
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }
}

/// Watchdog timer configuration and counters, periods in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchdogStatus {
    pub period: u16,
    pub default_period: u16,
    pub off_interval: u32,
    pub reset_count: u16,
}

/// Output calibration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    InProgress,
    Done,
    Error,
}

impl CalibrationStatus {
    pub fn from_register(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(CalibrationStatus::InProgress),
            1 => Ok(CalibrationStatus::Done),
            2 => Ok(CalibrationStatus::Error),
            _ => Err(BoardError::InvalidResponse("unknown calibration status")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_mask_is_bit_exact() {
        assert_eq!(
            unpack_mask(0b0000_0101, 8),
            [true, false, true, false, false, false, false, false]
        );
        assert_eq!(unpack_mask(0, 4), [false; 4]);
        assert_eq!(unpack_mask(0xFFFF, 16), [true; 16]);
        // bits beyond the channel count are ignored
        assert_eq!(unpack_mask(0x1F0, 4), [false; 4]);
    }

    #[test]
    fn millivolt_conversion() {
        assert_eq!(volts_to_millivolts(7.5), 7500);
        assert_eq!(volts_to_millivolts(0.0), 0);
        assert_eq!(volts_to_millivolts(10.0), 10_000);
        assert_eq!(millivolts_to_volts(2345), 2.345);
    }

    #[test]
    fn channels_serialize_in_order() {
        let channels = Channels((1..=12).collect::<Vec<u32>>());
        let json = serde_json::to_string(&channels).unwrap();
        assert!(json.starts_with(r#"{"ch1":1,"ch2":2,"#));
        assert!(json.ends_with(r#""ch11":11,"ch12":12}"#));
        assert_eq!(channels.get(12), Some(&12));
        assert_eq!(channels.get(0), None);
        assert_eq!(channels.get(13), None);
    }

    #[test]
    fn rtc_decoding() {
        let rtc = RtcReading::from_registers([24, 2, 29, 23, 59, 58]).unwrap();
        assert_eq!(rtc.year, 2024);
        assert_eq!((rtc.month, rtc.day), (2, 29));
        assert!(RtcReading::from_registers([23, 2, 29, 0, 0, 0]).is_err());
        assert!(RtcReading::from_registers([24, 13, 1, 0, 0, 0]).is_err());
    }

    #[test]
    fn edge_flags() {
        assert_eq!(EdgeMode::from_flags(true, true), EdgeMode::Both);
        assert_eq!(EdgeMode::from_flags(false, true), EdgeMode::Falling);
        assert_eq!(
            serde_json::to_value(EdgeMode::Rising).unwrap(),
            serde_json::json!("rising")
        );
    }
}
