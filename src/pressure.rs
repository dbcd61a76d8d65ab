//! P499 series pressure transducer scaling.
//!
//! The 0-10V models map their pressure span linearly onto the input voltage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use embedded_hal::i2c::I2c;
use hatctl_core::{check_voltage, BoardError, StackAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::read_input_voltage;
use crate::detection::Hardware;

#[derive(Debug, Error)]
pub enum PressureError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("Unknown transducer model: {0}")]
    UnknownModel(String),
    #[error("Voltage {0} outside transducer output range 0-10V")]
    VoltageOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransducerModel {
    #[serde(rename = "P499VAP-101C")]
    Vap101c,
    #[serde(rename = "P499VAP-102C")]
    Vap102c,
    #[default]
    #[serde(rename = "P499VAP-105C")]
    Vap105c,
    #[serde(rename = "P499VAP-107C")]
    Vap107c,
    #[serde(rename = "P499VAPS100C")]
    Vaps100c,
}

impl TransducerModel {
    pub const ALL: [TransducerModel; 5] = [
        TransducerModel::Vap101c,
        TransducerModel::Vap102c,
        TransducerModel::Vap105c,
        TransducerModel::Vap107c,
        TransducerModel::Vaps100c,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            TransducerModel::Vap101c => "P499VAP-101C",
            TransducerModel::Vap102c => "P499VAP-102C",
            TransducerModel::Vap105c => "P499VAP-105C",
            TransducerModel::Vap107c => "P499VAP-107C",
            TransducerModel::Vaps100c => "P499VAPS100C",
        }
    }

    /// Pressure span in psi as `(min, max)`
    pub const fn range(self) -> (f64, f64) {
        match self {
            TransducerModel::Vap101c => (0.0, 100.0),
            TransducerModel::Vap102c => (0.0, 200.0),
            TransducerModel::Vap105c => (0.0, 500.0),
            TransducerModel::Vap107c => (0.0, 750.0),
            TransducerModel::Vaps100c => (-10.0, 100.0),
        }
    }

    /// Pressure in psi for an output voltage, rounded to 2 decimals
    pub fn voltage_to_pressure(self, volts: f64) -> Result<f64, PressureError> {
        let volts = check_voltage(volts).map_err(|_| PressureError::VoltageOutOfRange(volts))?;
        let (min, max) = self.range();
        Ok(round_to(min + volts / 10.0 * (max - min), 2))
    }
}

impl FromStr for TransducerModel {
    type Err = PressureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PressureError::UnknownModel(s.to_string()))
    }
}

impl fmt::Display for TransducerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressureReading {
    pub success: bool,
    pub channel: u8,
    pub voltage: f64,
    /// psi
    pub pressure: f64,
    pub model: TransducerModel,
    pub range: String,
    pub timestamp: DateTime<Local>,
}

/// Read a transducer wired to a megabas 0-10V input
pub fn read_pressure<I: I2c>(
    hw: &Hardware<I>,
    stack: StackAddress,
    channel: i64,
    model: TransducerModel,
) -> Result<PressureReading, PressureError> {
    let (channel, voltage) = read_input_voltage(hw, stack, channel)?;
    let (min, max) = model.range();
    Ok(PressureReading {
        success: true,
        channel,
        voltage,
        pressure: model.voltage_to_pressure(voltage)?,
        model,
        range: format!("{min}-{max} psi"),
        timestamp: Local::now(),
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use hatctl_core::mock::MockBus;

    use super::*;
    use crate::config::DriversConfig;
    use crate::detection::DriverTable;

    /// Output voltage expected at a pressure, rounded to 3 decimals
    fn pressure_to_voltage(model: TransducerModel, psi: f64) -> Option<f64> {
        let (min, max) = model.range();
        (min..=max)
            .contains(&psi)
            .then(|| round_to((psi - min) / (max - min) * 10.0, 3))
    }

    #[test]
    fn linear_scaling() {
        let m = TransducerModel::Vap105c;
        assert_eq!(m.voltage_to_pressure(0.0).unwrap(), 0.0);
        assert_eq!(m.voltage_to_pressure(5.0).unwrap(), 250.0);
        assert_eq!(m.voltage_to_pressure(10.0).unwrap(), 500.0);
        assert_eq!(m.voltage_to_pressure(1.234).unwrap(), 61.7);
    }

    #[test]
    fn offset_range() {
        let m = TransducerModel::Vaps100c;
        assert_eq!(m.voltage_to_pressure(0.0).unwrap(), -10.0);
        assert_eq!(m.voltage_to_pressure(10.0).unwrap(), 100.0);
        assert_eq!(pressure_to_voltage(m, 0.0), Some(0.909));
    }

    #[test]
    fn scaling_inverts() {
        for model in TransducerModel::ALL {
            let (min, max) = model.range();
            for psi in [min, (min + max) / 2.0, max] {
                let volts = pressure_to_voltage(model, psi).unwrap();
                assert_eq!(model.voltage_to_pressure(volts).unwrap(), psi);
            }
        }
        assert_eq!(pressure_to_voltage(TransducerModel::Vap107c, 300.0), Some(4.0));
        assert_eq!(pressure_to_voltage(TransducerModel::Vap101c, 101.0), None);
    }

    #[test]
    fn voltage_out_of_range() {
        assert!(matches!(
            TransducerModel::Vap102c.voltage_to_pressure(10.5),
            Err(PressureError::VoltageOutOfRange(v)) if v == 10.5
        ));
        assert!(TransducerModel::Vap102c.voltage_to_pressure(-0.1).is_err());
    }

    fn megabas_with_input(millivolts: u16) -> Hardware<MockBus> {
        let mut bus = MockBus::new();
        // input 3 of the megabas at stack 0
        bus.attach(0x48).set_u16(0x48, 0x10, millivolts);
        Hardware::new(Some(bus), DriverTable::new(&DriversConfig::default(), None))
    }

    #[test]
    fn reads_pressure_from_megabas_input() {
        let hw = megabas_with_input(2_500);
        let stack = StackAddress::new(0).unwrap();
        let reading = read_pressure(&hw, stack, 3, TransducerModel::Vap101c).unwrap();
        assert_eq!((reading.channel, reading.voltage, reading.pressure), (3, 2.5, 25.0));
        assert_eq!(reading.range, "0-100 psi");

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["model"], "P499VAP-101C");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn over_range_input_is_an_error() {
        let hw = megabas_with_input(10_400);
        let stack = StackAddress::new(0).unwrap();
        let err = read_pressure(&hw, stack, 3, TransducerModel::Vaps100c).unwrap_err();
        assert!(matches!(err, PressureError::VoltageOutOfRange(_)));
        let err = read_pressure(&hw, stack, 9, TransducerModel::Vaps100c).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input channel: 9. megabas has 8 configurable inputs (1-8)");
    }

    #[test]
    fn model_names() {
        assert_eq!(
            "p499vap-107c".parse::<TransducerModel>().unwrap(),
            TransducerModel::Vap107c
        );
        let err = "P499".parse::<TransducerModel>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown transducer model: P499");
        assert_eq!(TransducerModel::default().to_string(), "P499VAP-105C");
        let json = serde_json::to_string(&TransducerModel::Vaps100c).unwrap();
        assert_eq!(json, "\"P499VAPS100C\"");
    }
}
