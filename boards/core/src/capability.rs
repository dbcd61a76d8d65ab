//! Static per-board channel layout.
//!
//! Every request is checked against these tables before any bus traffic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::features::{BoardError, Result};

/// Supported board types, in discovery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoardType {
    /// Building automation HAT (SM-I-002)
    #[serde(rename = "megabas")]
    Megabas,
    /// 8 industrial relays
    #[serde(rename = "8relind")]
    Relay8,
    /// 16 industrial relays
    #[serde(rename = "16relind")]
    Relay16,
    /// 16 universal inputs
    #[serde(rename = "16univin")]
    UniversalInput16,
    /// 16 0-10V outputs
    #[serde(rename = "16uout")]
    UniversalOutput16,
}

impl BoardType {
    pub const ALL: [BoardType; 5] = [
        BoardType::Megabas,
        BoardType::Relay8,
        BoardType::Relay16,
        BoardType::UniversalInput16,
        BoardType::UniversalOutput16,
    ];

    /// Name used on the command line and in json output
    pub const fn cli_name(self) -> &'static str {
        match self {
            BoardType::Megabas => "megabas",
            BoardType::Relay8 => "8relind",
            BoardType::Relay16 => "16relind",
            BoardType::UniversalInput16 => "16univin",
            BoardType::UniversalOutput16 => "16uout",
        }
    }

    pub const fn capability(self) -> &'static BoardCapability {
        match self {
            BoardType::Megabas => &MEGABAS,
            BoardType::Relay8 => &RELAY8,
            BoardType::Relay16 => &RELAY16,
            BoardType::UniversalInput16 => &UNIVIN16,
            BoardType::UniversalOutput16 => &UOUT16,
        }
    }
}

impl FromStr for BoardType {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        BoardType::ALL
            .into_iter()
            .find(|b| b.cli_name() == s)
            .ok_or_else(|| BoardError::UnknownBoardType(s.to_string()))
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

/// Capability lookup, total over [`BoardType`]
pub fn capability_of(board: BoardType) -> &'static BoardCapability {
    board.capability()
}

/// Kinds of addressable channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Triac,
    AnalogOutput,
    ConfigurableInput,
    Relay,
    UniversalInput,
    UniversalOutput,
}

impl ChannelKind {
    /// Prefix used in validation messages, e.g. "Invalid relay channel"
    fn label(self) -> &'static str {
        match self {
            ChannelKind::Triac => "triac ",
            ChannelKind::AnalogOutput => "analog ",
            ChannelKind::ConfigurableInput => "input ",
            ChannelKind::Relay => "relay ",
            ChannelKind::UniversalInput | ChannelKind::UniversalOutput => "",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            ChannelKind::Triac => "triacs",
            ChannelKind::AnalogOutput => "analog outputs",
            ChannelKind::ConfigurableInput => "configurable inputs",
            ChannelKind::Relay => "relays",
            ChannelKind::UniversalInput => "inputs",
            ChannelKind::UniversalOutput => "outputs",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Fixed channel layout and feature flags of a board type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardCapability {
    pub description: &'static str,
    #[serde(skip_serializing_if = "is_zero")]
    pub triacs: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub relays: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub analog_outputs: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub configurable_inputs: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub universal_inputs: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub universal_outputs: u8,
    #[serde(skip_serializing_if = "is_false")]
    pub has_rtc: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub has_watchdog: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub has_rs485: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub power_monitoring: bool,
    #[serde(rename = "has_leds", skip_serializing_if = "is_zero")]
    pub leds: u8,
}

impl BoardCapability {
    const EMPTY: BoardCapability = BoardCapability {
        description: "",
        triacs: 0,
        relays: 0,
        analog_outputs: 0,
        configurable_inputs: 0,
        universal_inputs: 0,
        universal_outputs: 0,
        has_rtc: false,
        has_watchdog: false,
        has_rs485: false,
        power_monitoring: false,
        leds: 0,
    };

    /// Number of channels of the given kind (0 if not exposed)
    pub const fn channels(&self, kind: ChannelKind) -> u8 {
        match kind {
            ChannelKind::Triac => self.triacs,
            ChannelKind::AnalogOutput => self.analog_outputs,
            ChannelKind::ConfigurableInput => self.configurable_inputs,
            ChannelKind::Relay => self.relays,
            ChannelKind::UniversalInput => self.universal_inputs,
            ChannelKind::UniversalOutput => self.universal_outputs,
        }
    }

    /// Whether the board has anything that can be switched or driven
    pub const fn has_outputs(&self) -> bool {
        self.triacs + self.relays + self.analog_outputs + self.universal_outputs > 0
    }
}

/// Validate a 1-based channel number against a board's layout.
///
/// Returns the channel narrowed to `u8` on success.
pub fn check_channel(board: BoardType, kind: ChannelKind, channel: i64) -> Result<u8> {
    let count = board.capability().channels(kind);
    if count == 0 {
        return Err(BoardError::Unsupported { board, kind });
    }
    if channel < 1 || channel > i64::from(count) {
        return Err(BoardError::InvalidChannel {
            label: kind.label(),
            channel,
            board,
            count,
            kind,
        });
    }
    Ok(channel as u8)
}

/// Validate a 0-10V output value
pub fn check_voltage(value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=10.0).contains(&value) {
        Ok(value)
    } else {
        Err(BoardError::InvalidVoltage(value))
    }
}

/// Validate an on/off value. Zero is off, any other whole number is on.
pub fn check_state(value: f64) -> Result<bool> {
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value != 0.0)
    } else {
        Err(BoardError::InvalidState(value))
    }
}

/// Stack level of a board, always within `0..=7`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StackAddress(u8);

impl StackAddress {
    pub const MAX: u8 = 7;

    pub fn new(stack: i64) -> Result<Self> {
        if (0..=i64::from(Self::MAX)).contains(&stack) {
            Ok(Self(stack as u8))
        } else {
            Err(BoardError::InvalidStack(stack))
        }
    }

    /// All eight stack levels in ascending order
    pub fn all() -> impl Iterator<Item = StackAddress> {
        (0..=Self::MAX).map(StackAddress)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for StackAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const MEGABAS: BoardCapability = BoardCapability {
    description: "Building Automation System board",
    triacs: 4,
    analog_outputs: 4,
    configurable_inputs: 8,
    has_rtc: true,
    has_watchdog: true,
    power_monitoring: true,
    ..BoardCapability::EMPTY
};

const RELAY8: BoardCapability = BoardCapability {
    description: "8 Industrial Relay board",
    relays: 8,
    ..BoardCapability::EMPTY
};

const RELAY16: BoardCapability = BoardCapability {
    description: "16 Industrial Relay board",
    relays: 16,
    ..BoardCapability::EMPTY
};

const UNIVIN16: BoardCapability = BoardCapability {
    description: "16 Universal INPUT board",
    universal_inputs: 16,
    has_rtc: true,
    has_rs485: true,
    leds: 16,
    ..BoardCapability::EMPTY
};

const UOUT16: BoardCapability = BoardCapability {
    description: "16 Universal OUTPUT board",
    universal_outputs: 16,
    has_rs485: true,
    leds: 16,
    ..BoardCapability::EMPTY
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        let mb = capability_of(BoardType::Megabas);
        assert_eq!(mb.triacs, 4);
        assert_eq!(mb.analog_outputs, 4);
        assert_eq!(mb.configurable_inputs, 8);
        assert!(mb.has_rtc && mb.has_watchdog);

        assert_eq!(capability_of(BoardType::Relay8).relays, 8);
        assert_eq!(capability_of(BoardType::Relay16).relays, 16);

        let univin = capability_of(BoardType::UniversalInput16);
        assert_eq!(univin.universal_inputs, 16);
        assert_eq!(univin.universal_outputs, 0);
        assert!(!univin.has_outputs());

        let uout = capability_of(BoardType::UniversalOutput16);
        assert_eq!(uout.universal_outputs, 16);
        assert_eq!(uout.universal_inputs, 0);
        assert!(uout.has_outputs());
    }

    #[test]
    fn board_type_names_round_trip() {
        for board in BoardType::ALL {
            assert_eq!(board.cli_name().parse::<BoardType>().unwrap(), board);
        }
        assert!(matches!(
            "32relind".parse::<BoardType>(),
            Err(BoardError::UnknownBoardType(_))
        ));
    }

    #[test]
    fn channel_bounds() {
        assert_eq!(check_channel(BoardType::Megabas, ChannelKind::AnalogOutput, 4).unwrap(), 4);
        assert!(check_channel(BoardType::Megabas, ChannelKind::AnalogOutput, 0).is_err());
        assert!(check_channel(BoardType::Megabas, ChannelKind::AnalogOutput, 5).is_err());
        assert!(check_channel(BoardType::Megabas, ChannelKind::ConfigurableInput, 8).is_ok());
        assert!(check_channel(BoardType::Relay16, ChannelKind::Relay, 16).is_ok());
        assert!(check_channel(BoardType::Relay16, ChannelKind::Relay, -3).is_err());
        assert!(matches!(
            check_channel(BoardType::Megabas, ChannelKind::Relay, 1),
            Err(BoardError::Unsupported { .. })
        ));
    }

    #[test]
    fn channel_error_message() {
        let err = check_channel(BoardType::Relay8, ChannelKind::Relay, 9).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid relay channel: 9. 8relind has 8 relays (1-8)"
        );
        let err = check_channel(BoardType::UniversalInput16, ChannelKind::UniversalInput, 17)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid channel: 17. 16univin has 16 inputs (1-16)"
        );
    }

    #[test]
    fn voltage_range() {
        assert!(check_voltage(0.0).is_ok());
        assert!(check_voltage(10.0).is_ok());
        assert!(check_voltage(-0.1).is_err());
        assert!(check_voltage(10.01).is_err());
        assert!(check_voltage(f64::NAN).is_err());
    }

    #[test]
    fn switch_values_must_be_whole() {
        assert!(!check_state(0.0).unwrap());
        assert!(check_state(1.0).unwrap());
        assert!(check_state(-2.0).unwrap());
        for bad in [0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(check_state(bad), Err(BoardError::InvalidState(_))));
        }
    }

    #[test]
    fn stack_bounds() {
        assert_eq!(StackAddress::new(7).unwrap().get(), 7);
        assert!(StackAddress::new(8).is_err());
        assert!(StackAddress::new(-1).is_err());
        assert_eq!(StackAddress::all().count(), 8);
    }

    #[test]
    fn capability_json_omits_absent_features() {
        let json = serde_json::to_value(capability_of(BoardType::Relay8)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "description": "8 Industrial Relay board", "relays": 8 })
        );
    }
}
