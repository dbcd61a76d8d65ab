//! Feature traits for board capabilities.
//!
//! Boards opt-in to features by implementing these traits and returning
//! `Some(self)` from the corresponding `as_*()` method in the Board trait.
//! All channel arguments are 1-based and assumed to be validated by the caller.

use embedded_hal::i2c::ErrorKind;

use crate::capability::{BoardType, ChannelKind};
use crate::reading::{CalibrationStatus, EdgeMode, RtcReading, SystemSensors, WatchdogStatus};

/// Errors that can occur during board operations
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Channel number outside the board's layout
    #[error("Invalid {label}channel: {channel}. {board} has {count} {kind} (1-{count})")]
    InvalidChannel {
        label: &'static str,
        channel: i64,
        board: BoardType,
        count: u8,
        kind: ChannelKind,
    },

    /// Output voltage outside 0-10V
    #[error("Invalid voltage: {0}. Range is 0-10V")]
    InvalidVoltage(f64),

    /// Switch value that is not a whole number
    #[error("Invalid state: {0}. Use 0 for off, any other whole number for on")]
    InvalidState(f64),

    /// Stack level outside 0-7
    #[error("Invalid stack level: {0}. Range is 0-7")]
    InvalidStack(i64),

    /// Board type name not recognized
    #[error("Unknown board type: {0}")]
    UnknownBoardType(String),

    /// Board does not expose the requested channel kind
    #[error("{board} has no {kind}")]
    Unsupported { board: BoardType, kind: ChannelKind },

    /// Driver for the board type is disabled or the bus is missing
    #[error("{board} driver not available: {reason}")]
    DriverUnavailable { board: BoardType, reason: String },

    /// Bus transaction failed (board absent, wiring, arbitration)
    #[error("i2c error at address {address:#04x}: {kind:?}")]
    Bus { address: u8, kind: ErrorKind },

    /// Board answered with data that makes no sense
    #[error("invalid response from board: {0}")]
    InvalidResponse(&'static str),
}

pub type Result<T> = std::result::Result<T, BoardError>;

/// AC triac outputs, state read back as a packed mask (bit 0 = channel 1)
pub trait HasTriacs {
    fn triacs(&mut self) -> Result<u16>;
    fn set_triac(&mut self, channel: u8, on: bool) -> Result<()>;
}

/// 0-10V analog outputs
pub trait HasAnalogOutputs {
    fn analog_output(&mut self, channel: u8) -> Result<f64>;
    fn set_analog_output(&mut self, channel: u8, volts: f64) -> Result<()>;
}

/// Inputs whose meaning depends on wiring; every interpretation is exposed
pub trait HasConfigurableInputs {
    /// Voltage assuming 0-10V wiring
    fn input_voltage(&mut self, channel: u8) -> Result<f64>;
    /// Resistance in kΩ assuming a 1k thermistor
    fn input_resistance_1k(&mut self, channel: u8) -> Result<f64>;
    /// Resistance in kΩ assuming a 10k thermistor
    fn input_resistance_10k(&mut self, channel: u8) -> Result<f64>;
}

/// Debounced dry contacts with edge counters
pub trait HasDryContacts {
    fn contacts(&mut self) -> Result<u16>;
    fn contact_counter(&mut self, channel: u8) -> Result<u32>;
    fn contact_edge(&mut self, channel: u8) -> Result<EdgeMode>;
}

/// On-board supply and temperature monitoring
pub trait HasSystemSensors {
    fn system_sensors(&mut self) -> Result<SystemSensors>;
}

/// Battery-backed real time clock
pub trait HasRtc {
    fn rtc(&mut self) -> Result<RtcReading>;
}

/// Hardware watchdog
pub trait HasWatchdog {
    fn watchdog(&mut self) -> Result<WatchdogStatus>;
}

/// Relay outputs, state read back as a logical mask (bit 0 = relay 1)
pub trait HasRelays {
    fn relays(&mut self) -> Result<u16>;
    fn set_relay(&mut self, channel: u8, on: bool) -> Result<()>;
    fn set_all_relays(&mut self, mask: u16) -> Result<()>;
}

/// Read-only universal inputs
pub trait HasUniversalInputs {
    fn universal_voltage(&mut self, channel: u8) -> Result<f64>;
    fn universal_resistance_1k(&mut self, channel: u8) -> Result<f64>;
    fn universal_resistance_10k(&mut self, channel: u8) -> Result<f64>;
    /// Dry-contact view of all inputs (bit 0 = channel 1)
    fn digital_inputs(&mut self) -> Result<u16>;
}

/// Write-only universal 0-10V outputs
pub trait HasUniversalOutputs {
    /// Last voltage written to the channel
    fn universal_output(&mut self, channel: u8) -> Result<f64>;
    fn set_universal_output(&mut self, channel: u8, volts: f64) -> Result<()>;
    fn calibration_status(&mut self) -> Result<CalibrationStatus>;
}
