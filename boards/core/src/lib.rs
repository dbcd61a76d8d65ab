//! Core traits and types for Sequent Microsystems HAT drivers.
//!
//! This crate provides:
//! - The board registry (`BoardType`, `BoardCapability`) and request validation
//! - Feature traits (`HasTriacs`, `HasRelays`, etc.) that boards can implement
//! - The `Board` trait with `as_*()` methods for feature discovery
//! - Register access over `embedded_hal::i2c::I2c` and shared reading types

mod board;
mod capability;
mod features;
mod reading;
mod regs;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use board::{Board, BoardInfo};
pub use capability::{
    capability_of, check_channel, check_state, check_voltage, BoardCapability, BoardType,
    ChannelKind, StackAddress,
};
pub use features::{
    BoardError, HasAnalogOutputs, HasConfigurableInputs, HasDryContacts, HasRelays, HasRtc,
    HasSystemSensors, HasTriacs, HasUniversalInputs, HasUniversalOutputs, HasWatchdog, Result,
};
pub use reading::{
    millivolts_to_volts, unpack_mask, volts_to_millivolts, CalibrationStatus, Channels,
    ContactReading, EdgeMode, InputReading, RtcReading, SystemSensors, WatchdogStatus,
};
pub use regs::RegisterDevice;
