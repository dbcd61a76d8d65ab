//! Core Board trait and related types.

use crate::capability::{BoardCapability, BoardType, StackAddress};
use crate::features::{
    HasAnalogOutputs, HasConfigurableInputs, HasDryContacts, HasRelays, HasRtc,
    HasSystemSensors, HasTriacs, HasUniversalInputs, HasUniversalOutputs, HasWatchdog, Result,
};

/// Static information about a board type for detection and CLI
#[derive(Debug, Clone, Copy)]
pub struct BoardInfo {
    pub board_type: BoardType,
    /// Human readable name, e.g. "MegaBAS"
    pub name: &'static str,
    /// I2C address of the board at stack level 0
    pub base_address: u8,
}

impl BoardInfo {
    /// Bus address of this board type at a stack level
    pub const fn address(&self, stack: StackAddress) -> u8 {
        self.base_address + stack.get()
    }

    pub const fn capability(&self) -> &'static BoardCapability {
        self.board_type.capability()
    }
}

/// Core board trait - object-safe for `dyn Board`
///
/// Boards should provide a static `INFO` constant and a `new()` constructor
/// taking an I2C device and a stack level.
pub trait Board {
    /// Get board info (instance method for object safety)
    fn info(&self) -> &'static BoardInfo;

    fn stack(&self) -> StackAddress;

    /// Cheap presence check. Returns the firmware version when the board
    /// reports one.
    fn probe(&mut self) -> Result<Option<String>>;

    /// Feature opt-in methods - override to return `Some(self)` if feature is supported
    fn as_triacs(&mut self) -> Option<&mut dyn HasTriacs> {
        None
    }
    fn as_analog_outputs(&mut self) -> Option<&mut dyn HasAnalogOutputs> {
        None
    }
    fn as_configurable_inputs(&mut self) -> Option<&mut dyn HasConfigurableInputs> {
        None
    }
    fn as_dry_contacts(&mut self) -> Option<&mut dyn HasDryContacts> {
        None
    }
    fn as_system_sensors(&mut self) -> Option<&mut dyn HasSystemSensors> {
        None
    }
    fn as_rtc(&mut self) -> Option<&mut dyn HasRtc> {
        None
    }
    fn as_watchdog(&mut self) -> Option<&mut dyn HasWatchdog> {
        None
    }
    fn as_relays(&mut self) -> Option<&mut dyn HasRelays> {
        None
    }
    fn as_universal_inputs(&mut self) -> Option<&mut dyn HasUniversalInputs> {
        None
    }
    fn as_universal_outputs(&mut self) -> Option<&mut dyn HasUniversalOutputs> {
        None
    }
}
