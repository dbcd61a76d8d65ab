//! Normalized board operations.
//!
//! Every operation validates its request against the board registry before
//! opening a driver, so a bad channel or value never reaches the bus.

use std::str::FromStr;

use chrono::{DateTime, Local};
use embedded_hal::i2c::I2c;
use hatctl_core::{
    check_channel, check_state, check_voltage, Board, BoardError, BoardType, CalibrationStatus, ChannelKind,
    Channels, ContactReading, InputReading, Result, RtcReading, StackAddress, SystemSensors,
    WatchdogStatus,
};
use serde::Serialize;
use thiserror::Error;

use crate::detection::Hardware;

/// Output addressed by `set_output`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Analog,
    Triac,
}

#[derive(Debug, Error, PartialEq)]
#[error("Unknown output type: {0}. Use \"analog\" or \"triac\"")]
pub struct UnknownOutputKind(pub String);

impl FromStr for OutputKind {
    type Err = UnknownOutputKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "analog" => Ok(OutputKind::Analog),
            "triac" => Ok(OutputKind::Triac),
            _ => Err(UnknownOutputKind(s.to_string())),
        }
    }
}

impl OutputKind {
    fn channel_kind(self) -> ChannelKind {
        match self {
            OutputKind::Analog => ChannelKind::AnalogOutput,
            OutputKind::Triac => ChannelKind::Triac,
        }
    }
}

// === Results ===

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Status {
    Megabas(MegabasStatus),
    Relays(RelayStatus),
    UniversalInputs(UniversalInputStatus),
    UniversalOutputs(UniversalOutputStatus),
}

#[derive(Debug, Serialize)]
pub struct MegabasStatus {
    #[serde(rename = "type")]
    pub board_type: BoardType,
    pub stack: StackAddress,
    pub firmware: String,
    pub triacs: Channels<bool>,
    pub analog_outputs: Channels<f64>,
    pub configurable_inputs: Channels<InputReading>,
    pub dry_contacts: Channels<ContactReading>,
    pub sensors: SystemSensors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtc: Option<RtcReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog: Option<WatchdogStatus>,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Serialize)]
pub struct RelayStatus {
    #[serde(rename = "type")]
    pub board_type: BoardType,
    pub stack: StackAddress,
    pub relays: Channels<bool>,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UniversalInputReading {
    pub voltage: f64,
    pub resistance_1k: f64,
    pub resistance_10k: f64,
    pub digital: bool,
}

#[derive(Debug, Serialize)]
pub struct UniversalInputStatus {
    #[serde(rename = "type")]
    pub board_type: BoardType,
    pub stack: StackAddress,
    pub firmware: String,
    pub inputs: Channels<UniversalInputReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtc: Option<RtcReading>,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Serialize)]
pub struct UniversalOutputStatus {
    #[serde(rename = "type")]
    pub board_type: BoardType,
    pub stack: StackAddress,
    pub firmware: String,
    pub outputs: Channels<f64>,
    pub calibration: CalibrationStatus,
    pub timestamp: DateTime<Local>,
}

/// Value echoed back by `set_output`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Volts(f64),
    State(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputAck<V> {
    pub success: bool,
    pub channel: u8,
    pub value: V,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayAck {
    pub success: bool,
    pub channel: u8,
    pub state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniversalInputAck {
    pub success: bool,
    pub channel: u8,
    pub voltage: f64,
    pub resistance_1k: f64,
    pub resistance_10k: f64,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Stopped,
    NoOutputs,
}

/// Outcome of stopping one board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopResult {
    pub board: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StopStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyStop {
    pub emergency_stop: bool,
    pub results: Vec<StopResult>,
}

// === Helpers ===

/// Feature view of a board, or `Unsupported` if the driver lacks it
fn feature<T: ?Sized>(view: Option<&mut T>, board: BoardType, kind: ChannelKind) -> Result<&mut T> {
    view.ok_or(BoardError::Unsupported { board, kind })
}

/// Best-effort sub-read, absent when the board lacks the feature or the read fails
fn optional<T>(what: &str, read: Option<Result<T>>) -> Option<T> {
    match read? {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("omitting {what}: {e}");
            None
        },
    }
}

fn firmware(board: &mut dyn Board) -> Result<String> {
    Ok(board.probe()?.unwrap_or_else(|| "Unknown".into()))
}

// === Operations ===

/// Snapshot of every channel on a board
pub fn status<I: I2c>(hw: &Hardware<I>, board_type: BoardType, stack: StackAddress) -> Result<Status> {
    let mut board = hw.open(board_type, stack)?;
    let board = board.as_mut();
    Ok(match board_type {
        BoardType::Megabas => Status::Megabas(megabas_status(board)?),
        BoardType::Relay8 | BoardType::Relay16 => Status::Relays(relay_status(board)?),
        BoardType::UniversalInput16 => Status::UniversalInputs(universal_input_status(board)?),
        BoardType::UniversalOutput16 => Status::UniversalOutputs(universal_output_status(board)?),
    })
}

fn megabas_status(board: &mut dyn Board) -> Result<MegabasStatus> {
    let board_type = board.info().board_type;
    let cap = board_type.capability();
    let firmware = firmware(board)?;

    let triacs = feature(board.as_triacs(), board_type, ChannelKind::Triac)?;
    let triacs = Channels::from_mask(u32::from(triacs.triacs()?), cap.triacs);

    let outputs = feature(board.as_analog_outputs(), board_type, ChannelKind::AnalogOutput)?;
    let analog_outputs = Channels::read(cap.analog_outputs, |ch| outputs.analog_output(ch))?;

    let inputs = feature(
        board.as_configurable_inputs(),
        board_type,
        ChannelKind::ConfigurableInput,
    )?;
    let configurable_inputs = Channels::read(cap.configurable_inputs, |ch| {
        Ok(InputReading {
            voltage: inputs.input_voltage(ch)?,
            resistance_1k: inputs.input_resistance_1k(ch)?,
            resistance_10k: inputs.input_resistance_10k(ch)?,
        })
    })?;

    let contacts = feature(
        board.as_dry_contacts(),
        board_type,
        ChannelKind::ConfigurableInput,
    )?;
    let state = Channels::from_mask(u32::from(contacts.contacts()?), cap.configurable_inputs);
    let dry_contacts = Channels::read(cap.configurable_inputs, |ch| {
        Ok(ContactReading {
            state: state.get(ch).copied().unwrap_or_default(),
            counter: contacts.contact_counter(ch)?,
            edge_mode: contacts.contact_edge(ch)?,
        })
    })?;

    let sensors = board
        .as_system_sensors()
        .ok_or(BoardError::InvalidResponse("no system sensors"))?
        .system_sensors()?;

    let rtc = optional("rtc", board.as_rtc().map(|rtc| rtc.rtc()));
    let watchdog = optional("watchdog", board.as_watchdog().map(|wdt| wdt.watchdog()));

    Ok(MegabasStatus {
        board_type,
        stack: board.stack(),
        firmware,
        triacs,
        analog_outputs,
        configurable_inputs,
        dry_contacts,
        sensors,
        rtc,
        watchdog,
        timestamp: Local::now(),
    })
}

fn relay_status(board: &mut dyn Board) -> Result<RelayStatus> {
    let board_type = board.info().board_type;
    let count = board_type.capability().relays;
    let relays = feature(board.as_relays(), board_type, ChannelKind::Relay)?;
    let relays = Channels::from_mask(u32::from(relays.relays()?), count);
    Ok(RelayStatus {
        board_type,
        stack: board.stack(),
        relays,
        timestamp: Local::now(),
    })
}

fn universal_input_status(board: &mut dyn Board) -> Result<UniversalInputStatus> {
    let board_type = board.info().board_type;
    let count = board_type.capability().universal_inputs;
    let firmware = firmware(board)?;
    let inputs = feature(
        board.as_universal_inputs(),
        board_type,
        ChannelKind::UniversalInput,
    )?;
    let digital = Channels::from_mask(u32::from(inputs.digital_inputs()?), count);
    let inputs = Channels::read(count, |ch| {
        Ok(UniversalInputReading {
            voltage: inputs.universal_voltage(ch)?,
            resistance_1k: inputs.universal_resistance_1k(ch)?,
            resistance_10k: inputs.universal_resistance_10k(ch)?,
            digital: digital.get(ch).copied().unwrap_or_default(),
        })
    })?;
    let rtc = optional("rtc", board.as_rtc().map(|rtc| rtc.rtc()));
    Ok(UniversalInputStatus {
        board_type,
        stack: board.stack(),
        firmware,
        inputs,
        rtc,
        timestamp: Local::now(),
    })
}

fn universal_output_status(board: &mut dyn Board) -> Result<UniversalOutputStatus> {
    let board_type = board.info().board_type;
    let count = board_type.capability().universal_outputs;
    let firmware = firmware(board)?;
    let outputs = feature(
        board.as_universal_outputs(),
        board_type,
        ChannelKind::UniversalOutput,
    )?;
    let calibration = outputs.calibration_status()?;
    let outputs = Channels::read(count, |ch| outputs.universal_output(ch))?;
    Ok(UniversalOutputStatus {
        board_type,
        stack: board.stack(),
        firmware,
        outputs,
        calibration,
        timestamp: Local::now(),
    })
}

/// Drive one megabas triac or analog output. Triac values are whole numbers, non-zero is on.
pub fn set_output<I: I2c>(
    hw: &Hardware<I>,
    stack: StackAddress,
    kind: OutputKind,
    channel: i64,
    value: f64,
) -> Result<OutputAck<OutputValue>> {
    let board_type = BoardType::Megabas;
    let channel = check_channel(board_type, kind.channel_kind(), channel)?;
    let value = match kind {
        OutputKind::Analog => OutputValue::Volts(check_voltage(value)?),
        OutputKind::Triac => OutputValue::State(check_state(value)?),
    };

    let mut board = hw.open(board_type, stack)?;
    match value {
        OutputValue::Volts(volts) => {
            feature(board.as_analog_outputs(), board_type, ChannelKind::AnalogOutput)?
                .set_analog_output(channel, volts)?
        },
        OutputValue::State(on) => {
            feature(board.as_triacs(), board_type, ChannelKind::Triac)?.set_triac(channel, on)?
        },
    }
    Ok(OutputAck {
        success: true,
        channel,
        value,
    })
}

pub fn set_relay<I: I2c>(
    hw: &Hardware<I>,
    board_type: BoardType,
    stack: StackAddress,
    channel: i64,
    state: bool,
) -> Result<RelayAck> {
    let channel = check_channel(board_type, ChannelKind::Relay, channel)?;
    let mut board = hw.open(board_type, stack)?;
    feature(board.as_relays(), board_type, ChannelKind::Relay)?.set_relay(channel, state)?;
    Ok(RelayAck {
        success: true,
        channel,
        state,
    })
}

pub fn read_universal_input<I: I2c>(
    hw: &Hardware<I>,
    stack: StackAddress,
    channel: i64,
) -> Result<UniversalInputAck> {
    let board_type = BoardType::UniversalInput16;
    let channel = check_channel(board_type, ChannelKind::UniversalInput, channel)?;
    let mut board = hw.open(board_type, stack)?;
    let inputs = feature(
        board.as_universal_inputs(),
        board_type,
        ChannelKind::UniversalInput,
    )?;
    Ok(UniversalInputAck {
        success: true,
        channel,
        voltage: inputs.universal_voltage(channel)?,
        resistance_1k: inputs.universal_resistance_1k(channel)?,
        resistance_10k: inputs.universal_resistance_10k(channel)?,
        timestamp: Local::now(),
    })
}

pub fn set_universal_output<I: I2c>(
    hw: &Hardware<I>,
    stack: StackAddress,
    channel: i64,
    volts: f64,
) -> Result<OutputAck<f64>> {
    let board_type = BoardType::UniversalOutput16;
    let channel = check_channel(board_type, ChannelKind::UniversalOutput, channel)?;
    let volts = check_voltage(volts)?;
    let mut board = hw.open(board_type, stack)?;
    feature(
        board.as_universal_outputs(),
        board_type,
        ChannelKind::UniversalOutput,
    )?
    .set_universal_output(channel, volts)?;
    Ok(OutputAck {
        success: true,
        channel,
        value: volts,
    })
}

/// 0-10V level on a megabas configurable input
pub fn read_input_voltage<I: I2c>(hw: &Hardware<I>, stack: StackAddress, channel: i64) -> Result<(u8, f64)> {
    let board_type = BoardType::Megabas;
    let channel = check_channel(board_type, ChannelKind::ConfigurableInput, channel)?;
    let mut board = hw.open(board_type, stack)?;
    let volts = feature(
        board.as_configurable_inputs(),
        board_type,
        ChannelKind::ConfigurableInput,
    )?
    .input_voltage(channel)?;
    Ok((channel, volts))
}

/// Drive every output of every discovered board to its safe value.
/// A failing board is recorded and the remaining boards are still stopped.
pub fn emergency_stop<I: I2c>(hw: &Hardware<I>) -> EmergencyStop {
    let results = hw
        .discover()
        .into_iter()
        .map(|found| {
            let board = format!("{}_{}", found.board_type, found.stack);
            let outcome = hw
                .open(found.board_type, found.stack)
                .and_then(|mut b| stop(b.as_mut()));
            match outcome {
                Ok(status) => StopResult {
                    board,
                    status: Some(status),
                    error: None,
                },
                Err(e) => {
                    log::warn!("emergency stop failed on {board}: {e}");
                    StopResult {
                        board,
                        status: None,
                        error: Some(e.to_string()),
                    }
                },
            }
        })
        .collect();
    EmergencyStop {
        emergency_stop: true,
        results,
    }
}

fn stop(board: &mut dyn Board) -> Result<StopStatus> {
    let cap = board.info().capability();
    if !cap.has_outputs() {
        return Ok(StopStatus::NoOutputs);
    }
    if let Some(triacs) = board.as_triacs() {
        for ch in 1..=cap.triacs {
            triacs.set_triac(ch, false)?;
        }
    }
    if let Some(outputs) = board.as_analog_outputs() {
        for ch in 1..=cap.analog_outputs {
            outputs.set_analog_output(ch, 0.0)?;
        }
    }
    if let Some(relays) = board.as_relays() {
        relays.set_all_relays(0)?;
    }
    if let Some(outputs) = board.as_universal_outputs() {
        for ch in 1..=cap.universal_outputs {
            outputs.set_universal_output(ch, 0.0)?;
        }
    }
    Ok(StopStatus::Stopped)
}
