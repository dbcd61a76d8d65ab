//! Command table and dispatch to the board operations.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use bpaf::{any, Bpaf, Parser};
use embedded_hal::i2c::I2c;
use hatctl_core::{BoardCapability, BoardError, BoardType, StackAddress};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::adapter::{self, OutputKind, UnknownOutputKind};
use crate::config::Config;
use crate::detection::{DriverState, Hardware};
use crate::pressure::{self, PressureError};

/// Command names, as listed when none is given
pub const COMMANDS: [&str; 9] = [
    "scan",
    "status",
    "set_output",
    "set_relay",
    "read_univin",
    "set_univout",
    "emergency_stop",
    "info",
    "read_pressure",
];

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    OutputKind(#[from] UnknownOutputKind),
    #[error(transparent)]
    Pressure(#[from] PressureError),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Positional arguments are optional so that a short command line yields a
/// usage message instead of a parse failure. Numbers may be negative; range
/// checks happen when the command runs.
#[derive(Clone, Debug, PartialEq, Bpaf)]
pub enum Command {
    /// List the boards answering on the bus
    #[bpaf(command)]
    Scan,
    /// Show the channel layout of every board type and driver availability
    #[bpaf(command)]
    Info,
    /// Read every channel of one board
    #[bpaf(command)]
    Status {
        #[bpaf(positional("BOARD_TYPE"))]
        board_type: Option<String>,
        #[bpaf(external(stack_arg))]
        stack: Option<i64>,
    },
    /// Drive a megabas analog output (0-10V) or triac (0 = off)
    #[bpaf(command("set_output"))]
    SetOutput {
        #[bpaf(external(stack_arg))]
        stack: Option<i64>,
        #[bpaf(positional("analog|triac"))]
        kind: Option<String>,
        #[bpaf(external(channel_arg))]
        channel: Option<i64>,
        #[bpaf(external(value_arg))]
        value: Option<f64>,
    },
    /// Switch one relay on a relay board
    #[bpaf(command("set_relay"))]
    SetRelay {
        #[bpaf(positional("BOARD_TYPE"))]
        board_type: Option<String>,
        #[bpaf(external(stack_arg))]
        stack: Option<i64>,
        #[bpaf(external(channel_arg))]
        channel: Option<i64>,
        #[bpaf(external(state_arg))]
        state: Option<i64>,
    },
    /// Read one universal input
    #[bpaf(command("read_univin"))]
    ReadUnivin {
        #[bpaf(external(stack_arg))]
        stack: Option<i64>,
        #[bpaf(external(channel_arg))]
        channel: Option<i64>,
    },
    /// Set one universal output (0-10V)
    #[bpaf(command("set_univout"))]
    SetUnivout {
        #[bpaf(external(stack_arg))]
        stack: Option<i64>,
        #[bpaf(external(channel_arg))]
        channel: Option<i64>,
        #[bpaf(external(value_arg))]
        value: Option<f64>,
    },
    /// Turn every output on every discovered board off
    #[bpaf(command("emergency_stop"))]
    EmergencyStop,
    /// Read a P499 pressure transducer on a megabas input
    #[bpaf(command("read_pressure"))]
    ReadPressure {
        #[bpaf(external(stack_arg))]
        stack: Option<i64>,
        #[bpaf(external(channel_arg))]
        channel: Option<i64>,
        #[bpaf(positional("MODEL"))]
        model: Option<String>,
    },
    // any other first word, reported through the error envelope
    Unknown {
        #[bpaf(external(unknown_command))]
        name: String,
        #[bpaf(external(unknown_args))]
        args: Vec<String>,
    },
}

/// Numeric positional that lets `-5` through instead of reading it as a flag
fn number<T>(metavar: &'static str) -> impl Parser<Option<T>>
where
    T: FromStr + 'static,
    T::Err: Display,
{
    any::<String, _, _>(metavar, |arg: String| {
        (!arg.starts_with('-') || arg.parse::<f64>().is_ok()).then_some(arg)
    })
    .parse(|arg| arg.parse::<T>())
    .optional()
}

fn stack_arg() -> impl Parser<Option<i64>> {
    number("STACK")
}

fn channel_arg() -> impl Parser<Option<i64>> {
    number("CHANNEL")
}

fn value_arg() -> impl Parser<Option<f64>> {
    number("VALUE")
}

fn state_arg() -> impl Parser<Option<i64>> {
    number("0|1")
}

fn unknown_command() -> impl Parser<String> {
    any::<String, _, _>("COMMAND", |arg: String| {
        (!arg.starts_with('-') && !COMMANDS.contains(&arg.as_str())).then_some(arg)
    })
    .hide()
}

fn unknown_args() -> impl Parser<Vec<String>> {
    any::<String, _, _>("ARG", Some).many().hide()
}

#[derive(Serialize)]
struct Info {
    boards: BTreeMap<BoardType, &'static BoardCapability>,
    drivers: BTreeMap<BoardType, DriverState>,
    corrections: BTreeMap<BoardType, &'static str>,
}

fn correction(board: BoardType) -> &'static str {
    match board {
        BoardType::Megabas => "Has 4 triacs, 4 analog outputs, 8 configurable inputs",
        BoardType::Relay8 => "RELAY ONLY board with 8 relays",
        BoardType::Relay16 => "RELAY ONLY board with 16 relays",
        BoardType::UniversalInput16 => "INPUT ONLY board with 16 universal inputs",
        BoardType::UniversalOutput16 => "OUTPUT ONLY board with 16 analog outputs",
    }
}

fn required<T>(arg: Option<T>, usage: &'static str) -> Result<T, CommandError> {
    arg.ok_or(CommandError::Usage(usage))
}

/// Run one command. Every failure is returned for the caller to print.
pub fn run<I: I2c>(command: Command, hw: &Hardware<I>, config: &Config) -> Result<Value, CommandError> {
    let value = match command {
        Command::Scan => serde_json::to_value(hw.discover())?,
        Command::Info => serde_json::to_value(Info {
            boards: BoardType::ALL.map(|b| (b, b.capability())).into(),
            drivers: hw
                .drivers()
                .iter()
                .map(|(b, state)| (b, state.clone()))
                .collect(),
            corrections: BoardType::ALL.map(|b| (b, correction(b))).into(),
        })?,
        Command::Status { board_type, stack } => {
            const USAGE: &str = "status <board_type> <stack>";
            let board_type: BoardType = required(board_type, USAGE)?.parse()?;
            let stack = StackAddress::new(required(stack, USAGE)?)?;
            serde_json::to_value(adapter::status(hw, board_type, stack)?)?
        },
        Command::SetOutput {
            stack,
            kind,
            channel,
            value,
        } => {
            const USAGE: &str = "set_output <stack> <type> <channel> <value>";
            let (stack, kind, channel, value) = (
                required(stack, USAGE)?,
                required(kind, USAGE)?,
                required(channel, USAGE)?,
                required(value, USAGE)?,
            );
            let stack = StackAddress::new(stack)?;
            let kind: OutputKind = kind.parse()?;
            serde_json::to_value(adapter::set_output(hw, stack, kind, channel, value)?)?
        },
        Command::SetRelay {
            board_type,
            stack,
            channel,
            state,
        } => {
            const USAGE: &str = "set_relay <board_type> <stack> <channel> <state>";
            let (board_type, stack, channel, state) = (
                required(board_type, USAGE)?,
                required(stack, USAGE)?,
                required(channel, USAGE)?,
                required(state, USAGE)?,
            );
            let board_type: BoardType = board_type.parse()?;
            let stack = StackAddress::new(stack)?;
            serde_json::to_value(adapter::set_relay(hw, board_type, stack, channel, state != 0)?)?
        },
        Command::ReadUnivin { stack, channel } => {
            const USAGE: &str = "read_univin <stack> <channel>";
            let stack = StackAddress::new(required(stack, USAGE)?)?;
            let channel = required(channel, USAGE)?;
            serde_json::to_value(adapter::read_universal_input(hw, stack, channel)?)?
        },
        Command::SetUnivout {
            stack,
            channel,
            value,
        } => {
            const USAGE: &str = "set_univout <stack> <channel> <value>";
            let (stack, channel, value) = (
                required(stack, USAGE)?,
                required(channel, USAGE)?,
                required(value, USAGE)?,
            );
            let stack = StackAddress::new(stack)?;
            serde_json::to_value(adapter::set_universal_output(hw, stack, channel, value)?)?
        },
        Command::EmergencyStop => serde_json::to_value(adapter::emergency_stop(hw))?,
        Command::ReadPressure {
            stack,
            channel,
            model,
        } => {
            const USAGE: &str = "read_pressure <stack> <channel> [model]";
            let stack = StackAddress::new(required(stack, USAGE)?)?;
            let channel = required(channel, USAGE)?;
            let model = match model {
                Some(name) => name.parse()?,
                None => u8::try_from(channel)
                    .ok()
                    .and_then(|ch| config.transducer(stack, ch))
                    .unwrap_or_default(),
            };
            serde_json::to_value(pressure::read_pressure(hw, stack, channel, model)?)?
        },
        Command::Unknown { name, .. } => return Err(CommandError::UnknownCommand(name)),
    };
    Ok(value)
}

/// Result printed when no command was given
pub fn no_command() -> Value {
    json!({
        "error": "No command specified",
        "commands": COMMANDS,
    })
}

/// Error envelope for any failure
pub fn error(message: impl ToString) -> Value {
    json!({ "error": message.to_string() })
}
