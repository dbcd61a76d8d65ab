//! Driver availability and board discovery.

use std::cell::RefCell;
use std::collections::HashSet;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use hatctl_core::{Board, BoardCapability, BoardError, BoardType, Result, StackAddress};
use megabas::Megabas;
use relay16::Relay16;
use relay8::Relay8;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use univin16::Univin16;
use uout16::Uout16;

use crate::config::DriversConfig;

/// Whether a board type can be driven in this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Available,
    Unavailable(String),
}

impl Serialize for DriverState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DriverState::Available => {
                let mut s = serializer.serialize_struct("DriverState", 1)?;
                s.serialize_field("available", &true)?;
                s.end()
            },
            DriverState::Unavailable(reason) => {
                let mut s = serializer.serialize_struct("DriverState", 2)?;
                s.serialize_field("available", &false)?;
                s.serialize_field("reason", reason)?;
                s.end()
            },
        }
    }
}

/// Availability of every board driver, fixed at startup
#[derive(Debug, Clone)]
pub struct DriverTable {
    states: [DriverState; BoardType::ALL.len()],
}

impl DriverTable {
    /// `bus_error` is set when the bus device could not be opened, which
    /// leaves every driver without hardware.
    pub fn new(config: &DriversConfig, bus_error: Option<&str>) -> Self {
        let states = BoardType::ALL.map(|board| {
            if config.disabled.contains(&board) {
                DriverState::Unavailable("disabled in config".into())
            } else if let Some(err) = bus_error {
                DriverState::Unavailable(format!("i2c bus unavailable: {err}"))
            } else {
                DriverState::Available
            }
        });
        Self { states }
    }

    pub fn state(&self, board: BoardType) -> &DriverState {
        let idx = BoardType::ALL
            .iter()
            .position(|b| *b == board)
            .unwrap_or_default();
        &self.states[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoardType, &DriverState)> {
        BoardType::ALL.into_iter().zip(self.states.iter())
    }

    pub fn check(&self, board: BoardType) -> Result<()> {
        match self.state(board) {
            DriverState::Available => Ok(()),
            DriverState::Unavailable(reason) => Err(BoardError::DriverUnavailable {
                board,
                reason: reason.clone(),
            }),
        }
    }

    /// Warn once per unusable driver
    pub fn log_unavailable(&self) {
        for (board, state) in self.iter() {
            if let DriverState::Unavailable(reason) = state {
                log::warn!("{board} driver not available: {reason}");
            }
        }
    }
}

/// A board that answered its probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardInstance {
    pub board_type: BoardType,
    pub stack: StackAddress,
    pub version: Option<String>,
}

impl BoardInstance {
    pub fn name(&self) -> String {
        let info = board_info(self.board_type);
        format!("{} Stack {}", info.name, self.stack)
    }

    pub fn config(&self) -> &'static BoardCapability {
        self.board_type.capability()
    }
}

impl Serialize for BoardInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BoardInstance", 5)?;
        s.serialize_field("type", &self.board_type)?;
        s.serialize_field("stack", &self.stack)?;
        s.serialize_field("name", &self.name())?;
        s.serialize_field("version", self.version.as_deref().unwrap_or("Unknown"))?;
        s.serialize_field("config", self.config())?;
        s.end()
    }
}

/// Outcome of probing one (board type, stack) pair
#[derive(Debug, PartialEq, Eq)]
pub enum Probe {
    /// No usable driver for the board type
    Unavailable,
    /// Nothing answered
    Absent,
    Present(BoardInstance),
}

fn board_info(board: BoardType) -> &'static hatctl_core::BoardInfo {
    match board {
        BoardType::Megabas => &megabas::INFO,
        BoardType::Relay8 => &relay8::INFO,
        BoardType::Relay16 => &relay16::INFO,
        BoardType::UniversalInput16 => &univin16::INFO,
        BoardType::UniversalOutput16 => &uout16::INFO,
    }
}

/// The I2C bus plus the drivers allowed to use it
pub struct Hardware<I> {
    bus: Option<RefCell<I>>,
    drivers: DriverTable,
}

impl<I: I2c> Hardware<I> {
    pub fn new(bus: Option<I>, drivers: DriverTable) -> Self {
        Self {
            bus: bus.map(RefCell::new),
            drivers,
        }
    }

    pub fn drivers(&self) -> &DriverTable {
        &self.drivers
    }

    #[cfg(test)]
    pub fn with_bus<R>(&self, f: impl FnOnce(&I) -> R) -> R {
        let bus = self.bus.as_ref().expect("test hardware has a bus");
        f(&bus.borrow())
    }

    /// Open the driver for a board at a stack level. Does not touch the bus.
    pub fn open(&self, board_type: BoardType, stack: StackAddress) -> Result<Box<dyn Board + '_>> {
        self.drivers.check(board_type)?;
        let bus = self
            .bus
            .as_ref()
            .ok_or_else(|| BoardError::DriverUnavailable {
                board: board_type,
                reason: "no i2c bus".into(),
            })?;
        let dev = RefCellDevice::new(bus);
        Ok(match board_type {
            BoardType::Megabas => Box::new(Megabas::new(dev, stack)),
            BoardType::Relay8 => Box::new(Relay8::new(dev, stack)),
            BoardType::Relay16 => Box::new(Relay16::new(dev, stack)),
            BoardType::UniversalInput16 => Box::new(Univin16::new(dev, stack)),
            BoardType::UniversalOutput16 => Box::new(Uout16::new(dev, stack)),
        })
    }

    pub fn probe(&self, board_type: BoardType, stack: StackAddress) -> Probe {
        let mut board = match self.open(board_type, stack) {
            Ok(board) => board,
            Err(_) => return Probe::Unavailable,
        };
        match board.probe() {
            Ok(version) => Probe::Present(BoardInstance {
                board_type,
                stack,
                version,
            }),
            Err(e) => {
                log::debug!("no {board_type} at stack {stack}: {e}");
                Probe::Absent
            },
        }
    }

    /// Probe every stack level for every board type. Boards sharing an
    /// address space are reported once, for the first type that answers.
    pub fn discover(&self) -> Vec<BoardInstance> {
        let mut claimed = HashSet::new();
        let mut found = Vec::new();
        for stack in StackAddress::all() {
            for board_type in BoardType::ALL {
                let address = board_info(board_type).address(stack);
                if claimed.contains(&address) {
                    continue;
                }
                if let Probe::Present(instance) = self.probe(board_type, stack) {
                    log::debug!("found {} at {address:#04x}", instance.name());
                    claimed.insert(address);
                    found.push(instance);
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use hatctl_core::mock::MockBus;

    use super::*;

    fn stack(n: i64) -> StackAddress {
        StackAddress::new(n).unwrap()
    }

    fn hardware(bus: MockBus, disabled: Vec<BoardType>) -> Hardware<MockBus> {
        let drivers = DriverTable::new(&DriversConfig { disabled }, None);
        Hardware::new(Some(bus), drivers)
    }

    #[test]
    fn driver_table_reasons() {
        let config = DriversConfig {
            disabled: vec![BoardType::Relay16],
        };
        let table = DriverTable::new(&config, None);
        assert_eq!(table.state(BoardType::Megabas), &DriverState::Available);
        assert_eq!(
            table.state(BoardType::Relay16),
            &DriverState::Unavailable("disabled in config".into())
        );

        let table = DriverTable::new(&DriversConfig::default(), Some("No such file"));
        assert!(table.iter().all(|(_, s)| *s != DriverState::Available));
        let err = table.check(BoardType::Relay8).unwrap_err();
        assert_eq!(
            err.to_string(),
            "8relind driver not available: i2c bus unavailable: No such file"
        );
    }

    #[test]
    fn probe_is_tri_state() {
        let mut bus = MockBus::new();
        bus.attach(0x48).set(0x48, 0x78, &[1, 2]);
        let hw = hardware(bus, vec![BoardType::Relay8]);

        assert_eq!(hw.probe(BoardType::Relay8, stack(0)), Probe::Unavailable);
        assert_eq!(hw.probe(BoardType::Megabas, stack(1)), Probe::Absent);
        assert_eq!(
            hw.probe(BoardType::Megabas, stack(0)),
            Probe::Present(BoardInstance {
                board_type: BoardType::Megabas,
                stack: stack(0),
                version: Some("1.02".into()),
            })
        );
    }

    #[test]
    fn no_bus_means_unavailable() {
        let drivers = DriverTable::new(&DriversConfig::default(), None);
        let hw: Hardware<MockBus> = Hardware::new(None, drivers);
        assert_eq!(hw.probe(BoardType::Megabas, stack(0)), Probe::Unavailable);
        assert!(hw.discover().is_empty());
    }

    #[test]
    fn discovery_is_stack_major() {
        let mut bus = MockBus::new();
        bus.attach(0x49).attach(0x38).attach(0x21);
        let hw = hardware(bus, vec![]);
        let found: Vec<_> = hw
            .discover()
            .into_iter()
            .map(|b| (b.board_type, b.stack.get()))
            .collect();
        assert_eq!(
            found,
            vec![
                (BoardType::Relay8, 0),
                (BoardType::Megabas, 1),
                (BoardType::Relay16, 1),
            ]
        );
    }

    #[test]
    fn shared_address_first_responder_wins() {
        let mut bus = MockBus::new();
        bus.attach(0x5A);
        let hw = hardware(bus, vec![]);
        let found = hw.discover();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].board_type, BoardType::UniversalInput16);

        let mut bus = MockBus::new();
        bus.attach(0x5A);
        let hw = hardware(bus, vec![BoardType::UniversalInput16]);
        let found = hw.discover();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].board_type, BoardType::UniversalOutput16);
    }

    #[test]
    fn each_discovery_probes_again() {
        let mut bus = MockBus::new();
        bus.attach(0x38);
        let hw = hardware(bus, vec![]);
        hw.discover();
        let once = hw.with_bus(|bus| bus.transactions());
        hw.discover();
        assert!(once > 0);
        assert_eq!(hw.with_bus(|bus| bus.transactions()), 2 * once);
    }

    #[test]
    fn scan_json_shape() {
        let instance = BoardInstance {
            board_type: BoardType::Relay8,
            stack: stack(3),
            version: None,
        };
        let json = serde_json::to_value(&instance).unwrap();
        assert_eq!(json["type"], "8relind");
        assert_eq!(json["stack"], 3);
        assert_eq!(json["name"], "8-Relay Stack 3");
        assert_eq!(json["version"], "Unknown");
        assert_eq!(json["config"]["relays"], 8);
        assert!(json["config"].get("triacs").is_none());
    }
}
