//! In-memory I2C bus for exercising drivers without hardware.
//!
//! Each attached address owns a 256 byte register file that follows the
//! same pointer-then-data convention as the real boards. Write hooks can
//! emulate command registers (set/clear ports and the like).

use std::collections::HashMap;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

type WriteHook = Box<dyn FnMut(&mut [u8; 256], &[u8])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub ErrorKind);

impl embedded_hal::i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

struct Device {
    regs: [u8; 256],
    fail_writes: bool,
}

/// Register-file backed bus
#[derive(Default)]
pub struct MockBus {
    devices: HashMap<u8, Device>,
    hooks: HashMap<(u8, u8), WriteHook>,
    writes: Vec<(u8, u8, Vec<u8>)>,
    transactions: usize,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a device answer at `address`
    pub fn attach(&mut self, address: u8) -> &mut Self {
        self.devices.entry(address).or_insert(Device {
            regs: [0; 256],
            fail_writes: false,
        });
        self
    }

    /// Remove a device, it stops acknowledging its address
    pub fn detach(&mut self, address: u8) -> &mut Self {
        self.devices.remove(&address);
        self
    }

    /// Keep answering reads at `address` but reject every write
    pub fn fail_writes(&mut self, address: u8) -> &mut Self {
        if let Some(dev) = self.devices.get_mut(&address) {
            dev.fail_writes = true;
        }
        self
    }

    /// Preload registers of an attached device
    pub fn set(&mut self, address: u8, reg: u8, data: &[u8]) -> &mut Self {
        if let Some(dev) = self.devices.get_mut(&address) {
            for (i, b) in data.iter().enumerate() {
                dev.regs[usize::from(reg.wrapping_add(i as u8))] = *b;
            }
        }
        self
    }

    pub fn set_u16(&mut self, address: u8, reg: u8, value: u16) -> &mut Self {
        self.set(address, reg, &value.to_le_bytes())
    }

    /// Intercept writes to `reg` instead of storing them
    pub fn on_write(
        &mut self,
        address: u8,
        reg: u8,
        hook: impl FnMut(&mut [u8; 256], &[u8]) + 'static,
    ) -> &mut Self {
        self.hooks.insert((address, reg), Box::new(hook));
        self
    }

    pub fn get(&self, address: u8, reg: u8) -> u8 {
        self.devices
            .get(&address)
            .map_or(0, |dev| dev.regs[usize::from(reg)])
    }

    pub fn get_u16(&self, address: u8, reg: u8) -> u16 {
        u16::from_le_bytes([self.get(address, reg), self.get(address, reg.wrapping_add(1))])
    }

    /// Number of transactions issued, including failed ones
    pub fn transactions(&self) -> usize {
        self.transactions
    }

    /// Data writes sent to `address` as `(register, payload)`
    pub fn writes(&self, address: u8) -> Vec<(u8, Vec<u8>)> {
        self.writes
            .iter()
            .filter(|(a, _, _)| *a == address)
            .map(|(_, reg, data)| (*reg, data.clone()))
            .collect()
    }
}

impl ErrorType for MockBus {
    type Error = MockError;
}

impl I2c for MockBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions += 1;
        let Some(dev) = self.devices.get_mut(&address) else {
            return Err(MockError(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)));
        };

        let mut pointer: Option<u8> = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let (data, reg) = match pointer {
                        Some(reg) => (&bytes[..], reg),
                        None => match bytes.split_first() {
                            Some((reg, data)) => (data, *reg),
                            None => continue,
                        },
                    };
                    pointer = Some(reg);
                    if data.is_empty() {
                        continue;
                    }
                    if dev.fail_writes {
                        return Err(MockError(ErrorKind::NoAcknowledge(
                            NoAcknowledgeSource::Data,
                        )));
                    }
                    self.writes.push((address, reg, data.to_vec()));
                    if let Some(hook) = self.hooks.get_mut(&(address, reg)) {
                        hook(&mut dev.regs, data);
                    } else {
                        for (i, b) in data.iter().enumerate() {
                            dev.regs[usize::from(reg.wrapping_add(i as u8))] = *b;
                        }
                    }
                    pointer = Some(reg.wrapping_add(data.len() as u8));
                },
                Operation::Read(buf) => {
                    let reg = pointer.unwrap_or(0);
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = dev.regs[usize::from(reg.wrapping_add(i as u8))];
                    }
                    pointer = Some(reg.wrapping_add(buf.len() as u8));
                },
            }
        }
        Ok(())
    }
}
