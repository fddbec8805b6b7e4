// src/hal/simulator.rs
//! Register-level MAX30003 simulator
//!
//! Decodes the frames it receives, keeps a register file, replays a script of
//! STATUS words and a queue of FIFO words, and can be told to fail specific
//! transfers. Used by unit tests, integration tests and benches in place of
//! real hardware.

use crate::device::protocol::{decode_read_request, decode_write_frame};
use crate::device::sample::{Etag, FifoSample};
use crate::device::status::flags;
use crate::hal::{BusSettings, SpiTransport, TransportError};
use crate::registers::{address, ConfigRegister, REGISTER_MASK};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// INFO word of a revision-1 part
pub const SIMULATED_INFO: u32 = 0x51_0000;

/// FIFO word returned when the queue is exhausted
pub const EMPTY_FIFO_WORD: [u8; 3] = [0x00, 0x00, 0x30];

/// Transfer failure to inject
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    Configure,
    WriteTo(u8),
    ReadOf(u8),
    /// Every transfer after this many successful ones
    AfterTransfers(u64),
}

/// Simulated MAX30003 on an in-memory bus
#[derive(Debug, Clone)]
pub struct Max30003Simulator {
    registers: BTreeMap<u8, u32>,
    frames: Vec<Vec<u8>>,
    writes: Vec<(u8, u32)>,
    reads: Vec<u8>,
    status_script: VecDeque<u32>,
    fifo: VecDeque<[u8; 3]>,
    faults: HashSet<Fault>,
    bus_settings: Option<BusSettings>,
    transfers: u64,
}

impl Default for Max30003Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Max30003Simulator {
    pub fn new() -> Self {
        let mut sim = Self {
            registers: BTreeMap::new(),
            frames: Vec::new(),
            writes: Vec::new(),
            reads: Vec::new(),
            status_script: VecDeque::new(),
            fifo: VecDeque::new(),
            faults: HashSet::new(),
            bus_settings: None,
            transfers: 0,
        };
        sim.power_on();
        sim
    }

    fn power_on(&mut self) {
        self.registers.clear();
        for register in ConfigRegister::WRITE_ORDER {
            self.registers.insert(register.address(), register.default_value());
        }
        self.registers.insert(address::INFO, SIMULATED_INFO);
    }

    /// Queue raw FIFO words
    pub fn push_fifo_words<I: IntoIterator<Item = [u8; 3]>>(&mut self, words: I) {
        self.fifo.extend(words);
    }

    /// Queue valid samples given as 18-bit readings
    pub fn push_samples<I: IntoIterator<Item = i32>>(&mut self, samples: I) {
        self.fifo.extend(
            samples
                .into_iter()
                .map(|s| FifoSample::from_parts(s, Etag::Valid, 0b111).bytes()),
        );
    }

    /// STATUS words returned before the FIFO-derived default takes over
    pub fn script_status<I: IntoIterator<Item = u32>>(&mut self, words: I) {
        self.status_script.extend(words);
    }

    pub fn inject(&mut self, fault: Fault) {
        self.faults.insert(fault);
    }

    pub fn fail_reads_of(&mut self, address: u8) {
        self.inject(Fault::ReadOf(address));
    }

    pub fn fail_writes_to(&mut self, address: u8) {
        self.inject(Fault::WriteTo(address));
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    pub fn set_register(&mut self, address: u8, value: u32) {
        self.registers.insert(address, value & REGISTER_MASK);
    }

    pub fn register(&self, address: u8) -> u32 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    /// Every frame clocked out, in order
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Decoded register writes, in order
    pub fn writes(&self) -> &[(u8, u32)] {
        &self.writes
    }

    /// Addresses read, in order
    pub fn reads(&self) -> &[u8] {
        &self.reads
    }

    pub fn read_count(&self, address: u8) -> usize {
        self.reads.iter().filter(|a| **a == address).count()
    }

    pub fn fifo_len(&self) -> usize {
        self.fifo.len()
    }

    pub fn bus_settings(&self) -> Option<&BusSettings> {
        self.bus_settings.as_ref()
    }

    fn check_budget(&mut self) -> Result<(), TransportError> {
        let limit = self.faults.iter().find_map(|f| match f {
            Fault::AfterTransfers(n) => Some(*n),
            _ => None,
        });
        if let Some(limit) = limit {
            if self.transfers >= limit {
                return Err(TransportError::Fault(format!(
                    "injected failure after {} transfers",
                    limit
                )));
            }
        }
        self.transfers += 1;
        Ok(())
    }

    fn next_status(&mut self) -> u32 {
        self.status_script.pop_front().unwrap_or_else(|| {
            if self.fifo.is_empty() {
                0
            } else {
                flags::EINT
            }
        })
    }

    fn on_write(&mut self, address: u8, value: u32) {
        self.writes.push((address, value));
        match address {
            address::SW_RST => self.power_on(),
            address::FIFO_RST => self.fifo.clear(),
            address::SYNCH | address::NO_OP => {}
            _ => {
                self.registers.insert(address, value);
            }
        }
    }

    fn on_read(&mut self, address: u8) -> [u8; 3] {
        self.reads.push(address);
        let word = match address {
            address::STATUS => self.next_status(),
            address::ECG_FIFO | address::ECG_FIFO_BURST => {
                return self.fifo.pop_front().unwrap_or(EMPTY_FIFO_WORD);
            }
            _ => self.register(address),
        };
        let [_, hi, mid, lo] = word.to_be_bytes();
        [hi, mid, lo]
    }
}

impl SpiTransport for Max30003Simulator {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), TransportError> {
        if self.faults.contains(&Fault::Configure) {
            return Err(TransportError::Fault("injected configure failure".to_string()));
        }
        self.bus_settings = Some(settings.clone());
        Ok(())
    }

    fn write(&mut self, output: &[u8]) -> Result<(), TransportError> {
        self.check_budget()?;
        let (address, value) = decode_write_frame(output).ok_or_else(|| {
            TransportError::Fault(format!("malformed write frame {:02X?}", output))
        })?;
        if self.faults.contains(&Fault::WriteTo(address)) {
            return Err(TransportError::Fault(format!(
                "injected write failure on 0x{:02X}",
                address
            )));
        }
        self.frames.push(output.to_vec());
        self.on_write(address, value);
        Ok(())
    }

    fn write_read(&mut self, output: &[u8], input: &mut [u8]) -> Result<(), TransportError> {
        self.check_budget()?;
        let address = decode_read_request(output).ok_or_else(|| {
            TransportError::Fault(format!("malformed read request {:02X?}", output))
        })?;
        if input.len() != 3 {
            return Err(TransportError::Fault(format!(
                "read of 0x{:02X} expects 3 response bytes, got {}",
                address,
                input.len()
            )));
        }
        if self.faults.contains(&Fault::ReadOf(address)) {
            return Err(TransportError::Fault(format!(
                "injected read failure on 0x{:02X}",
                address
            )));
        }
        self.frames.push(output.to_vec());
        input.copy_from_slice(&self.on_read(address));
        Ok(())
    }
}
