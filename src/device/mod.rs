// src/device/mod.rs
//! MAX30003 register access over an [`SpiTransport`]
//!
//! [`Max30003`] owns its transport; every bus access of the crate goes
//! through it.

pub mod protocol;
pub mod sample;
pub mod status;

pub use protocol::{decode_write_frame, encode_read_request, encode_write_frame};
pub use sample::{decode_sample, DecodeMode, Etag, FifoSample};
pub use status::StatusSnapshot;

use crate::config::constants::protocol::DATA_LEN;
use crate::error::{BusOperation, BusResultExt, EcgResult};
use crate::error_context;
use crate::hal::{BusSettings, SpiTransport};
use crate::registers::address;
use tracing::{debug, trace};

/// Contents of the INFO register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub raw: u32,
}

impl DeviceInfo {
    /// Silicon revision, bits 19:16
    pub fn revision(&self) -> u8 {
        ((self.raw >> 16) & 0x0F) as u8
    }

    /// Bits 23:20 read back as `0b0101` on a responding part
    pub fn looks_valid(&self) -> bool {
        (self.raw >> 20) & 0x0F == 0b0101
    }
}

/// MAX30003 bound to one transport
pub struct Max30003<T> {
    transport: T,
}

impl<T: SpiTransport> Max30003<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Apply bus settings to the owned transport
    pub fn configure_bus(&mut self, settings: &BusSettings) -> EcgResult<()> {
        self.transport
            .configure(settings)
            .bus_err(BusOperation::Configure, None, error_context!("device", "configure_bus"))
    }

    pub fn write_register(&mut self, address: u8, value: u32) -> EcgResult<()> {
        let frame = encode_write_frame(address, value);
        debug!(address = format_args!("0x{:02X}", address), value = format_args!("0x{:06X}", value & 0x00FF_FFFF), "register write");
        self.transport
            .write(&frame)
            .bus_err(BusOperation::Write, Some(address), error_context!("device", "write_register"))
    }

    pub fn read_register(&mut self, address: u8) -> EcgResult<[u8; DATA_LEN]> {
        let request = encode_read_request(address);
        let mut response = [0u8; DATA_LEN];
        self.transport
            .write_read(&request, &mut response)
            .bus_err(BusOperation::Read, Some(address), error_context!("device", "read_register"))?;
        trace!(address = format_args!("0x{:02X}", address), ?response, "register read");
        Ok(response)
    }

    pub fn read_register_word(&mut self, address: u8) -> EcgResult<u32> {
        self.read_register(address).map(protocol::word_from_response)
    }

    pub fn software_reset(&mut self) -> EcgResult<()> {
        self.write_register(address::SW_RST, 0)
    }

    pub fn synchronize(&mut self) -> EcgResult<()> {
        self.write_register(address::SYNCH, 0)
    }

    pub fn fifo_reset(&mut self) -> EcgResult<()> {
        self.write_register(address::FIFO_RST, 0)
    }

    pub fn read_status(&mut self) -> EcgResult<StatusSnapshot> {
        self.read_register(address::STATUS).map(StatusSnapshot::from_bytes)
    }

    pub fn read_fifo_sample(&mut self) -> EcgResult<FifoSample> {
        self.read_register(address::ECG_FIFO).map(FifoSample::from_bytes)
    }

    pub fn read_info(&mut self) -> EcgResult<DeviceInfo> {
        self.read_register_word(address::INFO).map(|raw| DeviceInfo { raw })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport
    pub fn into_transport(self) -> T {
        self.transport
    }
}
