// src/hal/embedded.rs
//! [`SpiTransport`] over any `embedded-hal` 1.0 SPI device

use crate::hal::{BitOrder, BusSettings, SpiTransport, TransportError};
use embedded_hal::spi::{Error as _, Operation, SpiDevice};
use tracing::debug;

/// Adapter for a bus owned and clocked by a HAL crate
///
/// Mode and speed are fixed when the HAL builds the `SpiDevice`, so
/// [`SpiTransport::configure`] only rejects settings the adapter cannot
/// honor.
pub struct EmbeddedHalTransport<D> {
    device: D,
}

impl<D: SpiDevice> EmbeddedHalTransport<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: SpiDevice> SpiTransport for EmbeddedHalTransport<D> {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), TransportError> {
        if settings.bits_per_word != 8 {
            return Err(TransportError::Unsupported {
                setting: "bits_per_word",
                reason: format!("embedded-hal devices transfer 8-bit words, got {}", settings.bits_per_word),
            });
        }
        if settings.bit_order == BitOrder::LsbFirst {
            return Err(TransportError::Unsupported {
                setting: "bit_order",
                reason: "embedded-hal devices shift MSB first".to_string(),
            });
        }
        debug!(mode = settings.mode, speed_hz = settings.max_speed_hz, "bus configured by HAL");
        Ok(())
    }

    fn write(&mut self, output: &[u8]) -> Result<(), TransportError> {
        self.device
            .write(output)
            .map_err(|e| TransportError::Spi(e.kind()))
    }

    fn write_read(&mut self, output: &[u8], input: &mut [u8]) -> Result<(), TransportError> {
        self.device
            .transaction(&mut [Operation::Write(output), Operation::Read(input)])
            .map_err(|e| TransportError::Spi(e.kind()))
    }
}
