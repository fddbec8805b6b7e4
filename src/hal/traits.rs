// src/hal/traits.rs
//! Core HAL traits for SPI transport abstraction

use crate::hal::types::{BusSettings, TransportError};

/// Full-duplex SPI bus carrying MAX30003 frames
///
/// One call is one chip-select assertion: `write` clocks out a single phase,
/// `write_read` clocks out `output` then clocks in `input.len()` bytes without
/// releasing chip select in between.
pub trait SpiTransport {
    /// Apply mode, bit order, word size and speed
    fn configure(&mut self, settings: &BusSettings) -> Result<(), TransportError>;

    fn write(&mut self, output: &[u8]) -> Result<(), TransportError>;

    fn write_read(&mut self, output: &[u8], input: &mut [u8]) -> Result<(), TransportError>;
}

impl<T: SpiTransport + ?Sized> SpiTransport for &mut T {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), TransportError> {
        (**self).configure(settings)
    }

    fn write(&mut self, output: &[u8]) -> Result<(), TransportError> {
        (**self).write(output)
    }

    fn write_read(&mut self, output: &[u8], input: &mut [u8]) -> Result<(), TransportError> {
        (**self).write_read(output, input)
    }
}

impl<T: SpiTransport + ?Sized> SpiTransport for Box<T> {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), TransportError> {
        (**self).configure(settings)
    }

    fn write(&mut self, output: &[u8]) -> Result<(), TransportError> {
        (**self).write(output)
    }

    fn write_read(&mut self, output: &[u8], input: &mut [u8]) -> Result<(), TransportError> {
        (**self).write_read(output, input)
    }
}
