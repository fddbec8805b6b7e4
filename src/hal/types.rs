// src/hal/types.rs
//! Core types for SPI bus access

use crate::config::defaults;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Order in which bits of a word are shifted out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Parameters applied to the bus before the first transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusSettings {
    /// Character device of the bus, e.g. `/dev/spidev0.0`
    #[serde(default = "defaults::device")]
    pub device: String,

    /// SPI mode 0-3 (CPOL/CPHA)
    #[serde(default = "defaults::mode")]
    pub mode: u8,

    #[serde(default = "defaults::bit_order")]
    pub bit_order: BitOrder,

    #[serde(default = "defaults::bits_per_word")]
    pub bits_per_word: u8,

    #[serde(default = "defaults::max_speed_hz")]
    pub max_speed_hz: u32,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            device: defaults::device(),
            mode: defaults::mode(),
            bit_order: defaults::bit_order(),
            bits_per_word: defaults::bits_per_word(),
            max_speed_hz: defaults::max_speed_hz(),
        }
    }
}

impl BusSettings {
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn with_speed(mut self, max_speed_hz: u32) -> Self {
        self.max_speed_hz = max_speed_hz;
        self
    }
}

/// Errors raised by a bus transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot set {setting}: {source}")]
    Configure {
        setting: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("transfer failed: {0}")]
    Io(#[from] io::Error),

    #[error("SPI device error: {0:?}")]
    Spi(embedded_hal::spi::ErrorKind),

    #[error("unsupported {setting}: {reason}")]
    Unsupported {
        setting: &'static str,
        reason: String,
    },

    /// Fault reported by a simulated or test transport
    #[error("{0}")]
    Fault(String),
}
