// src/hal/mod.rs
//! Hardware Abstraction Layer for the SPI bus

pub mod embedded;
pub mod simulator;
pub mod traits;
pub mod types;

#[cfg(feature = "linux")]
pub mod linux_spi;

pub use embedded::EmbeddedHalTransport;
pub use simulator::{Fault, Max30003Simulator};
pub use traits::*;
pub use types::*;

#[cfg(feature = "linux")]
pub use linux_spi::{LinuxSpiTransport, TransferStats};
