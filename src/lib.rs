//! ECG-Core: MAX30003 ECG front-end acquisition from user space
//!
//! This library drives a single MAX30003 over SPI. It provides:
//!
//! - A typed register model with pure sub-field setters and selector fallbacks
//! - Register read/write framing behind a pluggable SPI transport
//! - FIFO sample decoding (18-bit samples plus ETAG/PTAG)
//! - A timeout-bounded acquisition session with FIFO overflow tracking
//! - Layered TOML settings with environment overrides
//!
//! # Quick Start
//!
//! ```rust
//! use ecg_core::acquisition::AcquisitionSession;
//! use ecg_core::config::EcgSettings;
//! use ecg_core::hal::Max30003Simulator;
//!
//! let mut settings = EcgSettings::default();
//! settings.acquisition.sample_count = 4;
//! settings.registers.gain = Some(160);
//!
//! let mut chip = Max30003Simulator::new();
//! chip.push_samples([120, -40, 75, 3]);
//!
//! let mut session = AcquisitionSession::from_settings(&mut chip, &settings)?;
//! let report = session.run()?;
//! for sample in &report.samples {
//!     println!("{}", sample);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(clippy::all)]

pub mod acquisition;
pub mod config;
pub mod device;
pub mod error;
pub mod hal;
pub mod registers;

// Re-export commonly used types for convenience
pub use acquisition::{AcquisitionReport, AcquisitionSession, SampleBuffer, SessionFailure, SessionState};
pub use config::{ConfigLoader, EcgSettings};
pub use device::{DecodeMode, FifoSample, Max30003, StatusSnapshot};
pub use error::{EcgError, EcgResult, ErrorContext, Severity};
pub use hal::{BusSettings, SpiTransport, TransportError};
pub use registers::{DeviceConfiguration, RegisterField};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "ecg-core");
    }
}
