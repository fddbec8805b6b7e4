// src/hal/linux_spi.rs
//! Linux user-space SPI transport over `/dev/spidevB.C`

use crate::hal::{BitOrder, BusSettings, SpiTransport, TransportError};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use tracing::{debug, info};

/// Transfer counters for diagnostics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub transfers: u64,
    pub bytes_out: u64,
    pub bytes_in: u64,
}

/// Open spidev character device; closed on drop
pub struct LinuxSpiTransport {
    device: Spidev,
    path: String,
    stats: TransferStats,
}

impl LinuxSpiTransport {
    /// Open the device without touching its configuration
    pub fn open(path: &str) -> Result<Self, TransportError> {
        let device = Spidev::open(path).map_err(|source| TransportError::Open {
            path: path.to_string(),
            source,
        })?;
        info!(device = path, "opened SPI device");

        Ok(Self {
            device,
            path: path.to_string(),
            stats: TransferStats::default(),
        })
    }

    /// Open `settings.device` and apply every setting
    pub fn open_configured(settings: &BusSettings) -> Result<Self, TransportError> {
        let mut transport = Self::open(&settings.device)?;
        transport.configure(settings)?;
        Ok(transport)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    fn apply(&mut self, setting: &'static str, options: SpidevOptions) -> Result<(), TransportError> {
        self.device
            .configure(&options)
            .map_err(|source| TransportError::Configure { setting, source })
    }
}

fn mode_flags(mode: u8) -> Result<SpiModeFlags, TransportError> {
    match mode {
        0 => Ok(SpiModeFlags::SPI_MODE_0),
        1 => Ok(SpiModeFlags::SPI_MODE_1),
        2 => Ok(SpiModeFlags::SPI_MODE_2),
        3 => Ok(SpiModeFlags::SPI_MODE_3),
        other => Err(TransportError::Unsupported {
            setting: "mode",
            reason: format!("SPI mode must be 0-3, got {}", other),
        }),
    }
}

impl SpiTransport for LinuxSpiTransport {
    fn configure(&mut self, settings: &BusSettings) -> Result<(), TransportError> {
        let mode = mode_flags(settings.mode)?;

        // Applied one at a time so a rejected ioctl names its setting
        self.apply("mode", SpidevOptions::new().mode(mode).build())?;
        self.apply(
            "bit order",
            SpidevOptions::new()
                .lsb_first(settings.bit_order == BitOrder::LsbFirst)
                .build(),
        )?;
        self.apply(
            "bits per word",
            SpidevOptions::new().bits_per_word(settings.bits_per_word).build(),
        )?;
        self.apply(
            "max speed",
            SpidevOptions::new().max_speed_hz(settings.max_speed_hz).build(),
        )?;

        info!(
            device = %self.path,
            mode = settings.mode,
            bit_order = ?settings.bit_order,
            bits_per_word = settings.bits_per_word,
            speed_hz = settings.max_speed_hz,
            "SPI device configured"
        );
        Ok(())
    }

    fn write(&mut self, output: &[u8]) -> Result<(), TransportError> {
        let mut transfer = SpidevTransfer::write(output);
        self.device.transfer(&mut transfer)?;

        self.stats.transfers += 1;
        self.stats.bytes_out += output.len() as u64;
        Ok(())
    }

    fn write_read(&mut self, output: &[u8], input: &mut [u8]) -> Result<(), TransportError> {
        let bytes_in = input.len() as u64;
        {
            let mut transfers = [SpidevTransfer::write(output), SpidevTransfer::read(input)];
            self.device.transfer_multiple(&mut transfers)?;
        }

        self.stats.transfers += 1;
        self.stats.bytes_out += output.len() as u64;
        self.stats.bytes_in += bytes_in;
        Ok(())
    }
}

impl Drop for LinuxSpiTransport {
    fn drop(&mut self) {
        debug!(
            device = %self.path,
            transfers = self.stats.transfers,
            "closing SPI device"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        assert!(mode_flags(0).is_ok());
        assert!(mode_flags(3).is_ok());
        assert!(matches!(
            mode_flags(4),
            Err(TransportError::Unsupported { setting: "mode", .. })
        ));
    }

    #[test]
    fn test_open_missing_device() {
        match LinuxSpiTransport::open("/dev/this-spidev-does-not-exist") {
            Err(TransportError::Open { path, .. }) => {
                assert_eq!(path, "/dev/this-spidev-does-not-exist")
            }
            Err(other) => panic!("Expected open error, got {:?}", other),
            Ok(_) => panic!("Expected open error"),
        }
    }
}
