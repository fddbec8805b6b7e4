// src/config/constants.rs
//! System-wide configuration constants

/// Acquisition session constants
pub mod acquisition {
    /// Samples collected when no count is given
    pub const DEFAULT_SAMPLE_COUNT: usize = 1024;
    /// Upper bound accepted from settings files and the command line
    pub const MAX_SAMPLE_COUNT: usize = 16 * 1024 * 1024;
    /// Wall-clock window applied when the timeout is zero or unset
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
    pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;
    /// Zero means busy polling
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 0;
    pub const MAX_POLL_INTERVAL_MS: u64 = 1000;
}

/// SPI bus constants
pub mod bus {
    pub const DEFAULT_DEVICE_PATH: &str = "/dev/spidev0.0";
    pub const DEFAULT_MAX_SPEED_HZ: u32 = 1_000_000;
    /// MAX30003 SCLK limit
    pub const MAX_SPEED_HZ: u32 = 12_000_000;
    pub const MIN_SPEED_HZ: u32 = 1_000;
    pub const DEFAULT_BITS_PER_WORD: u8 = 8;
    pub const DEFAULT_MODE: u8 = 0;
}

/// Wire framing constants
pub mod protocol {
    /// Command byte plus three data bytes
    pub const FRAME_LEN: usize = 4;
    pub const COMMAND_LEN: usize = 1;
    pub const DATA_LEN: usize = 3;
    /// Bit 0 of the command byte: 1 reads, 0 writes
    pub const READ_FLAG: u8 = 0x01;
}

/// Environment overrides
pub mod env {
    pub const PREFIX: &str = "ECG_";
    pub const CONFIG_FILE_VAR: &str = "ECG_CONFIG";
}

/// File system paths
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/ecg/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/ecg";
    pub const LOCAL_CONFIG_FILE: &str = "ecg.toml";
    pub const CONFIG_EXTENSION: &str = ".toml";
}

/// Validation constants
pub mod validation {
    pub const MAX_CONFIG_FILE_SIZE_BYTES: u64 = 1_048_576;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_consistency() {
        assert!(acquisition::DEFAULT_SAMPLE_COUNT > 0);
        assert!(acquisition::DEFAULT_SAMPLE_COUNT <= acquisition::MAX_SAMPLE_COUNT);
        assert!(acquisition::DEFAULT_TIMEOUT_SECS > 0);
        assert!(acquisition::DEFAULT_TIMEOUT_SECS <= acquisition::MAX_TIMEOUT_SECS);
        assert!(acquisition::DEFAULT_POLL_INTERVAL_MS <= acquisition::MAX_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_bus_constants_validity() {
        assert!(bus::MIN_SPEED_HZ < bus::MAX_SPEED_HZ);
        assert!(bus::DEFAULT_MAX_SPEED_HZ >= bus::MIN_SPEED_HZ);
        assert!(bus::DEFAULT_MAX_SPEED_HZ <= bus::MAX_SPEED_HZ);
        assert!(bus::DEFAULT_MODE <= 3);
        assert_eq!(protocol::COMMAND_LEN + protocol::DATA_LEN, protocol::FRAME_LEN);
    }
}
