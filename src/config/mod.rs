// src/config/mod.rs
//! Settings for the ECG acquisition core
//!
//! Settings mirror the capture command line: register fields are carried as
//! the numeric selectors a user types (`gain = 80`, `sample_rate = 256`) and
//! are only turned into register words by [`EcgSettings::device_configuration`],
//! which is where unrecognized selectors fall back and produce warnings.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::device::DecodeMode;
use crate::error::EcgError;
use crate::hal::BusSettings;
use crate::registers::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete settings for one capture
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct EcgSettings {
    #[serde(default)]
    pub registers: RegisterSettings,
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    #[serde(default)]
    pub bus: BusSettings,
}

/// Register field selectors; `None` keeps the power-on default word
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct RegisterSettings {
    // CNFG_GEN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ulp_lead_on: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecg_channel: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dc_lead_off: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_off_polarity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_off_current: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_off_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resistive_bias: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias_resistance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias_inputs: Option<u32>,

    // CNFG_CAL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_source: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_magnitude: Option<u32>,
    /// Millihertz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_frequency: Option<u32>,

    // CNFG_EMUX
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_polarity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_switch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_calibration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_calibration: Option<u32>,

    // CNFG_ECG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_pass: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<u32>,

    // MNGR_INT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifo_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtor_clear: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_clear: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_pulse_frequency: Option<u32>,
}

fn apply_optional<F: RegisterField>(
    config: &mut DeviceConfiguration,
    selector: Option<u32>,
    warnings: &mut Vec<EcgError>,
) {
    if let Some(selector) = selector {
        warnings.extend(config.apply::<F>(selector));
    }
}

impl RegisterSettings {
    /// Apply every configured selector; returns the fallback warnings
    pub fn apply_to(&self, config: &mut DeviceConfiguration) -> Vec<EcgError> {
        let mut warnings = Vec::new();
        let w = &mut warnings;

        apply_optional::<UlpLeadOn>(config, self.ulp_lead_on, w);
        apply_optional::<EcgChannel>(config, self.ecg_channel, w);
        apply_optional::<DcLeadOff>(config, self.dc_lead_off, w);
        apply_optional::<LeadOffPolarity>(config, self.lead_off_polarity, w);
        apply_optional::<LeadOffCurrent>(config, self.lead_off_current, w);
        apply_optional::<LeadOffThreshold>(config, self.lead_off_threshold, w);
        apply_optional::<ResistiveBias>(config, self.resistive_bias, w);
        apply_optional::<BiasResistance>(config, self.bias_resistance, w);
        apply_optional::<BiasInputs>(config, self.bias_inputs, w);

        apply_optional::<CalibrationSource>(config, self.calibration_source, w);
        apply_optional::<CalibrationMode>(config, self.calibration_mode, w);
        apply_optional::<CalibrationMagnitude>(config, self.calibration_magnitude, w);
        apply_optional::<CalibrationFrequency>(config, self.calibration_frequency, w);

        apply_optional::<InputPolarity>(config, self.input_polarity, w);
        apply_optional::<InputSwitch>(config, self.input_switch, w);
        apply_optional::<PositiveCalibration>(config, self.positive_calibration, w);
        apply_optional::<NegativeCalibration>(config, self.negative_calibration, w);

        apply_optional::<EcgGain>(config, self.gain, w);
        apply_optional::<SampleRate>(config, self.sample_rate, w);
        apply_optional::<HighPassFilter>(config, self.high_pass, w);
        apply_optional::<LowPassFilter>(config, self.low_pass, w);

        apply_optional::<FifoThreshold>(config, self.fifo_threshold, w);
        apply_optional::<RtorClear>(config, self.rtor_clear, w);
        apply_optional::<SampleClear>(config, self.sample_clear, w);
        apply_optional::<SamplePulseFrequency>(config, self.sample_pulse_frequency, w);

        warnings
    }
}

/// Acquisition loop parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AcquisitionSettings {
    #[serde(default = "defaults::sample_count")]
    pub sample_count: usize,

    /// Zero selects the default window
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "defaults::decode_mode")]
    pub decode_mode: DecodeMode,

    /// Pause between poll iterations; zero busy-polls
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl AcquisitionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }
}

/// Default value providers using constants
pub(crate) mod defaults {
    use crate::config::constants::*;
    use crate::device::DecodeMode;
    use crate::hal::BitOrder;

    pub fn sample_count() -> usize { acquisition::DEFAULT_SAMPLE_COUNT }
    pub fn timeout_secs() -> u64 { acquisition::DEFAULT_TIMEOUT_SECS }
    pub fn decode_mode() -> DecodeMode { DecodeMode::Compatible }
    pub fn poll_interval_ms() -> u64 { acquisition::DEFAULT_POLL_INTERVAL_MS }

    pub fn device() -> String { bus::DEFAULT_DEVICE_PATH.to_string() }
    pub fn mode() -> u8 { bus::DEFAULT_MODE }
    pub fn bit_order() -> BitOrder { BitOrder::MsbFirst }
    pub fn bits_per_word() -> u8 { bus::DEFAULT_BITS_PER_WORD }
    pub fn max_speed_hz() -> u32 { bus::DEFAULT_MAX_SPEED_HZ }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            sample_count: defaults::sample_count(),
            timeout_secs: defaults::timeout_secs(),
            decode_mode: defaults::decode_mode(),
            poll_interval_ms: defaults::poll_interval_ms(),
        }
    }
}

impl EcgSettings {
    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let acq = &self.acquisition;

        if acq.sample_count == 0 || acq.sample_count > acquisition::MAX_SAMPLE_COUNT {
            errors.push(format!(
                "acquisition.sample_count must be within 1..={}, got {}",
                acquisition::MAX_SAMPLE_COUNT,
                acq.sample_count
            ));
        }
        if acq.timeout_secs > acquisition::MAX_TIMEOUT_SECS {
            errors.push(format!(
                "acquisition.timeout_secs must not exceed {}, got {}",
                acquisition::MAX_TIMEOUT_SECS,
                acq.timeout_secs
            ));
        }
        if acq.poll_interval_ms > acquisition::MAX_POLL_INTERVAL_MS {
            errors.push(format!(
                "acquisition.poll_interval_ms must not exceed {}, got {}",
                acquisition::MAX_POLL_INTERVAL_MS,
                acq.poll_interval_ms
            ));
        }
        if self.bus.mode > 3 {
            errors.push(format!("bus.mode must be within 0..=3, got {}", self.bus.mode));
        }
        if self.bus.bits_per_word == 0 {
            errors.push("bus.bits_per_word must be non-zero".to_string());
        }
        if !(bus::MIN_SPEED_HZ..=bus::MAX_SPEED_HZ).contains(&self.bus.max_speed_hz) {
            errors.push(format!(
                "bus.max_speed_hz must be within {}..={}, got {}",
                bus::MIN_SPEED_HZ,
                bus::MAX_SPEED_HZ,
                self.bus.max_speed_hz
            ));
        }
        if self.bus.device.is_empty() {
            errors.push("bus.device must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Build the register words for a session, collecting fallback warnings
    pub fn device_configuration(&self) -> (DeviceConfiguration, Vec<EcgError>) {
        let mut config = DeviceConfiguration {
            sample_count: self.acquisition.sample_count,
            timeout: self.acquisition.timeout(),
            ..DeviceConfiguration::default()
        };
        let warnings = self.registers.apply_to(&mut config);
        (config, warnings)
    }
}
