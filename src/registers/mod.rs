// src/registers/mod.rs
//! MAX30003 register model
//!
//! Every configuration register is a 24-bit word assembled from named
//! sub-fields. Sub-field setters are pure: they take the current word and an
//! enumerated value and return the new word, touching only the bits of that
//! sub-field. Numeric selectors (the vocabulary used on the command line and in
//! settings files, e.g. gain `80` or sample rate `256`) go through
//! [`apply_selector`], which never fails: an unrecognized selector applies the
//! field's safe default and reports [`EcgError::InvalidFieldValue`] as a
//! warning.

pub mod fields;

pub use fields::*;

use crate::config::constants::acquisition::{DEFAULT_SAMPLE_COUNT, DEFAULT_TIMEOUT_SECS};
use crate::error::EcgError;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Only the low 24 bits of a register word reach the chip
pub const REGISTER_MASK: u32 = 0x00FF_FFFF;

/// Register addresses from the MAX30003 datasheet
pub mod address {
    pub const NO_OP: u8 = 0x00;
    pub const STATUS: u8 = 0x01;
    pub const EN_INT: u8 = 0x02;
    pub const EN_INT2: u8 = 0x03;
    pub const MNGR_INT: u8 = 0x04;
    pub const MNGR_DYN: u8 = 0x05;
    pub const SW_RST: u8 = 0x08;
    pub const SYNCH: u8 = 0x09;
    pub const FIFO_RST: u8 = 0x0A;
    pub const INFO: u8 = 0x0F;
    pub const CNFG_GEN: u8 = 0x10;
    pub const CNFG_CAL: u8 = 0x12;
    pub const CNFG_EMUX: u8 = 0x14;
    pub const CNFG_ECG: u8 = 0x15;
    pub const CNFG_RTOR1: u8 = 0x1D;
    pub const CNFG_RTOR2: u8 = 0x1E;
    pub const ECG_FIFO_BURST: u8 = 0x20;
    pub const ECG_FIFO: u8 = 0x21;
    pub const RTOR: u8 = 0x25;
}

/// Power-on words written when no override is given
pub mod defaults {
    /// ECG channel on, DC lead-off on, 100 MΩ bias on both inputs
    pub const CNFG_GEN: u32 = 0x08_1007;
    pub const CNFG_CAL: u32 = 0x72_0000;
    /// ECGP to VCALP, ECGN to VCALN, both switches closed
    pub const CNFG_EMUX: u32 = 0x0B_0000;
    /// Gain 80 V/V, 128 sps, 0.5 Hz high-pass, 150 Hz low-pass
    pub const CNFG_ECG: u32 = 0x82_7000;
    pub const CNFG_RTOR1: u32 = 0x3F_C600;
    /// Auto-clearing sample pulse, FIFO interrupt after one sample
    pub const MNGR_INT: u32 = 0x00_0004;
}

/// The six configuration registers written during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigRegister {
    General,
    Calibration,
    InputMux,
    EcgChannel,
    RtoR,
    InterruptManager,
}

impl ConfigRegister {
    /// Initialization write order
    pub const WRITE_ORDER: [ConfigRegister; 6] = [
        ConfigRegister::General,
        ConfigRegister::Calibration,
        ConfigRegister::InputMux,
        ConfigRegister::EcgChannel,
        ConfigRegister::RtoR,
        ConfigRegister::InterruptManager,
    ];

    pub const fn address(self) -> u8 {
        match self {
            ConfigRegister::General => address::CNFG_GEN,
            ConfigRegister::Calibration => address::CNFG_CAL,
            ConfigRegister::InputMux => address::CNFG_EMUX,
            ConfigRegister::EcgChannel => address::CNFG_ECG,
            ConfigRegister::RtoR => address::CNFG_RTOR1,
            ConfigRegister::InterruptManager => address::MNGR_INT,
        }
    }

    pub const fn default_value(self) -> u32 {
        match self {
            ConfigRegister::General => defaults::CNFG_GEN,
            ConfigRegister::Calibration => defaults::CNFG_CAL,
            ConfigRegister::InputMux => defaults::CNFG_EMUX,
            ConfigRegister::EcgChannel => defaults::CNFG_ECG,
            ConfigRegister::RtoR => defaults::CNFG_RTOR1,
            ConfigRegister::InterruptManager => defaults::MNGR_INT,
        }
    }
}

impl fmt::Display for ConfigRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigRegister::General => "CNFG_GEN",
            ConfigRegister::Calibration => "CNFG_CAL",
            ConfigRegister::InputMux => "CNFG_EMUX",
            ConfigRegister::EcgChannel => "CNFG_ECG",
            ConfigRegister::RtoR => "CNFG_RTOR1",
            ConfigRegister::InterruptManager => "MNGR_INT",
        };
        write!(f, "{}", name)
    }
}

/// A named sub-field of a configuration register
pub trait RegisterField: Copy + Eq + fmt::Debug + fmt::Display + Sized + 'static {
    /// Human readable field name used in warnings
    const NAME: &'static str;
    /// Register holding this field
    const REGISTER: ConfigRegister;
    /// Every bit this field may own
    const MASK: u32;
    /// Safe default applied for unrecognized selectors
    const FALLBACK: Self;
    /// All enumerated values
    const ALL: &'static [Self];

    /// Bits of this value, already positioned inside [`Self::MASK`]
    fn bits(self) -> u32;

    /// Bits cleared before [`Self::bits`] is OR-ed in
    fn touched_mask(self) -> u32 {
        Self::MASK
    }

    /// Numeric selector naming this value
    fn selector(self) -> u32;

    fn from_selector(selector: u32) -> Option<Self>;

    /// Read the field back out of a register word
    fn decode(register: u32) -> Option<Self> {
        let bits = register & Self::MASK;
        Self::ALL
            .iter()
            .copied()
            .find(|value| value.touched_mask() == Self::MASK && value.bits() == bits)
    }
}

/// Set one sub-field, leaving every other bit of the word unchanged
pub fn set_field<F: RegisterField>(register: u32, field: F) -> u32 {
    ((register & !field.touched_mask()) | field.bits()) & REGISTER_MASK
}

/// Read one sub-field back from a word
pub fn field_of<F: RegisterField>(register: u32) -> Option<F> {
    F::decode(register)
}

/// Outcome of applying a numeric selector to a register word
#[must_use]
#[derive(Debug)]
pub struct FieldUpdate<F> {
    /// New register word
    pub value: u32,
    /// Value actually applied
    pub field: F,
    /// Set when the selector was not recognized and the fallback was used
    pub warning: Option<EcgError>,
}

impl<F> FieldUpdate<F> {
    pub fn is_fallback(&self) -> bool {
        self.warning.is_some()
    }
}

/// Apply a numeric selector; unknown selectors apply [`RegisterField::FALLBACK`]
pub fn apply_selector<F: RegisterField>(register: u32, selector: u32) -> FieldUpdate<F> {
    match F::from_selector(selector) {
        Some(field) => FieldUpdate {
            value: set_field(register, field),
            field,
            warning: None,
        },
        None => {
            let field = F::FALLBACK;
            warn!(
                field = F::NAME,
                selector,
                fallback = %field,
                "unrecognized register field value, applying fallback"
            );
            FieldUpdate {
                value: set_field(register, field),
                field,
                warning: Some(EcgError::InvalidFieldValue {
                    field: F::NAME,
                    selector,
                    fallback: field.to_string(),
                }),
            }
        }
    }
}

/// Register words and acquisition parameters for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfiguration {
    pub cnfg_gen: u32,
    pub cnfg_cal: u32,
    pub cnfg_emux: u32,
    pub cnfg_ecg: u32,
    pub cnfg_rtor1: u32,
    pub mngr_int: u32,
    /// Target number of samples to collect
    pub sample_count: usize,
    /// Wall-clock acquisition window; zero selects the default
    pub timeout: Duration,
}

impl Default for DeviceConfiguration {
    fn default() -> Self {
        Self {
            cnfg_gen: defaults::CNFG_GEN,
            cnfg_cal: defaults::CNFG_CAL,
            cnfg_emux: defaults::CNFG_EMUX,
            cnfg_ecg: defaults::CNFG_ECG,
            cnfg_rtor1: defaults::CNFG_RTOR1,
            mngr_int: defaults::MNGR_INT,
            sample_count: DEFAULT_SAMPLE_COUNT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DeviceConfiguration {
    pub fn register(&self, register: ConfigRegister) -> u32 {
        match register {
            ConfigRegister::General => self.cnfg_gen,
            ConfigRegister::Calibration => self.cnfg_cal,
            ConfigRegister::InputMux => self.cnfg_emux,
            ConfigRegister::EcgChannel => self.cnfg_ecg,
            ConfigRegister::RtoR => self.cnfg_rtor1,
            ConfigRegister::InterruptManager => self.mngr_int,
        }
    }

    fn register_mut(&mut self, register: ConfigRegister) -> &mut u32 {
        match register {
            ConfigRegister::General => &mut self.cnfg_gen,
            ConfigRegister::Calibration => &mut self.cnfg_cal,
            ConfigRegister::InputMux => &mut self.cnfg_emux,
            ConfigRegister::EcgChannel => &mut self.cnfg_ecg,
            ConfigRegister::RtoR => &mut self.cnfg_rtor1,
            ConfigRegister::InterruptManager => &mut self.mngr_int,
        }
    }

    /// Set a typed sub-field in its register
    pub fn set<F: RegisterField>(&mut self, field: F) {
        let word = self.register_mut(F::REGISTER);
        *word = set_field(*word, field);
    }

    /// Builder form of [`DeviceConfiguration::set`]
    pub fn with<F: RegisterField>(mut self, field: F) -> Self {
        self.set(field);
        self
    }

    pub fn get<F: RegisterField>(&self) -> Option<F> {
        field_of(self.register(F::REGISTER))
    }

    /// Apply a numeric selector, returning the fallback warning if one was needed
    pub fn apply<F: RegisterField>(&mut self, selector: u32) -> Option<EcgError> {
        let word = self.register_mut(F::REGISTER);
        let update = apply_selector::<F>(*word, selector);
        *word = update.value;
        update.warning
    }

    /// Timeout actually enforced by the acquisition loop
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            self.timeout
        }
    }

    /// `(address, word)` pairs in initialization order
    pub fn init_writes(&self) -> [(u8, u32); 6] {
        ConfigRegister::WRITE_ORDER.map(|register| (register.address(), self.register(register) & REGISTER_MASK))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_words_decode_to_documented_fields() {
        let config = DeviceConfiguration::default();
        assert_eq!(config.get::<EcgGain>(), Some(EcgGain::V80));
        assert_eq!(config.get::<SampleRate>(), Some(SampleRate::Sps128));
        assert_eq!(config.get::<HighPassFilter>(), Some(HighPassFilter::Hz0_5));
        assert_eq!(config.get::<LowPassFilter>(), Some(LowPassFilter::Hz150));
        assert_eq!(config.get::<EcgChannel>(), Some(EcgChannel::Enabled));
        assert_eq!(config.get::<SampleClear>(), Some(SampleClear::Auto));
        assert_eq!(config.get::<FifoThreshold>(), Some(FifoThreshold::Samples1));
    }

    #[test]
    fn test_set_field_preserves_other_bits() {
        let register = 0x82_7000;
        let updated = set_field(register, EcgGain::V160);
        assert_eq!(updated, 0x83_7000);
        assert_eq!(updated & !EcgGain::MASK, register & !EcgGain::MASK);

        let cleared = set_field(updated, EcgGain::V20);
        assert_eq!(cleared, 0x80_7000);
    }

    #[test]
    fn test_set_field_does_not_leak_previous_selection() {
        let mut register = 0;
        register = set_field(register, SampleRate::Sps128);
        register = set_field(register, SampleRate::Sps256);
        assert_eq!(register, 0x40_0000);
    }

    #[test]
    fn test_apply_selector_recognized() {
        let update = apply_selector::<SampleRate>(defaults::CNFG_ECG, 256);
        assert!(!update.is_fallback());
        assert_eq!(update.field, SampleRate::Sps256);
        assert_eq!(update.value, 0x42_7000);
    }

    #[test]
    fn test_apply_selector_fallback_warns() {
        let update = apply_selector::<EcgGain>(defaults::CNFG_ECG, 33);
        assert!(update.is_fallback());
        assert_eq!(update.field, EcgGain::V20);
        assert_eq!(update.value, 0x80_7000);
        match update.warning {
            Some(EcgError::InvalidFieldValue { field, selector, .. }) => {
                assert_eq!(field, EcgGain::NAME);
                assert_eq!(selector, 33);
            }
            other => panic!("Expected InvalidFieldValue warning, got {:?}", other),
        }
    }

    #[test]
    fn test_configuration_routes_fields_to_registers() {
        let mut config = DeviceConfiguration::default();
        config.set(FifoThreshold::Samples16);
        config.set(CalibrationFrequency::Hz1);
        config.set(InputPolarity::Inverted);

        assert_eq!(config.mngr_int, 0x78_0004);
        assert_eq!(config.cnfg_cal, 0x72_4000);
        assert_eq!(config.cnfg_emux, 0x8B_0000);
        assert_eq!(config.cnfg_ecg, defaults::CNFG_ECG);
    }

    #[test]
    fn test_configuration_apply_returns_warning() {
        let mut config = DeviceConfiguration::default();
        assert!(config.apply::<EcgGain>(160).is_none());
        assert_eq!(config.get::<EcgGain>(), Some(EcgGain::V160));

        let warning = config.apply::<FifoThreshold>(7);
        assert!(warning.map(|w| w.is_warning()).unwrap_or(false));
        assert_eq!(config.get::<FifoThreshold>(), Some(FifoThreshold::Samples1));
    }

    #[test]
    fn test_init_writes_order() {
        let writes = DeviceConfiguration::default().init_writes();
        let addresses: Vec<u8> = writes.iter().map(|(addr, _)| *addr).collect();
        assert_eq!(
            addresses,
            vec![
                address::CNFG_GEN,
                address::CNFG_CAL,
                address::CNFG_EMUX,
                address::CNFG_ECG,
                address::CNFG_RTOR1,
                address::MNGR_INT,
            ]
        );
        assert_eq!(writes[4].1, defaults::CNFG_RTOR1);
    }

    #[test]
    fn test_effective_timeout_defaults_when_zero() {
        let mut config = DeviceConfiguration::default();
        config.timeout = Duration::ZERO;
        assert_eq!(config.effective_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        config.timeout = Duration::from_secs(3);
        assert_eq!(config.effective_timeout(), Duration::from_secs(3));
    }
}
