// src/registers/fields.rs
//! Enumerated sub-fields of the MAX30003 configuration registers
//!
//! Bit positions follow the datasheet. Each field lists its values as
//! `Variant => bits, selector, "label"`, where `selector` is the number a user
//! types to pick it.

use super::{ConfigRegister, RegisterField};
use std::fmt;

macro_rules! register_field {
    (
        $(#[$meta:meta])*
        $name:ident {
            name: $label:literal,
            register: $register:ident,
            mask: $mask:expr,
            fallback: $fallback:ident,
            values: {
                $( $(#[$vmeta:meta])* $variant:ident => $bits:expr, $selector:literal, $display:literal; )+
            }
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl RegisterField for $name {
            const NAME: &'static str = $label;
            const REGISTER: ConfigRegister = ConfigRegister::$register;
            const MASK: u32 = $mask;
            const FALLBACK: Self = $name::$fallback;
            const ALL: &'static [Self] = &[ $( $name::$variant, )+ ];

            fn bits(self) -> u32 {
                match self {
                    $( $name::$variant => $bits, )+
                }
            }

            fn selector(self) -> u32 {
                match self {
                    $( $name::$variant => $selector, )+
                }
            }

            fn from_selector(selector: u32) -> Option<Self> {
                match selector {
                    $( $selector => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let label = match self {
                    $( $name::$variant => $display, )+
                };
                write!(f, "{}", label)
            }
        }
    };
}

// CNFG_GEN

register_field! {
    /// Ultra-low-power lead-on detection (EN_ULP_LON)
    UlpLeadOn {
        name: "ULP lead-on detection",
        register: General,
        mask: 0xC0_0000,
        fallback: Enabled,
        values: {
            Enabled => 0x40_0000, 1, "enabled";
            Disabled => 0x00_0000, 2, "disabled";
        }
    }
}

register_field! {
    /// ECG channel enable (EN_ECG)
    EcgChannel {
        name: "ECG channel",
        register: General,
        mask: 0x08_0000,
        fallback: Enabled,
        values: {
            Enabled => 0x08_0000, 1, "enabled";
            Disabled => 0x00_0000, 2, "disabled";
        }
    }
}

register_field! {
    /// DC lead-off detection (EN_DCLOFF)
    DcLeadOff {
        name: "DC lead-off detection",
        register: General,
        mask: 0x00_3000,
        fallback: Enabled,
        values: {
            Enabled => 0x00_1000, 1, "enabled";
            Disabled => 0x00_0000, 2, "disabled";
        }
    }
}

register_field! {
    /// DC lead-off current polarity (DCLOFF_IPOL)
    LeadOffPolarity {
        name: "lead-off current polarity",
        register: General,
        mask: 0x00_0800,
        fallback: PositivePullUp,
        values: {
            PositivePullUp => 0x00_0000, 1, "ECGP pull-up, ECGN pull-down";
            PositivePullDown => 0x00_0800, 2, "ECGP pull-down, ECGN pull-up";
        }
    }
}

register_field! {
    /// DC lead-off current magnitude (DCLOFF_IMAG)
    LeadOffCurrent {
        name: "lead-off current",
        register: General,
        mask: 0x00_0700,
        fallback: Off,
        values: {
            Off => 0x00_0000, 0, "0 nA (sources off)";
            Na5 => 0x00_0100, 5, "5 nA";
            Na10 => 0x00_0200, 10, "10 nA";
            Na20 => 0x00_0300, 20, "20 nA";
            Na50 => 0x00_0400, 50, "50 nA";
            Na100 => 0x00_0500, 100, "100 nA";
        }
    }
}

register_field! {
    /// DC lead-off voltage threshold (DCLOFF_VTH)
    LeadOffThreshold {
        name: "lead-off threshold",
        register: General,
        mask: 0x00_00C0,
        fallback: Mv300,
        values: {
            Mv300 => 0x00_0000, 300, "VMID ± 300 mV";
            Mv400 => 0x00_0040, 400, "VMID ± 400 mV";
            Mv450 => 0x00_0080, 450, "VMID ± 450 mV";
            Mv500 => 0x00_00C0, 500, "VMID ± 500 mV";
        }
    }
}

register_field! {
    /// Resistive bias enable (EN_RBIAS)
    ResistiveBias {
        name: "resistive bias",
        register: General,
        mask: 0x00_0030,
        fallback: Enabled,
        values: {
            Enabled => 0x00_0010, 1, "enabled";
            Disabled => 0x00_0000, 2, "disabled";
        }
    }
}

register_field! {
    /// Resistive bias value (RBIASV)
    BiasResistance {
        name: "resistive bias value",
        register: General,
        mask: 0x00_000C,
        fallback: Mohm50,
        values: {
            Mohm50 => 0x00_0000, 50, "50 MΩ";
            Mohm100 => 0x00_0004, 100, "100 MΩ";
            Mohm200 => 0x00_0008, 200, "200 MΩ";
        }
    }
}

register_field! {
    /// Inputs the resistive bias is connected to (RBIASP/RBIASN)
    BiasInputs {
        name: "resistive bias routing",
        register: General,
        mask: 0x00_0003,
        fallback: None,
        values: {
            None => 0x00_0000, 0, "not connected";
            Negative => 0x00_0001, 1, "ECGN";
            Positive => 0x00_0002, 2, "ECGP";
            Both => 0x00_0003, 3, "ECGP and ECGN";
        }
    }
}

// CNFG_CAL

register_field! {
    /// Calibration voltage source (EN_VCAL)
    CalibrationSource {
        name: "calibration source",
        register: Calibration,
        mask: 0x40_0000,
        fallback: Enabled,
        values: {
            Enabled => 0x40_0000, 1, "enabled";
            Disabled => 0x00_0000, 2, "disabled";
        }
    }
}

register_field! {
    /// Calibration source mode (VMODE)
    CalibrationMode {
        name: "calibration mode",
        register: Calibration,
        mask: 0x20_0000,
        fallback: Bipolar,
        values: {
            Bipolar => 0x20_0000, 1, "bipolar";
            Unipolar => 0x00_0000, 2, "unipolar";
        }
    }
}

register_field! {
    /// Calibration source magnitude (VMAG)
    CalibrationMagnitude {
        name: "calibration magnitude",
        register: Calibration,
        mask: 0x10_0000,
        fallback: HalfMillivolt,
        values: {
            HalfMillivolt => 0x10_0000, 1, "0.50 mV";
            QuarterMillivolt => 0x00_0000, 2, "0.25 mV";
        }
    }
}

register_field! {
    /// Calibration source frequency (FCAL); selectors are in millihertz
    CalibrationFrequency {
        name: "calibration frequency",
        register: Calibration,
        mask: 0x00_7000,
        fallback: Hz256,
        values: {
            Hz256 => 0x00_0000, 256000, "256 Hz";
            Hz64 => 0x00_1000, 64000, "64 Hz";
            Hz16 => 0x00_2000, 16000, "16 Hz";
            Hz4 => 0x00_3000, 4000, "4 Hz";
            Hz1 => 0x00_4000, 1000, "1 Hz";
            MilliHz250 => 0x00_5000, 250, "1/4 Hz";
            MilliHz62 => 0x00_6000, 62, "1/16 Hz";
            MilliHz16 => 0x00_7000, 16, "1/64 Hz";
        }
    }
}

// CNFG_EMUX

register_field! {
    /// ECG input polarity (POL)
    InputPolarity {
        name: "input polarity",
        register: InputMux,
        mask: 0x80_0000,
        fallback: Inverted,
        values: {
            Inverted => 0x80_0000, 1, "inverted";
            NonInverted => 0x00_0000, 2, "non-inverted";
        }
    }
}

/// Input switch operation (OPENP bit 21, OPENN bit 20)
///
/// Each selector changes a single switch. The fallback closes both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSwitch {
    PositiveIsolated,
    NegativeIsolated,
    NegativeConnected,
    PositiveConnected,
    BothConnected,
}

const OPENP: u32 = 0x20_0000;
const OPENN: u32 = 0x10_0000;

impl RegisterField for InputSwitch {
    const NAME: &'static str = "input switch";
    const REGISTER: ConfigRegister = ConfigRegister::InputMux;
    const MASK: u32 = OPENP | OPENN;
    const FALLBACK: Self = InputSwitch::BothConnected;
    const ALL: &'static [Self] = &[
        InputSwitch::PositiveIsolated,
        InputSwitch::NegativeIsolated,
        InputSwitch::NegativeConnected,
        InputSwitch::PositiveConnected,
        InputSwitch::BothConnected,
    ];

    fn bits(self) -> u32 {
        match self {
            InputSwitch::PositiveIsolated => OPENP,
            InputSwitch::NegativeIsolated => OPENN,
            InputSwitch::NegativeConnected
            | InputSwitch::PositiveConnected
            | InputSwitch::BothConnected => 0,
        }
    }

    fn touched_mask(self) -> u32 {
        match self {
            InputSwitch::PositiveIsolated | InputSwitch::PositiveConnected => OPENP,
            InputSwitch::NegativeIsolated | InputSwitch::NegativeConnected => OPENN,
            InputSwitch::BothConnected => Self::MASK,
        }
    }

    fn selector(self) -> u32 {
        match self {
            InputSwitch::PositiveIsolated => 1,
            InputSwitch::NegativeIsolated => 2,
            InputSwitch::NegativeConnected => 3,
            InputSwitch::PositiveConnected => 4,
            InputSwitch::BothConnected => 0,
        }
    }

    fn from_selector(selector: u32) -> Option<Self> {
        match selector {
            1 => Some(InputSwitch::PositiveIsolated),
            2 => Some(InputSwitch::NegativeIsolated),
            3 => Some(InputSwitch::NegativeConnected),
            4 => Some(InputSwitch::PositiveConnected),
            _ => None,
        }
    }

    /// Switch states map back to a single operation only when at most one
    /// switch is open.
    fn decode(register: u32) -> Option<Self> {
        match register & Self::MASK {
            0 => Some(InputSwitch::BothConnected),
            OPENP => Some(InputSwitch::PositiveIsolated),
            OPENN => Some(InputSwitch::NegativeIsolated),
            _ => None,
        }
    }
}

impl fmt::Display for InputSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InputSwitch::PositiveIsolated => "ECGP isolated",
            InputSwitch::NegativeIsolated => "ECGN isolated",
            InputSwitch::NegativeConnected => "ECGN connected",
            InputSwitch::PositiveConnected => "ECGP connected",
            InputSwitch::BothConnected => "ECGP and ECGN connected",
        };
        write!(f, "{}", label)
    }
}

register_field! {
    /// ECGP calibration routing (CALP_SEL)
    PositiveCalibration {
        name: "positive calibration routing",
        register: InputMux,
        mask: 0x0C_0000,
        fallback: None,
        values: {
            Vmid => 0x04_0000, 1, "VMID";
            Vcalp => 0x08_0000, 2, "VCALP";
            Vcaln => 0x0C_0000, 3, "VCALN";
            None => 0x00_0000, 4, "no calibration signal";
        }
    }
}

register_field! {
    /// ECGN calibration routing (CALN_SEL)
    NegativeCalibration {
        name: "negative calibration routing",
        register: InputMux,
        mask: 0x03_0000,
        fallback: None,
        values: {
            Vmid => 0x01_0000, 1, "VMID";
            Vcalp => 0x02_0000, 2, "VCALP";
            Vcaln => 0x03_0000, 3, "VCALN";
            None => 0x00_0000, 4, "no calibration signal";
        }
    }
}

// CNFG_ECG

register_field! {
    /// ECG channel gain (GAIN)
    EcgGain {
        name: "ECG gain",
        register: EcgChannel,
        mask: 0x03_0000,
        fallback: V20,
        values: {
            V20 => 0x00_0000, 20, "20 V/V";
            V40 => 0x01_0000, 40, "40 V/V";
            V80 => 0x02_0000, 80, "80 V/V";
            V160 => 0x03_0000, 160, "160 V/V";
        }
    }
}

register_field! {
    /// ECG sample rate (RATE), for the default 32768 Hz master clock
    SampleRate {
        name: "sample rate",
        register: EcgChannel,
        mask: 0xC0_0000,
        fallback: Sps512,
        values: {
            Sps512 => 0x00_0000, 512, "512 sps";
            Sps256 => 0x40_0000, 256, "256 sps";
            Sps128 => 0x80_0000, 128, "128 sps";
        }
    }
}

impl SampleRate {
    pub fn samples_per_second(self) -> u32 {
        self.selector()
    }
}

register_field! {
    /// Digital high-pass filter (DHPF)
    HighPassFilter {
        name: "high-pass cutoff",
        register: EcgChannel,
        mask: 0x00_4000,
        fallback: Bypass,
        values: {
            Bypass => 0x00_0000, 1, "bypass (DC)";
            Hz0_5 => 0x00_4000, 2, "0.5 Hz";
        }
    }
}

register_field! {
    /// Digital low-pass filter (DLPF)
    LowPassFilter {
        name: "low-pass cutoff",
        register: EcgChannel,
        mask: 0x00_3000,
        fallback: Bypass,
        values: {
            Bypass => 0x00_0000, 0, "bypass";
            Hz40 => 0x00_1000, 40, "40 Hz";
            Hz100 => 0x00_2000, 100, "100 Hz";
            Hz150 => 0x00_3000, 150, "150 Hz";
        }
    }
}

// MNGR_INT

register_field! {
    /// ECG FIFO interrupt threshold (EFIT, stored as samples - 1)
    FifoThreshold {
        name: "FIFO interrupt threshold",
        register: InterruptManager,
        mask: 0xF8_0000,
        fallback: Samples1,
        values: {
            Samples1 => 0x00_0000, 1, "1 sample";
            Samples2 => 0x08_0000, 2, "2 samples";
            Samples16 => 0x78_0000, 16, "16 samples";
        }
    }
}

register_field! {
    /// RTOR R-detect interrupt clear behavior (CLR_RRINT)
    RtorClear {
        name: "R-event clear",
        register: InterruptManager,
        mask: 0x00_0030,
        fallback: OnStatusRead,
        values: {
            OnStatusRead => 0x00_0000, 0, "clear on STATUS read";
            OnRtorRead => 0x00_0010, 1, "clear on RTOR read";
            SelfClear => 0x00_0020, 2, "self-clear";
        }
    }
}

register_field! {
    /// Sample synchronization pulse clear behavior (CLR_SAMP)
    SampleClear {
        name: "sample-pulse clear",
        register: InterruptManager,
        mask: 0x00_0004,
        fallback: OnStatusRead,
        values: {
            Auto => 0x00_0004, 1, "self-clear";
            OnStatusRead => 0x00_0000, 2, "clear on STATUS read";
        }
    }
}

register_field! {
    /// Sample synchronization pulse frequency (SAMP_IT)
    SamplePulseFrequency {
        name: "sample-pulse frequency",
        register: InterruptManager,
        mask: 0x00_0003,
        fallback: EverySample,
        values: {
            EverySample => 0x00_0000, 1, "every sample";
            EverySecond => 0x00_0001, 2, "every 2nd sample";
            EveryFourth => 0x00_0002, 4, "every 4th sample";
            EverySixteenth => 0x00_0003, 16, "every 16th sample";
        }
    }
}
