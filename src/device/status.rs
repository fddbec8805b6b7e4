// src/device/status.rs
//! STATUS register snapshot

use std::fmt;

pub mod flags {
    /// ECG FIFO interrupt
    pub const EINT: u32 = 1 << 23;
    /// ECG FIFO overflow
    pub const EOVF: u32 = 1 << 22;
    /// ECG fast recovery mode
    pub const FSTINT: u32 = 1 << 21;
    /// DC lead-off detection
    pub const DCLOFFINT: u32 = 1 << 20;
    /// Ultra-low-power leads-on detection
    pub const LONINT: u32 = 1 << 11;
    /// R-to-R detector
    pub const RRINT: u32 = 1 << 10;
    /// Sample synchronization pulse
    pub const SAMP: u32 = 1 << 9;
    /// PLL unlocked
    pub const PLLINT: u32 = 1 << 8;
    pub const LDOFF_PH: u32 = 1 << 3;
    pub const LDOFF_PL: u32 = 1 << 2;
    pub const LDOFF_NH: u32 = 1 << 1;
    pub const LDOFF_NL: u32 = 1 << 0;
}

/// One STATUS read; only meaningful for the poll iteration that read it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusSnapshot(u32);

impl StatusSnapshot {
    pub const fn new(raw: u32) -> Self {
        Self(raw & 0x00FF_FFFF)
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new((u32::from(bytes[0]) << 16) | (u32::from(bytes[1]) << 8) | u32::from(bytes[2]))
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    #[inline]
    fn has(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// FIFO holds at least the configured threshold of samples
    pub fn fifo_interrupt(&self) -> bool {
        self.has(flags::EINT)
    }

    /// FIFO overflowed; samples have been lost
    pub fn fifo_overflow(&self) -> bool {
        self.has(flags::EOVF)
    }

    pub fn fast_recovery(&self) -> bool {
        self.has(flags::FSTINT)
    }

    pub fn dc_lead_off(&self) -> bool {
        self.has(flags::DCLOFFINT)
    }

    pub fn leads_on(&self) -> bool {
        self.has(flags::LONINT)
    }

    pub fn r_to_r(&self) -> bool {
        self.has(flags::RRINT)
    }

    pub fn sample_pulse(&self) -> bool {
        self.has(flags::SAMP)
    }

    pub fn pll_unlocked(&self) -> bool {
        self.has(flags::PLLINT)
    }

    /// `(ECGP above, ECGP below, ECGN above, ECGN below)` lead-off thresholds
    pub fn lead_off_detail(&self) -> (bool, bool, bool, bool) {
        (
            self.has(flags::LDOFF_PH),
            self.has(flags::LDOFF_PL),
            self.has(flags::LDOFF_NH),
            self.has(flags::LDOFF_NL),
        )
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}
