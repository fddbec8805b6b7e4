// src/device/sample.rs
//! ECG FIFO word decoding
//!
//! A FIFO word is three bytes: 18 bits of two's-complement sample data
//! (`b0`, `b1` and the top two bits of `b2`), a 3-bit ETAG and a 3-bit PTAG.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decode the sample value left-aligned in an `i32`
///
/// The 18 data bits land in bits 31..14 so the sign comes from `b0`'s MSB;
/// the low 14 bits are always zero.
#[inline]
pub fn decode_sample(bytes: [u8; 3]) -> i32 {
    let [b0, b1, b2] = bytes;
    let value = (u32::from(b0) << 24) | (u32::from(b1) << 16) | ((u32::from(b2 >> 6) & 0b11) << 14);
    value as i32
}

/// ECG FIFO data tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Etag {
    Valid,
    Fast,
    ValidEof,
    FastEof,
    Empty,
    Overflow,
    /// Codes 4 and 5 are not assigned by the datasheet
    Reserved(u8),
}

impl Etag {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Etag::Valid,
            1 => Etag::Fast,
            2 => Etag::ValidEof,
            3 => Etag::FastEof,
            6 => Etag::Empty,
            7 => Etag::Overflow,
            other => Etag::Reserved(other),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Etag::Valid => 0,
            Etag::Fast => 1,
            Etag::ValidEof => 2,
            Etag::FastEof => 3,
            Etag::Empty => 6,
            Etag::Overflow => 7,
            Etag::Reserved(bits) => bits & 0b111,
        }
    }

    /// True when the word carries a measured sample
    pub fn carries_data(self) -> bool {
        matches!(self, Etag::Valid | Etag::ValidEof | Etag::Fast | Etag::FastEof)
    }
}

/// How poll iterations decide whether a FIFO word is a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Read the FIFO every iteration and keep non-zero values; a genuine
    /// zero reading is indistinguishable from "no sample" and is dropped
    #[default]
    Compatible,
    /// Read the FIFO only while EINT is pending and keep words whose ETAG
    /// reports data, zeros included
    Strict,
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeMode::Compatible => write!(f, "compatible"),
            DecodeMode::Strict => write!(f, "strict"),
        }
    }
}

/// One raw ECG FIFO word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FifoSample {
    bytes: [u8; 3],
}

impl FifoSample {
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self { bytes }
    }

    /// Pack an 18-bit sample and tags the way the chip does
    pub fn from_parts(sample_18bit: i32, etag: Etag, ptag: u8) -> Self {
        let data = (sample_18bit as u32) & 0x3_FFFF;
        Self {
            bytes: [
                (data >> 10) as u8,
                (data >> 2) as u8,
                (((data & 0b11) as u8) << 6) | (etag.bits() << 3) | (ptag & 0b111),
            ],
        }
    }

    pub fn bytes(&self) -> [u8; 3] {
        self.bytes
    }

    /// Left-aligned value, see [`decode_sample`]
    pub fn value(&self) -> i32 {
        decode_sample(self.bytes)
    }

    /// Sign-extended 18-bit ADC reading, -131072 ..= 131071
    pub fn sample_18bit(&self) -> i32 {
        self.value() >> 14
    }

    pub fn etag(&self) -> Etag {
        Etag::from_bits(self.bytes[2] >> 3)
    }

    pub fn ptag(&self) -> u8 {
        self.bytes[2] & 0b111
    }

    /// Whether a poll iteration stores this word
    pub fn is_accepted(&self, mode: DecodeMode) -> bool {
        match mode {
            DecodeMode::Compatible => self.value() != 0,
            DecodeMode::Strict => self.etag().carries_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_reference_words() {
        assert_eq!(decode_sample([0x00, 0x00, 0x00]), 0);
        assert_eq!(decode_sample([0x7F, 0xFF, 0xC0]), 0x7FFF_C000);
        assert_eq!(decode_sample([0x80, 0x00, 0x00]), i32::MIN);
    }

    #[test]
    fn test_tag_bits_do_not_leak_into_value() {
        assert_eq!(decode_sample([0x00, 0x00, 0x3F]), 0);
        assert_eq!(decode_sample([0x12, 0x34, 0x40 | 0x3F]), 0x1234_4000);
    }

    #[test]
    fn test_18bit_extremes() {
        assert_eq!(FifoSample::from_bytes([0x7F, 0xFF, 0xC0]).sample_18bit(), 131_071);
        assert_eq!(FifoSample::from_bytes([0x80, 0x00, 0x00]).sample_18bit(), -131_072);
        assert_eq!(FifoSample::from_bytes([0xFF, 0xFF, 0xC0]).sample_18bit(), -1);
    }

    #[test]
    fn test_etag_decoding() {
        assert_eq!(FifoSample::from_bytes([0, 0, 0x30]).etag(), Etag::Empty);
        assert_eq!(FifoSample::from_bytes([0, 0, 0x38]).etag(), Etag::Overflow);
        assert_eq!(FifoSample::from_bytes([0, 0, 0x10]).etag(), Etag::ValidEof);
        assert_eq!(FifoSample::from_bytes([0, 0, 0x05]).ptag(), 5);
        assert_eq!(Etag::from_bits(4), Etag::Reserved(4));
    }

    #[test]
    fn test_acceptance_by_mode() {
        let zero_valid = FifoSample::from_parts(0, Etag::Valid, 7);
        assert!(!zero_valid.is_accepted(DecodeMode::Compatible));
        assert!(zero_valid.is_accepted(DecodeMode::Strict));

        let empty = FifoSample::from_parts(0, Etag::Empty, 7);
        assert!(!empty.is_accepted(DecodeMode::Strict));

        let sample = FifoSample::from_parts(-42, Etag::Valid, 7);
        assert!(sample.is_accepted(DecodeMode::Compatible));
        assert!(sample.is_accepted(DecodeMode::Strict));
    }

    proptest! {
        #[test]
        fn prop_parts_roundtrip(sample in -131_072i32..=131_071, etag in 0u8..8, ptag in 0u8..8) {
            let word = FifoSample::from_parts(sample, Etag::from_bits(etag), ptag);
            prop_assert_eq!(word.sample_18bit(), sample);
            prop_assert_eq!(word.etag().bits(), etag);
            prop_assert_eq!(word.ptag(), ptag);
            prop_assert_eq!(word.value() & 0x3FFF, 0);
        }
    }
}
