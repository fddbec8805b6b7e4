// src/device/protocol.rs
//! MAX30003 SPI framing
//!
//! Write: `[(addr << 1) | W, v[23:16], v[15:8], v[7:0]]`, one phase.
//! Read: `[(addr << 1) | R]` followed by three input bytes under the same
//! chip select.

use crate::config::constants::protocol::{DATA_LEN, FRAME_LEN, READ_FLAG};
use crate::registers::REGISTER_MASK;

pub type WriteFrame = [u8; FRAME_LEN];

#[inline]
pub const fn command_byte(address: u8, read: bool) -> u8 {
    (address << 1) | if read { READ_FLAG } else { 0 }
}

/// Frame a register write; only the low 24 bits of `value` are sent
#[inline]
pub fn encode_write_frame(address: u8, value: u32) -> WriteFrame {
    let [_, hi, mid, lo] = (value & REGISTER_MASK).to_be_bytes();
    [command_byte(address, false), hi, mid, lo]
}

/// Split a write frame back into `(address, value)`; `None` for read commands
pub fn decode_write_frame(frame: &[u8]) -> Option<(u8, u32)> {
    match frame {
        [command, hi, mid, lo] if command & READ_FLAG == 0 => Some((
            command >> 1,
            u32::from_be_bytes([0, *hi, *mid, *lo]),
        )),
        _ => None,
    }
}

#[inline]
pub const fn encode_read_request(address: u8) -> [u8; 1] {
    [command_byte(address, true)]
}

/// Address named by a read request, if `request` is one
pub fn decode_read_request(request: &[u8]) -> Option<u8> {
    match request {
        [command] if command & READ_FLAG != 0 => Some(command >> 1),
        _ => None,
    }
}

/// Assemble a 24-bit register word from a read response
#[inline]
pub fn word_from_response(response: [u8; DATA_LEN]) -> u32 {
    u32::from_be_bytes([0, response[0], response[1], response[2]])
}
