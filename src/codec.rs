//! 6-bit integer packing for the board wire format.
//!
//! A board snapshot carries 32 square indices, each in 0..=63, so each fits
//! in six bits. Values are concatenated big-endian-within-value into a single
//! MSB-first bit stream and split into bytes; 32 values pack to exactly
//! `32 * 6 / 8 = 24` bytes.

/// Number of piece slots in a packed board.
pub const SLOT_COUNT: usize = 32;

/// Packed length of a full board: `ceil(32 * 6 / 8)`.
pub const PACKED_LEN: usize = 24;

/// Packs `values` (each in 0..=63) into a dense bit stream, zero-padding the
/// final byte when the total bit count is not a multiple of eight.
pub fn pack(values: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity((values.len() * 6).div_ceil(8));
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &value in values {
        debug_assert!(value < 64, "value {value} does not fit in six bits");
        acc = (acc << 6) | u32::from(value & 0x3f);
        bits += 6;
        while bits >= 8 {
            out.push((acc >> (bits - 8)) as u8);
            bits -= 8;
        }
    }
    if bits > 0 {
        out.push((acc << (8 - bits)) as u8);
    }
    out
}

/// Reverses [`pack`], reading `count` 6-bit values from the stream. Trailing
/// padding bits are ignored.
pub fn unpack(bytes: &[u8], count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(count);
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for &byte in bytes {
        if out.len() == count {
            break;
        }
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        while bits >= 6 && out.len() < count {
            out.push(((acc >> (bits - 6)) & 0x3f) as u8);
            bits -= 6;
        }
    }
    out
}
