//! Bit-Level Wire Encoding
//!
//! Everything that goes on the wire is packed through this module. The
//! [`BitWriter`] and [`BitReader`] pack values LSB-first into little-endian
//! 32-bit words with a 64-bit scratch accumulator. The [`Stream`] trait is
//! the typed façade that message types serialize through: one `serialize`
//! method per message drives either a [`WriteStream`] or a [`ReadStream`].
//!
//! Streams are poisoning. The first error is recorded and every later call
//! is a no-op, so a message can issue a long run of `serialize_*` calls and
//! check [`Stream::result`] once at the end.
//!
//! The bit helpers here (`bits_required`, 16-bit sequence comparison and
//! zig-zag mapping) are shared by the token, session and matrix codecs.

mod address;
mod bits;
mod stream;

use thiserror::Error;

pub use address::{parse_address, read_address, write_address, AddressType, ADDRESS_BYTES};
pub use bits::{BitReader, BitWriter};
pub use stream::{ReadStream, Stream, WriteStream};

/// Errors raised by the bit packer and the typed streams.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("buffer size must be a multiple of 4 bytes, got {0}")]
    InvalidCapacity(usize),

    #[error("invalid bit count: {0}")]
    InvalidBitCount(u32),

    #[error("value {value} does not fit in {bits} bits")]
    ValueTooLarge { value: u32, bits: u32 },

    #[error("buffer overflow: requested {requested} bits, {available} available")]
    BufferOverflow { requested: usize, available: usize },

    #[error("would read past end of buffer: requested {requested} bits, {remaining} remaining")]
    ReadPastEnd { requested: usize, remaining: usize },

    #[error("stream is not byte aligned ({0} bits to the next boundary)")]
    NotAligned(u32),

    #[error("non-zero alignment padding: 0x{0:02x}")]
    NonZeroPadding(u32),

    #[error("invalid range: min {min} must be less than max {max}")]
    InvalidRange { min: i32, max: i32 },

    #[error("value {value} outside range [{min}, {max}]")]
    OutOfRange { value: i64, min: i32, max: i32 },

    #[error("cannot serialize an empty byte block")]
    EmptyBytes,

    #[error("string too long: max {max}, got {len}")]
    StringTooLong { len: usize, max: usize },

    #[error("string is not valid utf-8")]
    InvalidUtf8,

    #[error("relative integer requires previous < current, got {previous} and {current}")]
    NotIncreasing { previous: i32, current: i32 },

    #[error("ack must not equal sequence {0}")]
    AckEqualsSequence(u16),

    #[error("invalid address type: {0}")]
    InvalidAddressType(u32),

    #[error("length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

// ============================================================================
// Bit Math
// ============================================================================

/// Floor of log2, with `log2(0) == 0`.
pub fn log2(x: u32) -> u32 {
    if x == 0 {
        0
    } else {
        31 - x.leading_zeros()
    }
}

/// Number of bits needed to store any value in `[min, max]`.
pub fn bits_required(min: u32, max: u32) -> u32 {
    if min == max {
        0
    } else {
        log2(max.wrapping_sub(min)) + 1
    }
}

/// Signed variant of [`bits_required`]; the span is taken as unsigned.
pub fn bits_required_signed(min: i32, max: i32) -> u32 {
    bits_required(0, max.wrapping_sub(min) as u32)
}

/// True if `s1` is newer than `s2` in 16-bit sequence space.
///
/// Uses half-range wraparound: `1` is greater than `65535`.
pub fn sequence_greater_than(s1: u16, s2: u16) -> bool {
    (s1 > s2 && s1 - s2 <= 32768) || (s1 < s2 && s2 - s1 > 32768)
}

/// True if `s1` is older than `s2` in 16-bit sequence space.
pub fn sequence_less_than(s1: u16, s2: u16) -> bool {
    sequence_greater_than(s2, s1)
}

/// Zig-zag map a signed value so small magnitudes get small codes.
pub fn signed_to_unsigned(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`signed_to_unsigned`].
pub fn unsigned_to_signed(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

#[cfg(test)]
mod tests;
