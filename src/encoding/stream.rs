//! Typed serialization streams.
//!
//! A message implements one `serialize<S: Stream>(&mut self, stream: &mut S)`
//! method; the same body encodes through a [`WriteStream`] and decodes
//! through a [`ReadStream`]. Composite encodings (floats, 64-bit values,
//! relative integers, addresses) are provided methods on [`Stream`] built
//! from the primitive ones, so both directions share one definition.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};

use super::bits::{BitReader, BitWriter};
use super::{bits_required_signed, EncodingError};

/// Tier bounds for `serialize_int_relative`, after the one-bit delta==1 case.
const INT_RELATIVE_TIERS: [(i32, i32); 5] =
    [(2, 6), (7, 23), (24, 280), (281, 4377), (4378, 69914)];

/// Symmetric encode/decode interface over a bit buffer.
///
/// All operations are no-ops once the stream holds an error.
pub trait Stream {
    fn is_writing(&self) -> bool;

    fn is_reading(&self) -> bool {
        !self.is_writing()
    }

    /// The first error recorded on this stream, if any.
    fn error(&self) -> Option<&EncodingError>;

    /// Record `error` unless an earlier error is already held.
    fn fail(&mut self, error: EncodingError);

    /// `Ok` while the stream is healthy, otherwise the sticky first error.
    fn result(&self) -> Result<(), EncodingError> {
        match self.error() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// True when a read has completed and its value may be stored.
    fn read_ok(&self) -> bool {
        self.is_reading() && self.error().is_none()
    }

    /// Range-bounded integer, encoded as `value - min` in the minimum bits.
    fn serialize_integer(&mut self, value: &mut i32, min: i32, max: i32);

    /// Raw bit field of 1..=32 bits (0 is accepted when reading).
    fn serialize_bits(&mut self, value: &mut u32, bits: u32);

    /// Byte block; the stream aligns to a byte boundary first.
    fn serialize_bytes(&mut self, data: &mut [u8]);

    /// Pad (write) or consume zero padding (read) to a byte boundary.
    fn serialize_align(&mut self);

    /// Flush pending scratch bits. No-op on read streams.
    fn flush(&mut self);

    fn align_bits(&self) -> u32;

    fn bits_processed(&self) -> usize;

    fn bytes_processed(&self) -> usize {
        self.bits_processed().div_ceil(8)
    }

    fn serialize_uint32(&mut self, value: &mut u32) {
        self.serialize_bits(value, 32);
    }

    fn serialize_bool(&mut self, value: &mut bool) {
        let mut bit = u32::from(*value);
        self.serialize_bits(&mut bit, 1);
        if self.read_ok() {
            *value = bit != 0;
        }
    }

    /// Low word first, then high word.
    fn serialize_uint64(&mut self, value: &mut u64) {
        let mut lo = *value as u32;
        let mut hi = (*value >> 32) as u32;
        self.serialize_bits(&mut lo, 32);
        self.serialize_bits(&mut hi, 32);
        if self.read_ok() {
            *value = (u64::from(hi) << 32) | u64::from(lo);
        }
    }

    fn serialize_float32(&mut self, value: &mut f32) {
        let mut bits = value.to_bits();
        self.serialize_bits(&mut bits, 32);
        if self.read_ok() {
            *value = f32::from_bits(bits);
        }
    }

    fn serialize_float64(&mut self, value: &mut f64) {
        let mut bits = value.to_bits();
        self.serialize_uint64(&mut bits);
        if self.read_ok() {
            *value = f64::from_bits(bits);
        }
    }

    /// Length-prefixed string of at most `max_size - 1` bytes.
    fn serialize_string(&mut self, value: &mut String, max_size: usize) {
        if self.error().is_some() {
            return;
        }
        let max = i32::try_from(max_size).unwrap_or(i32::MAX) - 1;
        let mut length = 0i32;
        if self.is_writing() {
            if value.len() > max.max(0) as usize {
                self.fail(EncodingError::StringTooLong {
                    len: value.len(),
                    max: max.max(0) as usize,
                });
                return;
            }
            length = value.len() as i32;
        }
        self.serialize_integer(&mut length, 0, max);
        if self.error().is_some() {
            return;
        }
        if length == 0 {
            if self.is_reading() {
                value.clear();
            }
            return;
        }
        if self.is_writing() {
            let mut bytes = value.as_bytes().to_vec();
            self.serialize_bytes(&mut bytes);
        } else {
            let mut bytes = vec![0u8; length as usize];
            self.serialize_bytes(&mut bytes);
            if self.error().is_none() {
                match String::from_utf8(bytes) {
                    Ok(s) => *value = s,
                    Err(_) => self.fail(EncodingError::InvalidUtf8),
                }
            }
        }
    }

    /// Delta code for a strictly increasing `current` after `previous`.
    ///
    /// A delta of one costs a single bit. Larger deltas pick the smallest
    /// tier that fits, each tier adding one flag bit; anything past the
    /// last tier falls back to the raw 32-bit value.
    fn serialize_int_relative(&mut self, previous: i32, current: &mut i32) {
        if self.error().is_some() {
            return;
        }
        let writing = self.is_writing();
        let mut gap = 0i64;
        if writing {
            if previous >= *current {
                self.fail(EncodingError::NotIncreasing {
                    previous,
                    current: *current,
                });
                return;
            }
            gap = i64::from(*current) - i64::from(previous);
        }

        let mut plus_one = writing && gap == 1;
        self.serialize_bool(&mut plus_one);
        if plus_one {
            if self.read_ok() {
                *current = previous.wrapping_add(1);
            }
            return;
        }

        for (min, max) in INT_RELATIVE_TIERS {
            let mut in_tier = writing && gap <= i64::from(max);
            self.serialize_bool(&mut in_tier);
            if self.error().is_some() {
                return;
            }
            if in_tier {
                let mut difference = gap as i32;
                self.serialize_integer(&mut difference, min, max);
                if self.read_ok() {
                    *current = previous.wrapping_add(difference);
                }
                return;
            }
        }

        let mut raw = *current as u32;
        self.serialize_uint32(&mut raw);
        if self.read_ok() {
            let decoded = raw as i32;
            if decoded <= previous {
                self.fail(EncodingError::NotIncreasing {
                    previous,
                    current: decoded,
                });
                return;
            }
            *current = decoded;
        }
    }

    /// Ack encoded relative to a sequence number, wrapping at 65536.
    fn serialize_ack_relative(&mut self, sequence: u16, ack: &mut u16) {
        if self.error().is_some() {
            return;
        }
        let mut delta = 0i32;
        let mut in_range = false;
        if self.is_writing() {
            delta = i32::from(sequence.wrapping_sub(*ack));
            if delta == 0 {
                self.fail(EncodingError::AckEqualsSequence(sequence));
                return;
            }
            in_range = delta <= 64;
        }

        self.serialize_bool(&mut in_range);
        if in_range {
            self.serialize_integer(&mut delta, 1, 64);
            if self.read_ok() {
                *ack = sequence.wrapping_sub(delta as u16);
            }
        } else {
            let mut raw = u32::from(*ack);
            self.serialize_bits(&mut raw, 16);
            if self.read_ok() {
                *ack = raw as u16;
            }
        }
    }

    /// `sequence2` encoded as a forward delta from `sequence1`, wrapping at 65536.
    fn serialize_sequence_relative(&mut self, sequence1: u16, sequence2: &mut u16) {
        if self.error().is_some() {
            return;
        }
        let previous = i32::from(sequence1);
        let mut current = i32::from(*sequence2);
        if self.is_writing() && sequence1 > *sequence2 {
            current += 65536;
        }
        self.serialize_int_relative(previous, &mut current);
        if self.read_ok() {
            *sequence2 = current.rem_euclid(65536) as u16;
        }
    }

    /// Optional UDP address behind a 2-bit type tag.
    ///
    /// IPv4 carries its four octets as a byte block, IPv6 carries eight
    /// 16-bit groups; both are followed by a 16-bit port.
    fn serialize_address(&mut self, address: &mut Option<SocketAddr>) {
        if self.error().is_some() {
            return;
        }
        let mut tag: u32 = match address {
            None => 0,
            Some(SocketAddr::V4(_)) => 1,
            Some(SocketAddr::V6(_)) => 2,
        };
        self.serialize_bits(&mut tag, 2);
        if self.error().is_some() {
            return;
        }

        match tag {
            0 => {
                if self.is_reading() {
                    *address = None;
                }
            }
            1 => {
                let (mut octets, mut port) = match *address {
                    Some(SocketAddr::V4(a)) if self.is_writing() => {
                        (a.ip().octets(), u32::from(a.port()))
                    }
                    _ => ([0u8; 4], 0),
                };
                self.serialize_bytes(&mut octets);
                self.serialize_bits(&mut port, 16);
                if self.read_ok() {
                    *address = Some(SocketAddr::new(
                        IpAddr::V4(Ipv4Addr::from(octets)),
                        port as u16,
                    ));
                }
            }
            2 => {
                let (mut segments, mut port) = match *address {
                    Some(SocketAddr::V6(a)) if self.is_writing() => {
                        (a.ip().segments(), u32::from(a.port()))
                    }
                    _ => ([0u16; 8], 0),
                };
                for segment in &mut segments {
                    let mut group = u32::from(*segment);
                    self.serialize_bits(&mut group, 16);
                    *segment = group as u16;
                }
                self.serialize_bits(&mut port, 16);
                if self.read_ok() {
                    let ip = Ipv6Addr::from(segments);
                    *address = Some(SocketAddr::V6(SocketAddrV6::new(ip, port as u16, 0, 0)));
                }
            }
            other => self.fail(EncodingError::InvalidAddressType(other)),
        }
    }
}

// ============================================================================
// WriteStream
// ============================================================================

/// Encoding side of [`Stream`].
pub struct WriteStream {
    writer: BitWriter,
    error: Option<EncodingError>,
}

impl WriteStream {
    /// Create a stream with room for `bytes` bytes (a multiple of 4).
    pub fn new(bytes: usize) -> Result<Self, EncodingError> {
        Ok(Self {
            writer: BitWriter::new(bytes)?,
            error: None,
        })
    }

    /// Create a stream large enough for `bytes` bytes, rounded up to a word.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            writer: BitWriter::with_capacity(bytes),
            error: None,
        }
    }

    /// Flush and return exactly the bytes written, or the first error.
    pub fn finish(mut self) -> Result<Vec<u8>, EncodingError> {
        self.flush();
        self.result()?;
        Ok(self.writer.written_data())
    }
}

impl Stream for WriteStream {
    fn is_writing(&self) -> bool {
        true
    }

    fn error(&self) -> Option<&EncodingError> {
        self.error.as_ref()
    }

    fn fail(&mut self, error: EncodingError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn serialize_integer(&mut self, value: &mut i32, min: i32, max: i32) {
        if self.error.is_some() {
            return;
        }
        if min >= max {
            self.fail(EncodingError::InvalidRange { min, max });
            return;
        }
        if *value < min || *value > max {
            self.fail(EncodingError::OutOfRange {
                value: i64::from(*value),
                min,
                max,
            });
            return;
        }
        let bits = bits_required_signed(min, max);
        let unsigned = value.wrapping_sub(min) as u32;
        if let Err(e) = self.writer.write_bits(unsigned, bits) {
            self.fail(e);
        }
    }

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_bits(*value, bits) {
            self.fail(e);
        }
    }

    fn serialize_bytes(&mut self, data: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        if data.is_empty() {
            self.fail(EncodingError::EmptyBytes);
            return;
        }
        self.serialize_align();
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_bytes(data) {
            self.fail(e);
        }
    }

    fn serialize_align(&mut self) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_align() {
            self.fail(e);
        }
    }

    fn flush(&mut self) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.writer.flush_bits() {
            self.fail(e);
        }
    }

    fn align_bits(&self) -> u32 {
        self.writer.align_bits()
    }

    fn bits_processed(&self) -> usize {
        self.writer.bits_written()
    }
}

// ============================================================================
// ReadStream
// ============================================================================

/// Decoding side of [`Stream`].
pub struct ReadStream {
    reader: BitReader,
    error: Option<EncodingError>,
}

impl ReadStream {
    pub fn new(data: &[u8]) -> Self {
        Self {
            reader: BitReader::new(data),
            error: None,
        }
    }

    pub fn bits_remaining(&self) -> usize {
        self.reader.bits_remaining()
    }
}

impl Stream for ReadStream {
    fn is_writing(&self) -> bool {
        false
    }

    fn error(&self) -> Option<&EncodingError> {
        self.error.as_ref()
    }

    fn fail(&mut self, error: EncodingError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn serialize_integer(&mut self, value: &mut i32, min: i32, max: i32) {
        if self.error.is_some() {
            return;
        }
        if min >= max {
            self.fail(EncodingError::InvalidRange { min, max });
            return;
        }
        let bits = bits_required_signed(min, max);
        let unsigned = match self.reader.read_bits(bits) {
            Ok(v) => v,
            Err(e) => {
                self.fail(e);
                return;
            }
        };
        let candidate = i64::from(min) + i64::from(unsigned);
        if candidate > i64::from(max) {
            self.fail(EncodingError::OutOfRange {
                value: candidate,
                min,
                max,
            });
            return;
        }
        *value = candidate as i32;
    }

    fn serialize_bits(&mut self, value: &mut u32, bits: u32) {
        if self.error.is_some() {
            return;
        }
        match self.reader.read_bits(bits) {
            Ok(v) => *value = v,
            Err(e) => self.fail(e),
        }
    }

    fn serialize_bytes(&mut self, data: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        if data.is_empty() {
            self.fail(EncodingError::EmptyBytes);
            return;
        }
        self.serialize_align();
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.reader.read_bytes(data) {
            self.fail(e);
        }
    }

    fn serialize_align(&mut self) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.reader.read_align() {
            self.fail(e);
        }
    }

    fn flush(&mut self) {}

    fn align_bits(&self) -> u32 {
        self.reader.align_bits()
    }

    fn bits_processed(&self) -> usize {
        self.reader.bits_read()
    }
}
