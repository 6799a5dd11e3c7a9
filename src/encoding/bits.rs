//! Word-oriented bit packer.
//!
//! Bits are packed LSB-first into 32-bit words, and words are stored
//! little-endian. Byte-aligned runs of 8, 16, 32 or 64 bits therefore land
//! on the wire exactly as their little-endian byte encoding.

use super::EncodingError;

/// Writes bit-packed values into a fixed-capacity word buffer.
pub struct BitWriter {
    words: Vec<u32>,
    scratch: u64,
    scratch_bits: u32,
    word_index: usize,
    bits_written: usize,
    num_bits: usize,
}

impl BitWriter {
    /// Create a writer with room for `bytes` bytes.
    ///
    /// The capacity must be a whole number of 32-bit words.
    pub fn new(bytes: usize) -> Result<Self, EncodingError> {
        if bytes % 4 != 0 {
            return Err(EncodingError::InvalidCapacity(bytes));
        }
        Ok(Self::with_capacity(bytes))
    }

    /// Create a writer with room for at least `bytes` bytes, rounded up to
    /// a whole word.
    pub fn with_capacity(bytes: usize) -> Self {
        let num_words = bytes.div_ceil(4);
        Self {
            words: vec![0; num_words],
            scratch: 0,
            scratch_bits: 0,
            word_index: 0,
            bits_written: 0,
            num_bits: num_words * 32,
        }
    }

    /// Write the low `bits` bits of `value` (1..=32).
    pub fn write_bits(&mut self, value: u32, bits: u32) -> Result<(), EncodingError> {
        if bits == 0 || bits > 32 {
            return Err(EncodingError::InvalidBitCount(bits));
        }
        if self.bits_written + bits as usize > self.num_bits {
            return Err(EncodingError::BufferOverflow {
                requested: bits as usize,
                available: self.bits_available(),
            });
        }
        if u64::from(value) > (1u64 << bits) - 1 {
            return Err(EncodingError::ValueTooLarge { value, bits });
        }

        self.scratch |= u64::from(value) << self.scratch_bits;
        self.scratch_bits += bits;

        // The capacity check above guarantees a full scratch word has a slot.
        if self.scratch_bits >= 32 {
            self.words[self.word_index] = self.scratch as u32;
            self.scratch >>= 32;
            self.scratch_bits -= 32;
            self.word_index += 1;
        }

        self.bits_written += bits as usize;
        Ok(())
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn write_align(&mut self) -> Result<(), EncodingError> {
        let pad = self.align_bits();
        if pad != 0 {
            self.write_bits(0, pad)?;
        }
        Ok(())
    }

    /// Write a byte block. The writer must already be byte aligned.
    ///
    /// Head bytes go through the scratch word until the cursor is word
    /// aligned, the middle is copied a word at a time, and the tail goes
    /// back through the scratch word.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), EncodingError> {
        let pad = self.align_bits();
        if pad != 0 {
            return Err(EncodingError::NotAligned(pad));
        }
        if self.bits_written + data.len() * 8 > self.num_bits {
            return Err(EncodingError::BufferOverflow {
                requested: data.len() * 8,
                available: self.bits_available(),
            });
        }

        let head_bytes = ((4 - (self.bits_written % 32) / 8) % 4).min(data.len());
        for &byte in &data[..head_bytes] {
            self.write_bits(u32::from(byte), 8)?;
        }
        if head_bytes == data.len() {
            return Ok(());
        }
        debug_assert_eq!(self.scratch_bits, 0);

        let body = &data[head_bytes..];
        let num_words = body.len() / 4;
        for (slot, chunk) in self.words[self.word_index..self.word_index + num_words]
            .iter_mut()
            .zip(body.chunks_exact(4))
        {
            *slot = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        self.word_index += num_words;
        self.bits_written += num_words * 32;
        self.scratch = 0;

        for &byte in &body[num_words * 4..] {
            self.write_bits(u32::from(byte), 8)?;
        }
        Ok(())
    }

    /// Push any partially filled scratch word into the buffer.
    ///
    /// Call once after the last write; the writer is finished afterwards.
    pub fn flush_bits(&mut self) -> Result<(), EncodingError> {
        if self.scratch_bits != 0 {
            let Some(slot) = self.words.get_mut(self.word_index) else {
                return Err(EncodingError::BufferOverflow {
                    requested: self.scratch_bits as usize,
                    available: 0,
                });
            };
            *slot = self.scratch as u32;
            self.scratch >>= 32;
            self.scratch_bits = 0;
            self.word_index += 1;
        }
        Ok(())
    }

    /// Whole buffer as little-endian bytes, including unwritten capacity.
    pub fn data(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Bytes written so far, truncated to [`Self::bytes_written`].
    ///
    /// Only meaningful after [`Self::flush_bits`].
    pub fn written_data(&self) -> Vec<u8> {
        let mut data = self.data();
        data.truncate(self.bytes_written());
        data
    }

    pub fn bits_written(&self) -> usize {
        self.bits_written
    }

    pub fn bytes_written(&self) -> usize {
        self.bits_written.div_ceil(8)
    }

    pub fn bits_available(&self) -> usize {
        self.num_bits - self.bits_written
    }

    /// Zero bits needed to reach the next byte boundary.
    pub fn align_bits(&self) -> u32 {
        ((8 - self.bits_written % 8) % 8) as u32
    }
}

/// Reads bit-packed values back out of a byte buffer.
///
/// The buffer does not need to be a whole number of words; the final word
/// is zero padded and reads are bounded by the real byte length.
pub struct BitReader {
    words: Vec<u32>,
    scratch: u64,
    scratch_bits: u32,
    word_index: usize,
    bits_read: usize,
    num_bits: usize,
}

impl BitReader {
    pub fn new(data: &[u8]) -> Self {
        let words = data
            .chunks(4)
            .map(|chunk| {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                u32::from_le_bytes(word)
            })
            .collect();
        Self {
            words,
            scratch: 0,
            scratch_bits: 0,
            word_index: 0,
            bits_read: 0,
            num_bits: data.len() * 8,
        }
    }

    /// True if reading `bits` more bits would run off the end.
    pub fn would_read_past_end(&self, bits: usize) -> bool {
        self.bits_read + bits > self.num_bits
    }

    /// Read `bits` bits (0..=32).
    pub fn read_bits(&mut self, bits: u32) -> Result<u32, EncodingError> {
        if bits > 32 {
            return Err(EncodingError::InvalidBitCount(bits));
        }
        if self.would_read_past_end(bits as usize) {
            return Err(EncodingError::ReadPastEnd {
                requested: bits as usize,
                remaining: self.bits_remaining(),
            });
        }

        self.bits_read += bits as usize;

        if self.scratch_bits < bits {
            self.scratch |= u64::from(self.words[self.word_index]) << self.scratch_bits;
            self.scratch_bits += 32;
            self.word_index += 1;
        }

        let output = self.scratch & ((1u64 << bits) - 1);
        self.scratch >>= bits;
        self.scratch_bits -= bits;

        Ok(output as u32)
    }

    /// Consume padding up to the next byte boundary; padding must be zero.
    pub fn read_align(&mut self) -> Result<(), EncodingError> {
        let pad = self.align_bits();
        if pad != 0 {
            let value = self.read_bits(pad)?;
            if value != 0 {
                return Err(EncodingError::NonZeroPadding(value));
            }
        }
        Ok(())
    }

    /// Fill `out` from the stream. The reader must already be byte aligned.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), EncodingError> {
        let pad = self.align_bits();
        if pad != 0 {
            return Err(EncodingError::NotAligned(pad));
        }
        if self.would_read_past_end(out.len() * 8) {
            return Err(EncodingError::ReadPastEnd {
                requested: out.len() * 8,
                remaining: self.bits_remaining(),
            });
        }

        let head_bytes = ((4 - (self.bits_read % 32) / 8) % 4).min(out.len());
        for byte in &mut out[..head_bytes] {
            *byte = self.read_bits(8)? as u8;
        }
        if head_bytes == out.len() {
            return Ok(());
        }
        debug_assert_eq!(self.scratch_bits, 0);

        let body = &mut out[head_bytes..];
        let num_words = body.len() / 4;
        for (chunk, word) in body
            .chunks_exact_mut(4)
            .zip(&self.words[self.word_index..self.word_index + num_words])
        {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        self.word_index += num_words;
        self.bits_read += num_words * 32;
        self.scratch = 0;
        self.scratch_bits = 0;

        for byte in &mut body[num_words * 4..] {
            *byte = self.read_bits(8)? as u8;
        }
        Ok(())
    }

    pub fn bits_read(&self) -> usize {
        self.bits_read
    }

    pub fn bytes_read(&self) -> usize {
        self.bits_read.div_ceil(8)
    }

    pub fn bits_remaining(&self) -> usize {
        self.num_bits - self.bits_read
    }

    /// Bits left before the next byte boundary.
    pub fn align_bits(&self) -> u32 {
        ((8 - self.bits_read % 8) % 8) as u32
    }
}
