//! Continue token codec.

use super::{TokenError, CONTINUE_TOKEN_BYTES};
use crate::encoding::{ReadStream, Stream, WriteStream};

/// Per-hop instruction that extends the lifetime of an existing path.
///
/// Carries no addresses or bandwidth, so it can never change topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContinueToken {
    pub expire_timestamp: u64,
    pub session_id: u64,
    pub session_version: u8,
    pub session_flags: u8,
}

impl ContinueToken {
    pub fn serialize<S: Stream>(&mut self, stream: &mut S) {
        stream.serialize_uint64(&mut self.expire_timestamp);
        stream.serialize_uint64(&mut self.session_id);
        let mut version = u32::from(self.session_version);
        let mut flags = u32::from(self.session_flags);
        stream.serialize_bits(&mut version, 8);
        stream.serialize_bits(&mut flags, 8);
        if stream.read_ok() {
            self.session_version = version as u8;
            self.session_flags = flags as u8;
        }
    }

    pub fn write(&self) -> Result<[u8; CONTINUE_TOKEN_BYTES], TokenError> {
        let mut stream = WriteStream::with_capacity(CONTINUE_TOKEN_BYTES);
        let mut token = *self;
        token.serialize(&mut stream);
        let bytes = stream.finish()?;
        let mut out = [0u8; CONTINUE_TOKEN_BYTES];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    pub fn read(data: &[u8]) -> Result<Self, TokenError> {
        if data.len() < CONTINUE_TOKEN_BYTES {
            return Err(TokenError::MessageTooShort {
                expected: CONTINUE_TOKEN_BYTES,
                got: data.len(),
            });
        }
        let mut stream = ReadStream::new(&data[..CONTINUE_TOKEN_BYTES]);
        let mut token = Self::default();
        token.serialize(&mut stream);
        stream.result()?;
        Ok(token)
    }
}
