//! Route token codec.

use std::net::SocketAddr;

use super::{TokenError, ROUTE_TOKEN_BYTES};
use crate::crypto::{PrivateKey, KEY_BYTES};
use crate::encoding::{read_address, write_address, ReadStream, Stream, WriteStream};

/// Per-hop instruction that establishes a new path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteToken {
    pub expire_timestamp: u64,
    pub session_id: u64,
    pub session_version: u8,
    pub session_flags: u8,
    pub kbps_up: u32,
    pub kbps_down: u32,
    /// Where this hop forwards to. `None` on the server hop.
    pub next_address: Option<SocketAddr>,
    /// Session secret shared by every hop of one chain generation.
    pub private_key: PrivateKey,
}

impl Default for RouteToken {
    fn default() -> Self {
        Self {
            expire_timestamp: 0,
            session_id: 0,
            session_version: 0,
            session_flags: 0,
            kbps_up: 0,
            kbps_down: 0,
            next_address: None,
            private_key: [0u8; KEY_BYTES],
        }
    }
}

impl RouteToken {
    pub fn serialize<S: Stream>(&mut self, stream: &mut S) {
        stream.serialize_uint64(&mut self.expire_timestamp);
        stream.serialize_uint64(&mut self.session_id);
        let mut version = u32::from(self.session_version);
        let mut flags = u32::from(self.session_flags);
        stream.serialize_bits(&mut version, 8);
        stream.serialize_bits(&mut flags, 8);
        stream.serialize_uint32(&mut self.kbps_up);
        stream.serialize_uint32(&mut self.kbps_down);
        let mut address = write_address(self.next_address.as_ref());
        stream.serialize_bytes(&mut address);
        stream.serialize_bytes(&mut self.private_key);

        if stream.read_ok() {
            self.session_version = version as u8;
            self.session_flags = flags as u8;
            match read_address(&address) {
                Ok(next_address) => self.next_address = next_address,
                Err(e) => stream.fail(e),
            }
        }
    }

    /// Encode into the fixed plain layout.
    pub fn write(&self) -> Result<[u8; ROUTE_TOKEN_BYTES], TokenError> {
        let mut stream = WriteStream::with_capacity(ROUTE_TOKEN_BYTES);
        self.clone().serialize(&mut stream);
        let bytes = stream.finish()?;
        let mut out = [0u8; ROUTE_TOKEN_BYTES];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    /// Decode from the fixed plain layout.
    pub fn read(data: &[u8]) -> Result<Self, TokenError> {
        if data.len() < ROUTE_TOKEN_BYTES {
            return Err(TokenError::MessageTooShort {
                expected: ROUTE_TOKEN_BYTES,
                got: data.len(),
            });
        }
        let mut stream = ReadStream::new(&data[..ROUTE_TOKEN_BYTES]);
        let mut token = Self::default();
        token.serialize(&mut stream);
        stream.result()?;
        Ok(token)
    }
}
