//! Near relay list fragment.

use std::net::SocketAddr;

use super::MAX_NEAR_RELAYS;
use crate::encoding::{EncodingError, Stream};

/// A relay close enough to a client to be worth measuring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NearRelay {
    pub id: u64,
    pub address: SocketAddr,
}

/// Bounded list of candidate relays for one client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NearRelays {
    pub relays: Vec<NearRelay>,
}

impl NearRelays {
    pub fn new(relays: Vec<NearRelay>) -> Self {
        Self { relays }
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn serialize<S: Stream>(&mut self, stream: &mut S) {
        let mut count = i32::try_from(self.relays.len()).unwrap_or(i32::MAX);
        stream.serialize_integer(&mut count, 0, MAX_NEAR_RELAYS as i32);
        if stream.error().is_some() {
            return;
        }

        if stream.is_reading() {
            self.relays.clear();
            for _ in 0..count {
                let mut id = 0u64;
                let mut address = None;
                stream.serialize_uint64(&mut id);
                stream.serialize_address(&mut address);
                if stream.error().is_some() {
                    return;
                }
                let Some(address) = address else {
                    stream.fail(EncodingError::InvalidAddressType(0));
                    return;
                };
                self.relays.push(NearRelay { id, address });
            }
        } else {
            for relay in &mut self.relays {
                let mut address = Some(relay.address);
                stream.serialize_uint64(&mut relay.id);
                stream.serialize_address(&mut address);
            }
        }
    }
}
