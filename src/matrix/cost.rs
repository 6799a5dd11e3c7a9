//! Cost matrix codec.

use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::{
    tri_matrix_index, tri_matrix_length, MatrixError, COST_MATRIX_VERSION, MAX_DATACENTERS,
    MAX_NAME_BYTES, MAX_RELAYS, MAX_RELAY_ADDRESS_LENGTH,
};
use crate::crypto::{PublicKey, KEY_BYTES};
use crate::encoding::{ReadStream, Stream, WriteStream};

/// Relay graph snapshot. Produced fresh each optimization cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostMatrix {
    /// Layout version this matrix is written with.
    pub version: u32,
    pub relay_ids: Vec<u64>,
    pub relay_names: Vec<String>,
    /// Parallel to `datacenter_names`.
    pub datacenter_ids: Vec<u64>,
    pub datacenter_names: Vec<String>,
    /// Opaque address bytes per relay, at most [`MAX_RELAY_ADDRESS_LENGTH`].
    pub relay_addresses: Vec<Vec<u8>>,
    pub relay_public_keys: Vec<PublicKey>,
    /// Datacenter id to member relay ids. Ordered so encoding is stable.
    pub datacenter_relays: BTreeMap<u64, Vec<u64>>,
    /// Upper triangle, indexed by [`tri_matrix_index`].
    pub rtt: Vec<i32>,
}

impl Default for CostMatrix {
    fn default() -> Self {
        Self {
            version: COST_MATRIX_VERSION,
            relay_ids: Vec::new(),
            relay_names: Vec::new(),
            datacenter_ids: Vec::new(),
            datacenter_names: Vec::new(),
            relay_addresses: Vec::new(),
            relay_public_keys: Vec::new(),
            datacenter_relays: BTreeMap::new(),
            rtt: Vec::new(),
        }
    }
}

impl CostMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_relays(&self) -> usize {
        self.relay_ids.len()
    }

    /// Position of relay `id` in the parallel relay arrays.
    pub fn relay_index(&self, id: u64) -> Option<usize> {
        self.relay_ids.iter().position(|&relay_id| relay_id == id)
    }

    /// RTT between relays `i` and `j`. Zero on the diagonal.
    pub fn rtt(&self, i: usize, j: usize) -> Option<i32> {
        let n = self.num_relays();
        if i >= n || j >= n {
            return None;
        }
        if i == j {
            return Some(0);
        }
        self.rtt.get(tri_matrix_index(i, j)).copied()
    }

    /// Store the RTT for the unordered pair `(i, j)`.
    pub fn set_rtt(&mut self, i: usize, j: usize, value: i32) -> Result<(), MatrixError> {
        let num_relays = self.num_relays();
        for index in [i, j] {
            if index >= num_relays {
                return Err(MatrixError::RelayIndex { index, num_relays });
            }
        }
        if i == j {
            return Err(MatrixError::SelfPair(i));
        }
        let expected = tri_matrix_length(num_relays);
        if self.rtt.len() != expected {
            return Err(MatrixError::LengthMismatch {
                field: "rtt",
                expected,
                got: self.rtt.len(),
            });
        }
        self.rtt[tri_matrix_index(i, j)] = value;
        Ok(())
    }

    /// Exact encoded size of this matrix at its version.
    pub fn serialized_size(&self) -> usize {
        let n = self.num_relays();
        let mut size = 4 + 4 + 8 * n;
        if self.version >= 1 {
            size += self.relay_names.iter().map(|name| 4 + name.len()).sum::<usize>();
        }
        if self.version >= 2 {
            size += 4;
            size += self
                .datacenter_names
                .iter()
                .map(|name| 8 + 4 + name.len())
                .sum::<usize>();
        }
        size += n * (MAX_RELAY_ADDRESS_LENGTH + KEY_BYTES);
        size += 4;
        size += self
            .datacenter_relays
            .values()
            .map(|members| 8 + 4 + 8 * members.len())
            .sum::<usize>();
        size + 4 * self.rtt.len()
    }

    fn validate(&self) -> Result<(), MatrixError> {
        if self.version > COST_MATRIX_VERSION {
            return Err(MatrixError::UnsupportedVersion {
                version: self.version,
                max: COST_MATRIX_VERSION,
            });
        }
        let n = self.num_relays();
        check_bound("relay_ids", n, MAX_RELAYS)?;
        if self.version >= 1 {
            check_len("relay_names", n, self.relay_names.len())?;
            for name in &self.relay_names {
                check_name(name)?;
            }
        }
        if self.version >= 2 {
            let count = self.datacenter_ids.len();
            check_bound("datacenter_ids", count, MAX_DATACENTERS)?;
            check_len("datacenter_names", count, self.datacenter_names.len())?;
            for name in &self.datacenter_names {
                check_name(name)?;
            }
        }
        check_len("relay_addresses", n, self.relay_addresses.len())?;
        for (index, address) in self.relay_addresses.iter().enumerate() {
            if address.len() > MAX_RELAY_ADDRESS_LENGTH {
                return Err(MatrixError::AddressTooLong {
                    index,
                    len: address.len(),
                    max: MAX_RELAY_ADDRESS_LENGTH,
                });
            }
            // Slots are zero padded, so a trailing zero would not survive a read.
            if address.last() == Some(&0) {
                return Err(MatrixError::AddressTrailingZero { index });
            }
        }
        check_len("relay_public_keys", n, self.relay_public_keys.len())?;
        check_bound(
            "datacenter_relays",
            self.datacenter_relays.len(),
            MAX_DATACENTERS,
        )?;
        for members in self.datacenter_relays.values() {
            check_bound("datacenter_relays members", members.len(), MAX_RELAYS)?;
        }
        check_len("rtt", tri_matrix_length(n), self.rtt.len())
    }

    /// Encode this matrix at `self.version`.
    ///
    /// Fields newer than the version are left out.
    pub fn write(&self) -> Result<Vec<u8>, MatrixError> {
        self.validate()?;

        let mut stream = WriteStream::with_capacity(self.serialized_size());
        put_u32(&mut stream, self.version);
        put_u32(&mut stream, self.num_relays() as u32);
        for &id in &self.relay_ids {
            put_u64(&mut stream, id);
        }

        if self.version >= 1 {
            for name in &self.relay_names {
                put_name(&mut stream, name);
            }
        }

        if self.version >= 2 {
            put_u32(&mut stream, self.datacenter_ids.len() as u32);
            for (&id, name) in self.datacenter_ids.iter().zip(&self.datacenter_names) {
                put_u64(&mut stream, id);
                put_name(&mut stream, name);
            }
        }

        for address in &self.relay_addresses {
            let mut slot = [0u8; MAX_RELAY_ADDRESS_LENGTH];
            slot[..address.len()].copy_from_slice(address);
            stream.serialize_bytes(&mut slot);
        }

        for public_key in &self.relay_public_keys {
            let mut key = *public_key;
            stream.serialize_bytes(&mut key);
        }

        put_u32(&mut stream, self.datacenter_relays.len() as u32);
        for (&datacenter_id, members) in &self.datacenter_relays {
            put_u64(&mut stream, datacenter_id);
            put_u32(&mut stream, members.len() as u32);
            for &relay_id in members {
                put_u64(&mut stream, relay_id);
            }
        }

        for &rtt in &self.rtt {
            put_u32(&mut stream, rtt as u32);
        }

        let data = stream.finish()?;
        trace!(
            version = self.version,
            num_relays = self.num_relays(),
            num_datacenters = self.datacenter_ids.len(),
            bytes = data.len(),
            "Wrote cost matrix"
        );
        Ok(data)
    }

    /// Decode a matrix of any version up to [`COST_MATRIX_VERSION`].
    ///
    /// Sections absent from older versions come back empty: relay names as
    /// empty strings, datacenter ids and names as empty lists.
    pub fn read(data: &[u8]) -> Result<Self, MatrixError> {
        let mut stream = ReadStream::new(data);

        let version = get_u32(&mut stream)?;
        if version > COST_MATRIX_VERSION {
            debug!(
                version,
                max = COST_MATRIX_VERSION,
                "Rejecting cost matrix with unknown version"
            );
            return Err(MatrixError::UnsupportedVersion {
                version,
                max: COST_MATRIX_VERSION,
            });
        }

        let num_relays = get_count(&mut stream, "relay_ids", MAX_RELAYS)?;
        let relay_ids = (0..num_relays)
            .map(|_| get_u64(&mut stream))
            .collect::<Result<Vec<_>, _>>()?;

        let relay_names = if version >= 1 {
            (0..num_relays)
                .map(|_| get_name(&mut stream))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![String::new(); num_relays]
        };

        let mut datacenter_ids = Vec::new();
        let mut datacenter_names = Vec::new();
        if version >= 2 {
            let count = get_count(&mut stream, "datacenter_ids", MAX_DATACENTERS)?;
            for _ in 0..count {
                datacenter_ids.push(get_u64(&mut stream)?);
                datacenter_names.push(get_name(&mut stream)?);
            }
        }

        let mut relay_addresses = Vec::with_capacity(num_relays);
        for _ in 0..num_relays {
            let mut slot = [0u8; MAX_RELAY_ADDRESS_LENGTH];
            stream.serialize_bytes(&mut slot);
            stream.result()?;
            let len = slot.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
            relay_addresses.push(slot[..len].to_vec());
        }

        let mut relay_public_keys = Vec::with_capacity(num_relays);
        for _ in 0..num_relays {
            let mut key = [0u8; KEY_BYTES];
            stream.serialize_bytes(&mut key);
            stream.result()?;
            relay_public_keys.push(key);
        }

        let num_memberships = get_count(&mut stream, "datacenter_relays", MAX_DATACENTERS)?;
        let mut datacenter_relays = BTreeMap::new();
        for _ in 0..num_memberships {
            let datacenter_id = get_u64(&mut stream)?;
            let count = get_count(&mut stream, "datacenter_relays members", MAX_RELAYS)?;
            let members = (0..count)
                .map(|_| get_u64(&mut stream))
                .collect::<Result<Vec<_>, _>>()?;
            if datacenter_relays.insert(datacenter_id, members).is_some() {
                debug!(
                    datacenter_id = %format_args!("{:016x}", datacenter_id),
                    "Rejecting cost matrix with repeated datacenter"
                );
                return Err(MatrixError::DuplicateDatacenter(datacenter_id));
            }
        }

        let rtt = (0..tri_matrix_length(num_relays))
            .map(|_| get_u32(&mut stream).map(|value| value as i32))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version,
            relay_ids,
            relay_names,
            datacenter_ids,
            datacenter_names,
            relay_addresses,
            relay_public_keys,
            datacenter_relays,
            rtt,
        })
    }
}

fn check_len(field: &'static str, expected: usize, got: usize) -> Result<(), MatrixError> {
    if expected != got {
        return Err(MatrixError::LengthMismatch {
            field,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_bound(field: &'static str, count: usize, max: usize) -> Result<(), MatrixError> {
    if count > max {
        return Err(MatrixError::TooMany { field, count, max });
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), MatrixError> {
    if name.len() > MAX_NAME_BYTES {
        return Err(MatrixError::NameTooLong {
            len: name.len(),
            max: MAX_NAME_BYTES,
        });
    }
    Ok(())
}

// ============================================================================
// Field helpers
// ============================================================================

fn put_u32(stream: &mut WriteStream, mut value: u32) {
    stream.serialize_uint32(&mut value);
}

fn put_u64(stream: &mut WriteStream, mut value: u64) {
    stream.serialize_uint64(&mut value);
}

fn put_name(stream: &mut WriteStream, name: &str) {
    put_u32(stream, name.len() as u32);
    if !name.is_empty() {
        let mut bytes = name.as_bytes().to_vec();
        stream.serialize_bytes(&mut bytes);
    }
}

fn get_u32(stream: &mut ReadStream) -> Result<u32, MatrixError> {
    let mut value = 0;
    stream.serialize_uint32(&mut value);
    stream.result()?;
    Ok(value)
}

fn get_u64(stream: &mut ReadStream) -> Result<u64, MatrixError> {
    let mut value = 0;
    stream.serialize_uint64(&mut value);
    stream.result()?;
    Ok(value)
}

fn get_count(
    stream: &mut ReadStream,
    field: &'static str,
    max: usize,
) -> Result<usize, MatrixError> {
    let count = get_u32(stream)? as usize;
    check_bound(field, count, max)?;
    Ok(count)
}

fn get_name(stream: &mut ReadStream) -> Result<String, MatrixError> {
    let len = get_u32(stream)? as usize;
    if len > MAX_NAME_BYTES {
        return Err(MatrixError::NameTooLong {
            len,
            max: MAX_NAME_BYTES,
        });
    }
    if len == 0 {
        return Ok(String::new());
    }
    let mut bytes = vec![0u8; len];
    stream.serialize_bytes(&mut bytes);
    stream.result()?;
    String::from_utf8(bytes).map_err(|_| MatrixError::InvalidName)
}
