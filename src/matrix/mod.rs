//! Relay Cost Matrix
//!
//! A snapshot of the relay graph: who the relays are, where they live,
//! which datacenter each belongs to, and the measured RTT between every
//! pair. Pairwise values are stored once per unordered pair in a flat
//! triangular array; a relay's distance to itself is implicitly zero.
//!
//! ## Layout
//!
//! All integers are little-endian and every field is byte aligned.
//!
//! ```text
//!   version                 u32
//!   num_relays              u32
//!   relay_ids               num_relays * u64
//!   relay_names             num_relays * (u32 len, bytes)      version >= 1
//!   num_datacenters         u32                                version >= 2
//!   datacenters             num_datacenters * (u64 id, u32 len, bytes)
//!   relay_addresses         num_relays * 256 bytes, zero padded
//!   relay_public_keys       num_relays * 32 bytes
//!   num_memberships         u32
//!   memberships             (u64 datacenter id, u32 count, count * u64 relay id)
//!   rtt                     tri_matrix_length(num_relays) * u32
//! ```

mod cost;

use thiserror::Error;

use crate::encoding::EncodingError;

pub use cost::CostMatrix;

/// Newest layout this crate writes and the newest it will read.
pub const COST_MATRIX_VERSION: u32 = 2;

/// Fixed width of one relay address slot.
pub const MAX_RELAY_ADDRESS_LENGTH: usize = 256;

/// Decode bound on relay count.
pub const MAX_RELAYS: usize = 1024;

/// Decode bound on datacenter count, in both datacenter sections.
pub const MAX_DATACENTERS: usize = 1024;

/// Longest relay or datacenter name.
pub const MAX_NAME_BYTES: usize = 256;

/// Errors from encoding or decoding a cost matrix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("unsupported cost matrix version {version} (max {max})")]
    UnsupportedVersion { version: u32, max: u32 },

    #[error("{field}: expected {expected} entries, got {got}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{field}: {count} exceeds limit {max}")]
    TooMany {
        field: &'static str,
        count: usize,
        max: usize,
    },

    #[error("relay address {index} is {len} bytes (max {max})")]
    AddressTooLong { index: usize, len: usize, max: usize },

    #[error("relay address {index} ends in a zero byte")]
    AddressTrailingZero { index: usize },

    #[error("name is {len} bytes (max {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("name is not valid UTF-8")]
    InvalidName,

    #[error("relay index {index} out of range for {num_relays} relays")]
    RelayIndex { index: usize, num_relays: usize },

    #[error("relay {0} has no entry for itself")]
    SelfPair(usize),

    #[error("datacenter {0:016x} listed twice")]
    DuplicateDatacenter(u64),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

/// Entries needed to store every unordered pair of `n` relays.
pub fn tri_matrix_length(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Dense offset of the unordered pair `(i, j)`. `i` and `j` must differ.
pub fn tri_matrix_index(i: usize, j: usize) -> usize {
    debug_assert_ne!(i, j, "diagonal has no storage");
    let (hi, lo) = if i > j { (i, j) } else { (j, i) };
    hi * (hi + 1) / 2 - hi + lo
}
