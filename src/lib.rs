//! Nextwire: wire substrate for relay-mesh path steering
//!
//! The encoding layer shared by clients, relays, game servers and the
//! backend: a bit-packed stream codec, encrypted per-hop route token chains,
//! the keyed-hash and signature packet envelope, and the relay cost matrix
//! format.

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod matrix;
pub mod packet;
pub mod session;
pub mod token;

// Re-export encoding types
pub use encoding::{BitReader, BitWriter, EncodingError, ReadStream, Stream, WriteStream};

// Re-export config types
pub use config::{Config, ConfigError, Keys, KeysConfig};

// Re-export crypto types
pub use crypto::{CryptoError, CryptoProvider, PrivateKey, PublicKey, Secp256k1Crypto};

// Re-export token types
pub use token::{
    read_encrypted_continue_token, read_encrypted_route_token, token_slot, write_continue_tokens,
    write_route_tokens, ContinueToken, RouteHop, RouteToken, TokenError, TokenParams,
};

// Re-export packet envelope
pub use packet::{
    hash_packet, is_network_next_packet, sign_packet, strip_packet_hash, verify_signed_packet,
    PacketError,
};

// Re-export session fragments
pub use session::{NearRelay, NearRelays, RouteUpdate, UpdateType};

// Re-export cost matrix types
pub use matrix::{tri_matrix_index, tri_matrix_length, CostMatrix, MatrixError};
