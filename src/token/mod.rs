//! Route and Continue Tokens
//!
//! A token chain hands every hop of a relay path (client, relays, server)
//! exactly what it needs to forward one session and nothing more. Each hop
//! gets its own slot, sealed with the router's master key to that hop's
//! public key, so a relay can open its own slot and no other.
//!
//! ## Slot Layouts
//!
//! Route token (77 bytes before sealing):
//! ```text
//!   expire_timestamp   u64 LE
//!   session_id         u64 LE
//!   session_version    u8
//!   session_flags      u8
//!   kbps_up            u32 LE
//!   kbps_down          u32 LE
//!   next_address       19-byte address slot
//!   private_key        32 bytes, shared by the whole chain
//! ```
//!
//! Continue token (18 bytes before sealing): the first four fields only.
//!
//! A sealed slot is `nonce (24) || ciphertext || mac (16)`, giving fixed
//! strides of 117 and 58 bytes.

mod chain;
mod continue_token;
mod route;

use thiserror::Error;

use crate::crypto::{CryptoError, MAC_BYTES, NONCE_BYTES};
use crate::encoding::EncodingError;

pub use chain::{
    read_encrypted_continue_token, read_encrypted_route_token, token_slot, write_continue_tokens,
    write_route_tokens, RouteHop, TokenParams,
};
pub use continue_token::ContinueToken;
pub use route::RouteToken;

/// Most hops one chain can describe (client + relays + server).
pub const MAX_TOKENS: usize = 7;

/// Most relays between client and server.
pub const MAX_RELAYS_PER_ROUTE: usize = 5;

/// Plain route token size.
pub const ROUTE_TOKEN_BYTES: usize = 77;

/// Plain continue token size.
pub const CONTINUE_TOKEN_BYTES: usize = 18;

/// Sealed route token stride.
pub const ENCRYPTED_ROUTE_TOKEN_BYTES: usize = NONCE_BYTES + ROUTE_TOKEN_BYTES + MAC_BYTES;

/// Sealed continue token stride.
pub const ENCRYPTED_CONTINUE_TOKEN_BYTES: usize = NONCE_BYTES + CONTINUE_TOKEN_BYTES + MAC_BYTES;

/// Errors from token encoding, chain building and slot decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("not enough bytes: expected at least {expected}, got {got}")]
    MessageTooShort { expected: usize, got: usize },

    #[error("invalid node count {got}: expected {min} to {max}")]
    InvalidNodeCount { got: usize, min: usize, max: usize },

    #[error("token decryption failed")]
    DecryptionFailed,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}
