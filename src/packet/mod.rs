//! Packet Envelope
//!
//! Two independent wrappers around an already-encoded payload:
//!
//! ```text
//!   hashed:  [ keyed hash (8) ][ payload ]
//!   signed:  [ payload ][ signature (64) ]
//! ```
//!
//! The hash prefix is a cheap shared-secret filter that drops stray UDP
//! traffic before any real work; it covers at most the first 32 payload
//! bytes. The signature suffix proves the sender holds the backend key.
//! Neither wrapper looks inside the payload.

use thiserror::Error;
use tracing::debug;

use crate::config::Keys;
use crate::crypto::{
    CryptoError, CryptoProvider, PublicKey, Signature, PACKET_HASH_BYTES, SIGNATURE_BYTES,
};

/// Largest datagram accepted off the wire.
pub const MAX_PACKET_BYTES: usize = 4096;

/// Payload size target for datagrams.
pub const MTU: usize = 1300;

/// Payload bytes covered by the keyed hash.
const HASHED_PREFIX_BYTES: usize = 32;

/// Errors from wrapping or unwrapping a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("packet too short: expected at least {expected}, got {got}")]
    TooShort { expected: usize, got: usize },

    #[error("packet too long: max {max}, got {got}")]
    TooLong { max: usize, got: usize },

    #[error("packet hash mismatch")]
    HashMismatch,

    #[error("signature check failed")]
    SignatureCheckFailed,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

fn hashed_prefix(payload: &[u8]) -> &[u8] {
    &payload[..payload.len().min(HASHED_PREFIX_BYTES)]
}

fn packet_hash<C: CryptoProvider>(
    crypto: &C,
    keys: &Keys,
    payload: &[u8],
) -> [u8; PACKET_HASH_BYTES] {
    crypto.keyed_hash(hashed_prefix(payload), keys.packet_hash_key())
}

/// Prefix `payload` with its keyed hash.
pub fn hash_packet<C: CryptoProvider>(
    crypto: &C,
    keys: &Keys,
    payload: &[u8],
) -> Result<Vec<u8>, PacketError> {
    if payload.is_empty() {
        return Err(PacketError::TooShort {
            expected: 1,
            got: 0,
        });
    }
    let total = PACKET_HASH_BYTES + payload.len();
    if total > MAX_PACKET_BYTES {
        return Err(PacketError::TooLong {
            max: MAX_PACKET_BYTES,
            got: total,
        });
    }
    let mut packet = Vec::with_capacity(total);
    packet.extend_from_slice(&packet_hash(crypto, keys, payload));
    packet.extend_from_slice(payload);
    Ok(packet)
}

/// Check the keyed hash prefix and return the payload behind it.
pub fn strip_packet_hash<'a, C: CryptoProvider>(
    crypto: &C,
    keys: &Keys,
    packet: &'a [u8],
) -> Result<&'a [u8], PacketError> {
    if packet.len() <= PACKET_HASH_BYTES {
        return Err(PacketError::TooShort {
            expected: PACKET_HASH_BYTES + 1,
            got: packet.len(),
        });
    }
    if packet.len() > MAX_PACKET_BYTES {
        return Err(PacketError::TooLong {
            max: MAX_PACKET_BYTES,
            got: packet.len(),
        });
    }
    let (hash, payload) = packet.split_at(PACKET_HASH_BYTES);
    let mut tag = [0u8; PACKET_HASH_BYTES];
    tag.copy_from_slice(hash);
    if !crypto.verify_keyed_hash(hashed_prefix(payload), keys.packet_hash_key(), &tag) {
        debug!(len = packet.len(), "Dropping packet with bad hash");
        return Err(PacketError::HashMismatch);
    }
    Ok(payload)
}

/// True if `packet` carries a valid keyed hash prefix.
pub fn is_network_next_packet<C: CryptoProvider>(crypto: &C, keys: &Keys, packet: &[u8]) -> bool {
    strip_packet_hash(crypto, keys, packet).is_ok()
}

/// Append a signature over `payload` made with the backend key.
pub fn sign_packet<C: CryptoProvider>(
    crypto: &C,
    keys: &Keys,
    payload: &[u8],
) -> Result<Vec<u8>, PacketError> {
    let total = payload.len() + SIGNATURE_BYTES;
    if total > MAX_PACKET_BYTES {
        return Err(PacketError::TooLong {
            max: MAX_PACKET_BYTES,
            got: total,
        });
    }
    let signature = crypto.sign(payload, keys.backend_private_key())?;
    let mut packet = Vec::with_capacity(total);
    packet.extend_from_slice(payload);
    packet.extend_from_slice(&signature);
    Ok(packet)
}

/// Verify the signature suffix and return the payload in front of it.
pub fn verify_signed_packet<'a, C: CryptoProvider>(
    crypto: &C,
    public_key: &PublicKey,
    packet: &'a [u8],
) -> Result<&'a [u8], PacketError> {
    if packet.len() < SIGNATURE_BYTES {
        return Err(PacketError::TooShort {
            expected: SIGNATURE_BYTES,
            got: packet.len(),
        });
    }
    let (payload, suffix) = packet.split_at(packet.len() - SIGNATURE_BYTES);
    let mut signature: Signature = [0u8; SIGNATURE_BYTES];
    signature.copy_from_slice(suffix);
    if !crypto.verify(payload, public_key, &signature) {
        debug!(len = packet.len(), "Dropping packet with bad signature");
        return Err(PacketError::SignatureCheckFailed);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests;
