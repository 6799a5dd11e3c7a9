//! Token chain builder and per-slot readers.

use std::net::SocketAddr;
use tracing::{debug, trace};

use super::{
    ContinueToken, RouteToken, TokenError, ENCRYPTED_CONTINUE_TOKEN_BYTES,
    ENCRYPTED_ROUTE_TOKEN_BYTES, MAX_RELAYS_PER_ROUTE, MAX_TOKENS,
};
use crate::config::Keys;
use crate::crypto::{CryptoProvider, Nonce, PrivateKey, PublicKey, KEY_BYTES, NONCE_BYTES};

/// Client and server bracket every relay path.
const MIN_NODES: usize = 1 + 2;
const MAX_NODES: usize = MAX_RELAYS_PER_ROUTE + 2;
const _: () = assert!(MAX_NODES <= MAX_TOKENS);

/// Session fields shared by every token in one chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenParams {
    pub expire_timestamp: u64,
    pub session_id: u64,
    pub session_version: u8,
    pub session_flags: u8,
    pub kbps_up: u32,
    pub kbps_down: u32,
}

/// One position in a relay path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteHop {
    pub address: SocketAddr,
    pub public_key: PublicKey,
}

fn check_node_count(num_nodes: usize) -> Result<(), TokenError> {
    if !(MIN_NODES..=MAX_NODES).contains(&num_nodes) {
        return Err(TokenError::InvalidNodeCount {
            got: num_nodes,
            min: MIN_NODES,
            max: MAX_NODES,
        });
    }
    Ok(())
}

/// Seal `plain` for one hop into `nonce || ciphertext || mac`.
fn seal_slot<C: CryptoProvider>(
    crypto: &C,
    plain: &[u8],
    master_private_key: &PrivateKey,
    receiver_public_key: &PublicKey,
    out: &mut Vec<u8>,
) -> Result<(), TokenError> {
    let nonce = crypto.random_nonce();
    let sealed = crypto.box_encrypt(plain, &nonce, master_private_key, receiver_public_key)?;
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(())
}

/// Open the first `stride` bytes of `slot` and return the plain token bytes.
fn open_slot<C: CryptoProvider>(
    crypto: &C,
    slot: &[u8],
    stride: usize,
    sender_public_key: &PublicKey,
    receiver_private_key: &PrivateKey,
) -> Result<Vec<u8>, TokenError> {
    if slot.len() < stride {
        return Err(TokenError::MessageTooShort {
            expected: stride,
            got: slot.len(),
        });
    }
    let mut nonce: Nonce = [0u8; NONCE_BYTES];
    nonce.copy_from_slice(&slot[..NONCE_BYTES]);
    crypto
        .box_decrypt(
            &slot[NONCE_BYTES..stride],
            &nonce,
            sender_public_key,
            receiver_private_key,
        )
        .map_err(|_| {
            debug!(stride, "Token slot failed to decrypt");
            TokenError::DecryptionFailed
        })
}

/// Build a sealed route token chain for `hops` (client, relays, server).
///
/// A fresh session private key is generated and shared by every token.
/// Hop `i` learns the address of hop `i + 1`; the server hop learns none.
/// The result is `hops.len()` slots of [`ENCRYPTED_ROUTE_TOKEN_BYTES`].
pub fn write_route_tokens<C: CryptoProvider>(
    crypto: &C,
    keys: &Keys,
    params: &TokenParams,
    hops: &[RouteHop],
) -> Result<Vec<u8>, TokenError> {
    check_node_count(hops.len())?;

    let mut private_key = [0u8; KEY_BYTES];
    crypto.random_bytes(&mut private_key);

    let mut out = Vec::with_capacity(hops.len() * ENCRYPTED_ROUTE_TOKEN_BYTES);
    for (i, hop) in hops.iter().enumerate() {
        let token = RouteToken {
            expire_timestamp: params.expire_timestamp,
            session_id: params.session_id,
            session_version: params.session_version,
            session_flags: params.session_flags,
            kbps_up: params.kbps_up,
            kbps_down: params.kbps_down,
            next_address: hops.get(i + 1).map(|next| next.address),
            private_key,
        };
        let plain = token.write()?;
        seal_slot(
            crypto,
            &plain,
            keys.router_private_key(),
            &hop.public_key,
            &mut out,
        )?;
    }

    trace!(
        num_nodes = hops.len(),
        session_id = %format_args!("{:016x}", params.session_id),
        session_version = params.session_version,
        "Wrote route token chain"
    );
    Ok(out)
}

/// Build a sealed continue token chain, one slot per public key.
///
/// Used when the relay path is unchanged and only its lifetime is extended.
pub fn write_continue_tokens<C: CryptoProvider>(
    crypto: &C,
    keys: &Keys,
    params: &TokenParams,
    public_keys: &[PublicKey],
) -> Result<Vec<u8>, TokenError> {
    check_node_count(public_keys.len())?;

    let token = ContinueToken {
        expire_timestamp: params.expire_timestamp,
        session_id: params.session_id,
        session_version: params.session_version,
        session_flags: params.session_flags,
    };
    let plain = token.write()?;

    let mut out = Vec::with_capacity(public_keys.len() * ENCRYPTED_CONTINUE_TOKEN_BYTES);
    for public_key in public_keys {
        seal_slot(crypto, &plain, keys.router_private_key(), public_key, &mut out)?;
    }

    trace!(
        num_nodes = public_keys.len(),
        session_id = %format_args!("{:016x}", params.session_id),
        session_version = params.session_version,
        "Wrote continue token chain"
    );
    Ok(out)
}

/// Open one sealed route token slot.
///
/// Length is checked before any crypto. Any decryption problem is reported
/// as [`TokenError::DecryptionFailed`].
pub fn read_encrypted_route_token<C: CryptoProvider>(
    crypto: &C,
    slot: &[u8],
    sender_public_key: &PublicKey,
    receiver_private_key: &PrivateKey,
) -> Result<RouteToken, TokenError> {
    let plain = open_slot(
        crypto,
        slot,
        ENCRYPTED_ROUTE_TOKEN_BYTES,
        sender_public_key,
        receiver_private_key,
    )?;
    RouteToken::read(&plain)
}

/// Open one sealed continue token slot.
pub fn read_encrypted_continue_token<C: CryptoProvider>(
    crypto: &C,
    slot: &[u8],
    sender_public_key: &PublicKey,
    receiver_private_key: &PrivateKey,
) -> Result<ContinueToken, TokenError> {
    let plain = open_slot(
        crypto,
        slot,
        ENCRYPTED_CONTINUE_TOKEN_BYTES,
        sender_public_key,
        receiver_private_key,
    )?;
    ContinueToken::read(&plain)
}

/// Slot `index` of a chain laid out at `stride`, if present.
pub fn token_slot(chain: &[u8], index: usize, stride: usize) -> Option<&[u8]> {
    let start = index.checked_mul(stride)?;
    chain.get(start..start.checked_add(stride)?)
}
