//! Crypto Provider
//!
//! The token chain and the packet envelope never call a crypto library
//! directly. They go through [`CryptoProvider`], which exposes exactly the
//! operations the wire protocol needs: authenticated public-key box
//! encryption with an explicit nonce, detached signatures, a short keyed
//! hash for cheap packet filtering, and random bytes.
//!
//! [`Secp256k1Crypto`] is the production provider. Keys are 32-byte
//! secp256k1 secrets and 32-byte x-only public keys, so every key in the
//! system has the same width.

mod secp;

use thiserror::Error;

pub use secp::Secp256k1Crypto;

/// Key width for public keys, private keys and hash keys.
pub const KEY_BYTES: usize = 32;

/// Box nonce width.
pub const NONCE_BYTES: usize = 24;

/// Box authentication tag width.
pub const MAC_BYTES: usize = 16;

/// Detached signature width.
pub const SIGNATURE_BYTES: usize = 64;

/// Keyed packet hash width.
pub const PACKET_HASH_BYTES: usize = 8;

pub type PublicKey = [u8; KEY_BYTES];
pub type PrivateKey = [u8; KEY_BYTES];
pub type Nonce = [u8; NONCE_BYTES];
pub type Signature = [u8; SIGNATURE_BYTES];

/// Errors from the crypto provider.
///
/// Decryption deliberately has a single variant: callers cannot tell a
/// wrong key from tampered ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,
}

/// Crypto operations consumed by the wire protocol.
///
/// Implementations must be safe to call from many threads at once; the
/// protocol layer holds no locks around them.
pub trait CryptoProvider {
    /// Fill `out` with cryptographically secure random bytes.
    fn random_bytes(&self, out: &mut [u8]);

    /// Generate a fresh keypair.
    fn generate_keypair(&self) -> (PublicKey, PrivateKey);

    /// Derive the public key for a private key.
    fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey, CryptoError>;

    /// Encrypt and authenticate `plaintext` from sender to receiver.
    ///
    /// Returns `ciphertext || mac`, exactly `MAC_BYTES` longer than the input.
    fn box_encrypt(
        &self,
        plaintext: &[u8],
        nonce: &Nonce,
        sender_private_key: &PrivateKey,
        receiver_public_key: &PublicKey,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Inverse of [`Self::box_encrypt`], run by the receiver.
    fn box_decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &Nonce,
        sender_public_key: &PublicKey,
        receiver_private_key: &PrivateKey,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Detached signature over `data`.
    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> Result<Signature, CryptoError>;

    /// Check a detached signature. Malformed keys or signatures verify false.
    fn verify(&self, data: &[u8], public_key: &PublicKey, signature: &Signature) -> bool;

    /// Short keyed hash used for the packet filter prefix.
    fn keyed_hash(&self, data: &[u8], key: &[u8; KEY_BYTES]) -> [u8; PACKET_HASH_BYTES];

    /// Check `tag` against the keyed hash of `data` in constant time.
    fn verify_keyed_hash(
        &self,
        data: &[u8],
        key: &[u8; KEY_BYTES],
        tag: &[u8; PACKET_HASH_BYTES],
    ) -> bool;

    /// Fresh random nonce for [`Self::box_encrypt`].
    fn random_nonce(&self) -> Nonce {
        let mut nonce = [0u8; NONCE_BYTES];
        self.random_bytes(&mut nonce);
        nonce
    }
}
