//! secp256k1-backed crypto provider.
//!
//! - box: x-only ECDH, SHA-256 of the shared x coordinate, HKDF-SHA256,
//!   then XChaCha20-Poly1305 with the caller's 24-byte nonce
//! - sign: BIP-340 Schnorr over SHA-256 of the data
//! - keyed hash: HMAC-SHA256 truncated to 8 bytes

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use secp256k1::{
    ecdh::shared_secret_point, schnorr, All, Keypair, Parity, Secp256k1, SecretKey,
    XOnlyPublicKey,
};
use sha2::{Digest, Sha256};
use std::fmt;

use super::{
    CryptoError, CryptoProvider, Nonce, PrivateKey, PublicKey, Signature, KEY_BYTES,
    PACKET_HASH_BYTES,
};

/// HKDF info string binding derived keys to the box construction.
const BOX_KEY_INFO: &[u8] = b"nextwire/box/xchacha20poly1305";

type HmacSha256 = Hmac<Sha256>;

/// Production [`CryptoProvider`] on secp256k1.
#[derive(Clone)]
pub struct Secp256k1Crypto {
    secp: Secp256k1<All>,
}

impl Secp256k1Crypto {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    fn keypair(&self, private_key: &PrivateKey) -> Result<Keypair, CryptoError> {
        let secret =
            SecretKey::from_slice(private_key).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Keypair::from_secret_key(&self.secp, &secret))
    }

    /// Symmetric box key shared by `our_private` and the owner of `their_public`.
    ///
    /// Only the x coordinate of the ECDH point is hashed, so the result does
    /// not depend on the parity dropped by x-only public keys.
    fn box_key(
        &self,
        our_private: &PrivateKey,
        their_public: &PublicKey,
    ) -> Result<[u8; KEY_BYTES], CryptoError> {
        let secret =
            SecretKey::from_slice(our_private).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let xonly =
            XOnlyPublicKey::from_slice(their_public).map_err(|_| CryptoError::InvalidPublicKey)?;
        let point = shared_secret_point(&xonly.public_key(Parity::Even), &secret);
        let shared = Sha256::digest(&point[..32]);

        let hk = Hkdf::<Sha256>::new(None, &shared);
        let mut key = [0u8; KEY_BYTES];
        hk.expand(BOX_KEY_INFO, &mut key)
            .expect("32 bytes is valid output length");
        Ok(key)
    }
}

impl Default for Secp256k1Crypto {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Secp256k1Crypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1Crypto").finish()
    }
}

impl CryptoProvider for Secp256k1Crypto {
    fn random_bytes(&self, out: &mut [u8]) {
        rand::rng().fill_bytes(out);
    }

    fn generate_keypair(&self) -> (PublicKey, PrivateKey) {
        let mut private_key = [0u8; KEY_BYTES];
        let secret = loop {
            self.random_bytes(&mut private_key);
            if let Ok(secret) = SecretKey::from_slice(&private_key) {
                break secret;
            }
        };
        let keypair = Keypair::from_secret_key(&self.secp, &secret);
        let (xonly, _parity) = keypair.x_only_public_key();
        (xonly.serialize(), private_key)
    }

    fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey, CryptoError> {
        let (xonly, _parity) = self.keypair(private_key)?.x_only_public_key();
        Ok(xonly.serialize())
    }

    fn box_encrypt(
        &self,
        plaintext: &[u8],
        nonce: &Nonce,
        sender_private_key: &PrivateKey,
        receiver_public_key: &PublicKey,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.box_key(sender_private_key, receiver_public_key)?;
        let cipher =
            XChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::EncryptionFailed)?;
        cipher
            .encrypt(XNonce::from_slice(nonce), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    fn box_decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &Nonce,
        sender_public_key: &PublicKey,
        receiver_private_key: &PrivateKey,
    ) -> Result<Vec<u8>, CryptoError> {
        // Key errors collapse into the same opaque failure as a bad tag.
        let key = self
            .box_key(receiver_private_key, sender_public_key)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let cipher =
            XChaCha20Poly1305::new_from_slice(&key).map_err(|_| CryptoError::DecryptionFailed)?;
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    fn sign(&self, data: &[u8], private_key: &PrivateKey) -> Result<Signature, CryptoError> {
        let keypair = self.keypair(private_key)?;
        let digest = Sha256::digest(data);
        let mut aux = [0u8; 32];
        self.random_bytes(&mut aux);
        let signature = self
            .secp
            .sign_schnorr_with_aux_rand(digest.as_slice(), &keypair, &aux);
        Ok(signature.serialize())
    }

    fn verify(&self, data: &[u8], public_key: &PublicKey, signature: &Signature) -> bool {
        let Ok(xonly) = XOnlyPublicKey::from_slice(public_key) else {
            return false;
        };
        let Ok(signature) = schnorr::Signature::from_slice(signature) else {
            return false;
        };
        let digest = Sha256::digest(data);
        self.secp
            .verify_schnorr(&signature, digest.as_slice(), &xonly)
            .is_ok()
    }

    fn keyed_hash(&self, data: &[u8], key: &[u8; KEY_BYTES]) -> [u8; PACKET_HASH_BYTES] {
        let tag = keyed_mac(data, key).finalize().into_bytes();
        let mut out = [0u8; PACKET_HASH_BYTES];
        out.copy_from_slice(&tag[..PACKET_HASH_BYTES]);
        out
    }

    fn verify_keyed_hash(
        &self,
        data: &[u8],
        key: &[u8; KEY_BYTES],
        tag: &[u8; PACKET_HASH_BYTES],
    ) -> bool {
        keyed_mac(data, key).verify_truncated_left(tag).is_ok()
    }
}

fn keyed_mac(data: &[u8], key: &[u8; KEY_BYTES]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac
}
