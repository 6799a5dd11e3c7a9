//! Process-wide key material.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ConfigError;
use crate::crypto::{CryptoError, CryptoProvider, PrivateKey, PublicKey, KEY_BYTES};

/// Hex-encoded keys as they appear in YAML (`keys.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Master key that encrypts every route and continue token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_private_key: Option<String>,

    /// Key that signs backend responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_private_key: Option<String>,

    /// Public key of the relay fleet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_public_key: Option<String>,

    /// Shared key for the packet filter hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_hash_key: Option<String>,
}

impl KeysConfig {
    /// Override fields that are set in `other`.
    pub fn merge(&mut self, other: KeysConfig) {
        if other.router_private_key.is_some() {
            self.router_private_key = other.router_private_key;
        }
        if other.backend_private_key.is_some() {
            self.backend_private_key = other.backend_private_key;
        }
        if other.relay_public_key.is_some() {
            self.relay_public_key = other.relay_public_key;
        }
        if other.packet_hash_key.is_some() {
            self.packet_hash_key = other.packet_hash_key;
        }
    }
}

/// Decoded, immutable key set.
///
/// Built once at startup and shared by reference. There are no setters.
#[derive(Clone, PartialEq, Eq)]
pub struct Keys {
    router_private_key: PrivateKey,
    backend_private_key: PrivateKey,
    relay_public_key: PublicKey,
    packet_hash_key: [u8; KEY_BYTES],
}

impl Keys {
    pub fn new(
        router_private_key: PrivateKey,
        backend_private_key: PrivateKey,
        relay_public_key: PublicKey,
        packet_hash_key: [u8; KEY_BYTES],
    ) -> Self {
        Self {
            router_private_key,
            backend_private_key,
            relay_public_key,
            packet_hash_key,
        }
    }

    /// Decode every key from its hex form. All four are required.
    pub fn from_config(config: &KeysConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            router_private_key: decode_key("router_private_key", &config.router_private_key)?,
            backend_private_key: decode_key("backend_private_key", &config.backend_private_key)?,
            relay_public_key: decode_key("relay_public_key", &config.relay_public_key)?,
            packet_hash_key: decode_key("packet_hash_key", &config.packet_hash_key)?,
        })
    }

    /// Fresh random key set, for development and tests.
    pub fn generate<C: CryptoProvider>(crypto: &C) -> Self {
        let (_, router_private_key) = crypto.generate_keypair();
        let (_, backend_private_key) = crypto.generate_keypair();
        let (relay_public_key, _) = crypto.generate_keypair();
        let mut packet_hash_key = [0u8; KEY_BYTES];
        crypto.random_bytes(&mut packet_hash_key);
        Self::new(
            router_private_key,
            backend_private_key,
            relay_public_key,
            packet_hash_key,
        )
    }

    /// Hex form of this key set, suitable for writing back to YAML.
    pub fn to_config(&self) -> KeysConfig {
        KeysConfig {
            router_private_key: Some(hex::encode(self.router_private_key)),
            backend_private_key: Some(hex::encode(self.backend_private_key)),
            relay_public_key: Some(hex::encode(self.relay_public_key)),
            packet_hash_key: Some(hex::encode(self.packet_hash_key)),
        }
    }

    pub fn router_private_key(&self) -> &PrivateKey {
        &self.router_private_key
    }

    pub fn backend_private_key(&self) -> &PrivateKey {
        &self.backend_private_key
    }

    pub fn relay_public_key(&self) -> &PublicKey {
        &self.relay_public_key
    }

    pub fn packet_hash_key(&self) -> &[u8; KEY_BYTES] {
        &self.packet_hash_key
    }

    /// Public half of the router key; relays need it to open their tokens.
    pub fn router_public_key<C: CryptoProvider>(&self, crypto: &C) -> Result<PublicKey, CryptoError> {
        crypto.public_key(&self.router_private_key)
    }

    /// Public half of the backend key; servers verify signatures with it.
    pub fn backend_public_key<C: CryptoProvider>(
        &self,
        crypto: &C,
    ) -> Result<PublicKey, CryptoError> {
        crypto.public_key(&self.backend_private_key)
    }
}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("router_private_key", &"[redacted]")
            .field("backend_private_key", &"[redacted]")
            .field("relay_public_key", &hex::encode(self.relay_public_key))
            .field("packet_hash_key", &"[redacted]")
            .finish()
    }
}

fn decode_key(name: &'static str, value: &Option<String>) -> Result<[u8; KEY_BYTES], ConfigError> {
    let value = value.as_deref().ok_or(ConfigError::MissingKey(name))?;
    let bytes = hex::decode(value.trim()).map_err(|e| ConfigError::InvalidKey {
        name,
        reason: e.to_string(),
    })?;
    <[u8; KEY_BYTES]>::try_from(bytes.as_slice()).map_err(|_| ConfigError::InvalidKey {
        name,
        reason: format!("expected {} bytes, got {}", KEY_BYTES, bytes.len()),
    })
}
