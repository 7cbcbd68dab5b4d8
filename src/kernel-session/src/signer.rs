//! ECDSA signers: the `Signer` seam used for EOA roots, and the local session key.

use std::fmt;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;

use crate::{
    errors::{Result, SessionError},
    utils::crypto,
};

/// Produces `r || s || v` signatures over raw 32-byte digests for one address.
///
/// Implementations must not hash or prefix `digest` themselves. External wallets and
/// hardware signers plug in here.
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_hash(&self, digest: B256) -> Result<[u8; 65]>;
}

/// secp256k1 private key held in memory. Used for session keys and local EOA roots.
#[derive(Clone)]
pub struct SessionKey {
    key: SigningKey,
    address: Address,
}

impl SessionKey {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    pub fn from_signing_key(key: SigningKey) -> Self {
        let address = crypto::address_of(key.verifying_key());
        Self { key, address }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|_| SessionError::Signing("invalid secp256k1 private key".into()))?;
        Ok(Self::from_signing_key(key))
    }

    /// Accepts `0x`-prefixed or bare hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|_| SessionError::Signing("private key is not valid hex".into()))?;
        Self::from_bytes(&bytes)
    }

    /// `0x`-prefixed private key. Handle with care: this is the session's signing power.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.key.to_bytes()))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sign_digest(&self, digest: B256) -> Result<[u8; 65]> {
        crypto::sign_digest(&self.key, digest)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.to_bytes() == other.key.to_bytes()
    }
}

impl Eq for SessionKey {}

#[async_trait]
impl Signer for SessionKey {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, digest: B256) -> Result<[u8; 65]> {
        self.sign_digest(digest)
    }
}
