//! Key derivation and symmetric encryption.
//!
//! Encryption keys are never stored. Each one is the SHA-256 of a
//! deterministic agent signature over [`NAMESPACE`], recomputed per
//! invocation and kept in a [`KeyCache`] owned by the caller.
//!
//! Blobs are `base64(IV || AES-256-CBC(plaintext))` with PKCS#7 padding and a
//! fresh random IV per call.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::agent::KeyAgent;
use crate::core::constants::NAMESPACE;
use crate::error::{CipherError, Result};

mod aes;

pub use self::aes::{decrypt, decrypt_string, encrypt};

/// A 32-byte symmetric key, wiped on drop.
#[derive(Clone)]
pub struct DerivedKey(Zeroizing<[u8; 32]>);

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Hash an agent signature into a key.
    pub fn from_signature(signature: &[u8]) -> Self {
        let digest: [u8; 32] = Sha256::digest(signature).into();
        Self::from_bytes(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

/// Derived keys for the lifetime of one invocation, keyed by public key line.
#[derive(Debug, Default)]
pub struct KeyCache {
    keys: HashMap<String, DerivedKey>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached key for `public_key`, deriving it through the agent
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::KeyDerivation` if the agent cannot sign
    /// (key removed, agent locked).
    pub fn derive(&mut self, agent: &dyn KeyAgent, public_key: &str) -> Result<DerivedKey> {
        if let Some(key) = self.keys.get(public_key) {
            return Ok(key.clone());
        }

        debug!("deriving key from agent signature");
        let signature = agent.sign(public_key, NAMESPACE).map_err(|e| match e {
            crate::error::Error::Cipher(c) => c,
            other => CipherError::KeyDerivation(other.to_string()),
        })?;
        if signature.is_empty() {
            return Err(CipherError::KeyDerivation("agent returned empty signature".into()).into());
        }

        let key = DerivedKey::from_signature(&signature);
        self.keys.insert(public_key.to_string(), key.clone());
        Ok(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
