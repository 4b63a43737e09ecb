//! Store index type.
//!
//! The index is the only unencrypted document in a store. It maps each key
//! suffix to the public key that owns it and the name of its profile blob.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::constants::{BLOB_EXT, NAMESPACE};

/// Key derivation parameters recorded alongside the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    pub namespace: String,
}

impl Default for Encryption {
    fn default() -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
        }
    }
}

/// One suffix's entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Public key without comment (`ssh-ed25519 AAAA...`).
    #[serde(alias = "ssh_public_key")]
    pub public_key: String,
    /// File name of the encrypted profile blob.
    #[serde(alias = "profiles_file")]
    pub profile_blob: String,
}

impl IndexEntry {
    pub fn new(suffix: &str, public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            profile_blob: profile_blob_name(suffix),
        }
    }
}

/// The store index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default)]
    pub encryption: Encryption,
    #[serde(default)]
    pub index: BTreeMap<String, IndexEntry>,
}

impl Index {
    pub fn contains(&self, suffix: &str) -> bool {
        self.index.contains_key(suffix)
    }

    pub fn get(&self, suffix: &str) -> Option<&IndexEntry> {
        self.index.get(suffix)
    }

    pub fn insert(&mut self, suffix: &str, entry: IndexEntry) {
        self.index.insert(suffix.to_string(), entry);
    }

    pub fn remove(&mut self, suffix: &str) -> Option<IndexEntry> {
        self.index.remove(suffix)
    }

    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}

/// `profiles-<suffix>.enc`
pub fn profile_blob_name(suffix: &str) -> String {
    format!("profiles-{}.{}", suffix, BLOB_EXT)
}
