//! Persisted store.
//!
//! Layout under the store root:
//!
//! ```text
//! index.yaml                      # unencrypted: suffix -> public key + blob name
//! profiles-<suffix>.enc           # encrypted YAML profile map
//! configs/<suffix>/<7-hex>.enc    # encrypted template bodies, content-addressed
//! ```
//!
//! Every blob is produced by [`cipher::encrypt`]. Absent index or profile
//! blob reads as empty; an absent template is `StoreError::TemplateNotFound`.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::core::cipher::{self, DerivedKey};
use crate::core::constants::{ADDRESS_LEN, BLOB_EXT, CONFIGS_DIR, INDEX_FILE};
use crate::core::domain::{profile_blob_name, Index, ProfileMap};
use crate::error::{Result, StoreError};

mod fs;

/// Content address for a template body.
///
/// First seven hex characters of SHA-256 over the plaintext, plus the blob
/// extension. Depends on content only.
pub fn generate_address(content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    format!("{}.{}", &digest[..ADDRESS_LEN], BLOB_EXT)
}

/// Filesystem store rooted at one directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn profiles_path(&self, suffix: &str) -> PathBuf {
        self.root.join(profile_blob_name(suffix))
    }

    /// Directory holding a suffix's templates.
    pub fn config_dir(&self, suffix: &str) -> PathBuf {
        self.root.join(CONFIGS_DIR).join(suffix)
    }

    pub fn template_path(&self, suffix: &str, address: &str) -> PathBuf {
        self.config_dir(suffix).join(address)
    }

    /// Load the index, or a default empty one when absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Parse` if the index exists but is malformed.
    pub fn load_index(&self) -> Result<Index> {
        let path = self.index_path();
        if !path.exists() {
            debug!(path = %path.display(), "no index, using default");
            return Ok(Index::default());
        }

        let contents = fs::read(&path)?;
        if contents.trim().is_empty() {
            return Ok(Index::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| {
            StoreError::Parse {
                what: "index",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Write the index, creating the store root if needed.
    pub fn save_index(&self, index: &Index) -> Result<()> {
        let yaml = serde_yaml::to_string(index).map_err(|e| StoreError::Serialize {
            what: "index",
            reason: e.to_string(),
        })?;
        debug!(suffixes = index.index.len(), "saving index");
        fs::write_atomic(&self.index_path(), yaml.as_bytes())
    }

    /// Load and decrypt a suffix's profile map; absent blob reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::DecryptionFailed` for a wrong key or corrupt
    /// blob, `StoreError::Parse` for undecodable YAML.
    pub fn load_profile_map(&self, suffix: &str, key: &DerivedKey) -> Result<ProfileMap> {
        let path = self.profiles_path(suffix);
        if !path.exists() {
            debug!(suffix, "no profile blob, using empty map");
            return Ok(ProfileMap::new());
        }

        let encrypted = fs::read(&path)?;
        let yaml = cipher::decrypt_string(&encrypted, key)?;
        if yaml.trim().is_empty() {
            return Ok(ProfileMap::new());
        }

        let map: ProfileMap = serde_yaml::from_str(&yaml).map_err(|e| StoreError::Parse {
            what: "profile map",
            reason: e.to_string(),
        })?;
        debug!(suffix, profiles = map.len(), "profile map loaded");
        Ok(map)
    }

    /// Serialize, encrypt and write a suffix's profile map.
    pub fn save_profile_map(&self, suffix: &str, map: &ProfileMap, key: &DerivedKey) -> Result<()> {
        let yaml = serde_yaml::to_string(map).map_err(|e| StoreError::Serialize {
            what: "profile map",
            reason: e.to_string(),
        })?;
        let encrypted = cipher::encrypt(yaml.as_bytes(), key)?;
        debug!(suffix, profiles = map.len(), "saving profile map");
        fs::write_atomic(&self.profiles_path(suffix), encrypted.as_bytes())
    }

    /// Load and decrypt one template. Bodies are arbitrary bytes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TemplateNotFound` if the blob is absent,
    /// `CipherError::DecryptionFailed` if it cannot be decrypted.
    pub fn load_template(&self, suffix: &str, address: &str, key: &DerivedKey) -> Result<Vec<u8>> {
        let path = self.template_path(suffix, address);
        if !path.exists() {
            return Err(StoreError::TemplateNotFound(address.to_string()).into());
        }

        let encrypted = fs::read(&path)?;
        let content = cipher::decrypt(&encrypted, key)?;
        trace!(suffix, address, content_len = content.len(), "template loaded");
        Ok(content.to_vec())
    }

    /// Encrypt and write one template under `address`.
    pub fn save_template(
        &self,
        suffix: &str,
        address: &str,
        content: impl AsRef<[u8]>,
        key: &DerivedKey,
    ) -> Result<()> {
        let content = content.as_ref();
        let encrypted = cipher::encrypt(content, key)?;
        trace!(suffix, address, content_len = content.len(), "saving template");
        fs::write_atomic(&self.template_path(suffix, address), encrypted.as_bytes())
    }

    /// Delete one template; absence is not an error.
    pub fn delete_template(&self, suffix: &str, address: &str) -> Result<()> {
        trace!(suffix, address, "deleting template");
        fs::remove_file(&self.template_path(suffix, address))
    }

    pub fn has_template(&self, suffix: &str, address: &str) -> bool {
        self.template_path(suffix, address).is_file()
    }

    /// Addresses of every template stored for a suffix, sorted.
    pub fn list_templates(&self, suffix: &str) -> Result<Vec<String>> {
        let dir = self.config_dir(suffix);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&dir).map_err(|source| StoreError::ReadFailed {
            path: dir.display().to_string(),
            source,
        })?;

        let extension = format!(".{}", BLOB_EXT);
        let mut addresses = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type()?.is_file() && name.ends_with(&extension) {
                addresses.push(name);
            }
        }
        addresses.sort();
        Ok(addresses)
    }

    /// Remove a suffix's profile blob and template directory.
    pub fn delete_all_for_suffix(&self, suffix: &str) -> Result<()> {
        debug!(suffix, "deleting all data for suffix");
        fs::remove_file(&self.profiles_path(suffix))?;
        fs::remove_dir_all(&self.config_dir(suffix))
    }
}
