//! Constants used throughout cfg-vault.
//!
//! Centralizes magic strings and on-disk naming.

/// Namespace signed by the agent to derive encryption keys.
pub const NAMESPACE: &str = "cfg-secrets-v1";

/// Only keys of this type produce deterministic signatures.
pub const SUPPORTED_KEY_TYPE: &str = "ssh-ed25519";

/// Number of hex characters in a key suffix.
pub const SUFFIX_LEN: usize = 6;

/// Number of hex characters in a template address.
pub const ADDRESS_LEN: usize = 7;

/// Extension of every encrypted blob.
pub const BLOB_EXT: &str = "enc";

/// Unencrypted index file name.
pub const INDEX_FILE: &str = "index.yaml";

/// Directory (under the store root) holding per-suffix template directories.
pub const CONFIGS_DIR: &str = "configs";

/// Default store root relative to HOME.
pub const DEFAULT_STORE_DIR: &str = "dotfiles/cfg";

/// Settings file location relative to the user config dir.
pub const SETTINGS_FILE: &str = "cfg/config.toml";

/// AES block / IV length in bytes.
pub const IV_LEN: usize = 16;
