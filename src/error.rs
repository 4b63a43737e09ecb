//! Error types for cfg-vault.
//!
//! Errors are grouped by concern and wrapped by the top-level [`Error`].
//! "Not found" conditions and decryption failures are always distinct
//! variants so callers never confuse a missing blob with a wrong key.

use thiserror::Error;

/// Signing agent errors.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("no ed25519 keys found in ssh agent")]
    NoUsableKeys,

    #[error("key not found in ssh agent: {0}")]
    KeyNotFound(String),
}

/// Encryption and key derivation errors.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("failed to sign with ssh key: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Persisted store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template {0} is binary, not text")]
    NotText(String),

    #[error("failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("failed to serialize {what}: {reason}")]
    Serialize { what: &'static str, reason: String },
}

/// Profile domain errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("profile not found: {0}")]
    NotFound(String),

    #[error("profile already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid profile name '{0}': must start with alphanumeric, contain only alphanumeric, dots, underscores, hyphens")]
    InvalidName(String),

    #[error("invalid target path '{0}': must be absolute (start with '/' or '~/')")]
    InvalidTarget(String),

    #[error("profile '{name}' exists under several keys: {}", suffixes.join(", "))]
    Conflict { name: String, suffixes: Vec<String> },
}

/// Runner and external resolver errors.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("target file already exists: {0}")]
    FileExists(String),

    #[error("no command specified")]
    EmptyCommand,

    #[error("secret resolution failed: {0}")]
    Resolve(String),

    #[error("failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },
}

/// Key rotation errors.
#[derive(Error, Debug)]
pub enum RotateError {
    #[error("old and new key are the same: {0}")]
    SameSuffix(String),

    #[error("key {0} already owns profiles; rotate into an unused key")]
    SuffixInUse(String),

    #[error("key {0} owns no profiles in this store")]
    UnknownSuffix(String),
}

/// Settings file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Rotate(#[from] RotateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
