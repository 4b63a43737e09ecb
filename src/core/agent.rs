//! Signing agent client.
//!
//! Talks to the SSH agent through the standard OpenSSH tools. Private key
//! material never leaves the agent: we only enumerate public keys and ask
//! for signatures over a fixed namespace.
//!
//! ## Requirements
//!
//! - `ssh-add` and `ssh-keygen` on PATH
//! - `SSH_AUTH_SOCK` pointing at a running agent holding an ed25519 key

use std::io::Write;
use std::process::{Command, Stdio};

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::core::constants::{SUFFIX_LEN, SUPPORTED_KEY_TYPE};
use crate::error::{AgentError, CipherError, Result};

/// Capability to enumerate keys and sign with them.
///
/// `public_key` arguments are full OpenSSH public key lines
/// (`ssh-ed25519 AAAA... comment`).
pub trait KeyAgent {
    /// All public key lines held by the agent.
    fn list_public_keys(&self) -> Result<Vec<String>>;

    /// Sign `namespace` with the private key matching `public_key`.
    ///
    /// Must be deterministic for supported key types.
    fn sign(&self, public_key: &str, namespace: &str) -> Result<Vec<u8>>;
}

/// A usable agent key and its store suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentKey {
    /// Full public key line as reported by the agent.
    pub public_key: String,
    /// Short stable identifier derived from the key material.
    pub suffix: String,
}

impl AgentKey {
    /// Build from a public key line, or `None` if the line is not a usable key.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let key_type = parts.next()?;
        let material = parts.next()?;
        if key_type != SUPPORTED_KEY_TYPE {
            return None;
        }

        Some(Self {
            public_key: line.to_string(),
            suffix: suffix_for(material),
        })
    }

    /// Key type and material only, without the trailing comment.
    pub fn without_comment(&self) -> String {
        strip_comment(&self.public_key)
    }

    /// Trailing comment (usually `user@host`), if any.
    pub fn comment(&self) -> Option<&str> {
        let mut parts = self.public_key.splitn(3, char::is_whitespace);
        parts.nth(2).map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Compute the suffix for a key's base64 material field.
///
/// First six hex characters of SHA-256 over the field text.
pub fn suffix_for(material: &str) -> String {
    let digest = hex::encode(Sha256::digest(material.as_bytes()));
    digest[..SUFFIX_LEN].to_string()
}

/// Keep only `type material` of a public key line.
pub fn strip_comment(public_key: &str) -> String {
    public_key
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Usable keys held by the agent.
///
/// An unreachable or empty agent yields an empty list rather than an error.
pub fn list_usable_keys(agent: &dyn KeyAgent) -> Vec<AgentKey> {
    match agent.list_public_keys() {
        Ok(lines) => {
            let keys: Vec<AgentKey> = lines.iter().filter_map(|l| AgentKey::parse(l)).collect();
            debug!(total = lines.len(), usable = keys.len(), "listed agent keys");
            keys
        }
        Err(e) => {
            debug!(error = %e, "agent unavailable");
            Vec::new()
        }
    }
}

/// OpenSSH agent accessed through `ssh-add` and `ssh-keygen`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshAgent;

impl KeyAgent for SshAgent {
    fn list_public_keys(&self) -> Result<Vec<String>> {
        let output = Command::new("ssh-add")
            .arg("-L")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| crate::error::Error::Other(format!("failed to run ssh-add: {}", e)))?;

        if !output.status.success() {
            return Err(AgentError::NoUsableKeys.into());
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn sign(&self, public_key: &str, namespace: &str) -> Result<Vec<u8>> {
        trace!(namespace, "requesting signature from agent");

        // ssh-keygen selects the agent key from a public key file.
        let mut pubkey_file = tempfile::Builder::new()
            .prefix("cfg-pubkey")
            .tempfile()
            .map_err(|e| CipherError::KeyDerivation(format!("temp file: {}", e)))?;
        pubkey_file
            .write_all(public_key.as_bytes())
            .map_err(|e| CipherError::KeyDerivation(format!("temp file: {}", e)))?;

        let mut child = Command::new("ssh-keygen")
            .arg("-Y")
            .arg("sign")
            .arg("-f")
            .arg(pubkey_file.path())
            .args(["-n", namespace])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CipherError::KeyDerivation(format!("failed to spawn ssh-keygen: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(namespace.as_bytes())
                .map_err(|e| CipherError::KeyDerivation(format!("failed to write data: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| CipherError::KeyDerivation(format!("ssh-keygen failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::KeyDerivation(stderr.trim().to_string()).into());
        }

        Ok(output.stdout)
    }
}
