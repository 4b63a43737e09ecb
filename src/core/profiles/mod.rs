//! The primary interface for profile operations.
//!
//! [`Profiles`] owns the agent handle, the store and the per-invocation key
//! cache. Every read and write of a suffix's data goes through a key derived
//! from the agent key that owns the suffix.

mod lifecycle;
mod outputs;

use std::collections::HashSet;

use tracing::debug;

use crate::core::agent::{self, AgentKey, KeyAgent, SshAgent};
use crate::core::cipher::{DerivedKey, KeyCache};
use crate::core::config::Settings;
use crate::core::domain::{Profile, ProfileData, ProfileMap};
use crate::core::store::Store;
use crate::error::{AgentError, ProfileError, Result};

/// Outcome of looking a profile up by name or prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Exact name, or the only profile starting with the prefix.
    Found(Profile),
    /// Several profiles start with the prefix.
    Ambiguous(Vec<Profile>),
    /// Nothing matches.
    Missing,
}

/// Profile store bound to a signing agent.
pub struct Profiles {
    pub(super) agent: Box<dyn KeyAgent>,
    pub(super) store: Store,
    pub(super) keys: KeyCache,
}

impl std::fmt::Debug for Profiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiles")
            .field("store", &self.store)
            .field("cached_keys", &self.keys.len())
            .finish()
    }
}

impl Profiles {
    pub fn new(store: Store, agent: Box<dyn KeyAgent>) -> Self {
        Self {
            agent,
            store,
            keys: KeyCache::new(),
        }
    }

    /// Open the store configured in `settings`, backed by the SSH agent.
    ///
    /// # Errors
    ///
    /// Returns error if the store directory cannot be resolved.
    pub fn open(settings: &Settings) -> Result<Self> {
        let root = settings.store_root()?;
        debug!(root = %root.display(), "opening store");
        Ok(Self::new(Store::new(root), Box::new(SshAgent)))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Usable keys currently held by the agent.
    pub fn usable_keys(&self) -> Vec<AgentKey> {
        agent::list_usable_keys(self.agent.as_ref())
    }

    /// The agent key owning `suffix`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::KeyNotFound` if the agent holds no such key.
    pub fn find_key(&self, suffix: &str) -> Result<AgentKey> {
        self.usable_keys()
            .into_iter()
            .find(|k| k.suffix == suffix)
            .ok_or_else(|| AgentError::KeyNotFound(suffix.to_string()).into())
    }

    /// Derive (or reuse) the encryption key of an agent key.
    pub fn derive(&mut self, key: &AgentKey) -> Result<DerivedKey> {
        self.keys.derive(self.agent.as_ref(), &key.public_key)
    }

    /// Derive the encryption key for the data stored under `suffix`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::KeyNotFound` or `CipherError::KeyDerivation`.
    pub fn derive_for_suffix(&mut self, suffix: &str) -> Result<DerivedKey> {
        let key = self.find_key(suffix)?;
        self.derive(&key)
    }

    /// Every profile readable with the agent's keys.
    ///
    /// Keys whose suffix has no index entry are skipped.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NoUsableKeys` if the agent holds no usable key.
    pub fn list_profiles(&mut self) -> Result<Vec<Profile>> {
        let keys = self.usable_keys();
        if keys.is_empty() {
            return Err(AgentError::NoUsableKeys.into());
        }

        let index = self.store.load_index()?;
        let mut seen = HashSet::new();
        let mut profiles = Vec::new();

        for key in &keys {
            if !index.contains(&key.suffix) || !seen.insert(key.suffix.clone()) {
                continue;
            }

            let derived = self.derive(key)?;
            let map = self.store.load_profile_map(&key.suffix, &derived)?;
            profiles.extend(
                map.iter()
                    .map(|(name, data)| Profile::from_data(name, &key.suffix, data)),
            );
        }

        debug!(keys = keys.len(), profiles = profiles.len(), "listed profiles");
        Ok(profiles)
    }

    /// Look a profile up by exact name.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotFound`, or `ProfileError::Conflict` when the
    /// name exists under more than one key.
    pub fn get_profile(&mut self, name: &str) -> Result<Profile> {
        let mut matches: Vec<Profile> = self
            .list_profiles()?
            .into_iter()
            .filter(|p| p.name == name)
            .collect();

        match matches.len() {
            0 => Err(ProfileError::NotFound(name.to_string()).into()),
            1 => Ok(matches.remove(0)),
            _ => Err(ProfileError::Conflict {
                name: name.to_string(),
                suffixes: matches.into_iter().map(|p| p.suffix).collect(),
            }
            .into()),
        }
    }

    /// Resolve a name or unique prefix.
    ///
    /// An exact name wins over longer names sharing it as a prefix.
    pub fn resolve_name(&mut self, prefix: &str) -> Result<NameMatch> {
        let candidates: Vec<Profile> = self
            .list_profiles()?
            .into_iter()
            .filter(|p| p.name.starts_with(prefix))
            .collect();

        if candidates.iter().any(|p| p.name == prefix) {
            return self.get_profile(prefix).map(NameMatch::Found);
        }

        let mut candidates = candidates;
        Ok(match candidates.len() {
            0 => NameMatch::Missing,
            1 => NameMatch::Found(candidates.remove(0)),
            _ => {
                candidates.sort_by(|a, b| a.name.cmp(&b.name));
                NameMatch::Ambiguous(candidates)
            }
        })
    }

    /// Whether any profile name starts with `prefix`.
    pub fn has_profiles(&mut self, prefix: &str) -> Result<bool> {
        Ok(self
            .list_profiles()?
            .iter()
            .any(|p| p.name.starts_with(prefix)))
    }

    /// Derived key and decrypted map for the suffix owning `profile`.
    pub(super) fn load_suffix(&mut self, suffix: &str) -> Result<(DerivedKey, ProfileMap)> {
        let key = self.derive_for_suffix(suffix)?;
        let map = self.store.load_profile_map(suffix, &key)?;
        Ok((key, map))
    }

    /// Delete a template unless another output in `map` still points at it.
    ///
    /// Returns whether the blob was removed.
    pub(super) fn release_template(
        &self,
        suffix: &str,
        map: &ProfileMap,
        address: &str,
    ) -> Result<bool> {
        if is_referenced(map, address) {
            debug!(suffix, address, "template still referenced, keeping");
            return Ok(false);
        }
        self.store.delete_template(suffix, address)?;
        Ok(true)
    }
}

/// Mutable entry for `name`, or `ProfileError::NotFound`.
pub(super) fn entry_mut<'a>(map: &'a mut ProfileMap, name: &str) -> Result<&'a mut ProfileData> {
    map.get_mut(name)
        .ok_or_else(|| ProfileError::NotFound(name.to_string()).into())
}

/// Whether any output in `map` uses the template at `address`.
pub fn is_referenced(map: &ProfileMap, address: &str) -> bool {
    map.values()
        .flat_map(|data| data.outputs.iter())
        .any(|o| o.template == address)
}
