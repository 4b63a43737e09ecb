//! Key rotation.
//!
//! Moves everything stored under one key suffix to another by decrypting
//! with the old key and re-encrypting with the new one. Template addresses
//! are content hashes, so they carry over unchanged.
//!
//! Order: profile map, templates, index, then removal of the old suffix's
//! files. A crash before the last step leaves both copies on disk.

use tracing::{debug, info};

use crate::core::domain::IndexEntry;
use crate::core::profiles::Profiles;
use crate::error::{Result, RotateError};

/// What a rotation moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub old_suffix: String,
    pub new_suffix: String,
    pub profiles: usize,
    pub templates: usize,
}

/// Re-encrypt the data of `old_suffix` under `new_suffix`.
///
/// Both keys must be held by the agent.
///
/// # Errors
///
/// Returns `RotateError::SameSuffix` when both suffixes are equal,
/// `RotateError::UnknownSuffix` if the store has nothing under `old_suffix`,
/// `RotateError::SuffixInUse` if `new_suffix` is already registered, and
/// `AgentError::KeyNotFound` if either key is missing from the agent.
pub fn rotate(profiles: &mut Profiles, old_suffix: &str, new_suffix: &str) -> Result<Rotation> {
    if old_suffix == new_suffix {
        return Err(RotateError::SameSuffix(old_suffix.to_string()).into());
    }

    let old_key = profiles.find_key(old_suffix)?;
    let new_key = profiles.find_key(new_suffix)?;

    let mut index = profiles.store().load_index()?;
    if !index.contains(old_suffix) {
        return Err(RotateError::UnknownSuffix(old_suffix.to_string()).into());
    }
    if index.contains(new_suffix) {
        return Err(RotateError::SuffixInUse(new_suffix.to_string()).into());
    }

    let old_derived = profiles.derive(&old_key)?;
    let new_derived = profiles.derive(&new_key)?;
    let store = profiles.store();

    let map = store.load_profile_map(old_suffix, &old_derived)?;
    store.save_profile_map(new_suffix, &map, &new_derived)?;
    debug!(profiles = map.len(), "profile map re-encrypted");

    let addresses = store.list_templates(old_suffix)?;
    for address in &addresses {
        let content = store.load_template(old_suffix, address, &old_derived)?;
        store.save_template(new_suffix, address, &content, &new_derived)?;
    }
    debug!(templates = addresses.len(), "templates re-encrypted");

    index.remove(old_suffix);
    index.insert(new_suffix, IndexEntry::new(new_suffix, new_key.without_comment()));
    store.save_index(&index)?;

    store.delete_all_for_suffix(old_suffix)?;
    info!(old = old_suffix, new = new_suffix, "key rotated");

    Ok(Rotation {
        old_suffix: old_suffix.to_string(),
        new_suffix: new_suffix.to_string(),
        profiles: map.len(),
        templates: addresses.len(),
    })
}
