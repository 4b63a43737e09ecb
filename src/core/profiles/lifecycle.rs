//! Profile creation, metadata updates and deletion.

use tracing::{debug, info};

use super::{entry_mut, Profiles};
use crate::core::agent::AgentKey;
use crate::core::domain::{IndexEntry, Profile, ProfileData};
use crate::core::validation::validate_profile_name;
use crate::error::{ProfileError, Result};

impl Profiles {
    /// Create an empty profile owned by `key`.
    ///
    /// Registers the key's suffix in the index on first use, storing the
    /// public key without its comment.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidName` for a bad name and
    /// `ProfileError::AlreadyExists` if the name is already visible under any
    /// of the agent's keys.
    pub fn create_profile(
        &mut self,
        name: &str,
        description: Option<&str>,
        account: Option<&str>,
        key: &AgentKey,
    ) -> Result<Profile> {
        validate_profile_name(name)?;
        let derived = self.derive(key)?;

        if self.list_profiles()?.iter().any(|p| p.name == name) {
            return Err(ProfileError::AlreadyExists(name.to_string()).into());
        }

        let mut index = self.store.load_index()?;
        if !index.contains(&key.suffix) {
            info!(suffix = %key.suffix, "registering key in index");
            index.insert(
                &key.suffix,
                IndexEntry::new(&key.suffix, key.without_comment()),
            );
            self.store.save_index(&index)?;
        }

        let mut map = self.store.load_profile_map(&key.suffix, &derived)?;
        if map.contains_key(name) {
            return Err(ProfileError::AlreadyExists(name.to_string()).into());
        }

        let data = ProfileData {
            description: non_empty(description),
            account: non_empty(account),
            outputs: Vec::new(),
        };
        let profile = Profile::from_data(name, &key.suffix, &data);
        map.insert(name.to_string(), data);
        self.store.save_profile_map(&key.suffix, &map, &derived)?;

        debug!(name, suffix = %key.suffix, "profile created");
        Ok(profile)
    }

    /// Change description and/or account.
    ///
    /// `None` leaves a field untouched; an empty string clears it.
    pub fn update_profile(
        &mut self,
        profile: &Profile,
        description: Option<&str>,
        account: Option<&str>,
    ) -> Result<Profile> {
        let (key, mut map) = self.load_suffix(&profile.suffix)?;
        let data = entry_mut(&mut map, &profile.name)?;

        if let Some(description) = description {
            data.description = non_empty(Some(description));
        }
        if let Some(account) = account {
            data.account = non_empty(Some(account));
        }
        let updated = Profile::from_data(&profile.name, &profile.suffix, data);

        self.store.save_profile_map(&profile.suffix, &map, &key)?;
        debug!(name = %profile.name, "profile updated");
        Ok(updated)
    }

    /// Delete a profile and the templates only it references.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotFound` if no such profile exists.
    pub fn delete_profile(&mut self, name: &str) -> Result<()> {
        let profile = self.get_profile(name)?;
        let (key, mut map) = self.load_suffix(&profile.suffix)?;

        let removed = map
            .remove(&profile.name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;

        for output in &removed.outputs {
            self.release_template(&profile.suffix, &map, &output.template)?;
        }

        self.store.save_profile_map(&profile.suffix, &map, &key)?;
        info!(name, suffix = %profile.suffix, outputs = removed.outputs.len(), "profile deleted");
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
