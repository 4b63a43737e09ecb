//! Output and template operations.
//!
//! A new template blob is always written before the profile map that points
//! at it, and an old blob is only released after the map no longer needs it.
//! An interrupted update can leave an orphaned blob behind, never a dangling
//! output.

use std::path::Path;

use tracing::{debug, warn};

use super::{entry_mut, Profiles};
use crate::core::domain::{Output, OutputKind, Profile};
use crate::core::store::generate_address;
use crate::core::validation::validate_target;
use crate::error::{Result, StoreError};

impl Profiles {
    /// Add a file output, replacing any output with the same target.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidTarget` unless `target` starts with `/`
    /// or `~/`.
    pub fn add_file_template(
        &mut self,
        profile: &Profile,
        target: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<Profile> {
        validate_target(target)?;
        let content = content.as_ref();
        let address = generate_address(content);
        self.put_output(profile, content, Output::file(address, target), |o| {
            o.is_file_at(target)
        })
    }

    /// Set the profile's env output, replacing the existing one.
    pub fn add_env_template(
        &mut self,
        profile: &Profile,
        content: impl AsRef<[u8]>,
    ) -> Result<Profile> {
        let content = content.as_ref();
        let address = generate_address(content);
        self.put_output(profile, content, Output::env(address), |o| {
            o.kind == OutputKind::Env
        })
    }

    /// Replace the body of an existing output, keeping its position.
    ///
    /// Unknown outputs leave the profile unchanged.
    pub fn update_output_content(
        &mut self,
        profile: &Profile,
        output: &Output,
        content: impl AsRef<[u8]>,
    ) -> Result<Profile> {
        let content = content.as_ref();
        let (key, mut map) = self.load_suffix(&profile.suffix)?;
        let address = generate_address(content);

        let data = entry_mut(&mut map, &profile.name)?;
        let Some(pos) = data.outputs.iter().position(|o| o == output) else {
            warn!(name = %profile.name, template = %output.template, "output not found, nothing to update");
            return Ok(Profile::from_data(&profile.name, &profile.suffix, data));
        };
        let old = std::mem::replace(&mut data.outputs[pos].template, address.clone());
        let updated = Profile::from_data(&profile.name, &profile.suffix, data);

        self.store
            .save_template(&profile.suffix, &address, content, &key)?;
        self.store.save_profile_map(&profile.suffix, &map, &key)?;
        self.release_template(&profile.suffix, &map, &old)?;

        debug!(name = %profile.name, old = %old, new = %address, "output content updated");
        Ok(updated)
    }

    /// Remove the file output for `target`; no-op if there is none.
    pub fn delete_file_output(&mut self, profile: &Profile, target: &str) -> Result<Profile> {
        self.remove_output(profile, |o| o.is_file_at(target))
    }

    /// Remove the env output; no-op if there is none.
    pub fn delete_env_output(&mut self, profile: &Profile) -> Result<Profile> {
        self.remove_output(profile, |o| o.kind == OutputKind::Env)
    }

    /// Decrypted template body of `output`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TemplateNotFound` if the blob is missing.
    pub fn get_output_content(&mut self, profile: &Profile, output: &Output) -> Result<Vec<u8>> {
        let key = self.derive_for_suffix(&profile.suffix)?;
        self.store
            .load_template(&profile.suffix, &output.template, &key)
    }

    /// Template body of `output` as text.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotText` if the body is not UTF-8.
    pub fn get_output_text(&mut self, profile: &Profile, output: &Output) -> Result<String> {
        let content = self.get_output_content(profile, output)?;
        String::from_utf8(content)
            .map_err(|_| StoreError::NotText(output.template.clone()).into())
    }

    /// Store a local file's bytes as a file output for `target`.
    pub fn import_file(&mut self, profile: &Profile, source: &Path, target: &str) -> Result<Profile> {
        let content = std::fs::read(source).map_err(|e| StoreError::ReadFailed {
            path: source.display().to_string(),
            source: e,
        })?;
        debug!(source = %source.display(), target, len = content.len(), "importing file");
        self.add_file_template(profile, target, &content)
    }

    fn put_output(
        &mut self,
        profile: &Profile,
        content: &[u8],
        output: Output,
        replaces: impl Fn(&Output) -> bool,
    ) -> Result<Profile> {
        let (key, mut map) = self.load_suffix(&profile.suffix)?;

        let data = entry_mut(&mut map, &profile.name)?;
        let position = data.outputs.iter().position(|o| replaces(o));
        let replaced = position.map(|i| data.outputs.remove(i));
        let address = output.template.clone();
        data.outputs.push(output);
        let updated = Profile::from_data(&profile.name, &profile.suffix, data);

        self.store
            .save_template(&profile.suffix, &address, content, &key)?;
        self.store.save_profile_map(&profile.suffix, &map, &key)?;
        if let Some(old) = replaced {
            self.release_template(&profile.suffix, &map, &old.template)?;
        }

        debug!(name = %profile.name, address = %address, "output stored");
        Ok(updated)
    }

    fn remove_output(
        &mut self,
        profile: &Profile,
        matches: impl Fn(&Output) -> bool,
    ) -> Result<Profile> {
        let (key, mut map) = self.load_suffix(&profile.suffix)?;

        let data = entry_mut(&mut map, &profile.name)?;
        let Some(pos) = data.outputs.iter().position(|o| matches(o)) else {
            return Ok(Profile::from_data(&profile.name, &profile.suffix, data));
        };
        let removed = data.outputs.remove(pos);
        let updated = Profile::from_data(&profile.name, &profile.suffix, data);

        self.store.save_profile_map(&profile.suffix, &map, &key)?;
        self.release_template(&profile.suffix, &map, &removed.template)?;

        debug!(name = %profile.name, kind = %removed.kind, "output removed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::agent::testing::{key, KEY_A};
    use crate::core::domain::{Output, OutputKind};
    use crate::core::profiles::tests::setup;
    use crate::core::store::generate_address;
    use crate::error::{Error, ProfileError, StoreError};

    #[test]
    fn test_add_file_template() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let a = key(KEY_A);
        let p = profiles.create_profile("alpha", None, None, &a).unwrap();

        let p = profiles.add_file_template(&p, "~/.npmrc", "token=x").unwrap();
        assert_eq!(p.outputs, vec![Output::file(generate_address(b"token=x"), "~/.npmrc")]);

        let stored = profiles.get_profile("alpha").unwrap();
        assert_eq!(stored, p);
        let out = stored.file_output("~/.npmrc").unwrap().clone();
        assert_eq!(profiles.get_output_text(&stored, &out).unwrap(), "token=x");
    }

    #[test]
    fn test_add_file_template_rejects_relative_target() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let err = profiles.add_file_template(&p, ".npmrc", "x").unwrap_err();
        assert!(matches!(err, Error::Profile(ProfileError::InvalidTarget(_))));
        assert!(profiles.get_profile("alpha").unwrap().outputs.is_empty());
    }

    #[test]
    fn test_add_file_template_replaces_same_target() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let a = key(KEY_A);
        let p = profiles.create_profile("alpha", None, None, &a).unwrap();

        let p = profiles.add_file_template(&p, "~/.npmrc", "v1").unwrap();
        let p = profiles.add_file_template(&p, "~/.aws/config", "aws").unwrap();
        let p = profiles.add_file_template(&p, "~/.npmrc", "v2").unwrap();

        assert_eq!(p.file_targets(), vec!["~/.aws/config", "~/.npmrc"]);
        assert!(!profiles.store().has_template(&a.suffix, &generate_address(b"v1")));
        assert!(profiles.store().has_template(&a.suffix, &generate_address(b"v2")));
    }

    #[test]
    fn test_add_same_content_twice_keeps_blob() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let a = key(KEY_A);
        let p = profiles.create_profile("alpha", None, None, &a).unwrap();

        let p = profiles.add_file_template(&p, "~/.npmrc", "same").unwrap();
        let p = profiles.add_file_template(&p, "~/.npmrc", "same").unwrap();

        assert_eq!(p.outputs.len(), 1);
        let out = p.outputs[0].clone();
        assert_eq!(profiles.get_output_text(&p, &out).unwrap(), "same");
    }

    #[test]
    fn test_env_template_is_single() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();

        let p = profiles.add_env_template(&p, "A=1").unwrap();
        let p = profiles.add_env_template(&p, "A=2").unwrap();

        let envs: Vec<_> = p.outputs.iter().filter(|o| o.kind == OutputKind::Env).collect();
        assert_eq!(envs.len(), 1);
        let env = envs[0].clone();
        assert_eq!(profiles.get_output_text(&p, &env).unwrap(), "A=2");
    }

    #[test]
    fn test_update_output_content_in_place() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let a = key(KEY_A);
        let p = profiles.create_profile("alpha", None, None, &a).unwrap();
        let p = profiles.add_file_template(&p, "~/.first", "one").unwrap();
        let p = profiles.add_file_template(&p, "~/.second", "two").unwrap();

        let first = p.outputs[0].clone();
        let p = profiles.update_output_content(&p, &first, "uno").unwrap();

        assert_eq!(p.file_targets(), vec!["~/.first", "~/.second"]);
        assert_eq!(p.outputs[0].template, generate_address(b"uno"));
        assert!(!profiles.store().has_template(&a.suffix, &first.template));
        let updated = p.outputs[0].clone();
        assert_eq!(profiles.get_output_text(&p, &updated).unwrap(), "uno");
    }

    #[test]
    fn test_update_shared_content_keeps_other_reference() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let a = key(KEY_A);
        let p = profiles.create_profile("alpha", None, None, &a).unwrap();
        let p = profiles.add_file_template(&p, "~/.one", "shared").unwrap();
        let p = profiles.add_file_template(&p, "~/.two", "shared").unwrap();

        let one = p.outputs[0].clone();
        let p = profiles.update_output_content(&p, &one, "changed").unwrap();

        let two = p.file_output("~/.two").unwrap().clone();
        assert_eq!(profiles.get_output_text(&p, &two).unwrap(), "shared");
    }

    #[test]
    fn test_update_unknown_output_is_noop() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let ghost = Output::env("0000000.enc");
        let after = profiles.update_output_content(&p, &ghost, "x").unwrap();
        assert_eq!(after, p);
    }

    #[test]
    fn test_delete_outputs() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let a = key(KEY_A);
        let p = profiles.create_profile("alpha", None, None, &a).unwrap();
        let p = profiles.add_file_template(&p, "~/.npmrc", "file").unwrap();
        let p = profiles.add_env_template(&p, "E=1").unwrap();

        let p = profiles.delete_file_output(&p, "~/.npmrc").unwrap();
        assert!(p.file_output("~/.npmrc").is_none());
        assert!(!profiles.store().has_template(&a.suffix, &generate_address(b"file")));

        // Missing target: unchanged
        let same = profiles.delete_file_output(&p, "~/.missing").unwrap();
        assert_eq!(same, p);

        let p = profiles.delete_env_output(&p).unwrap();
        assert!(p.outputs.is_empty());
        assert!(!profiles.store().has_template(&a.suffix, &generate_address(b"E=1")));
        assert_eq!(profiles.delete_env_output(&p).unwrap(), p);
    }

    #[test]
    fn test_get_output_content_missing_blob() {
        let (_tmp, mut profiles) = setup(&[KEY_A]);
        let a = key(KEY_A);
        let p = profiles.create_profile("alpha", None, None, &a).unwrap();
        let p = profiles.add_env_template(&p, "E=1").unwrap();
        let env = p.outputs[0].clone();

        profiles.store().delete_template(&a.suffix, &env.template).unwrap();

        let err = profiles.get_output_content(&p, &env).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::TemplateNotFound(_))));
    }

    #[test]
    fn test_import_file() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let source = tmp.path().join("gitconfig");
        std::fs::write(&source, "[user]\n  name = A\n").unwrap();

        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.import_file(&p, &source, "~/.gitconfig").unwrap();
        let out = p.file_output("~/.gitconfig").unwrap().clone();
        assert_eq!(
            profiles.get_output_text(&p, &out).unwrap(),
            "[user]\n  name = A\n"
        );

        let err = profiles
            .import_file(&p, &tmp.path().join("missing"), "~/.x")
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::ReadFailed { .. })));
    }

    #[test]
    fn test_import_binary_file() {
        let (tmp, mut profiles) = setup(&[KEY_A]);
        let body = [0x30u8, 0x82, 0xff, 0xfe, 0x00, 0x01];
        let source = tmp.path().join("keystore.p12");
        std::fs::write(&source, body).unwrap();

        let p = profiles.create_profile("alpha", None, None, &key(KEY_A)).unwrap();
        let p = profiles.import_file(&p, &source, "~/.keystore.p12").unwrap();
        let out = p.file_output("~/.keystore.p12").unwrap().clone();

        assert_eq!(out.template, generate_address(&body));
        assert_eq!(profiles.get_output_content(&p, &out).unwrap(), body);

        let err = profiles.get_output_text(&p, &out).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotText(_))));
    }
}
