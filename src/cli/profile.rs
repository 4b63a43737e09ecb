//! Profile management commands.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cli::{open, output, select, Kind};
use crate::core::domain::{Output, Profile};
use crate::core::paths;
use crate::core::profiles::Profiles;
use crate::error::{AgentError, Error, Result, StoreError};

/// Starter body for a new env template.
const ENV_TEMPLATE_HINT: &str = "# Environment variables (dotenv format)\n# KEY=op://vault/item/field\n";

/// List profiles.
pub fn list(json: bool) -> Result<()> {
    let (_, mut profiles) = open()?;
    let mut all = profiles.list_profiles()?;
    all.sort_by(|a, b| a.name.cmp(&b.name));

    if json {
        let items: Vec<_> = all
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "description": p.description,
                    "account": p.account,
                    "key": p.suffix,
                    "outputs": p.outputs.len(),
                })
            })
            .collect();
        let result = serde_json::json!({
            "profiles": items,
            "count": all.len(),
        });
        output::data(&serde_json::to_string_pretty(&result)?);
    } else if all.is_empty() {
        output::dimmed("no profiles configured");
        output::hint("run: cfg add <name>");
    } else {
        let rows: Vec<Vec<String>> = all
            .iter()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.description.clone().unwrap_or_default(),
                    p.suffix.clone(),
                ]
            })
            .collect();
        output::table(&["Name", "Description", "Key"], &rows);
    }

    Ok(())
}

/// List usable agent keys and whether the store knows them.
pub fn keys() -> Result<()> {
    let (_, profiles) = open()?;
    let keys = profiles.usable_keys();
    if keys.is_empty() {
        return Err(AgentError::NoUsableKeys.into());
    }

    let index = profiles.store().load_index()?;
    let rows: Vec<Vec<String>> = keys
        .iter()
        .map(|k| {
            vec![
                k.suffix.clone(),
                k.comment().unwrap_or("").to_string(),
                if index.contains(&k.suffix) {
                    "in use".to_string()
                } else {
                    "unused".to_string()
                },
            ]
        })
        .collect();
    output::table(&["Key", "Comment", "Store"], &rows);
    Ok(())
}

/// Create a profile.
pub fn add(
    name: &str,
    description: Option<&str>,
    account: Option<&str>,
    key_suffix: Option<&str>,
) -> Result<()> {
    let (_, mut profiles) = open()?;
    let keys = profiles.usable_keys();
    let key = select::key(&keys, key_suffix)?;

    let profile = profiles.create_profile(name, description, account, &key)?;
    info!(name = %profile.name, suffix = %profile.suffix, "created profile");
    output::success(&format!(
        "created profile {} (key {})",
        output::name(&profile.name),
        profile.suffix
    ));
    Ok(())
}

/// Import a local file as a file template.
pub fn import(name: &str, file: &str, target: Option<&str>) -> Result<()> {
    let (_, mut profiles) = open()?;
    let profile = select::profile(&mut profiles, name)?;

    let source = std::fs::canonicalize(file).map_err(|e| StoreError::ReadFailed {
        path: file.to_string(),
        source: e,
    })?;
    let target = match target {
        Some(t) => t.to_string(),
        None => paths::contract_with(&source, &paths::home_dir()?),
    };

    profiles.import_file(&profile, &source, &target)?;
    output::success(&format!(
        "imported {} -> {}",
        output::path(file),
        output::path(&target)
    ));
    Ok(())
}

#[derive(Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    op_account: Option<&'a str>,
    key: &'a str,
    outputs: &'a [Output],
}

/// Show a profile, or the decrypted body of one of its templates.
pub fn show(name: &str, kind: Option<Kind>, target: Option<&str>) -> Result<()> {
    let (_, mut profiles) = open()?;
    let profile = select::profile(&mut profiles, name)?;

    match kind {
        None => {
            let view = ProfileView {
                name: &profile.name,
                description: profile.description.as_deref(),
                op_account: profile.account.as_deref(),
                key: &profile.suffix,
                outputs: &profile.outputs,
            };
            let yaml = serde_yaml::to_string(&view).map_err(|e| StoreError::Serialize {
                what: "profile",
                reason: e.to_string(),
            })?;
            print!("{}", yaml);
        }
        Some(Kind::File) => {
            let target = require_target(&profile, target)?;
            let file = profile
                .file_output(&target)
                .ok_or_else(|| StoreError::TemplateNotFound(target.clone()))?
                .clone();
            print_bytes(&profiles.get_output_content(&profile, &file)?)?;
        }
        Some(Kind::Env) => {
            let env = profile
                .env_output()
                .ok_or_else(|| StoreError::TemplateNotFound("no env template".to_string()))?
                .clone();
            print_bytes(&profiles.get_output_content(&profile, &env)?)?;
        }
    }

    Ok(())
}

/// Write template bytes to stdout unchanged.
pub(crate) fn print_bytes(content: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(content)?;
    stdout.flush()?;
    Ok(())
}

/// Editable metadata document.
#[derive(Serialize, Deserialize, Default)]
struct Metadata {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    op_account: Option<String>,
}

/// Edit metadata or a template in the external editor.
pub fn edit(name: &str, kind: Option<Kind>, target: Option<&str>) -> Result<()> {
    let (_, mut profiles) = open()?;
    let profile = select::profile(&mut profiles, name)?;

    match kind {
        None => edit_metadata(&mut profiles, &profile),
        Some(Kind::File) => edit_file(&mut profiles, &profile, target),
        Some(Kind::Env) => edit_env(&mut profiles, &profile),
    }
}

fn edit_metadata(profiles: &mut Profiles, profile: &Profile) -> Result<()> {
    let current = Metadata {
        description: profile.description.clone(),
        op_account: profile.account.clone(),
    };
    let yaml = serde_yaml::to_string(&current).map_err(|e| StoreError::Serialize {
        what: "profile metadata",
        reason: e.to_string(),
    })?;

    let Some(edited) = select::edit(&yaml, ".yaml")? else {
        select::no_changes();
        return Ok(());
    };

    let metadata: Metadata = if edited.trim().is_empty() {
        Metadata::default()
    } else {
        serde_yaml::from_str(&edited).map_err(|e| StoreError::Parse {
            what: "profile metadata",
            reason: e.to_string(),
        })?
    };

    // Fields removed in the editor are cleared.
    profiles.update_profile(
        profile,
        Some(metadata.description.as_deref().unwrap_or("")),
        Some(metadata.op_account.as_deref().unwrap_or("")),
    )?;
    output::success("profile updated");
    Ok(())
}

fn edit_file(profiles: &mut Profiles, profile: &Profile, target: Option<&str>) -> Result<()> {
    let targets = profile.file_targets();

    let existing = match target {
        Some(t) => profile.file_output(t).cloned(),
        None if targets.is_empty() => None,
        None => {
            let chosen = select::target(&targets, None)?
                .ok_or_else(|| Error::Other("no file selected".to_string()))?;
            profile.file_output(&chosen).cloned()
        }
    };

    if let Some(current) = existing {
        let target = current.target.clone().unwrap_or_default();
        let content = profiles.get_output_text(profile, &current)?;
        match select::edit(&content, &select::extension_for(&target))? {
            Some(new) => {
                profiles.update_output_content(profile, &current, &new)?;
                output::success(&format!("updated {}", output::path(&target)));
            }
            None => select::no_changes(),
        }
        return Ok(());
    }

    let target = match target {
        Some(t) => t.to_string(),
        None => prompt_target()?,
    };
    crate::core::validation::validate_target(&target)?;

    let Some(content) = select::edit("", &select::extension_for(&target))? else {
        return Err(Error::Other("no content".to_string()));
    };
    profiles.add_file_template(profile, &target, &content)?;
    output::success(&format!("created file template {}", output::path(&target)));
    Ok(())
}

fn edit_env(profiles: &mut Profiles, profile: &Profile) -> Result<()> {
    if let Some(current) = profile.env_output().cloned() {
        let content = profiles.get_output_text(profile, &current)?;
        match select::edit(&content, ".env")? {
            Some(new) => {
                profiles.update_output_content(profile, &current, &new)?;
                output::success("env template updated");
            }
            None => select::no_changes(),
        }
        return Ok(());
    }

    let Some(content) = select::edit(ENV_TEMPLATE_HINT, ".env")? else {
        return Err(Error::Other("no content".to_string()));
    };
    profiles.add_env_template(profile, &content)?;
    output::success("created env template");
    Ok(())
}

fn prompt_target() -> Result<String> {
    let target: String = dialoguer::Input::new()
        .with_prompt("Target path")
        .interact_text()?;
    Ok(target.trim().to_string())
}

/// Delete a profile or one of its templates.
pub fn delete(name: &str, kind: Option<Kind>, target: Option<&str>) -> Result<()> {
    let (_, mut profiles) = open()?;
    let profile = select::profile(&mut profiles, name)?;

    match kind {
        None => {
            profiles.delete_profile(&profile.name)?;
            output::success(&format!("deleted profile {}", output::name(&profile.name)));
        }
        Some(Kind::File) => {
            let target = require_target(&profile, target)?;
            profiles.delete_file_output(&profile, &target)?;
            output::success(&format!("deleted file template {}", output::path(&target)));
        }
        Some(Kind::Env) => {
            if profile.env_output().is_none() {
                output::dimmed("no env template");
                return Ok(());
            }
            profiles.delete_env_output(&profile)?;
            output::success("deleted env template");
        }
    }

    Ok(())
}

/// Print the name of a profile chosen by prefix or picker.
pub fn select(prefix: Option<&str>) -> Result<()> {
    let (_, mut profiles) = open()?;

    let profile = match prefix {
        Some(prefix) => select::profile(&mut profiles, prefix)?,
        None => {
            let mut all = profiles.list_profiles()?;
            all.sort_by(|a, b| a.name.cmp(&b.name));
            select::choose_profile(all)?
                .ok_or_else(|| Error::Other("no profile selected".to_string()))?
        }
    };

    output::data(&profile.name);
    Ok(())
}

/// Exit 0 when a profile name starts with `prefix`, 1 otherwise.
pub fn has_profiles(prefix: &str) -> Result<()> {
    let (_, mut profiles) = open()?;
    let found = match profiles.has_profiles(prefix) {
        Ok(found) => found,
        Err(Error::Agent(AgentError::NoUsableKeys)) => false,
        Err(e) => return Err(e),
    };
    std::process::exit(if found { 0 } else { 1 });
}

/// The file target to act on: given, the only one, or picked.
fn require_target(profile: &Profile, given: Option<&str>) -> Result<String> {
    let targets = profile.file_targets();
    if targets.is_empty() {
        return Err(StoreError::TemplateNotFound("no file templates".to_string()).into());
    }

    match select::target(&targets, given)? {
        Some(t) => Ok(t),
        None => match given {
            Some(g) => Err(StoreError::TemplateNotFound(g.to_string()).into()),
            None => Err(Error::Other("no file selected".to_string())),
        },
    }
}
