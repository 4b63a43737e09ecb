//! Interactive pickers and the external editor.
//!
//! Pickers only prompt on a terminal. Without one, a choice that needs the
//! user fails with a message listing the candidates.

use std::io::{self, IsTerminal};

use dialoguer::{Editor, Select};

use crate::cli::output;
use crate::core::agent::AgentKey;
use crate::core::domain::Profile;
use crate::core::profiles::{NameMatch, Profiles};
use crate::error::{AgentError, Error, ProfileError, Result};

fn interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

fn pick(prompt: &str, items: &[String]) -> Result<Option<usize>> {
    Ok(Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()?)
}

fn profile_label(profile: &Profile) -> String {
    match profile.description.as_deref() {
        Some(d) => format!("{} - {}", profile.name, d),
        None => profile.name.clone(),
    }
}

/// Find a profile by exact name or unique prefix, asking when ambiguous.
pub fn profile(profiles: &mut Profiles, name: &str) -> Result<Profile> {
    match profiles.resolve_name(name)? {
        NameMatch::Found(p) => Ok(p),
        NameMatch::Missing => Err(ProfileError::NotFound(name.to_string()).into()),
        NameMatch::Ambiguous(candidates) => {
            choose_profile(candidates)?.ok_or_else(|| ProfileError::NotFound(name.to_string()).into())
        }
    }
}

/// Let the user choose among `candidates`. `None` when cancelled.
pub fn choose_profile(mut candidates: Vec<Profile>) -> Result<Option<Profile>> {
    match candidates.len() {
        0 => return Ok(None),
        1 => return Ok(candidates.pop()),
        _ => {}
    }

    if !interactive() {
        let names: Vec<&str> = candidates.iter().map(|p| p.name.as_str()).collect();
        return Err(Error::Other(format!(
            "several profiles match: {}",
            names.join(", ")
        )));
    }

    let items: Vec<String> = candidates.iter().map(profile_label).collect();
    Ok(pick("Select profile", &items)?.map(|i| candidates.swap_remove(i)))
}

/// Choose a file target. `None` when there are none or the user cancels.
pub fn target(targets: &[String], given: Option<&str>) -> Result<Option<String>> {
    if let Some(given) = given {
        return Ok(targets.iter().find(|t| *t == given).cloned());
    }

    match targets {
        [] => Ok(None),
        [only] => Ok(Some(only.clone())),
        _ if !interactive() => Err(Error::Other(format!(
            "several file templates: {}; pass --target",
            targets.join(", ")
        ))),
        _ => Ok(pick("Select file", targets)?.map(|i| targets[i].clone())),
    }
}

/// Choose the agent key a new profile is stored under.
///
/// `suffix` selects one directly.
pub fn key(keys: &[AgentKey], suffix: Option<&str>) -> Result<AgentKey> {
    if let Some(suffix) = suffix {
        return keys
            .iter()
            .find(|k| k.suffix == suffix)
            .cloned()
            .ok_or_else(|| AgentError::KeyNotFound(suffix.to_string()).into());
    }

    match keys {
        [] => Err(AgentError::NoUsableKeys.into()),
        [only] => Ok(only.clone()),
        _ if !interactive() => {
            let suffixes: Vec<&str> = keys.iter().map(|k| k.suffix.as_str()).collect();
            Err(Error::Other(format!(
                "several keys available ({}); pass --key <suffix>",
                suffixes.join(", ")
            )))
        }
        _ => {
            let items: Vec<String> = keys
                .iter()
                .map(|k| format!("{}  {}", k.suffix, k.comment().unwrap_or("")))
                .collect();
            let index = pick("Select SSH key", &items)?
                .ok_or_else(|| Error::Other("no key selected".to_string()))?;
            Ok(keys[index].clone())
        }
    }
}

/// Open `content` in `$VISUAL`/`$EDITOR`.
///
/// Returns `None` when the editor exits without saving or nothing changed.
pub fn edit(content: &str, extension: &str) -> Result<Option<String>> {
    let edited = Editor::new().extension(extension).edit(content)?;
    Ok(edited.filter(|new| new != content))
}

/// Editor file extension for a target (`.txt` when it has none).
pub fn extension_for(target: &str) -> String {
    std::path::Path::new(target)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".txt".to_string())
}

/// Print a "nothing to do" line.
pub fn no_changes() {
    output::dimmed("no changes");
}
