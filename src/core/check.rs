//! Store consistency check.
//!
//! Compares, per readable suffix, the template blobs on disk with the
//! addresses the profile map references. Blobs nobody references are
//! orphaned and safe to prune. Outputs whose blob is missing are dangling
//! and can only be repaired by re-adding the content.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::core::domain::Output;
use crate::core::profiles::Profiles;
use crate::error::{AgentError, Result};

/// An output whose template blob is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dangling {
    pub profile: String,
    pub output: Output,
}

/// Findings for one suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixReport {
    pub suffix: String,
    pub profiles: usize,
    pub templates: usize,
    pub orphaned: Vec<String>,
    pub dangling: Vec<Dangling>,
}

/// Findings for the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub suffixes: Vec<SuffixReport>,
    /// Indexed suffixes whose key is not in the agent.
    pub unreadable: Vec<String>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.suffixes
            .iter()
            .all(|s| s.orphaned.is_empty() && s.dangling.is_empty())
    }

    pub fn orphan_count(&self) -> usize {
        self.suffixes.iter().map(|s| s.orphaned.len()).sum()
    }

    pub fn dangling_count(&self) -> usize {
        self.suffixes.iter().map(|s| s.dangling.len()).sum()
    }
}

/// Inspect every indexed suffix the agent can decrypt.
///
/// # Errors
///
/// Returns `AgentError::NoUsableKeys` if the agent holds no usable key.
pub fn check(profiles: &mut Profiles) -> Result<CheckReport> {
    let keys = profiles.usable_keys();
    if keys.is_empty() {
        return Err(AgentError::NoUsableKeys.into());
    }

    let index = profiles.store().load_index()?;
    let mut report = CheckReport::default();

    for suffix in index.suffixes() {
        let Some(key) = keys.iter().find(|k| k.suffix == suffix) else {
            report.unreadable.push(suffix.to_string());
            continue;
        };

        let derived = profiles.derive(key)?;
        let store = profiles.store();
        let map = store.load_profile_map(suffix, &derived)?;
        let stored: BTreeSet<String> = store.list_templates(suffix)?.into_iter().collect();

        let referenced: BTreeSet<&str> = map
            .values()
            .flat_map(|data| data.outputs.iter())
            .map(|o| o.template.as_str())
            .collect();

        let orphaned: Vec<String> = stored
            .iter()
            .filter(|a| !referenced.contains(a.as_str()))
            .cloned()
            .collect();

        let dangling: Vec<Dangling> = map
            .iter()
            .flat_map(|(name, data)| {
                data.outputs.iter().map(move |o| (name, o))
            })
            .filter(|(_, o)| !stored.contains(&o.template))
            .map(|(name, o)| Dangling {
                profile: name.clone(),
                output: o.clone(),
            })
            .collect();

        debug!(suffix, orphaned = orphaned.len(), dangling = dangling.len(), "checked suffix");
        report.suffixes.push(SuffixReport {
            suffix: suffix.to_string(),
            profiles: map.len(),
            templates: stored.len(),
            orphaned,
            dangling,
        });
    }

    Ok(report)
}

/// Delete the orphaned blobs listed in `report`. Returns how many.
pub fn prune(profiles: &Profiles, report: &CheckReport) -> Result<usize> {
    let mut removed = 0;
    for suffix in &report.suffixes {
        for address in &suffix.orphaned {
            profiles.store().delete_template(&suffix.suffix, address)?;
            removed += 1;
        }
    }
    info!(removed, "pruned orphaned templates");
    Ok(removed)
}
