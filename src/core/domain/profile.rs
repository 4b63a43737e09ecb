//! Profile and output types.
//!
//! [`ProfileData`] is the serialized form stored inside a suffix's encrypted
//! profile blob; [`Profile`] is the flattened view handed to callers, tagged
//! with the suffix that owns it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How an output is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Written to a file at `target`.
    File,
    /// Injected into the child environment.
    Env,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Env => f.write_str("env"),
        }
    }
}

/// A profile's declaration that one template is materialized somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Content address of the encrypted template blob.
    pub template: String,
    #[serde(rename = "type")]
    pub kind: OutputKind,
    /// Destination path (`/...` or `~/...`), file outputs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Output {
    pub fn file(template: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            kind: OutputKind::File,
            target: Some(target.into()),
        }
    }

    pub fn env(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            kind: OutputKind::Env,
            target: None,
        }
    }

    /// True for a file output writing to `target`.
    pub fn is_file_at(&self, target: &str) -> bool {
        self.kind == OutputKind::File && self.target.as_deref() == Some(target)
    }
}

/// Serialized profile entry inside an encrypted profile blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Secret manager account used when resolving references.
    #[serde(default, rename = "op_account", skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

/// All profiles owned by one suffix, by name.
pub type ProfileMap = BTreeMap<String, ProfileData>;

/// A profile as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub description: Option<String>,
    pub account: Option<String>,
    pub outputs: Vec<Output>,
    /// Suffix of the key whose blob holds this profile.
    pub suffix: String,
}

impl Profile {
    pub fn from_data(name: &str, suffix: &str, data: &ProfileData) -> Self {
        Self {
            name: name.to_string(),
            description: data.description.clone(),
            account: data.account.clone(),
            outputs: data.outputs.clone(),
            suffix: suffix.to_string(),
        }
    }

    /// File outputs in declaration order.
    pub fn file_outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter().filter(|o| o.kind == OutputKind::File)
    }

    /// The single env output, if any.
    pub fn env_output(&self) -> Option<&Output> {
        self.outputs.iter().find(|o| o.kind == OutputKind::Env)
    }

    /// The file output writing to `target`, if any.
    pub fn file_output(&self, target: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.is_file_at(target))
    }

    /// Targets of all file outputs.
    pub fn file_targets(&self) -> Vec<String> {
        self.file_outputs()
            .filter_map(|o| o.target.clone())
            .collect()
    }
}
