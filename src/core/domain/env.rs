//! Env type.
//!
//! Represents a parsed dotenv-style template body with typed access.

use crate::error::Result;
use std::path::Path;

/// A parsed dotenv body, entries in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    entries: Vec<(String, String)>,
}

impl Env {
    /// Parse dotenv text.
    ///
    /// Skips empty lines, comments (lines starting with #) and lines without
    /// `=`. Supports values with or without quotes and an optional leading
    /// `export `.
    pub fn parse(contents: &str) -> Self {
        let mut entries = Vec::new();

        for line in contents.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                entries.push((key.to_string(), parse_env_value(value.trim())));
            }
        }

        Self { entries }
    }

    /// Parse a dotenv file from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Create from raw key-value pairs
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { entries: pairs }
    }

    /// All entries as key-value pairs
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as `export KEY='value'` lines, one per entry.
    pub fn to_exports(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("export {}={}", k, shell_quote(v)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Single-quote a value for POSIX shells.
///
/// Embedded single quotes become `'\''`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn parse_env_value(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return unescape_double_quoted(&raw[1..raw.len() - 1]);
    }

    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].to_string();
    }

    raw.to_string()
}

fn unescape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
