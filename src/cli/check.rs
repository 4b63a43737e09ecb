//! Check command.
//!
//! Reports orphaned template blobs and outputs whose blob is missing.

use crate::cli::{open, output};
use crate::core::check::{check, prune};
use crate::error::Result;

/// Inspect the store and optionally delete orphaned templates.
pub fn execute(prune_orphans: bool) -> Result<()> {
    let (_, mut profiles) = open()?;
    let report = check(&mut profiles)?;

    for suffix in &report.suffixes {
        output::header(&format!("key {}", suffix.suffix));
        output::kv("profiles", suffix.profiles);
        output::kv("templates", suffix.templates);
        for address in &suffix.orphaned {
            output::warn(&format!("orphaned template {}", address));
        }
        for d in &suffix.dangling {
            let what = match d.output.target.as_deref() {
                Some(target) => format!("{} file {}", d.profile, target),
                None => format!("{} env", d.profile),
            };
            output::warn(&format!("missing template {} ({})", d.output.template, what));
        }
    }

    for suffix in &report.unreadable {
        output::dimmed(&format!("skipped key {} (not in agent)", suffix));
    }

    if report.is_clean() {
        output::success("store is consistent");
        return Ok(());
    }

    if prune_orphans && report.orphan_count() > 0 {
        let removed = prune(&profiles, &report)?;
        output::success(&format!("removed {}", output::count(removed, "orphaned template")));
    } else if report.orphan_count() > 0 {
        output::hint("run: cfg check --prune");
    }

    if report.dangling_count() > 0 {
        output::hint("re-add the missing content with: cfg edit <profile> file|env");
    }
    Ok(())
}
