//! Shared CLI output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, checkmarks
//! - Red: errors
//! - Yellow: warnings
//! - Cyan: paths, profile names, hints
//! - Bold: headers
//! - Dimmed: secondary info
//!
//! Status lines go to stderr; `data` is the only stdout channel, so command
//! output stays pipeable.

use console::style;
use std::fmt::Display;

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Print a success message with checkmark (green).
///
/// Example: `✓ created profile work`
pub fn success(msg: &str) {
    if colors_enabled() {
        eprintln!("{} {}", style("✓").for_stderr().green(), msg);
    } else {
        eprintln!("✓ {}", msg);
    }
}

/// Print an error message (red).
///
/// Example: `✗ profile not found: work`
pub fn error(msg: &str) {
    if colors_enabled() {
        eprintln!("{} {}", style("✗").for_stderr().red(), msg);
    } else {
        eprintln!("✗ {}", msg);
    }
}

/// Print a warning message (yellow).
pub fn warn(msg: &str) {
    if colors_enabled() {
        eprintln!("{} {}", style("⚠").for_stderr().yellow(), msg);
    } else {
        eprintln!("⚠ {}", msg);
    }
}

/// Print a hint message (cyan).
///
/// Example: `→ run: cfg list`
pub fn hint(msg: &str) {
    if colors_enabled() {
        eprintln!(
            "{} {}",
            style("→").for_stderr().cyan(),
            style(msg).for_stderr().cyan()
        );
    } else {
        eprintln!("→ {}", msg);
    }
}

/// Print a bold header.
pub fn header(title: &str) {
    if colors_enabled() {
        println!("{}", style(title).bold());
    } else {
        println!("{}", title);
    }
}

/// Print a key-value pair (label dimmed).
///
/// Example: `  suffix  a1b2c3`
pub fn kv(label: &str, value: impl Display) {
    if colors_enabled() {
        println!("  {}  {}", style(label).dim(), value);
    } else {
        println!("  {}  {}", label, value);
    }
}

/// Print a dimmed/secondary message.
pub fn dimmed(msg: &str) {
    if colors_enabled() {
        println!("{}", style(msg).dim());
    } else {
        println!("{}", msg);
    }
}

/// Print raw data to stdout, uncolored.
pub fn data(text: &str) {
    println!("{}", text);
}

/// Format a path in cyan for inline use.
pub fn path(p: &str) -> String {
    if colors_enabled() {
        style(p).for_stderr().cyan().to_string()
    } else {
        p.to_string()
    }
}

/// Format a profile name in cyan for inline use.
pub fn name(n: &str) -> String {
    if colors_enabled() {
        style(n).for_stderr().cyan().to_string()
    } else {
        n.to_string()
    }
}

/// `1 profile`, `3 profiles`.
pub fn count(n: usize, noun: &str) -> String {
    format!("{} {}{}", n, noun, if n == 1 { "" } else { "s" })
}

/// Print rows as left-aligned columns under a header row.
pub fn table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r.get(i).map_or(0, |c| c.chars().count()))
                .max()
                .unwrap_or(0)
                .max(h.chars().count())
        })
        .collect();

    let format_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    header(&format_row(headers.iter().map(|h| h.to_string()).collect()));
    dimmed(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        println!("{}", format_row(row.clone()));
    }
}
