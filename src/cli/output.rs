use colored::Colorize;
use serde_json::json;

use crate::error::BoxsyncError;
use crate::flatten::FlattenedFileEntry;

/// Human-readable byte count: `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

pub fn entries_to_json(entries: &[FlattenedFileEntry]) -> serde_json::Value {
    json!(entries
        .iter()
        .map(|e| json!({
            "identifier": e.identifier(),
            "id": e.remote_id,
            "name": e.name,
            "modifiedAt": e.modified_at.map(|t| t.to_rfc3339()),
            "size": e.size,
            "parent": e.parent,
        }))
        .collect::<Vec<_>>())
}

pub fn print_entries(entries: &[FlattenedFileEntry], is_tty: bool) {
    for entry in entries {
        let modified = entry
            .modified_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let size = format!("{:>9}", format_size(entry.size));
        if is_tty {
            println!(
                "{}  {}  {}",
                modified.dimmed(),
                size.dimmed(),
                entry.identifier().bold()
            );
        } else {
            println!("{modified}  {size}  {}", entry.identifier());
        }
    }
}

pub fn print_error(err: &BoxsyncError, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&err.to_json()).unwrap_or_default()
        );
        return;
    }
    eprintln!("{} {err}", "Error:".red().bold());
    if let BoxsyncError::MissingAuthorization { source_id, .. } = err {
        eprintln!(
            "{}",
            format!("Run `boxsync auth {source_id}` or open the URL above to grant access.")
                .yellow()
        );
    }
}
