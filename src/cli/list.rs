use std::io::IsTerminal;

use colored::Colorize;

use crate::config::load_config;
use crate::error::BoxsyncError;

use super::connection::connect_to_source;
use super::output::{entries_to_json, format_size, print_entries};

/// Print the flattened file list of a source.
pub async fn run_list(
    config_path: Option<&str>,
    source: &str,
    json: bool,
) -> Result<(), BoxsyncError> {
    let config = load_config(config_path)?;
    let source = connect_to_source(&config, source)?;
    let entries = source.generate_file_collection().await?;

    if json {
        let out = serde_json::json!({
            "source": source.id(),
            "folderId": source.folder_id(),
            "files": entries_to_json(&entries),
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        return Ok(());
    }

    let is_tty = std::io::stdout().is_terminal();
    if is_tty {
        // The folder name is cosmetic; a failure here should not hide the list.
        let label = match source.folder_info().await {
            Ok(info) => format!("{} ({})", info.name, info.id),
            Err(_) => source.folder_id().to_string(),
        };
        let total: u64 = entries.iter().map(|e| e.size).sum();
        println!(
            "{} {}",
            label.bold(),
            format!("{} files, {}", entries.len(), format_size(total)).dimmed()
        );
    }
    print_entries(&entries, is_tty);
    Ok(())
}
