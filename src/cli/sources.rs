use std::io::IsTerminal;

use colored::Colorize;

use crate::config::load_config;
use crate::error::BoxsyncError;
use crate::oauth::{CredentialState, TokenManager};

use super::connection::open_token_store;

/// Print every configured source and what credential it currently holds.
pub async fn run_sources(config_path: Option<&str>, json: bool) -> Result<(), BoxsyncError> {
    let config = load_config(config_path)?;
    let store = open_token_store(&config);
    let http = reqwest::Client::new();
    let is_tty = std::io::stdout().is_terminal();

    let mut names: Vec<&String> = config.sources.keys().collect();
    names.sort();

    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let source = &config.sources[name];
        let manager = TokenManager::new(name, source, store.clone(), http.clone());
        rows.push((name.as_str(), source.folder_id.as_str(), manager.credential_state()?));
    }

    if json {
        let out: Vec<_> = rows
            .iter()
            .map(|(name, folder, state)| {
                serde_json::json!({
                    "name": name,
                    "folderId": folder,
                    "authorized": *state != CredentialState::Unauthorized,
                    "credential": state.to_string(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&out).unwrap_or_default()
        );
        return Ok(());
    }

    if rows.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }
    for (name, folder, state) in rows {
        let status = match state {
            CredentialState::Unauthorized if is_tty => state.to_string().red().to_string(),
            _ if is_tty => state.to_string().green().to_string(),
            _ => state.to_string(),
        };
        if is_tty {
            println!("{}  folder {folder}  ({status})", name.bold());
        } else {
            println!("{name}  folder {folder}  ({status})");
        }
    }
    Ok(())
}
