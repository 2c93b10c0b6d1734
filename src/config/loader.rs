use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BoxsyncError;

use super::env::{expand_env_vars, expand_source_config};
use super::types::{BoxsyncConfig, SourceConfig};

/// Strip JSONC comments (// line comments and /* */ block comments) from input.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(ch) = chars.next() {
        if escape_next {
            escape_next = false;
            result.push(ch);
            continue;
        }

        if in_string {
            result.push(ch);
            if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            result.push(ch);
            continue;
        }

        if ch == '/' {
            match chars.peek() {
                Some(&'/') => {
                    // Line comment: skip until end of line
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                Some(&'*') => {
                    // Block comment: skip until */
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        // Preserve newlines to keep line numbers stable
                        if c == '\n' {
                            result.push('\n');
                        }
                        prev = c;
                    }
                }
                _ => {
                    result.push(ch);
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Discover config files in precedence order (highest first).
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `BOXSYNC_CONFIG` env var
/// 3. `./config/boxsync.json` (project-level)
/// 4. `~/.boxsync/boxsync.json` or `~/.boxsync/boxsync.jsonc` (home-level)
pub fn discover_config_files(cli_config: Option<&str>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Some(path) = cli_config {
        push(PathBuf::from(path), &mut files);
    }

    if let Ok(env_path) = std::env::var("BOXSYNC_CONFIG") {
        push(PathBuf::from(env_path), &mut files);
    }

    push(PathBuf::from("./config/boxsync.json"), &mut files);

    if let Some(home) = dirs::home_dir() {
        let home_json = home.join(".boxsync").join("boxsync.json");
        let home_jsonc = home.join(".boxsync").join("boxsync.jsonc");
        if home_json.exists() {
            push(home_json, &mut files);
        } else {
            push(home_jsonc, &mut files);
        }
    }

    files
}

fn push(p: PathBuf, files: &mut Vec<PathBuf>) {
    if p.exists() && !files.contains(&p) {
        files.push(p);
    }
}

/// Load a single config file, stripping JSONC comments before parsing.
fn load_config_file(path: &Path) -> Result<BoxsyncConfig, BoxsyncError> {
    let content = std::fs::read_to_string(path).map_err(|e| BoxsyncError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {}", e),
    })?;

    let stripped = strip_jsonc_comments(&content);
    serde_json::from_str::<BoxsyncConfig>(&stripped).map_err(|e| BoxsyncError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Invalid JSON: {}", e),
    })
}

/// Merge source configs from `source` into `target`.
/// Sources already present in `target` are NOT overridden (earlier files win).
fn merge_sources(
    target: &mut HashMap<String, SourceConfig>,
    source: HashMap<String, SourceConfig>,
) {
    for (name, config) in source {
        target.entry(name).or_insert(config);
    }
}

/// Check the mandatory options of every source.
fn validate_sources(
    sources: &HashMap<String, SourceConfig>,
    origin: &Path,
) -> Result<(), BoxsyncError> {
    let mut names: Vec<&String> = sources.keys().collect();
    names.sort();
    for name in names {
        let missing = sources[name].missing_options();
        if !missing.is_empty() {
            return Err(BoxsyncError::ConfigError {
                path: origin.to_path_buf(),
                detail: format!(
                    "Source '{}' is missing mandatory option(s): {}",
                    name,
                    missing.join(", ")
                ),
            });
        }
    }
    Ok(())
}

/// Env-var expansion plus a leading `~/` for the home directory.
fn expand_path(path: &Path) -> Result<PathBuf, BoxsyncError> {
    let expanded = expand_env_vars(&path.to_string_lossy())?;
    match (expanded.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => Ok(home.join(rest)),
        _ => Ok(PathBuf::from(expanded)),
    }
}

/// Load, merge, and expand all configuration.
///
/// - Discovers config files in precedence order
/// - Merges sources (earlier files win for the same name)
/// - `tokenStore` and `cacheDir` come from the first file that sets them
/// - Expands environment variables, then validates mandatory options
pub fn load_config(cli_config: Option<&str>) -> Result<BoxsyncConfig, BoxsyncError> {
    let config_files = discover_config_files(cli_config);
    let mut merged = BoxsyncConfig::default();

    for path in &config_files {
        debug!(path = %path.display(), "Loading config file");
        let cfg = load_config_file(path)?;
        merge_sources(&mut merged.sources, cfg.sources);
        if merged.token_store.is_none() {
            merged.token_store = cfg.token_store;
        }
        if merged.cache_dir.is_none() {
            merged.cache_dir = cfg.cache_dir;
        }
    }

    for config in merged.sources.values_mut() {
        expand_source_config(config)?;
    }
    if let Some(path) = merged.token_store.take() {
        merged.token_store = Some(expand_path(&path)?);
    }
    if let Some(path) = merged.cache_dir.take() {
        merged.cache_dir = Some(expand_path(&path)?);
    }

    let origin = config_files
        .first()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("<config>"));
    validate_sources(&merged.sources, &origin)?;

    Ok(merged)
}
