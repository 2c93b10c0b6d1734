use std::sync::Arc;

use crate::config::{BoxsyncConfig, SourceConfig};
use crate::error::BoxsyncError;
use crate::source::BoxSource;
use crate::store::{FileTokenStore, TokenStore};

/// The token store every CLI command shares.
pub fn open_token_store(config: &BoxsyncConfig) -> Arc<dyn TokenStore> {
    Arc::new(FileTokenStore::new(config.token_store_dir()))
}

/// Look a source up by name, suggesting a close match when it is absent.
pub fn find_source<'a>(
    config: &'a BoxsyncConfig,
    name: &str,
) -> Result<&'a SourceConfig, BoxsyncError> {
    config.sources.get(name).ok_or_else(|| {
        let known: Vec<&str> = config.sources.keys().map(String::as_str).collect();
        if let Some(suggestion) = suggest_source(name, &known) {
            eprintln!("Did you mean '{suggestion}'?");
        }
        BoxsyncError::SourceNotFound(name.to_string())
    })
}

/// Wire up a [`BoxSource`] for `name` using the configured store and cache.
pub fn connect_to_source(config: &BoxsyncConfig, name: &str) -> Result<BoxSource, BoxsyncError> {
    let source_config = find_source(config, name)?;
    BoxSource::initialize(
        name,
        source_config,
        open_token_store(config),
        &config.cache_root(),
    )
}

/// Closest known source name (Levenshtein <= 2), if exactly one is closest.
pub fn suggest_source(input: &str, known: &[&str]) -> Option<String> {
    let mut best_dist = usize::MAX;
    let mut best: Option<&str> = None;
    let mut ambiguous = false;

    for &name in known {
        let dist = strsim::levenshtein(input, name);
        if dist < best_dist {
            best_dist = dist;
            best = Some(name);
            ambiguous = false;
        } else if dist == best_dist {
            ambiguous = true;
        }
    }

    if best_dist <= 2 && !ambiguous {
        best.map(str::to_string)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(names: &[&str], dir: &std::path::Path) -> BoxsyncConfig {
        let mut config = BoxsyncConfig {
            token_store: Some(dir.join("tokens")),
            cache_dir: Some(dir.join("cache")),
            ..Default::default()
        };
        for name in names {
            config
                .sources
                .insert(name.to_string(), SourceConfig::new("0", "cid", "secret"));
        }
        config
    }

    #[test]
    fn suggest_close_match() {
        assert_eq!(
            suggest_source("marketng", &["marketing", "legal"]),
            Some("marketing".into())
        );
    }

    #[test]
    fn suggest_nothing_when_far_or_ambiguous() {
        assert_eq!(suggest_source("zzzzzz", &["marketing", "legal"]), None);
        assert_eq!(suggest_source("ab", &["aa", "bb"]), None);
        assert_eq!(suggest_source("x", &[]), None);
    }

    #[test]
    fn unknown_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(&["marketing"], dir.path());
        let err = connect_to_source(&config, "sales").unwrap_err();
        assert!(matches!(err, BoxsyncError::SourceNotFound(ref s) if s == "sales"));
    }

    #[test]
    fn connecting_creates_source_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(&["marketing"], dir.path());
        let source = connect_to_source(&config, "marketing").unwrap();
        assert_eq!(source.id(), "marketing");
        assert!(dir.path().join("cache").join("boxsync.marketing").is_dir());
    }
}
