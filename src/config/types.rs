use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "https://api.box.com/2.0";
pub const DEFAULT_TOKEN_URL: &str = "https://api.box.com/oauth2/token";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://account.box.com/api/oauth2/authorize";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8765/callback";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxsyncConfig {
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    /// Directory holding one `<source>/tokens.json` per source; `~/.boxsync` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_store: Option<PathBuf>,
    /// Directory under which per-source cache directories are created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl BoxsyncConfig {
    pub fn token_store_dir(&self) -> PathBuf {
        self.token_store
            .clone()
            .unwrap_or_else(crate::store::file::default_token_dir)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default)]
    pub folder_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Static bearer token that bypasses the OAuth flow entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorize_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl SourceConfig {
    pub fn new(
        folder_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            folder_id: folder_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            dev_token: None,
            redirect_uri: None,
            api_base_url: None,
            token_url: None,
            authorize_url: None,
            page_size: None,
            timeout_ms: None,
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    pub fn authorize_url(&self) -> &str {
        self.authorize_url.as_deref().unwrap_or(DEFAULT_AUTHORIZE_URL)
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Names of mandatory options that are empty.
    pub fn missing_options(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.folder_id.trim().is_empty() {
            missing.push("folderId");
        }
        if self.client_id.trim().is_empty() {
            missing.push("clientId");
        }
        if self.client_secret.trim().is_empty() {
            missing.push("clientSecret");
        }
        missing
    }

    /// The override token, if one is configured and non-empty.
    pub fn effective_dev_token(&self) -> Option<&str> {
        self.dev_token.as_deref().filter(|t| !t.is_empty())
    }
}
