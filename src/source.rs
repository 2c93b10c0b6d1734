use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::api::{BoxClient, FolderInfo};
use crate::cache::LocalContentCache;
use crate::config::SourceConfig;
use crate::error::BoxsyncError;
use crate::flatten::{flatten, FlattenedFileEntry};
use crate::oauth::TokenManager;
use crate::store::TokenStore;

/// A configured Box folder exposed as a flat, locally cacheable file list.
///
/// This is all an outer sync layer needs: enumerate the files, then ask for
/// a local path for the ones it wants.
#[derive(Debug)]
pub struct BoxSource {
    id: String,
    folder_id: String,
    tokens: Arc<TokenManager>,
    client: Arc<BoxClient>,
    cache: LocalContentCache,
}

impl BoxSource {
    pub fn initialize(
        source_id: &str,
        config: &SourceConfig,
        store: Arc<dyn TokenStore>,
        cache_root: &Path,
    ) -> Result<Self, BoxsyncError> {
        let missing = config.missing_options();
        if !missing.is_empty() {
            return Err(BoxsyncError::ConfigError {
                path: PathBuf::from(source_id),
                detail: format!("source '{source_id}' is missing {}", missing.join(", ")),
            });
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("boxsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BoxsyncError::transport("Building HTTP client", e))?;

        let tokens = Arc::new(TokenManager::new(source_id, config, store, http.clone()));
        let client = Arc::new(BoxClient::new(config, tokens.clone(), http));
        let cache = LocalContentCache::for_source(cache_root, source_id, client.clone())?;

        Ok(Self {
            id: source_id.to_string(),
            folder_id: config.folder_id.clone(),
            tokens,
            client,
            cache,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn client(&self) -> &BoxClient {
        &self.client
    }

    pub fn cache(&self) -> &LocalContentCache {
        &self.cache
    }

    pub async fn folder_info(&self) -> Result<FolderInfo, BoxsyncError> {
        self.client.folder_info(&self.folder_id).await
    }

    /// Every file below the configured folder.
    pub async fn generate_file_collection(&self) -> Result<Vec<FlattenedFileEntry>, BoxsyncError> {
        let files = flatten(self.client.as_ref(), &self.folder_id).await?;
        info!(source = %self.id, files = files.len(), "Flattened folder tree");
        Ok(files)
    }

    pub async fn path_to_local_file(
        &self,
        entry: &FlattenedFileEntry,
    ) -> Result<PathBuf, BoxsyncError> {
        self.cache.resolve_local_path(entry).await
    }

    pub async fn path_for_identifier(&self, identifier: &str) -> Result<PathBuf, BoxsyncError> {
        self.cache.resolve_identifier(identifier).await
    }
}
