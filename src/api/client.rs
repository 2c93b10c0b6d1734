use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::error::BoxsyncError;
use crate::oauth::TokenManager;

use super::types::{FolderEntry, FolderInfo, FolderItemsPage, ITEM_FIELDS};

/// Authenticated access to the handful of Box endpoints a source needs.
#[derive(Debug, Clone)]
pub struct BoxClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
    timeout: Duration,
    tokens: Arc<TokenManager>,
}

impl BoxClient {
    pub fn new(config: &SourceConfig, tokens: Arc<TokenManager>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
            page_size: config.page_size(),
            timeout: config.timeout(),
            tokens,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, BoxsyncError> {
        let raw = format!("{}/{path}", self.base_url);
        Url::parse_with_params(&raw, params).map_err(|e| BoxsyncError::Upstream {
            status: None,
            detail: format!("Invalid API URL '{raw}': {e}"),
        })
    }

    /// Send an authenticated GET and hand back the response if it is 2xx.
    ///
    /// `bounded` applies the configured timeout to the whole exchange; content
    /// downloads skip it since their duration scales with file size.
    async fn get(&self, url: Url, bounded: bool) -> Result<reqwest::Response, BoxsyncError> {
        let token = self.tokens.get_valid_access_token().await?;
        debug!(%url, "GET");
        let mut request = self.http.get(url.clone()).bearer_auth(token);
        if bounded {
            request = request.timeout(self.timeout);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| BoxsyncError::transport(&format!("GET {}", url.path()), e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "Box API call failed");
            return Err(BoxsyncError::Upstream {
                status: Some(status.as_u16()),
                detail: if body.is_empty() {
                    format!("GET {} returned {status}", url.path())
                } else {
                    body
                },
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BoxsyncError> {
        let path = url.path().to_string();
        let resp = self.get(url, true).await?;
        resp.json::<T>().await.map_err(|e| BoxsyncError::Upstream {
            status: None,
            detail: format!("Unexpected response from {path}: {e}"),
        })
    }

    pub async fn folder_info(&self, folder_id: &str) -> Result<FolderInfo, BoxsyncError> {
        let url = self.endpoint(&format!("folders/{folder_id}"), &[])?;
        self.get_json(url).await
    }

    /// Fetch one page of a folder's children, sorted by modification date.
    pub async fn list_folder_page(
        &self,
        folder_id: &str,
        limit: u32,
        offset: u64,
    ) -> Result<FolderItemsPage, BoxsyncError> {
        let url = self.endpoint(
            &format!("folders/{folder_id}/items"),
            &[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("sort", "date".to_string()),
                ("fields", ITEM_FIELDS.to_string()),
            ],
        )?;
        self.get_json(url).await
    }

    /// Every child of `folder_id`: a zero-limit count request for the total, then
    /// pages of up to `page_size` until that many entries have arrived.
    ///
    /// The offset advances by what the server actually returned, since it
    /// may cap `limit` below the requested page size.
    pub async fn list_all_folder_children(
        &self,
        folder_id: &str,
    ) -> Result<Vec<FolderEntry>, BoxsyncError> {
        let total = self.list_folder_page(folder_id, 0, 0).await?.total_count;
        let mut entries = Vec::new();

        while (entries.len() as u64) < total {
            let offset = entries.len() as u64;
            let page = self
                .list_folder_page(folder_id, self.page_size, offset)
                .await?;
            if page.entries.is_empty() {
                // The folder shrank between the count request and this page.
                warn!(folder_id, offset, total, "Short folder listing");
                break;
            }
            entries.extend(page.entries);
        }

        debug!(folder_id, count = entries.len(), "Listed folder");
        Ok(entries)
    }

    /// Stream a file's bytes into `sink`, returning how many were written.
    ///
    /// Failures writing to `sink` come back as [`BoxsyncError::IoError`] so
    /// the caller can attach the path it was writing.
    pub async fn download(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, BoxsyncError> {
        let url = self.endpoint(&format!("files/{file_id}/content"), &[])?;
        let mut resp = self.get(url, false).await?;

        let mut written = 0u64;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| BoxsyncError::transport("Downloading file content", e))?
        {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;
        Ok(written)
    }
}
