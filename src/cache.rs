use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::api::BoxClient;
use crate::error::BoxsyncError;
use crate::flatten::{split_identifier, FlattenedFileEntry};

/// Streams a remote file's content into a local writer.
#[async_trait]
pub trait ContentDownloader: Send + Sync {
    async fn download(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, BoxsyncError>;
}

#[async_trait]
impl ContentDownloader for BoxClient {
    async fn download(
        &self,
        file_id: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, BoxsyncError> {
        BoxClient::download(self, file_id, sink).await
    }
}

/// Name of the per-source directory below the cache root.
pub fn source_cache_dir(root: &Path, source_id: &str) -> PathBuf {
    root.join(format!("boxsync.{source_id}"))
}

/// Turn a path-qualified name into a single path component.
fn file_name_for(display_name: &str) -> String {
    display_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// On-disk copies of remote files, one directory per source.
///
/// A file present at its target path is a hit; nothing is ever re-fetched
/// or evicted.
pub struct LocalContentCache {
    dir: PathBuf,
    downloader: Arc<dyn ContentDownloader>,
}

impl std::fmt::Debug for LocalContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalContentCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl LocalContentCache {
    /// Create (if needed) `<root>/boxsync.<source_id>` and cache into it.
    pub fn for_source(
        root: &Path,
        source_id: &str,
        downloader: Arc<dyn ContentDownloader>,
    ) -> Result<Self, BoxsyncError> {
        let dir = source_cache_dir(root, source_id);
        std::fs::create_dir_all(&dir).map_err(|source| BoxsyncError::LocalIo {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, downloader })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_path(&self, display_name: &str) -> PathBuf {
        self.dir.join(file_name_for(display_name))
    }

    pub async fn resolve_local_path(
        &self,
        entry: &FlattenedFileEntry,
    ) -> Result<PathBuf, BoxsyncError> {
        self.resolve_identifier(&entry.identifier()).await
    }

    /// Same as [`Self::resolve_local_path`], starting from `<id>|||<name>`.
    pub async fn resolve_identifier(&self, identifier: &str) -> Result<PathBuf, BoxsyncError> {
        let (remote_id, display_name) = split_identifier(identifier)?;
        let target = self.target_path(&display_name);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            debug!(path = %target.display(), "Cache hit");
            return Ok(target);
        }

        let partial = self
            .dir
            .join(format!(".{}.part", uuid::Uuid::new_v4().simple()));
        match self.fetch_into(&remote_id, &partial, &target).await {
            Ok(bytes) => {
                info!(path = %target.display(), bytes, "Cached remote file");
                Ok(target)
            }
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&partial).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %partial.display(), error = %e, "Could not remove partial download");
                    }
                }
                Err(err)
            }
        }
    }

    async fn fetch_into(
        &self,
        remote_id: &str,
        partial: &Path,
        target: &Path,
    ) -> Result<u64, BoxsyncError> {
        let local_io = |source| BoxsyncError::LocalIo {
            path: target.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(partial).await.map_err(local_io)?;
        let bytes = match self.downloader.download(remote_id, &mut file).await {
            Ok(n) => n,
            Err(BoxsyncError::IoError(source)) => return Err(local_io(source)),
            Err(e) => return Err(e),
        };
        file.sync_all().await.map_err(local_io)?;
        drop(file);

        tokio::fs::rename(partial, target).await.map_err(local_io)?;
        Ok(bytes)
    }
}
