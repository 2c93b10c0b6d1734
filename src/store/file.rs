use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BoxsyncError;

use super::memory::expiry_from_ttl;
use super::TokenStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// Default token directory: `~/.boxsync`.
pub fn default_token_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".boxsync")
}

/// File that holds the entries of `key`'s source: `<root>/<source>/tokens.json`.
///
/// The source is the key prefix before `__`; keys without one share
/// `<root>/_default/tokens.json`.
pub fn token_file_for(root: &Path, key: &str) -> PathBuf {
    let source = match key.split_once("__") {
        Some((source, _)) if !source.is_empty() => source,
        _ => "_default",
    };
    let dir: String = source
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '.') { '_' } else { c })
        .collect();
    root.join(dir).join("tokens.json")
}

/// Token store persisted as one JSON document per source.
///
/// Every operation re-reads the file, so runs for different sources never
/// touch each other's file. Writes within one process are serialized; two
/// processes writing the same source concurrently can still race.
#[derive(Debug)]
pub struct FileTokenStore {
    root: PathBuf,
    guard: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_entries(&self, path: &Path) -> Result<HashMap<String, StoredEntry>, BoxsyncError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(BoxsyncError::TokenStore(format!(
                    "Cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&data).map_err(|e| {
            BoxsyncError::TokenStore(format!("Corrupt token file {}: {e}", path.display()))
        })
    }

    fn write_entries(
        &self,
        path: &Path,
        entries: &HashMap<String, StoredEntry>,
    ) -> Result<(), BoxsyncError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(entries).map_err(|e| {
            BoxsyncError::TokenStore(format!("Failed to serialize tokens: {e}"))
        })?;
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = std::fs::write(&tmp, data).and_then(|()| std::fs::rename(&tmp, path)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn update<F>(&self, key: &str, f: F) -> Result<(), BoxsyncError>
    where
        F: FnOnce(&mut HashMap<String, StoredEntry>),
    {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| BoxsyncError::TokenStore("file store lock poisoned".into()))?;
        let path = token_file_for(&self.root, key);
        let mut entries = self.read_entries(&path)?;
        let now = Utc::now();
        entries.retain(|_, e| e.is_live(now));
        f(&mut entries);
        self.write_entries(&path, &entries)
    }
}

impl TokenStore for FileTokenStore {
    fn has(&self, key: &str) -> Result<bool, BoxsyncError> {
        let now = Utc::now();
        let path = token_file_for(&self.root, key);
        Ok(self.read_entries(&path)?.get(key).is_some_and(|e| e.is_live(now)))
    }

    fn get(&self, key: &str) -> Result<String, BoxsyncError> {
        let now = Utc::now();
        self.read_entries(&token_file_for(&self.root, key))?
            .remove(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value)
            .ok_or_else(|| BoxsyncError::TokenNotFound(key.to_string()))
    }

    fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), BoxsyncError> {
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at: expiry_from_ttl(ttl_seconds),
        };
        self.update(key, |entries| {
            entries.insert(key.to_string(), entry);
        })
    }

    fn remove(&self, key: &str) -> Result<(), BoxsyncError> {
        self.update(key, |entries| {
            entries.remove(key);
        })
    }
}
