use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::BoxsyncError;

use super::TokenStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// In-process token store. Entries vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, BoxsyncError> {
        self.entries
            .lock()
            .map_err(|_| BoxsyncError::TokenStore("memory store lock poisoned".into()))
    }
}

pub(crate) fn expiry_from_ttl(ttl_seconds: Option<u64>) -> Option<DateTime<Utc>> {
    ttl_seconds.map(|secs| {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

impl TokenStore for MemoryTokenStore {
    fn has(&self, key: &str) -> Result<bool, BoxsyncError> {
        let now = Utc::now();
        Ok(self.lock()?.get(key).is_some_and(|e| e.is_live(now)))
    }

    fn get(&self, key: &str) -> Result<String, BoxsyncError> {
        let now = Utc::now();
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(e) if e.is_live(now) => Ok(e.value.clone()),
            Some(_) => {
                entries.remove(key);
                Err(BoxsyncError::TokenNotFound(key.to_string()))
            }
            None => Err(BoxsyncError::TokenNotFound(key.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), BoxsyncError> {
        self.lock()?.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: expiry_from_ttl(ttl_seconds),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BoxsyncError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
