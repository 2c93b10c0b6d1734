pub mod http_mock;

use std::sync::Mutex;

use boxsync::store::MemoryTokenStore;
use boxsync::{BoxsyncError, SourceConfig, TokenStore};

/// A source config whose token and API endpoints point at `server_uri`.
#[allow(dead_code)]
pub fn mock_source_config(server_uri: &str, folder_id: &str) -> SourceConfig {
    let mut cfg = SourceConfig::new(folder_id, "test-client", "test-secret");
    cfg.api_base_url = Some(format!("{server_uri}/2.0"));
    cfg.token_url = Some(format!("{server_uri}/oauth2/token"));
    cfg.authorize_url = Some(format!("{server_uri}/oauth2/authorize"));
    cfg.page_size = Some(100);
    cfg
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Has(String),
    Get(String),
    Set {
        key: String,
        value: String,
        ttl: Option<u64>,
    },
    Remove(String),
}

/// In-memory store that records every call made against it.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryTokenStore,
    ops: Mutex<Vec<StoreOp>>,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without recording it.
    pub fn seed(&self, key: &str, value: &str) {
        self.inner.set(key, value, None).unwrap();
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.inner.get(key).ok()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn sets(&self) -> Vec<StoreOp> {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, StoreOp::Set { .. }))
            .collect()
    }

    pub fn ttl_of_last_set(&self, key: &str) -> Option<Option<u64>> {
        self.ops().into_iter().rev().find_map(|op| match op {
            StoreOp::Set { key: k, ttl, .. } if k == key => Some(ttl),
            _ => None,
        })
    }

    fn record(&self, op: StoreOp) {
        self.ops.lock().unwrap().push(op);
    }
}

impl TokenStore for RecordingStore {
    fn has(&self, key: &str) -> Result<bool, BoxsyncError> {
        self.record(StoreOp::Has(key.into()));
        self.inner.has(key)
    }

    fn get(&self, key: &str) -> Result<String, BoxsyncError> {
        self.record(StoreOp::Get(key.into()));
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), BoxsyncError> {
        self.record(StoreOp::Set {
            key: key.into(),
            value: value.into(),
            ttl: ttl_seconds,
        });
        self.inner.set(key, value, ttl_seconds)
    }

    fn remove(&self, key: &str) -> Result<(), BoxsyncError> {
        self.record(StoreOp::Remove(key.into()));
        self.inner.remove(key)
    }
}
