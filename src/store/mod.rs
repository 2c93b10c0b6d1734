//! Key-value storage for OAuth credentials.
//!
//! Each configured source owns a handful of slots, all prefixed with the
//! source identifier so independent sources can share one store.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::error::BoxsyncError;

/// A string store whose entries may carry a time-to-live.
///
/// Expiry is the store's job: once an entry's TTL elapses, `has` returns
/// `false` and `get` fails with [`BoxsyncError::TokenNotFound`].
pub trait TokenStore: Send + Sync {
    fn has(&self, key: &str) -> Result<bool, BoxsyncError>;

    fn get(&self, key: &str) -> Result<String, BoxsyncError>;

    /// Write `value` under `key`, replacing any previous entry. `None` means
    /// the entry never expires.
    fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), BoxsyncError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), BoxsyncError>;
}

impl std::fmt::Debug for dyn TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish()
    }
}

/// The store keys belonging to one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenKeys {
    pub authorization_code: String,
    pub refresh_token: String,
    pub access_token: String,
    pub oauth_state: String,
}

impl TokenKeys {
    pub fn for_source(source_id: &str) -> Self {
        Self {
            authorization_code: format!("{source_id}__auth-token"),
            refresh_token: format!("{source_id}__refresh-token"),
            access_token: format!("{source_id}__access-token"),
            oauth_state: format!("{source_id}__oauth-state"),
        }
    }
}

/// Read `key`, mapping "absent" to `None` instead of an error.
///
/// `has` followed by `get` can race with expiry, so callers that only want
/// the value go through here.
pub fn get_optional(store: &dyn TokenStore, key: &str) -> Result<Option<String>, BoxsyncError> {
    match store.get(key) {
        Ok(value) => Ok(Some(value)),
        Err(BoxsyncError::TokenNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_source_prefix_convention() {
        let keys = TokenKeys::for_source("marketing");
        assert_eq!(keys.authorization_code, "marketing__auth-token");
        assert_eq!(keys.refresh_token, "marketing__refresh-token");
        assert_eq!(keys.access_token, "marketing__access-token");
        assert_eq!(keys.oauth_state, "marketing__oauth-state");
    }

    #[test]
    fn keys_for_different_sources_never_collide() {
        let a = TokenKeys::for_source("a");
        let b = TokenKeys::for_source("b");
        assert_ne!(a.access_token, b.access_token);
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn get_optional_maps_missing_to_none() {
        let store = MemoryTokenStore::new();
        assert_eq!(get_optional(&store, "absent").unwrap(), None);
        store.set("present", "v", None).unwrap();
        assert_eq!(get_optional(&store, "present").unwrap().as_deref(), Some("v"));
    }
}
