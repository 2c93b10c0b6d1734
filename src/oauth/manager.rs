use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::SourceConfig;
use crate::error::BoxsyncError;
use crate::store::{get_optional, TokenKeys, TokenStore};

use super::authorize::Authorizer;
use super::token::{exchange_grant, Grant, TokenResponse};

/// What a source currently holds, strongest credential first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    DevToken,
    AccessToken,
    RefreshToken,
    AuthorizationCode,
    Unauthorized,
}

impl std::fmt::Display for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CredentialState::DevToken => "developer token",
            CredentialState::AccessToken => "access token",
            CredentialState::RefreshToken => "refresh token",
            CredentialState::AuthorizationCode => "authorization code pending exchange",
            CredentialState::Unauthorized => "not authorized",
        };
        f.write_str(label)
    }
}

/// Produces a valid bearer token for one source.
///
/// Token minting is serialized: a refresh token is single-use, so two
/// concurrent refreshes would leave the store holding a revoked one. Share a
/// single manager (behind an `Arc`) between every component of a source.
#[derive(Debug)]
pub struct TokenManager {
    source_id: String,
    client_id: String,
    client_secret: String,
    token_endpoint: String,
    dev_token: Option<String>,
    timeout: std::time::Duration,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    keys: TokenKeys,
    authorizer: Authorizer,
    mint_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        source_id: &str,
        config: &SourceConfig,
        store: Arc<dyn TokenStore>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            source_id: source_id.to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_endpoint: config.token_url().to_string(),
            dev_token: config.effective_dev_token().map(str::to_string),
            timeout: config.timeout(),
            http,
            store: store.clone(),
            keys: TokenKeys::for_source(source_id),
            authorizer: Authorizer::new(source_id, config, store),
            mint_lock: Mutex::new(()),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Return a bearer token, minting a new one when the stored one expired.
    ///
    /// Fails with [`BoxsyncError::MissingAuthorization`] when neither an
    /// authorization code nor a refresh token is left to exchange.
    pub async fn get_valid_access_token(&self) -> Result<String, BoxsyncError> {
        if let Some(token) = &self.dev_token {
            debug!(source = %self.source_id, "Using configured developer token");
            return Ok(token.clone());
        }

        if let Some(token) = self.stored_access_token()? {
            return Ok(token);
        }

        let _guard = self.mint_lock.lock().await;
        // Someone else may have minted while we waited for the lock.
        if let Some(token) = self.stored_access_token()? {
            return Ok(token);
        }
        self.mint_access_token().await
    }

    fn stored_access_token(&self) -> Result<Option<String>, BoxsyncError> {
        get_optional(self.store.as_ref(), &self.keys.access_token)
    }

    /// Refresh token wins over an authorization code once it exists.
    fn select_grant(&self) -> Result<Grant, BoxsyncError> {
        if let Some(refresh) = get_optional(self.store.as_ref(), &self.keys.refresh_token)? {
            return Ok(Grant::RefreshToken(refresh));
        }
        if let Some(code) = get_optional(self.store.as_ref(), &self.keys.authorization_code)? {
            return Ok(Grant::AuthorizationCode(code));
        }
        Err(self.authorizer.missing_authorization())
    }

    async fn mint_access_token(&self) -> Result<String, BoxsyncError> {
        let grant = self.select_grant()?;
        debug!(source = %self.source_id, grant = grant.grant_type(), "Requesting new access token");

        let exchanged = exchange_grant(
            &self.http,
            &self.token_endpoint,
            &grant,
            &self.client_id,
            &self.client_secret,
            self.timeout,
        )
        .await;

        match exchanged {
            Ok(tokens) => {
                self.store_tokens(&grant, &tokens)?;
                info!(
                    source = %self.source_id,
                    grant = grant.grant_type(),
                    expires_in = tokens.expires_in,
                    "Obtained new access token"
                );
                Ok(tokens.access_token)
            }
            Err(err) => {
                error!(
                    source = %self.source_id,
                    grant = grant.grant_type(),
                    error = %err,
                    "Could not get access token, revoking stored credentials"
                );
                self.invalidate(&grant)?;
                // With nothing left to exchange this surfaces MissingAuthorization.
                self.select_grant()?;
                Err(err)
            }
        }
    }

    fn store_tokens(&self, grant: &Grant, tokens: &TokenResponse) -> Result<(), BoxsyncError> {
        self.store.set(
            &self.keys.access_token,
            &tokens.access_token,
            Some(tokens.expires_in),
        )?;
        self.store
            .set(&self.keys.refresh_token, &tokens.refresh_token, None)?;
        if !grant.is_refresh() {
            self.store.remove(&self.keys.authorization_code)?;
        }
        Ok(())
    }

    fn invalidate(&self, failed: &Grant) -> Result<(), BoxsyncError> {
        self.store.remove(&self.keys.authorization_code)?;
        self.store.remove(&self.keys.access_token)?;
        if failed.is_refresh() {
            self.store.remove(&self.keys.refresh_token)?;
        }
        Ok(())
    }

    /// Drop the access and refresh tokens but keep a pending authorization code.
    pub fn discard_minted_tokens(&self) -> Result<(), BoxsyncError> {
        self.store.remove(&self.keys.access_token)?;
        self.store.remove(&self.keys.refresh_token)
    }

    /// Drop every stored credential so the next call demands re-authorization.
    pub fn forget_tokens(&self) -> Result<(), BoxsyncError> {
        self.store.remove(&self.keys.access_token)?;
        self.store.remove(&self.keys.refresh_token)?;
        self.store.remove(&self.keys.authorization_code)?;
        info!(source = %self.source_id, "Stored credentials removed");
        Ok(())
    }

    pub fn credential_state(&self) -> Result<CredentialState, BoxsyncError> {
        if self.dev_token.is_some() {
            return Ok(CredentialState::DevToken);
        }
        let store = self.store.as_ref();
        if store.has(&self.keys.access_token)? {
            Ok(CredentialState::AccessToken)
        } else if store.has(&self.keys.refresh_token)? {
            Ok(CredentialState::RefreshToken)
        } else if store.has(&self.keys.authorization_code)? {
            Ok(CredentialState::AuthorizationCode)
        } else {
            Ok(CredentialState::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;

    // Token endpoint that refuses connections; tests below never reach it.
    fn manager(store: Arc<MemoryTokenStore>, dev_token: Option<&str>) -> TokenManager {
        let mut cfg = SourceConfig::new("1", "cid", "secret");
        cfg.token_url = Some("http://127.0.0.1:9/oauth2/token".into());
        cfg.dev_token = dev_token.map(str::to_string);
        TokenManager::new("src", &cfg, store, reqwest::Client::new())
    }

    #[tokio::test]
    async fn stored_access_token_is_returned_without_exchange() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set("src__access-token", "cached", Some(3600)).unwrap();
        let mgr = manager(store, None);
        assert_eq!(mgr.get_valid_access_token().await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn empty_store_demands_authorization() {
        let mgr = manager(Arc::new(MemoryTokenStore::new()), None);
        let err = mgr.get_valid_access_token().await.unwrap_err();
        assert!(err.is_missing_authorization(), "got: {err}");
    }

    #[tokio::test]
    async fn dev_token_short_circuits() {
        let mgr = manager(Arc::new(MemoryTokenStore::new()), Some("dev-123"));
        assert_eq!(mgr.get_valid_access_token().await.unwrap(), "dev-123");
        assert_eq!(mgr.credential_state().unwrap(), CredentialState::DevToken);
    }

    #[test]
    fn refresh_token_takes_priority_over_code() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set("src__auth-token", "code", None).unwrap();
        store.set("src__refresh-token", "refresh", None).unwrap();
        let mgr = manager(store, None);
        assert_eq!(
            mgr.select_grant().unwrap(),
            Grant::RefreshToken("refresh".into())
        );
    }

    #[test]
    fn credential_state_reports_strongest_credential() {
        let store = Arc::new(MemoryTokenStore::new());
        let mgr = manager(store.clone(), None);
        assert_eq!(mgr.credential_state().unwrap(), CredentialState::Unauthorized);
        store.set("src__auth-token", "code", None).unwrap();
        assert_eq!(
            mgr.credential_state().unwrap(),
            CredentialState::AuthorizationCode
        );
        store.set("src__refresh-token", "r", None).unwrap();
        assert_eq!(mgr.credential_state().unwrap(), CredentialState::RefreshToken);
        store.set("src__access-token", "a", Some(60)).unwrap();
        assert_eq!(mgr.credential_state().unwrap(), CredentialState::AccessToken);
    }

    #[test]
    fn discard_minted_tokens_keeps_pending_code() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set("src__auth-token", "new-code", None).unwrap();
        store.set("src__refresh-token", "old", None).unwrap();
        store.set("src__access-token", "a", Some(60)).unwrap();
        let mgr = manager(store.clone(), None);
        mgr.discard_minted_tokens().unwrap();
        assert_eq!(
            mgr.select_grant().unwrap(),
            Grant::AuthorizationCode("new-code".into())
        );
    }

    #[test]
    fn forget_tokens_clears_every_slot() {
        let store = Arc::new(MemoryTokenStore::new());
        store.set("src__auth-token", "code", None).unwrap();
        store.set("src__refresh-token", "r", None).unwrap();
        store.set("src__access-token", "a", Some(60)).unwrap();
        let mgr = manager(store.clone(), None);
        mgr.forget_tokens().unwrap();
        assert_eq!(mgr.credential_state().unwrap(), CredentialState::Unauthorized);
    }
}
