use std::sync::Arc;

use tracing::info;

use crate::config::SourceConfig;
use crate::error::BoxsyncError;
use crate::store::{get_optional, TokenKeys, TokenStore};

/// How long a generated `state` value stays valid.
pub const STATE_TTL_SECS: u64 = 600;

/// A prepared authorization redirect.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Builds authorize URIs and accepts the codes they eventually produce.
#[derive(Debug, Clone)]
pub struct Authorizer {
    source_id: String,
    client_id: String,
    authorize_endpoint: String,
    redirect_uri: String,
    store: Arc<dyn TokenStore>,
    keys: TokenKeys,
}

impl Authorizer {
    pub fn new(source_id: &str, config: &SourceConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            source_id: source_id.to_string(),
            client_id: config.client_id.clone(),
            authorize_endpoint: config.authorize_url().to_string(),
            redirect_uri: config.redirect_uri().to_string(),
            store,
            keys: TokenKeys::for_source(source_id),
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Generate a fresh state value, remember it, and build the authorize URI.
    pub fn begin(&self) -> Result<AuthorizationRequest, BoxsyncError> {
        let state = uuid::Uuid::new_v4().to_string();
        self.store
            .set(&self.keys.oauth_state, &state, Some(STATE_TTL_SECS))?;
        let url = self.authorize_url(&state)?;
        Ok(AuthorizationRequest { url, state })
    }

    /// Reuse a still-pending state so an `auth` run waiting on its callback
    /// keeps working; start a new request only when none is live.
    pub fn pending_or_begin(&self) -> Result<AuthorizationRequest, BoxsyncError> {
        match get_optional(self.store.as_ref(), &self.keys.oauth_state)? {
            Some(state) => {
                let url = self.authorize_url(&state)?;
                Ok(AuthorizationRequest { url, state })
            }
            None => self.begin(),
        }
    }

    pub fn authorize_url(&self, state: &str) -> Result<String, BoxsyncError> {
        let url = reqwest::Url::parse_with_params(
            &self.authorize_endpoint,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| BoxsyncError::ConfigError {
            path: std::path::PathBuf::from("<config>"),
            detail: format!(
                "Invalid authorizeUrl '{}' for source '{}': {e}",
                self.authorize_endpoint, self.source_id
            ),
        })?;
        Ok(url.into())
    }

    /// Accept a code delivered to the redirect URI, checking `state` first.
    pub fn complete(&self, code: &str, state: &str) -> Result<(), BoxsyncError> {
        let expected = get_optional(self.store.as_ref(), &self.keys.oauth_state)?;
        match expected {
            Some(expected) if expected == state => {}
            Some(_) => {
                return Err(BoxsyncError::OAuthError(
                    "State mismatch in authorization callback".to_string(),
                ))
            }
            None => {
                return Err(BoxsyncError::OAuthError(
                    "No pending authorization request (state expired or never issued)"
                        .to_string(),
                ))
            }
        }
        self.store.remove(&self.keys.oauth_state)?;
        self.accept_code(code)
    }

    /// Store an authorization code obtained out-of-band.
    pub fn accept_code(&self, code: &str) -> Result<(), BoxsyncError> {
        if code.trim().is_empty() {
            return Err(BoxsyncError::OAuthError(
                "Authorization code must not be empty".to_string(),
            ));
        }
        self.store.set(&self.keys.authorization_code, code.trim(), None)?;
        info!(source = %self.source_id, "Authorization code received");
        Ok(())
    }

    /// The error handed to callers when no credential is left to exchange.
    pub fn missing_authorization(&self) -> BoxsyncError {
        match self.pending_or_begin() {
            Ok(request) => BoxsyncError::MissingAuthorization {
                source_id: self.source_id.clone(),
                authorize_url: request.url,
            },
            Err(e) => e,
        }
    }
}
