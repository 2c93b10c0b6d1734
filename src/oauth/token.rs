use std::time::Duration;

use serde::Deserialize;

use crate::error::BoxsyncError;

/// The credential handed to the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode(String),
    RefreshToken(String),
}

impl std::fmt::Debug for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the credential itself.
        f.debug_tuple("Grant").field(&self.grant_type()).finish()
    }
}

impl Grant {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode(_) => "authorization_code",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }

    /// Form field carrying the credential.
    fn param_name(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode(_) => "code",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }

    fn value(&self) -> &str {
        match self {
            Grant::AuthorizationCode(v) | Grant::RefreshToken(v) => v,
        }
    }

    pub fn is_refresh(&self) -> bool {
        matches!(self, Grant::RefreshToken(_))
    }
}

/// Successful token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

/// Exchange `grant` for a fresh access/refresh token pair.
///
/// Transport failures, non-2xx responses and unparseable bodies all come
/// back as [`BoxsyncError::Upstream`]. Nothing is retried.
pub async fn exchange_grant(
    http: &reqwest::Client,
    token_endpoint: &str,
    grant: &Grant,
    client_id: &str,
    client_secret: &str,
    timeout: Duration,
) -> Result<TokenResponse, BoxsyncError> {
    let resp = http
        .post(token_endpoint)
        .timeout(timeout)
        .form(&[
            ("grant_type", grant.grant_type()),
            (grant.param_name(), grant.value()),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .send()
        .await
        .map_err(|e| BoxsyncError::transport("Token exchange request failed", e))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BoxsyncError::Upstream {
            status: Some(status.as_u16()),
            detail: format!("Token exchange ({}) rejected: {body}", grant.grant_type()),
        });
    }

    resp.json::<TokenResponse>().await.map_err(|e| BoxsyncError::Upstream {
        status: Some(status.as_u16()),
        detail: format!("Failed to parse token response: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_form_fields() {
        let code = Grant::AuthorizationCode("c".into());
        assert_eq!(code.grant_type(), "authorization_code");
        assert_eq!(code.param_name(), "code");
        assert!(!code.is_refresh());

        let refresh = Grant::RefreshToken("r".into());
        assert_eq!(refresh.grant_type(), "refresh_token");
        assert_eq!(refresh.param_name(), "refresh_token");
        assert!(refresh.is_refresh());
    }

    #[test]
    fn grant_debug_hides_credential() {
        let grant = Grant::RefreshToken("super-secret".into());
        let printed = format!("{grant:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("refresh_token"));
    }

    #[test]
    fn token_response_deserialization() {
        let json = r#"{
            "access_token": "T9cE5asGnuyYCCqIZFoWjFHvNbvVqHjl",
            "expires_in": 3600,
            "restricted_to": [],
            "refresh_token": "J7rxTiWOHMoSC1isKZKBZWizoRXjkQzig5C6jFgCVJ9bUnsUfGMinKBDLZWP9BgR",
            "token_type": "bearer"
        }"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.expires_in, 3600);
        assert_eq!(resp.token_type.as_deref(), Some("bearer"));
        assert!(resp.refresh_token.starts_with("J7rx"));
    }

    #[test]
    fn token_response_requires_refresh_token() {
        let json = r#"{"access_token": "a", "expires_in": 10}"#;
        assert!(serde_json::from_str::<TokenResponse>(json).is_err());
    }

    #[test]
    fn token_response_debug_hides_tokens() {
        let resp = TokenResponse {
            access_token: "acc-secret".into(),
            expires_in: 60,
            refresh_token: "ref-secret".into(),
            token_type: None,
        };
        let printed = format!("{resp:?}");
        assert!(!printed.contains("acc-secret"));
        assert!(!printed.contains("ref-secret"));
    }
}
