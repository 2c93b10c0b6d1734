use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BoxsyncError {
    #[error("Source '{source_id}' must be authorized for Box access: {authorize_url}")]
    MissingAuthorization {
        source_id: String,
        authorize_url: String,
    },

    #[error("{}", format_upstream(.status, .detail))]
    Upstream { status: Option<u16>, detail: String },

    #[error("Cannot write {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Source '{0}' not found in configuration")]
    SourceNotFound(String),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("Token store error: {0}")]
    TokenStore(String),

    #[error("No token stored under '{0}'")]
    TokenNotFound(String),

    #[error("Invalid file identifier '{0}': expected '<id>|||<name>'")]
    InvalidIdentifier(String),

    #[error("OAuth error: {0}")]
    OAuthError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_upstream(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("Box API error (status {code}): {detail}"),
        None => format!("Box API request failed: {detail}"),
    }
}

impl BoxsyncError {
    pub(crate) fn transport(context: &str, err: reqwest::Error) -> Self {
        BoxsyncError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            detail: format!("{context}: {err}"),
        }
    }

    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            BoxsyncError::MissingAuthorization { .. } => "auth_required",
            BoxsyncError::Upstream { .. } => "upstream_error",
            BoxsyncError::LocalIo { .. } => "local_io_error",
            BoxsyncError::SourceNotFound(_) => "not_found",
            BoxsyncError::ConfigError { .. } => "config_error",
            BoxsyncError::TokenStore(_) => "token_store_error",
            BoxsyncError::TokenNotFound(_) => "not_found",
            BoxsyncError::InvalidIdentifier(_) => "invalid_identifier",
            BoxsyncError::OAuthError(_) => "oauth_error",
            BoxsyncError::IoError(_) => "io_error",
        }
    }

    /// True when the user has to (re-)authorize before anything else can succeed.
    pub fn is_missing_authorization(&self) -> bool {
        matches!(self, BoxsyncError::MissingAuthorization { .. })
    }

    pub fn source_id(&self) -> Option<&str> {
        match self {
            BoxsyncError::MissingAuthorization { source_id, .. } => Some(source_id),
            BoxsyncError::SourceNotFound(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(source) = self.source_id() {
            obj.insert("source".into(), serde_json::Value::String(source.to_string()));
        }
        if let BoxsyncError::MissingAuthorization { authorize_url, .. } = self {
            obj.insert(
                "authorizeUrl".into(),
                serde_json::Value::String(authorize_url.clone()),
            );
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}
