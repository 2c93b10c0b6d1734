use std::time::Duration;

use tracing::warn;

use crate::config::load_config;
use crate::error::BoxsyncError;
use crate::oauth::{listen_for_callback, TokenManager};

use super::connection::{find_source, open_token_store};

pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 120_000;

/// Obtain an authorization code for `source` and exchange it right away.
///
/// With `code` the value is stored as-is. Otherwise the authorize URL is
/// printed (and opened in a browser unless `no_browser`) and the redirect is
/// awaited on the loopback address named by the source's redirect URI.
pub async fn run_auth(
    config_path: Option<&str>,
    source: &str,
    code: Option<&str>,
    no_browser: bool,
    timeout: Duration,
) -> Result<(), BoxsyncError> {
    let config = load_config(config_path)?;
    let source_config = find_source(&config, source)?;
    let manager = TokenManager::new(
        source,
        source_config,
        open_token_store(&config),
        reqwest::Client::new(),
    );
    let authorizer = manager.authorizer();

    match code {
        Some(code) => authorizer.accept_code(code)?,
        None => {
            let request = authorizer.begin()?;
            println!("Open this URL to grant access to '{source}':\n\n  {}\n", request.url);
            if !no_browser && webbrowser::open(&request.url).is_err() {
                warn!("Could not open browser automatically");
            }
            let params = listen_for_callback(authorizer.redirect_uri(), timeout).await?;
            let state = params.state.as_deref().unwrap_or_default();
            authorizer.complete(&params.code, state)?;
        }
    }

    // A leftover refresh token would otherwise win over the new code.
    manager.discard_minted_tokens()?;
    manager.get_valid_access_token().await?;
    println!("Authorized '{source}' ({})", manager.credential_state()?);
    Ok(())
}
