use std::time::Duration;

use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::debug;

use crate::error::BoxsyncError;

/// Query parameters Box appends to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: Option<String>,
}

/// Bind the host and port of `redirect_uri` and wait for the browser redirect.
/// Requests for any other path (a favicon fetch, a stray scanner) get a 404
/// and the listener keeps waiting until `timeout`.
pub async fn listen_for_callback(
    redirect_uri: &str,
    timeout: Duration,
) -> Result<CallbackParams, BoxsyncError> {
    let addr = bind_address(redirect_uri)?;
    let expected_path = callback_path(redirect_uri)?;
    let listener = TcpListener::bind(&addr).await?;
    debug!(%addr, path = %expected_path, "Waiting for OAuth redirect");

    tokio::time::timeout(timeout, serve_until_callback(&listener, &expected_path))
        .await
        .map_err(|_| {
            BoxsyncError::OAuthError(format!(
                "Timed out waiting for OAuth callback after {}s",
                timeout.as_secs()
            ))
        })?
}

async fn serve_until_callback(
    listener: &TcpListener,
    expected_path: &str,
) -> Result<CallbackParams, BoxsyncError> {
    loop {
        let (mut stream, peer) = listener.accept().await?;

        let mut buf = vec![0u8; 8192];
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                debug!(%peer, error = %e, "Dropping unreadable connection");
                continue;
            }
        };
        let request = String::from_utf8_lossy(&buf[..n]);

        if request_path(&request).as_deref() != Some(expected_path) {
            debug!(%peer, "Ignoring request for another path");
            let _ = respond(&mut stream, "404 Not Found", NOT_FOUND_PAGE).await;
            continue;
        }

        let parsed = parse_callback_request(&request);
        let (status, body) = match &parsed {
            Ok(_) => ("200 OK", GRANTED_PAGE),
            Err(_) => ("400 Bad Request", FAILED_PAGE),
        };
        respond(&mut stream, status, body).await?;
        return parsed;
    }
}

const GRANTED_PAGE: &str = "<!DOCTYPE html><html><body><h1>Box access granted</h1>\
     <p>You can close this window and return to the terminal.</p></body></html>";
const FAILED_PAGE: &str = "<!DOCTYPE html><html><body><h1>Box authorization failed</h1>\
     <p>Check the terminal for details.</p></body></html>";
const NOT_FOUND_PAGE: &str = "<!DOCTYPE html><html><body><h1>Not found</h1></body></html>";

async fn respond(
    stream: &mut tokio::net::TcpStream,
    status: &str,
    body: &str,
) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn bind_address(redirect_uri: &str) -> Result<String, BoxsyncError> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| BoxsyncError::OAuthError(format!("Invalid redirect URI '{redirect_uri}': {e}")))?;
    let host = match url.host_str() {
        Some("localhost") | None => "127.0.0.1",
        Some(h) => h,
    };
    let port = url.port_or_known_default().ok_or_else(|| {
        BoxsyncError::OAuthError(format!("Redirect URI '{redirect_uri}' has no port"))
    })?;
    Ok(format!("{host}:{port}"))
}

fn callback_path(redirect_uri: &str) -> Result<String, BoxsyncError> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| BoxsyncError::OAuthError(format!("Invalid redirect URI '{redirect_uri}': {e}")))?;
    Ok(url.path().to_string())
}

fn request_target(request: &str) -> Option<&str> {
    request.lines().next().and_then(|line| line.split_whitespace().nth(1))
}

fn request_path(request: &str) -> Option<String> {
    let target = request_target(request)?;
    Url::parse(&format!("http://callback{target}"))
        .ok()
        .map(|url| url.path().to_string())
}

fn parse_callback_request(request: &str) -> Result<CallbackParams, BoxsyncError> {
    // "GET /callback?code=... HTTP/1.1"
    let target = request_target(request).ok_or_else(|| BoxsyncError::OAuthError("Malformed callback request".into()))?;
    let url = Url::parse(&format!("http://callback{target}"))
        .map_err(|e| BoxsyncError::OAuthError(format!("Malformed callback request: {e}")))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(BoxsyncError::OAuthError(format!(
            "Box denied authorization: {error}"
        )));
    }
    let code = code.ok_or_else(|| {
        BoxsyncError::OAuthError("No authorization code found in callback request".into())
    })?;
    Ok(CallbackParams { code, state })
}
