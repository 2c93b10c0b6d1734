use std::iter::Peekable;
use std::str::Chars;

use crate::error::BoxsyncError;

use super::types::SourceConfig;

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - env var value, or fallback if unset or empty
/// - `$env:VAR` - same as `${VAR}`
pub fn expand_env_vars(input: &str) -> Result<String, BoxsyncError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let expr = read_braced(&mut chars)
                .ok_or_else(|| env_error("Unclosed variable reference: missing '}'"))?;
            match expr.split_once(":-") {
                Some((name, fallback)) => match std::env::var(name) {
                    Ok(val) if !val.is_empty() => result.push_str(&val),
                    _ => result.push_str(fallback),
                },
                None => result.push_str(&lookup(&expr)?),
            }
            continue;
        }

        let rest: String = chars.clone().take(4).collect();
        if rest == "env:" {
            for _ in 0..4 {
                chars.next();
            }
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                return Err(env_error("Empty variable name in $env: reference"));
            }
            result.push_str(&lookup(&name)?);
            continue;
        }

        result.push('$');
    }

    Ok(result)
}

fn read_braced(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut expr = String::new();
    for c in chars.by_ref() {
        if c == '}' {
            return Some(expr);
        }
        expr.push(c);
    }
    None
}

fn lookup(name: &str) -> Result<String, BoxsyncError> {
    std::env::var(name)
        .map_err(|_| env_error(&format!("Environment variable '{name}' is not set")))
}

fn expand_opt(value: &mut Option<String>) -> Result<(), BoxsyncError> {
    if let Some(v) = value {
        *v = expand_env_vars(v)?;
    }
    Ok(())
}

/// Expand environment variables in all string fields of a SourceConfig.
pub fn expand_source_config(config: &mut SourceConfig) -> Result<(), BoxsyncError> {
    config.folder_id = expand_env_vars(&config.folder_id)?;
    config.client_id = expand_env_vars(&config.client_id)?;
    config.client_secret = expand_env_vars(&config.client_secret)?;
    expand_opt(&mut config.dev_token)?;
    expand_opt(&mut config.redirect_uri)?;
    expand_opt(&mut config.api_base_url)?;
    expand_opt(&mut config.token_url)?;
    expand_opt(&mut config.authorize_url)?;
    Ok(())
}

fn env_error(detail: &str) -> BoxsyncError {
    BoxsyncError::ConfigError {
        path: std::path::PathBuf::from("<env>"),
        detail: detail.to_string(),
    }
}
