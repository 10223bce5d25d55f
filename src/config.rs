// Process configuration.
//
// Read once at start-up from the environment (after `.env` is loaded).
// Every variable has a default except the managed secret values, so a bare
// `cargo run` serves stdio using `credentials.json` / `token.json`.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::credentials::{CredentialSettings, ManagedSecrets};
use crate::infra::google_auth::DEFAULT_TOKENINFO_URL;
use crate::infra::google_docs::{DEFAULT_DOCS_API_BASE, DEFAULT_DRIVE_API_BASE};

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Stdio,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub transport: TransportKind,
    pub http_bind: SocketAddr,
    pub max_body_bytes: usize,
    pub credentials: CredentialSettings,
    pub validate_token: bool,
    pub docs_api_base: String,
    pub drive_api_base: String,
    pub token_uri_override: Option<String>,
    pub tokeninfo_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let transport = match get("DOCS_TRANSPORT").as_deref().map(str::trim) {
            None => TransportKind::Stdio,
            Some(v) if v.eq_ignore_ascii_case("stdio") => TransportKind::Stdio,
            Some(v) if v.eq_ignore_ascii_case("http") => TransportKind::Http,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "DOCS_TRANSPORT",
                    reason: format!("expected `http` or `stdio`, got `{}`", other),
                })
            }
        };

        let bind = get("DOCS_HTTP_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let http_bind: SocketAddr = bind.trim().parse().map_err(|_| ConfigError::Invalid {
            var: "DOCS_HTTP_BIND",
            reason: format!("`{}` is not a socket address", bind),
        })?;

        let max_body_bytes = match get("DOCS_MAX_BODY_BYTES") {
            None => DEFAULT_MAX_BODY_BYTES,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DOCS_MAX_BODY_BYTES",
                        reason: format!("`{}` is not a positive integer", raw),
                    })
                }
            },
        };

        let validate_token = match get("GOOGLE_VALIDATE_TOKEN") {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "GOOGLE_VALIDATE_TOKEN",
                reason: format!("`{}` is not a boolean", raw),
            })?,
        };

        let credentials = CredentialSettings {
            managed: ManagedSecrets {
                client_config: get("GOOGLE_OAUTH_CLIENT_CONFIG"),
                token: get("GOOGLE_OAUTH_TOKEN"),
            },
            client_config_path: PathBuf::from(
                get("GOOGLE_CREDENTIALS_FILE").unwrap_or_else(|| "credentials.json".to_string()),
            ),
            token_path: PathBuf::from(
                get("GOOGLE_TOKEN_FILE").unwrap_or_else(|| "token.json".to_string()),
            ),
        };

        Ok(Self {
            transport,
            http_bind,
            max_body_bytes,
            credentials,
            validate_token,
            docs_api_base: get("GOOGLE_DOCS_API_BASE")
                .unwrap_or_else(|| DEFAULT_DOCS_API_BASE.to_string()),
            drive_api_base: get("GOOGLE_DRIVE_API_BASE")
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
            token_uri_override: get("GOOGLE_OAUTH_TOKEN_URI"),
            tokeninfo_url: get("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|| DEFAULT_TOKENINFO_URL.to_string()),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
