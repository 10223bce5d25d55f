// =============================================================================
// GOOGLE OAUTH SESSION
// =============================================================================
//
// The live credential handle behind `CredentialHandle`. It hands out the
// cached access token while it is fresh and otherwise refreshes it with the
// refresh-token grant.
//
// **Refresh side effects:**
// - the bundle is updated in place (under a write lock)
// - local-file source: the token file is rewritten
// - managed source: nothing is written; the external store stays authoritative
//
// Two concurrent callers may both refresh. That only costs one extra token
// request, so no single-flight guard is used. Token file writes are
// serialized and each one lands through a rename, so the file always holds
// one complete token, the newest one.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::core::credentials::{
    AccessTokenSource, CredentialBundle, CredentialError, CredentialHandle, CredentialSource,
    SessionFactory,
};

pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct GoogleOAuthSession {
    http: Client,
    bundle: RwLock<CredentialBundle>,
    persist_lock: Mutex<()>,
}

impl GoogleOAuthSession {
    pub fn new(http: Client, bundle: CredentialBundle) -> Self {
        Self {
            http,
            bundle: RwLock::new(bundle),
            persist_lock: Mutex::new(()),
        }
    }

    /// Exchanges the refresh token for a new access token.
    pub async fn refresh(&self) -> Result<String, CredentialError> {
        let (app, refresh_token, source) = {
            let bundle = self.bundle.read().await;
            (
                bundle.app.clone(),
                bundle.token.refresh_token.clone(),
                bundle.source.clone(),
            )
        };

        let response = self
            .http
            .post(&app.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CredentialError::RefreshFailed(e.to_string()))?;

        if !status.is_success() {
            let error: OAuthErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let reason = error
                .error_description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| error.error.clone());

            if error.error == "invalid_grant" {
                tracing::error!(source = source.label(), "Refresh token was rejected");
                return Err(reauthorization_error(&source, reason));
            }

            return Err(CredentialError::RefreshFailed(format!(
                "token endpoint returned {}: {}",
                status,
                if reason.is_empty() { body } else { reason }
            )));
        }

        let refreshed: RefreshResponse = serde_json::from_str(&body)
            .map_err(|e| CredentialError::RefreshFailed(format!("unexpected token response: {}", e)))?;

        {
            let mut bundle = self.bundle.write().await;
            bundle.apply_refresh(
                refreshed.access_token.clone(),
                refreshed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
                refreshed.refresh_token,
                Utc::now(),
            );
        }
        tracing::info!(source = source.label(), "Refreshed Google access token");

        // Snapshot under the lock so a slower writer can't put back an older token.
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.bundle.read().await.clone();
        persist_token(&snapshot).await;

        Ok(refreshed.access_token)
    }

    /// Checks the current access token against the introspection endpoint.
    ///
    /// Never fails: a token that can't be confirmed is only marked stale, so
    /// the next use refreshes it.
    pub async fn validate(&self, tokeninfo_url: &str) {
        let token = self.bundle.read().await.token.access_token.clone();
        let Some(token) = token else {
            tracing::debug!("No access token to validate; the first call will refresh");
            return;
        };

        let result = self
            .http
            .get(tokeninfo_url)
            .query(&[("access_token", token.as_str())])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Access token validated");
            }
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    "Access token failed validation; it will be refreshed on first use"
                );
                self.mark_stale().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not validate access token; it will be refreshed on first use");
                self.mark_stale().await;
            }
        }
    }

    pub async fn mark_stale(&self) {
        self.bundle.write().await.mark_stale();
    }
}

#[async_trait]
impl AccessTokenSource for GoogleOAuthSession {
    async fn access_token(&self) -> Result<String, CredentialError> {
        {
            let bundle = self.bundle.read().await;
            if !bundle.needs_refresh(Utc::now()) {
                if let Some(token) = &bundle.token.access_token {
                    return Ok(token.clone());
                }
            }
        }

        self.refresh().await
    }

    async fn invalidate(&self) {
        tracing::debug!("Access token rejected upstream; marking it stale");
        self.mark_stale().await;
    }
}

fn reauthorization_error(source: &CredentialSource, reason: String) -> CredentialError {
    match source {
        CredentialSource::Managed => CredentialError::InteractiveAuthUnavailable(format!(
            "refresh token rejected ({}); update the managed token secret",
            reason
        )),
        CredentialSource::LocalFiles { token_path } => CredentialError::ReauthorizationRequired {
            path: token_path.clone(),
            reason,
        },
    }
}

/// Writes the refreshed token back for the local-file source only.
async fn persist_token(bundle: &CredentialBundle) {
    let CredentialSource::LocalFiles { token_path } = &bundle.source else {
        tracing::debug!("Managed credential source; refreshed token is not persisted");
        return;
    };

    let json = match bundle.token.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Could not serialize refreshed token");
            return;
        }
    };

    // A failed write only means the next process start refreshes again.
    match write_atomically(token_path, json.as_bytes()).await {
        Ok(()) => tracing::debug!(path = %token_path.display(), "Persisted refreshed token"),
        Err(e) => tracing::warn!(
            path = %token_path.display(),
            error = %e,
            "Could not persist refreshed token"
        ),
    }
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Writes `contents` to a sibling temp file, then renames it over `path`.
async fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(path);
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "token".into());
    name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    path.with_file_name(name)
}

// =============================================================================
// FACTORY
// =============================================================================

/// Opens `GoogleOAuthSession`s for the caching resolver.
pub struct GoogleSessionFactory {
    http: Client,
    tokeninfo_url: String,
    validate_on_open: bool,
    token_uri_override: Option<String>,
}

impl GoogleSessionFactory {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            tokeninfo_url: DEFAULT_TOKENINFO_URL.to_string(),
            validate_on_open: true,
            token_uri_override: None,
        }
    }

    pub fn validate_on_open(mut self, validate: bool) -> Self {
        self.validate_on_open = validate;
        self
    }

    pub fn with_tokeninfo_url(mut self, url: impl Into<String>) -> Self {
        self.tokeninfo_url = url.into();
        self
    }

    /// Sends refreshes here instead of the registration's `token_uri`.
    pub fn with_token_uri(mut self, uri: Option<String>) -> Self {
        self.token_uri_override = uri;
        self
    }
}

#[async_trait]
impl SessionFactory for GoogleSessionFactory {
    async fn open(&self, mut bundle: CredentialBundle) -> Result<CredentialHandle, CredentialError> {
        if let Some(uri) = &self.token_uri_override {
            bundle.app.token_uri = uri.clone();
        }
        tracing::debug!(
            client_id = %bundle.app.client_id,
            redirect_uri = %bundle.app.redirect_uri,
            "Opening OAuth session"
        );

        let session = GoogleOAuthSession::new(self.http.clone(), bundle);
        if self.validate_on_open {
            session.validate(&self.tokeninfo_url).await;
        }

        Ok(Arc::new(session))
    }
}
