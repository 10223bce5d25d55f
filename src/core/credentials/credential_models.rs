// Credential domain models.
//
// These types describe the two JSON shapes we consume (the OAuth app
// registration and the stored user token) and the bundle they are merged
// into. Nothing in here touches the network or the filesystem, so the
// parsing rules can be tested in isolation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Redirect target used when the app registration does not list one.
pub const OUT_OF_BAND_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Google's OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Access tokens this close to expiry are treated as already expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credentials available: {0}")]
    Missing(String),

    #[error("invalid app registration config: {0}")]
    InvalidClientConfig(String),

    #[error("invalid stored token: {0}")]
    InvalidToken(String),

    #[error("no interactive auth in managed environment: {0}")]
    InteractiveAuthUnavailable(String),

    #[error("stored authorization was rejected ({reason}); re-authorize and update {}", path.display())]
    ReauthorizationRequired { path: PathBuf, reason: String },

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("access token rejected by upstream API: {0}")]
    AccessRejected(String),
}

// ============================================================================
// APP REGISTRATION
// ============================================================================

/// The `installed` / `web` section of a Google client secret file.
#[derive(Debug, Default, Deserialize)]
struct RawClientSection {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawClientConfig {
    #[serde(default)]
    installed: Option<RawClientSection>,
    #[serde(default)]
    web: Option<RawClientSection>,
}

/// OAuth client registration (who we are when talking to Google).
#[derive(Clone, PartialEq, Eq)]
pub struct AppRegistration {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_uri: String,
}

impl AppRegistration {
    /// Parses a client secret JSON blob with an `installed` or `web` section.
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let raw: RawClientConfig = serde_json::from_str(json)
            .map_err(|e| CredentialError::InvalidClientConfig(e.to_string()))?;

        let section = raw.installed.or(raw.web).ok_or_else(|| {
            CredentialError::InvalidClientConfig(
                "expected an \"installed\" or \"web\" section".to_string(),
            )
        })?;

        let client_id = non_empty(section.client_id).ok_or_else(|| {
            CredentialError::InvalidClientConfig("client_id is missing".to_string())
        })?;
        let client_secret = non_empty(section.client_secret).ok_or_else(|| {
            CredentialError::InvalidClientConfig("client_secret is missing".to_string())
        })?;

        let redirect_uri = section
            .redirect_uris
            .into_iter()
            .find(|uri| !uri.trim().is_empty())
            .unwrap_or_else(|| OUT_OF_BAND_REDIRECT.to_string());

        let token_uri =
            non_empty(section.token_uri).unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            token_uri,
        })
    }
}

impl fmt::Debug for AppRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRegistration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

// ============================================================================
// STORED TOKEN
// ============================================================================

/// The persisted OAuth token.
///
/// Fields we don't model (scopes, client ids written by other tools) are kept
/// in `extra` so rewriting the token file doesn't drop them.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(default, alias = "token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,

    /// The key the access token was read under; writes reuse it.
    #[serde(skip)]
    pub access_token_key: AccessTokenKey,
}

/// Token files written by different OAuth libraries name the access token
/// differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessTokenKey {
    #[default]
    AccessToken,
    Token,
}

impl AccessTokenKey {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessTokenKey::AccessToken => "access_token",
            AccessTokenKey::Token => "token",
        }
    }
}

impl StoredToken {
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| CredentialError::InvalidToken(e.to_string()))?;
        let key = if raw.get("access_token").is_none() && raw.get("token").is_some() {
            AccessTokenKey::Token
        } else {
            AccessTokenKey::AccessToken
        };

        let mut token: StoredToken = serde_json::from_value(raw)
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))?;
        token.access_token_key = key;

        if token.refresh_token.trim().is_empty() {
            return Err(CredentialError::InvalidToken(
                "refresh_token is missing".to_string(),
            ));
        }

        token.access_token = non_empty(token.access_token.take());
        Ok(token)
    }

    /// Pretty JSON for the token file, with the access token under the key
    /// it was originally read from.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            if let Some(access_token) = object.remove(AccessTokenKey::AccessToken.as_str()) {
                object.insert(self.access_token_key.as_str().to_string(), access_token);
            }
        }
        serde_json::to_string_pretty(&value)
    }

    /// True when the access token can still be used at `now`.
    ///
    /// A token without an expiry is never considered fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expiry) {
            (Some(_), Some(expiry)) => expiry > now + Duration::seconds(EXPIRY_SKEW_SECS),
            _ => false,
        }
    }
}

impl fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

// ============================================================================
// BUNDLE
// ============================================================================

/// Where a bundle came from. Decides whether refreshed tokens get written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Secrets injected by the runtime; the external store is authoritative.
    Managed,
    /// Credential files on local disk.
    LocalFiles { token_path: PathBuf },
}

impl CredentialSource {
    pub fn label(&self) -> &'static str {
        match self {
            CredentialSource::Managed => "managed",
            CredentialSource::LocalFiles { .. } => "local-files",
        }
    }
}

/// A fully populated credential set: registration, token, and origin.
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    pub app: AppRegistration,
    pub token: StoredToken,
    pub source: CredentialSource,
}

impl CredentialBundle {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_fresh(now)
    }

    /// Installs a freshly issued access token.
    ///
    /// Google only sometimes rotates the refresh token; keep the old one unless a
    /// new one is supplied.
    pub fn apply_refresh(
        &mut self,
        access_token: String,
        expires_in_secs: i64,
        rotated_refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.token.access_token = Some(access_token);
        self.token.expiry = Some(now + Duration::seconds(expires_in_secs.max(0)));
        if let Some(refresh) = non_empty(rotated_refresh_token) {
            self.token.refresh_token = refresh;
        }
    }

    /// Forces the next use to refresh.
    pub fn mark_stale(&mut self) {
        self.token.expiry = None;
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
