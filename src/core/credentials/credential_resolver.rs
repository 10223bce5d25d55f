// Credential resolution.
//
// Turns either the runtime-injected secret values or the local credential
// files into a usable, auto-refreshing handle. The handle is built once per
// process and cached; a failed build is retried on the next call.
//
// **Source order:**
// 1. Both managed values present -> parse them, failures are fatal
// 2. Otherwise -> read the two local files
//
// Building the actual OAuth session is delegated to a `SessionFactory` so
// this module stays free of HTTP and can be tested with fakes.

use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::credential_models::{
    AppRegistration, CredentialBundle, CredentialError, CredentialSource, StoredToken,
};

// ============================================================================
// PORTS
// ============================================================================

/// Something that can hand out a currently valid bearer token.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns a usable access token, refreshing it first if needed.
    async fn access_token(&self) -> Result<String, CredentialError>;

    /// Called after the upstream rejected the last token, so the next
    /// `access_token` fetches a fresh one. Sources that cannot refresh
    /// ignore it.
    async fn invalidate(&self) {}
}

/// Shared, read-mostly authorization handle passed to every upstream call.
pub type CredentialHandle = Arc<dyn AccessTokenSource>;

#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self) -> Result<CredentialHandle, CredentialError>;
}

/// Builds a live handle out of a parsed bundle (infra provides the OAuth one).
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, bundle: CredentialBundle) -> Result<CredentialHandle, CredentialError>;
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Secret values injected by the runtime (e.g. a platform secret manager).
#[derive(Clone, Default)]
pub struct ManagedSecrets {
    pub client_config: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for ManagedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedSecrets")
            .field("client_config", &self.client_config.as_ref().map(|_| "<set>"))
            .field("token", &self.token.as_ref().map(|_| "<set>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub managed: ManagedSecrets,
    pub client_config_path: PathBuf,
    pub token_path: PathBuf,
}

// ============================================================================
// BUNDLE LOADING
// ============================================================================

/// Picks a source and parses it into a complete bundle.
///
/// Never returns a partially populated bundle: both halves must parse.
pub async fn load_bundle(settings: &CredentialSettings) -> Result<CredentialBundle, CredentialError> {
    match (&settings.managed.client_config, &settings.managed.token) {
        (Some(client_config), Some(token)) => {
            tracing::debug!("Using managed credential source");
            // Injected secrets mean a managed environment; the files are not a fallback.
            let app = AppRegistration::from_json(client_config)?;
            let token = StoredToken::from_json(token)?;
            return Ok(CredentialBundle {
                app,
                token,
                source: CredentialSource::Managed,
            });
        }
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!(
                "Only one managed credential value is set; falling back to local credential files"
            );
        }
        (None, None) => {}
    }

    tracing::debug!(
        client_config = %settings.client_config_path.display(),
        token = %settings.token_path.display(),
        "Using local credential files"
    );

    let client_config = read_credential_file(&settings.client_config_path, "app registration").await?;
    let app = AppRegistration::from_json(&client_config)?;

    let token = read_credential_file(&settings.token_path, "stored token").await?;
    let token = StoredToken::from_json(&token)?;

    Ok(CredentialBundle {
        app,
        token,
        source: CredentialSource::LocalFiles {
            token_path: settings.token_path.clone(),
        },
    })
}

async fn read_credential_file(path: &Path, what: &str) -> Result<String, CredentialError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(CredentialError::Missing(format!(
            "no {} file at {}",
            what,
            path.display()
        ))),
        Err(e) => Err(CredentialError::Missing(format!(
            "could not read {} file {}: {}",
            what,
            path.display(),
            e
        ))),
    }
}

// ============================================================================
// CACHING RESOLVER
// ============================================================================

/// Process-scoped resolver: builds the handle on first use and hands out clones.
pub struct CachingCredentialResolver<F: SessionFactory> {
    settings: CredentialSettings,
    factory: F,
    handle: OnceCell<CredentialHandle>,
}

impl<F: SessionFactory> CachingCredentialResolver<F> {
    pub fn new(settings: CredentialSettings, factory: F) -> Self {
        Self {
            settings,
            factory,
            handle: OnceCell::new(),
        }
    }
}

#[async_trait]
impl<F: SessionFactory> CredentialResolver for CachingCredentialResolver<F> {
    async fn resolve(&self) -> Result<CredentialHandle, CredentialError> {
        // OnceCell leaves the cell empty when init fails, so the next call retries.
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let bundle = load_bundle(&self.settings).await?;
                tracing::info!(source = bundle.source.label(), "Resolved Google credentials");
                self.factory.open(bundle).await
            })
            .await?;

        Ok(Arc::clone(handle))
    }
}
