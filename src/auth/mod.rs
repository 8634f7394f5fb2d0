//! Credential lifecycle: decides how to authenticate and builds the service
//! handles the tools run against.
//!
//! Resolution order, first match wins:
//! 1. a stored credential that is still valid is reused;
//! 2. an expired stored credential with a refresh token is refreshed;
//! 3. a client secret file starts the interactive browser flow;
//! 4. an API key yields a read-only, public-sheets-only primary handle;
//! 5. otherwise authentication fails.

use crate::config::ServerConfig;
use crate::google::{
    ApiAuth, DriveApi, GoogleDriveClient, GoogleSheetsClient, SheetsApi,
    DEFAULT_DRIVE_BASE_URL, DEFAULT_SHEETS_BASE_URL,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub mod credential;
pub mod oauth;
pub mod store;

pub use credential::{ClientSecret, Credential};
pub use oauth::{GoogleOAuthFlow, OAuthFlow};
pub use store::{CredentialStore, FileCredentialStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "no usable credential source: provide an OAuth client secret (credentials.json) or set GOOGLE_SHEETS_API_KEY"
    )]
    NoCredentialSource,
    #[error("token refresh failed: {0}")]
    Refresh(String),
    #[error("interactive authorization failed: {0}")]
    Interactive(String),
    #[error("interactive authorization timed out after {0}ms")]
    Timeout(u128),
    #[error("invalid client secret file {path:?}: {reason}")]
    InvalidClientSecret { path: PathBuf, reason: String },
    #[error("credential has no access token")]
    MissingAccessToken,
}

/// Which credential source produced the current handles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthMode {
    Cached,
    Refreshed,
    Interactive,
    ApiKeyOnly,
    #[default]
    Unauthenticated,
}

impl AuthMode {
    /// OAuth modes carry Drive access; API-key mode does not.
    pub fn grants_discovery(self) -> bool {
        matches!(
            self,
            AuthMode::Cached | AuthMode::Refreshed | AuthMode::Interactive
        )
    }
}

/// The primary (Sheets) handle and, under OAuth, the extended (Drive) handle.
#[derive(Clone)]
pub struct Services {
    mode: AuthMode,
    primary: Arc<dyn SheetsApi>,
    extended: Option<Arc<dyn DriveApi>>,
    expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("mode", &self.mode)
            .field("extended", &self.extended.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Services {
    /// Both handles from one OAuth credential. `mode` must be an OAuth mode.
    pub fn oauth(mode: AuthMode, primary: Arc<dyn SheetsApi>, extended: Arc<dyn DriveApi>) -> Self {
        debug_assert!(mode.grants_discovery(), "{mode} is not an OAuth mode");
        Self {
            mode,
            primary,
            extended: Some(extended),
            expires_at: None,
        }
    }

    pub fn api_key_only(primary: Arc<dyn SheetsApi>) -> Self {
        Self {
            mode: AuthMode::ApiKeyOnly,
            primary,
            extended: None,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn primary(&self) -> &Arc<dyn SheetsApi> {
        &self.primary
    }

    pub fn extended(&self) -> Option<&Arc<dyn DriveApi>> {
        self.extended.as_ref()
    }

    /// Bearer handles stop working once the access token lapses; the caller
    /// should re-authenticate (normally a silent refresh) before using them.
    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Builds concrete handles for a credential mode.
pub trait ServiceFactory: Send + Sync {
    fn oauth_handles(
        &self,
        credential: &Credential,
    ) -> Result<(Arc<dyn SheetsApi>, Arc<dyn DriveApi>), AuthError>;

    fn api_key_handle(&self, api_key: &str) -> Arc<dyn SheetsApi>;
}

#[derive(Debug, Clone)]
pub struct GoogleServiceFactory {
    sheets_base_url: String,
    drive_base_url: String,
}

impl Default for GoogleServiceFactory {
    fn default() -> Self {
        Self {
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            drive_base_url: DEFAULT_DRIVE_BASE_URL.to_string(),
        }
    }
}

impl ServiceFactory for GoogleServiceFactory {
    fn oauth_handles(
        &self,
        credential: &Credential,
    ) -> Result<(Arc<dyn SheetsApi>, Arc<dyn DriveApi>), AuthError> {
        let token = credential
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;
        let sheets: Arc<dyn SheetsApi> = Arc::new(GoogleSheetsClient::with_base_url(
            ApiAuth::Bearer(token.clone()),
            self.sheets_base_url.clone(),
        ));
        let drive: Arc<dyn DriveApi> = Arc::new(GoogleDriveClient::with_base_url(
            ApiAuth::Bearer(token),
            self.drive_base_url.clone(),
        ));
        Ok((sheets, drive))
    }

    fn api_key_handle(&self, api_key: &str) -> Arc<dyn SheetsApi> {
        Arc::new(GoogleSheetsClient::with_base_url(
            ApiAuth::ApiKey(api_key.to_string()),
            self.sheets_base_url.clone(),
        ))
    }
}

pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    oauth: Arc<dyn OAuthFlow>,
    factory: Arc<dyn ServiceFactory>,
    client_secret_file: Option<PathBuf>,
    api_key: Option<String>,
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        oauth: Arc<dyn OAuthFlow>,
        factory: Arc<dyn ServiceFactory>,
    ) -> Self {
        Self {
            store,
            oauth,
            factory,
            client_secret_file: None,
            api_key: None,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let oauth = GoogleOAuthFlow::new(
            config.callback_port,
            config.auth_timeout(),
            config.open_browser,
        );
        Self::new(
            Arc::new(FileCredentialStore::new(config.token_file.clone())),
            Arc::new(oauth),
            Arc::new(GoogleServiceFactory::default()),
        )
        .with_client_secret_file(config.credentials_file.clone())
        .with_api_key(config.api_key.clone())
    }

    pub fn with_client_secret_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_secret_file = Some(path.into());
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub async fn authenticate(&self) -> Result<Services, AuthError> {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("ignoring unreadable stored credential: {e:#}");
                None
            }
        };

        if let Some(credential) = stored.as_ref() {
            if credential.is_valid() {
                tracing::info!("using cached OAuth credential");
                return self.oauth_services(AuthMode::Cached, credential);
            }

            if credential.is_expired() && credential.has_refresh() {
                match self.oauth.refresh(credential).await {
                    Ok(refreshed) => {
                        self.persist(&refreshed);
                        return self.oauth_services(AuthMode::Refreshed, &refreshed);
                    }
                    Err(e) => tracing::warn!("{e}; trying other credential sources"),
                }
            }
        }

        if let Some(path) = self.client_secret_file.as_deref()
            && let Some(secret) = ClientSecret::load(path)?
        {
            tracing::info!(path = %path.display(), "starting interactive OAuth authorization");
            let credential = self.oauth.authorize(&secret).await?;
            self.persist(&credential);
            return self.oauth_services(AuthMode::Interactive, &credential);
        }

        if let Some(api_key) = self.api_key.as_deref() {
            tracing::info!("using API key authentication (limited to public sheets)");
            return Ok(Services::api_key_only(self.factory.api_key_handle(api_key)));
        }

        Err(AuthError::NoCredentialSource)
    }

    fn oauth_services(
        &self,
        mode: AuthMode,
        credential: &Credential,
    ) -> Result<Services, AuthError> {
        let (primary, extended) = self.factory.oauth_handles(credential)?;
        Ok(Services::oauth(mode, primary, extended).with_expiry(credential.expires_at()))
    }

    fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save(credential) {
            tracing::warn!("failed to persist credential: {e:#}");
        }
    }
}
