#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use sheets_mcp::auth::{
    AuthError, Authenticator, ClientSecret, Credential, CredentialStore, OAuthFlow,
    ServiceFactory,
};
use sheets_mcp::config::ServerConfig;
use sheets_mcp::google::{
    DriveApi, FileList, FileQuery, RemoteError, SheetsApi, SpreadsheetMetadata, ValueRows,
};
use sheets_mcp::state::AppState;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub mod mcp;

/// In-memory Sheets handle. Values are keyed by the exact range requested.
#[derive(Default)]
pub struct FakeSheets {
    pub values: Mutex<HashMap<String, ValueRows>>,
    pub metadata: Mutex<SpreadsheetMetadata>,
    pub failure: Mutex<Option<(u16, String, String)>>,
    pub calls: Mutex<Vec<String>>,
    pub public_only: bool,
}

impl FakeSheets {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn public() -> Arc<Self> {
        Arc::new(Self {
            public_only: true,
            ..Self::default()
        })
    }

    pub fn with_values(self: Arc<Self>, range: &str, rows: Value) -> Arc<Self> {
        let rows: ValueRows = serde_json::from_value(rows).expect("rows");
        self.values.lock().insert(range.to_string(), rows);
        self
    }

    pub fn with_metadata(self: Arc<Self>, metadata: Value) -> Arc<Self> {
        *self.metadata.lock() = serde_json::from_value(metadata).expect("metadata");
        self
    }

    pub fn fail_with(&self, http_status: u16, status: &str, message: &str) {
        *self.failure.lock() = Some((http_status, status.to_string(), message.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn check_failure(&self) -> Result<()> {
        if let Some((http, status, message)) = self.failure.lock().clone() {
            return Err(RemoteError::from_provider(http, Some(status), message).into());
        }
        Ok(())
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: Option<&str>,
    ) -> Result<ValueRows> {
        self.calls.lock().push(format!(
            "values:{spreadsheet_id}:{range}:{}",
            render.unwrap_or("-")
        ));
        self.check_failure()?;
        Ok(self.values.lock().get(range).cloned().unwrap_or_default())
    }

    async fn get_spreadsheet(
        &self,
        spreadsheet_id: &str,
        fields: Option<&str>,
    ) -> Result<SpreadsheetMetadata> {
        self.calls.lock().push(format!(
            "metadata:{spreadsheet_id}:{}",
            fields.unwrap_or("-")
        ));
        self.check_failure()?;
        Ok(self.metadata.lock().clone())
    }

    fn is_read_only_public(&self) -> bool {
        self.public_only
    }
}

#[derive(Default)]
pub struct FakeDrive {
    pub listing: Mutex<FileList>,
    pub queries: Mutex<Vec<FileQuery>>,
}

impl FakeDrive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_files(self: Arc<Self>, listing: Value) -> Arc<Self> {
        *self.listing.lock() = serde_json::from_value(listing).expect("file list");
        self
    }

    pub fn queries(&self) -> Vec<FileQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_files(&self, query: &FileQuery) -> Result<FileList> {
        self.queries.lock().push(query.clone());
        Ok(self.listing.lock().clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub credential: Mutex<Option<Credential>>,
    pub corrupt: bool,
    pub saves: AtomicUsize,
}

impl MemoryStore {
    pub fn holding(credential: Option<Credential>) -> Arc<Self> {
        Arc::new(Self {
            credential: Mutex::new(credential),
            ..Self::default()
        })
    }

    pub fn corrupt() -> Arc<Self> {
        Arc::new(Self {
            corrupt: true,
            ..Self::default()
        })
    }

    pub fn stored(&self) -> Option<Credential> {
        self.credential.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credential>> {
        if self.corrupt {
            return Err(anyhow!("token file is not valid JSON"));
        }
        Ok(self.credential.lock().clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.credential.lock() = Some(credential.clone());
        Ok(())
    }
}

/// OAuth flow with canned outcomes. `None` means the step fails.
#[derive(Default)]
pub struct ScriptedOAuth {
    pub refreshed: Option<Credential>,
    pub authorized: Option<Credential>,
    pub refresh_calls: AtomicUsize,
    pub authorize_calls: AtomicUsize,
}

impl ScriptedOAuth {
    pub fn new(refreshed: Option<Credential>, authorized: Option<Credential>) -> Arc<Self> {
        Arc::new(Self {
            refreshed,
            authorized,
            ..Self::default()
        })
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthFlow for ScriptedOAuth {
    async fn refresh(&self, _credential: &Credential) -> Result<Credential, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshed
            .clone()
            .ok_or_else(|| AuthError::Refresh("invalid_grant".into()))
    }

    async fn authorize(&self, _secret: &ClientSecret) -> Result<Credential, AuthError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        self.authorized
            .clone()
            .ok_or_else(|| AuthError::Interactive("access_denied".into()))
    }
}

/// Hands out the shared fakes and remembers which credential built them.
pub struct FakeFactory {
    pub sheets: Arc<FakeSheets>,
    pub public_sheets: Arc<FakeSheets>,
    pub drive: Arc<FakeDrive>,
    pub last_token: Mutex<Option<String>>,
    pub last_api_key: Mutex<Option<String>>,
}

impl FakeFactory {
    pub fn new(sheets: Arc<FakeSheets>, drive: Arc<FakeDrive>) -> Arc<Self> {
        Arc::new(Self {
            sheets,
            public_sheets: FakeSheets::public(),
            drive,
            last_token: Mutex::new(None),
            last_api_key: Mutex::new(None),
        })
    }
}

impl ServiceFactory for FakeFactory {
    fn oauth_handles(
        &self,
        credential: &Credential,
    ) -> Result<(Arc<dyn SheetsApi>, Arc<dyn DriveApi>), AuthError> {
        *self.last_token.lock() = credential.token.clone();
        let sheets: Arc<dyn SheetsApi> = self.sheets.clone();
        let drive: Arc<dyn DriveApi> = self.drive.clone();
        Ok((sheets, drive))
    }

    fn api_key_handle(&self, api_key: &str) -> Arc<dyn SheetsApi> {
        *self.last_api_key.lock() = Some(api_key.to_string());
        self.public_sheets.clone()
    }
}

pub fn credential(token: &str, expires_in_secs: i64, refresh: Option<&str>) -> Credential {
    let expiry = Utc::now() + Duration::seconds(expires_in_secs);
    Credential {
        token: Some(token.to_string()),
        refresh_token: refresh.map(str::to_string),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        scopes: Vec::new(),
        expiry: Some(expiry.to_rfc3339_opts(SecondsFormat::Secs, true)),
    }
}

pub fn valid_credential() -> Credential {
    credential("ya29.cached", 3600, Some("1//refresh"))
}

pub fn expired_credential() -> Credential {
    credential("ya29.stale", -600, Some("1//refresh"))
}

/// App state whose authenticator reuses a valid cached credential.
pub fn oauth_state(sheets: Arc<FakeSheets>, drive: Arc<FakeDrive>) -> Arc<AppState> {
    let authenticator = Authenticator::new(
        MemoryStore::holding(Some(valid_credential())),
        ScriptedOAuth::new(None, None),
        FakeFactory::new(sheets, drive),
    );
    state_with(authenticator, ServerConfig::default())
}

/// App state that can only fall back to an API key.
pub fn api_key_state(factory: Arc<FakeFactory>) -> Arc<AppState> {
    let authenticator = Authenticator::new(
        MemoryStore::holding(None),
        ScriptedOAuth::new(None, None),
        factory,
    )
    .with_api_key(Some("AIza-test".to_string()));
    state_with(authenticator, ServerConfig::default())
}

/// App state with no usable credential source at all.
pub fn unauthenticated_state() -> Arc<AppState> {
    let authenticator = Authenticator::new(
        MemoryStore::holding(None),
        ScriptedOAuth::new(None, None),
        FakeFactory::new(FakeSheets::new(), FakeDrive::new()),
    );
    state_with(authenticator, ServerConfig::default())
}

pub fn state_with(authenticator: Authenticator, config: ServerConfig) -> Arc<AppState> {
    Arc::new(AppState::with_authenticator(Arc::new(config), authenticator))
}
