use crate::auth::{AuthError, AuthMode, Authenticator, Services};
use crate::config::ServerConfig;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AppState {
    config: Arc<ServerConfig>,
    authenticator: Authenticator,
    services: RwLock<Option<Arc<Services>>>,
    auth_gate: Mutex<()>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let authenticator = Authenticator::from_config(&config);
        Self::with_authenticator(config, authenticator)
    }

    pub fn with_authenticator(config: Arc<ServerConfig>, authenticator: Authenticator) -> Self {
        Self {
            config,
            authenticator,
            services: RwLock::new(None),
            auth_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    /// Services that are still usable, if any.
    pub fn current_services(&self) -> Option<Arc<Services>> {
        self.services
            .read()
            .as_ref()
            .filter(|services| !services.needs_renewal(Utc::now()))
            .cloned()
    }

    /// Mode of the most recent authentication. A lapsed bearer token keeps its
    /// mode until the next call renews it.
    pub fn auth_mode(&self) -> AuthMode {
        self.services
            .read()
            .as_ref()
            .map(|services| services.mode())
            .unwrap_or_default()
    }

    /// True when the primary handle can only read publicly shared sheets.
    pub fn public_sheets_only(&self) -> bool {
        self.services
            .read()
            .as_ref()
            .is_some_and(|services| services.primary().is_read_only_public())
    }

    /// Return live services, authenticating first when none exist or the
    /// bearer token has lapsed. Concurrent callers share one attempt.
    pub async fn ensure_services(&self) -> Result<Arc<Services>, AuthError> {
        if let Some(services) = self.current_services() {
            return Ok(services);
        }

        let _gate = self.auth_gate.lock().await;
        if let Some(services) = self.current_services() {
            return Ok(services);
        }

        let services = Arc::new(self.authenticator.authenticate().await?);
        tracing::info!(
            auth_mode = %services.mode(),
            public_only = services.primary().is_read_only_public(),
            "authenticated"
        );
        *self.services.write() = Some(services.clone());
        Ok(services)
    }
}
