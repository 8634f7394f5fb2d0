use super::credential::SCOPES;
use super::{AuthError, ClientSecret, Credential};
use async_trait::async_trait;
use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use rand::distributions::Alphanumeric;
use reqwest::{Client, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::net::{Ipv4Addr, SocketAddr};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Token refresh and interactive consent against an OAuth provider.
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError>;

    /// Blocks until the user completes consent in a browser, or the flow's
    /// own timeout elapses.
    async fn authorize(&self, secret: &ClientSecret) -> Result<Credential, AuthError>;
}

/// Installed-app flow with a loopback redirect and PKCE.
#[derive(Debug, Clone)]
pub struct GoogleOAuthFlow {
    client: Client,
    callback_port: u16,
    timeout: Option<Duration>,
    open_browser: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

const CONSENT_DONE_PAGE: &str = "<html><body><h3>Authorization complete.</h3>\
<p>You can close this window and return to your MCP client.</p></body></html>";
const CONSENT_WAITING_PAGE: &str =
    "<html><body><p>Waiting for Google authorization...</p></body></html>";

impl GoogleOAuthFlow {
    pub fn new(callback_port: u16, timeout: Option<Duration>, open_browser: bool) -> Self {
        Self {
            client: crate::google::http::build_client(),
            callback_port,
            timeout,
            open_browser,
        }
    }

    async fn exchange(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, String> {
        let response = self
            .client
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("token endpoint returned {status}: {}", body.trim()));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| format!("invalid token response: {e}"))
    }

    async fn wait_for_callback(
        &self,
        listener: TcpListener,
    ) -> Result<CallbackParams, AuthError> {
        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(code_tx)));

        let app = Router::new()
            .route("/", get(handle_callback))
            .with_state(slot);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, code_rx).await {
                Ok(received) => received,
                Err(_) => {
                    let _ = shutdown_tx.send(());
                    server.abort();
                    return Err(AuthError::Timeout(limit.as_millis()));
                }
            },
            None => code_rx.await,
        };

        let _ = shutdown_tx.send(());
        if let Err(e) = server.await {
            tracing::debug!("oauth callback listener ended abnormally: {e}");
        }

        received.map_err(|_| AuthError::Interactive("callback listener closed early".into()))
    }
}

async fn handle_callback(
    State(slot): State<CallbackSlot>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    if params.code.is_none() && params.error.is_none() {
        return Html(CONSENT_WAITING_PAGE);
    }
    if let Some(tx) = slot.lock().take() {
        let _ = tx.send(params);
    }
    Html(CONSENT_DONE_PAGE)
}

#[async_trait]
impl OAuthFlow for GoogleOAuthFlow {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::Refresh("credential has no refresh token".into()))?;
        let client_id = credential
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::Refresh("credential has no client_id".into()))?;
        let client_secret = credential.client_secret.as_deref().unwrap_or("");

        let token = self
            .exchange(
                &credential.token_uri,
                &[
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await
            .map_err(AuthError::Refresh)?;

        let mut refreshed = credential.clone();
        apply_token_response(&mut refreshed, token);
        tracing::info!("refreshed OAuth access token");
        Ok(refreshed)
    }

    async fn authorize(&self, secret: &ClientSecret) -> Result<Credential, AuthError> {
        let bind = SocketAddr::from((Ipv4Addr::LOCALHOST, self.callback_port));
        let listener = TcpListener::bind(bind)
            .await
            .map_err(|e| AuthError::Interactive(format!("failed to bind {bind}: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Interactive(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");

        let state = random_token(32);
        let verifier = random_token(64);
        let consent_url = authorization_url(secret, &redirect_uri, &state, &verifier)?;

        tracing::info!(%redirect_uri, "waiting for OAuth consent in the browser");
        eprintln!("Open this URL in a browser to authorize Google Sheets access:\n\n{consent_url}\n");
        if self.open_browser {
            open_in_browser(consent_url.as_str());
        }

        let callback = self.wait_for_callback(listener).await?;
        if let Some(error) = callback.error {
            return Err(AuthError::Interactive(format!("authorization denied: {error}")));
        }
        if callback.state.as_deref() != Some(state.as_str()) {
            return Err(AuthError::Interactive(
                "state mismatch in OAuth callback".into(),
            ));
        }
        let code = callback
            .code
            .ok_or_else(|| AuthError::Interactive("OAuth callback carried no code".into()))?;

        let token = self
            .exchange(
                &secret.token_uri,
                &[
                    ("code", code.as_str()),
                    ("client_id", secret.client_id.as_str()),
                    ("client_secret", secret.client_secret.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                    ("code_verifier", verifier.as_str()),
                ],
            )
            .await
            .map_err(AuthError::Interactive)?;

        let mut credential = Credential {
            token: None,
            refresh_token: None,
            token_uri: secret.token_uri.clone(),
            client_id: Some(secret.client_id.clone()),
            client_secret: Some(secret.client_secret.clone()),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            expiry: None,
        };
        apply_token_response(&mut credential, token);
        tracing::info!("OAuth consent completed");
        Ok(credential)
    }
}

fn apply_token_response(credential: &mut Credential, token: TokenResponse) {
    credential.token = Some(token.access_token);
    if let Some(refresh) = token.refresh_token {
        credential.refresh_token = Some(refresh);
    }
    if let Some(scope) = token.scope {
        credential.scopes = scope.split_whitespace().map(str::to_string).collect();
    }
    match token.expires_in {
        Some(seconds) => credential.set_expires_in(Utc::now(), seconds),
        None => credential.expiry = None,
    }
}

pub(crate) fn authorization_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    state: &str,
    verifier: &str,
) -> Result<Url, AuthError> {
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    let scope = SCOPES.join(" ");
    Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AuthError::Interactive(format!("invalid auth_uri '{}': {e}", secret.auth_uri)))
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Best effort; the URL is always printed as well. Output is discarded so the
/// child never writes into the stdio transport.
fn open_in_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = std::process::Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        std::process::Command::new("xdg-open")
    };
    let spawned = command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = spawned {
        tracing::debug!("could not open a browser: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_carries_pkce_and_offline_access() {
        let secret = ClientSecret::parse(
            r#"{"installed":{"client_id":"cid","client_secret":"s"}}"#,
        )
        .unwrap();
        let url = authorization_url(&secret, "http://127.0.0.1:5555/", "st", "verifier").unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:5555/");
        assert_eq!(pairs["state"], "st");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(
            pairs["code_challenge"],
            URL_SAFE_NO_PAD.encode(Sha256::digest(b"verifier"))
        );
        assert!(pairs["scope"].contains("spreadsheets.readonly"));
    }

    #[test]
    fn token_response_keeps_existing_refresh_token() {
        let mut cred = Credential {
            token: Some("old".into()),
            refresh_token: Some("keep-me".into()),
            token_uri: "https://oauth2.googleapis.com/token".into(),
            client_id: Some("cid".into()),
            client_secret: None,
            scopes: vec!["a".into()],
            expiry: None,
        };
        apply_token_response(
            &mut cred,
            TokenResponse {
                access_token: "new".into(),
                expires_in: Some(3600),
                refresh_token: None,
                scope: None,
            },
        );
        assert_eq!(cred.token.as_deref(), Some("new"));
        assert_eq!(cred.refresh_token.as_deref(), Some("keep-me"));
        assert!(cred.is_valid());
    }

    #[tokio::test]
    async fn callback_listener_returns_code_and_state() {
        let flow = GoogleOAuthFlow::new(0, Some(Duration::from_secs(5)), false);
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let waiter = tokio::spawn(async move { flow.wait_for_callback(listener).await });
        let url = format!("http://127.0.0.1:{port}/?code=abc&state=xyz");
        let body = crate::google::http::build_client()
            .get(url)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Authorization complete"));

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn callback_wait_times_out() {
        let flow = GoogleOAuthFlow::new(0, Some(Duration::from_millis(50)), false);
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let err = flow.wait_for_callback(listener).await.unwrap_err();
        assert!(matches!(err, AuthError::Timeout(50)));
        assert_eq!(err.to_string(), "interactive authorization timed out after 50ms");
    }
}
