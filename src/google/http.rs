use super::RemoteError;
use anyhow::Result;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How requests to a Google API are authorized.
#[derive(Clone)]
pub enum ApiAuth {
    Bearer(String),
    ApiKey(String),
}

impl std::fmt::Debug for ApiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuth::Bearer(_) => f.write_str("Bearer(..)"),
            ApiAuth::ApiKey(_) => f.write_str("ApiKey(..)"),
        }
    }
}

impl ApiAuth {
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            ApiAuth::Bearer(token) => request.bearer_auth(token),
            ApiAuth::ApiKey(key) => request.query(&[("key", key)]),
        }
    }

    pub fn is_api_key(&self) -> bool {
        matches!(self, ApiAuth::ApiKey(_))
    }
}

pub fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("sheets-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

/// Send a request and decode the JSON body, mapping provider rejections to
/// [`RemoteError`] with the provider's message verbatim.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| RemoteError::transport(format!("request to Google API failed: {e}")))?;
    decode_response(response).await
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RemoteError::transport(format!("failed to read Google API response: {e}")))?;

    if !status.is_success() {
        return Err(provider_error(status.as_u16(), &body).into());
    }

    serde_json::from_str(&body).map_err(|e| {
        RemoteError::transport(format!("unexpected Google API response shape: {e}")).into()
    })
}

pub(crate) fn provider_error(http_status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => {
            RemoteError::from_provider(http_status, parsed.error.status, parsed.error.message)
        }
        Ok(parsed) => RemoteError::from_provider(
            http_status,
            parsed.error.status,
            format!("Google API returned HTTP {http_status}"),
        ),
        Err(_) => {
            let trimmed = body.trim();
            let message = if trimmed.is_empty() {
                format!("Google API returned HTTP {http_status}")
            } else {
                format!("Google API returned HTTP {http_status}: {trimmed}")
            };
            RemoteError::from_provider(http_status, None, message)
        }
    }
}
