use super::http::{ApiAuth, DEFAULT_SHEETS_BASE_URL, build_client, send_json};
use super::{SheetsApi, SpreadsheetMetadata, ValueRows};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

/// Sheets v4 REST client.
#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    base_url: String,
    auth: ApiAuth,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<ValueRows>,
}

impl GoogleSheetsClient {
    pub fn new(auth: ApiAuth) -> Self {
        Self::with_base_url(auth, DEFAULT_SHEETS_BASE_URL)
    }

    pub fn with_base_url(auth: ApiAuth, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
            auth,
        }
    }

    pub(crate) fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        endpoint(
            &self.base_url,
            &["v4", "spreadsheets", spreadsheet_id, "values", range],
        )
    }

    pub(crate) fn spreadsheet_url(&self, spreadsheet_id: &str) -> Result<Url> {
        endpoint(&self.base_url, &["v4", "spreadsheets", spreadsheet_id])
    }
}

pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url =
        Url::parse(base_url).map_err(|e| anyhow!("invalid API base url '{base_url}': {e}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("API base url '{base_url}' cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: Option<&str>,
    ) -> Result<ValueRows> {
        let url = self.values_url(spreadsheet_id, range)?;
        let mut request = self.client.get(url);
        if let Some(render) = render {
            request = request.query(&[("valueRenderOption", render)]);
        }
        tracing::debug!(spreadsheet_id, range, ?render, "fetching sheet values");
        let body: ValueRange = send_json(self.auth.apply(request)).await?;
        Ok(body.values.unwrap_or_default())
    }

    async fn get_spreadsheet(
        &self,
        spreadsheet_id: &str,
        fields: Option<&str>,
    ) -> Result<SpreadsheetMetadata> {
        let url = self.spreadsheet_url(spreadsheet_id)?;
        let mut request = self.client.get(url);
        if let Some(fields) = fields {
            request = request.query(&[("fields", fields)]);
        }
        tracing::debug!(spreadsheet_id, ?fields, "fetching spreadsheet metadata");
        send_json(self.auth.apply(request)).await
    }

    fn is_read_only_public(&self) -> bool {
        self.auth.is_api_key()
    }
}
