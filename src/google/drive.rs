use super::http::{ApiAuth, DEFAULT_DRIVE_BASE_URL, build_client, send_json};
use super::sheets::endpoint;
use super::{DriveApi, FileList, FileQuery};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Drive v3 client, used only for spreadsheet discovery.
#[derive(Debug, Clone)]
pub struct GoogleDriveClient {
    client: Client,
    base_url: String,
    auth: ApiAuth,
}

impl GoogleDriveClient {
    pub fn new(auth: ApiAuth) -> Self {
        Self::with_base_url(auth, DEFAULT_DRIVE_BASE_URL)
    }

    pub fn with_base_url(auth: ApiAuth, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
            auth,
        }
    }
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    async fn list_files(&self, query: &FileQuery) -> Result<FileList> {
        let url = endpoint(&self.base_url, &["drive", "v3", "files"])?;
        let page_size = query.page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query.q.as_str()),
            ("pageSize", page_size.as_str()),
            ("fields", query.fields.as_str()),
        ];
        if let Some(order_by) = query.order_by.as_deref() {
            params.push(("orderBy", order_by));
        }
        if let Some(token) = query.page_token.as_deref() {
            params.push(("pageToken", token));
        }

        tracing::debug!(q = %query.q, page_size = query.page_size, "listing drive files");
        let request = self.client.get(url).query(&params);
        send_json(self.auth.apply(request)).await
    }
}
