//! Google Drive v3 implementation of [`ResourceStore`].

use std::time::Duration;

use {
    async_trait::async_trait,
    drivelink_config::DriveConfig,
    futures::StreamExt,
    reqwest::{RequestBuilder, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
};

use crate::{
    Error, Result,
    store::{ByteStream, ResourceId, ResourceMetadata, ResourceStore},
};

/// Longest error body kept in [`Error::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Reads files through the Drive v3 REST API.
pub struct GoogleDriveStore {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<Secret<String>>,
    access_token: Option<Secret<String>>,
}

/// Subset of the `files.get` response we ask for with `fields=`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    /// Drive encodes int64 as a decimal string; absent for Google Docs formats.
    size: Option<String>,
    mime_type: Option<String>,
}

impl GoogleDriveStore {
    pub fn new(config: &DriveConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Build a store around an existing client (shared pools, tests).
    pub fn with_client(client: reqwest::Client, config: &DriveConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        }
    }

    fn file_url(&self, id: &ResourceId) -> String {
        format!("{}/files/{}", self.api_base, id)
    }

    fn authorize(&self, mut req: RequestBuilder) -> RequestBuilder {
        req = req.query(&[("supportsAllDrives", "true")]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.expose_secret().as_str())]);
        }
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token.expose_secret());
        }
        req
    }

    async fn send(&self, id: &ResourceId, req: RequestBuilder) -> Result<reqwest::Response> {
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound { id: id.to_string() }),
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized { id: id.to_string() }),
            StatusCode::FORBIDDEN => Err(Error::AccessDenied { id: id.to_string() }),
            _ => {
                let mut body = resp.text().await.unwrap_or_default();
                body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
                Err(Error::Status { status, body })
            },
        }
    }
}

#[async_trait]
impl ResourceStore for GoogleDriveStore {
    async fn fetch_metadata(&self, id: &ResourceId) -> Result<ResourceMetadata> {
        let req = self
            .client
            .get(self.file_url(id))
            .query(&[("fields", "name,size,mimeType")]);
        let raw = self.send(id, req).await?.text().await?;
        let file: FileResource = serde_json::from_str(&raw)?;

        let Some(size) = file.size else {
            return Err(Error::NotDownloadable {
                id: id.to_string(),
                reason: format!(
                    "{} has no binary content",
                    file.mime_type.as_deref().unwrap_or("this file type")
                ),
            });
        };
        let size_bytes = size.parse::<u64>().map_err(|_| Error::NotDownloadable {
            id: id.to_string(),
            reason: format!("invalid size {size:?}"),
        })?;

        debug!(resource_id = %id, name = %file.name, size_bytes, "fetched drive metadata");
        Ok(ResourceMetadata {
            name: file.name,
            size_bytes,
            mime_type: file.mime_type,
        })
    }

    async fn open_read_stream(&self, id: &ResourceId) -> Result<ByteStream> {
        let req = self
            .client
            .get(self.file_url(id))
            .query(&[("alt", "media")]);
        let resp = self.send(id, req).await?;
        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::stream))
            .boxed())
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
