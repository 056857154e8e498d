use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, warn};

use super::traits::{AssetInfo, AssetSource};
use crate::error::FetchError;

/// HTTP-backed asset source.
pub struct HttpAssetSource {
    client: Client,
    url: String,
}

impl HttpAssetSource {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn probe(&self) -> Result<AssetInfo, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .header("Range", "bytes=0-0")
            .send()
            .await?;

        let status = resp.status();
        debug!("asset probe status={}", status.as_u16());
        if !status.is_success() {
            warn!("asset probe failed status={}", status.as_u16());
            return Err(FetchError::Status(status.as_u16()));
        }

        // Parse Content-Range: bytes 0-0/<total>; servers that ignore the
        // range respond 200 with a plain Content-Length.
        let content_length = if status.as_u16() == 206 {
            resp.headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit('/').next())
                .and_then(|v| v.parse::<u64>().ok())
        } else {
            resp.headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        };
        let content_length = content_length.ok_or(FetchError::MissingLength)?;

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(AssetInfo {
            content_length,
            content_type,
        })
    }

    async fn fetch(&self) -> Result<Bytes, FetchError> {
        let resp = self.client.get(&self.url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("asset fetch failed status={}", status.as_u16());
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        debug!("asset fetched: {} bytes", bytes.len());
        Ok(bytes)
    }
}
