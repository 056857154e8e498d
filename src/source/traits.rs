use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Metadata reported by a remote asset without downloading its body.
#[derive(Debug, Clone)]
pub struct AssetInfo {
    pub content_length: u64,
    pub content_type: String,
}

#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Lightweight metadata request for the declared asset size.
    async fn probe(&self) -> Result<AssetInfo, FetchError>;

    /// Download the full asset body.
    async fn fetch(&self) -> Result<Bytes, FetchError>;
}
