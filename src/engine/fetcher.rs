// Asset refresh — keeps the cached player asset and the extracted key blob current.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::key_store::KeyStore;
use crate::config::{KEY_BLOCK_ID, KEY_BLOCK_TAG};
use crate::container::swf;
use crate::error::{EngineError, FetchError};
use crate::source::traits::AssetSource;

/// Result of one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cached asset size matched the remote size; nothing was downloaded.
    Unchanged,
    /// Asset re-downloaded and a fresh key blob extracted.
    Refreshed,
    /// Asset re-downloaded but the key block was absent; the previous key
    /// blob (if any) was kept.
    KeyBlockMissing,
}

/// `true` when the cached copy can stand in for the remote asset.
pub fn cache_is_current(remote_size: u64, local_size: Option<u64>) -> bool {
    local_size == Some(remote_size)
}

pub struct AssetFetcher {
    source: Arc<dyn AssetSource>,
    asset_path: PathBuf,
    store: Arc<KeyStore>,
}

impl AssetFetcher {
    pub fn new(
        source: Arc<dyn AssetSource>,
        asset_path: impl Into<PathBuf>,
        store: Arc<KeyStore>,
    ) -> Self {
        Self {
            source,
            asset_path: asset_path.into(),
            store,
        }
    }

    pub fn asset_path(&self) -> &Path {
        &self.asset_path
    }

    /// Ensure the cached asset and key blob are current.
    ///
    /// Probes the remote size first; the body is only downloaded (and the
    /// key blob only re-extracted) when the sizes disagree or no cached
    /// asset exists.
    pub async fn refresh(&self) -> Result<RefreshOutcome, EngineError> {
        let info = self.source.probe().await.map_err(EngineError::Fetch)?;

        let local_size = tokio::fs::metadata(&self.asset_path)
            .await
            .ok()
            .map(|m| m.len());
        if cache_is_current(info.content_length, local_size) {
            debug!(
                size = info.content_length,
                "cached asset is current; skipping download"
            );
            return Ok(RefreshOutcome::Unchanged);
        }

        info!(
            remote = info.content_length,
            local = local_size.unwrap_or(0),
            "asset changed; downloading"
        );
        let raw = self.source.fetch().await.map_err(EngineError::Fetch)?;

        // Persist the asset verbatim, then decode it.
        tokio::fs::write(&self.asset_path, &raw)
            .await
            .map_err(|e| EngineError::Fetch(FetchError::Io(e)))?;

        match swf::extract_block(&raw, KEY_BLOCK_TAG, KEY_BLOCK_ID)? {
            Some(payload) => {
                self.store.replace(payload)?;
                Ok(RefreshOutcome::Refreshed)
            }
            None => {
                warn!("key block not found in refreshed asset; keeping previous key blob");
                Ok(RefreshOutcome::KeyBlockMissing)
            }
        }
    }
}
