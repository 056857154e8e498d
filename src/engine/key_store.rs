use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::KeyStoreError;

/// Owns the extracted key blob and serves byte-range reads over it.
///
/// The blob is memoized in memory after the first read and replaced
/// wholesale when a refresh extracts a new one.
pub struct KeyStore {
    path: PathBuf,
    blob: RwLock<Option<Bytes>>,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            blob: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a blob is available (memoized or persisted).
    pub fn exists(&self) -> bool {
        self.blob.read().is_some() || self.path.is_file()
    }

    /// Replace the persisted blob with freshly extracted bytes.
    pub fn replace(&self, bytes: Bytes) -> Result<(), KeyStoreError> {
        fs::write(&self.path, &bytes)?;
        *self.blob.write() = Some(bytes);
        debug!(path = %self.path.display(), "key blob replaced");
        Ok(())
    }

    fn load(&self) -> Result<Bytes, KeyStoreError> {
        if let Some(blob) = self.blob.read().clone() {
            return Ok(blob);
        }
        if !self.path.is_file() {
            return Err(KeyStoreError::MissingBlob {
                path: self.path.display().to_string(),
            });
        }
        let bytes = Bytes::from(fs::read(&self.path)?);
        *self.blob.write() = Some(bytes.clone());
        Ok(bytes)
    }

    /// Read exactly `length` bytes starting at `offset`. An out-of-bounds
    /// range fails; it never returns truncated data.
    pub fn read_range(&self, offset: u64, length: u64) -> Result<Bytes, KeyStoreError> {
        let blob = self.load()?;
        let blob_len = blob.len() as u64;
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= blob_len)
            .ok_or(KeyStoreError::OutOfRange {
                offset,
                length,
                blob_len,
            })?;
        Ok(blob.slice(offset as usize..end as usize))
    }

    /// Base64 of the byte range, for transport in an HTTP header.
    pub fn partial_key(&self, offset: u64, length: u64) -> Result<String, KeyStoreError> {
        let range = self.read_range(offset, length)?;
        Ok(BASE64.encode(&range))
    }
}
