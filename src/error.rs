use std::io;

use thiserror::Error;

/// Container decode failures. Fatal to the decode attempt; no partial key
/// blob is ever written on these.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("truncated stream at offset {offset}: wanted {wanted} bytes, {available} available")]
    Truncated {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("asset too short for the plain header: {0} bytes")]
    TooShort(usize),

    #[error("zlib inflate failed: {0}")]
    Inflate(#[source] io::Error),
}

/// Transport or metadata failures while refreshing the asset.
/// Recoverable; cached files are left untouched.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("asset request failed: HTTP {0}")]
    Status(u16),

    #[error("remote did not report a usable content length")]
    MissingLength,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Key blob access failures.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("key blob not found at {path}; run an asset refresh first")]
    MissingBlob { path: String },

    #[error("range [{offset}, {offset}+{length}) out of bounds for {blob_len}-byte key blob")]
    OutOfRange {
        offset: u64,
        length: u64,
        blob_len: u64,
    },

    #[error("I/O error on key blob: {0}")]
    Io(#[from] io::Error),
}

/// Failures in either step of the two-step exchange. Recoverable; the
/// whole attempt resets, no partial state is kept.
#[derive(Error, Debug)]
pub enum AuthStepError {
    #[error("{step}: transport error: {source}")]
    Transport {
        step: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{step}: HTTP {status}")]
    Status { step: &'static str, status: u16 },

    #[error("{step}: missing response header {name}")]
    MissingHeader {
        step: &'static str,
        name: &'static str,
    },

    #[error("{step}: response header {name} is not numeric: {value:?}")]
    InvalidHeader {
        step: &'static str,
        name: &'static str,
        value: String,
    },

    #[error("challenge proof: response carried an empty region identifier")]
    EmptyRegion,

    #[error("partial key derivation failed: {0}")]
    Key(#[from] KeyStoreError),
}

/// Umbrella error for entry points that cross component boundaries.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Auth(#[from] AuthStepError),
}
