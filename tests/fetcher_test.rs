use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use flate2::{write::ZlibEncoder, Compression};
use parking_lot::RwLock;
use tokio::net::TcpListener;

use radiko_auth_engine::engine::fetcher::{AssetFetcher, RefreshOutcome};
use radiko_auth_engine::engine::key_store::KeyStore;
use radiko_auth_engine::source::http_source::HttpAssetSource;
use radiko_auth_engine::source::traits::AssetSource;

const TAG: u16 = 87;
const ID: u16 = 12;

/// Minimal well-formed asset: plain 8-byte header + compressed header
/// tail and a single key block (omitted when `payload` is `None`).
fn build_asset(payload: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(0u8); // rect_bits = 0, one rectangle byte total
    body.push(0); // frame rate, fractional part
    body.push(24); // frame rate, integer part
    body.extend_from_slice(&1u16.to_le_bytes()); // frame count
    if let Some(payload) = payload {
        let word = (TAG << 6) | (6 + payload.len()) as u16;
        body.extend_from_slice(&word.to_le_bytes());
        body.extend_from_slice(&ID.to_le_bytes());
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(payload);
    }
    body.extend_from_slice(&0u16.to_le_bytes()); // end-of-stream tag

    let mut asset = Vec::new();
    asset.extend_from_slice(b"CWS");
    asset.push(10);
    asset.extend_from_slice(&((8 + body.len()) as u32).to_le_bytes());
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&body).unwrap();
    asset.extend_from_slice(&enc.finish().unwrap());
    asset
}

struct Upstream {
    asset: RwLock<Vec<u8>>,
    body_fetches: AtomicUsize,
}

/// Serves the asset; a `bytes=0-0` probe gets a 206 with the total size
/// in Content-Range, anything else gets the full body.
async fn serve_asset(State(up): State<Arc<Upstream>>, headers: HeaderMap) -> impl IntoResponse {
    let asset = up.asset.read().clone();
    let total = asset.len();

    let is_probe = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "bytes=0-0")
        .unwrap_or(false);

    if is_probe {
        return (
            StatusCode::PARTIAL_CONTENT,
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::CONTENT_RANGE, format!("bytes 0-0/{total}")),
                (header::CONTENT_LENGTH, "1".to_string()),
            ],
            vec![asset[0]],
        )
            .into_response();
    }

    up.body_fetches.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, total.to_string()),
        ],
        asset,
    )
        .into_response()
}

async fn start_upstream(asset: Vec<u8>) -> (String, Arc<Upstream>) {
    let up = Arc::new(Upstream {
        asset: RwLock::new(asset),
        body_fetches: AtomicUsize::new(0),
    });
    let app = Router::new()
        .route("/player.swf", get(serve_asset))
        .with_state(up.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/player.swf"), up)
}

fn fetcher_in(dir: &std::path::Path, url: String) -> (AssetFetcher, Arc<KeyStore>) {
    let store = Arc::new(KeyStore::new(dir.join("authkey.dat")));
    let source = Arc::new(HttpAssetSource::new(reqwest::Client::new(), url));
    let fetcher = AssetFetcher::new(source, dir.join("player.swf"), store.clone());
    (fetcher, store)
}

#[tokio::test]
async fn test_probe_reports_declared_size() {
    let asset = build_asset(Some(b"secret"));
    let (url, _up) = start_upstream(asset.clone()).await;

    let source = HttpAssetSource::new(reqwest::Client::new(), url);
    let info = source.probe().await.unwrap();
    assert_eq!(info.content_length, asset.len() as u64);
    assert_eq!(info.content_type, "application/octet-stream");
}

#[tokio::test]
async fn test_initial_refresh_extracts_key_blob() -> anyhow::Result<()> {
    let asset = build_asset(Some(b"key-image-bytes"));
    let (url, up) = start_upstream(asset.clone()).await;
    let dir = tempfile::tempdir()?;
    let (fetcher, _store) = fetcher_in(dir.path(), url);

    let outcome = fetcher.refresh().await?;
    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert_eq!(up.body_fetches.load(Ordering::SeqCst), 1);

    // Asset persisted verbatim, key blob extracted next to it.
    assert_eq!(std::fs::read(fetcher.asset_path())?, asset);
    assert_eq!(
        std::fs::read(dir.path().join("authkey.dat"))?,
        b"key-image-bytes"
    );
    Ok(())
}

#[tokio::test]
async fn test_matching_size_skips_the_body_download() {
    let asset = build_asset(Some(b"key-image-bytes"));
    let (url, up) = start_upstream(asset).await;
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, _store) = fetcher_in(dir.path(), url);

    assert_eq!(fetcher.refresh().await.unwrap(), RefreshOutcome::Refreshed);
    assert_eq!(fetcher.refresh().await.unwrap(), RefreshOutcome::Unchanged);
    assert_eq!(up.body_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_size_change_triggers_redownload_and_redecode() {
    let (url, up) = start_upstream(build_asset(Some(b"first key"))).await;
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, _store) = fetcher_in(dir.path(), url);

    assert_eq!(fetcher.refresh().await.unwrap(), RefreshOutcome::Refreshed);

    // Same endpoint now advertises a different (longer) asset.
    *up.asset.write() = build_asset(Some(b"a second, longer key image"));
    assert_eq!(fetcher.refresh().await.unwrap(), RefreshOutcome::Refreshed);
    assert_eq!(up.body_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(
        std::fs::read(dir.path().join("authkey.dat")).unwrap(),
        b"a second, longer key image"
    );
}

#[tokio::test]
async fn test_missing_key_block_keeps_the_stale_blob() {
    let (url, up) = start_upstream(build_asset(Some(b"original key"))).await;
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, _store) = fetcher_in(dir.path(), url);

    assert_eq!(fetcher.refresh().await.unwrap(), RefreshOutcome::Refreshed);

    // The replacement asset has no key block at all.
    *up.asset.write() = build_asset(None);
    assert_eq!(
        fetcher.refresh().await.unwrap(),
        RefreshOutcome::KeyBlockMissing
    );
    assert_eq!(
        std::fs::read(dir.path().join("authkey.dat")).unwrap(),
        b"original key"
    );
}

#[tokio::test]
async fn test_network_failure_leaves_cache_untouched() {
    // Bind-then-drop guarantees a port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/player.swf", listener.local_addr().unwrap());
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("authkey.dat"), b"kept").unwrap();
    let (fetcher, _store) = fetcher_in(dir.path(), url);

    assert!(fetcher.refresh().await.is_err());
    assert_eq!(std::fs::read(dir.path().join("authkey.dat")).unwrap(), b"kept");
    assert!(!fetcher.asset_path().exists());
}
