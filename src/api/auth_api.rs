use std::path::Path;
use std::sync::{Arc, Once};

use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{EngineConfig, KEY_FILE, PLAYER_FILE};
use crate::engine::fetcher::AssetFetcher;
use crate::engine::key_store::KeyStore;
use crate::engine::session::Authenticator;
use crate::source::http_source::HttpAssetSource;

static INIT_TRACING: Once = Once::new();

/// Session record handed to the station-list / program-guide glue.
#[derive(Debug, Clone)]
pub struct AuthSessionInfo {
    pub session_token: String,
    pub region_id: String,
    pub authenticated: bool,
}

impl AuthSessionInfo {
    fn unauthenticated() -> Self {
        Self {
            session_token: String::new(),
            region_id: String::new(),
            authenticated: false,
        }
    }
}

/// Install the default tracing subscriber once per process.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        info!("auth engine tracing initialized");
    });
}

/// Authenticate for one region code: refresh the key material if needed,
/// then run the two-step exchange.
///
/// Artifacts are cached under `<data_dir>/<region>` so concurrent region
/// attempts never share a key blob file. With `renew` false, an existing
/// key blob skips the refresh pass entirely.
///
/// Failures never escape as errors; the returned record simply reports
/// `authenticated = false`.
pub async fn authenticate_region(
    config: &EngineConfig,
    region: &str,
    renew: bool,
) -> AuthSessionInfo {
    let dir = Path::new(&config.data_dir).join(region);
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        warn!("cannot create data dir {}: {}", dir.display(), e);
        return AuthSessionInfo::unauthenticated();
    }

    let client = Client::new();
    let store = Arc::new(KeyStore::new(dir.join(KEY_FILE)));
    let source = Arc::new(HttpAssetSource::new(
        client.clone(),
        config.player_url.clone(),
    ));
    let fetcher = AssetFetcher::new(source, dir.join(PLAYER_FILE), store.clone());

    if renew || !store.exists() {
        if let Err(e) = fetcher.refresh().await {
            // A failed refresh leaves the previous artifacts untouched;
            // a stale key blob can still authenticate until the asset
            // actually changes upstream.
            warn!("asset refresh failed: {}", e);
            if !store.exists() {
                return AuthSessionInfo::unauthenticated();
            }
        }
    }

    let session = Authenticator::new(client, config.clone(), store)
        .authenticate()
        .await;

    AuthSessionInfo {
        session_token: session.auth_token,
        region_id: session.region_id,
        authenticated: session.authenticated,
    }
}
