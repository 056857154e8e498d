use serde::Deserialize;

/// Tag number of the block carrying the embedded key image.
pub const KEY_BLOCK_TAG: u16 = 87;

/// Block-local identifier of the key image within the asset.
pub const KEY_BLOCK_ID: u16 = 12;

/// File name of the cached player asset.
pub const PLAYER_FILE: &str = "player.swf";

/// File name of the extracted key blob.
pub const KEY_FILE: &str = "authkey.dat";

/// Declared client application name sent on both auth exchanges.
pub const APP_NAME: &str = "pc_ts";

/// Declared client application version.
pub const APP_VERSION: &str = "4.0.0";

/// Fixed user identity expected by the gateway.
pub const APP_USER: &str = "test-stream";

/// Fixed device identity expected by the gateway.
pub const APP_DEVICE: &str = "pc";

/// Top-level configuration for the auth engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Directory used for cached artifacts (asset + key blob). The API
    /// layer scopes it per region code.
    pub data_dir: String,
    /// URL of the distributed player asset.
    pub player_url: String,
    /// First auth endpoint (app-id handshake).
    pub auth1_url: String,
    /// Second auth endpoint (challenge proof).
    pub auth2_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            player_url: "http://radiko.jp/apps/js/flash/myplayer-release.swf".to_string(),
            auth1_url: "https://radiko.jp/v2/api/auth1_fms".to_string(),
            auth2_url: "https://radiko.jp/v2/api/auth2_fms".to_string(),
        }
    }
}
