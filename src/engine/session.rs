// Auth session driver — runs the two-step exchange end to end.

use std::sync::Arc;

use reqwest::Client;
use tracing::{info, warn};

use super::key_store::KeyStore;
use crate::auth::protocol;
use crate::config::EngineConfig;
use crate::error::AuthStepError;

/// Caller-visible outcome of one authentication attempt.
///
/// `authenticated` is true only when both protocol steps completed in
/// order; there is no partial-success representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub auth_token: String,
    pub region_id: String,
    pub authenticated: bool,
}

impl AuthSession {
    pub fn unauthenticated() -> Self {
        Self {
            auth_token: String::new(),
            region_id: String::new(),
            authenticated: false,
        }
    }
}

/// Drives `Unauthenticated → TokenObtained → Authenticated`. Any step
/// failure collapses the attempt to an unauthenticated record; no state
/// survives between attempts.
pub struct Authenticator {
    client: Client,
    config: EngineConfig,
    store: Arc<KeyStore>,
}

impl Authenticator {
    pub fn new(client: Client, config: EngineConfig, store: Arc<KeyStore>) -> Self {
        Self {
            client,
            config,
            store,
        }
    }

    /// One full attempt. Never panics: a failed step yields an
    /// unauthenticated record and a logged description.
    pub async fn authenticate(&self) -> AuthSession {
        match self.try_authenticate().await {
            Ok(session) => {
                info!(region = %session.region_id, "authenticated");
                session
            }
            Err(e) => {
                warn!("authentication failed: {}", e);
                AuthSession::unauthenticated()
            }
        }
    }

    /// The two transitions, with the grant from step 1 feeding step 2.
    /// No retries; a failure is reported once and left to the caller.
    pub async fn try_authenticate(&self) -> Result<AuthSession, AuthStepError> {
        let grant = protocol::app_id_handshake(&self.client, &self.config.auth1_url).await?;
        let partial_key = self.store.partial_key(grant.key_offset, grant.key_length)?;
        let region_id =
            protocol::challenge_proof(&self.client, &self.config.auth2_url, &grant, &partial_key)
                .await?;

        Ok(AuthSession {
            auth_token: grant.token,
            region_id,
            authenticated: true,
        })
    }
}
