use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use crate::config::{APP_DEVICE, APP_NAME, APP_USER, APP_VERSION};
use crate::error::AuthStepError;

/// Request body both endpoints expect.
const BODY: &str = "\r\n";

const STEP_HANDSHAKE: &str = "app-id handshake";
const STEP_CHALLENGE: &str = "challenge proof";

/// Parameters issued by the app-id handshake and consumed by the
/// challenge proof. The second step cannot be built without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeGrant {
    pub token: String,
    pub key_offset: u64,
    pub key_length: u64,
}

/// The identifying headers sent on both exchanges.
fn identify(req: RequestBuilder) -> RequestBuilder {
    req.header("pragma", "no-cache")
        .header("X-Radiko-App", APP_NAME)
        .header("X-Radiko-App-Version", APP_VERSION)
        .header("X-Radiko-User", APP_USER)
        .header("X-Radiko-Device", APP_DEVICE)
}

fn header_str<'r>(
    resp: &'r Response,
    step: &'static str,
    name: &'static str,
) -> Result<&'r str, AuthStepError> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AuthStepError::MissingHeader { step, name })
}

fn header_u64(
    resp: &Response,
    step: &'static str,
    name: &'static str,
) -> Result<u64, AuthStepError> {
    let value = header_str(resp, step, name)?;
    value
        .parse::<u64>()
        .map_err(|_| AuthStepError::InvalidHeader {
            step,
            name,
            value: value.to_string(),
        })
}

/// Step 1: obtain the auth token plus the key range the server demands
/// proof of possession for.
pub async fn app_id_handshake(client: &Client, url: &str) -> Result<HandshakeGrant, AuthStepError> {
    let resp = identify(client.post(url))
        .body(BODY)
        .send()
        .await
        .map_err(|source| AuthStepError::Transport {
            step: STEP_HANDSHAKE,
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AuthStepError::Status {
            step: STEP_HANDSHAKE,
            status: status.as_u16(),
        });
    }

    let token = header_str(&resp, STEP_HANDSHAKE, "X-Radiko-AuthToken")?.to_string();
    let key_offset = header_u64(&resp, STEP_HANDSHAKE, "X-Radiko-KeyOffset")?;
    let key_length = header_u64(&resp, STEP_HANDSHAKE, "X-Radiko-KeyLength")?;

    debug!(key_offset, key_length, "handshake granted");
    Ok(HandshakeGrant {
        token,
        key_offset,
        key_length,
    })
}

/// Step 2: prove possession of the demanded key range and receive the
/// region identifier (the first comma-separated field of the body).
pub async fn challenge_proof(
    client: &Client,
    url: &str,
    grant: &HandshakeGrant,
    partial_key: &str,
) -> Result<String, AuthStepError> {
    let resp = identify(client.post(url))
        .header("X-Radiko-Authtoken", grant.token.as_str())
        .header("X-Radiko-Partialkey", partial_key)
        .body(BODY)
        .send()
        .await
        .map_err(|source| AuthStepError::Transport {
            step: STEP_CHALLENGE,
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AuthStepError::Status {
            step: STEP_CHALLENGE,
            status: status.as_u16(),
        });
    }

    let body = resp
        .text()
        .await
        .map_err(|source| AuthStepError::Transport {
            step: STEP_CHALLENGE,
            source,
        })?;

    let region = body.split(',').next().unwrap_or("").trim().to_string();
    if region.is_empty() {
        return Err(AuthStepError::EmptyRegion);
    }

    debug!(region = %region, "challenge accepted");
    Ok(region)
}
