// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava account linking routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::external_profile::{ExternalProfileData, PLATFORM_STRAVA};
use crate::models::ExternalProfile;
use crate::routes::stored_id;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{delete, get},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state stays valid.
pub const STATE_MAX_AGE_MS: u64 = 10 * 60 * 1000;

/// Allowed clock skew for states stamped slightly in the future.
const STATE_CLOCK_SKEW_MS: u64 = 60 * 1000;

/// Linking routes that need a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/oauth/strava/initiate", get(strava_initiate))
        .route("/api/external-profiles", get(list_external_profiles))
        .route(
            "/api/external-profiles/{platform}",
            delete(unlink_external_profile),
        )
}

/// Callback Strava redirects the browser to; authenticated by the signed state.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/oauth/strava/callback", get(strava_callback))
}

// ─── State ───────────────────────────────────────────────────

fn state_mac(secret: &[u8], payload: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Sign `user` and `issued_at_ms` into an opaque URL-safe state string.
///
/// Format before encoding: `user_hex|timestamp_hex|signature_hex`.
pub fn sign_state(user: ObjectId, issued_at_ms: u64, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", user.to_hex(), issued_at_ms);
    let signature = state_mac(secret, &payload)?;
    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify a state produced by [`sign_state`] and return the user it names.
///
/// Rejects bad encodings, bad signatures and states older than
/// [`STATE_MAX_AGE_MS`] at `now_ms`.
pub fn verify_state(state: &str, secret: &[u8], now_ms: u64) -> Option<ObjectId> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let mut parts = state_str.splitn(3, '|');
    let (user_hex, timestamp_hex, signature_hex) = (parts.next()?, parts.next()?, parts.next()?);

    let provided = hex::decode(signature_hex).ok()?;
    let expected = state_mac(secret, &format!("{}|{}", user_hex, timestamp_hex)).ok()?;
    if !bool::from(expected.ct_eq(&provided)) {
        tracing::warn!("OAuth state signature mismatch");
        return None;
    }

    let issued_at = u64::from_str_radix(timestamp_hex, 16).ok()?;
    if issued_at > now_ms.saturating_add(STATE_CLOCK_SKEW_MS)
        || now_ms.saturating_sub(issued_at) > STATE_MAX_AGE_MS
    {
        tracing::info!(issued_at, now_ms, "OAuth state expired");
        return None;
    }

    ObjectId::parse_str(user_hex).ok()
}

fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

// ─── Initiate / Callback ─────────────────────────────────────

/// Redirect the signed-in user to Strava's consent page.
async fn strava_initiate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Redirect> {
    let user = state.identity.require(&auth).await?;
    let user_id = stored_id(&user)?;

    let oauth_state = sign_state(user_id, now_ms(), &state.config.oauth_state_key)?;
    let url = state
        .strava
        .authorize_url(&state.config.strava_redirect_uri, &oauth_state);

    tracing::info!(user_id = %user_id, platform = PLATFORM_STRAVA, "Starting OAuth flow");
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Finish linking and send the browser back to the integrations page.
///
/// Failures are reported to the frontend as `?error=` rather than as an API
/// error, since the caller is a browser mid-redirect.
async fn strava_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let integrations = format!(
        "{}/settings/integrations",
        state.config.frontend_url.trim_end_matches('/')
    );
    let fail = |code: &str| Redirect::temporary(&format!("{}?error={}", integrations, code));

    let Some(user_id) = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, now_ms()))
    else {
        tracing::warn!("Rejected OAuth callback with invalid state");
        return fail("invalid_state");
    };

    if let Some(error) = params.error {
        tracing::info!(user_id = %user_id, error = %error, "Strava authorization declined");
        return fail(&urlencoding::encode(&error));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return fail("missing_code");
    };

    match state
        .strava
        .link_account(user_id, &code, params.scope.as_deref())
        .await
    {
        Ok(_) => Redirect::temporary(&format!("{}?connected={}", integrations, PLATFORM_STRAVA)),
        Err(e) => {
            tracing::error!(error = %e, user_id = %user_id, "Strava linking failed");
            fail("link_failed")
        }
    }
}

// ─── Linked Accounts ─────────────────────────────────────────

/// Linked account without its tokens.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfileView {
    pub platform: String,
    pub platform_user_id: String,
    pub scopes: Vec<String>,
    pub profile_data: ExternalProfileData,
    pub expires_at: String,
    pub connected_at: String,
    pub updated_at: String,
}

impl From<ExternalProfile> for ExternalProfileView {
    fn from(p: ExternalProfile) -> Self {
        Self {
            platform: p.platform,
            platform_user_id: p.platform_user_id,
            scopes: p.scopes,
            profile_data: p.profile_data,
            expires_at: p.expires_at,
            connected_at: p.connected_at,
            updated_at: p.updated_at,
        }
    }
}

async fn list_external_profiles(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ExternalProfileView>>> {
    let user = state.identity.require(&auth).await?;
    let profiles = state
        .db
        .list_external_profiles(stored_id(&user)?)
        .await?;
    Ok(Json(profiles.into_iter().map(Into::into).collect()))
}

async fn unlink_external_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(platform): Path<String>,
) -> Result<StatusCode> {
    if platform != PLATFORM_STRAVA {
        return Err(AppError::NotFound(format!(
            "Unsupported platform '{}'",
            platform
        )));
    }

    let user = state.identity.require(&auth).await?;
    if !state.strava.unlink_account(stored_id(&user)?).await? {
        return Err(AppError::NotFound("No linked Strava account".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"secret_key";
    const NOW: u64 = 1_767_225_600_000;

    #[test]
    fn test_state_round_trip() {
        let user = ObjectId::new();
        let state = sign_state(user, NOW, SECRET).unwrap();
        assert_eq!(verify_state(&state, SECRET, NOW + 1000), Some(user));
    }

    #[test]
    fn test_state_wrong_secret() {
        let state = sign_state(ObjectId::new(), NOW, SECRET).unwrap();
        assert_eq!(verify_state(&state, b"wrong_key", NOW), None);
    }

    #[test]
    fn test_state_tampered_user() {
        let user = ObjectId::new();
        let state = sign_state(user, NOW, SECRET).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let forged = decoded.replacen(&user.to_hex(), &ObjectId::new().to_hex(), 1);
        let forged = URL_SAFE_NO_PAD.encode(forged.as_bytes());
        assert_eq!(verify_state(&forged, SECRET, NOW), None);
    }

    #[test]
    fn test_state_expiry() {
        let user = ObjectId::new();
        let state = sign_state(user, NOW, SECRET).unwrap();
        assert_eq!(
            verify_state(&state, SECRET, NOW + STATE_MAX_AGE_MS),
            Some(user)
        );
        assert_eq!(verify_state(&state, SECRET, NOW + STATE_MAX_AGE_MS + 1), None);
        // Issued well in the future
        assert_eq!(verify_state(&state, SECRET, NOW - 5 * 60 * 1000), None);
    }

    #[test]
    fn test_state_malformed() {
        assert_eq!(verify_state("!!!", SECRET, NOW), None);
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_state(&encoded, SECRET, NOW), None);
        let encoded = URL_SAFE_NO_PAD.encode("a|b|zz");
        assert_eq!(verify_state(&encoded, SECRET, NOW), None);
    }

    #[test]
    fn test_view_omits_tokens() {
        let view = ExternalProfileView::from(ExternalProfile {
            id: None,
            user: ObjectId::new(),
            platform: "strava".into(),
            platform_user_id: "987".into(),
            access_token_encrypted: "sealed-a".into(),
            refresh_token_encrypted: "sealed-r".into(),
            expires_at: "2026-01-01T00:00:00.000Z".into(),
            scopes: vec!["read".into()],
            profile_data: ExternalProfileData::default(),
            connected_at: "2025-01-01T00:00:00.000Z".into(),
            updated_at: "2025-01-01T00:00:00.000Z".into(),
        });
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("sealed"));
        assert!(json.contains("\"platformUserId\":\"987\""));
    }
}
