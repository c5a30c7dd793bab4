// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava account linking.
//!
//! Handles:
//! - Building the OAuth authorize URL
//! - Exchanging the callback code for tokens
//! - Storing the linked account with encrypted tokens
//! - Unlinking (with best-effort deauthorization at Strava)

use crate::db::MongoDb;
use crate::error::AppError;
use crate::models::external_profile::{ExternalProfileData, PLATFORM_STRAVA};
use crate::models::ExternalProfile;
use crate::services::crypto::TokenCipher;
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Scopes requested when linking an account.
pub const REQUESTED_SCOPES: &str = "read,activity:read_all";

/// Low-level Strava OAuth client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            oauth_url: STRAVA_OAUTH_URL.to_string(),
            client_id,
            client_secret,
        })
    }

    /// URL the user is sent to for granting access.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&approval_prompt=auto&scope={}&state={}",
            self.oauth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(REQUESTED_SCOPES),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token exchange failed: {}", e)))?;

        check_response_json(response).await
    }

    /// Revoke the app's access for the token's owner.
    pub async fn deauthorize(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/deauthorize", self.oauth_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Deauthorization request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::StravaApi(format!(
                "Deauthorization failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
        }
        tracing::error!(status = %status, body = %body, "Strava request failed");

        return Err(AppError::StravaApi(format!("HTTP {}", status)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Athlete summary returned with the tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub profile: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// High-level linking service: Strava client + storage + token encryption.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    db: MongoDb,
    cipher: Arc<TokenCipher>,
}

impl StravaService {
    pub fn new(client: StravaClient, db: MongoDb, cipher: Arc<TokenCipher>) -> Self {
        Self { client, db, cipher }
    }

    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        self.client.authorize_url(redirect_uri, state)
    }

    /// Complete the OAuth flow for `user` and store the linked account.
    ///
    /// Re-linking replaces the stored tokens and profile data.
    pub async fn link_account(
        &self,
        user: ObjectId,
        code: &str,
        granted_scope: Option<&str>,
    ) -> Result<ExternalProfile, AppError> {
        let tokens = self.client.exchange_code(code).await?;
        let profile = self.build_profile(user, tokens, granted_scope)?;

        self.db.upsert_external_profile(&profile).await?;

        tracing::info!(
            user_id = %user,
            platform = PLATFORM_STRAVA,
            platform_user_id = %profile.platform_user_id,
            "External profile linked"
        );
        Ok(profile)
    }

    fn build_profile(
        &self,
        user: ObjectId,
        tokens: TokenExchangeResponse,
        granted_scope: Option<&str>,
    ) -> Result<ExternalProfile, AppError> {
        let owner = user.to_hex();
        let now = now_rfc3339();
        let expires_at = chrono::DateTime::from_timestamp(tokens.expires_at, 0)
            .map(format_utc_rfc3339)
            .unwrap_or_else(|| now.clone());

        let scopes = granted_scope
            .unwrap_or(REQUESTED_SCOPES)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ExternalProfile {
            id: None,
            user,
            platform: PLATFORM_STRAVA.to_string(),
            platform_user_id: tokens.athlete.id.to_string(),
            access_token_encrypted: self.cipher.encrypt(&tokens.access_token, &owner)?,
            refresh_token_encrypted: self.cipher.encrypt(&tokens.refresh_token, &owner)?,
            expires_at,
            scopes,
            profile_data: ExternalProfileData {
                username: tokens.athlete.username,
                first_name: tokens.athlete.firstname,
                last_name: tokens.athlete.lastname,
                avatar_url: tokens.athlete.profile,
                city: tokens.athlete.city,
                country: tokens.athlete.country,
            },
            connected_at: now.clone(),
            updated_at: now,
        })
    }

    /// Remove the user's linked Strava account. Returns whether one existed.
    ///
    /// Revoking access at Strava is best-effort; the local link is always removed.
    pub async fn unlink_account(&self, user: ObjectId) -> Result<bool, AppError> {
        let Some(profile) = self.db.delete_external_profile(user, PLATFORM_STRAVA).await? else {
            return Ok(false);
        };

        match self
            .cipher
            .decrypt(&profile.access_token_encrypted, &user.to_hex())
        {
            Ok(access_token) => {
                if let Err(e) = self.client.deauthorize(&access_token).await {
                    tracing::warn!(error = %e, user_id = %user, "Strava deauthorization failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user, "Could not decrypt token for deauthorization");
            }
        }

        tracing::info!(user_id = %user, platform = PLATFORM_STRAVA, "External profile unlinked");
        Ok(true)
    }
}
