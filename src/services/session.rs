// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Clerk session token verification.
//!
//! Clerk signs short-lived session JWTs with RS256 and publishes the keys at
//! `{issuer}/.well-known/jwks.json`. Keys are cached for the `max-age` the
//! endpoint advertises and refetched when a token names an unknown `kid`.

use crate::config::{origin_allowed, Config};
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity extracted from a valid session token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedSession {
    /// Clerk user ID (`sub`)
    pub subject: String,
    /// Clerk session ID (`sid`)
    pub session_id: Option<String>,
}

/// Session verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The token is malformed, expired or was not issued for this app.
    #[error("invalid session token: {0}")]
    Forbidden(String),
    /// The signing keys could not be fetched.
    #[error("session keys unavailable: {0}")]
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Clerk { jwks_url: String },
    StaticKey {
        kid: String,
        algorithm: Algorithm,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Clerk-issued session tokens.
pub struct SessionVerifier {
    http_client: reqwest::Client,
    issuer: String,
    authorized_parties: Vec<String>,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl SessionVerifier {
    /// Create a verifier that fetches and caches the issuer's JWKS.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let issuer = config.clerk_issuer.trim_end_matches('/').to_string();
        let jwks_url = format!("{}/.well-known/jwks.json", issuer);

        tracing::info!(issuer = %issuer, "Initialized Clerk session verifier");

        Self::build(config, VerifierMode::Clerk { jwks_url })
    }

    /// Create a verifier with a fixed key instead of the remote JWKS.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        algorithm: Algorithm,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static session kid must not be empty");
        }

        Self::build(
            config,
            VerifierMode::StaticKey {
                kid,
                algorithm,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn build(config: &Config, mode: VerifierMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building session HTTP client")?;

        Ok(Self {
            http_client,
            issuer: config.clerk_issuer.trim_end_matches('/').to_string(),
            authorized_parties: config.cors_origins.clone(),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a session token and return the Clerk identity it carries.
    pub async fn verify(&self, token: &str) -> Result<VerifiedSession, SessionError> {
        let header = decode_header(token)
            .map_err(|e| SessionError::Forbidden(format!("invalid JWT header: {e}")))?;

        let expected_alg = match &self.mode {
            VerifierMode::Clerk { .. } => Algorithm::RS256,
            VerifierMode::StaticKey { algorithm, .. } => *algorithm,
        };
        if header.alg != expected_alg {
            return Err(SessionError::Forbidden(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| SessionError::Forbidden("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(expected_alg);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<SessionClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| SessionError::Forbidden(format!("JWT validation failed: {e}")))?
            .claims;

        validate_iat(claims.iat)?;

        if let Some(azp) = claims.azp.as_deref() {
            let azp = azp.trim_end_matches('/');
            if !origin_allowed(&self.authorized_parties, azp) {
                return Err(SessionError::Forbidden(format!(
                    "unexpected authorized party: {azp}"
                )));
            }
        }

        if claims.sub.trim().is_empty() {
            return Err(SessionError::Forbidden("empty sub claim".to_string()));
        }

        tracing::debug!(subject = %claims.sub, session = ?claims.sid, "Session verified");

        Ok(VerifiedSession {
            subject: claims.sub,
            session_id: claims.sid,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, SessionError> {
        let jwks_url = match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
                ..
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }
                return Err(SessionError::Forbidden(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Clerk { jwks_url } => jwks_url,
        };

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(jwks_url, force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(SessionError::Forbidden(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, jwks_url: &str, force_refresh: bool) -> Result<(), SessionError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_url = %jwks_url, "Refreshing Clerk JWKS cache");

        let response = self
            .http_client
            .get(jwks_url)
            .send()
            .await
            .map_err(|e| SessionError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SessionError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_cache_control_max_age)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| SessionError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(SessionError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Clerk JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    sid: Option<String>,
    azp: Option<String>,
    iat: Option<u64>,
}

fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|u| u != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn validate_iat(iat: Option<u64>) -> Result<(), SessionError> {
    let Some(iat) = iat else {
        return Err(SessionError::Forbidden("missing iat claim".to_string()));
    };

    if iat > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(SessionError::Forbidden("iat claim is in the future".to_string()));
    }

    Ok(())
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
