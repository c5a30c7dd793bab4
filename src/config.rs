//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and kept in memory for the life of the
//! process.

use axum::http::Uri;
use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// MongoDB connection string
    pub mongodb_uri: String,
    /// MongoDB database name
    pub mongodb_database: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Public base URL of this API
    pub api_url: String,
    /// Origins allowed by CORS and as session `azp`, on top of loopback origins
    pub cors_origins: Vec<String>,
    /// Clerk session token issuer (Frontend API URL)
    pub clerk_issuer: String,
    /// Clerk Backend API base URL
    pub clerk_api_url: String,
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth redirect URI
    pub strava_redirect_uri: String,
    /// Nominatim-compatible geocoder base URL
    pub geocoder_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Clerk Backend API secret key
    pub clerk_secret_key: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// HMAC key for signing OAuth state parameters (raw bytes)
    pub oauth_state_key: Vec<u8>,
    /// Input key material for encrypting stored OAuth tokens (raw bytes)
    pub token_encryption_key: Vec<u8>,
}

impl Config {
    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "werkout_test".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            api_url: "http://localhost:8080".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            clerk_issuer: "https://clerk.test.werkout.in".to_string(),
            clerk_api_url: "https://api.clerk.com/v1".to_string(),
            strava_client_id: "test_client_id".to_string(),
            strava_redirect_uri: "http://localhost:8080/api/oauth/strava/callback".to_string(),
            geocoder_url: "http://127.0.0.1:9".to_string(),
            port: 8080,
            clerk_secret_key: "sk_test_secret".to_string(),
            strava_client_secret: "test_secret".to_string(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!!".to_vec(),
            token_encryption_key: b"test_token_encryption_key_bytes!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let api_url = env::var("API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_origin_list(&v))
            .unwrap_or_else(|_| vec![frontend_url.clone()]);

        Ok(Self {
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "werkout".to_string()),
            strava_redirect_uri: env::var("STRAVA_REDIRECT_URI")
                .unwrap_or_else(|_| format!("{}/api/oauth/strava/callback", api_url)),
            frontend_url,
            api_url,
            cors_origins,
            clerk_issuer: required("CLERK_ISSUER")?
                .trim_end_matches('/')
                .to_string(),
            clerk_api_url: env::var("CLERK_API_URL")
                .unwrap_or_else(|_| "https://api.clerk.com/v1".to_string()),
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            clerk_secret_key: required("CLERK_SECRET_KEY")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
            token_encryption_key: required("TOKEN_ENCRYPTION_KEY")?.into_bytes(),
        })
    }

    /// Whether an origin may call the API from a browser.
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        origin_allowed(&self.cors_origins, origin)
    }
}

/// Whether `origin` is in `allow_list` or is a plain-http loopback origin.
pub fn origin_allowed(allow_list: &[String], origin: &str) -> bool {
    let origin = origin.trim_end_matches('/');
    allow_list.iter().any(|o| o == origin) || is_loopback_origin(origin)
}

/// `http://localhost` or `http://127.0.0.1`, with an optional port and nothing else.
fn is_loopback_origin(origin: &str) -> bool {
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    let Some(authority) = uri.authority() else {
        return false;
    };

    uri.scheme_str() == Some("http")
        && !authority.as_str().contains('@')
        && matches!(authority.host(), "localhost" | "127.0.0.1")
        && matches!(uri.path(), "" | "/")
        && uri.query().is_none()
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
