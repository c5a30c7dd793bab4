// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};
use std::sync::Arc;
use werkout_api::config::Config;
use werkout_api::db::MongoDb;
use werkout_api::models::{Address, GeoPoint};
use werkout_api::routes::create_router;
use werkout_api::services::clerk::{ClerkEmailAddress, ClerkUser};
use werkout_api::services::{ClerkClient, Geocoder, SessionVerifier};
use werkout_api::AppState;

pub const SESSION_SECRET: &[u8] = b"integration-test-session-secret";
pub const SESSION_KID: &str = "test-kid";

/// Check if a MongoDB instance is available via environment variable.
#[allow(dead_code)]
pub fn mongo_available() -> bool {
    std::env::var("MONGODB_URI").is_ok()
}

/// Skip test with message if MongoDB is not available.
#[macro_export]
macro_rules! require_mongo {
    () => {
        if !crate::common::mongo_available() {
            eprintln!("⚠️  Skipping: MONGODB_URI not set");
            return;
        }
    };
}

/// Places the test geocoder knows about.
#[allow(dead_code)]
pub fn address(city: &str) -> Address {
    let state = match city {
        "Portland" => "OR",
        _ => "TX",
    };
    Address {
        city: city.to_string(),
        state: state.to_string(),
        country: "USA".to_string(),
    }
}

#[allow(dead_code)]
pub fn point(city: &str) -> GeoPoint {
    let (lat, lng) = match city {
        "Austin" => (30.2672, -97.7431),
        "Round Rock" => (30.5083, -97.6789),
        "San Marcos" => (29.8833, -97.9414),
        "San Antonio" => (29.4241, -98.4936),
        "Houston" => (29.7604, -95.3698),
        _ => (45.5152, -122.6784),
    };
    GeoPoint::new(lat, lng).unwrap()
}

fn test_geocoder() -> Geocoder {
    Geocoder::new_static(
        ["Austin", "Round Rock", "San Marcos", "San Antonio", "Houston", "Portland"]
            .into_iter()
            .map(|city| (address(city), point(city))),
    )
}

fn test_verifier(config: &Config) -> Arc<SessionVerifier> {
    Arc::new(
        SessionVerifier::new_with_static_key(
            config,
            SESSION_KID,
            Algorithm::HS256,
            DecodingKey::from_secret(SESSION_SECRET),
        )
        .unwrap(),
    )
}

/// Mint a Clerk-style session token the test verifier accepts.
#[allow(dead_code)]
pub fn mint_session_token(subject: &str, session_id: &str) -> String {
    mint_with_key(subject, session_id, SESSION_SECRET)
}

#[allow(dead_code)]
pub fn mint_with_key(subject: &str, session_id: &str, secret: &[u8]) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": subject,
        "sid": session_id,
        "iss": Config::test_default().clerk_issuer,
        "azp": "http://localhost:3000",
        "iat": now,
        "nbf": now,
        "exp": now + 300,
    });
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(SESSION_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(secret)).unwrap()
}

/// Clerk user record with a single primary email.
#[allow(dead_code)]
pub fn clerk_user(subject: &str, email: &str, first_name: &str) -> ClerkUser {
    ClerkUser {
        id: subject.to_string(),
        email_addresses: vec![ClerkEmailAddress {
            id: format!("idn_{}", subject),
            email_address: email.to_string(),
        }],
        primary_email_address_id: Some(format!("idn_{}", subject)),
        first_name: Some(first_name.to_string()),
        last_name: Some("Tester".to_string()),
        image_url: None,
        public_metadata: Default::default(),
    }
}

fn build_app(db: MongoDb) -> (axum::Router, Arc<AppState>, ClerkClient) {
    let config = Config::test_default();
    let verifier = test_verifier(&config);
    let clerk = ClerkClient::new_mock();
    let state = Arc::new(
        AppState::new(config, db, verifier, clerk.clone(), test_geocoder()).unwrap(),
    );
    (create_router(state.clone()), state, clerk)
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let (app, state, _) = build_app(MongoDb::new_mock());
    (app, state)
}

/// Create a test app against the MongoDB at `MONGODB_URI`, in a fresh
/// database. Call `state.db.drop_database()` when done.
#[allow(dead_code)]
pub async fn create_live_app() -> (axum::Router, Arc<AppState>, ClerkClient) {
    let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI not set");
    let name = format!("werkout_test_{}", ObjectId::new().to_hex());
    let db = MongoDb::new(&uri, &name)
        .await
        .expect("Failed to connect to MongoDB");
    db.ensure_indexes().await.expect("Failed to create indexes");
    build_app(db)
}

/// Build a request with an optional bearer token and JSON body.
#[allow(dead_code)]
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Collect a response body as JSON (`Null` for an empty body).
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
