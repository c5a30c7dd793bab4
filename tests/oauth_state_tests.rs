// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth callback handling.
//!
//! The callback is public: the signed state is the only thing tying it to a
//! user, so every failure must send the browser back with an error and
//! never touch storage.

use axum::http::{header, Method, StatusCode};
use mongodb::bson::oid::ObjectId;
use tower::ServiceExt;
use werkout_api::routes::oauth::{sign_state, STATE_MAX_AGE_MS};

mod common;

use common::{create_test_app, request};

const INTEGRATIONS: &str = "http://localhost:3000/settings/integrations";

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

async fn callback_location(query: &str) -> String {
    let (app, _) = create_test_app();
    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/api/oauth/strava/callback?{}", query),
            None,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn valid_state() -> String {
    let key = werkout_api::config::Config::test_default().oauth_state_key;
    sign_state(ObjectId::new(), now_ms(), &key).unwrap()
}

#[tokio::test]
async fn test_missing_state_rejected() {
    let location = callback_location("code=abc").await;
    assert_eq!(location, format!("{}?error=invalid_state", INTEGRATIONS));
}

#[tokio::test]
async fn test_forged_state_rejected() {
    let forged = sign_state(ObjectId::new(), now_ms(), b"attacker-chosen-key").unwrap();
    let location = callback_location(&format!("code=abc&state={}", forged)).await;
    assert_eq!(location, format!("{}?error=invalid_state", INTEGRATIONS));
}

#[tokio::test]
async fn test_expired_state_rejected() {
    let key = werkout_api::config::Config::test_default().oauth_state_key;
    let stale = sign_state(ObjectId::new(), now_ms() - STATE_MAX_AGE_MS - 60_000, &key).unwrap();
    let location = callback_location(&format!("code=abc&state={}", stale)).await;
    assert_eq!(location, format!("{}?error=invalid_state", INTEGRATIONS));
}

#[tokio::test]
async fn test_declined_authorization_reported() {
    let location =
        callback_location(&format!("error=access_denied&state={}", valid_state())).await;
    assert_eq!(location, format!("{}?error=access_denied", INTEGRATIONS));
}

#[tokio::test]
async fn test_missing_code_reported() {
    let location = callback_location(&format!("state={}", valid_state())).await;
    assert_eq!(location, format!("{}?error=missing_code", INTEGRATIONS));
}
