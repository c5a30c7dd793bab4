// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation tests.
//!
//! All of these requests are rejected before any database access, so they
//! run against the offline app.

use axum::http::{header, Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{body_json, create_test_app, mint_session_token, request};

async fn send(
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let (app, _) = create_test_app();
    let token = mint_session_token("user_validation", "sess_1");
    let response = app
        .oneshot(request(method, uri, Some(&token), body))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

fn field_of(body: &serde_json::Value) -> &str {
    body["fields"][0]["field"].as_str().unwrap_or_default()
}

// ─── Search ──────────────────────────────────────────────────

#[tokio::test]
async fn test_search_missing_params_names_field() {
    let (status, body) = send(Method::GET, "/api/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(field_of(&body), "lat");
}

#[tokio::test]
async fn test_search_rejects_bad_values() {
    let cases = [
        ("lat=abc&lng=0&radius=10&page=1&limit=10", "lat"),
        ("lat=91&lng=0&radius=10&page=1&limit=10", "lat"),
        ("lat=0&lng=-181&radius=10&page=1&limit=10", "lng"),
        ("lat=0&lng=0&radius=0&page=1&limit=10", "radius"),
        ("lat=0&lng=0&radius=501&page=1&limit=10", "radius"),
        ("lat=0&lng=0&radius=10&page=0&limit=10", "page"),
        ("lat=0&lng=0&radius=10&page=1&limit=0", "limit"),
        ("lat=0&lng=0&radius=10&page=1&limit=101", "limit"),
        ("lat=0&lng=0&radius=10&page=-1&limit=10", "page"),
        (
            "lat=0&lng=0&radius=10&page=1&limit=10&providerTypes=gym,wizard",
            "providerTypes",
        ),
    ];

    for (query, field) in cases {
        let (status, body) = send(Method::GET, &format!("/api/search?{}", query), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query: {}", query);
        assert_eq!(field_of(&body), field, "query: {}", query);
    }
}

#[tokio::test]
async fn test_search_is_public() {
    // Valid parameters reach the (offline) database without a session.
    let (app, _) = create_test_app();
    let response = app
        .oneshot(request(
            Method::GET,
            "/api/search?lat=30.27&lng=-97.74&radius=25&page=1&limit=10",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_provider_detail_invalid_id_is_not_found() {
    let (status, body) = send(Method::GET, "/api/providers/not-an-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

// ─── Profile ─────────────────────────────────────────────────

#[tokio::test]
async fn test_set_type_rejects_unknown_type() {
    let (status, body) = send(
        Method::POST,
        "/api/profile/set-type",
        Some(json!({ "userType": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "userType");
}

#[tokio::test]
async fn test_set_type_requires_type() {
    let (status, body) = send(Method::POST, "/api/profile/set-type", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "userType");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _) = create_test_app();
    let token = mint_session_token("user_validation", "sess_1");
    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/api/profile/set-type")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_profile_update_validation() {
    let (status, body) = send(
        Method::POST,
        "/api/profile/update",
        Some(json!({ "userType": "provider", "experienceYears": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "experienceYears");

    let (status, body) = send(
        Method::POST,
        "/api/profile/update",
        Some(json!({
            "userType": "provider",
            "businessHours": [{ "day": "monday", "open": "17:00", "close": "09:00" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "businessHours");
}

#[tokio::test]
async fn test_profile_update_rejects_unknown_enum_values() {
    let (status, _) = send(
        Method::POST,
        "/api/profile/update",
        Some(json!({ "userType": "seeker", "fitnessLevel": "legendary" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_workout_validation() {
    let (status, body) = send(
        Method::POST,
        "/api/profile/seeker/workouts",
        Some(json!({ "type": "run", "duration": 0, "intensity": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "duration");
}

#[tokio::test]
async fn test_verification_document_needs_url() {
    let (status, body) = send(
        Method::POST,
        "/api/profile/provider/verification",
        Some(json!({ "documentType": "license", "url": "not a url" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "url");
}

// ─── Connections ─────────────────────────────────────────────

#[tokio::test]
async fn test_connection_target_must_be_id() {
    let (status, body) = send(
        Method::POST,
        "/api/connections",
        Some(json!({ "targetUserId": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "targetUserId");
}

#[tokio::test]
async fn test_connection_status_filter_validated() {
    let (status, body) = send(Method::GET, "/api/connections?status=friends", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "status");
}

#[tokio::test]
async fn test_connection_update_status_validated() {
    let (status, body) = send(
        Method::PUT,
        "/api/connections/64b7f0c2a1b2c3d4e5f60718",
        Some(json!({ "status": "maybe" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "status");
}

// ─── External Profiles ───────────────────────────────────────

#[tokio::test]
async fn test_unlink_unknown_platform() {
    let (status, _) = send(Method::DELETE, "/api/external-profiles/garmin", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
