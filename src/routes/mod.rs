// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod connections;
pub mod oauth;
pub mod profile;
pub mod search;

use crate::error::{AppError, Result};
use crate::middleware::auth::require_auth;
use crate::models::User;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors_state = state.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| cors_state.config.is_allowed_origin(origin))
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(search::routes())
        .merge(oauth::public_routes());

    // Protected routes (Clerk session required)
    let protected_routes = Router::new()
        .merge(profile::routes())
        .merge(connections::routes())
        .merge(oauth::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Object id of a stored document.
pub(crate) fn stored_id(user: &User) -> Result<ObjectId> {
    user.id
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("stored user has no _id")))
}

/// Parse a path id; anything that is not an ObjectId cannot name a document.
pub(crate) fn parse_path_id(raw: &str, what: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

/// Serialize a stored document for the API.
///
/// `_id` becomes `id`, and ObjectId references become plain hex strings.
pub(crate) fn to_api_json<T: Serialize>(document: &T) -> Result<Value> {
    let mut value = serde_json::to_value(document).map_err(anyhow::Error::from)?;
    if let Value::Object(map) = &mut value {
        if let Some(id) = map.remove("_id") {
            map.insert("id".to_string(), flatten_object_id(id));
        }
        for key in ["user", "seeker", "provider"] {
            if let Some(field) = map.get_mut(key) {
                *field = flatten_object_id(field.take());
            }
        }
        map.remove("version");
    }
    Ok(value)
}

fn flatten_object_id(value: Value) -> Value {
    match value.get("$oid").and_then(Value::as_str) {
        Some(hex) => Value::String(hex.to_string()),
        None => value,
    }
}
