// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::error::AppError;
use crate::services::session::SessionError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie Clerk sets on the frontend's domain.
pub const SESSION_COOKIE: &str = "__session";

/// Authenticated Clerk identity extracted from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Clerk user ID
    pub subject: String,
    /// Clerk session ID, if the token carries one
    pub session_id: Option<String>,
}

/// Middleware that requires a valid Clerk session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try header first (API clients), then the session cookie (browser)
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?,
    };

    let session = state
        .session_verifier
        .verify(&token)
        .await
        .map_err(|e| match e {
            SessionError::Forbidden(reason) => {
                tracing::debug!(reason = %reason, "Rejected session token");
                AppError::InvalidToken
            }
            SessionError::Transient(reason) => {
                AppError::Internal(anyhow::anyhow!("session verification unavailable: {reason}"))
            }
        })?;

    request.extensions_mut().insert(AuthUser {
        subject: session.subject,
        session_id: session.session_id,
    });

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
