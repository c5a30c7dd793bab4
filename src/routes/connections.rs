// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Seeker/provider connection routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Connection, ConnectionStatus, UserType};
use crate::routes::{parse_path_id, stored_id};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Connection routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/connections",
            get(list_connections).post(create_connection),
        )
        .route("/api/connections/{id}", put(update_connection))
}

/// Connection as returned to either party.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionView {
    pub id: String,
    pub seeker: String,
    pub provider: String,
    pub status: ConnectionStatus,
    pub initiated_by: UserType,
    pub message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Connection> for ConnectionView {
    fn from(c: Connection) -> Self {
        Self {
            id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
            seeker: c.seeker.to_hex(),
            provider: c.provider.to_hex(),
            status: c.status,
            initiated_by: c.initiated_by,
            message: c.message,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub target_user_id: String,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub message: Option<String>,
}

/// Request a connection with a user on the other side of the marketplace.
async fn create_connection(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<CreateConnectionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConnectionView>)> {
    let Json(body) = body?;
    body.validate()?;
    let target_id = ObjectId::parse_str(body.target_user_id.trim())
        .map_err(|_| AppError::invalid_field("targetUserId", "must be a user id"))?;

    let me = state.identity.require(&auth).await?;
    let my_id = stored_id(&me)?;
    let my_type = me
        .user_type
        .ok_or_else(|| AppError::BadRequest("Select a user type first".into()))?;
    if target_id == my_id {
        return Err(AppError::BadRequest("Cannot connect with yourself".into()));
    }

    let target = state
        .db
        .get_user(target_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let (seeker, provider) = match (my_type, target.user_type) {
        (UserType::Seeker, Some(UserType::Provider)) => (my_id, target_id),
        (UserType::Provider, Some(UserType::Seeker)) => (target_id, my_id),
        _ => {
            return Err(AppError::BadRequest(
                "Connections must be between a seeker and a provider".into(),
            ))
        }
    };

    let now = now_rfc3339();
    let connection = state
        .db
        .insert_connection(&Connection {
            id: None,
            seeker,
            provider,
            status: ConnectionStatus::Pending,
            initiated_by: my_type,
            message: body
                .message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            created_at: now.clone(),
            updated_at: now,
        })
        .await?;

    tracing::info!(
        seeker = %seeker,
        provider = %provider,
        initiated_by = %my_type,
        "Connection requested"
    );
    Ok((StatusCode::CREATED, Json(connection.into())))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListConnectionsQuery {
    pub status: Option<String>,
}

/// The caller's connections on either side, newest first.
async fn list_connections(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<ListConnectionsQuery>, QueryRejection>,
) -> Result<Json<Vec<ConnectionView>>> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ConnectionStatus>)
        .transpose()
        .map_err(|e| AppError::invalid_field("status", e))?;

    let me = state.identity.require(&auth).await?;
    let connections = state
        .db
        .list_connections(stored_id(&me)?, status)
        .await?;

    Ok(Json(connections.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateConnectionRequest {
    pub status: String,
}

/// Accept, reject or block a connection.
async fn update_connection(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    body: std::result::Result<Json<UpdateConnectionRequest>, JsonRejection>,
) -> Result<Json<ConnectionView>> {
    let Json(body) = body?;
    let to: ConnectionStatus = body
        .status
        .parse()
        .map_err(|e: String| AppError::invalid_field("status", e))?;
    let id = parse_path_id(&id, "Connection")?;

    let me = state.identity.require(&auth).await?;
    let my_id = stored_id(&me)?;

    let not_found = || AppError::NotFound("Connection not found".into());
    let connection = state.db.get_connection(id).await?.ok_or_else(not_found)?;
    let side = connection.side_of(my_id).ok_or_else(not_found)?;

    connection
        .check_transition(side, to)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let updated = state
        .db
        .update_connection_status(id, connection.status, to)
        .await?
        .ok_or_else(|| AppError::Conflict("Connection was changed by another request".into()))?;

    tracing::info!(
        connection_id = %id,
        from = connection.status.as_str(),
        to = to.as_str(),
        "Connection status changed"
    );
    Ok(Json(updated.into()))
}
