// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider discovery routes.

use crate::error::{AppError, Result};
use crate::models::user::Visibility;
use crate::models::Address;
use crate::routes::{parse_path_id, to_api_json};
use crate::services::search::{Pagination, ProviderSearch, ProviderSummary, SearchParams};
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Search routes (public).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/search", get(search_providers))
        .route("/api/providers/{id}", get(get_provider))
}

/// One page of search results.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SearchResponse {
    pub data: Vec<ProviderSummary>,
    pub pagination: Pagination,
}

/// Find active providers within a radius of a point.
async fn search_providers(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>> {
    let Query(params) = query?;
    let search = ProviderSearch::try_from(params)?;

    let (data, total) = state.db.search_providers(&search).await?;

    tracing::debug!(
        lat = search.center.lat(),
        lng = search.center.lng(),
        radius_miles = search.radius_miles,
        page = search.page,
        returned = data.len(),
        total,
        "Provider search"
    );

    Ok(Json(SearchResponse {
        data,
        pagination: Pagination::new(total, search.page, search.limit),
    }))
}

/// Public view of one provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDetail {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
    /// Omitted when the provider hides their location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub is_verified: bool,
    pub profile: Value,
}

async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProviderDetail>> {
    let id = parse_path_id(&id, "Provider")?;
    let not_found = || AppError::NotFound("Provider not found".into());

    let (user, profile) = state.db.get_provider(id).await?.ok_or_else(not_found)?;
    let profile = profile.ok_or_else(not_found)?;
    let privacy = &user.preferences.privacy;
    if privacy.profile_visibility != Visibility::Public {
        return Err(not_found());
    }

    let mut profile = to_api_json(&profile)?;
    if let Value::Object(map) = &mut profile {
        map.remove("verificationDocuments");
    }

    Ok(Json(ProviderDetail {
        id: user.id_hex(),
        address: privacy.show_location.then(|| user.address.clone()),
        first_name: user.first_name,
        last_name: user.last_name,
        image_url: user.image_url,
        is_verified: user.is_verified,
        profile,
    }))
}
