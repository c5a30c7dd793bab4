// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and onboarding routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::provider::{BusinessHours, Credential, GalleryItem, Service, VerificationDocument};
use crate::models::seeker::{FitnessLevel, Milestone, Workout};
use crate::models::user::Preferences;
use crate::models::{
    Address, ProviderProfile, ProviderType, SeekerProfile, User, UserType, VerificationStatus,
};
use crate::routes::{stored_id, to_api_json};
use crate::services::onboarding::{self, OnboardingStatus};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use mongodb::bson::{self, doc, Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

/// Profile routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile/me", get(get_me))
        .route("/api/profile/set-type", post(set_type))
        .route("/api/profile/update", post(update_profile))
        .route("/api/profile/seeker/workouts", post(add_workout))
        .route("/api/profile/seeker/milestones", post(add_milestone))
        .route(
            "/api/profile/provider/verification",
            post(add_verification_document),
        )
        .route("/api/onboarding", get(get_onboarding))
}

// ─── Views ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Local user as returned to its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
    pub user_type: Option<UserType>,
    pub address: Address,
    pub location: Option<LatLng>,
    pub is_verified: bool,
    pub preferences: Preferences,
    pub created_at: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id_hex(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            image_url: user.image_url.clone(),
            user_type: user.user_type,
            address: user.address.clone(),
            location: user.location.map(|p| LatLng {
                lat: p.lat(),
                lng: p.lng(),
            }),
            is_verified: user.is_verified,
            preferences: user.preferences.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Combined user, profile and onboarding state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMeResponse {
    pub db_user_exists: bool,
    pub profile_complete: bool,
    pub user_type: Option<UserType>,
    pub onboarding: OnboardingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Page the client is currently showing
    pub page: Option<String>,
}

async fn build_me(
    state: &AppState,
    user: Option<User>,
    page: Option<&str>,
) -> Result<ProfileMeResponse> {
    let (onboarding_state, user) = onboarding::resolve(&state.db, user).await?;

    let profile = match &user {
        Some(user) => load_profile_json(state, user).await?,
        None => None,
    };

    Ok(ProfileMeResponse {
        db_user_exists: user.is_some(),
        profile_complete: onboarding_state.is_complete(),
        user_type: user.as_ref().and_then(|u| u.user_type),
        onboarding: OnboardingStatus::new(onboarding_state, page),
        user: user.as_ref().map(UserView::from),
        profile,
    })
}

async fn load_profile_json(state: &AppState, user: &User) -> Result<Option<Value>> {
    let Some(id) = user.id else {
        return Ok(None);
    };
    match user.user_type {
        Some(UserType::Seeker) => state
            .db
            .get_profile::<SeekerProfile>(id)
            .await?
            .map(|p| to_api_json(&p))
            .transpose(),
        Some(UserType::Provider) => state
            .db
            .get_profile::<ProviderProfile>(id)
            .await?
            .map(|p| to_api_json(&p))
            .transpose(),
        None => Ok(None),
    }
}

// ─── Me / Onboarding ─────────────────────────────────────────

/// Current user with profile; reports `dbUserExists: false` before onboarding.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ProfileMeResponse>> {
    let Query(query) = query?;
    let user = state.identity.find(&auth).await?;
    Ok(Json(build_me(&state, user, query.page.as_deref()).await?))
}

async fn get_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<OnboardingStatus>> {
    let Query(query) = query?;
    let user = state.identity.find(&auth).await?;
    let (onboarding_state, _) = onboarding::resolve(&state.db, user).await?;
    Ok(Json(OnboardingStatus::new(
        onboarding_state,
        query.page.as_deref(),
    )))
}

// ─── Set Type ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTypeRequest {
    pub user_type: Option<String>,
}

/// Choose seeker or provider, creating the local user on first call.
async fn set_type(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<SetTypeRequest>, JsonRejection>,
) -> Result<Json<ProfileMeResponse>> {
    let Json(body) = body?;
    let user_type: UserType = body
        .user_type
        .as_deref()
        .ok_or_else(|| AppError::invalid_field("userType", "is required"))?
        .parse()
        .map_err(|e: String| AppError::invalid_field("userType", e))?;

    let (mut user, created) = state.identity.provision(&auth, user_type).await?;

    if !created && user.user_type != Some(user_type) {
        let id = stored_id(&user)?;
        if let Some(current) = user.user_type {
            if has_profile_of(&state, id, current).await? {
                return Err(AppError::Conflict(format!(
                    "User already has a {} profile",
                    current
                )));
            }
        }

        user = state
            .db
            .update_user(
                id,
                doc! { "userType": user_type.as_str(), "profileComplete": false },
                Document::new(),
            )
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        tracing::info!(user_id = %id, user_type = %user_type, "User type changed");
    }

    state.identity.mirror_metadata(&user).await;
    Ok(Json(build_me(&state, Some(user), None).await?))
}

async fn has_profile_of(
    state: &AppState,
    id: mongodb::bson::oid::ObjectId,
    user_type: UserType,
) -> Result<bool> {
    match user_type {
        UserType::Seeker => state.db.has_profile::<SeekerProfile>(id).await,
        UserType::Provider => state.db.has_profile::<ProviderProfile>(id).await,
    }
}

// ─── Update ──────────────────────────────────────────────────

/// Profile submission. Fields for the other user type are ignored.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub user_type: Option<UserType>,

    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub last_name: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub state: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub country: Option<String>,
    pub preferences: Option<Preferences>,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub bio: Option<String>,

    // Seeker
    pub fitness_level: Option<FitnessLevel>,
    #[validate(length(max = 20, message = "must have at most 20 entries"))]
    pub goals: Option<Vec<String>>,
    #[validate(length(max = 20, message = "must have at most 20 entries"))]
    pub interests: Option<Vec<String>>,

    // Provider
    #[validate(length(max = 20, message = "must have at most 20 entries"))]
    pub specialties: Option<Vec<String>>,
    pub provider_type: Option<ProviderType>,
    #[validate(range(min = 0, max = 80, message = "must be 0-80 years"))]
    pub experience_years: Option<i32>,
    #[validate(nested)]
    pub credentials: Option<Vec<Credential>>,
    #[validate(nested)]
    pub services: Option<Vec<Service>>,
    pub business_hours: Option<Vec<BusinessHours>>,
    #[validate(nested)]
    pub gallery: Option<Vec<GalleryItem>>,
}

impl ProfileUpdateRequest {
    fn check(&self) -> Result<()> {
        self.validate()?;
        if let Some(hours) = &self.business_hours {
            if let Some(bad) = hours.iter().find(|h| !h.is_consistent()) {
                return Err(AppError::invalid_field(
                    "businessHours",
                    format!(
                        "{} needs HH:MM open and close times in order, or closed with neither",
                        format!("{:?}", bad.day).to_lowercase()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn touches_address(&self) -> bool {
        self.city.is_some() || self.state.is_some() || self.country.is_some()
    }

    /// The user's address with this request's fields applied.
    fn merged_address(&self, current: &Address) -> Address {
        let pick = |new: &Option<String>, old: &str| {
            new.as_deref().map(str::trim).unwrap_or(old).to_string()
        };
        Address {
            city: pick(&self.city, &current.city),
            state: pick(&self.state, &current.state),
            country: pick(&self.country, &current.country),
        }
    }

    fn apply_seeker(&self, profile: &mut SeekerProfile) {
        if let Some(level) = self.fitness_level {
            profile.fitness_level = Some(level);
        }
        if let Some(goals) = &self.goals {
            profile.goals = clean_list(goals);
        }
        if let Some(interests) = &self.interests {
            profile.interests = clean_list(interests);
        }
        if let Some(bio) = &self.bio {
            profile.bio = clean_text(bio);
        }
    }

    fn apply_provider(&self, profile: &mut ProviderProfile) {
        if let Some(bio) = &self.bio {
            profile.bio = clean_text(bio);
        }
        if let Some(specialties) = &self.specialties {
            profile.specialties = clean_list(specialties);
        }
        if let Some(provider_type) = self.provider_type {
            profile.provider_type = Some(provider_type);
        }
        if let Some(years) = self.experience_years {
            profile.experience_years = Some(years);
        }
        if let Some(credentials) = &self.credentials {
            profile.credentials = credentials.clone();
        }
        if let Some(services) = &self.services {
            profile.services = services.clone();
        }
        if let Some(hours) = &self.business_hours {
            let mut hours = hours.clone();
            hours.sort_by_key(|h| h.day);
            hours.dedup_by_key(|h| h.day);
            profile.business_hours = hours;
        }
        if let Some(gallery) = &self.gallery {
            profile.gallery = gallery.clone();
        }
    }
}

/// Trim entries, drop blanks and duplicates, keep first-seen order.
fn clean_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !out.iter().any(|existing| existing == value) {
            out.push(value.to_string());
        }
    }
    out
}

fn clean_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Save the profile wizard's submission.
///
/// Order matters for retries: the profile document is written before the
/// user is flagged complete, and every step converges to the same result
/// when repeated.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> Result<Json<ProfileMeResponse>> {
    let Json(body) = body?;
    body.check()?;

    let requested = body.user_type.unwrap_or(UserType::Seeker);
    let (user, _) = state.identity.provision(&auth, requested).await?;
    let user_type = user.user_type.unwrap_or(requested);
    if body.user_type.is_some_and(|t| t != user_type) {
        return Err(AppError::Conflict(format!(
            "User is already registered as a {}",
            user_type
        )));
    }
    let id = stored_id(&user)?;

    let mut set = doc! { "profileComplete": true, "userType": user_type.as_str() };
    let mut unset = Document::new();

    if body.touches_address() {
        let address = body.merged_address(&user.address);
        let location = if address == user.address && user.location.is_some() {
            user.location
        } else {
            state.geocoder.geocode(&address).await
        };
        if location.is_none() {
            tracing::info!(user_id = %id, city = %address.city, "Address did not geocode");
        }

        set.insert("address", bson::to_bson(&address)?);
        match location {
            Some(point) => {
                set.insert("location", bson::to_bson(&point)?);
            }
            None => {
                unset.insert("location", "");
            }
        }
    }
    if let Some(first_name) = &body.first_name {
        set.insert("firstName", first_name.trim());
    }
    if let Some(last_name) = &body.last_name {
        set.insert("lastName", last_name.trim());
    }
    if let Some(preferences) = &body.preferences {
        set.insert("preferences", bson::to_bson(preferences)?);
    }

    match user_type {
        UserType::Seeker => {
            let profile = state
                .db
                .update_profile::<SeekerProfile, _>(id, |p| {
                    body.apply_seeker(p);
                    Ok(())
                })
                .await?;
            tracing::info!(user_id = %id, score = profile.completion_score, "Seeker profile saved");
        }
        UserType::Provider => {
            let profile = state
                .db
                .update_profile::<ProviderProfile, _>(id, |p| {
                    body.apply_provider(p);
                    Ok(())
                })
                .await?;
            tracing::info!(user_id = %id, score = profile.completion_score, "Provider profile saved");
        }
    }

    let user = state
        .db
        .update_user(id, set, unset)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    state.identity.mirror_metadata(&user).await;
    Ok(Json(build_me(&state, Some(user), None).await?))
}

// ─── Profile Entries ─────────────────────────────────────────

/// Local user of the required type that already has a profile document.
async fn require_profile_owner(
    state: &AppState,
    auth: &AuthUser,
    user_type: UserType,
) -> Result<mongodb::bson::oid::ObjectId> {
    let user = state.identity.require(auth).await?;
    if user.user_type != Some(user_type) {
        return Err(AppError::BadRequest(format!(
            "Only {} accounts can do this",
            user_type
        )));
    }
    let id = stored_id(&user)?;
    if !has_profile_of(state, id, user_type).await? {
        return Err(AppError::NotFound(
            "Profile not found; complete your profile first".into(),
        ));
    }
    Ok(id)
}

/// Append an entry to the seeker's workout log.
async fn add_workout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<Workout>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(mut workout) = body?;
    workout.validate()?;
    if workout.date.is_none() {
        workout.date = Some(now_rfc3339());
    }

    let id = require_profile_owner(&state, &auth, UserType::Seeker).await?;
    let profile = state
        .db
        .update_profile::<SeekerProfile, _>(id, |p| {
            p.workouts.push(workout.clone());
            Ok(())
        })
        .await?;

    tracing::info!(user_id = %id, workouts = profile.workouts.len(), "Workout logged");
    Ok((StatusCode::CREATED, Json(to_api_json(&profile)?)))
}

/// Append a milestone to the seeker's journey.
async fn add_milestone(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<Milestone>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(mut milestone) = body?;
    milestone.validate()?;
    if milestone.achieved_at.is_none() {
        milestone.achieved_at = Some(now_rfc3339());
    }

    let id = require_profile_owner(&state, &auth, UserType::Seeker).await?;
    let profile = state
        .db
        .update_profile::<SeekerProfile, _>(id, |p| {
            p.journey.push(milestone.clone());
            Ok(())
        })
        .await?;

    tracing::info!(user_id = %id, milestones = profile.journey.len(), "Milestone added");
    Ok((StatusCode::CREATED, Json(to_api_json(&profile)?)))
}

/// Submit a verification document; review starts over as pending.
async fn add_verification_document(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<VerificationDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(mut document) = body?;
    document.validate()?;
    if document.uploaded_at.is_none() {
        document.uploaded_at = Some(now_rfc3339());
    }

    let id = require_profile_owner(&state, &auth, UserType::Provider).await?;
    let profile = state
        .db
        .update_profile::<ProviderProfile, _>(id, |p| {
            p.verification_documents.push(document.clone());
            p.verification_status = VerificationStatus::Pending;
            Ok(())
        })
        .await?;

    tracing::info!(
        user_id = %id,
        documents = profile.verification_documents.len(),
        "Verification document submitted"
    );
    Ok((StatusCode::CREATED, Json(to_api_json(&profile)?)))
}
